//! Data types shared across backends, extraction and orchestration.

pub mod candidate;
pub mod config;
pub mod fetch;
pub mod listing;
