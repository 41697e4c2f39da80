//! Core trait abstractions for the extraction pipeline.
//!
//! These are the seams where backends, transport and throttling are
//! swapped, both for production implementations and for test doubles.

pub mod backend;
pub mod http;
pub mod limiter;
