//! Orchestration - the top of the pipeline.
//!
//! The orchestrator:
//! - Validates the submitted URL
//! - Races every configured backend under one deadline
//! - Runs extraction on each backend's content as it arrives
//! - Stops early on the first usable record (configurable)
//! - Merges partial records by per-field backend precedence

pub mod merge;
pub mod orchestrator;
pub mod race;
pub mod report;

pub use merge::MergePrecedence;
pub use orchestrator::{Orchestrator, OrchestratorBuilder};
pub use race::RaceState;
pub use report::{BackendOutcome, BackendReport, ExtractionReport};
