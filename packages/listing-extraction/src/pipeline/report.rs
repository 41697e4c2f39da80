//! Per-run diagnostics returned alongside the merged record.

use serde::Serialize;
use std::time::Duration;

use crate::error::FetchFailure;
use crate::types::fetch::BackendId;
use crate::types::listing::ListingRecord;

/// What happened to one backend during a race.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BackendOutcome {
    /// Content was fetched and extracted (the record may still be empty)
    Extracted { record: ListingRecord },

    Failed { failure: FetchFailure },

    /// Still running when the race ended; its result was discarded
    Abandoned,
}

/// One backend's line in an [`ExtractionReport`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackendReport {
    pub backend: BackendId,
    pub outcome: BackendOutcome,
    pub elapsed_ms: u64,
}

impl BackendReport {
    pub fn record(&self) -> Option<&ListingRecord> {
        match &self.outcome {
            BackendOutcome::Extracted { record } => Some(record),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&FetchFailure> {
        match &self.outcome {
            BackendOutcome::Failed { failure } => Some(failure),
            _ => None,
        }
    }
}

/// Result of one extraction run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionReport {
    pub record: ListingRecord,

    /// One entry per configured backend, in [`BackendId`] order
    pub backends: Vec<BackendReport>,

    pub elapsed_ms: u64,

    /// Racing stopped on a usable record before every backend finished
    pub stopped_early: bool,
}

impl ExtractionReport {
    /// Backends that returned content.
    pub fn succeeded(&self) -> Vec<BackendId> {
        self.backends
            .iter()
            .filter(|b| b.record().is_some())
            .map(|b| b.backend)
            .collect()
    }

    pub fn backend(&self, id: BackendId) -> Option<&BackendReport> {
        self.backends.iter().find(|b| b.backend == id)
    }
}

pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
