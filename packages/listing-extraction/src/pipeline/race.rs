//! Bookkeeping for one race: `Idle → Racing → Merging → Done`.

use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::merge::MergePrecedence;
use super::report::{millis, BackendOutcome, BackendReport, ExtractionReport};
use crate::error::{ExtractError, FetchFailure, Result};
use crate::types::config::EarlyExit;
use crate::types::fetch::BackendId;
use crate::types::listing::ListingRecord;

/// Orchestrator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaceState {
    Idle,
    Racing,
    Merging,
    Done,
}

impl RaceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Racing => "racing",
            Self::Merging => "merging",
            Self::Done => "done",
        }
    }
}

/// Collected outcomes of one race.
#[derive(Debug)]
pub(crate) struct Race {
    state: RaceState,
    entrants: Vec<BackendId>,
    started: Instant,
    finished: BTreeMap<BackendId, (BackendOutcome, Duration)>,
    stopped_early: bool,
}

impl Race {
    pub fn new(entrants: Vec<BackendId>) -> Self {
        Self {
            state: RaceState::Idle,
            entrants,
            started: Instant::now(),
            finished: BTreeMap::new(),
            stopped_early: false,
        }
    }

    pub fn state(&self) -> RaceState {
        self.state
    }

    fn transition(&mut self, next: RaceState) {
        debug!(from = self.state.as_str(), to = next.as_str(), "Race state transition");
        self.state = next;
    }

    pub fn start(&mut self) {
        self.started = Instant::now();
        self.transition(RaceState::Racing);
    }

    /// Record a finished backend. Returns true when racing may stop.
    pub fn record(
        &mut self,
        backend: BackendId,
        outcome: BackendOutcome,
        elapsed: Duration,
        early_exit: EarlyExit,
    ) -> bool {
        if self.state != RaceState::Racing {
            warn!(backend = %backend, state = self.state.as_str(), "Discarding late backend result");
            return false;
        }

        let usable = matches!(&outcome, BackendOutcome::Extracted { record } if record.is_usable());
        self.finished.insert(backend, (outcome, elapsed));

        if self.finished.len() >= self.entrants.len() {
            return true;
        }
        if early_exit == EarlyExit::FirstUsableRecord && usable {
            self.stopped_early = true;
            info!(backend = %backend, "Usable record received, ending race early");
            return true;
        }
        false
    }

    /// Merge what arrived and produce the final outcome.
    ///
    /// Entrants with no recorded result are reported as abandoned and count
    /// as timeouts.
    pub fn finish(mut self, precedence: &MergePrecedence) -> Result<ExtractionReport> {
        self.transition(RaceState::Merging);
        let race_elapsed = self.started.elapsed();

        let mut records: BTreeMap<BackendId, ListingRecord> = BTreeMap::new();
        let mut failures: Vec<(BackendId, FetchFailure)> = Vec::new();
        let mut backends = Vec::new();

        let mut entrants = self.entrants.clone();
        entrants.sort();
        entrants.dedup();

        for backend in entrants {
            let (outcome, elapsed) = self
                .finished
                .remove(&backend)
                .unwrap_or((BackendOutcome::Abandoned, race_elapsed));

            match &outcome {
                BackendOutcome::Extracted { record } => {
                    records.insert(backend, record.clone());
                }
                BackendOutcome::Failed { failure } => {
                    failures.push((backend, failure.clone()));
                }
                BackendOutcome::Abandoned => {
                    if self.stopped_early {
                        debug!(backend = %backend, "Backend abandoned after early exit");
                    } else {
                        warn!(backend = %backend, "Backend abandoned at deadline");
                        failures.push((backend, FetchFailure::timeout("abandoned at deadline")));
                    }
                }
            }

            backends.push(BackendReport {
                backend,
                outcome,
                elapsed_ms: millis(elapsed),
            });
        }

        self.transition(RaceState::Done);

        if records.is_empty() {
            warn!(failed = failures.len(), "All backends failed");
            return Err(ExtractError::AllBackendsFailed { failures });
        }

        let record = precedence.merge(&records);
        info!(
            resolved = record.resolved_count(),
            usable = record.is_usable(),
            succeeded = records.len(),
            elapsed_ms = millis(race_elapsed),
            "Merged listing record"
        );

        Ok(ExtractionReport {
            record,
            backends,
            elapsed_ms: millis(race_elapsed),
            stopped_early: self.stopped_early,
        })
    }
}
