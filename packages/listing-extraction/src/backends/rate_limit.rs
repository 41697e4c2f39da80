//! Per-instance request spacing.
//!
//! Uses the governor crate: a quota of one cell replenished every
//! `min_delay` is a leaky bucket of size one, so concurrent callers sharing
//! an instance are let through one at a time, each sleeping out the rest of
//! the interval.

use async_trait::async_trait;
use governor::{Quota, RateLimiter as Governor};
use nonzero_ext::nonzero;
use std::sync::Arc;
use std::time::Duration;

use crate::traits::limiter::RateLimiter;

type DirectGovernor = Governor<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Enforces a minimum interval between requests.
#[derive(Clone)]
pub struct MinIntervalLimiter {
    /// `None` when the interval is zero
    governor: Option<Arc<DirectGovernor>>,
    min_delay: Duration,
}

impl MinIntervalLimiter {
    pub fn new(min_delay: Duration) -> Self {
        let governor = Quota::with_period(min_delay)
            .map(|quota| Arc::new(Governor::direct(quota.allow_burst(nonzero!(1u32)))));
        Self {
            governor,
            min_delay,
        }
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }
}

#[async_trait]
impl RateLimiter for MinIntervalLimiter {
    async fn acquire(&self) {
        if let Some(governor) = &self.governor {
            governor.until_ready().await;
        }
    }
}

/// Lets every request through immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLimiter;

#[async_trait]
impl RateLimiter for NoopLimiter {
    async fn acquire(&self) {}
}
