//! Fetch backend trait.
//!
//! A backend turns a listing URL into raw page content, or a typed
//! failure. The orchestrator races every configured backend and never
//! branches on which concrete backend it holds.

use async_trait::async_trait;
use tokio::time::Instant;

use crate::types::fetch::{BackendId, FetchResult};

/// One independent fetch strategy.
///
/// Implementations must honor `deadline`: when the work cannot complete
/// in time they return a [`FailureKind::Timeout`](crate::error::FailureKind::Timeout)
/// result instead of waiting. The orchestrator also enforces the deadline
/// from outside, so a backend that overruns is abandoned and its result
/// discarded.
///
/// # Example
///
/// ```rust,ignore
/// use listing_extraction::backends::ReaderProxyBackend;
///
/// let backend = ReaderProxyBackend::new(http, ReaderProxyConfig::default());
/// let deadline = Instant::now() + Duration::from_secs(10);
/// let result = backend.fetch("https://www.example.co.uk/properties/1", deadline).await;
/// ```
#[async_trait]
pub trait FetchBackend: Send + Sync {
    /// Identifier used for merge precedence and logging.
    fn id(&self) -> BackendId;

    /// Fetch `url` before `deadline`.
    async fn fetch(&self, url: &str, deadline: Instant) -> FetchResult;
}
