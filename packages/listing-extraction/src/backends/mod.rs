//! Fetch backend implementations.
//!
//! # Available Backends
//!
//! - `DirectBackend` - Browser-like GET against the listing site
//! - `RenderingProxyBackend` - Remote JavaScript rendering through proxies
//! - `ReaderProxyBackend` - Remote boilerplate-stripped text conversion
//!
//! All three share [`FailureKind`](crate::error::FailureKind) and honor the
//! caller's deadline.

mod block;
mod direct;
mod http;
mod rate_limit;
mod reader_proxy;
mod rendering_proxy;

pub use block::{BlockDetector, DEFAULT_BLOCK_SIGNATURES};
pub use direct::DirectBackend;
pub use http::ReqwestHttpClient;
pub use rate_limit::{MinIntervalLimiter, NoopLimiter};
pub use reader_proxy::ReaderProxyBackend;
pub use rendering_proxy::RenderingProxyBackend;

// Re-export from traits for convenience
pub use crate::traits::backend::FetchBackend;

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

use crate::error::FetchFailure;

/// Per-request timeout: the backend's cap, shortened to what is left
/// before `deadline`.
pub(crate) fn budget(cap: Duration, deadline: Instant) -> Duration {
    cap.min(deadline.saturating_duration_since(Instant::now()))
}

/// Run `work` and turn an elapsed deadline into a typed timeout.
pub(crate) async fn run_before<T, F>(deadline: Instant, work: F) -> Result<T, FetchFailure>
where
    F: Future<Output = Result<T, FetchFailure>>,
{
    match tokio::time::timeout_at(deadline, work).await {
        Ok(result) => result,
        Err(_) => Err(FetchFailure::timeout("deadline elapsed")),
    }
}
