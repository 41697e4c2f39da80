//! Request throttling owned by a backend instance.

use async_trait::async_trait;

/// A gate a backend passes through before every outbound request.
///
/// Each backend instance owns its limiter, injected at construction, so
/// there is no process-wide throttling state and tests can use
/// [`NoopLimiter`](crate::backends::NoopLimiter).
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Wait until a request may be sent.
    async fn acquire(&self);
}
