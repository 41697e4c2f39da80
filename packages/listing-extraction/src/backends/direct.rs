//! Direct HTTP backend.
//!
//! Issues a single browser-like GET against the listing site itself:
//! rotating user agent, realistic header set, per-instance request spacing,
//! one retry on transient failures, and block-page detection.

use async_trait::async_trait;
use rand::{rng, Rng};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::block::BlockDetector;
use super::{budget, run_before};
use crate::error::FetchFailure;
use crate::traits::backend::FetchBackend;
use crate::traits::http::{HttpClient, HttpRequest, TransportError};
use crate::traits::limiter::RateLimiter;
use crate::types::config::DirectConfig;
use crate::types::fetch::{BackendId, FetchResult, FetchedContent};

/// Backend that fetches the listing page directly.
///
/// # Example
///
/// ```rust,ignore
/// let limiter = Arc::new(MinIntervalLimiter::new(Duration::from_secs(1)));
/// let backend = DirectBackend::new(http, limiter, DirectConfig::default());
/// ```
pub struct DirectBackend {
    http: Arc<dyn HttpClient>,
    limiter: Arc<dyn RateLimiter>,
    detector: BlockDetector,
    config: DirectConfig,
}

impl DirectBackend {
    pub fn new(
        http: Arc<dyn HttpClient>,
        limiter: Arc<dyn RateLimiter>,
        config: DirectConfig,
    ) -> Self {
        Self {
            http,
            limiter,
            detector: BlockDetector::default(),
            config,
        }
    }

    /// Replace the block-page detector.
    pub fn with_detector(mut self, detector: BlockDetector) -> Self {
        self.detector = detector;
        self
    }

    fn pick_user_agent(&self) -> &str {
        if self.config.user_agents.is_empty() {
            return "Mozilla/5.0";
        }
        let i = rng().random_range(0..self.config.user_agents.len());
        &self.config.user_agents[i]
    }

    fn build_request(&self, url: &str, deadline: Instant) -> HttpRequest {
        HttpRequest::get(url, budget(self.config.request_timeout, deadline))
            .header("User-Agent", self.pick_user_agent())
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            )
            .header("Accept-Language", self.config.accept_language.as_str())
            .header("Referer", self.config.referer.as_str())
            .header("DNT", "1")
            .header("Upgrade-Insecure-Requests", "1")
            .header("Sec-Fetch-Dest", "document")
            .header("Sec-Fetch-Mode", "navigate")
            .header("Sec-Fetch-Site", "cross-site")
            .header("Sec-Fetch-User", "?1")
            .header("Cache-Control", "max-age=0")
    }

    async fn attempt(&self, url: &str, deadline: Instant) -> Result<FetchedContent, FetchFailure> {
        self.limiter.acquire().await;

        let request = self.build_request(url, deadline);
        let response = self.http.get(request).await.map_err(|e| match e {
            TransportError::Timeout => FetchFailure::timeout(format!("GET {} timed out", url)),
            TransportError::Network(msg) => FetchFailure::network(msg),
        })?;

        if !response.is_success() {
            return Err(FetchFailure::from_status(response.status));
        }

        if let Some(signature) = self.detector.detect(&response.body) {
            return Err(FetchFailure::blocked(format!(
                "matched block signature {:?}",
                signature
            )));
        }

        Ok(FetchedContent::markup(response.body))
    }

    async fn fetch_with_retry(&self, url: &str, deadline: Instant) -> Result<FetchedContent, FetchFailure> {
        match self.attempt(url, deadline).await {
            Err(failure) if failure.is_retryable() => {
                warn!(
                    url = %url,
                    error = %failure,
                    backoff_ms = self.config.retry_backoff.as_millis() as u64,
                    "Direct fetch failed, retrying once"
                );
                tokio::time::sleep(self.config.retry_backoff).await;
                self.attempt(url, deadline).await
            }
            other => other,
        }
    }
}

#[async_trait]
impl FetchBackend for DirectBackend {
    fn id(&self) -> BackendId {
        BackendId::Direct
    }

    async fn fetch(&self, url: &str, deadline: Instant) -> FetchResult {
        let started = Instant::now();
        debug!(url = %url, "Direct fetch starting");

        let outcome = run_before(deadline, self.fetch_with_retry(url, deadline)).await;
        let elapsed = started.elapsed();

        match outcome {
            Ok(content) => {
                info!(
                    url = %url,
                    elapsed_ms = elapsed.as_millis() as u64,
                    content_length = content.body.len(),
                    "Direct fetch succeeded"
                );
                FetchResult::success(self.id(), content, elapsed)
            }
            Err(failure) => {
                warn!(url = %url, error = %failure, "Direct fetch failed");
                FetchResult::failure(self.id(), failure, elapsed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::NoopLimiter;
    use crate::error::FailureKind;
    use crate::testing::MockHttpClient;
    use crate::traits::http::HttpResponse;
    use std::time::Duration;

    fn backend(http: MockHttpClient) -> DirectBackend {
        DirectBackend::new(
            Arc::new(http),
            Arc::new(NoopLimiter),
            DirectConfig::default().with_retry_backoff(Duration::from_millis(10)),
        )
    }

    fn deadline() -> Instant {
        Instant::now() + Duration::from_secs(5)
    }

    #[tokio::test]
    async fn test_success_returns_markup() {
        let http = MockHttpClient::new().with_response(Ok(HttpResponse::ok("<title>Listing</title>")));
        let result = backend(http.clone()).fetch("https://example.com/p/1", deadline()).await;

        let content = result.content().unwrap();
        assert_eq!(content.body, "<title>Listing</title>");
        assert_eq!(http.request_count(), 1);
    }

    #[tokio::test]
    async fn test_sends_browser_headers() {
        let http = MockHttpClient::new().with_response(Ok(HttpResponse::ok("ok")));
        backend(http.clone()).fetch("https://example.com/p/1", deadline()).await;

        let request = &http.requests()[0];
        assert!(DirectConfig::default()
            .user_agents
            .iter()
            .any(|ua| Some(ua.as_str()) == request.header_value("User-Agent")));
        assert_eq!(
            request.header_value("Referer"),
            Some("https://www.google.com/search?q=property+for+sale+uk")
        );
        assert_eq!(request.header_value("Sec-Fetch-Mode"), Some("navigate"));
        assert!(request.header_value("Accept-Language").unwrap().starts_with("en-GB"));
    }

    #[tokio::test]
    async fn test_block_page_is_not_returned_or_retried() {
        let http = MockHttpClient::new()
            .with_response(Ok(HttpResponse::ok("<h1>Please solve this captcha</h1>")))
            .with_response(Ok(HttpResponse::ok("<title>Listing</title>")));
        let result = backend(http.clone()).fetch("https://example.com/p/1", deadline()).await;

        assert_eq!(result.failure_kind(), Some(FailureKind::BlockedByAntiBot));
        assert_eq!(http.request_count(), 1);
    }

    #[tokio::test]
    async fn test_network_error_retried_once() {
        let http = MockHttpClient::new()
            .with_response(Err(TransportError::Network("connection reset".into())))
            .with_response(Ok(HttpResponse::ok("<title>Listing</title>")));
        let result = backend(http.clone()).fetch("https://example.com/p/1", deadline()).await;

        assert!(result.content().is_some());
        assert_eq!(http.request_count(), 2);
    }

    #[tokio::test]
    async fn test_second_failure_is_reported() {
        let http = MockHttpClient::new()
            .with_response(Ok(HttpResponse::new(503, "")))
            .with_response(Ok(HttpResponse::new(503, "")));
        let result = backend(http.clone()).fetch("https://example.com/p/1", deadline()).await;

        assert_eq!(result.failure_kind(), Some(FailureKind::HttpError));
        assert_eq!(http.request_count(), 2);
    }

    #[tokio::test]
    async fn test_forbidden_is_blocking_without_retry() {
        let http = MockHttpClient::new().with_response(Ok(HttpResponse::new(403, "Forbidden")));
        let result = backend(http.clone()).fetch("https://example.com/p/1", deadline()).await;

        assert_eq!(result.failure_kind(), Some(FailureKind::BlockedByAntiBot));
        assert_eq!(http.request_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_yields_timeout() {
        let http = MockHttpClient::new()
            .with_delay(Duration::from_secs(30))
            .with_response(Ok(HttpResponse::ok("late")));
        let deadline = Instant::now() + Duration::from_secs(2);
        let result = backend(http).fetch("https://example.com/p/1", deadline).await;

        assert_eq!(result.failure_kind(), Some(FailureKind::Timeout));
        assert!(result.elapsed <= Duration::from_secs(3));
    }
}
