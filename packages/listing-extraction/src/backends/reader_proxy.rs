//! Reader-proxy backend.
//!
//! Delegates to a remote service that converts the page into clean,
//! boilerplate-stripped markdown. Fast and resilient to markup changes, but
//! DOM structure is lost, so extraction leans on positional heuristics.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::block::BlockDetector;
use super::{budget, run_before};
use crate::error::FetchFailure;
use crate::traits::backend::FetchBackend;
use crate::traits::http::{HttpClient, HttpRequest, TransportError};
use crate::types::config::ReaderProxyConfig;
use crate::types::fetch::{BackendId, FetchResult, FetchedContent};

/// Backend that fetches reader-mode text through the proxy.
pub struct ReaderProxyBackend {
    http: Arc<dyn HttpClient>,
    detector: BlockDetector,
    config: ReaderProxyConfig,
}

impl ReaderProxyBackend {
    pub fn new(http: Arc<dyn HttpClient>, config: ReaderProxyConfig) -> Self {
        Self {
            http,
            detector: BlockDetector::default(),
            config,
        }
    }

    pub fn with_detector(mut self, detector: BlockDetector) -> Self {
        self.detector = detector;
        self
    }

    /// The service takes the target URL appended to its own.
    fn prefixed_url(&self, url: &str) -> String {
        format!("{}{}", self.config.endpoint, url)
    }

    async fn read(&self, url: &str, deadline: Instant) -> Result<FetchedContent, FetchFailure> {
        let request = HttpRequest::get(
            self.prefixed_url(url),
            budget(self.config.request_timeout, deadline),
        )
        .header("X-Return-Format", self.config.return_format.as_str())
        .header("X-Remove-Selector", self.config.remove_selectors.as_str());

        let response = self.http.get(request).await.map_err(|e| match e {
            TransportError::Timeout => FetchFailure::timeout("reader proxy timed out"),
            TransportError::Network(msg) => FetchFailure::network(msg),
        })?;

        if !response.is_success() {
            return Err(FetchFailure::from_status(response.status));
        }

        if let Some(signature) = self.detector.detect(&response.body) {
            return Err(FetchFailure::blocked(format!(
                "reader text matched block signature {:?}",
                signature
            )));
        }

        Ok(FetchedContent::text(response.body))
    }
}

#[async_trait]
impl FetchBackend for ReaderProxyBackend {
    fn id(&self) -> BackendId {
        BackendId::ReaderProxy
    }

    async fn fetch(&self, url: &str, deadline: Instant) -> FetchResult {
        let started = Instant::now();
        debug!(url = %url, "Reader proxy fetch starting");

        let outcome = run_before(deadline, self.read(url, deadline)).await;
        let elapsed = started.elapsed();

        match outcome {
            Ok(content) => {
                info!(
                    url = %url,
                    elapsed_ms = elapsed.as_millis() as u64,
                    content_length = content.body.len(),
                    "Reader proxy fetch succeeded"
                );
                FetchResult::success(self.id(), content, elapsed)
            }
            Err(failure) => {
                warn!(url = %url, error = %failure, "Reader proxy fetch failed");
                FetchResult::failure(self.id(), failure, elapsed)
            }
        }
    }
}
