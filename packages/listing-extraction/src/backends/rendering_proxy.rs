//! Rendering-proxy backend.
//!
//! Delegates the fetch to a remote service that executes JavaScript and
//! routes through residential proxies in the target country. Slow (tens of
//! seconds) but gets through JavaScript-heavy defenses the direct backend
//! cannot.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::block::BlockDetector;
use super::{budget, run_before};
use crate::error::FetchFailure;
use crate::traits::backend::FetchBackend;
use crate::traits::http::{HttpClient, HttpRequest, TransportError};
use crate::types::config::RenderingProxyConfig;
use crate::types::fetch::{BackendId, FetchResult, FetchedContent};

/// Backend that fetches rendered markup through the proxy API.
pub struct RenderingProxyBackend {
    http: Arc<dyn HttpClient>,
    detector: BlockDetector,
    config: RenderingProxyConfig,
}

impl RenderingProxyBackend {
    pub fn new(http: Arc<dyn HttpClient>, config: RenderingProxyConfig) -> Self {
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

    fn build_request(&self, url: &str, deadline: Instant) -> HttpRequest {
        HttpRequest::get(
            self.config.endpoint.as_str(),
            budget(self.config.request_timeout, deadline),
        )
        .query("api_key", self.config.api_key.expose())
        .query("url", url)
        .query("render_js", self.config.render_js.to_string())
        .query("premium_proxy", self.config.premium_proxy.to_string())
        .query("country_code", self.config.country_code.as_str())
        .query("wait", self.config.wait_millis.to_string())
    }

    async fn render(&self, url: &str, deadline: Instant) -> Result<FetchedContent, FetchFailure> {
        let response = self
            .http
            .get(self.build_request(url, deadline))
            .await
            .map_err(|e| match e {
                TransportError::Timeout => FetchFailure::timeout("rendering proxy timed out"),
                TransportError::Network(msg) => FetchFailure::network(msg),
            })?;

        if !response.is_success() {
            return Err(FetchFailure::from_status(response.status));
        }

        if let Some(signature) = self.detector.detect(&response.body) {
            return Err(FetchFailure::blocked(format!(
                "rendered page matched block signature {:?}",
                signature
            )));
        }

        Ok(FetchedContent::markup(response.body))
    }
}

#[async_trait]
impl FetchBackend for RenderingProxyBackend {
    fn id(&self) -> BackendId {
        BackendId::RenderingProxy
    }

    async fn fetch(&self, url: &str, deadline: Instant) -> FetchResult {
        let started = Instant::now();
        debug!(
            url = %url,
            country = %self.config.country_code,
            api_key = %self.config.api_key,
            render_js = self.config.render_js,
            "Rendering proxy fetch starting"
        );

        let outcome = run_before(deadline, self.render(url, deadline)).await;
        let elapsed = started.elapsed();

        match outcome {
            Ok(content) => {
                info!(
                    url = %url,
                    elapsed_ms = elapsed.as_millis() as u64,
                    content_length = content.body.len(),
                    "Rendering proxy fetch succeeded"
                );
                FetchResult::success(self.id(), content, elapsed)
            }
            Err(failure) => {
                warn!(url = %url, error = %failure, "Rendering proxy fetch failed");
                FetchResult::failure(self.id(), failure, elapsed)
            }
        }
    }
}
