//! Races the fetch backends under one deadline and merges their records.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::merge::MergePrecedence;
use super::race::Race;
use super::report::{BackendOutcome, ExtractionReport};
use crate::backends::{
    DirectBackend, MinIntervalLimiter, ReaderProxyBackend, RenderingProxyBackend,
    ReqwestHttpClient,
};
use crate::error::{ConfigResult, ExtractError, FetchFailure, Result};
use crate::extract::Extractor;
use crate::security::UrlValidator;
use crate::traits::backend::FetchBackend;
use crate::traits::http::HttpClient;
use crate::types::config::{EarlyExit, ExtractionConfig, PipelineConfig};
use crate::types::fetch::BackendId;
use crate::types::listing::ListingRecord;

/// Entry point of the extraction pipeline.
///
/// # Example
///
/// ```rust,ignore
/// use listing_extraction::{Orchestrator, PipelineConfig};
///
/// let orchestrator = Orchestrator::from_config(PipelineConfig::from_env()?)?;
/// match orchestrator.extract_listing("https://www.rightmove.co.uk/properties/1").await {
///     Ok(record) if record.is_usable() => println!("{:?}", record),
///     Ok(_) => println!("fetched, but enter the details manually"),
///     Err(e) => println!("try again later: {}", e),
/// }
/// ```
pub struct Orchestrator {
    backends: Vec<Arc<dyn FetchBackend>>,
    extractor: Arc<Extractor>,
    precedence: MergePrecedence,
    early_exit: EarlyExit,
    deadline: Duration,
    validator: UrlValidator,
}

impl Orchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::default()
    }

    /// Build the production backends described by `config`.
    ///
    /// All backends share one HTTP client. The rendering proxy is only
    /// built when an API key is configured.
    pub fn from_config(config: PipelineConfig) -> ConfigResult<Self> {
        let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new()?);
        let mut builder = Self::builder()
            .extraction(config.extraction)
            .precedence(config.precedence)
            .early_exit(config.early_exit)
            .deadline(config.deadline);

        if let Some(direct) = config.direct {
            let limiter = Arc::new(MinIntervalLimiter::new(direct.min_delay));
            builder = builder.backend(DirectBackend::new(Arc::clone(&http), limiter, direct));
        }
        if let Some(rendering) = config.rendering {
            builder = builder.backend(RenderingProxyBackend::new(Arc::clone(&http), rendering));
        }
        if let Some(reader) = config.reader {
            builder = builder.backend(ReaderProxyBackend::new(Arc::clone(&http), reader));
        }

        let orchestrator = builder.build();
        info!(backends = ?orchestrator.backend_ids(), "Orchestrator configured");
        Ok(orchestrator)
    }

    pub fn backend_ids(&self) -> Vec<BackendId> {
        self.backends.iter().map(|b| b.id()).collect()
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Extract a listing using the configured deadline.
    ///
    /// A record with no resolved fields is returned as `Ok`; only a URL
    /// rejection or total fetch failure is an error.
    pub async fn extract_listing(&self, url: &str) -> Result<ListingRecord> {
        let deadline = Instant::now() + self.deadline;
        self.extract_listing_with_deadline(url, deadline)
            .await
            .map(|report| report.record)
    }

    /// Extract a listing before `deadline`, with per-backend diagnostics.
    pub async fn extract_listing_with_deadline(
        &self,
        url: &str,
        deadline: Instant,
    ) -> Result<ExtractionReport> {
        let url = self
            .validator
            .validate(url)
            .map_err(|e| {
                warn!(url = %url, error = %e, "Rejected listing URL");
                e
            })?
            .to_string();

        if self.backends.is_empty() {
            return Err(ExtractError::NoBackends);
        }

        let mut race = Race::new(self.backend_ids());
        info!(url = %url, backends = self.backends.len(), "Starting backend race");
        race.start();
        let started = Instant::now();

        let mut tasks = JoinSet::new();
        // Maps a task back to its backend when the task dies without a result
        let mut task_backends = HashMap::new();
        for backend in &self.backends {
            let backend = Arc::clone(backend);
            let extractor = Arc::clone(&self.extractor);
            let url = url.clone();

            let backend_id = backend.id();
            let handle = tasks.spawn(async move {
                let id = backend.id();
                let result = backend.fetch(&url, deadline).await;
                let elapsed = result.elapsed;
                let outcome = match result.outcome {
                    Ok(content) => BackendOutcome::Extracted {
                        record: extractor.extract(&content, id),
                    },
                    Err(failure) => BackendOutcome::Failed { failure },
                };
                (id, outcome, elapsed)
            });
            task_backends.insert(handle.id(), backend_id);
        }

        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Err(_) => {
                    warn!(url = %url, still_running = tasks.len(), "Deadline elapsed during race");
                    break;
                }
                Ok(None) => break,
                Ok(Some(Err(e))) => {
                    let Some(&id) = task_backends.get(&e.id()) else {
                        warn!(error = %e, "Unknown backend task did not complete");
                        continue;
                    };
                    if !e.is_panic() {
                        warn!(backend = %id, error = %e, "Backend task cancelled");
                        continue;
                    }
                    warn!(backend = %id, error = %e, "Backend task panicked");
                    let outcome = BackendOutcome::Failed {
                        failure: FetchFailure::network("backend task panicked"),
                    };
                    if race.record(id, outcome, started.elapsed(), self.early_exit) {
                        break;
                    }
                }
                Ok(Some(Ok((id, outcome, elapsed)))) => {
                    debug!(backend = %id, elapsed_ms = elapsed.as_millis() as u64, "Backend finished");
                    if race.record(id, outcome, elapsed, self.early_exit) {
                        break;
                    }
                }
            }
        }

        // Results from anything still running are discarded
        tasks.abort_all();

        race.finish(&self.precedence)
    }
}

/// Builder for [`Orchestrator`].
pub struct OrchestratorBuilder {
    backends: Vec<Arc<dyn FetchBackend>>,
    extraction: ExtractionConfig,
    precedence: MergePrecedence,
    early_exit: EarlyExit,
    deadline: Duration,
    validator: UrlValidator,
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        let defaults = PipelineConfig::default();
        Self {
            backends: Vec::new(),
            extraction: defaults.extraction,
            precedence: defaults.precedence,
            early_exit: defaults.early_exit,
            deadline: defaults.deadline,
            validator: UrlValidator::default(),
        }
    }
}

impl OrchestratorBuilder {
    /// Add a backend, replacing any earlier one with the same id.
    pub fn backend(self, backend: impl FetchBackend + 'static) -> Self {
        self.shared_backend(Arc::new(backend))
    }

    pub fn shared_backend(mut self, backend: Arc<dyn FetchBackend>) -> Self {
        let id = backend.id();
        self.backends.retain(|b| b.id() != id);
        self.backends.push(backend);
        self
    }

    pub fn extraction(mut self, config: ExtractionConfig) -> Self {
        self.extraction = config;
        self
    }

    pub fn precedence(mut self, precedence: MergePrecedence) -> Self {
        self.precedence = precedence;
        self
    }

    pub fn early_exit(mut self, early_exit: EarlyExit) -> Self {
        self.early_exit = early_exit;
        self
    }

    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn validator(mut self, validator: UrlValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn build(self) -> Orchestrator {
        Orchestrator {
            backends: self.backends,
            extractor: Arc::new(Extractor::new(self.extraction)),
            precedence: self.precedence,
            early_exit: self.early_exit,
            deadline: self.deadline,
            validator: self.validator,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FailureKind, FetchFailure};
    use crate::testing::MockBackend;

    const URL: &str = "https://www.example.co.uk/properties/1";

    const LISTING_HTML: &str = "<html><head><title>3 bed semi for sale - Orme Avenue, Manchester M24 1JZ</title></head>\
        <body><p>£185,000</p></body></html>";

    #[tokio::test]
    async fn test_rejects_internal_url() {
        let orchestrator = Orchestrator::builder()
            .backend(MockBackend::markup(BackendId::Direct, LISTING_HTML))
            .build();

        let result = orchestrator.extract_listing("http://169.254.169.254/latest").await;
        assert!(matches!(result, Err(ExtractError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_no_backends() {
        let orchestrator = Orchestrator::builder().build();
        assert!(matches!(
            orchestrator.extract_listing(URL).await,
            Err(ExtractError::NoBackends)
        ));
    }

    #[tokio::test]
    async fn test_single_backend_record() {
        let backend = MockBackend::markup(BackendId::Direct, LISTING_HTML);
        let orchestrator = Orchestrator::builder().backend(backend.clone()).build();

        let record = orchestrator.extract_listing(URL).await.unwrap();
        assert_eq!(record.price, Some(185_000));
        assert_eq!(record.postcode.as_deref(), Some("M24 1JZ"));
        assert_eq!(backend.calls(), vec![URL.to_string()]);
    }

    #[tokio::test]
    async fn test_fetched_but_empty_is_not_failure() {
        let orchestrator = Orchestrator::builder()
            .backend(MockBackend::markup(BackendId::Direct, "<html><body>Nothing here</body></html>"))
            .build();

        let record = orchestrator.extract_listing(URL).await.unwrap();
        assert!(record.is_empty());
        assert!(!record.is_usable());
    }

    #[tokio::test(start_paused = true)]
    async fn test_early_exit_abandons_slow_backend() {
        let orchestrator = Orchestrator::builder()
            .backend(MockBackend::markup(BackendId::Direct, LISTING_HTML))
            .backend(
                MockBackend::markup(BackendId::RenderingProxy, LISTING_HTML)
                    .with_delay(Duration::from_secs(15)),
            )
            .deadline(Duration::from_secs(20))
            .build();

        let started = Instant::now();
        let report = orchestrator
            .extract_listing_with_deadline(URL, started + Duration::from_secs(20))
            .await
            .unwrap();

        assert!(report.stopped_early);
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(
            report.backend(BackendId::RenderingProxy).unwrap().outcome,
            BackendOutcome::Abandoned
        );
    }

    #[tokio::test]
    async fn test_duplicate_backend_replaced() {
        let orchestrator = Orchestrator::builder()
            .backend(MockBackend::failing(BackendId::Direct, FetchFailure::blocked("captcha")))
            .backend(MockBackend::markup(BackendId::Direct, LISTING_HTML))
            .build();

        assert_eq!(orchestrator.backend_ids(), vec![BackendId::Direct]);
        assert!(orchestrator.extract_listing(URL).await.is_ok());
    }

    #[tokio::test]
    async fn test_failure_kinds_reported() {
        let orchestrator = Orchestrator::builder()
            .backend(MockBackend::failing(BackendId::Direct, FetchFailure::from_status(404)))
            .build();

        match orchestrator.extract_listing(URL).await {
            Err(ExtractError::AllBackendsFailed { failures }) => {
                assert_eq!(failures, vec![(BackendId::Direct, FetchFailure::from_status(404))]);
                assert_eq!(failures[0].1.kind, FailureKind::HttpError);
            }
            other => panic!("expected AllBackendsFailed, got {:?}", other),
        }
    }

    struct PanickingBackend;

    #[async_trait::async_trait]
    impl FetchBackend for PanickingBackend {
        fn id(&self) -> BackendId {
            BackendId::RenderingProxy
        }

        async fn fetch(&self, _url: &str, _deadline: Instant) -> crate::types::fetch::FetchResult {
            panic!("render client bug")
        }
    }

    #[tokio::test]
    async fn test_panicked_backend_reported_as_network_failure() {
        let orchestrator = Orchestrator::builder()
            .backend(MockBackend::failing(BackendId::Direct, FetchFailure::blocked("captcha")))
            .backend(PanickingBackend)
            .build();

        let report = orchestrator
            .extract_listing_with_deadline(URL, Instant::now() + Duration::from_secs(5))
            .await;
        match report {
            Err(ExtractError::AllBackendsFailed { failures }) => {
                let (_, failure) = failures
                    .iter()
                    .find(|(id, _)| *id == BackendId::RenderingProxy)
                    .unwrap();
                assert_eq!(failure.kind, FailureKind::NetworkError);
                assert!(failure.detail.contains("panicked"));
            }
            other => panic!("expected AllBackendsFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_from_config_respects_disabled_backends() {
        let config = PipelineConfig {
            direct: None,
            ..PipelineConfig::default()
        };
        let orchestrator = Orchestrator::from_config(config).unwrap();
        assert_eq!(orchestrator.backend_ids(), vec![BackendId::ReaderProxy]);

        let with_key = PipelineConfig::default()
            .with_rendering_proxy(crate::types::config::RenderingProxyConfig::new("key"));
        let orchestrator = Orchestrator::from_config(with_key).unwrap();
        assert_eq!(
            orchestrator.backend_ids(),
            vec![BackendId::Direct, BackendId::RenderingProxy, BackendId::ReaderProxy]
        );
    }
}
