//! Testing utilities including mock implementations.
//!
//! These let applications and tests drive the orchestrator and backends
//! without making network calls.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::time::Instant;

use crate::error::FetchFailure;
use crate::traits::backend::FetchBackend;
use crate::traits::http::{HttpClient, HttpRequest, HttpResponse, TransportError};
use crate::types::fetch::{BackendId, FetchResult, FetchedContent};

/// A mock fetch backend with a canned outcome.
///
/// Clones share call tracking, so a clone handed to the orchestrator can be
/// inspected afterwards.
///
/// # Example
///
/// ```rust
/// use listing_extraction::testing::MockBackend;
/// use listing_extraction::types::fetch::BackendId;
///
/// let direct = MockBackend::markup(BackendId::Direct, "<title>Listing</title>");
/// assert!(direct.calls().is_empty());
/// ```
#[derive(Clone)]
pub struct MockBackend {
    id: BackendId,
    outcome: Result<FetchedContent, FetchFailure>,
    delay: Duration,

    /// Keep sleeping past the deadline instead of timing out
    ignore_deadline: bool,

    calls: Arc<RwLock<Vec<String>>>,
}

impl MockBackend {
    /// Backend that returns `content`.
    pub fn new(id: BackendId, content: FetchedContent) -> Self {
        Self {
            id,
            outcome: Ok(content),
            delay: Duration::ZERO,
            ignore_deadline: false,
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Backend that returns HTML.
    pub fn markup(id: BackendId, body: impl Into<String>) -> Self {
        Self::new(id, FetchedContent::markup(body))
    }

    /// Backend that returns reader-proxy text.
    pub fn text(id: BackendId, body: impl Into<String>) -> Self {
        Self::new(id, FetchedContent::text(body))
    }

    /// Backend that always fails.
    pub fn failing(id: BackendId, failure: FetchFailure) -> Self {
        Self {
            outcome: Err(failure),
            ..Self::markup(id, "")
        }
    }

    /// Respond after `delay`, or time out if the deadline comes first.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Sleep for `delay` even past the deadline, like a backend that ignores
    /// cancellation budgets.
    pub fn ignoring_deadline(mut self) -> Self {
        self.ignore_deadline = true;
        self
    }

    /// URLs this backend was asked to fetch.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }
}

#[async_trait]
impl FetchBackend for MockBackend {
    fn id(&self) -> BackendId {
        self.id
    }

    async fn fetch(&self, url: &str, deadline: Instant) -> FetchResult {
        let started = Instant::now();
        self.calls.write().unwrap().push(url.to_string());

        if !self.delay.is_zero() {
            if self.ignore_deadline {
                tokio::time::sleep(self.delay).await;
            } else if tokio::time::timeout_at(deadline, tokio::time::sleep(self.delay))
                .await
                .is_err()
            {
                return FetchResult::failure(
                    self.id,
                    FetchFailure::timeout("deadline elapsed"),
                    started.elapsed(),
                );
            }
        }

        match &self.outcome {
            Ok(content) => FetchResult::success(self.id, content.clone(), started.elapsed()),
            Err(failure) => FetchResult::failure(self.id, failure.clone(), started.elapsed()),
        }
    }
}

/// A mock HTTP client that replays scripted responses in order.
///
/// Once the script runs out every request fails with a network error.
#[derive(Clone, Default)]
pub struct MockHttpClient {
    responses: Arc<RwLock<VecDeque<Result<HttpResponse, TransportError>>>>,
    delay: Duration,
    requests: Arc<RwLock<Vec<HttpRequest>>>,
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next response.
    pub fn with_response(self, response: Result<HttpResponse, TransportError>) -> Self {
        self.responses.write().unwrap().push_back(response);
        self
    }

    /// Wait this long before answering each request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.read().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.read().unwrap().len()
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.write().unwrap().push(request);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.responses
            .write()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Network("no scripted response".into())))
    }
}
