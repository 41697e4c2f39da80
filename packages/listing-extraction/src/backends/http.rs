//! reqwest-backed [`HttpClient`].

use async_trait::async_trait;
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::traits::http::{HttpClient, HttpRequest, HttpResponse, TransportError};

/// Maximum redirects followed per request
const MAX_REDIRECTS: usize = 10;

/// Production HTTP client shared by every backend.
///
/// Per-request timeouts come from [`HttpRequest::timeout`], so one client
/// serves backends with different latency budgets.
#[derive(Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    /// Create a client that follows redirects.
    pub fn new() -> ConfigResult<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| ConfigError::HttpClient(Box::new(e)))?;
        Ok(Self { client })
    }

    /// Wrap an existing reqwest client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn classify(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Network(error.to_string())
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self.client.get(&request.url).timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let body = response.text().await.map_err(classify)?;

        debug!(
            url = %request.url,
            final_url = %final_url,
            status,
            content_length = body.len(),
            "HTTP GET completed"
        );

        Ok(HttpResponse { status, body })
    }
}
