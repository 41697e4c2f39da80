//! Typed errors for the listing extraction pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.
//!
//! Two layers are kept apart on purpose:
//! - [`FetchFailure`] is a backend-level outcome. It lives inside a
//!   [`FetchResult`](crate::types::fetch::FetchResult) and is absorbed by the
//!   orchestrator.
//! - [`ExtractError`] is what crosses the subsystem boundary. A record with
//!   no resolved fields is *not* an error.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::fetch::BackendId;

/// Classification of a backend failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The backend did not complete inside its deadline
    Timeout,

    /// The response was an anti-automation challenge rather than content
    BlockedByAntiBot,

    /// The server answered with a non-success status
    HttpError,

    /// Connection, DNS, TLS or body-read failure
    NetworkError,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::BlockedByAntiBot => "blocked_by_anti_bot",
            Self::HttpError => "http_error",
            Self::NetworkError => "network_error",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed backend failure.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {detail}")]
pub struct FetchFailure {
    /// Failure classification
    pub kind: FailureKind,

    /// Human-readable detail for logs
    pub detail: String,

    /// HTTP status, when the failure came from a response
    pub status: Option<u16>,
}

impl FetchFailure {
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            status: None,
        }
    }

    pub fn timeout(detail: impl Into<String>) -> Self {
        Self::new(FailureKind::Timeout, detail)
    }

    pub fn blocked(detail: impl Into<String>) -> Self {
        Self::new(FailureKind::BlockedByAntiBot, detail)
    }

    pub fn network(detail: impl Into<String>) -> Self {
        Self::new(FailureKind::NetworkError, detail)
    }

    /// Map a non-success HTTP status to a failure.
    ///
    /// 403 and 429 are how listing sites answer automated clients, so they
    /// count as blocking rather than as ordinary HTTP errors.
    pub fn from_status(status: u16) -> Self {
        let kind = match status {
            403 | 429 => FailureKind::BlockedByAntiBot,
            _ => FailureKind::HttpError,
        };
        Self {
            kind,
            detail: format!("HTTP {}", status),
            status: Some(status),
        }
    }

    /// Whether a second attempt against the same backend may succeed.
    ///
    /// Blocking is never retried: the same identity hits the same defense.
    pub fn is_retryable(&self) -> bool {
        match self.kind {
            FailureKind::NetworkError => true,
            FailureKind::HttpError => matches!(self.status, Some(408) | Some(500..=599)),
            FailureKind::Timeout | FailureKind::BlockedByAntiBot => false,
        }
    }
}

/// Errors returned by [`Orchestrator::extract_listing`](crate::pipeline::Orchestrator::extract_listing).
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Every backend failed at the fetch level. The caller should offer
    /// "try again later", not manual entry.
    #[error("all {} backends failed", .failures.len())]
    AllBackendsFailed {
        failures: Vec<(BackendId, FetchFailure)>,
    },

    /// The submitted URL was rejected before any fetch
    #[error("invalid listing URL: {0}")]
    InvalidUrl(#[from] SecurityError),

    /// The orchestrator was built without any backend
    #[error("no fetch backends configured")]
    NoBackends,
}

/// Security-related errors, primarily for SSRF protection.
#[derive(Debug, Error)]
pub enum SecurityError {
    /// URL scheme not allowed (e.g., file://, ftp://)
    #[error("disallowed URL scheme: {0}")]
    DisallowedScheme(String),

    /// Host is blocked (e.g., localhost, internal IPs)
    #[error("blocked host: {0}")]
    BlockedHost(String),

    /// IP in blocked CIDR range (e.g., 10.0.0.0/8)
    #[error("blocked IP range: {0}")]
    BlockedCidr(String),

    /// URL has no host
    #[error("URL has no host")]
    NoHost,

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// Errors raised while loading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable was set but could not be parsed
    #[error("invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },

    /// The HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    HttpClient(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Result type alias for security operations.
pub type SecurityResult<T> = std::result::Result<T, SecurityError>;

/// Result type alias for configuration loading.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
