//! Fetch outcomes produced by backends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{FailureKind, FetchFailure};

/// Identifies one fetch strategy.
///
/// The derived ordering is the stable fallback order used when a merge
/// precedence list does not mention a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendId {
    /// Plain HTTP GET with browser-like headers
    Direct,

    /// Remote JavaScript-rendering proxy
    RenderingProxy,

    /// Remote reader service returning boilerplate-stripped text
    ReaderProxy,
}

impl BackendId {
    pub const ALL: [BackendId; 3] = [
        BackendId::Direct,
        BackendId::RenderingProxy,
        BackendId::ReaderProxy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::RenderingProxy => "rendering_proxy",
            Self::ReaderProxy => "reader_proxy",
        }
    }
}

impl std::fmt::Display for BackendId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape of fetched content, which decides how it is normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentFormat {
    /// HTML markup (direct and rendering-proxy backends)
    Markup,

    /// Markdown or plain text (reader-proxy backend)
    Text,
}

/// Raw page content returned by a backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchedContent {
    pub body: String,
    pub format: ContentFormat,
    pub fetched_at: DateTime<Utc>,
}

impl FetchedContent {
    pub fn new(body: impl Into<String>, format: ContentFormat) -> Self {
        Self {
            body: body.into(),
            format,
            fetched_at: Utc::now(),
        }
    }

    pub fn markup(body: impl Into<String>) -> Self {
        Self::new(body, ContentFormat::Markup)
    }

    pub fn text(body: impl Into<String>) -> Self {
        Self::new(body, ContentFormat::Text)
    }
}

/// Result of one backend fetch.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub backend: BackendId,
    pub elapsed: Duration,
    pub outcome: Result<FetchedContent, FetchFailure>,
}

impl FetchResult {
    pub fn success(backend: BackendId, content: FetchedContent, elapsed: Duration) -> Self {
        Self {
            backend,
            elapsed,
            outcome: Ok(content),
        }
    }

    pub fn failure(backend: BackendId, failure: FetchFailure, elapsed: Duration) -> Self {
        Self {
            backend,
            elapsed,
            outcome: Err(failure),
        }
    }

    /// Fetched content, if the fetch succeeded.
    pub fn content(&self) -> Option<&FetchedContent> {
        self.outcome.as_ref().ok()
    }

    /// Failure classification, if the fetch failed.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.outcome.as_ref().err().map(|f| f.kind)
    }

    pub fn elapsed_millis(&self) -> u64 {
        self.elapsed.as_millis() as u64
    }
}
