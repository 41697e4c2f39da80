//! Detection of anti-automation challenge pages.

/// Case-insensitive substrings that mark a response as a challenge page.
pub const DEFAULT_BLOCK_SIGNATURES: &[&str] = &[
    "captcha",
    "access denied",
    "you appear to be using a very old browser",
    "attention required! | cloudflare",
    "just a moment...",
    "cf-browser-verification",
    "are you a robot",
    "pardon our interruption",
    "unusual traffic",
    "too many requests",
    "rate limit exceeded",
    "request blocked",
];

/// Scans response bodies for block signatures.
#[derive(Debug, Clone)]
pub struct BlockDetector {
    signatures: Vec<String>,
}

impl Default for BlockDetector {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCK_SIGNATURES.iter().copied())
    }
}

impl BlockDetector {
    pub fn new<S: Into<String>>(signatures: impl IntoIterator<Item = S>) -> Self {
        Self {
            signatures: signatures
                .into_iter()
                .map(|s| s.into().to_lowercase())
                .collect(),
        }
    }

    /// Add a site-specific signature.
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signatures.push(signature.into().to_lowercase());
        self
    }

    /// The first signature found in `body`, if any.
    pub fn detect(&self, body: &str) -> Option<&str> {
        let lower = body.to_lowercase();
        self.signatures
            .iter()
            .find(|sig| lower.contains(sig.as_str()))
            .map(|sig| sig.as_str())
    }
}
