//! The rendering proxy's API key.
//!
//! The key travels as a query parameter, so it is exposed only while the
//! outbound request is assembled. In `Debug`, `Display` and log fields it
//! shows as a masked fingerprint that is enough to tell two keys apart.

use secrecy::{ExposeSecret, SecretBox};
use std::fmt;

/// Trailing characters left visible in the fingerprint.
const VISIBLE_SUFFIX: usize = 4;

/// Keys shorter than this are masked entirely.
const MIN_FINGERPRINT_LEN: usize = 12;

/// API key for the rendering proxy.
pub struct ProxyApiKey(SecretBox<str>);

impl ProxyApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self(SecretBox::new(Box::from(key.trim())))
    }

    /// Wrap a configured key, treating a blank value as absent.
    pub fn parse(raw: &str) -> Option<Self> {
        (!raw.trim().is_empty()).then(|| Self::new(raw))
    }

    /// The key itself, for the outbound request only.
    pub(crate) fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Masked form safe for logs: `****` plus the last few characters.
    pub fn fingerprint(&self) -> String {
        let key = self.expose();
        let len = key.chars().count();
        if len < MIN_FINGERPRINT_LEN {
            return "****".to_string();
        }
        let suffix: String = key.chars().skip(len - VISIBLE_SUFFIX).collect();
        format!("****{}", suffix)
    }
}

impl Clone for ProxyApiKey {
    fn clone(&self) -> Self {
        Self::new(self.expose())
    }
}

impl fmt::Debug for ProxyApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProxyApiKey({})", self.fingerprint())
    }
}

impl fmt::Display for ProxyApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fingerprint())
    }
}
