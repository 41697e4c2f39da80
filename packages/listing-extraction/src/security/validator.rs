//! URL validation for SSRF protection.
//!
//! Listing URLs come straight from end users and are fetched server-side,
//! so they are checked before any backend sees them.

use std::collections::HashSet;
use std::net::IpAddr;

use url::{Host, Url};

use crate::error::{SecurityError, SecurityResult};

/// URL validator for submitted listing URLs.
///
/// Rejects:
/// - Non-HTTP(S) schemes (file://, ftp://)
/// - Internal hostnames (localhost, cloud metadata)
/// - Literal IPs in loopback, private and link-local ranges
#[derive(Debug, Clone)]
pub struct UrlValidator {
    allowed_schemes: HashSet<String>,
    blocked_hosts: HashSet<String>,
    blocked_cidrs: Vec<ipnet::IpNet>,

    /// Hosts that bypass every other check
    allowed_hosts: HashSet<String>,
}

impl Default for UrlValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl UrlValidator {
    /// Create a validator with the default rules.
    pub fn new() -> Self {
        let blocked_cidrs = [
            "10.0.0.0/8",
            "172.16.0.0/12",
            "192.168.0.0/16",
            "169.254.0.0/16", // Link-local / cloud metadata
            "127.0.0.0/8",
            "0.0.0.0/8",
            "::1/128",
            "fc00::/7",
            "fe80::/10",
        ]
        .iter()
        .filter_map(|cidr| cidr.parse().ok())
        .collect();

        Self {
            allowed_schemes: ["http", "https"].into_iter().map(String::from).collect(),
            blocked_hosts: [
                "localhost",
                "metadata.google.internal",
                "metadata.gke.internal",
                "instance-data",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            blocked_cidrs,
            allowed_hosts: HashSet::new(),
        }
    }

    /// Add an allowed host (bypasses validation).
    pub fn allow_host(mut self, host: impl Into<String>) -> Self {
        self.allowed_hosts.insert(host.into());
        self
    }

    /// Block an additional host.
    pub fn block_host(mut self, host: impl Into<String>) -> Self {
        self.blocked_hosts.insert(host.into());
        self
    }

    /// Validate a URL, returning the parsed form.
    pub fn validate(&self, url: &str) -> SecurityResult<Url> {
        let parsed = Url::parse(url.trim())?;

        if !self.allowed_schemes.contains(parsed.scheme()) {
            return Err(SecurityError::DisallowedScheme(parsed.scheme().to_string()));
        }

        let host = parsed.host().ok_or(SecurityError::NoHost)?;
        let host_str = parsed.host_str().unwrap_or_default();

        if self.allowed_hosts.contains(host_str) {
            return Ok(parsed);
        }

        let ip = match host {
            Host::Domain(domain) => {
                let domain = domain.trim_end_matches('.').to_lowercase();
                if self.blocked_hosts.contains(&domain) || domain.ends_with(".localhost") {
                    return Err(SecurityError::BlockedHost(domain));
                }
                None
            }
            Host::Ipv4(v4) => Some(IpAddr::V4(v4)),
            Host::Ipv6(v6) => Some(IpAddr::V6(v6)),
        };

        if let Some(ip) = ip {
            if self.blocked_cidrs.iter().any(|cidr| cidr.contains(&ip)) {
                return Err(SecurityError::BlockedCidr(ip.to_string()));
            }
        }

        Ok(parsed)
    }
}
