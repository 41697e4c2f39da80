//! Configuration types for the fetch backends, extraction and orchestration.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};
use crate::extract::scorer::ScoringTable;
use crate::pipeline::merge::MergePrecedence;
use crate::security::ProxyApiKey;

/// Desktop browser strings rotated by the direct backend.
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36 Edg/119.0.0.0",
];

/// When the orchestrator may stop racing before the deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EarlyExit {
    /// Stop once any completed backend produced a record with price or address.
    #[default]
    FirstUsableRecord,

    /// Wait for every backend, or the deadline.
    WaitForAll,
}

impl FromStr for EarlyExit {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "first_usable" | "first_usable_record" => Ok(Self::FirstUsableRecord),
            "wait_for_all" | "all" => Ok(Self::WaitForAll),
            _ => Err(()),
        }
    }
}

/// Configuration for the direct HTTP backend.
#[derive(Debug, Clone)]
pub struct DirectConfig {
    /// Minimum spacing between requests from one backend instance.
    ///
    /// Default: 1 second.
    pub min_delay: Duration,

    /// Pause before the single retry after a transient failure.
    ///
    /// Default: 2 seconds.
    pub retry_backoff: Duration,

    /// Upper bound for one HTTP attempt (further capped by the deadline).
    pub request_timeout: Duration,

    pub user_agents: Vec<String>,

    /// Referer sent when none is supplied
    pub referer: String,

    pub accept_language: String,
}

impl Default for DirectConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_secs(1),
            retry_backoff: Duration::from_secs(2),
            request_timeout: Duration::from_secs(15),
            user_agents: DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect(),
            referer: "https://www.google.com/search?q=property+for+sale+uk".to_string(),
            accept_language: "en-GB,en;q=0.5".to_string(),
        }
    }
}

impl DirectConfig {
    pub fn with_min_delay(mut self, delay: Duration) -> Self {
        self.min_delay = delay;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_user_agents(mut self, agents: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.user_agents = agents.into_iter().map(|a| a.into()).collect();
        self
    }
}

/// Configuration for the JavaScript-rendering proxy backend.
#[derive(Debug, Clone)]
pub struct RenderingProxyConfig {
    pub api_key: ProxyApiKey,
    pub endpoint: String,
    pub render_js: bool,
    pub premium_proxy: bool,

    /// Exit country for the proxy (ISO 3166 alpha-2, lowercase)
    pub country_code: String,

    /// How long the proxy lets the page settle before capturing it
    pub wait_millis: u64,

    pub request_timeout: Duration,
}

impl RenderingProxyConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_key(ProxyApiKey::new(api_key))
    }

    pub fn with_key(api_key: ProxyApiKey) -> Self {
        Self {
            api_key,
            endpoint: "https://app.scrapingbee.com/api/v1/".to_string(),
            render_js: true,
            premium_proxy: true,
            country_code: "gb".to_string(),
            wait_millis: 3000,
            request_timeout: Duration::from_secs(20),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_country_code(mut self, code: impl Into<String>) -> Self {
        self.country_code = code.into();
        self
    }

    pub fn with_wait_millis(mut self, wait: u64) -> Self {
        self.wait_millis = wait;
        self
    }
}

/// Configuration for the reader proxy backend.
#[derive(Debug, Clone)]
pub struct ReaderProxyConfig {
    /// Prefix the target URL is appended to
    pub endpoint: String,

    pub return_format: String,

    /// CSS selectors the service strips before conversion
    pub remove_selectors: String,

    pub request_timeout: Duration,
}

impl Default for ReaderProxyConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://r.jina.ai/".to_string(),
            return_format: "markdown".to_string(),
            remove_selectors: "header, footer, nav, .cookie-banner".to_string(),
            request_timeout: Duration::from_secs(15),
        }
    }
}

impl ReaderProxyConfig {
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

/// Configuration for candidate generation, scoring and validation.
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    /// Prices below this are fees or noise. Default: 10,000.
    pub price_floor: u64,

    /// Prices above this are parse errors. Default: 100,000,000.
    pub price_ceiling: u64,

    pub bedroom_min: u32,
    pub bedroom_max: u32,

    /// Prior added to bedroom matches inside the title/heading region
    pub heading_bedroom_bonus: f64,

    pub description_max_chars: usize,

    /// Accept postcodes whose area is neither known-valid nor known-invalid.
    ///
    /// Default: false (only curated areas pass).
    pub admit_unknown_postcode_areas: bool,

    pub scoring: ScoringTable,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            price_floor: 10_000,
            price_ceiling: 100_000_000,
            bedroom_min: 1,
            bedroom_max: 20,
            heading_bedroom_bonus: 1.0,
            description_max_chars: 500,
            admit_unknown_postcode_areas: false,
            scoring: ScoringTable::default(),
        }
    }
}

impl ExtractionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price_floor(mut self, floor: u64) -> Self {
        self.price_floor = floor;
        self
    }

    pub fn with_scoring(mut self, scoring: ScoringTable) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn admitting_unknown_postcode_areas(mut self) -> Self {
        self.admit_unknown_postcode_areas = true;
        self
    }
}

/// Top-level configuration for [`Orchestrator`](crate::pipeline::Orchestrator).
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Outer wall-clock budget for one extraction.
    ///
    /// Default: 22 seconds, under the calling layer's request timeout.
    pub deadline: Duration,

    pub early_exit: EarlyExit,

    pub precedence: MergePrecedence,

    /// `None` disables the backend
    pub direct: Option<DirectConfig>,
    pub rendering: Option<RenderingProxyConfig>,
    pub reader: Option<ReaderProxyConfig>,

    pub extraction: ExtractionConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(22),
            early_exit: EarlyExit::default(),
            precedence: MergePrecedence::default(),
            direct: Some(DirectConfig::default()),
            rendering: None,
            reader: Some(ReaderProxyConfig::default()),
            extraction: ExtractionConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_early_exit(mut self, early_exit: EarlyExit) -> Self {
        self.early_exit = early_exit;
        self
    }

    pub fn with_precedence(mut self, precedence: MergePrecedence) -> Self {
        self.precedence = precedence;
        self
    }

    pub fn with_rendering_proxy(mut self, config: RenderingProxyConfig) -> Self {
        self.rendering = Some(config);
        self
    }

    pub fn with_extraction(mut self, extraction: ExtractionConfig) -> Self {
        self.extraction = extraction;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file is read if present. Unset variables keep their defaults;
    /// set-but-malformed variables are errors.
    pub fn from_env() -> ConfigResult<Self> {
        // Load .env file if present (development)
        let _ = dotenvy::dotenv();

        let mut config = Self::default();

        if let Some(ms) = env_parse::<u64>("LISTING_DEADLINE_MS")? {
            config.deadline = Duration::from_millis(ms);
        }
        if let Some(value) = env_value("LISTING_EARLY_EXIT") {
            config.early_exit = value.parse().map_err(|_| ConfigError::InvalidValue {
                name: "LISTING_EARLY_EXIT",
                value,
            })?;
        }

        if env_parse::<bool>("DIRECT_ENABLED")? == Some(false) {
            config.direct = None;
        } else if let Some(ms) = env_parse::<u64>("DIRECT_MIN_DELAY_MS")? {
            config.direct = Some(DirectConfig::default().with_min_delay(Duration::from_millis(ms)));
        }

        if let Some(key) = env_value("SCRAPINGBEE_API_KEY").and_then(|k| ProxyApiKey::parse(&k)) {
            let mut rendering = RenderingProxyConfig::with_key(key);
            if let Some(code) = env_value("SCRAPINGBEE_COUNTRY_CODE") {
                rendering = rendering.with_country_code(code.to_lowercase());
            }
            config.rendering = Some(rendering);
        }

        if env_parse::<bool>("READER_PROXY_ENABLED")? == Some(false) {
            config.reader = None;
        } else if let Some(endpoint) = env_value("READER_PROXY_URL") {
            config.reader = Some(ReaderProxyConfig::default().with_endpoint(endpoint));
        }

        Ok(config)
    }
}

fn env_value(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string())
}

fn env_parse<T: FromStr>(name: &'static str) -> ConfigResult<Option<T>> {
    match env_value(name) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { name, value }),
    }
}
