//! Property Listing Extraction Library
//!
//! Turns the URL of a UK property-listing page into a structured record
//! (price, postcode, bedrooms, property type, address, description) under a
//! hard latency budget, degrading gracefully when a fetch strategy is
//! blocked or a field cannot be located with confidence.
//!
//! # Design
//!
//! - Three interchangeable fetch backends raced concurrently
//! - Rule-based candidate generation, contextual scoring, and per-field
//!   resolution with an explicit "unresolved" outcome
//! - Per-field merge precedence across backends
//! - Total fetch failure reported distinctly from "fetched, nothing found"
//!
//! # Usage
//!
//! ```rust,ignore
//! use listing_extraction::{Orchestrator, PipelineConfig};
//!
//! let orchestrator = Orchestrator::from_config(PipelineConfig::from_env()?)?;
//! let record = orchestrator
//!     .extract_listing("https://www.rightmove.co.uk/properties/153629507")
//!     .await?;
//!
//! if record.is_usable() {
//!     println!("{:?} for £{:?}", record.address, record.price);
//! }
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Core trait abstractions (FetchBackend, HttpClient, RateLimiter)
//! - [`types`] - Listing record, fetch results, candidates, configuration
//! - [`backends`] - Direct, rendering-proxy and reader-proxy backends
//! - [`extract`] - Candidate generation, scoring and field resolution
//! - [`pipeline`] - Orchestrator, race state machine and merge precedence
//! - [`security`] - Credential handling and SSRF protection
//! - [`testing`] - Mock implementations for testing

pub mod backends;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod security;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{ConfigError, ExtractError, FailureKind, FetchFailure, SecurityError};
pub use extract::Extractor;
pub use pipeline::{ExtractionReport, MergePrecedence, Orchestrator};
pub use traits::{
    backend::FetchBackend,
    http::{HttpClient, HttpRequest, HttpResponse, TransportError},
    limiter::RateLimiter,
};
pub use types::{
    candidate::{Candidate, CandidateValue},
    config::{
        DirectConfig, EarlyExit, ExtractionConfig, PipelineConfig, ReaderProxyConfig,
        RenderingProxyConfig,
    },
    fetch::{BackendId, ContentFormat, FetchResult, FetchedContent},
    listing::{FieldKind, ListingRecord, PropertyType},
};
