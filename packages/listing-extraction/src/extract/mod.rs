//! Field extraction: candidate generation, scoring and resolution.
//!
//! ```text
//! FetchedContent → Document → CandidateGenerator → Scorer → FieldResolver → ListingRecord
//! ```
//!
//! Extraction is pure and synchronous; the same content always yields the
//! same record.

pub mod candidates;
pub mod document;
pub mod postcode;
pub mod resolver;
pub mod rules;
pub mod scorer;

pub use candidates::CandidateGenerator;
pub use document::Document;
pub use postcode::AreaValidity;
pub use resolver::{FieldResolver, Resolution};
pub use scorer::{KeywordGroup, Scorer, ScoringTable};

use tracing::debug;

use crate::types::candidate::Candidate;
use crate::types::config::ExtractionConfig;
use crate::types::fetch::{BackendId, FetchedContent};
use crate::types::listing::ListingRecord;

/// Turns fetched content into a [`ListingRecord`].
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    config: ExtractionConfig,
}

impl Extractor {
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Generated and scored candidates, before resolution.
    pub fn candidates(&self, content: &FetchedContent, backend: BackendId) -> Vec<Candidate> {
        let doc = Document::from_content(content);
        self.candidates_for(&doc, backend)
    }

    fn candidates_for(&self, doc: &Document, backend: BackendId) -> Vec<Candidate> {
        let mut candidates = CandidateGenerator::new(&self.config).generate(doc, backend);
        Scorer::new(&self.config.scoring).score(doc, &mut candidates);
        candidates
    }

    /// Extract a record from one backend's content.
    pub fn extract(&self, content: &FetchedContent, backend: BackendId) -> ListingRecord {
        let doc = Document::from_content(content);
        let candidates = self.candidates_for(&doc, backend);
        let record = FieldResolver::new(&self.config).resolve_record(&candidates);

        debug!(
            backend = %backend,
            text_length = doc.text.len(),
            candidates = candidates.len(),
            resolved = record.resolved_count(),
            "Extracted record"
        );
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::listing::PropertyType;

    #[test]
    fn test_title_scenario() {
        let html = r#"<html><head>
            <title>3 bed semi for sale - Orme Avenue, Alkrington, Manchester M24 1JZ | ExampleSite</title>
            </head><body>
            <div class="price">£185,000</div>
            <ul><li>Semi-Detached</li><li>Freehold</li></ul>
            </body></html>"#;

        let record = Extractor::default().extract(&FetchedContent::markup(html), BackendId::Direct);

        assert_eq!(record.price, Some(185_000));
        assert_eq!(record.postcode.as_deref(), Some("M24 1JZ"));
        assert_eq!(record.bedrooms, Some(3));
        assert_eq!(record.property_type, Some(PropertyType::SemiDetached));
        assert!(record.address.as_deref().unwrap().contains("Orme Avenue"));
    }

    #[test]
    fn test_agent_postcode_rejected() {
        let filler = "<p>Spacious accommodation arranged over two floors with gas central heating throughout.</p>".repeat(10);
        let html = format!(
            r#"<html><head><title>Listing</title></head><body>
            <div class="agent">Example Estate Agent, Tel: 0161 496 0000, Manchester M1 1AA</div>
            {}
            <div class="summary">£250,000, 4 bed detached house, Bury BL9 5AA</div>
            </body></html>"#,
            filler
        );

        let record = Extractor::default().extract(&FetchedContent::markup(html), BackendId::Direct);
        assert_eq!(record.postcode.as_deref(), Some("BL9 5AA"));
        assert_eq!(record.price, Some(250_000));
    }

    #[test]
    fn test_reader_text_extraction() {
        let body = "Title: 2 bedroom flat for sale in Deansgate, Manchester, M3\n\
                    URL Source: https://www.example.co.uk/properties/2\n\
                    Markdown Content:\n\
                    # Deansgate, Manchester M3 4LY\n\
                    Offers in Excess of &pound;210,000\n\
                    2 bedrooms | 1 bathroom\n";

        let record = Extractor::default().extract(&FetchedContent::text(body), BackendId::ReaderProxy);

        assert_eq!(record.price, Some(210_000));
        assert_eq!(record.postcode.as_deref(), Some("M3 4LY"));
        assert_eq!(record.bedrooms, Some(2));
        assert_eq!(record.property_type, Some(PropertyType::Flat));
        assert_eq!(record.address.as_deref(), Some("Deansgate, Manchester, M3"));
    }

    #[test]
    fn test_nothing_found_is_empty_record() {
        let record = Extractor::default().extract(
            &FetchedContent::markup("<html><body><p>Page not found</p></body></html>"),
            BackendId::Direct,
        );
        assert!(record.is_empty());
    }
}
