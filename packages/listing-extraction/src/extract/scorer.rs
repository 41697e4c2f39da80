//! Contextual scoring of postcode, price and address candidates.
//!
//! Weights live in a [`ScoringTable`] so they can be tuned and tested
//! without touching the scoring code.
//!
//! A keyword group contributes its weight scaled by how close its nearest
//! keyword sits to the candidate, so an agent's contact line right next to
//! one postcode barely touches a listing postcode a line further on.
//! Offsets, the window and the front span are all measured in bytes of the
//! normalized text.

use tracing::debug;

use super::document::Document;
use super::postcode;
use crate::types::candidate::{Candidate, CandidateValue};
use crate::types::listing::FieldKind;

/// Keywords near price or sale wording.
const SALE_KEYWORDS: &[&str] = &[
    "for sale",
    "guide price",
    "asking price",
    "offers",
    "price",
    "£",
    "oieo",
    "oiro",
    "freehold",
    "leasehold",
];

/// Keywords describing the property itself.
const PROPERTY_KEYWORDS: &[&str] = &[
    "bed",
    "beds",
    "bedroom",
    "bedrooms",
    "bathroom",
    "reception",
    "detached",
    "semi",
    "terraced",
    "terrace",
    "flat",
    "apartment",
    "bungalow",
    "maisonette",
    "house",
    "property",
    "garden",
];

/// Street-type words.
const STREET_KEYWORDS: &[&str] = &[
    "road", "street", "avenue", "lane", "drive", "close", "way", "place", "court", "gardens",
    "crescent", "grove", "mews", "square",
];

/// Agency, branch and contact wording; these surround the agent's own
/// office address and postcode.
const AGENCY_KEYWORDS: &[&str] = &[
    "estate agent",
    "estate agents",
    "agent",
    "agents",
    "branch",
    "tel",
    "telephone",
    "contact",
    "email",
    "office",
    "lettings",
    "opening hours",
];

/// Legal and registration boilerplate.
const LEGAL_KEYWORDS: &[&str] = &[
    "vat",
    "company registration",
    "company no",
    "company number",
    "registered in england",
    "registered office",
    "copyright",
    "©",
    "all rights reserved",
    "terms and conditions",
    "privacy policy",
];

/// A set of keywords whose weight applies, scaled by proximity, when any of
/// them is near a candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordGroup {
    pub name: String,
    pub weight: f64,
    pub keywords: Vec<String>,
}

impl KeywordGroup {
    pub fn new(name: impl Into<String>, weight: f64, keywords: &[&str]) -> Self {
        Self {
            name: name.into(),
            weight,
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    /// Whether any keyword appears as a whole word in `context`.
    ///
    /// `context` must already be lowercase.
    pub fn matches(&self, context: &str) -> bool {
        self.keywords.iter().any(|k| contains_word(context, k))
    }

    /// Closeness in `[0, 1]` of the nearest keyword to byte `at` of
    /// `context`: 1 when adjacent, falling linearly to 0 at `radius` bytes,
    /// and scaled by `line_break_factor` when a line break lies between.
    ///
    /// `context` must already be ASCII-lowercased so byte positions still
    /// line up with the original text.
    pub fn closeness(&self, context: &str, at: usize, radius: usize, line_break_factor: f64) -> f64 {
        let radius = radius.max(1) as f64;
        let mut best: f64 = 0.0;
        for keyword in &self.keywords {
            for start in word_matches(context, keyword) {
                let end = start + keyword.len();
                let (distance, between) = if end <= at {
                    (at - end, &context[end..at])
                } else if start >= at {
                    (start - at, &context[at..start])
                } else {
                    (0, "")
                };

                let mut closeness = (1.0 - distance as f64 / radius).max(0.0);
                if between.contains('\n') {
                    closeness *= line_break_factor;
                }
                best = best.max(closeness);
            }
        }
        best
    }
}

/// Tunable weights for the scorer.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringTable {
    /// Bytes either side of a match inspected for keywords; a keyword's
    /// effect fades to nothing at this distance
    pub window: usize,

    /// Multiplier for a keyword on a different line from the candidate
    pub line_break_factor: f64,

    pub groups: Vec<KeywordGroup>,

    /// Bonus for a match at byte offset zero, falling linearly to nothing
    /// at `front_span` bytes
    pub front_bonus: f64,
    pub front_span: usize,

    /// Scores below this are best-effort only
    pub acceptance_threshold: f64,

    /// Added to a postcode whose outward code matches the leading address
    /// candidate's
    pub corroboration_bonus: f64,
}

impl Default for ScoringTable {
    fn default() -> Self {
        Self {
            window: 350,
            line_break_factor: 0.5,
            groups: vec![
                KeywordGroup::new("sale", 1.0, SALE_KEYWORDS),
                KeywordGroup::new("property", 1.0, PROPERTY_KEYWORDS),
                KeywordGroup::new("street", 0.5, STREET_KEYWORDS),
                KeywordGroup::new("agency", -3.0, AGENCY_KEYWORDS),
                KeywordGroup::new("legal", -3.0, LEGAL_KEYWORDS),
            ],
            front_bonus: 1.5,
            front_span: 3000,
            acceptance_threshold: 0.0,
            corroboration_bonus: 1.0,
        }
    }
}

impl ScoringTable {
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    pub fn with_line_break_factor(mut self, factor: f64) -> Self {
        self.line_break_factor = factor;
        self
    }

    pub fn with_group(mut self, group: KeywordGroup) -> Self {
        self.groups.push(group);
        self
    }

    pub fn with_acceptance_threshold(mut self, threshold: f64) -> Self {
        self.acceptance_threshold = threshold;
        self
    }

    /// Front-of-document bonus at `offset`.
    pub fn position_bonus(&self, offset: usize) -> f64 {
        if self.front_span == 0 || offset >= self.front_span {
            return 0.0;
        }
        self.front_bonus * (1.0 - offset as f64 / self.front_span as f64)
    }
}

/// Which fields are scored in context.
pub fn is_scored(field: FieldKind) -> bool {
    matches!(field, FieldKind::Postcode | FieldKind::Price | FieldKind::Address)
}

/// Applies a [`ScoringTable`] to candidates.
pub struct Scorer<'a> {
    table: &'a ScoringTable,
}

impl<'a> Scorer<'a> {
    pub fn new(table: &'a ScoringTable) -> Self {
        Self { table }
    }

    /// Add contextual weights to every postcode, price and address
    /// candidate. Scores start at the rule prior.
    pub fn score(&self, doc: &Document, candidates: &mut [Candidate]) {
        for candidate in candidates.iter_mut().filter(|c| is_scored(c.field())) {
            let (start, context) = context_window(&doc.text, candidate.offset, self.table.window);
            let context = context.to_ascii_lowercase();
            let at = candidate.offset.min(doc.text.len()) - start;

            let mut delta = self.table.position_bonus(candidate.offset);
            for group in &self.table.groups {
                let closeness = group.closeness(
                    &context,
                    at,
                    self.table.window,
                    self.table.line_break_factor,
                );
                delta += group.weight * closeness;
            }
            candidate.score += delta;

            debug!(
                field = candidate.field().as_str(),
                rule = candidate.rule,
                offset = candidate.offset,
                score = candidate.score,
                "Scored candidate"
            );
        }

        self.corroborate(candidates);
    }

    /// Postcodes sharing an outward code with the leading address gain a
    /// bonus.
    fn corroborate(&self, candidates: &mut [Candidate]) {
        let outward = candidates
            .iter()
            .filter_map(|c| match &c.value {
                CandidateValue::Address(address) => Some((c, address)),
                _ => None,
            })
            .max_by(|(a, _), (b, _)| {
                a.score
                    .total_cmp(&b.score)
                    .then_with(|| b.offset.cmp(&a.offset))
            })
            .and_then(|(_, address)| postcode::trailing_outward(address))
            .map(String::from);

        let Some(outward) = outward else {
            return;
        };

        for candidate in candidates.iter_mut() {
            if let CandidateValue::Postcode(code) = &candidate.value {
                if postcode::outward_of(code) == outward {
                    candidate.score += self.table.corroboration_bonus;
                    debug!(postcode = %code, outward = %outward, "Postcode corroborated by address");
                }
            }
        }
    }
}

/// Slice of `text` within `radius` bytes of `offset`, widened to char
/// boundaries, with the byte position it starts at.
fn context_window(text: &str, offset: usize, radius: usize) -> (usize, &str) {
    let mut start = offset.saturating_sub(radius).min(text.len());
    while !text.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = offset.saturating_add(radius).min(text.len());
    while !text.is_char_boundary(end) {
        end += 1;
    }
    (start, &text[start..end])
}

/// Whole-word substring test. Keyword ends that are not alphanumeric need
/// no boundary.
fn contains_word(haystack: &str, needle: &str) -> bool {
    word_matches(haystack, needle).next().is_some()
}

/// Byte positions of whole-word occurrences of `needle`.
fn word_matches<'h>(haystack: &'h str, needle: &'h str) -> impl Iterator<Item = usize> + 'h {
    let needs_left = needle.chars().next().is_some_and(char::is_alphanumeric);
    let needs_right = needle.chars().last().is_some_and(char::is_alphanumeric);

    haystack.match_indices(needle).map(|(i, _)| i).filter(move |&i| {
        let left_ok = !needs_left
            || haystack[..i]
                .chars()
                .next_back()
                .map_or(true, |c| !c.is_alphanumeric());
        let right_ok = !needs_right
            || haystack[i + needle.len()..]
                .chars()
                .next()
                .map_or(true, |c| !c.is_alphanumeric());
        left_ok && right_ok
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::fetch::BackendId;

    fn postcode_at(code: &str, offset: usize) -> Candidate {
        Candidate::new(
            CandidateValue::Postcode(code.into()),
            "postcode",
            offset,
            1.0,
            BackendId::Direct,
        )
    }

    #[test]
    fn test_contains_word() {
        assert!(contains_word("guide price £250,000", "price"));
        assert!(contains_word("4 bed detached", "bed"));
        assert!(!contains_word("newly renovated kitchen", "vat"));
        assert!(contains_word("tel: 0161", "tel"));
        assert!(contains_word("only£250", "£"));
    }

    #[test]
    fn test_position_bonus_decays() {
        let table = ScoringTable::default();
        assert_eq!(table.position_bonus(0), 1.5);
        assert!(table.position_bonus(1500) < table.position_bonus(100));
        assert_eq!(table.position_bonus(5000), 0.0);
    }

    #[test]
    fn test_agency_context_penalized() {
        let filler = "Lorem ipsum dolor sit amet. ".repeat(30);
        let text = format!(
            "Example Estate Agent, Tel: 0161 496 0000, 1 High Street, Manchester M1 1AA\n{}\n£250,000, 4 bed detached house, Bury BL9 5AA",
            filler
        );
        let doc = Document::from_text(&text);
        let mut candidates = vec![
            postcode_at("M1 1AA", doc.text.find("M1 1AA").unwrap()),
            postcode_at("BL9 5AA", doc.text.find("BL9 5AA").unwrap()),
        ];

        Scorer::new(&ScoringTable::default()).score(&doc, &mut candidates);

        assert!(candidates[0].score < 1.0, "agent postcode {}", candidates[0].score);
        assert!(candidates[1].score > candidates[0].score + 2.0);
    }

    #[test]
    fn test_compact_layout_favours_listing_postcode() {
        let doc = Document::from_text(
            "Example Estate Agent, Tel: 0161 496 0000, Manchester M1 1AA\n£250,000, 4 bed detached house, Bury BL9 5AA",
        );
        let mut candidates = vec![
            postcode_at("M1 1AA", doc.text.find("M1 1AA").unwrap()),
            postcode_at("BL9 5AA", doc.text.find("BL9 5AA").unwrap()),
        ];

        Scorer::new(&ScoringTable::default()).score(&doc, &mut candidates);

        assert!(
            candidates[1].score > candidates[0].score + 1.5,
            "listing {} vs agent {}",
            candidates[1].score,
            candidates[0].score
        );
    }

    #[test]
    fn test_closeness_fades_with_distance_and_line_breaks() {
        let group = KeywordGroup::new("agency", -3.0, &["tel"]);
        let near = group.closeness("tel: x", 5, 100, 0.5);
        let far = group.closeness(&format!("tel:{}x", " ".repeat(50)), 54, 100, 0.5);
        let other_line = group.closeness("tel:\nx", 5, 100, 0.5);

        assert!((near - 0.98).abs() < 1e-9);
        assert!(far < near);
        assert!((other_line - 0.49).abs() < 1e-9);
        assert_eq!(group.closeness("nothing here", 3, 100, 0.5), 0.0);
    }

    #[test]
    fn test_offsets_after_multibyte_text() {
        // Each £ is two bytes; keyword positions must stay aligned with
        // candidate byte offsets
        let doc = Document::from_text("££££££££££ price BL9 5AA");
        let offset = doc.text.find("BL9").unwrap();
        assert_eq!(&doc.text[offset..offset + 7], "BL9 5AA");

        let mut candidates = vec![postcode_at("BL9 5AA", offset)];
        let table = ScoringTable::default();
        Scorer::new(&table).score(&doc, &mut candidates);

        let sale = KeywordGroup::new("sale", 1.0, SALE_KEYWORDS);
        let (start, context) = context_window(&doc.text, offset, table.window);
        let closeness = sale.closeness(&context.to_ascii_lowercase(), offset - start, table.window, 0.5);
        // "price" ends one byte before the postcode
        assert!((closeness - (1.0 - 1.0 / 350.0)).abs() < 1e-9);
        assert!(candidates[0].score > 1.0 + table.position_bonus(offset) + 0.9);
    }

    #[test]
    fn test_unscored_fields_keep_prior() {
        let doc = Document::from_text("for sale 3 bedroom house £1");
        let mut candidates = vec![Candidate::new(
            CandidateValue::Bedrooms(3),
            "bedrooms",
            9,
            1.0,
            BackendId::Direct,
        )];
        Scorer::new(&ScoringTable::default()).score(&doc, &mut candidates);
        assert_eq!(candidates[0].score, 1.0);
    }

    #[test]
    fn test_corroboration_by_address_outward() {
        let doc = Document::from_text("nothing relevant here");
        let mut candidates = vec![
            Candidate::new(
                CandidateValue::Address("Bury Old Road, Whitefield, M45".into()),
                "title",
                0,
                2.0,
                BackendId::ReaderProxy,
            ),
            postcode_at("M45 6TQ", 5000),
            postcode_at("M1 1AA", 5000),
        ];
        let table = ScoringTable::default();
        Scorer::new(&table).score(&doc, &mut candidates);

        assert_eq!(candidates[1].score, 1.0 + table.corroboration_bonus);
        assert_eq!(candidates[2].score, 1.0);
    }
}
