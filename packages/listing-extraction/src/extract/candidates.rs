//! Candidate generation.
//!
//! Runs every rule for every field over a [`Document`] and turns each match
//! into a [`Candidate`]. Structurally impossible values (prices under the
//! floor, bedroom counts out of range, postcodes in invalid areas) are
//! dropped here, before scoring.

use std::collections::HashMap;
use tracing::debug;

use super::document::Document;
use super::resolver::admits;
use super::rules::{
    self, Rule, BEDROOM_RULES, BRANDING_SUFFIX_REGEX, DESCRIPTION_PREFIX_REGEX,
    FOR_SALE_REGEX, HEADING_NOISE_REGEX, META_ADDRESS_TAIL_REGEX, PIPE_SUFFIX_REGEX,
    POSTCODE_RULES, PRICE_RULES, PROPERTY_TYPE_RULES, STREET_LINE_RULE, STREET_WORD_REGEX,
};
use super::postcode;
use crate::types::candidate::{Candidate, CandidateValue};
use crate::types::config::ExtractionConfig;
use crate::types::fetch::{BackendId, ContentFormat};
use crate::types::listing::PropertyType;

/// Proposes candidate values for every field.
pub struct CandidateGenerator<'a> {
    config: &'a ExtractionConfig,
}

impl<'a> CandidateGenerator<'a> {
    pub fn new(config: &'a ExtractionConfig) -> Self {
        Self { config }
    }

    /// Generate candidates for all fields, in field order.
    pub fn generate(&self, doc: &Document, backend: BackendId) -> Vec<Candidate> {
        let mut out = Vec::new();
        self.addresses(doc, backend, &mut out);
        self.postcodes(doc, backend, &mut out);
        self.prices(doc, backend, &mut out);
        self.property_types(doc, backend, &mut out);
        self.bedrooms(doc, backend, &mut out);
        self.descriptions(doc, backend, &mut out);

        let before = out.len();
        out.retain(|c| admits(self.config, &c.value));
        debug!(
            backend = %backend,
            generated = before,
            admitted = out.len(),
            "Generated candidates"
        );
        out
    }

    fn prices(&self, doc: &Document, backend: BackendId, out: &mut Vec<Candidate>) {
        // A labelled price and the bare currency rule match the same digits;
        // keep one candidate per offset, with the higher prior
        let mut by_offset: HashMap<usize, Candidate> = HashMap::new();

        for rule in PRICE_RULES.iter() {
            for caps in rule.regex.captures_iter(&doc.text) {
                let Some(value) = caps.name("value") else {
                    continue;
                };
                let suffix = caps.name("suffix").map(|m| m.as_str());
                let Some(price) = rules::parse_price(value.as_str(), suffix) else {
                    continue;
                };

                let candidate = Candidate::new(
                    CandidateValue::Price(price),
                    rule.name,
                    value.start(),
                    rule.prior,
                    backend,
                );
                match by_offset.get(&value.start()) {
                    Some(existing) if existing.score >= candidate.score => {}
                    _ => {
                        by_offset.insert(value.start(), candidate);
                    }
                }
            }
        }

        let mut prices: Vec<Candidate> = by_offset.into_values().collect();
        prices.sort_by_key(|c| c.offset);
        out.extend(prices);
    }

    fn bedrooms(&self, doc: &Document, backend: BackendId, out: &mut Vec<Candidate>) {
        for rule in BEDROOM_RULES.iter() {
            for caps in rule.regex.captures_iter(&doc.text) {
                let Some(value) = caps.name("value") else {
                    continue;
                };
                let Ok(count) = value.as_str().parse::<u32>() else {
                    continue;
                };
                if count < self.config.bedroom_min || count > self.config.bedroom_max {
                    continue;
                }

                let mut prior = rule.prior;
                if caps.name("typed").is_some() {
                    prior += rules::TYPED_BEDROOM_BONUS;
                }
                if doc.in_heading(value.start()) {
                    prior += self.config.heading_bedroom_bonus;
                }

                out.push(Candidate::new(
                    CandidateValue::Bedrooms(count),
                    rule.name,
                    value.start(),
                    prior,
                    backend,
                ));
            }
        }
    }

    fn property_types(&self, doc: &Document, backend: BackendId, out: &mut Vec<Candidate>) {
        for rule in PROPERTY_TYPE_RULES.iter() {
            for caps in rule.regex.captures_iter(&doc.text) {
                let Some(value) = caps.name("value") else {
                    continue;
                };
                if let Some(property_type) = PropertyType::from_word(value.as_str()) {
                    out.push(Candidate::new(
                        CandidateValue::PropertyType(property_type),
                        rule.name,
                        value.start(),
                        rule.prior,
                        backend,
                    ));
                }
            }
        }
    }

    fn postcodes(&self, doc: &Document, backend: BackendId, out: &mut Vec<Candidate>) {
        for rule in POSTCODE_RULES.iter() {
            push_postcodes(rule, &doc.text, backend, out);
        }
    }

    fn addresses(&self, doc: &Document, backend: BackendId, out: &mut Vec<Candidate>) {
        if let Some(address) = doc.structured_address.as_deref() {
            out.push(Candidate::new(
                CandidateValue::Address(address.to_string()),
                "structured_data",
                0,
                rules::ADDRESS_STRUCTURED_PRIOR,
                backend,
            ));
        }

        if let Some(title) = doc.title.as_deref() {
            let found = address_from_title(title)
                .map(|address| (address, "title", rules::ADDRESS_TITLE_PRIOR))
                .or_else(|| {
                    address_from_plain_title(title)
                        .map(|address| (address, "title_plain", rules::ADDRESS_PLAIN_TITLE_PRIOR))
                });
            if let Some((address, rule, prior)) = found {
                let offset = doc.text.find(&address).unwrap_or(0);
                out.push(Candidate::new(
                    CandidateValue::Address(address),
                    rule,
                    offset,
                    prior,
                    backend,
                ));
            }
        }

        if let Some(address) = doc.meta_description.as_deref().and_then(address_from_meta) {
            let offset = doc.text.find(&address).unwrap_or(0);
            out.push(Candidate::new(
                CandidateValue::Address(address),
                "meta_description",
                offset,
                rules::ADDRESS_META_PRIOR,
                backend,
            ));
        }

        if let Some(address) = doc.heading.as_deref().and_then(address_from_heading) {
            let offset = doc
                .heading_span
                .as_ref()
                .map(|span| span.start)
                .or_else(|| doc.text.find(&address))
                .unwrap_or(0);
            out.push(Candidate::new(
                CandidateValue::Address(address),
                "heading",
                offset,
                rules::ADDRESS_HEADING_PRIOR,
                backend,
            ));
        }

        let rule = &*STREET_LINE_RULE;
        for caps in rule.regex.captures_iter(&doc.text) {
            if let Some(value) = caps.name("value") {
                out.push(Candidate::new(
                    CandidateValue::Address(value.as_str().trim().to_string()),
                    rule.name,
                    value.start(),
                    rule.prior,
                    backend,
                ));
            }
        }
    }

    fn descriptions(&self, doc: &Document, backend: BackendId, out: &mut Vec<Candidate>) {
        let max = self.config.description_max_chars;

        if let Some(meta) = doc.meta_description.as_deref() {
            let stripped = DESCRIPTION_PREFIX_REGEX.replace(meta, "");
            let description = if stripped.trim().is_empty() {
                meta
            } else {
                stripped.trim()
            };
            out.push(Candidate::new(
                CandidateValue::Description(truncate_chars(description, max)),
                "meta_description",
                0,
                rules::DESCRIPTION_META_PRIOR,
                backend,
            ));
        }

        if doc.format == ContentFormat::Text {
            let mut offset = 0;
            for line in doc.text.split('\n') {
                if is_prose(line, doc) {
                    out.push(Candidate::new(
                        CandidateValue::Description(truncate_chars(line, max)),
                        "first_paragraph",
                        offset,
                        rules::DESCRIPTION_PARAGRAPH_PRIOR,
                        backend,
                    ));
                    break;
                }
                offset += line.len() + 1;
            }
        }
    }
}

fn push_postcodes(rule: &Rule, text: &str, backend: BackendId, out: &mut Vec<Candidate>) {
    for caps in rule.regex.captures_iter(text) {
        let (Some(outward), Some(inward)) = (caps.name("outward"), caps.name("inward")) else {
            continue;
        };
        if is_lowercase_ordinal(inward.as_str()) {
            continue;
        }
        out.push(Candidate::new(
            CandidateValue::Postcode(format!(
                "{} {}",
                outward.as_str().to_ascii_uppercase(),
                inward.as_str().to_ascii_uppercase()
            )),
            rule.name,
            outward.start(),
            rule.prior,
            backend,
        ));
    }
}

/// Address from a page title: branding stripped, then whatever follows
/// "for sale in/at/-".
pub(crate) fn address_from_title(title: &str) -> Option<String> {
    let stripped = BRANDING_SUFFIX_REGEX.replace(title, "");
    let stripped = PIPE_SUFFIX_REGEX.replace(&stripped, "");

    let caps = FOR_SALE_REGEX.captures(&stripped)?;
    let value = caps["value"].trim().trim_end_matches(['-', '|', ',']).trim();
    plausible_address(value)
}

/// Inward codes such as "2nd" or "4th" in lowercase text are ordinals, not
/// postcodes. Uppercase "2ND" is left alone.
fn is_lowercase_ordinal(inward: &str) -> bool {
    let suffix = &inward[1..];
    suffix.chars().any(|c| c.is_ascii_lowercase())
        && matches!(suffix.to_ascii_lowercase().as_str(), "st" | "nd" | "rd" | "th")
}

/// Address from a title with no sale wording, such as
/// "Deansgate, Manchester M3 4LY - Zoopla". Only accepted when what is left
/// after branding is comma-separated and carries a postcode, an outward
/// code or a street-type word.
pub(crate) fn address_from_plain_title(title: &str) -> Option<String> {
    let stripped = BRANDING_SUFFIX_REGEX.replace(title, "");
    let stripped = PIPE_SUFFIX_REGEX.replace(&stripped, "");
    let value = stripped.trim().trim_end_matches(['-', '|', ',']).trim();

    let address_like = value.contains(',')
        && !value.contains('£')
        && (POSTCODE_RULES.iter().any(|rule| rule.regex.is_match(value))
            || postcode::trailing_outward(value).is_some()
            || STREET_WORD_REGEX.is_match(value));
    if address_like {
        plausible_address(value)
    } else {
        None
    }
}

/// Address from the leading "... for sale in <address> for £..." sentence of
/// a meta description.
fn address_from_meta(meta: &str) -> Option<String> {
    let sentence = DESCRIPTION_PREFIX_REGEX.find(meta)?.as_str().trim();
    let sentence = sentence.trim_end_matches('.');
    let caps = FOR_SALE_REGEX.captures(sentence)?;
    let value = META_ADDRESS_TAIL_REGEX.replace(&caps["value"], "");
    plausible_address(value.trim().trim_end_matches([',', '-']).trim())
}

/// Address from a heading with sale wording and prices removed.
fn address_from_heading(heading: &str) -> Option<String> {
    if let Some(caps) = FOR_SALE_REGEX.captures(heading) {
        return plausible_address(caps["value"].trim());
    }

    let cleaned = HEADING_NOISE_REGEX.replace_all(heading, " ");
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.contains(',') {
        plausible_address(cleaned.trim_matches([',', '-', ' ']))
    } else {
        None
    }
}

fn plausible_address(value: &str) -> Option<String> {
    let lower = value.to_lowercase();
    let plausible = (5..=200).contains(&value.len())
        && value.chars().any(|c| c.is_alphabetic())
        && !lower.contains("for sale")
        && !lower.contains("to rent");
    plausible.then(|| value.to_string())
}

fn is_prose(line: &str, doc: &Document) -> bool {
    line.chars().count() >= rules::MIN_PARAGRAPH_CHARS
        && line.contains(' ')
        && !line.starts_with('|')
        && doc.title.as_deref() != Some(line)
        && doc.heading.as_deref() != Some(line)
}

/// Truncate on a char boundary.
pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].trim_end().to_string(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::listing::FieldKind;

    fn generate(doc: &Document) -> Vec<Candidate> {
        let config = ExtractionConfig::default();
        CandidateGenerator::new(&config).generate(doc, BackendId::Direct)
    }

    fn values(candidates: &[Candidate], field: FieldKind) -> Vec<CandidateValue> {
        candidates
            .iter()
            .filter(|c| c.field() == field)
            .map(|c| c.value.clone())
            .collect()
    }

    #[test]
    fn test_title_scenario_candidates() {
        let doc = Document::from_markup(
            "<html><head><title>3 bed semi for sale - Orme Avenue, Alkrington, Manchester M24 1JZ | ExampleSite</title></head>\
             <body><p>£185,000</p><p>Semi-Detached</p></body></html>",
        );
        let candidates = generate(&doc);

        assert_eq!(values(&candidates, FieldKind::Price), vec![CandidateValue::Price(185_000)]);
        assert_eq!(
            values(&candidates, FieldKind::Postcode),
            vec![CandidateValue::Postcode("M24 1JZ".into())]
        );
        assert!(values(&candidates, FieldKind::Address).contains(&CandidateValue::Address(
            "Orme Avenue, Alkrington, Manchester M24 1JZ".into()
        )));

        let beds: Vec<&Candidate> = candidates
            .iter()
            .filter(|c| c.field() == FieldKind::Bedrooms)
            .collect();
        assert_eq!(beds.len(), 1);
        // base + typed + heading
        assert!((beds[0].score - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_price_floor_and_label_dedupe() {
        let doc = Document::from_text("Admin fee £250\nGuide Price £325,000\nStamp duty on £325,000");
        let candidates = generate(&doc);
        let prices: Vec<&Candidate> = candidates
            .iter()
            .filter(|c| c.field() == FieldKind::Price)
            .collect();

        assert_eq!(prices.len(), 2);
        assert_eq!(prices[0].rule, "labelled_price");
        assert_eq!(prices[0].score, 2.0);
        assert_eq!(prices[1].rule, "currency_price");
    }

    #[test]
    fn test_invalid_postcode_area_dropped() {
        let doc = Document::from_text("Ref QA1 1AA and VX9 9ZZ, viewing at BL9 5AA");
        let candidates = generate(&doc);
        assert_eq!(
            values(&candidates, FieldKind::Postcode),
            vec![CandidateValue::Postcode("BL9 5AA".into())]
        );
    }

    #[test]
    fn test_postcode_without_space_normalized() {
        let doc = Document::from_text("Situated in M241JZ");
        assert_eq!(
            values(&generate(&doc), FieldKind::Postcode),
            vec![CandidateValue::Postcode("M24 1JZ".into())]
        );
    }

    #[test]
    fn test_bedroom_bounds() {
        let doc = Document::from_text("0 bed nonsense, 25 bedrooms hotel, 4 bedroom house");
        assert_eq!(
            values(&generate(&doc), FieldKind::Bedrooms),
            vec![CandidateValue::Bedrooms(4)]
        );
    }

    #[test]
    fn test_structured_address_preferred_prior() {
        let doc = Document::from_markup(
            r#"<html><head><script type="application/ld+json">{"address":{"streetAddress":"12 Bury Old Road","addressLocality":"Whitefield"}}</script></head><body></body></html>"#,
        );
        let candidates = generate(&doc);
        let address = candidates
            .iter()
            .find(|c| c.field() == FieldKind::Address)
            .unwrap();
        assert_eq!(address.rule, "structured_data");
        assert_eq!(address.score, rules::ADDRESS_STRUCTURED_PRIOR);
    }

    #[test]
    fn test_heading_address() {
        assert_eq!(
            address_from_heading("Park Lane, Bury BL9 5AA").as_deref(),
            Some("Park Lane, Bury BL9 5AA")
        );
        assert_eq!(
            address_from_heading("£250,000 Park Lane, Bury").as_deref(),
            Some("Park Lane, Bury")
        );
        assert_eq!(address_from_heading("Property details"), None);
    }

    #[test]
    fn test_title_without_sale_wording() {
        assert_eq!(address_from_title("Search results | Rightmove"), None);
        assert_eq!(
            address_from_title("4 bedroom detached house for sale in Park Lane, Bury, BL9 - Rightmove")
                .as_deref(),
            Some("Park Lane, Bury, BL9")
        );
    }

    #[test]
    fn test_branded_title_without_sale_wording() {
        assert_eq!(
            address_from_plain_title("Deansgate, Manchester M3 4LY - Zoopla").as_deref(),
            Some("Deansgate, Manchester M3 4LY")
        );
        assert_eq!(
            address_from_plain_title("Bury Old Road, Whitefield | ExampleSite").as_deref(),
            Some("Bury Old Road, Whitefield")
        );
        assert_eq!(address_from_plain_title("Search results | Rightmove"), None);
        assert_eq!(address_from_plain_title("Photos, floorplans and more - Zoopla"), None);

        let doc = Document::from_text("Title: Deansgate, Manchester M3 4LY - Zoopla

£250,000");
        let address = generate(&doc)
            .into_iter()
            .find(|c| c.field() == FieldKind::Address)
            .unwrap();
        assert_eq!(address.rule, "title_plain");
        assert_eq!(address.score, rules::ADDRESS_PLAIN_TITLE_PRIOR);
        assert_eq!(address.value, CandidateValue::Address("Deansgate, Manchester M3 4LY".into()));
    }

    #[test]
    fn test_meta_description_address() {
        let doc = Document::from_markup(
            r#"<html><head><meta name="description" content="3 bedroom house for sale in Orme Avenue, Alkrington for £185,000. Marketed by Example Estates."></head><body></body></html>"#,
        );
        let addresses: Vec<Candidate> = generate(&doc)
            .into_iter()
            .filter(|c| c.field() == FieldKind::Address)
            .collect();
        assert_eq!(addresses.len(), 1);
        assert_eq!(addresses[0].rule, "meta_description");
        assert_eq!(addresses[0].score, rules::ADDRESS_META_PRIOR);
        assert_eq!(
            addresses[0].value,
            CandidateValue::Address("Orme Avenue, Alkrington".into())
        );

        assert_eq!(address_from_meta("A lovely family home close to schools."), None);
    }

    #[test]
    fn test_lowercase_postcode_uppercased() {
        let doc = Document::from_text("viewing at bl9 5aa, unit m2 2nd floor, Unit M2 2ND");
        assert_eq!(
            values(&generate(&doc), FieldKind::Postcode),
            vec![
                CandidateValue::Postcode("BL9 5AA".into()),
                CandidateValue::Postcode("M2 2ND".into())
            ]
        );
    }

    #[test]
    fn test_heading_candidate_at_heading_span() {
        let doc = Document::from_markup(
            "<html><head><title>Orme Avenue, Alkrington | ExampleSite</title></head>\
             <body><p>Intro</p><h1>Orme Avenue, Alkrington</h1></body></html>",
        );
        let heading = generate(&doc)
            .into_iter()
            .find(|c| c.rule == "heading")
            .unwrap();
        let span = doc.heading_span.clone().unwrap();
        assert_eq!(heading.offset, span.start);
        assert!(heading.offset > doc.title_span.clone().unwrap().end);
    }

    #[test]
    fn test_meta_description_prefix_removed() {
        let doc = Document::from_markup(
            r#"<html><head><meta name="description" content="3 bedroom house for sale in Orme Avenue for £185,000. Marketed by Example Estates."></head><body></body></html>"#,
        );
        assert_eq!(
            values(&generate(&doc), FieldKind::Description),
            vec![CandidateValue::Description("Marketed by Example Estates.".into())]
        );
    }

    #[test]
    fn test_reader_paragraph_description() {
        let paragraph = "A beautifully presented three bedroom family home set on a quiet residential road close to local schools.";
        let doc = Document::from_text(&format!("Title: Listing\n\n# Heading\n\nShort line\n\n{}", paragraph));
        assert_eq!(
            values(&generate(&doc), FieldKind::Description),
            vec![CandidateValue::Description(paragraph.into())]
        );
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("£££££", 3), "£££");
        assert_eq!(truncate_chars("short", 10), "short");
    }
}
