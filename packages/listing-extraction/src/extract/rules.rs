//! Extraction rule tables.
//!
//! A rule is a pattern plus a fixed prior weight. Rules for one field are
//! listed in order of preference; every match of every rule becomes a
//! candidate and the scorer and resolver decide between them.

use lazy_static::lazy_static;
use regex::Regex;

use super::postcode::POSTCODE_PATTERN;

/// A named pattern with its prior weight.
#[derive(Debug)]
pub struct Rule {
    pub name: &'static str,
    pub prior: f64,
    pub regex: Regex,
}

impl Rule {
    fn new(name: &'static str, prior: f64, pattern: &str) -> Self {
        Self {
            name,
            prior,
            regex: Regex::new(pattern).unwrap(),
        }
    }
}

/// Numeric part of a price: grouped thousands or plain digits, optional
/// `k`/`m` multiplier.
const PRICE_VALUE: &str =
    r"(?P<value>\d{1,3}(?:,\d{3})+|\d+(?:\.\d+)?)(?:[ ]?(?P<suffix>[mMkK])\b)?";

lazy_static! {
    pub static ref PRICE_RULES: Vec<Rule> = vec![
        Rule::new(
            "labelled_price",
            2.0,
            &format!(
                r"(?i)\b(?:guide\s+price|asking\s+price|offers\s+in\s+excess\s+of|offers\s+over|offers\s+in\s+the\s+region\s+of|oieo|oiro)[\s:]*£\s?{}",
                PRICE_VALUE
            ),
        ),
        Rule::new("currency_price", 1.0, &format!(r"£\s?{}", PRICE_VALUE)),
    ];

    pub static ref BEDROOM_RULES: Vec<Rule> = vec![Rule::new(
        "bedrooms",
        1.0,
        r"(?i)\b(?P<value>\d{1,2})[ ]?-?[ ]?(?:bed(?:room)?s?|bdrms?)\b(?:[ ]+(?P<typed>semi|detached|terraced|terrace|end|mid|link|flat|apartment|bungalow|maisonette|town[ ]?house|cottage|house|home|property))?",
    )];

    // Longest alternatives first so "semi-detached" is never read as "semi"
    pub static ref PROPERTY_TYPE_RULES: Vec<Rule> = vec![Rule::new(
        "property_type_word",
        1.0,
        r"(?i)\b(?P<value>semi[- ]detached|link[- ]detached|end[- ]of[- ]terrace|end[- ]terrace|mid[- ]terrace|detached|terraced|terrace|semi|flat|apartment|bungalow|maisonette|town[- ]?house|cottage|studio)\b",
    )];

    // Case-insensitive; matches are uppercased when they become candidates
    pub static ref POSTCODE_RULES: Vec<Rule> =
        vec![Rule::new("postcode", 1.0, &format!("(?i){}", POSTCODE_PATTERN))];

    pub static ref STREET_LINE_RULE: Rule = Rule::new(
        "street_line",
        ADDRESS_STREET_LINE_PRIOR,
        r"(?P<value>(?:\d+[A-Za-z]?,?[ ]+)?(?:[A-Z][A-Za-z'\-]+[ ]+){1,3}(?:Road|Street|Avenue|Lane|Drive|Close|Way|Place|Court|Gardens|Terrace|Crescent|Grove|Row|Walk|Hill|Mews|Square|Rise|Park)\b(?:,[ ]*[A-Z][A-Za-z'\-]+\b(?:[ ]+[A-Z][A-Za-z'\-]+\b){0,2}){1,3}(?:,?[ ]+[A-Z]{1,2}[0-9]{1,2}[A-Z]?(?:[ ]?[0-9][A-Z]{2})?)?)",
    );

    // Trailing "- Rightmove", "| Zoopla", ... and whatever follows
    pub(crate) static ref BRANDING_SUFFIX_REGEX: Regex = Regex::new(
        r"(?i)\s*[-|–]\s*(?:rightmove|zoopla|onthemarket|on the market|primelocation)\b.*$"
    ).unwrap();

    // Any remaining trailing " | Site" segment
    pub(crate) static ref PIPE_SUFFIX_REGEX: Regex = Regex::new(r"\s+\|\s+[^|]*$").unwrap();

    pub(crate) static ref FOR_SALE_REGEX: Regex = Regex::new(
        r"(?i)\bfor\s+sale\s*(?:in\b|at\b|[-–:,])\s*(?P<value>.+)$"
    ).unwrap();

    pub(crate) static ref HEADING_NOISE_REGEX: Regex = Regex::new(
        r"(?i)£\s?[\d,]+(?:\.\d+)?|\bfor\s+sale\b|\bguide\s+price\b|\boffers\s+(?:over|in\s+excess\s+of)\b"
    ).unwrap();

    // Street-type word anywhere in a candidate address
    pub(crate) static ref STREET_WORD_REGEX: Regex = Regex::new(
        r"(?i)\b(?:road|street|avenue|lane|drive|close|way|place|court|gardens|terrace|crescent|grove|row|walk|hill|mews|square|rise|park)\b"
    ).unwrap();

    // Price tail after the address in "for sale in <address> for £185,000"
    pub(crate) static ref META_ADDRESS_TAIL_REGEX: Regex = Regex::new(
        r"(?i)\s*(?:[-–,]\s*)?(?:\b(?:for|at|priced\s+at|offered\s+at)\s+)?£.*$"
    ).unwrap();

    // A leading "3 bedroom house for sale in ... for £185,000." sentence
    pub(crate) static ref DESCRIPTION_PREFIX_REGEX: Regex = Regex::new(
        r"(?i)^[^.]*\bfor\s+sale\b[^.]*\.\s*"
    ).unwrap();
}

pub const TYPED_BEDROOM_BONUS: f64 = 0.5;

pub const ADDRESS_STRUCTURED_PRIOR: f64 = 3.0;
pub const ADDRESS_TITLE_PRIOR: f64 = 2.0;
pub const ADDRESS_HEADING_PRIOR: f64 = 1.8;
pub const ADDRESS_META_PRIOR: f64 = 1.6;
pub const ADDRESS_PLAIN_TITLE_PRIOR: f64 = 1.5;
pub const ADDRESS_STREET_LINE_PRIOR: f64 = 1.0;

pub const DESCRIPTION_META_PRIOR: f64 = 2.0;
pub const DESCRIPTION_PARAGRAPH_PRIOR: f64 = 1.0;

/// Shortest reader-text line treated as a prose paragraph.
pub const MIN_PARAGRAPH_CHARS: usize = 80;

/// Parse the `value` and `suffix` groups of a price match into whole pounds.
pub fn parse_price(value: &str, suffix: Option<&str>) -> Option<u64> {
    let multiplier = match suffix.map(|s| s.to_ascii_lowercase()) {
        Some(s) if s == "m" => 1_000_000.0,
        Some(s) if s == "k" => 1_000.0,
        _ => 1.0,
    };

    let digits = value.replace(',', "");
    if digits.contains('.') {
        let amount: f64 = digits.parse().ok()?;
        Some((amount * multiplier).round() as u64)
    } else {
        let amount: u64 = digits.parse().ok()?;
        amount.checked_mul(multiplier as u64)
    }
}
