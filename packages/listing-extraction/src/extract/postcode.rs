//! UK postcode grammar and the curated area table.
//!
//! The area table is hand-maintained and known to have gaps, so an area is
//! classified as valid, invalid, or unknown rather than forced into a
//! boolean.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

/// Outward code (area + district) with an optional space before the inward code.
pub(crate) const POSTCODE_PATTERN: &str =
    r"\b(?P<outward>[A-Z]{1,2}[0-9]{1,2}[A-Z]?)[ ]?(?P<inward>[0-9][A-Z]{2})\b";

lazy_static! {
    static ref POSTCODE_REGEX: Regex = Regex::new(POSTCODE_PATTERN).unwrap();

    // An outward code standing alone at the end of an address line ("Whitefield, M45")
    static ref TRAILING_OUTWARD_REGEX: Regex = Regex::new(
        r"(?:^|[\s,])(?P<outward>[A-Z]{1,2}[0-9]{1,2}[A-Z]?)(?:\s?[0-9][A-Z]{2})?\s*$"
    ).unwrap();

    static ref VALID_AREAS: HashSet<&'static str> = GEOGRAPHIC_AREAS.iter().copied().collect();
}

/// The geographic postcode areas of the United Kingdom.
const GEOGRAPHIC_AREAS: &[&str] = &[
    "AB", "AL", "B", "BA", "BB", "BD", "BH", "BL", "BN", "BR", "BS", "BT", "CA", "CB", "CF",
    "CH", "CM", "CO", "CR", "CT", "CV", "CW", "DA", "DD", "DE", "DG", "DH", "DL", "DN", "DT",
    "DY", "E", "EC", "EH", "EN", "EX", "FK", "FY", "G", "GL", "GU", "HA", "HD", "HG", "HP",
    "HR", "HS", "HU", "HX", "IG", "IP", "IV", "KA", "KT", "KW", "KY", "L", "LA", "LD", "LE",
    "LL", "LN", "LS", "LU", "M", "ME", "MK", "ML", "N", "NE", "NG", "NN", "NP", "NR", "NW",
    "OL", "OX", "PA", "PE", "PH", "PL", "PO", "PR", "RG", "RH", "RM", "S", "SA", "SE", "SG",
    "SK", "SL", "SM", "SN", "SO", "SP", "SR", "SS", "ST", "SW", "SY", "TA", "TD", "TF", "TN",
    "TQ", "TR", "TS", "TW", "UB", "W", "WA", "WC", "WD", "WF", "WN", "WR", "WS", "WV", "YO",
    "ZE",
];

/// Non-geographic prefixes that never locate a property.
const NON_GEOGRAPHIC_AREAS: &[&str] = &["BF", "BX", "XX"];

/// Outcome of looking an area code up in the curated table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AreaValidity {
    Valid,
    Invalid,

    /// Structurally possible but absent from the table (e.g. Crown
    /// dependencies such as JE or GY)
    Unknown,
}

/// Normalize a postcode to `OUTWARD INWARD` form.
///
/// Returns `None` when the input does not match the postcode grammar.
pub fn normalize(raw: &str) -> Option<String> {
    let upper = raw.trim().to_uppercase();
    let caps = POSTCODE_REGEX.captures(&upper)?;
    let whole = caps.get(0)?;
    if whole.start() != 0 || whole.end() != upper.len() {
        return None;
    }
    Some(format!("{} {}", &caps["outward"], &caps["inward"]))
}

/// Leading letters of a postcode or outward code.
pub fn area_of(postcode: &str) -> &str {
    let end = postcode
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(postcode.len());
    &postcode[..end]
}

/// Outward code of a normalized postcode.
pub fn outward_of(postcode: &str) -> &str {
    postcode.split(' ').next().unwrap_or(postcode)
}

/// Classify an area code.
pub fn classify_area(area: &str) -> AreaValidity {
    if VALID_AREAS.contains(area) {
        return AreaValidity::Valid;
    }
    if NON_GEOGRAPHIC_AREAS.contains(&area) {
        return AreaValidity::Invalid;
    }

    let mut letters = area.chars();
    match (letters.next(), letters.next(), letters.next()) {
        (None, _, _) | (_, _, Some(_)) => AreaValidity::Invalid,
        // Q, V and X are never used in the first position
        (Some('Q' | 'V' | 'X'), _, _) => AreaValidity::Invalid,
        // I, J and Z are never used in the second position
        (Some(_), Some('I' | 'J' | 'Z'), None) => AreaValidity::Invalid,
        _ => AreaValidity::Unknown,
    }
}

/// Classify the area of a full postcode.
pub fn classify(postcode: &str) -> AreaValidity {
    classify_area(area_of(postcode))
}

/// Outward code at the end of an address line, if any.
pub fn trailing_outward(address: &str) -> Option<&str> {
    TRAILING_OUTWARD_REGEX
        .captures(address)
        .and_then(|caps| caps.name("outward"))
        .map(|m| m.as_str())
        .filter(|outward| classify_area(area_of(outward)) == AreaValidity::Valid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_area_table_size() {
        assert_eq!(GEOGRAPHIC_AREAS.len(), 121);
        assert_eq!(VALID_AREAS.len(), 121);
    }

    #[test]
    fn test_normalize_inserts_space() {
        assert_eq!(normalize("M241JZ").as_deref(), Some("M24 1JZ"));
        assert_eq!(normalize("sw1a 1aa").as_deref(), Some("SW1A 1AA"));
        assert_eq!(normalize("M24 1JZ").as_deref(), Some("M24 1JZ"));
        assert_eq!(normalize("not a postcode"), None);
        assert_eq!(normalize("M24 1JZ extra"), None);
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("M24 1JZ"), AreaValidity::Valid);
        assert_eq!(classify("EC1A 1BB"), AreaValidity::Valid);
        assert_eq!(classify("QA1 1AA"), AreaValidity::Invalid);
        assert_eq!(classify("AZ1 1AA"), AreaValidity::Invalid);
        assert_eq!(classify("BF1 1AA"), AreaValidity::Invalid);
        assert_eq!(classify("JE2 3AB"), AreaValidity::Unknown);
        assert_eq!(classify("GY1 1AA"), AreaValidity::Unknown);
    }

    #[test]
    fn test_outward_helpers() {
        assert_eq!(area_of("SW1A 1AA"), "SW");
        assert_eq!(outward_of("SW1A 1AA"), "SW1A");
        assert_eq!(trailing_outward("Bury Old Road, Whitefield, M45"), Some("M45"));
        assert_eq!(trailing_outward("Orme Avenue, Manchester M24 1JZ"), Some("M24"));
        assert_eq!(trailing_outward("Orme Avenue, Manchester"), None);
    }
}
