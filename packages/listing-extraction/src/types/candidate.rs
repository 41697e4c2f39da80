//! Candidate values proposed by extraction rules.

use serde::Serialize;

use crate::types::fetch::BackendId;
use crate::types::listing::{FieldKind, PropertyType};

/// A raw extracted value, before structural validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum CandidateValue {
    Address(String),
    Postcode(String),
    Price(u64),
    PropertyType(PropertyType),
    Bedrooms(u32),
    Description(String),
}

impl CandidateValue {
    pub fn field(&self) -> FieldKind {
        match self {
            Self::Address(_) => FieldKind::Address,
            Self::Postcode(_) => FieldKind::Postcode,
            Self::Price(_) => FieldKind::Price,
            Self::PropertyType(_) => FieldKind::PropertyType,
            Self::Bedrooms(_) => FieldKind::Bedrooms,
            Self::Description(_) => FieldKind::Description,
        }
    }
}

/// A single proposed value for one field.
///
/// Candidates live only for one fetch+extract pass and are dropped once
/// the resolver has picked a winner.
#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    pub value: CandidateValue,

    /// Name of the rule that produced this candidate
    pub rule: &'static str,

    /// Byte offset of the match in the normalized document text.
    ///
    /// Bytes rather than characters, so the offset slices `Document::text`
    /// directly. Ordering and tie-breaks are the same either way; the
    /// scoring window and front span are also in bytes, so a `£` counts as
    /// two.
    pub offset: usize,

    /// Rule prior before scoring, aggregate confidence after
    pub score: f64,

    pub backend: BackendId,
}

impl Candidate {
    pub fn new(
        value: CandidateValue,
        rule: &'static str,
        offset: usize,
        prior: f64,
        backend: BackendId,
    ) -> Self {
        Self {
            value,
            rule,
            offset,
            score: prior,
            backend,
        }
    }

    pub fn field(&self) -> FieldKind {
        self.value.field()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_follows_value() {
        let candidate = Candidate::new(
            CandidateValue::Postcode("M24 1JZ".into()),
            "postcode",
            42,
            1.0,
            BackendId::Direct,
        );
        assert_eq!(candidate.field(), FieldKind::Postcode);
        assert_eq!(candidate.score, 1.0);
    }
}
