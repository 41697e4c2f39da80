//! Field resolution: one winning candidate per field, or none.

use std::cmp::Ordering;
use tracing::debug;

use super::postcode::{self, AreaValidity};
use crate::types::candidate::{Candidate, CandidateValue};
use crate::types::config::ExtractionConfig;
use crate::types::listing::{FieldKind, ListingRecord};

/// How a field was resolved.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// Top candidate scored at or above the acceptance threshold
    Confident(Candidate),

    /// No candidate reached the threshold; the best one is used anyway
    BestEffort(Candidate),

    Unresolved,
}

impl Resolution {
    pub fn candidate(&self) -> Option<&Candidate> {
        match self {
            Self::Confident(c) | Self::BestEffort(c) => Some(c),
            Self::Unresolved => None,
        }
    }

    pub fn is_confident(&self) -> bool {
        matches!(self, Self::Confident(_))
    }
}

/// Structural validity of a candidate value.
///
/// Invalid values are discarded outright, whatever their score.
pub fn admits(config: &ExtractionConfig, value: &CandidateValue) -> bool {
    match value {
        CandidateValue::Price(price) => {
            *price >= config.price_floor && *price <= config.price_ceiling
        }
        CandidateValue::Bedrooms(count) => {
            *count >= config.bedroom_min && *count <= config.bedroom_max
        }
        CandidateValue::Postcode(code) => match postcode::classify(code) {
            AreaValidity::Valid => true,
            AreaValidity::Unknown => config.admit_unknown_postcode_areas,
            AreaValidity::Invalid => false,
        },
        CandidateValue::Address(address) => !address.trim().is_empty(),
        CandidateValue::Description(text) => {
            !text.trim().is_empty() && text.chars().count() <= config.description_max_chars
        }
        CandidateValue::PropertyType(_) => true,
    }
}

/// Picks the winning candidate per field.
pub struct FieldResolver<'a> {
    config: &'a ExtractionConfig,
}

impl<'a> FieldResolver<'a> {
    pub fn new(config: &'a ExtractionConfig) -> Self {
        Self { config }
    }

    /// Resolve one field.
    ///
    /// Surviving candidates are ordered by score, ties going to the earliest
    /// offset.
    pub fn resolve(&self, field: FieldKind, candidates: &[Candidate]) -> Resolution {
        let mut surviving: Vec<&Candidate> = candidates
            .iter()
            .filter(|c| c.field() == field && admits(self.config, &c.value))
            .collect();

        surviving.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then(a.offset.cmp(&b.offset))
        });

        let Some(top) = surviving.first() else {
            return Resolution::Unresolved;
        };

        if top.score >= self.config.scoring.acceptance_threshold {
            Resolution::Confident((*top).clone())
        } else {
            Resolution::BestEffort((*top).clone())
        }
    }

    /// Resolve every field into a record.
    pub fn resolve_record(&self, candidates: &[Candidate]) -> ListingRecord {
        let mut record = ListingRecord::new();

        for field in FieldKind::ALL {
            let resolution = self.resolve(field, candidates);
            let Some(winner) = resolution.candidate() else {
                continue;
            };

            debug!(
                field = field.as_str(),
                rule = winner.rule,
                score = winner.score,
                confident = resolution.is_confident(),
                "Resolved field"
            );

            match &winner.value {
                CandidateValue::Address(v) => record.address = Some(v.clone()),
                CandidateValue::Postcode(v) => record.postcode = Some(v.clone()),
                CandidateValue::Price(v) => record.price = Some(*v),
                CandidateValue::PropertyType(v) => record.property_type = Some(*v),
                CandidateValue::Bedrooms(v) => record.bedrooms = Some(*v),
                CandidateValue::Description(v) => record.description = Some(v.clone()),
            }
        }

        record
    }
}
