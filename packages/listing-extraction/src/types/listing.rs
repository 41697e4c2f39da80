//! The listing record handed to the calling layer.

use serde::{Deserialize, Serialize};

/// Controlled vocabulary of property types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PropertyType {
    Detached,
    #[serde(rename = "Semi-Detached")]
    SemiDetached,
    Terraced,
    Flat,
    Bungalow,
    Maisonette,
    Townhouse,
    Cottage,
    Studio,
}

impl PropertyType {
    /// Display label used by listing sites.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Detached => "Detached",
            Self::SemiDetached => "Semi-Detached",
            Self::Terraced => "Terraced",
            Self::Flat => "Flat",
            Self::Bungalow => "Bungalow",
            Self::Maisonette => "Maisonette",
            Self::Townhouse => "Townhouse",
            Self::Cottage => "Cottage",
            Self::Studio => "Studio",
        }
    }

    /// Normalize a vocabulary word as it appears in listing text.
    ///
    /// Returns `None` for words outside the vocabulary.
    pub fn from_word(word: &str) -> Option<Self> {
        let normalized = word.to_lowercase().replace(['-', ' '], "");
        let property_type = match normalized.as_str() {
            "semidetached" | "semi" => Self::SemiDetached,
            "detached" | "linkdetached" => Self::Detached,
            "terraced" | "terrace" | "endterrace" | "endofterrace" | "midterrace" => Self::Terraced,
            "flat" | "apartment" => Self::Flat,
            "bungalow" => Self::Bungalow,
            "maisonette" => Self::Maisonette,
            "townhouse" => Self::Townhouse,
            "cottage" => Self::Cottage,
            "studio" => Self::Studio,
            _ => return None,
        };
        Some(property_type)
    }
}

impl std::fmt::Display for PropertyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// The fields a listing record is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Address,
    Postcode,
    Price,
    PropertyType,
    Bedrooms,
    Description,
}

impl FieldKind {
    pub const ALL: [FieldKind; 6] = [
        FieldKind::Address,
        FieldKind::Postcode,
        FieldKind::Price,
        FieldKind::PropertyType,
        FieldKind::Bedrooms,
        FieldKind::Description,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Address => "address",
            Self::Postcode => "postcode",
            Self::Price => "price",
            Self::PropertyType => "property_type",
            Self::Bedrooms => "bedrooms",
            Self::Description => "description",
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured listing extracted from one page.
///
/// Every field is independently optional. A record with every field empty
/// is a valid "extraction failed" outcome and is distinct from a fetch
/// failure, which is reported as
/// [`ExtractError::AllBackendsFailed`](crate::error::ExtractError::AllBackendsFailed).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub address: Option<String>,
    pub postcode: Option<String>,

    /// Whole pounds
    pub price: Option<u64>,

    pub property_type: Option<PropertyType>,

    /// Always within 1..=20
    pub bedrooms: Option<u32>,

    /// At most 500 characters
    pub description: Option<String>,
}

impl ListingRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no field was resolved.
    pub fn is_empty(&self) -> bool {
        FieldKind::ALL.iter().all(|field| !self.has(*field))
    }

    /// True when price or address was resolved.
    ///
    /// The calling layer treats a record without either as a failed
    /// extraction and prompts for manual entry.
    pub fn is_usable(&self) -> bool {
        self.price.is_some() || self.address.is_some()
    }

    /// Whether a given field is resolved.
    pub fn has(&self, field: FieldKind) -> bool {
        match field {
            FieldKind::Address => self.address.is_some(),
            FieldKind::Postcode => self.postcode.is_some(),
            FieldKind::Price => self.price.is_some(),
            FieldKind::PropertyType => self.property_type.is_some(),
            FieldKind::Bedrooms => self.bedrooms.is_some(),
            FieldKind::Description => self.description.is_some(),
        }
    }

    /// Number of resolved fields.
    pub fn resolved_count(&self) -> usize {
        FieldKind::ALL.iter().filter(|f| self.has(**f)).count()
    }

    /// Copy one field from another record.
    pub(crate) fn take_field_from(&mut self, field: FieldKind, other: &ListingRecord) {
        match field {
            FieldKind::Address => self.address = other.address.clone(),
            FieldKind::Postcode => self.postcode = other.postcode.clone(),
            FieldKind::Price => self.price = other.price,
            FieldKind::PropertyType => self.property_type = other.property_type,
            FieldKind::Bedrooms => self.bedrooms = other.bedrooms,
            FieldKind::Description => self.description = other.description.clone(),
        }
    }
}
