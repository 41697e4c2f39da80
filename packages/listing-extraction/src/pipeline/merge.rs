//! Per-field merge of partial records from several backends.

use std::collections::BTreeMap;

use crate::types::fetch::BackendId;
use crate::types::listing::{FieldKind, ListingRecord};

/// Fixed per-field ranking of backends.
///
/// A field is taken from the highest-ranked backend that resolved it.
/// Backends missing from a field's list rank after the listed ones, in
/// [`BackendId`] order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergePrecedence {
    orders: BTreeMap<FieldKind, Vec<BackendId>>,
}

impl Default for MergePrecedence {
    fn default() -> Self {
        use BackendId::*;

        // The reader proxy's title line is the most reliable address source;
        // rendered markup has the most reliable price and feature list
        Self::empty()
            .with_order(FieldKind::Address, [ReaderProxy, RenderingProxy, Direct])
            .with_order(FieldKind::Postcode, [ReaderProxy, RenderingProxy, Direct])
            .with_order(FieldKind::Price, [RenderingProxy, Direct, ReaderProxy])
            .with_order(FieldKind::Bedrooms, [RenderingProxy, Direct, ReaderProxy])
            .with_order(FieldKind::PropertyType, [RenderingProxy, Direct, ReaderProxy])
            .with_order(FieldKind::Description, [Direct, RenderingProxy, ReaderProxy])
    }
}

impl MergePrecedence {
    /// No explicit orders; every field falls back to [`BackendId`] order.
    pub fn empty() -> Self {
        Self {
            orders: BTreeMap::new(),
        }
    }

    /// Set the ranking for one field.
    pub fn with_order(mut self, field: FieldKind, order: impl IntoIterator<Item = BackendId>) -> Self {
        let mut ranked: Vec<BackendId> = Vec::new();
        for backend in order {
            if !ranked.contains(&backend) {
                ranked.push(backend);
            }
        }
        self.orders.insert(field, ranked);
        self
    }

    /// Full ranking for a field, every backend included.
    pub fn order_for(&self, field: FieldKind) -> Vec<BackendId> {
        let mut order = self.orders.get(&field).cloned().unwrap_or_default();
        for backend in BackendId::ALL {
            if !order.contains(&backend) {
                order.push(backend);
            }
        }
        order
    }

    /// Combine per-backend records field by field.
    pub fn merge(&self, records: &BTreeMap<BackendId, ListingRecord>) -> ListingRecord {
        let mut merged = ListingRecord::new();

        for field in FieldKind::ALL {
            let source = self
                .order_for(field)
                .into_iter()
                .filter_map(|backend| records.get(&backend))
                .find(|record| record.has(field));

            if let Some(record) = source {
                merged.take_field_from(field, record);
            }
        }

        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::listing::PropertyType;

    fn records(entries: Vec<(BackendId, ListingRecord)>) -> BTreeMap<BackendId, ListingRecord> {
        entries.into_iter().collect()
    }

    #[test]
    fn test_default_orders() {
        let precedence = MergePrecedence::default();
        assert_eq!(
            precedence.order_for(FieldKind::Address),
            vec![BackendId::ReaderProxy, BackendId::RenderingProxy, BackendId::Direct]
        );
        assert_eq!(precedence.order_for(FieldKind::Price)[0], BackendId::RenderingProxy);
    }

    #[test]
    fn test_unlisted_backends_appended() {
        let precedence = MergePrecedence::empty().with_order(FieldKind::Price, [BackendId::ReaderProxy]);
        assert_eq!(
            precedence.order_for(FieldKind::Price),
            vec![BackendId::ReaderProxy, BackendId::Direct, BackendId::RenderingProxy]
        );
        assert_eq!(precedence.order_for(FieldKind::Postcode), BackendId::ALL.to_vec());
    }

    #[test]
    fn test_merge_falls_through_on_missing_fields() {
        let direct = ListingRecord {
            address: Some("12 Bury Old Road, Whitefield".into()),
            price: Some(250_000),
            bedrooms: Some(4),
            ..Default::default()
        };
        let reader = ListingRecord {
            postcode: Some("M45 6TQ".into()),
            price: Some(245_000),
            property_type: Some(PropertyType::Detached),
            ..Default::default()
        };

        let merged = MergePrecedence::default().merge(&records(vec![
            (BackendId::Direct, direct),
            (BackendId::ReaderProxy, reader),
        ]));

        // Reader has no address, so it falls through to direct
        assert_eq!(merged.address.as_deref(), Some("12 Bury Old Road, Whitefield"));
        assert_eq!(merged.postcode.as_deref(), Some("M45 6TQ"));
        // Direct outranks reader for price
        assert_eq!(merged.price, Some(250_000));
        assert_eq!(merged.bedrooms, Some(4));
        assert_eq!(merged.property_type, Some(PropertyType::Detached));
        assert_eq!(merged.description, None);
    }

    #[test]
    fn test_merge_of_nothing_is_empty() {
        assert!(MergePrecedence::default().merge(&BTreeMap::new()).is_empty());
    }
}
