use chrono::{DateTime, Utc};

use common::ProductId;

use crate::Sequence;

/// Builder for filtered reads of the movement ledger.
///
/// Supports filtering by product, entry type, sequence range, and time
/// range, plus pagination. Results default to oldest-first; the read API
/// for movement history asks for newest-first.
#[derive(Debug, Clone, Default)]
pub struct LedgerQuery {
    /// Filter by product ID.
    pub product_id: Option<ProductId>,

    /// Filter by entry types (any of these types).
    pub entry_types: Option<Vec<String>>,

    /// Filter by minimum sequence (inclusive).
    pub from_sequence: Option<Sequence>,

    /// Filter by maximum sequence (inclusive).
    pub to_sequence: Option<Sequence>,

    /// Filter by entries recorded at or after this timestamp.
    pub from_timestamp: Option<DateTime<Utc>>,

    /// Filter by entries recorded at or before this timestamp.
    pub to_timestamp: Option<DateTime<Utc>>,

    /// Return entries newest first instead of oldest first.
    pub newest_first: bool,

    /// Maximum number of entries to return.
    pub limit: Option<usize>,

    /// Number of entries to skip.
    pub offset: Option<usize>,
}

impl LedgerQuery {
    /// Creates a new empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for a specific product.
    pub fn for_product(product_id: ProductId) -> Self {
        Self {
            product_id: Some(product_id),
            ..Default::default()
        }
    }

    /// Creates a query for entries of a specific type.
    pub fn for_entry_type(entry_type: impl Into<String>) -> Self {
        Self {
            entry_types: Some(vec![entry_type.into()]),
            ..Default::default()
        }
    }

    /// Filters by product ID.
    pub fn product_id(mut self, id: ProductId) -> Self {
        self.product_id = Some(id);
        self
    }

    /// Filters by a single entry type.
    pub fn entry_type(mut self, entry_type: impl Into<String>) -> Self {
        self.entry_types = Some(vec![entry_type.into()]);
        self
    }

    /// Filters by multiple entry types (any of these).
    pub fn entry_types(mut self, entry_types: Vec<String>) -> Self {
        self.entry_types = Some(entry_types);
        self
    }

    /// Filters to entries starting from this sequence (inclusive).
    pub fn from_sequence(mut self, sequence: Sequence) -> Self {
        self.from_sequence = Some(sequence);
        self
    }

    /// Filters to entries up to this sequence (inclusive).
    pub fn to_sequence(mut self, sequence: Sequence) -> Self {
        self.to_sequence = Some(sequence);
        self
    }

    /// Filters to entries recorded at or after this timestamp.
    pub fn from_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.from_timestamp = Some(timestamp);
        self
    }

    /// Filters to entries recorded at or before this timestamp.
    pub fn to_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.to_timestamp = Some(timestamp);
        self
    }

    /// Orders results newest first.
    pub fn newest_first(mut self) -> Self {
        self.newest_first = true;
        self
    }

    /// Limits the number of entries returned.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips this many entries before returning results.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Convenience for page-based pagination (pages start at 1).
    pub fn page(self, page: usize, per_page: usize) -> Self {
        let page = page.max(1);
        self.limit(per_page).offset((page - 1) * per_page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_for_product() {
        let id = ProductId::new();
        let query = LedgerQuery::for_product(id);

        assert_eq!(query.product_id, Some(id));
        assert!(query.entry_types.is_none());
        assert!(!query.newest_first);
    }

    #[test]
    fn query_for_entry_type() {
        let query = LedgerQuery::for_entry_type("Received");

        assert!(query.product_id.is_none());
        assert_eq!(query.entry_types, Some(vec!["Received".to_string()]));
    }

    #[test]
    fn query_builder_chain() {
        let id = ProductId::new();
        let query = LedgerQuery::new()
            .product_id(id)
            .entry_type("Issued")
            .from_sequence(Sequence::new(1))
            .to_sequence(Sequence::new(10))
            .newest_first()
            .limit(50)
            .offset(0);

        assert_eq!(query.product_id, Some(id));
        assert_eq!(query.entry_types, Some(vec!["Issued".to_string()]));
        assert_eq!(query.from_sequence, Some(Sequence::new(1)));
        assert_eq!(query.to_sequence, Some(Sequence::new(10)));
        assert!(query.newest_first);
        assert_eq!(query.limit, Some(50));
        assert_eq!(query.offset, Some(0));
    }

    #[test]
    fn query_page_computes_offset() {
        let query = LedgerQuery::new().page(3, 20);
        assert_eq!(query.limit, Some(20));
        assert_eq!(query.offset, Some(40));

        // Page numbers below 1 clamp to the first page.
        let query = LedgerQuery::new().page(0, 20);
        assert_eq!(query.offset, Some(0));
    }
}
