use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use common::ProductId;

/// Unique identifier for a single ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovementId(Uuid);

impl MovementId {
    /// Creates a new random movement ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a movement ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for MovementId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MovementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for MovementId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<MovementId> for Uuid {
    fn from(id: MovementId) -> Self {
        id.0
    }
}

/// Per-product position in the ledger, used for optimistic concurrency.
///
/// Sequences start at 1 for a product's first entry and increment by 1 for
/// each subsequent entry on that product.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Sequence(i64);

impl Sequence {
    /// Creates a sequence from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the initial sequence (0) for a product with no entries.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the first sequence (1) for a product's first entry.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next sequence.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw sequence value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Sequence {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Sequence> for i64 {
    fn from(sequence: Sequence) -> Self {
        sequence.0
    }
}

/// One immutable entry in a product's movement ledger.
///
/// Wraps a domain event payload with the bookkeeping the store needs:
/// identity, ordering, timestamp, and audit metadata. Entries are created
/// once and never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique identifier for this entry.
    pub movement_id: MovementId,

    /// The type of the entry (e.g. "Received", "Issued").
    pub entry_type: String,

    /// The product this entry belongs to.
    pub product_id: ProductId,

    /// Position in the product's ledger after this entry.
    pub sequence: Sequence,

    /// When the entry was recorded.
    pub recorded_at: DateTime<Utc>,

    /// The event payload as JSON.
    pub payload: serde_json::Value,

    /// Additional metadata (actor, reference, correlation ids).
    pub metadata: HashMap<String, serde_json::Value>,
}

impl LedgerEntry {
    /// Creates a new ledger entry builder.
    pub fn builder() -> LedgerEntryBuilder {
        LedgerEntryBuilder::default()
    }
}

/// Builder for constructing ledger entries.
#[derive(Debug, Default)]
pub struct LedgerEntryBuilder {
    movement_id: Option<MovementId>,
    entry_type: Option<String>,
    product_id: Option<ProductId>,
    sequence: Option<Sequence>,
    recorded_at: Option<DateTime<Utc>>,
    payload: Option<serde_json::Value>,
    metadata: HashMap<String, serde_json::Value>,
}

impl LedgerEntryBuilder {
    /// Sets the movement ID. If not set, a new ID is generated.
    pub fn movement_id(mut self, id: MovementId) -> Self {
        self.movement_id = Some(id);
        self
    }

    /// Sets the entry type.
    pub fn entry_type(mut self, entry_type: impl Into<String>) -> Self {
        self.entry_type = Some(entry_type.into());
        self
    }

    /// Sets the product ID.
    pub fn product_id(mut self, id: ProductId) -> Self {
        self.product_id = Some(id);
        self
    }

    /// Sets the sequence.
    pub fn sequence(mut self, sequence: Sequence) -> Self {
        self.sequence = Some(sequence);
        self
    }

    /// Sets the timestamp. If not set, the current time is used.
    pub fn recorded_at(mut self, recorded_at: DateTime<Utc>) -> Self {
        self.recorded_at = Some(recorded_at);
        self
    }

    /// Sets the payload from a serializable value.
    pub fn payload<T: Serialize>(mut self, payload: &T) -> Result<Self, serde_json::Error> {
        self.payload = Some(serde_json::to_value(payload)?);
        Ok(self)
    }

    /// Sets the payload from a raw JSON value.
    pub fn payload_raw(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Adds a metadata entry.
    pub fn metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Builds the ledger entry.
    ///
    /// # Panics
    ///
    /// Panics if required fields (entry_type, product_id, sequence, payload)
    /// are not set.
    pub fn build(self) -> LedgerEntry {
        LedgerEntry {
            movement_id: self.movement_id.unwrap_or_default(),
            entry_type: self.entry_type.expect("entry_type is required"),
            product_id: self.product_id.expect("product_id is required"),
            sequence: self.sequence.expect("sequence is required"),
            recorded_at: self.recorded_at.unwrap_or_else(Utc::now),
            payload: self.payload.expect("payload is required"),
            metadata: self.metadata,
        }
    }

    /// Tries to build the entry, returning None if required fields are missing.
    pub fn try_build(self) -> Option<LedgerEntry> {
        Some(LedgerEntry {
            movement_id: self.movement_id.unwrap_or_default(),
            entry_type: self.entry_type?,
            product_id: self.product_id?,
            sequence: self.sequence?,
            recorded_at: self.recorded_at.unwrap_or_else(Utc::now),
            payload: self.payload?,
            metadata: self.metadata,
        })
    }
}
