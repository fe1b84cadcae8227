pub mod entry;
pub mod error;
pub mod query;
pub mod snapshot;
pub mod store;

mod memory;
mod postgres;

pub use common::ProductId;
pub use entry::{LedgerEntry, LedgerEntryBuilder, MovementId, Sequence};
pub use error::{LedgerError, Result};
pub use memory::InMemoryLedgerStore;
pub use postgres::PostgresLedgerStore;
pub use query::LedgerQuery;
pub use snapshot::Snapshot;
pub use store::{AppendOptions, EntryStream, LedgerStore, LedgerStoreExt};
