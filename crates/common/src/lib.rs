//! Shared identifier types for the inventory core.

mod types;

pub use types::{ActorId, CategoryId, ProductId};
