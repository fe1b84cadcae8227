//! Category tree model and service.

mod model;
mod service;
mod store;
mod tree;

pub use model::{Category, CategoryNode, CategoryPatch, CategoryStats, NewCategory};
pub use service::CategoryService;
pub use store::{CategoryStore, InMemoryCategoryStore, InMemoryProductCatalog, ProductCatalog};
pub use tree::{build_tree, would_create_cycle};

use common::CategoryId;
use thiserror::Error;

/// Errors that can occur during category operations.
#[derive(Debug, Error)]
pub enum CategoryError {
    /// The category does not exist.
    #[error("Category not found: {0}")]
    NotFound(CategoryId),

    /// The requested parent does not exist or is inactive.
    #[error("Parent category not found or inactive: {0}")]
    ParentNotFound(CategoryId),

    /// The change would make the category its own ancestor.
    #[error("Change would create a cycle at category {0}")]
    Cycle(CategoryId),

    /// Other categories still point at this one.
    #[error("Category {0} still has child categories")]
    HasChildren(CategoryId),

    /// Products are still assigned to this category.
    #[error("Category {0} still has products assigned")]
    HasProducts(CategoryId),
}
