//! Storage seams for the category tree.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{CategoryId, ProductId};
use tokio::sync::RwLock;

use super::Category;

/// Persistence seam for categories.
///
/// The service owns all invariant checks; stores only hold rows.
#[async_trait]
pub trait CategoryStore: Send + Sync {
    /// Returns the category with the given id, if any.
    async fn get(&self, id: CategoryId) -> Option<Category>;

    /// Returns all categories, active and inactive, in unspecified order.
    async fn all(&self) -> Vec<Category>;

    /// Inserts a new category.
    async fn insert(&self, category: Category);

    /// Replaces an existing category by id.
    async fn update(&self, category: Category);

    /// Removes a category. Returns false if it did not exist.
    async fn remove(&self, id: CategoryId) -> bool;
}

/// Lookup seam for product-to-category assignments.
///
/// The category service only needs to know whether products still reference
/// a category before deleting it.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Number of products directly assigned to the category.
    async fn product_count(&self, category_id: CategoryId) -> usize;
}

/// In-memory category store backed by a HashMap.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCategoryStore {
    categories: Arc<RwLock<HashMap<CategoryId, Category>>>,
}

impl InMemoryCategoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored categories.
    pub async fn count(&self) -> usize {
        self.categories.read().await.len()
    }
}

#[async_trait]
impl CategoryStore for InMemoryCategoryStore {
    async fn get(&self, id: CategoryId) -> Option<Category> {
        self.categories.read().await.get(&id).cloned()
    }

    async fn all(&self) -> Vec<Category> {
        self.categories.read().await.values().cloned().collect()
    }

    async fn insert(&self, category: Category) {
        self.categories.write().await.insert(category.id, category);
    }

    async fn update(&self, category: Category) {
        self.categories.write().await.insert(category.id, category);
    }

    async fn remove(&self, id: CategoryId) -> bool {
        self.categories.write().await.remove(&id).is_some()
    }
}

/// In-memory product catalog mapping products to their category.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProductCatalog {
    assignments: Arc<RwLock<HashMap<ProductId, CategoryId>>>,
}

impl InMemoryProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns a product to a category.
    pub async fn assign(&self, product_id: ProductId, category_id: CategoryId) {
        self.assignments
            .write()
            .await
            .insert(product_id, category_id);
    }

    /// Removes a product's category assignment.
    pub async fn unassign(&self, product_id: ProductId) {
        self.assignments.write().await.remove(&product_id);
    }
}

#[async_trait]
impl ProductCatalog for InMemoryProductCatalog {
    async fn product_count(&self, category_id: CategoryId) -> usize {
        self.assignments
            .read()
            .await
            .values()
            .filter(|&&c| c == category_id)
            .count()
    }
}
