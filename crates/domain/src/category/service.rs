//! Category service with invariant-checked mutations.

use std::collections::HashMap;

use common::CategoryId;
use tokio::sync::Mutex;

use crate::error::DomainError;

use super::store::{CategoryStore, ProductCatalog};
use super::tree::{build_tree, would_create_cycle};
use super::{Category, CategoryError, CategoryNode, CategoryPatch, CategoryStats, NewCategory};

impl From<CategoryError> for DomainError {
    fn from(e: CategoryError) -> Self {
        DomainError::Category(e)
    }
}

/// Service for managing the category tree.
///
/// Mutations run check-then-act sequences (parent exists, no cycle, no live
/// references), so they are serialized by an internal mutex. Reads never take
/// that mutex.
pub struct CategoryService<C: CategoryStore, P: ProductCatalog> {
    store: C,
    catalog: P,
    write_lock: Mutex<()>,
}

impl<C: CategoryStore, P: ProductCatalog> CategoryService<C, P> {
    /// Creates a new category service over the given store and catalog.
    pub fn new(store: C, catalog: P) -> Self {
        Self {
            store,
            catalog,
            write_lock: Mutex::new(()),
        }
    }

    /// Creates a category.
    ///
    /// Fails with `ParentNotFound` when `parent_id` names no active category.
    #[tracing::instrument(skip(self))]
    pub async fn create(&self, new: NewCategory) -> Result<Category, DomainError> {
        let _guard = self.write_lock.lock().await;

        if let Some(parent_id) = new.parent_id {
            self.require_active_parent(parent_id).await?;
        }

        let category = Category::from_new(new);
        self.store.insert(category.clone()).await;

        tracing::debug!(category_id = %category.id, "category created");
        Ok(category)
    }

    /// Applies a partial update.
    ///
    /// A reparent is validated before anything is written: the new parent
    /// must be an active category and must not be the category itself or one
    /// of its descendants.
    #[tracing::instrument(skip(self))]
    pub async fn update(
        &self,
        id: CategoryId,
        patch: CategoryPatch,
    ) -> Result<Category, DomainError> {
        let _guard = self.write_lock.lock().await;

        let mut category = self
            .store
            .get(id)
            .await
            .ok_or(CategoryError::NotFound(id))?;

        if let Some(new_parent) = patch.parent_id {
            if let Some(parent_id) = new_parent {
                self.require_active_parent(parent_id).await?;

                let by_id: HashMap<CategoryId, Category> = self
                    .store
                    .all()
                    .await
                    .into_iter()
                    .map(|c| (c.id, c))
                    .collect();
                if would_create_cycle(&by_id, id, parent_id) {
                    return Err(CategoryError::Cycle(id).into());
                }
            }
            category.parent_id = new_parent;
        }

        if let Some(name) = patch.name {
            category.name = name;
        }
        if let Some(display_order) = patch.display_order {
            category.display_order = display_order;
        }
        if let Some(is_active) = patch.is_active {
            category.is_active = is_active;
        }
        category.updated_at = chrono::Utc::now();

        self.store.update(category.clone()).await;
        Ok(category)
    }

    /// Deletes a category.
    ///
    /// Fails with `HasChildren` when other categories still point at it and
    /// `HasProducts` when products are still assigned to it. Never cascades.
    #[tracing::instrument(skip(self))]
    pub async fn remove(&self, id: CategoryId) -> Result<(), DomainError> {
        let _guard = self.write_lock.lock().await;

        if self.store.get(id).await.is_none() {
            return Err(CategoryError::NotFound(id).into());
        }

        let has_children = self
            .store
            .all()
            .await
            .iter()
            .any(|c| c.parent_id == Some(id));
        if has_children {
            return Err(CategoryError::HasChildren(id).into());
        }

        if self.catalog.product_count(id).await > 0 {
            return Err(CategoryError::HasProducts(id).into());
        }

        self.store.remove(id).await;
        tracing::debug!(category_id = %id, "category removed");
        Ok(())
    }

    /// Returns a category by id.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: CategoryId) -> Result<Category, DomainError> {
        self.store
            .get(id)
            .await
            .ok_or_else(|| CategoryError::NotFound(id).into())
    }

    /// Returns categories flat, ordered by display order then id.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self, include_inactive: bool) -> Vec<Category> {
        let mut categories: Vec<Category> = self
            .store
            .all()
            .await
            .into_iter()
            .filter(|c| include_inactive || c.is_active)
            .collect();
        categories.sort_by(|a, b| {
            a.display_order
                .cmp(&b.display_order)
                .then_with(|| a.id.cmp(&b.id))
        });
        categories
    }

    /// Returns the active categories as a nested forest.
    #[tracing::instrument(skip(self))]
    pub async fn tree(&self) -> Vec<CategoryNode> {
        build_tree(self.store.all().await)
    }

    async fn require_active_parent(&self, parent_id: CategoryId) -> Result<(), DomainError> {
        match self.store.get(parent_id).await {
            Some(parent) if parent.is_active => Ok(()),
            _ => Err(CategoryError::ParentNotFound(parent_id).into()),
        }
    }

    /// Returns per-category child and product counts, computed on read.
    #[tracing::instrument(skip(self))]
    pub async fn stats(&self) -> Vec<CategoryStats> {
        let categories = self.list(true).await;

        let mut child_counts: HashMap<CategoryId, usize> = HashMap::new();
        for category in &categories {
            if let Some(parent) = category.parent_id {
                *child_counts.entry(parent).or_default() += 1;
            }
        }

        let mut stats = Vec::with_capacity(categories.len());
        for category in categories {
            let product_count = self.catalog.product_count(category.id).await;
            stats.push(CategoryStats {
                category_id: category.id,
                name: category.name,
                child_count: child_counts.get(&category.id).copied().unwrap_or(0),
                product_count,
            });
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::{InMemoryCategoryStore, InMemoryProductCatalog};
    use common::ProductId;

    fn service() -> CategoryService<InMemoryCategoryStore, InMemoryProductCatalog> {
        CategoryService::new(InMemoryCategoryStore::new(), InMemoryProductCatalog::new())
    }

    #[tokio::test]
    async fn create_root_and_child() {
        let service = service();

        let root = service.create(NewCategory::new("Beverages")).await.unwrap();
        let child = service
            .create(NewCategory::new("Coffee").under(root.id))
            .await
            .unwrap();

        assert_eq!(child.parent_id, Some(root.id));
        assert_eq!(service.list(false).await.len(), 2);
    }

    #[tokio::test]
    async fn create_under_missing_parent_fails() {
        let service = service();

        let result = service
            .create(NewCategory::new("Coffee").under(CategoryId::new()))
            .await;
        assert!(matches!(
            result,
            Err(DomainError::Category(CategoryError::ParentNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn create_under_inactive_parent_fails() {
        let service = service();
        let root = service.create(NewCategory::new("Beverages")).await.unwrap();
        service
            .update(root.id, CategoryPatch::new().set_active(false))
            .await
            .unwrap();

        let result = service
            .create(NewCategory::new("Coffee").under(root.id))
            .await;
        assert!(matches!(
            result,
            Err(DomainError::Category(CategoryError::ParentNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn self_parent_fails_with_cycle() {
        let service = service();
        let root = service.create(NewCategory::new("Beverages")).await.unwrap();

        let result = service
            .update(root.id, CategoryPatch::new().reparent(Some(root.id)))
            .await;
        assert!(matches!(
            result,
            Err(DomainError::Category(CategoryError::Cycle(_)))
        ));
    }

    #[tokio::test]
    async fn reparent_under_descendant_fails_and_tree_is_unchanged() {
        let service = service();
        let a = service.create(NewCategory::new("A")).await.unwrap();
        let b = service
            .create(NewCategory::new("B").under(a.id))
            .await
            .unwrap();
        let c = service
            .create(NewCategory::new("C").under(b.id))
            .await
            .unwrap();

        let result = service
            .update(a.id, CategoryPatch::new().reparent(Some(c.id)))
            .await;
        assert!(matches!(
            result,
            Err(DomainError::Category(CategoryError::Cycle(_)))
        ));

        // A is still a root
        assert_eq!(service.get(a.id).await.unwrap().parent_id, None);
    }

    #[tokio::test]
    async fn reparent_to_root_with_explicit_none() {
        let service = service();
        let a = service.create(NewCategory::new("A")).await.unwrap();
        let b = service
            .create(NewCategory::new("B").under(a.id))
            .await
            .unwrap();

        let updated = service
            .update(b.id, CategoryPatch::new().reparent(None))
            .await
            .unwrap();
        assert_eq!(updated.parent_id, None);
    }

    #[tokio::test]
    async fn remove_with_children_fails() {
        let service = service();
        let a = service.create(NewCategory::new("A")).await.unwrap();
        service
            .create(NewCategory::new("B").under(a.id))
            .await
            .unwrap();

        let result = service.remove(a.id).await;
        assert!(matches!(
            result,
            Err(DomainError::Category(CategoryError::HasChildren(_)))
        ));
        assert!(service.get(a.id).await.is_ok());
    }

    #[tokio::test]
    async fn remove_with_products_fails() {
        let store = InMemoryCategoryStore::new();
        let catalog = InMemoryProductCatalog::new();
        let service = CategoryService::new(store, catalog.clone());

        let category = service.create(NewCategory::new("Beverages")).await.unwrap();
        catalog.assign(ProductId::new(), category.id).await;

        let result = service.remove(category.id).await;
        assert!(matches!(
            result,
            Err(DomainError::Category(CategoryError::HasProducts(_)))
        ));
        assert!(service.get(category.id).await.is_ok());
    }

    #[tokio::test]
    async fn remove_leaf_succeeds() {
        let service = service();
        let a = service.create(NewCategory::new("A")).await.unwrap();
        let b = service
            .create(NewCategory::new("B").under(a.id))
            .await
            .unwrap();

        service.remove(b.id).await.unwrap();
        service.remove(a.id).await.unwrap();
        assert!(service.list(true).await.is_empty());
    }

    #[tokio::test]
    async fn list_orders_by_display_order_then_id() {
        let service = service();
        service
            .create(NewCategory::new("Later").at_order(5))
            .await
            .unwrap();
        service
            .create(NewCategory::new("Earlier").at_order(1))
            .await
            .unwrap();

        let listed = service.list(false).await;
        assert_eq!(listed[0].name, "Earlier");
        assert_eq!(listed[1].name, "Later");
    }

    #[tokio::test]
    async fn flattened_tree_matches_active_list() {
        let service = service();
        let a = service.create(NewCategory::new("A")).await.unwrap();
        let b = service
            .create(NewCategory::new("B").under(a.id))
            .await
            .unwrap();
        service
            .create(NewCategory::new("C").under(b.id))
            .await
            .unwrap();
        let hidden = service.create(NewCategory::new("Hidden")).await.unwrap();
        service
            .update(hidden.id, CategoryPatch::new().set_active(false))
            .await
            .unwrap();

        let tree = service.tree().await;
        let tree_size: usize = tree.iter().map(CategoryNode::size).sum();
        assert_eq!(tree_size, service.list(false).await.len());
    }

    #[tokio::test]
    async fn stats_counts_children_and_products() {
        let store = InMemoryCategoryStore::new();
        let catalog = InMemoryProductCatalog::new();
        let service = CategoryService::new(store, catalog.clone());

        let root = service.create(NewCategory::new("Root")).await.unwrap();
        service
            .create(NewCategory::new("Child").under(root.id))
            .await
            .unwrap();
        catalog.assign(ProductId::new(), root.id).await;
        catalog.assign(ProductId::new(), root.id).await;

        let stats = service.stats().await;
        let root_stats = stats.iter().find(|s| s.category_id == root.id).unwrap();
        assert_eq!(root_stats.child_count, 1);
        assert_eq!(root_stats.product_count, 2);
    }
}
