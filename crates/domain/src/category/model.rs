//! Category data model.

use chrono::{DateTime, Utc};
use common::CategoryId;
use serde::{Deserialize, Serialize};

/// A node in the category forest.
///
/// Categories form a self-referencing tree via `parent_id`. The parent chain
/// of any category terminates without revisiting a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,

    pub name: String,

    /// None for root categories.
    pub parent_id: Option<CategoryId>,

    /// Ordering among siblings; lower comes first.
    pub display_order: i32,

    /// Inactive categories are hidden from the tree but keep their row.
    pub is_active: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Category {
    /// Creates an active category from creation input.
    pub fn from_new(new: NewCategory) -> Self {
        let now = Utc::now();
        Self {
            id: CategoryId::new(),
            name: new.name,
            parent_id: new.parent_id,
            display_order: new.display_order,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Input for creating a category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,

    #[serde(default)]
    pub parent_id: Option<CategoryId>,

    #[serde(default)]
    pub display_order: i32,
}

impl NewCategory {
    /// Creates input for a root category.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent_id: None,
            display_order: 0,
        }
    }

    /// Places the category under a parent.
    pub fn under(mut self, parent_id: CategoryId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Sets the sibling ordering.
    pub fn at_order(mut self, display_order: i32) -> Self {
        self.display_order = display_order;
        self
    }
}

/// A partial update to a category.
///
/// `parent_id` is doubly optional: the outer `Option` says whether the field
/// changes at all, the inner one distinguishes "make it a root" from a new
/// parent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryPatch {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default, with = "double_option", skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Option<CategoryId>>,

    #[serde(default)]
    pub display_order: Option<i32>,

    #[serde(default)]
    pub is_active: Option<bool>,
}

impl CategoryPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rename(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Moves the category under a new parent, or to the root with `None`.
    pub fn reparent(mut self, parent_id: Option<CategoryId>) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn reorder(mut self, display_order: i32) -> Self {
        self.display_order = Some(display_order);
        self
    }

    pub fn set_active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }
}

/// Serde helper for `Option<Option<T>>` so an explicit `"parent_id": null`
/// deserializes as `Some(None)` while an absent key stays `None`.
mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T, S>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

/// A category with its nested active children.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryNode {
    #[serde(flatten)]
    pub category: Category,

    pub children: Vec<CategoryNode>,
}

impl CategoryNode {
    /// Total number of categories in this subtree, including the root.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(CategoryNode::size).sum::<usize>()
    }
}

/// Per-category counts, computed on read.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryStats {
    pub category_id: CategoryId,

    pub name: String,

    /// Number of categories whose parent is this one.
    pub child_count: usize,

    /// Number of products directly assigned to this category.
    pub product_count: usize,
}
