//! Pure helpers for cycle detection and tree assembly.

use std::collections::{HashMap, HashSet};

use common::CategoryId;

use super::{Category, CategoryNode};

/// Returns true if setting `category_id`'s parent to `new_parent` would make
/// the category its own ancestor.
///
/// Walks the proposed ancestor chain with a visited set, so a pre-existing
/// cycle elsewhere in the data terminates the walk instead of looping.
pub fn would_create_cycle(
    categories: &HashMap<CategoryId, Category>,
    category_id: CategoryId,
    new_parent: CategoryId,
) -> bool {
    if new_parent == category_id {
        return true;
    }

    let mut visited = HashSet::new();
    let mut current = Some(new_parent);

    while let Some(id) = current {
        if id == category_id {
            return true;
        }
        if !visited.insert(id) {
            return false;
        }
        current = categories.get(&id).and_then(|c| c.parent_id);
    }

    false
}

/// Assembles the active categories into a forest.
///
/// Roots are categories with no parent, or whose parent is missing or
/// inactive; orphaned subtrees are promoted to roots rather than dropped.
/// Siblings are ordered by `display_order`, then name.
pub fn build_tree(categories: Vec<Category>) -> Vec<CategoryNode> {
    let active: Vec<Category> = categories.into_iter().filter(|c| c.is_active).collect();
    let active_ids: HashSet<CategoryId> = active.iter().map(|c| c.id).collect();

    let mut children_of: HashMap<CategoryId, Vec<Category>> = HashMap::new();
    let mut roots: Vec<Category> = Vec::new();

    for category in active {
        match category.parent_id {
            Some(parent) if active_ids.contains(&parent) => {
                children_of.entry(parent).or_default().push(category);
            }
            _ => roots.push(category),
        }
    }

    sort_siblings(&mut roots);
    roots
        .into_iter()
        .map(|c| attach_children(c, &mut children_of))
        .collect()
}

fn attach_children(
    category: Category,
    children_of: &mut HashMap<CategoryId, Vec<Category>>,
) -> CategoryNode {
    let mut children = children_of.remove(&category.id).unwrap_or_default();
    sort_siblings(&mut children);
    CategoryNode {
        category,
        children: children
            .into_iter()
            .map(|c| attach_children(c, children_of))
            .collect(),
    }
}

fn sort_siblings(siblings: &mut [Category]) {
    siblings.sort_by(|a, b| {
        a.display_order
            .cmp(&b.display_order)
            .then_with(|| a.name.cmp(&b.name))
    });
}
