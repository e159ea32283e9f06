use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::item::{Item, ItemId, TaskCounts};
use super::settings::StatusConfig;
use super::status::{Status, StatusCategory};

/// Maximum nesting level any item may reach
pub const MAX_NESTING_LEVEL: usize = 3;

/// Error type for structural tree operations
#[derive(Debug, thiserror::Error)]
pub enum HierarchyError {
    #[error("cannot nest item: maximum nesting level ({MAX_NESTING_LEVEL}) exceeded")]
    MaxNestingLevelExceeded,
    #[error("invalid hierarchy operation: {0}")]
    InvalidHierarchyOperation(String),
}

/// A single item in the arena. Parent/child relationships are stored as id
/// references, so structural edits are index rewrites, never subtree copies.
#[derive(Debug, Clone)]
pub struct Node {
    pub title: String,
    pub status: Status,
    pub is_collapsed: bool,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    parent: Option<ItemId>,
    children: Vec<ItemId>,
}

impl Node {
    pub fn parent(&self) -> Option<ItemId> {
        self.parent
    }

    /// Direct children, in sibling order
    pub fn children(&self) -> &[ItemId] {
        &self.children
    }

    /// An item with no children is a task leaf
    pub fn is_task(&self) -> bool {
        self.children.is_empty()
    }
}

/// The forest: every item addressed by its stable id, with the top-level
/// ordered sequence of roots owned here.
#[derive(Debug, Clone, Default)]
pub struct Forest {
    nodes: HashMap<ItemId, Node>,
    roots: Vec<ItemId>,
    next_id: u64,
}

impl Forest {
    pub fn new() -> Forest {
        Forest::default()
    }

    /// Build a forest from the gateway's recursive item shape. Id allocation
    /// resumes past the highest id seen.
    pub fn from_items(items: Vec<Item>) -> Forest {
        let mut forest = Forest::default();
        for item in &items {
            forest.next_id = forest.next_id.max(item.max_id());
        }
        for item in items {
            forest.insert_item_tree(item, None);
        }
        forest
    }

    /// Convert back to the gateway's recursive shape, preserving sibling
    /// order and parent/child links.
    pub fn to_items(&self) -> Vec<Item> {
        self.roots
            .iter()
            .filter_map(|id| self.item_tree(*id))
            .collect()
    }

    /// The subtree rooted at `id` in recursive item shape
    pub fn item_tree(&self, id: ItemId) -> Option<Item> {
        let node = self.nodes.get(&id)?;
        let children: Vec<Item> = node
            .children
            .iter()
            .filter_map(|c| self.item_tree(*c))
            .collect();
        Some(Item {
            id,
            title: node.title.clone(),
            status: node.status.clone(),
            is_collapsed: node.is_collapsed,
            sub_items: if children.is_empty() {
                None
            } else {
                Some(children)
            },
            created_at: node.created_at,
            modified_at: node.modified_at,
            completed_at: node.completed_at,
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn node(&self, id: ItemId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Top-level items in display order
    pub fn roots(&self) -> &[ItemId] {
        &self.roots
    }

    pub fn parent_of(&self, id: ItemId) -> Option<ItemId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    /// Create a new item that is not yet placed anywhere. The caller must
    /// `attach` or `discard_detached` it.
    pub fn insert_detached(&mut self, title: impl Into<String>, status: Status) -> ItemId {
        self.next_id += 1;
        let id = ItemId(self.next_id);
        let now = Utc::now();
        self.nodes.insert(
            id,
            Node {
                title: title.into(),
                status,
                is_collapsed: false,
                created_at: now,
                modified_at: now,
                completed_at: None,
                parent: None,
                children: Vec::new(),
            },
        );
        id
    }

    /// Drop a detached subtree. No-op if the item is attached or unknown.
    pub fn discard_detached(&mut self, id: ItemId) {
        if !self.contains(id) || self.parent_of(id).is_some() || self.roots.contains(&id) {
            return;
        }
        let mut ids = Vec::new();
        self.collect_subtree(id, &mut ids);
        for i in ids {
            self.nodes.remove(&i);
        }
    }

    // -----------------------------------------------------------------------
    // Structural primitives
    // -----------------------------------------------------------------------

    /// Place a detached item under `parent` (or at the forest root) at the
    /// given sibling index. Enforces the nesting invariant; on error the
    /// forest is unchanged.
    pub fn attach(
        &mut self,
        id: ItemId,
        parent: Option<ItemId>,
        index: usize,
    ) -> Result<(), HierarchyError> {
        if !self.contains(id) {
            return Err(HierarchyError::InvalidHierarchyOperation(format!(
                "unknown item {id}"
            )));
        }
        if self.parent_of(id).is_some() || self.roots.contains(&id) {
            return Err(HierarchyError::InvalidHierarchyOperation(format!(
                "item {id} is already attached"
            )));
        }
        match parent {
            Some(p) => {
                let count = match self.nodes.get(&p) {
                    Some(n) => n.children.len(),
                    None => {
                        return Err(HierarchyError::InvalidHierarchyOperation(format!(
                            "unknown parent {p}"
                        )));
                    }
                };
                if index > count {
                    return Err(HierarchyError::InvalidHierarchyOperation(format!(
                        "insert index {index} out of range for {p} ({count} children)"
                    )));
                }
                if !self.can_nest(id, p) {
                    return Err(HierarchyError::MaxNestingLevelExceeded);
                }
                if let Some(n) = self.nodes.get_mut(&p) {
                    n.children.insert(index, id);
                }
                if let Some(n) = self.nodes.get_mut(&id) {
                    n.parent = Some(p);
                }
                self.touch(p);
            }
            None => {
                if index > self.roots.len() {
                    return Err(HierarchyError::InvalidHierarchyOperation(format!(
                        "root index {index} out of range ({} roots)",
                        self.roots.len()
                    )));
                }
                self.roots.insert(index, id);
            }
        }
        Ok(())
    }

    /// Whether `child` may legally hang under `parent`:
    /// `max(parent.nesting_level, child.nesting_level + 1)` stays within the
    /// limit, and so does the path through the parent's ancestor chain.
    pub fn can_nest(&self, child: ItemId, parent: ItemId) -> bool {
        let potential = self
            .nesting_level(parent)
            .max(self.nesting_level(child) + 1)
            .max(self.depth(parent) + 1 + self.nesting_level(child));
        potential <= MAX_NESTING_LEVEL
    }

    /// Unhook an item (with its whole subtree) from its parent or from the
    /// forest root. The subtree stays in the arena, detached.
    pub fn detach(&mut self, id: ItemId) -> Result<(), HierarchyError> {
        let parent = match self.nodes.get(&id) {
            Some(n) => n.parent,
            None => {
                return Err(HierarchyError::InvalidHierarchyOperation(format!(
                    "unknown item {id}"
                )));
            }
        };
        match parent {
            Some(p) => {
                let pos = self
                    .nodes
                    .get(&p)
                    .and_then(|n| n.children.iter().position(|c| *c == id));
                let Some(pos) = pos else {
                    return Err(HierarchyError::InvalidHierarchyOperation(format!(
                        "{id} missing from children of {p}"
                    )));
                };
                if let Some(n) = self.nodes.get_mut(&p) {
                    n.children.remove(pos);
                }
                if let Some(n) = self.nodes.get_mut(&id) {
                    n.parent = None;
                }
                self.touch(p);
            }
            None => {
                let Some(pos) = self.roots.iter().position(|r| *r == id) else {
                    return Err(HierarchyError::InvalidHierarchyOperation(format!(
                        "item {id} is not attached"
                    )));
                };
                self.roots.remove(pos);
            }
        }
        Ok(())
    }

    /// Append a detached item as the last child of `parent`
    pub fn add_sub_item(&mut self, parent: ItemId, child: ItemId) -> Result<(), HierarchyError> {
        let count = self
            .nodes
            .get(&parent)
            .map(|n| n.children.len())
            .ok_or_else(|| {
                HierarchyError::InvalidHierarchyOperation(format!("unknown item {parent}"))
            })?;
        self.attach(child, Some(parent), count)
    }

    /// Remove a direct child of `parent`, returning its id. The detached
    /// subtree stays in the arena for the caller to re-attach or discard.
    pub fn remove_sub_item(&mut self, parent: ItemId, id: ItemId) -> Result<ItemId, HierarchyError> {
        let is_child = self
            .nodes
            .get(&parent)
            .is_some_and(|n| n.children.contains(&id));
        if !is_child {
            return Err(HierarchyError::InvalidHierarchyOperation(format!(
                "{id} is not a direct child of {parent}"
            )));
        }
        self.detach(id)?;
        Ok(id)
    }

    /// Reposition a direct child of `parent` from one sibling index to
    /// another. Both indices must be in `[0, count)`.
    pub fn move_sub_item(
        &mut self,
        parent: ItemId,
        from: usize,
        to: usize,
    ) -> Result<(), HierarchyError> {
        let Some(node) = self.nodes.get_mut(&parent) else {
            return Err(HierarchyError::InvalidHierarchyOperation(format!(
                "unknown item {parent}"
            )));
        };
        let count = node.children.len();
        if from >= count || to >= count {
            return Err(HierarchyError::InvalidHierarchyOperation(format!(
                "move {from} -> {to} out of range ({count} children)"
            )));
        }
        let child = node.children.remove(from);
        node.children.insert(to, child);
        self.touch(parent);
        Ok(())
    }

    /// Reposition a root item
    pub fn move_root(&mut self, from: usize, to: usize) -> Result<(), HierarchyError> {
        let count = self.roots.len();
        if from >= count || to >= count {
            return Err(HierarchyError::InvalidHierarchyOperation(format!(
                "move {from} -> {to} out of range ({count} roots)"
            )));
        }
        let id = self.roots.remove(from);
        self.roots.insert(to, id);
        Ok(())
    }

    /// Destroy an item and its entire subtree. Returns every removed id.
    pub fn remove_subtree(&mut self, id: ItemId) -> Vec<ItemId> {
        if !self.contains(id) {
            return Vec::new();
        }
        if self.parent_of(id).is_some() || self.roots.contains(&id) {
            // Detach cannot fail for an attached item
            let _ = self.detach(id);
        }
        let mut removed = Vec::new();
        self.collect_subtree(id, &mut removed);
        for rid in &removed {
            self.nodes.remove(rid);
        }
        removed
    }

    // -----------------------------------------------------------------------
    // Field mutators
    // -----------------------------------------------------------------------

    /// Stamp `modified_at`
    pub fn touch(&mut self, id: ItemId) {
        if let Some(n) = self.nodes.get_mut(&id) {
            n.modified_at = Utc::now();
        }
    }

    pub fn set_title(&mut self, id: ItemId, title: impl Into<String>) {
        if let Some(n) = self.nodes.get_mut(&id) {
            n.title = title.into();
        }
        self.touch(id);
    }

    /// Display-only; does not touch `modified_at`
    pub fn set_collapsed(&mut self, id: ItemId, collapsed: bool) {
        if let Some(n) = self.nodes.get_mut(&id) {
            n.is_collapsed = collapsed;
        }
    }

    /// Set the status, keeping `completed_at` in sync: entering the done
    /// class stamps it, leaving the done class clears it.
    pub fn set_status(&mut self, id: ItemId, status: Status) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        if node.status == status {
            return;
        }
        let was_done = node.status.is_done();
        let now_done = status.is_done();
        node.status = status;
        if now_done && !was_done {
            node.completed_at = Some(Utc::now());
        } else if was_done && !now_done {
            node.completed_at = None;
        }
        node.modified_at = Utc::now();
    }

    pub fn mark_as_done(&mut self, id: ItemId) {
        self.set_status(id, Status::done());
    }

    // -----------------------------------------------------------------------
    // Derived views
    // -----------------------------------------------------------------------

    /// Nesting level, bottom-up: a leaf is 0, a container is 1 + the max of
    /// its children's levels
    pub fn nesting_level(&self, id: ItemId) -> usize {
        self.nodes.get(&id).map_or(0, |n| {
            n.children
                .iter()
                .map(|c| self.nesting_level(*c) + 1)
                .max()
                .unwrap_or(0)
        })
    }

    /// Distance from the forest root (display level)
    pub fn depth(&self, id: ItemId) -> usize {
        let mut depth = 0;
        let mut cur = id;
        while let Some(p) = self.parent_of(cur) {
            depth += 1;
            cur = p;
        }
        depth
    }

    /// The ordered sibling sequence containing `id` (the roots for
    /// top-level items)
    pub fn sibling_list(&self, id: ItemId) -> &[ItemId] {
        match self.parent_of(id) {
            Some(p) => self
                .nodes
                .get(&p)
                .map(|n| n.children.as_slice())
                .unwrap_or(&[]),
            None => &self.roots,
        }
    }

    pub fn sibling_position(&self, id: ItemId) -> Option<usize> {
        self.sibling_list(id).iter().position(|s| *s == id)
    }

    /// Whether the entire subtree rooted at `id` is done
    pub fn is_subtree_done(&self, id: ItemId) -> bool {
        let Some(node) = self.nodes.get(&id) else {
            return false;
        };
        node.status.is_done() && node.children.iter().all(|c| self.is_subtree_done(*c))
    }

    /// Direct-children completion counts. A child container counts as
    /// completed only if its own full subtree is done.
    pub fn task_counts(&self, id: ItemId) -> TaskCounts {
        let Some(node) = self.nodes.get(&id) else {
            return TaskCounts::default();
        };
        TaskCounts {
            total: node.children.len(),
            completed: node
                .children
                .iter()
                .filter(|c| self.is_subtree_done(**c))
                .count(),
        }
    }

    /// All item ids in pre-order, ignoring collapse state
    pub fn preorder(&self) -> Vec<ItemId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        for root in &self.roots {
            self.push_preorder(*root, &mut out);
        }
        out
    }

    // -----------------------------------------------------------------------
    // Status/hierarchy consistency
    // -----------------------------------------------------------------------

    /// Keep one item's status consistent with its position in the tree.
    ///
    /// Containers are normalized to the depth-appropriate container class
    /// unless done; a container whose direct children are all done is forced
    /// done; a done container with a not-done child reverts. Leaves are
    /// untouched on passive passes; a forced resync (the item was just
    /// structurally moved) clears a stale container-class status back to the
    /// Task default.
    pub fn update_status_for_hierarchy(&mut self, id: ItemId, config: &StatusConfig, force: bool) {
        let (children, status) = match self.nodes.get(&id) {
            Some(n) => (n.children.clone(), n.status.clone()),
            None => return,
        };

        if children.is_empty() {
            if force && config.category_of(&status) != StatusCategory::Task {
                self.set_status(id, config.default_status(StatusCategory::Task));
            }
            return;
        }

        let expected = if self.depth(id) == 0 {
            StatusCategory::FirstLevel
        } else {
            StatusCategory::Intermediate
        };
        let all_done = children.iter().all(|c| self.is_subtree_done(*c));

        if all_done {
            if !status.is_done() {
                self.set_status(id, Status::done());
            }
        } else if status.is_done() || config.category_of(&status) != expected {
            self.set_status(id, config.default_status(expected));
        }
    }

    /// Full consistency pass: bottom-up over the whole forest so every
    /// done-cascade sees already-normalized children. Non-forced.
    pub fn normalize_hierarchy(&mut self, config: &StatusConfig) {
        for root in self.roots.clone() {
            self.normalize_subtree(root, config);
        }
    }

    fn normalize_subtree(&mut self, id: ItemId, config: &StatusConfig) {
        let children = self
            .nodes
            .get(&id)
            .map(|n| n.children.clone())
            .unwrap_or_default();
        for child in children {
            self.normalize_subtree(child, config);
        }
        self.update_status_for_hierarchy(id, config, false);
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn insert_item_tree(&mut self, item: Item, parent: Option<ItemId>) {
        let Item {
            id,
            title,
            status,
            is_collapsed,
            sub_items,
            created_at,
            modified_at,
            completed_at,
        } = item;
        self.nodes.insert(
            id,
            Node {
                title,
                status,
                is_collapsed,
                created_at,
                modified_at,
                completed_at,
                parent,
                children: Vec::new(),
            },
        );
        match parent {
            Some(p) => {
                if let Some(n) = self.nodes.get_mut(&p) {
                    n.children.push(id);
                }
            }
            None => self.roots.push(id),
        }
        for child in sub_items.unwrap_or_default() {
            self.insert_item_tree(child, Some(id));
        }
    }

    fn collect_subtree(&self, id: ItemId, out: &mut Vec<ItemId>) {
        out.push(id);
        if let Some(n) = self.nodes.get(&id) {
            for c in &n.children {
                self.collect_subtree(*c, out);
            }
        }
    }

    fn push_preorder(&self, id: ItemId, out: &mut Vec<ItemId>) {
        out.push(id);
        if let Some(n) = self.nodes.get(&id) {
            for c in &n.children {
                self.push_preorder(*c, out);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
