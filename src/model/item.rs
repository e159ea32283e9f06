use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::Status;

/// Stable identity of an item for its lifetime
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node in the outline tree, in the shape the persistence gateway
/// exchanges. `sub_items` of `None` or empty means "is a task leaf".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub title: String,
    pub status: Status,
    /// Display-only: whether the subtree is collapsed in the outline
    #[serde(default)]
    pub is_collapsed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_items: Option<Vec<Item>>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Item {
    /// Create a fresh task leaf with the given status
    pub fn new(id: ItemId, title: impl Into<String>, status: Status) -> Item {
        let now = Utc::now();
        Item {
            id,
            title: title.into(),
            status,
            is_collapsed: false,
            sub_items: None,
            created_at: now,
            modified_at: now,
            completed_at: None,
        }
    }

    /// Direct children, empty slice for a leaf
    pub fn children(&self) -> &[Item] {
        self.sub_items.as_deref().unwrap_or(&[])
    }

    /// An item with no children is a task leaf
    pub fn is_task(&self) -> bool {
        self.children().is_empty()
    }

    /// Nesting level, computed bottom-up: a leaf is 0, a container is
    /// 1 + the max of its children's levels
    pub fn nesting_level(&self) -> usize {
        self.children()
            .iter()
            .map(|c| c.nesting_level() + 1)
            .max()
            .unwrap_or(0)
    }

    /// A container at nesting level 1
    pub fn is_project(&self) -> bool {
        !self.is_task() && self.nesting_level() == 1
    }

    /// A container at nesting level 2
    pub fn is_sub_project(&self) -> bool {
        !self.is_task() && self.nesting_level() == 2
    }

    /// The highest id anywhere in this subtree
    pub fn max_id(&self) -> u64 {
        self.children()
            .iter()
            .map(Item::max_id)
            .max()
            .map_or(self.id.0, |m| m.max(self.id.0))
    }
}

/// Derived direct-children completion counts for a container. A child
/// container counts as completed only if its own full subtree is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskCounts {
    pub completed: usize,
    pub total: usize,
}

impl TaskCounts {
    pub fn is_all_done(&self) -> bool {
        self.total > 0 && self.completed == self.total
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
