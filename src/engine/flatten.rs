use crate::model::{Forest, ItemId};

/// A row in the display-ready flattened sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatItem {
    pub id: ItemId,
    /// Display level: 0 for roots (or the focus target in focus mode)
    pub level: usize,
    pub has_children: bool,
    pub is_collapsed: bool,
}

/// Produce the linear, collapse/focus-aware display order.
///
/// With a focus target set, output is restricted to that item (at level 0)
/// plus its descendants; otherwise the whole forest is walked pre-order.
/// Descendants of collapsed items never appear.
pub fn flatten(forest: &Forest, focused: Option<ItemId>) -> Vec<FlatItem> {
    let mut out = Vec::new();
    match focused {
        Some(id) if forest.contains(id) => flatten_into(forest, id, 0, &mut out),
        _ => {
            for root in forest.roots() {
                flatten_into(forest, *root, 0, &mut out);
            }
        }
    }
    out
}

fn flatten_into(forest: &Forest, id: ItemId, level: usize, out: &mut Vec<FlatItem>) {
    let Some(node) = forest.node(id) else {
        return;
    };
    let has_children = !node.is_task();
    out.push(FlatItem {
        id,
        level,
        has_children,
        is_collapsed: node.is_collapsed,
    });
    if has_children && !node.is_collapsed {
        for child in node.children() {
            flatten_into(forest, *child, level + 1, out);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
