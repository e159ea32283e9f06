use std::time::{Duration, Instant};

use crate::io::{ForestStore, SaveDebouncer};
use crate::model::{Forest, ItemId, Node, StatusCategory, StatusConfig, TaskCounts};

use super::flatten::{FlatItem, flatten};

/// How long the failure signal stays visible before it auto-clears
pub const SHAKE_DURATION: Duration = Duration::from_millis(400);

/// The hierarchy engine: owns the forest, the selection/focus/editing state,
/// and the debounced persistence schedule. The presentation layer dispatches
/// intents here and re-renders from `flatten`.
///
/// Structural operations that cannot be satisfied leave the forest
/// completely unchanged and raise the transient shake signal; errors never
/// cross this boundary.
pub struct Outliner {
    forest: Forest,
    selected: Option<ItemId>,
    focused: Option<ItemId>,
    editing: Option<ItemId>,
    drafting: bool,
    pending_delete: Option<ItemId>,
    shake_at: Option<Instant>,
    debouncer: SaveDebouncer,
    store: Box<dyn ForestStore>,
}

impl Outliner {
    /// Load the forest from the gateway. A load failure is logged and the
    /// engine starts with an empty forest.
    pub fn with_store(store: Box<dyn ForestStore>) -> Outliner {
        let forest = match store.load() {
            Ok(items) => Forest::from_items(items),
            Err(e) => {
                tracing::warn!("failed to load forest, starting empty: {e}");
                Forest::new()
            }
        };
        Outliner {
            forest,
            selected: None,
            focused: None,
            editing: None,
            drafting: false,
            pending_delete: None,
            shake_at: None,
            debouncer: SaveDebouncer::default(),
            store,
        }
    }

    // -----------------------------------------------------------------------
    // Read surface
    // -----------------------------------------------------------------------

    /// The display-ready `(item, level)` sequence for the current
    /// collapse/focus state. Selection moves strictly along this order.
    pub fn flatten(&self) -> Vec<FlatItem> {
        flatten(&self.forest, self.focused)
    }

    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    pub fn item(&self, id: ItemId) -> Option<&Node> {
        self.forest.node(id)
    }

    pub fn task_counts(&self, id: ItemId) -> TaskCounts {
        self.forest.task_counts(id)
    }

    pub fn selected(&self) -> Option<ItemId> {
        self.selected
    }

    pub fn focused(&self) -> Option<ItemId> {
        self.focused
    }

    pub fn editing(&self) -> Option<ItemId> {
        self.editing
    }

    pub fn is_drafting(&self) -> bool {
        self.drafting
    }

    pub fn pending_delete(&self) -> Option<ItemId> {
        self.pending_delete
    }

    /// Whether the transient failure signal is currently active
    pub fn is_shaking(&self) -> bool {
        self.shake_at.is_some_and(|at| at.elapsed() < SHAKE_DURATION)
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    pub fn select(&mut self, id: ItemId) {
        if self.forest.contains(id) {
            self.selected = Some(id);
        }
    }

    pub fn select_next(&mut self) {
        self.step_selection(1);
    }

    pub fn select_previous(&mut self) {
        self.step_selection(-1);
    }

    fn step_selection(&mut self, direction: i32) {
        let flat = self.flatten();
        if flat.is_empty() {
            self.selected = None;
            return;
        }
        let next = match self
            .selected
            .and_then(|id| flat.iter().position(|r| r.id == id))
        {
            None => 0,
            Some(pos) => (pos as i32 + direction).clamp(0, flat.len() as i32 - 1) as usize,
        };
        self.selected = Some(flat[next].id);
    }

    // -----------------------------------------------------------------------
    // Title editing and item creation
    // -----------------------------------------------------------------------

    pub fn start_edit(&mut self) {
        self.editing = self.selected;
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Commit a title edit. A blank title leaves the item unchanged.
    pub fn commit_title(&mut self, title: &str) {
        let Some(id) = self.editing.take() else {
            return;
        };
        let title = title.trim();
        if title.is_empty() {
            return;
        }
        if self.forest.node(id).is_some_and(|n| n.title != title) {
            self.forest.set_title(id, title);
            self.mutated();
        }
    }

    pub fn start_new_item(&mut self) {
        self.drafting = true;
    }

    pub fn cancel_new_item(&mut self) {
        self.drafting = false;
    }

    /// Create a new task from a committed title. An empty (or
    /// whitespace-only) title is rejected: no node is created and the forest
    /// is untouched. The new item lands after the selected item among its
    /// siblings (as a child of the focus target when it is the selection in
    /// focus mode), or at the end of the forest root, and becomes selected.
    pub fn commit_new_item(&mut self, config: &StatusConfig, title: &str) -> Option<ItemId> {
        self.drafting = false;
        let title = title.trim();
        if title.is_empty() {
            return None;
        }

        let id = self
            .forest
            .insert_detached(title, config.default_status(StatusCategory::Task));

        let selected = self.selected.filter(|s| self.forest.contains(*s));
        let placed = match selected {
            Some(sel) if self.focused == Some(sel) => {
                // The focus target itself is selected: a sibling would land
                // outside the zoomed view, so nest under it instead
                let count = self.forest.node(sel).map_or(0, |n| n.children().len());
                self.forest.attach(id, Some(sel), count)
            }
            Some(sel) => {
                let parent = self.forest.parent_of(sel);
                let pos = self.forest.sibling_position(sel).map_or(0, |p| p + 1);
                self.forest.attach(id, parent, pos)
            }
            None => match self.focused.filter(|f| self.forest.contains(*f)) {
                Some(focus) => {
                    let count = self.forest.node(focus).map_or(0, |n| n.children().len());
                    self.forest.attach(id, Some(focus), count)
                }
                None => {
                    let count = self.forest.roots().len();
                    self.forest.attach(id, None, count)
                }
            },
        };

        if placed.is_err() {
            self.forest.discard_detached(id);
            self.shake();
            return None;
        }

        self.selected = Some(id);
        self.forest.normalize_hierarchy(config);
        self.mutated();
        Some(id)
    }

    // -----------------------------------------------------------------------
    // Structural editing
    // -----------------------------------------------------------------------

    /// Increase the selected item's nesting by one level: it becomes the
    /// last child of the nearest prior flattened entry at the same level.
    /// Shakes (no state change) if no such candidate exists or the nesting
    /// invariant would break.
    pub fn indent(&mut self, config: &StatusConfig) {
        let Some(sel) = self.selected else {
            self.shake();
            return;
        };
        let flat = self.flatten();
        let Some(pos) = flat.iter().position(|r| r.id == sel) else {
            self.shake();
            return;
        };
        let level = flat[pos].level;
        let Some(candidate) = flat[..pos].iter().rev().find(|r| r.level == level) else {
            self.shake();
            return;
        };
        let new_parent = candidate.id;
        if !self.forest.can_nest(sel, new_parent) {
            self.shake();
            return;
        }

        let orig_parent = self.forest.parent_of(sel);
        let orig_pos = self.forest.sibling_position(sel);
        let was_leaf = self.forest.node(new_parent).is_some_and(Node::is_task);
        if self.forest.detach(sel).is_err() {
            self.shake();
            return;
        }
        if was_leaf {
            // Promote the candidate to a container with the class its depth
            // calls for
            let class = if self.forest.depth(new_parent) == 0 {
                StatusCategory::FirstLevel
            } else {
                StatusCategory::Intermediate
            };
            self.forest.set_status(new_parent, config.default_status(class));
        }
        let count = self.forest.node(new_parent).map_or(0, |n| n.children().len());
        if self.forest.attach(sel, Some(new_parent), count).is_err() {
            let _ = self.forest.attach(sel, orig_parent, orig_pos.unwrap_or(0));
            self.shake();
            return;
        }

        self.forest.update_status_for_hierarchy(sel, config, true);
        self.forest.normalize_hierarchy(config);
        self.mutated();
    }

    /// Decrease the selected item's nesting by one level: it is reinserted
    /// under its grandparent (or the forest root) immediately after its old
    /// parent. Shakes if the item is already at the root.
    pub fn dedent(&mut self, config: &StatusConfig) {
        let Some(sel) = self.selected else {
            self.shake();
            return;
        };
        let Some(parent) = self.forest.parent_of(sel) else {
            self.shake();
            return;
        };
        let grandparent = self.forest.parent_of(parent);
        let Some(parent_pos) = self.forest.sibling_position(parent) else {
            self.shake();
            return;
        };

        let orig_pos = self.forest.sibling_position(sel);
        if self.forest.detach(sel).is_err() {
            self.shake();
            return;
        }
        // A parent left childless goes back to being a plain task
        if self.forest.node(parent).is_some_and(Node::is_task) {
            self.forest
                .set_status(parent, config.default_status(StatusCategory::Task));
        }
        if self
            .forest
            .attach(sel, grandparent, parent_pos + 1)
            .is_err()
        {
            let _ = self.forest.attach(sel, Some(parent), orig_pos.unwrap_or(0));
            self.shake();
            return;
        }

        self.forest.update_status_for_hierarchy(sel, config, true);
        self.forest.normalize_hierarchy(config);
        self.mutated();
    }

    /// Swap the selected item with its immediate previous sibling.
    /// Boundaries are a silent no-op.
    pub fn move_selected_up(&mut self) {
        self.swap_selected(-1);
    }

    /// Swap the selected item with its immediate next sibling
    pub fn move_selected_down(&mut self) {
        self.swap_selected(1);
    }

    fn swap_selected(&mut self, direction: i32) {
        let Some(sel) = self.selected else {
            return;
        };
        let Some(pos) = self.forest.sibling_position(sel) else {
            return;
        };
        let count = self.forest.sibling_list(sel).len();
        let target = pos as i32 + direction;
        if target < 0 || target >= count as i32 {
            return;
        }
        let target = target as usize;
        let moved = match self.forest.parent_of(sel) {
            Some(p) => self.forest.move_sub_item(p, pos, target),
            None => self.forest.move_root(pos, target),
        };
        if moved.is_ok() {
            self.mutated();
        }
    }

    // -----------------------------------------------------------------------
    // Status
    // -----------------------------------------------------------------------

    /// Step the selected item's status through its eligible set with
    /// wraparound. Containers at the top level cycle the first-level set,
    /// nested containers the intermediate set, leaves the task set. A status
    /// that is not a member falls back to the set's first element. A full
    /// done-cascade pass follows.
    pub fn cycle_status(&mut self, config: &StatusConfig, direction: i32) {
        let Some(sel) = self.selected else {
            return;
        };
        let Some(node) = self.forest.node(sel) else {
            return;
        };
        let category = if node.is_task() {
            StatusCategory::Task
        } else if self.forest.depth(sel) == 0 {
            StatusCategory::FirstLevel
        } else {
            StatusCategory::Intermediate
        };
        let current = node.status.clone();
        let set = config.statuses_for(category);
        if set.is_empty() {
            return;
        }
        let next = match set.iter().position(|s| *s == current) {
            Some(i) => set[(i as i32 + direction).rem_euclid(set.len() as i32) as usize].clone(),
            None => set[0].clone(),
        };
        self.forest.set_status(sel, next);
        self.forest.normalize_hierarchy(config);
        self.mutated();
    }

    /// Convenience toggle for leaves: done <-> task default, then cascade
    pub fn toggle_done(&mut self, config: &StatusConfig) {
        let Some(sel) = self.selected else {
            return;
        };
        let Some(node) = self.forest.node(sel) else {
            return;
        };
        if !node.is_task() {
            return;
        }
        if node.status.is_done() {
            self.forest
                .set_status(sel, config.default_status(StatusCategory::Task));
        } else {
            self.forest.mark_as_done(sel);
        }
        self.forest.normalize_hierarchy(config);
        self.mutated();
    }

    // -----------------------------------------------------------------------
    // Deletion (two-phase)
    // -----------------------------------------------------------------------

    /// Arm the yes/no prompt for the selected item
    pub fn request_delete(&mut self) {
        self.pending_delete = self.selected;
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Destroy the pending item and its whole subtree, wherever it sits in
    /// the forest. Selection moves to the flattened predecessor, if any; a
    /// parent left childless is demoted back to a task.
    pub fn confirm_delete(&mut self, config: &StatusConfig) {
        let Some(target) = self.pending_delete.take() else {
            return;
        };
        if !self.forest.contains(target) {
            return;
        }
        let flat = self.flatten();
        let predecessor = flat
            .iter()
            .position(|r| r.id == target)
            .and_then(|p| p.checked_sub(1))
            .map(|p| flat[p].id);

        let parent = self.forest.parent_of(target);
        let removed = self.forest.remove_subtree(target);

        if self.selected.is_some_and(|s| removed.contains(&s)) {
            self.selected = predecessor;
        }
        if self.focused.is_some_and(|f| removed.contains(&f)) {
            self.focused = None;
        }
        if self.editing.is_some_and(|e| removed.contains(&e)) {
            self.editing = None;
        }
        if let Some(p) = parent {
            if self.forest.node(p).is_some_and(Node::is_task) {
                self.forest
                    .set_status(p, config.default_status(StatusCategory::Task));
            }
        }
        self.forest.normalize_hierarchy(config);
        self.mutated();
    }

    // -----------------------------------------------------------------------
    // Collapse and focus
    // -----------------------------------------------------------------------

    /// Toggle the selected container's collapse state (leaves are a no-op)
    pub fn toggle_collapse(&mut self) {
        let Some(sel) = self.selected else {
            return;
        };
        let Some(node) = self.forest.node(sel) else {
            return;
        };
        if node.is_task() {
            return;
        }
        let collapsed = node.is_collapsed;
        self.forest.set_collapsed(sel, !collapsed);
        self.mutated();
    }

    /// Collapse or expand every container. When collapsing, a selection
    /// buried in a hidden subtree snaps to its nearest visible ancestor.
    pub fn set_all_collapsed(&mut self, collapsed: bool) {
        for id in self.forest.preorder() {
            if self.forest.node(id).is_some_and(|n| !n.is_task()) {
                self.forest.set_collapsed(id, collapsed);
            }
        }
        if collapsed {
            if let Some(sel) = self.selected {
                let flat = self.flatten();
                if !flat.iter().any(|r| r.id == sel) {
                    let mut cur = sel;
                    while let Some(p) = self.forest.parent_of(cur) {
                        cur = p;
                        if flat.iter().any(|r| r.id == cur) {
                            self.selected = Some(cur);
                            break;
                        }
                    }
                }
            }
        }
        self.mutated();
    }

    /// Zoom to the selected item, or zoom back out if it is already the
    /// focus target
    pub fn toggle_focus(&mut self) {
        match (self.focused, self.selected) {
            (Some(f), Some(s)) if f == s => self.focused = None,
            (_, Some(s)) => self.focused = Some(s),
            _ => self.focused = None,
        }
    }

    pub fn clear_focus(&mut self) {
        self.focused = None;
    }

    /// Breadcrumb for the focus target: its ancestor chain from the root
    /// down to the target itself. Empty when not focused.
    pub fn focus_path(&self) -> Vec<ItemId> {
        let Some(f) = self.focused else {
            return Vec::new();
        };
        let mut path = vec![f];
        let mut cur = f;
        while let Some(p) = self.forest.parent_of(cur) {
            path.push(p);
            cur = p;
        }
        path.reverse();
        path
    }

    /// Commit a breadcrumb entry: re-focus on one of the focus target's
    /// ancestors. Ids outside the breadcrumb are ignored.
    pub fn focus_ancestor(&mut self, id: ItemId) {
        if self.focus_path().contains(&id) {
            self.focused = Some(id);
        }
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Drive the debounced save: writes the forest once the quiet window
    /// after the last mutation has elapsed. Persistence failures are logged;
    /// the in-memory forest stays authoritative either way. Returns whether
    /// a save was attempted.
    pub fn tick(&mut self, now: Instant) -> bool {
        let Some(generation) = self.debouncer.due(now) else {
            return false;
        };
        let items = self.forest.to_items();
        match self.store.save(&items) {
            Ok(()) => tracing::debug!(generation, "forest saved"),
            Err(e) => tracing::warn!(generation, "forest save failed: {e}"),
        }
        self.debouncer.complete(generation);
        true
    }

    /// Immediate save (e.g. on shutdown), cancelling any pending schedule
    pub fn save_now(&mut self) -> bool {
        let items = self.forest.to_items();
        let ok = match self.store.save(&items) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("forest save failed: {e}");
                false
            }
        };
        self.debouncer.cancel();
        ok
    }

    pub fn has_pending_save(&self) -> bool {
        self.debouncer.is_pending()
    }

    fn mutated(&mut self) {
        self.debouncer.note_mutation(Instant::now());
    }

    fn shake(&mut self) {
        self.shake_at = Some(Instant::now());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::io::MemoryStore;
    use crate::model::{ItemId, Status};
    use pretty_assertions::assert_eq;

    fn engine() -> (Outliner, Rc<MemoryStore>, StatusConfig) {
        let store = Rc::new(MemoryStore::new());
        let outliner = Outliner::with_store(Box::new(store.clone()));
        (outliner, store, StatusConfig::default())
    }

    /// Three root tasks a, b, c
    fn engine_with_roots() -> (Outliner, Rc<MemoryStore>, StatusConfig, [ItemId; 3]) {
        let (mut o, store, config) = engine();
        let a = o.commit_new_item(&config, "a").unwrap();
        let b = o.commit_new_item(&config, "b").unwrap();
        let c = o.commit_new_item(&config, "c").unwrap();
        (o, store, config, [a, b, c])
    }

    fn visible(o: &Outliner) -> Vec<(ItemId, usize)> {
        o.flatten().iter().map(|r| (r.id, r.level)).collect()
    }

    #[test]
    fn committed_items_append_in_order() {
        let (o, _, _, [a, b, c]) = engine_with_roots();
        assert_eq!(visible(&o), vec![(a, 0), (b, 0), (c, 0)]);
        assert_eq!(o.selected(), Some(c));
    }

    #[test]
    fn empty_title_creates_nothing() {
        let (mut o, _, config, _) = engine_with_roots();
        let before = visible(&o);
        assert_eq!(o.commit_new_item(&config, "   "), None);
        assert_eq!(visible(&o), before);
    }

    #[test]
    fn new_item_lands_after_selection() {
        let (mut o, _, config, [a, b, c]) = engine_with_roots();
        o.select(a);
        let d = o.commit_new_item(&config, "d").unwrap();
        assert_eq!(visible(&o), vec![(a, 0), (d, 0), (b, 0), (c, 0)]);
    }

    #[test]
    fn new_item_nests_under_a_selected_focus_target() {
        let (mut o, _, config, [a, b, _]) = engine_with_roots();
        o.select(b);
        o.indent(&config);
        o.select(a);
        o.toggle_focus();

        // A sibling would land outside the zoomed view
        let d = o.commit_new_item(&config, "d").unwrap();
        assert_eq!(visible(&o), vec![(a, 0), (b, 1), (d, 1)]);
        assert_eq!(o.forest().parent_of(d), Some(a));
        assert_eq!(o.selected(), Some(d));
    }

    #[test]
    fn done_parent_reopens_when_it_gains_a_new_child() {
        let (mut o, _, config, [a, b, _]) = engine_with_roots();
        o.select(b);
        o.indent(&config);
        o.toggle_done(&config);
        assert!(o.item(a).unwrap().status.is_done());

        let d = o.commit_new_item(&config, "d").unwrap();
        assert_eq!(o.forest().parent_of(d), Some(a));
        assert_eq!(o.item(a).unwrap().status, Status::proj());
        assert!(o.item(a).unwrap().completed_at.is_none());
    }

    #[test]
    fn indent_nests_under_previous_same_level_entry() {
        let (mut o, _, config, [a, b, c]) = engine_with_roots();
        o.select(b);
        o.indent(&config);

        assert_eq!(visible(&o), vec![(a, 0), (b, 1), (c, 0)]);
        assert_eq!(o.item(a).unwrap().status, Status::proj());
        assert_eq!(o.item(b).unwrap().status, Status::todo());
        assert!(!o.is_shaking());
    }

    #[test]
    fn indent_first_root_shakes_without_mutation() {
        let (mut o, _, config, [a, ..]) = engine_with_roots();
        let before = visible(&o);
        o.select(a);
        o.indent(&config);
        assert_eq!(visible(&o), before);
        assert!(o.is_shaking());
        assert_eq!(o.item(a).unwrap().status, Status::todo());
    }

    #[test]
    fn indent_respects_nesting_invariant() {
        let (mut o, _, config) = engine();
        let r = o.commit_new_item(&config, "r").unwrap();
        let s = o.commit_new_item(&config, "s").unwrap();
        let t = o.commit_new_item(&config, "t").unwrap();
        let u = o.commit_new_item(&config, "u").unwrap();
        // Build the maximum-depth chain r > s > t > u
        o.select(s);
        o.indent(&config);
        o.select(t);
        o.indent(&config);
        o.indent(&config);
        o.select(u);
        o.indent(&config);
        o.indent(&config);
        o.indent(&config);
        assert_eq!(visible(&o), vec![(r, 0), (s, 1), (t, 2), (u, 3)]);
        assert!(!o.is_shaking());

        // A sibling of the deepest leaf cannot nest one further
        let v = o.commit_new_item(&config, "v").unwrap();
        o.indent(&config);
        assert_eq!(visible(&o), vec![(r, 0), (s, 1), (t, 2), (u, 3), (v, 3)]);
        assert!(o.is_shaking());
        assert_eq!(o.forest().nesting_level(r), crate::model::MAX_NESTING_LEVEL);
    }

    #[test]
    fn indent_then_dedent_restores_shape() {
        let (mut o, _, config, [a, b, c]) = engine_with_roots();
        o.select(b);
        o.indent(&config);
        o.dedent(&config);

        // b is back at the root, right after its old parent a
        assert_eq!(visible(&o), vec![(a, 0), (b, 0), (c, 0)]);
        // a lost its only child and is a plain task again
        assert_eq!(o.item(a).unwrap().status, Status::todo());
        assert!(o.item(a).unwrap().is_task());
    }

    #[test]
    fn dedent_at_root_shakes() {
        let (mut o, _, config, [a, ..]) = engine_with_roots();
        o.select(a);
        let before = visible(&o);
        o.dedent(&config);
        assert_eq!(visible(&o), before);
        assert!(o.is_shaking());
    }

    #[test]
    fn dedent_lands_after_old_parent() {
        let (mut o, _, config, [a, b, c]) = engine_with_roots();
        o.select(b);
        o.indent(&config);
        o.select(c);
        o.indent(&config);
        // a > [b, c]
        o.select(b);
        o.dedent(&config);
        assert_eq!(visible(&o), vec![(a, 0), (c, 1), (b, 0)]);
    }

    #[test]
    fn done_cascade_completes_parent() {
        let (mut o, _, config, [a, b, _]) = engine_with_roots();
        o.select(b);
        o.indent(&config);

        o.toggle_done(&config);
        assert!(o.item(b).unwrap().status.is_done());
        assert!(o.item(a).unwrap().status.is_done());
        assert!(o.item(a).unwrap().completed_at.is_some());
    }

    #[test]
    fn done_cascade_reverts_when_child_reopens() {
        let (mut o, _, config, [a, b, _]) = engine_with_roots();
        o.select(b);
        o.indent(&config);
        o.toggle_done(&config);

        o.toggle_done(&config);
        assert_eq!(o.item(b).unwrap().status, Status::todo());
        assert_eq!(o.item(a).unwrap().status, Status::proj());
        assert!(o.item(a).unwrap().completed_at.is_none());
    }

    #[test]
    fn cycle_status_steps_with_wraparound() {
        let (mut o, _, config, [a, ..]) = engine_with_roots();
        o.select(a);
        o.cycle_status(&config, 1);
        assert_eq!(o.item(a).unwrap().status, Status::doing());
        o.cycle_status(&config, -1);
        o.cycle_status(&config, -1);
        // Wrapped backwards to the end of the task set
        assert_eq!(o.item(a).unwrap().status, Status::future());
    }

    #[test]
    fn cycle_status_falls_back_for_non_member() {
        let (mut o, _, config, [a, ..]) = engine_with_roots();
        let mut custom = StatusConfig::default();
        custom.register_custom(Status::custom("WAITING", None), StatusCategory::Task);
        // Put a status on the item the default config does not know
        o.select(a);
        o.cycle_status(&custom, 1);
        o.cycle_status(&custom, 1);
        o.cycle_status(&custom, 1);
        o.cycle_status(&custom, 1);
        o.cycle_status(&custom, 1);
        o.cycle_status(&custom, 1);
        assert_eq!(o.item(a).unwrap().status, Status::custom("WAITING", None));
        // Under the default config WAITING is not a member: fall back
        o.cycle_status(&config, 1);
        assert_eq!(o.item(a).unwrap().status, Status::todo());
    }

    #[test]
    fn container_cycles_its_level_set() {
        let (mut o, _, config, [a, b, _]) = engine_with_roots();
        o.select(b);
        o.indent(&config);
        o.select(a);
        // Single-element first-level set wraps onto itself
        o.cycle_status(&config, 1);
        assert_eq!(o.item(a).unwrap().status, Status::proj());
    }

    #[test]
    fn delete_is_two_phase_and_removes_the_subtree() {
        let (mut o, _, config, [a, b, c]) = engine_with_roots();
        o.select(b);
        o.indent(&config);
        o.select(a);

        o.request_delete();
        assert_eq!(o.pending_delete(), Some(a));
        o.cancel_delete();
        assert_eq!(o.pending_delete(), None);
        assert_eq!(visible(&o), vec![(a, 0), (b, 1), (c, 0)]);

        o.request_delete();
        o.confirm_delete(&config);
        assert_eq!(visible(&o), vec![(c, 0)]);
        assert!(!o.forest().contains(a));
        assert!(!o.forest().contains(b));
        // a had no flattened predecessor
        assert_eq!(o.selected(), None);
    }

    #[test]
    fn delete_moves_selection_to_predecessor() {
        let (mut o, _, config, [a, b, _]) = engine_with_roots();
        o.select(b);
        o.request_delete();
        o.confirm_delete(&config);
        assert_eq!(o.selected(), Some(a));
    }

    #[test]
    fn deleting_last_child_demotes_parent() {
        let (mut o, _, config, [a, b, _]) = engine_with_roots();
        o.select(b);
        o.indent(&config);
        o.request_delete();
        o.confirm_delete(&config);
        assert!(o.item(a).unwrap().is_task());
        assert_eq!(o.item(a).unwrap().status, Status::todo());
    }

    #[test]
    fn move_up_down_swaps_siblings_and_stops_at_edges() {
        let (mut o, _, _, [a, b, c]) = engine_with_roots();
        o.select(b);
        o.move_selected_down();
        assert_eq!(visible(&o), vec![(a, 0), (c, 0), (b, 0)]);
        o.move_selected_down();
        // Boundary: silent no-op, no shake
        assert_eq!(visible(&o), vec![(a, 0), (c, 0), (b, 0)]);
        assert!(!o.is_shaking());
        o.move_selected_up();
        o.move_selected_up();
        assert_eq!(visible(&o), vec![(b, 0), (a, 0), (c, 0)]);
    }

    #[test]
    fn selection_walks_the_flattened_order() {
        let (mut o, _, config, [a, b, c]) = engine_with_roots();
        o.select(b);
        o.indent(&config);
        o.select(a);
        o.select_next();
        assert_eq!(o.selected(), Some(b));
        o.select_next();
        assert_eq!(o.selected(), Some(c));
        o.select_next();
        assert_eq!(o.selected(), Some(c));

        // Collapse hides b; navigation skips it
        o.select(a);
        o.toggle_collapse();
        o.select_next();
        assert_eq!(o.selected(), Some(c));
        o.select_previous();
        assert_eq!(o.selected(), Some(a));
    }

    #[test]
    fn focus_restricts_view_and_breadcrumb_navigates() {
        let (mut o, _, config, [a, b, c]) = engine_with_roots();
        o.select(b);
        o.indent(&config);
        o.select(c);
        o.indent(&config);
        o.select(c);
        o.indent(&config); // a > b > c

        o.select(b);
        o.toggle_focus();
        assert_eq!(visible(&o), vec![(b, 0), (c, 1)]);
        assert_eq!(o.focus_path(), vec![a, b]);

        o.focus_ancestor(a);
        assert_eq!(o.focused(), Some(a));
        assert_eq!(visible(&o), vec![(a, 0), (b, 1), (c, 2)]);

        // Ids outside the breadcrumb are ignored
        o.focus_ancestor(c);
        assert_eq!(o.focused(), Some(a));

        o.clear_focus();
        assert_eq!(o.focused(), None);
    }

    #[test]
    fn toggle_focus_on_focus_target_zooms_out() {
        let (mut o, _, _, [a, ..]) = engine_with_roots();
        o.select(a);
        o.toggle_focus();
        assert_eq!(o.focused(), Some(a));
        o.toggle_focus();
        assert_eq!(o.focused(), None);
    }

    #[test]
    fn collapse_all_snaps_selection_to_visible_ancestor() {
        let (mut o, _, config, [a, b, _]) = engine_with_roots();
        o.select(b);
        o.indent(&config);
        o.select(b);
        o.set_all_collapsed(true);
        assert_eq!(o.selected(), Some(a));
        o.set_all_collapsed(false);
        assert_eq!(visible(&o).len(), 3);
    }

    #[test]
    fn title_edit_commits_and_rejects_blank() {
        let (mut o, _, _, [a, ..]) = engine_with_roots();
        o.select(a);
        o.start_edit();
        assert_eq!(o.editing(), Some(a));
        o.commit_title("  renamed  ");
        assert_eq!(o.item(a).unwrap().title, "renamed");
        assert_eq!(o.editing(), None);

        o.start_edit();
        o.commit_title("   ");
        assert_eq!(o.item(a).unwrap().title, "renamed");
    }

    #[test]
    fn mutations_debounce_into_a_single_save() {
        let (mut o, store, config, _) = engine_with_roots();
        assert_eq!(store.save_count(), 0);
        assert!(o.has_pending_save());

        let early = Instant::now();
        assert!(!o.tick(early));

        // Another edit inside the window re-arms it
        o.select_next();
        o.cycle_status(&config, 1);

        let late = Instant::now() + Duration::from_millis(600);
        assert!(o.tick(late));
        assert_eq!(store.save_count(), 1);
        assert!(!o.has_pending_save());
        assert!(!o.tick(late + Duration::from_secs(1)));
    }

    #[test]
    fn failed_save_keeps_memory_authoritative() {
        let (mut o, store, _, [a, ..]) = engine_with_roots();
        store.set_fail_saves(true);
        assert!(o.tick(Instant::now() + Duration::from_secs(1)));
        // The forest still reflects the edits; the store does not
        assert!(o.forest().contains(a));
        assert_eq!(store.items(), Vec::new());

        store.set_fail_saves(false);
        assert!(o.save_now());
        assert_eq!(store.items().len(), 3);
    }

    #[test]
    fn load_failure_starts_empty() {
        struct BrokenStore;
        impl crate::io::ForestStore for BrokenStore {
            fn load(&self) -> Result<Vec<crate::model::Item>, crate::io::StoreError> {
                Err(crate::io::StoreError::Io(std::io::Error::other("boom")))
            }
            fn save(&self, _: &[crate::model::Item]) -> Result<(), crate::io::StoreError> {
                Ok(())
            }
        }
        let o = Outliner::with_store(Box::new(BrokenStore));
        assert!(o.forest().is_empty());
    }
}
