//! Sparse expanded/collapsed store keyed by path, with the vetoable expand/collapse protocol
//! and reconciliation against model change events.

use std::fmt::Debug;
use std::hash::Hash;

use rustc_hash::{FxBuildHasher, FxHashMap};

use crate::event::{ListenerId, Listeners};
use crate::model::{TreeModel, TreeModelEvent, TreeModelEventKind};
use crate::path::TreePath;
use crate::selection::TreeSelectionModel;

/// Listener consulted before a path expands or collapses.
pub type WillExpandListener<Id> = Box<dyn FnMut(&ExpansionEvent<'_, Id>) -> ExpandDecision>;
/// Listener told after a path expanded or collapsed.
pub type ExpansionListener<Id> = Box<dyn FnMut(&ExpansionEvent<'_, Id>)>;

/// Phase of an expansion transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpansionKind {
    WillExpand,
    WillCollapse,
    Expanded,
    Collapsed,
}

/// Notification for one path; `state` is the store as of the notification.
#[derive(Clone, Copy)]
pub struct ExpansionEvent<'a, Id> {
    pub kind: ExpansionKind,
    pub path: &'a TreePath<Id>,
    pub state: &'a ExpansionState<Id>,
}

/// Answer of a will-expand/will-collapse listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpandDecision {
    Allow,
    Veto,
}

/// Outcome of an expand/collapse request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// At least one entry changed.
    Committed,
    /// The path already had the requested state; no notifications fired.
    Unchanged,
    /// A listener vetoed. Ancestors expanded before the veto stay expanded.
    Vetoed,
}

impl Transition {
    /// Returns `true` unless the request was vetoed.
    pub const fn took_effect(self) -> bool {
        !matches!(self, Self::Vetoed)
    }
}

/// Read side of the store: stored entries and the derived expansion/visibility queries.
///
/// Only transitions and reconciliation write entries; queries never create them.
#[derive(Clone, Debug)]
pub struct ExpansionState<Id> {
    entries: FxHashMap<TreePath<Id>, bool>,
}

impl<Id: Copy + Eq + Hash> Default for ExpansionState<Id> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Id: Copy + Eq + Hash> ExpansionState<Id> {
    pub fn new() -> Self {
        Self {
            entries: FxHashMap::with_hasher(FxBuildHasher),
        }
    }

    /// Number of stored entries (expanded or collapsed).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Raw stored entry for a root-first node slice.
    pub fn entry(&self, nodes: &[Id]) -> Option<bool> {
        self.entries.get(nodes).copied()
    }

    /// Stored entries in arbitrary order.
    pub fn entries(&self) -> impl Iterator<Item = (&TreePath<Id>, bool)> {
        self.entries.iter().map(|(path, &expanded)| (path, expanded))
    }

    /// `true` iff the path and every ancestor are stored as expanded.
    pub fn is_expanded(&self, path: &TreePath<Id>) -> bool {
        self.is_expanded_nodes(path.nodes())
    }

    pub(crate) fn is_expanded_nodes(&self, nodes: &[Id]) -> bool {
        !nodes.is_empty()
            && (1..=nodes.len()).all(|len| self.entries.get(&nodes[..len]) == Some(&true))
    }

    pub fn is_collapsed(&self, path: &TreePath<Id>) -> bool {
        !self.is_expanded(path)
    }

    /// `true` iff the path has any stored entry.
    pub fn has_been_expanded(&self, path: &TreePath<Id>) -> bool {
        self.entries.contains_key(path)
    }

    /// `true` for the root and for paths whose parent is expanded.
    pub fn is_visible(&self, path: &TreePath<Id>) -> bool {
        let nodes = path.nodes();
        path.is_root() || self.is_expanded_nodes(&nodes[..nodes.len() - 1])
    }

    /// Expanded, visible paths strictly below `parent`.
    ///
    /// Yields nothing when `parent` itself is not expanded. Scans every stored entry.
    pub fn expanded_descendants<'a>(
        &'a self,
        parent: &'a TreePath<Id>,
    ) -> impl Iterator<Item = &'a TreePath<Id>> + 'a {
        let entries = self.is_expanded(parent).then(|| self.entries.iter());
        entries
            .into_iter()
            .flatten()
            .filter(move |&(path, &expanded)| {
                expanded
                    && path != parent
                    && path.is_descendant_of(parent)
                    && !parent.is_descendant_of(path)
                    && self.is_visible(path)
            })
            .map(|(path, _)| path)
    }

    /// Paths at or below `parent` that have any stored entry.
    pub fn descendant_toggled_paths<'a>(
        &'a self,
        parent: &'a TreePath<Id>,
    ) -> impl Iterator<Item = &'a TreePath<Id>> + 'a {
        self.entries
            .keys()
            .filter(move |path| path.is_descendant_of(parent))
    }

    fn set(&mut self, path: TreePath<Id>, expanded: bool) {
        self.entries.insert(path, expanded);
    }

    fn remove(&mut self, nodes: &[Id]) -> bool {
        self.entries.remove(nodes).is_some()
    }

    /// Drops entries below `prefix` (and at it, when `inclusive`); returns the count dropped.
    fn remove_descendants(&mut self, prefix: &[Id], inclusive: bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|path, _| {
            let nodes = path.nodes();
            !(nodes.starts_with(prefix) && (inclusive || nodes.len() > prefix.len()))
        });
        before - self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Expansion state plus the listeners and scratch space needed to change it.
pub struct ExpansionStore<Id> {
    state: ExpansionState<Id>,
    will_expand: Listeners<dyn FnMut(&ExpansionEvent<'_, Id>) -> ExpandDecision>,
    expansion: Listeners<dyn FnMut(&ExpansionEvent<'_, Id>)>,
    // Prefix lengths of collapsed ancestors, reused between calls.
    scratch: Vec<usize>,
    // Number of entries written so far, vetoed transitions included.
    commits: u64,
}

impl<Id: Copy + Eq + Hash + Debug> Default for ExpansionStore<Id> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Id: Copy + Eq + Hash + Debug> ExpansionStore<Id> {
    pub fn new() -> Self {
        Self {
            state: ExpansionState::new(),
            will_expand: Listeners::new(),
            expansion: Listeners::new(),
            scratch: Vec::new(),
            commits: 0,
        }
    }

    #[inline]
    pub const fn state(&self) -> &ExpansionState<Id> {
        &self.state
    }

    /// Counts committed entries; a change between two reads means the state moved.
    #[inline]
    pub(crate) const fn commit_count(&self) -> u64 {
        self.commits
    }

    pub fn add_will_expand_listener(&mut self, listener: WillExpandListener<Id>) -> ListenerId {
        self.will_expand.add(listener)
    }

    pub fn remove_will_expand_listener(&mut self, id: ListenerId) -> bool {
        self.will_expand.remove(id)
    }

    pub fn add_expansion_listener(&mut self, listener: ExpansionListener<Id>) -> ListenerId {
        self.expansion.add(listener)
    }

    pub fn remove_expansion_listener(&mut self, id: ListenerId) -> bool {
        self.expansion.remove(id)
    }

    /// Clears every entry and marks the model's root expanded unless it is a leaf.
    pub fn reset<M: TreeModel<Id = Id>>(&mut self, model: &M) {
        self.state.clear();
        if let Some(root) = model.root()
            && !model.is_leaf(root)
        {
            self.state.set(TreePath::new(root), true);
        }
    }

    /// Expands or collapses `path`.
    ///
    /// Expanding first expands every collapsed ancestor, root first. Each ancestor is asked,
    /// committed and announced before the next one is asked, so a veto part-way through keeps
    /// the ancestors already committed. Collapsing removes selected descendants of `path` and
    /// selects `path` instead if any were removed.
    pub fn set_expanded_state(
        &mut self,
        path: &TreePath<Id>,
        expand: bool,
        selection: &mut dyn TreeSelectionModel<Id>,
    ) -> Transition {
        if expand {
            self.expand(path)
        } else {
            self.collapse(path, selection)
        }
    }

    fn expand(&mut self, path: &TreePath<Id>) -> Transition {
        let nodes = path.nodes();
        let mut stack = std::mem::take(&mut self.scratch);
        let mut len = nodes.len() - 1;
        while len > 0 && !self.state.is_expanded_nodes(&nodes[..len]) {
            stack.push(len);
            len -= 1;
        }

        let mut outcome = Transition::Unchanged;
        while let Some(len) = stack.pop() {
            // A listener may already have expanded this ancestor as a side effect.
            if self.state.is_expanded_nodes(&nodes[..len]) {
                continue;
            }
            let ancestor = TreePath::from_slice(&nodes[..len]);
            if !self.commit(&ancestor, true) {
                stack.clear();
                self.scratch = stack;
                return Transition::Vetoed;
            }
            outcome = Transition::Committed;
        }
        self.scratch = stack;

        if self.state.entry(nodes) == Some(true) {
            return outcome;
        }
        if self.commit(path, true) {
            Transition::Committed
        } else {
            Transition::Vetoed
        }
    }

    fn collapse(
        &mut self,
        path: &TreePath<Id>,
        selection: &mut dyn TreeSelectionModel<Id>,
    ) -> Transition {
        if self.state.entry(path.nodes()) == Some(false) {
            return Transition::Unchanged;
        }
        if !self.commit(path, false) {
            return Transition::Vetoed;
        }
        promote_selection(selection, path);
        Transition::Committed
    }

    /// Asks, writes and announces one entry; returns `false` on veto.
    fn commit(&mut self, path: &TreePath<Id>, expand: bool) -> bool {
        let (ask, done) = if expand {
            (ExpansionKind::WillExpand, ExpansionKind::Expanded)
        } else {
            (ExpansionKind::WillCollapse, ExpansionKind::Collapsed)
        };

        let event = ExpansionEvent {
            kind: ask,
            path,
            state: &self.state,
        };
        let vetoed = self
            .will_expand
            .iter_mut()
            .any(|listener| listener(&event) == ExpandDecision::Veto);
        if vetoed {
            log::debug!("{ask:?} vetoed for {path}");
            return false;
        }

        self.state.set(path.clone(), expand);
        self.commits += 1;
        let event = ExpansionEvent {
            kind: done,
            path,
            state: &self.state,
        };
        for listener in self.expansion.iter_mut() {
            listener(&event);
        }
        log::debug!("{done:?} {path}");
        true
    }

    /// Brings the store in line with a structural change reported by the model.
    pub fn model_changed<M: TreeModel<Id = Id>>(
        &mut self,
        model: &M,
        event: &TreeModelEvent<Id>,
        selection: &mut dyn TreeSelectionModel<Id>,
    ) {
        match event.kind {
            TreeModelEventKind::NodesChanged | TreeModelEventKind::NodesInserted => {}
            TreeModelEventKind::StructureChanged => {
                self.structure_changed(model, &event.path, selection);
            }
            TreeModelEventKind::NodesRemoved => self.nodes_removed(model, event, selection),
        }
    }

    fn structure_changed<M: TreeModel<Id = Id>>(
        &mut self,
        model: &M,
        path: &TreePath<Id>,
        selection: &mut dyn TreeSelectionModel<Id>,
    ) {
        if path.is_root() {
            log::debug!("structure changed at root {path}; resetting expansion state");
            self.reset(model);
        } else if self.state.has_been_expanded(path) {
            let was_expanded = self.state.is_expanded(path);
            let pruned = self.state.remove_descendants(path.nodes(), false);
            log::trace!("structure changed at {path}; dropped {pruned} descendant entries");
            if was_expanded {
                let node = path.last();
                if model.contains(node) && !model.is_leaf(node) {
                    self.state.set(path.clone(), true);
                } else {
                    self.collapse(path, selection);
                }
            }
        }
        promote_selection(selection, path);
    }

    fn nodes_removed<M: TreeModel<Id = Id>>(
        &mut self,
        model: &M,
        event: &TreeModelEvent<Id>,
        selection: &mut dyn TreeSelectionModel<Id>,
    ) {
        for removed in event.child_paths() {
            let pruned = self.state.remove_descendants(removed.nodes(), true);
            if pruned > 0 {
                log::trace!("{removed} removed; dropped {pruned} entries");
            }
            remove_descendant_selections(selection, &removed, true);
        }

        let parent = &event.path;
        let node = parent.last();
        if !model.contains(node) {
            log::warn!("removal reported under {parent}, which is no longer in the model");
            self.state.remove(parent.nodes());
        } else if model.is_leaf(node) && self.state.remove(parent.nodes()) {
            log::trace!("{parent} became a leaf; dropped its entry");
        }
    }
}

/// Deselects the descendants of `path` (and `path`, when `include_path`).
///
/// Returns `true` if anything was deselected.
pub(crate) fn remove_descendant_selections<Id: Copy + Eq>(
    selection: &mut dyn TreeSelectionModel<Id>,
    path: &TreePath<Id>,
    include_path: bool,
) -> bool {
    let doomed: Vec<TreePath<Id>> = selection
        .paths()
        .iter()
        .filter(|selected| selected.is_descendant_of(path) && (include_path || *selected != path))
        .cloned()
        .collect();
    if doomed.is_empty() {
        return false;
    }
    selection.remove_paths(&doomed);
    true
}

/// Moves the selection of hidden descendants up to `path`.
pub(crate) fn promote_selection<Id: Copy + Eq>(
    selection: &mut dyn TreeSelectionModel<Id>,
    path: &TreePath<Id>,
) {
    if remove_descendant_selections(selection, path, false) && !selection.is_path_selected(path) {
        selection.add_path(path);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::selection::DefaultTreeSelectionModel;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    /// Adjacency-list tree; node 0 is the root.
    struct Fixed {
        children: Vec<Vec<usize>>,
    }

    impl Fixed {
        fn new(children: Vec<Vec<usize>>) -> Self {
            Self { children }
        }
    }

    impl TreeModel for Fixed {
        type Id = usize;

        fn root(&self) -> Option<Self::Id> {
            Some(0)
        }

        fn child_count(&self, parent: Self::Id) -> usize {
            self.children.get(parent).map_or(0, Vec::len)
        }

        fn child(&self, parent: Self::Id, index: usize) -> Option<Self::Id> {
            self.children.get(parent)?.get(index).copied()
        }

        fn contains(&self, id: Self::Id) -> bool {
            id < self.children.len()
        }
    }

    fn p(nodes: &[usize]) -> TreePath<usize> {
        TreePath::from_nodes(nodes.iter().copied()).unwrap()
    }

    fn seeded(model: &Fixed) -> ExpansionStore<usize> {
        let mut store = ExpansionStore::new();
        store.reset(model);
        store
    }

    type Log = Rc<RefCell<Vec<(ExpansionKind, TreePath<usize>)>>>;

    fn record_everything(store: &mut ExpansionStore<usize>) -> Log {
        let log: Log = Rc::default();
        let asked = Rc::clone(&log);
        store.add_will_expand_listener(Box::new(move |event: &ExpansionEvent<'_, usize>| {
            asked.borrow_mut().push((event.kind, event.path.clone()));
            ExpandDecision::Allow
        }));
        let told = Rc::clone(&log);
        store.add_expansion_listener(Box::new(move |event: &ExpansionEvent<'_, usize>| {
            told.borrow_mut().push((event.kind, event.path.clone()));
        }));
        log
    }

    // 0 -> {1, 2}, 1 -> {3}, 3 -> {4}, 2 -> {5}
    fn chain() -> Fixed {
        Fixed::new(vec![vec![1, 2], vec![3], vec![5], vec![4], vec![], vec![]])
    }

    #[test]
    fn root_is_seeded_unless_leaf() {
        let store = seeded(&chain());
        assert!(store.state().is_expanded(&p(&[0])));
        assert!(store.state().is_visible(&p(&[0, 1])));
        assert!(!store.state().is_expanded(&p(&[0, 1])));

        let lonely = seeded(&Fixed::new(vec![vec![]]));
        assert!(lonely.state().is_empty());
        assert!(!lonely.state().has_been_expanded(&p(&[0])));
    }

    #[test]
    fn expanding_twice_notifies_once() {
        let model = chain();
        let mut store = seeded(&model);
        let mut selection = DefaultTreeSelectionModel::new();
        let log = record_everything(&mut store);

        assert_eq!(
            store.set_expanded_state(&p(&[0, 1]), true, &mut selection),
            Transition::Committed
        );
        assert_eq!(
            store.set_expanded_state(&p(&[0, 1]), true, &mut selection),
            Transition::Unchanged
        );

        assert_eq!(
            *log.borrow(),
            vec![
                (ExpansionKind::WillExpand, p(&[0, 1])),
                (ExpansionKind::Expanded, p(&[0, 1])),
            ]
        );
    }

    #[test]
    fn expanding_deep_path_opens_ancestors_root_first() {
        let model = chain();
        let mut store = seeded(&model);
        let mut selection = DefaultTreeSelectionModel::new();
        let log = record_everything(&mut store);

        store.set_expanded_state(&p(&[0, 1, 3, 4]), true, &mut selection);

        let expanded: Vec<_> = log
            .borrow()
            .iter()
            .filter(|(kind, _)| *kind == ExpansionKind::Expanded)
            .map(|(_, path)| path.clone())
            .collect();
        assert_eq!(expanded, vec![p(&[0, 1]), p(&[0, 1, 3]), p(&[0, 1, 3, 4])]);
        assert!(store.state().is_visible(&p(&[0, 1, 3, 4])));
    }

    #[test]
    fn veto_midway_keeps_committed_ancestors() {
        let model = chain();
        let mut store = seeded(&model);
        let mut selection = DefaultTreeSelectionModel::new();
        let a = p(&[0, 1]);
        let b = p(&[0, 1, 3]);
        let c = p(&[0, 1, 3, 4]);

        let seen_a_open = Rc::new(RefCell::new(false));
        let seen = Rc::clone(&seen_a_open);
        let veto_at = b.clone();
        let a_probe = a.clone();
        store.add_will_expand_listener(Box::new(move |event: &ExpansionEvent<'_, usize>| {
            if *event.path == veto_at {
                *seen.borrow_mut() = event.state.is_expanded(&a_probe);
                ExpandDecision::Veto
            } else {
                ExpandDecision::Allow
            }
        }));

        assert_eq!(
            store.set_expanded_state(&c, true, &mut selection),
            Transition::Vetoed
        );
        assert!(*seen_a_open.borrow());
        assert!(store.state().is_expanded(&a));
        assert!(!store.state().is_expanded(&b));
        assert!(!store.state().is_expanded(&c));
        assert!(!store.state().has_been_expanded(&c));
    }

    #[test]
    fn collapse_from_unknown_and_veto_keeps_unknown() {
        let model = chain();
        let mut store = seeded(&model);
        let mut selection = DefaultTreeSelectionModel::new();
        let target = p(&[0, 2]);

        let id = store.add_will_expand_listener(Box::new(|_: &ExpansionEvent<'_, usize>| {
            ExpandDecision::Veto
        }));
        assert_eq!(
            store.set_expanded_state(&target, false, &mut selection),
            Transition::Vetoed
        );
        assert!(!store.state().has_been_expanded(&target));

        store.remove_will_expand_listener(id);
        assert_eq!(
            store.set_expanded_state(&target, false, &mut selection),
            Transition::Committed
        );
        assert_eq!(store.state().entry(target.nodes()), Some(false));
        assert_eq!(
            store.set_expanded_state(&target, false, &mut selection),
            Transition::Unchanged
        );
    }

    #[test]
    fn collapsing_promotes_hidden_selection() {
        let model = chain();
        let mut store = seeded(&model);
        let mut selection = DefaultTreeSelectionModel::new();
        let a = p(&[0, 1]);
        let deep = p(&[0, 1, 3, 4]);
        store.set_expanded_state(&p(&[0, 1, 3]), true, &mut selection);
        selection.set_path(&deep);

        store.set_expanded_state(&a, false, &mut selection);

        assert!(selection.is_path_selected(&a));
        assert!(!selection.is_path_selected(&deep));
        assert_eq!(selection.selection_count(), 1);
    }

    #[test]
    fn structure_change_prunes_below_and_reopens_non_leaf() {
        // 0 -> 1 (P) -> 2 (a) -> 3 (b) -> 4
        let mut model = Fixed::new(vec![vec![1], vec![2], vec![3], vec![4], vec![]]);
        let mut store = seeded(&model);
        let mut selection = DefaultTreeSelectionModel::new();
        store.set_expanded_state(&p(&[0, 1, 2, 3]), true, &mut selection);

        let event = TreeModelEvent::structure_changed(p(&[0, 1, 2]));
        store.model_changed(&model, &event, &mut selection);

        assert!(store.state().is_expanded(&p(&[0, 1])));
        assert!(store.state().is_expanded(&p(&[0, 1, 2])));
        assert!(!store.state().has_been_expanded(&p(&[0, 1, 2, 3])));

        // Now `a` loses its children and turns into a leaf.
        model.children[2].clear();
        store.model_changed(&model, &event, &mut selection);
        assert!(store.state().has_been_expanded(&p(&[0, 1, 2])));
        assert!(!store.state().is_expanded(&p(&[0, 1, 2])));
        assert!(store.state().is_expanded(&p(&[0, 1])));
    }

    #[test]
    fn structure_change_promotes_selection_to_changed_path() {
        // 0 -> 1 (P) -> 2 (a) -> 3 (b) -> 4
        let model = Fixed::new(vec![vec![1], vec![2], vec![3], vec![4], vec![]]);
        let mut store = seeded(&model);
        let mut selection = DefaultTreeSelectionModel::new();
        store.set_expanded_state(&p(&[0, 1, 2, 3]), true, &mut selection);
        selection.set_path(&p(&[0, 1, 2, 3]));

        let event = TreeModelEvent::structure_changed(p(&[0, 1, 2]));
        store.model_changed(&model, &event, &mut selection);

        assert_eq!(selection.paths(), &[p(&[0, 1, 2])]);
    }

    #[test]
    fn structure_change_at_root_reseeds() {
        let model = chain();
        let mut store = seeded(&model);
        let mut selection = DefaultTreeSelectionModel::new();
        store.set_expanded_state(&p(&[0, 1, 3]), true, &mut selection);

        store.model_changed(
            &model,
            &TreeModelEvent::structure_changed(p(&[0])),
            &mut selection,
        );

        assert_eq!(store.state().len(), 1);
        assert!(store.state().is_expanded(&p(&[0])));
    }

    #[test]
    fn removal_prunes_subtree_and_leafy_parent() {
        // 0 -> 1 (P) -> 2 (c) -> 3 (d) -> 4
        let mut model = Fixed::new(vec![vec![1], vec![2], vec![3], vec![4], vec![]]);
        let mut store = seeded(&model);
        let mut selection = DefaultTreeSelectionModel::new();
        store.set_expanded_state(&p(&[0, 1, 2, 3]), true, &mut selection);
        selection.set_path(&p(&[0, 1, 2, 3, 4]));

        model.children[1].clear();
        let event = TreeModelEvent::nodes_removed(p(&[0, 1])).with_child(0, 2);
        store.model_changed(&model, &event, &mut selection);

        assert!(!store.state().has_been_expanded(&p(&[0, 1, 2])));
        assert!(!store.state().has_been_expanded(&p(&[0, 1, 2, 3])));
        assert!(!store.state().has_been_expanded(&p(&[0, 1])));
        assert!(store.state().is_expanded(&p(&[0])));
        assert!(selection.is_selection_empty());
    }

    #[test]
    fn inserted_and_changed_events_leave_entries_alone() {
        let model = chain();
        let mut store = seeded(&model);
        let mut selection = DefaultTreeSelectionModel::new();
        store.set_expanded_state(&p(&[0, 1]), true, &mut selection);

        for event in [
            TreeModelEvent::nodes_inserted(p(&[0, 1])).with_child(1, 9),
            TreeModelEvent::nodes_changed(p(&[0])).with_child(0, 1),
        ] {
            store.model_changed(&model, &event, &mut selection);
        }
        assert_eq!(store.state().len(), 2);
    }

    #[test]
    fn descendants_skip_stale_entries_under_collapsed_nodes() {
        // R=0 -> {A=1, B=2}, A -> {3}, B -> {B1=5}, B1 -> {6}
        let model = Fixed::new(vec![
            vec![1, 2],
            vec![3],
            vec![5],
            vec![],
            vec![],
            vec![6],
            vec![],
        ]);
        let mut store = seeded(&model);
        let mut selection = DefaultTreeSelectionModel::new();
        store.set_expanded_state(&p(&[0, 1]), true, &mut selection);
        store.set_expanded_state(&p(&[0, 2, 5]), true, &mut selection);
        store.set_expanded_state(&p(&[0, 2]), false, &mut selection);

        let root = p(&[0]);
        let found: Vec<_> = store.state().expanded_descendants(&root).cloned().collect();
        assert_eq!(found, vec![p(&[0, 1])]);

        let collapsed = p(&[0, 2]);
        assert_eq!(store.state().expanded_descendants(&collapsed).count(), 0);
        assert_eq!(store.state().descendant_toggled_paths(&collapsed).count(), 2);
    }

    fn random_tree() -> impl Strategy<Value = Vec<usize>> {
        // parents[i] is the parent of node i + 1, reduced modulo i + 1 so it always precedes it
        prop::collection::vec(any::<usize>(), 1..24)
            .prop_map(|raw| raw.iter().enumerate().map(|(i, r)| r % (i + 1)).collect())
    }

    fn path_of(parents: &[usize], mut node: usize) -> TreePath<usize> {
        let mut nodes = vec![node];
        while node != 0 {
            node = parents[node - 1];
            nodes.push(node);
        }
        nodes.reverse();
        TreePath::from_nodes(nodes).unwrap()
    }

    proptest! {
        #[test]
        fn visibility_is_derived_from_expanded_ancestors(
            parents in random_tree(),
            ops in prop::collection::vec((any::<usize>(), any::<bool>()), 0..40),
        ) {
            let count = parents.len() + 1;
            let mut children = vec![Vec::new(); count];
            for (i, &parent) in parents.iter().enumerate() {
                children[parent].push(i + 1);
            }
            let model = Fixed::new(children);
            let mut store = seeded(&model);
            let mut selection = DefaultTreeSelectionModel::new();
            let paths: Vec<_> = (0..count).map(|node| path_of(&parents, node)).collect();

            for (raw, expand) in ops {
                let path = &paths[raw % count];
                if expand && model.is_leaf(path.last()) {
                    continue;
                }
                store.set_expanded_state(path, expand, &mut selection);

                for path in &paths {
                    let derived = path.parent().is_none_or(|parent| {
                        store.state().is_expanded(&parent) && store.state().is_visible(&parent)
                    });
                    prop_assert_eq!(store.state().is_visible(path), derived);
                }
            }
        }
    }
}
