use std::cmp::Reverse;
use std::slice;

use smallvec::SmallVec;

use crate::action::{TreeAction, TreeEvent};
use crate::event::{EventQueue, ListenerId, Listeners};
use crate::expansion::{
    ExpansionListener, ExpansionState, ExpansionStore, Transition, WillExpandListener,
};
use crate::layout::TreeLayout;
use crate::model::{TreeModel, TreeModelEvent, children};
use crate::options::TreeOptions;
use crate::path::TreePath;
use crate::selection::{
    DefaultTreeSelectionModel, EmptySelectionModel, SelectionListener, TreeSelectionEvent,
    TreeSelectionModel,
};
use crate::ui::{ContentRect, TreeUi};

#[cfg(feature = "keymap")]
use crate::keymap::TreeKeyBindings;
#[cfg(feature = "keymap")]
use crossterm::event::KeyEvent;

/// Bound properties reported to property listeners.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TreeProperty {
    Model,
    SelectionModel,
    LeadSelectionPath,
    AnchorSelectionPath,
    Editable,
    RootVisible,
    ScrollsOnExpand,
    ExpandsSelectedPaths,
    InvokesStopCellEditing,
    VisibleRowCount,
}

/// Listener told which property of the tree changed.
pub type PropertyListener = Box<dyn FnMut(TreeProperty)>;

/// Tree widget state: model, expansion store, selection, and the row projection `U`.
///
/// The tree owns its model. Mutate it through [`Tree::edit_model`] so change events are
/// reconciled right after the edit.
pub struct Tree<M: TreeModel, U = TreeLayout<<M as TreeModel>::Id>> {
    model: M,
    model_listener: Option<ListenerId>,
    model_events: EventQueue<TreeModelEvent<M::Id>>,
    expansion: ExpansionStore<M::Id>,
    selection: Box<dyn TreeSelectionModel<M::Id>>,
    selection_listener: Option<ListenerId>,
    selection_events: EventQueue<TreeSelectionEvent<M::Id>>,
    selection_listeners: Listeners<dyn FnMut(&TreeSelectionEvent<M::Id>)>,
    property_listeners: Listeners<dyn FnMut(TreeProperty)>,
    ui: Option<U>,
    options: TreeOptions,
    lead: Option<TreePath<M::Id>>,
    anchor: Option<TreePath<M::Id>>,
    #[cfg(feature = "keymap")]
    keymap: TreeKeyBindings,
}

impl<M: TreeModel> Tree<M> {
    /// Creates a tree over `model` using the bundled terminal layout.
    pub fn new(model: M) -> Self {
        Self::with_ui(model, TreeLayout::new())
    }
}

impl<M: TreeModel, U: TreeUi<M>> Tree<M, U> {
    pub fn with_ui(model: M, ui: U) -> Self {
        Self::build(model, Some(ui))
    }

    /// Creates a tree without a row projection; row queries answer `None`/`0`.
    pub fn without_ui(model: M) -> Self {
        Self::build(model, None)
    }

    fn build(mut model: M, ui: Option<U>) -> Self {
        let model_events = EventQueue::new();
        let model_listener = model.add_model_listener(model_events.listener());

        let selection_events = EventQueue::new();
        let mut selection: Box<dyn TreeSelectionModel<M::Id>> =
            Box::new(DefaultTreeSelectionModel::new());
        let selection_listener = selection.add_selection_listener(selection_events.listener());

        let mut expansion = ExpansionStore::new();
        expansion.reset(&model);

        let mut tree = Self {
            model,
            model_listener,
            model_events,
            expansion,
            selection,
            selection_listener,
            selection_events,
            selection_listeners: Listeners::new(),
            property_listeners: Listeners::new(),
            ui,
            options: TreeOptions::default(),
            lead: None,
            anchor: None,
            #[cfg(feature = "keymap")]
            keymap: TreeKeyBindings::new(),
        };
        tree.refresh_ui();
        tree
    }

    #[inline]
    pub const fn model(&self) -> &M {
        &self.model
    }

    /// Mutates the model, then reconciles expansion and selection with the events it fired.
    pub fn edit_model<R>(&mut self, edit: impl FnOnce(&mut M) -> R) -> R {
        let result = edit(&mut self.model);
        self.process_model_events();
        result
    }

    /// Reconciles change events the model fired since the last call.
    pub fn process_model_events(&mut self) {
        if self.model_events.is_empty() {
            return;
        }
        while let Some(event) = self.model_events.pop() {
            log::debug!("reconciling {:?} at {}", event.kind, event.path);
            self.expansion
                .model_changed(&self.model, &event, self.selection.as_mut());
        }
        self.after_change();
    }

    /// Replaces the model and returns the old one, detached from this tree.
    ///
    /// Expansion state and selection are reset; the new root starts expanded unless it is a leaf.
    pub fn set_model(&mut self, mut model: M) -> M {
        self.cancel_editing();
        let listener = model.add_model_listener(self.model_events.listener());
        let mut old = std::mem::replace(&mut self.model, model);
        if let Some(id) = std::mem::replace(&mut self.model_listener, listener) {
            old.remove_model_listener(id);
        }
        self.model_events.clear();

        self.expansion.reset(&self.model);
        self.selection.clear();
        self.set_lead_selection_path(None);
        self.set_anchor_selection_path(None);
        log::debug!("model replaced");
        self.after_change();
        self.fire_property(TreeProperty::Model);
        old
    }

    /// Consumes the tree, returning the model with this tree's listener removed.
    pub fn into_model(self) -> M {
        let Self {
            mut model,
            model_listener,
            ..
        } = self;
        if let Some(id) = model_listener {
            model.remove_model_listener(id);
        }
        model
    }

    #[inline]
    pub const fn ui(&self) -> Option<&U> {
        self.ui.as_ref()
    }

    /// Mutable access to the projection, e.g. to scroll. Rows are refreshed by the tree.
    #[inline]
    pub const fn ui_mut(&mut self) -> Option<&mut U> {
        self.ui.as_mut()
    }

    /// Installs (or removes) the row projection and returns the previous one.
    pub fn set_ui(&mut self, ui: Option<U>) -> Option<U> {
        self.cancel_editing();
        let old = std::mem::replace(&mut self.ui, ui);
        self.refresh_ui();
        old
    }

    fn refresh_ui(&mut self) {
        if let Some(ui) = &mut self.ui {
            ui.refresh(&self.model, self.expansion.state(), &self.options);
        }
    }

    fn after_change(&mut self) {
        self.drain_selection_events();
        self.refresh_ui();
    }

    #[inline]
    pub const fn options(&self) -> &TreeOptions {
        &self.options
    }

    pub const fn is_root_visible(&self) -> bool {
        self.options.root_visible
    }

    pub fn set_root_visible(&mut self, visible: bool) {
        if self.options.root_visible == visible {
            return;
        }
        self.options.root_visible = visible;
        self.refresh_ui();
        self.fire_property(TreeProperty::RootVisible);
    }

    pub const fn scrolls_on_expand(&self) -> bool {
        self.options.scrolls_on_expand
    }

    pub fn set_scrolls_on_expand(&mut self, scrolls: bool) {
        if self.options.scrolls_on_expand != scrolls {
            self.options.scrolls_on_expand = scrolls;
            self.fire_property(TreeProperty::ScrollsOnExpand);
        }
    }

    pub const fn expands_selected_paths(&self) -> bool {
        self.options.expands_selected_paths
    }

    pub fn set_expands_selected_paths(&mut self, expands: bool) {
        if self.options.expands_selected_paths != expands {
            self.options.expands_selected_paths = expands;
            self.fire_property(TreeProperty::ExpandsSelectedPaths);
        }
    }

    pub const fn invokes_stop_cell_editing(&self) -> bool {
        self.options.invokes_stop_cell_editing
    }

    pub fn set_invokes_stop_cell_editing(&mut self, invokes: bool) {
        if self.options.invokes_stop_cell_editing != invokes {
            self.options.invokes_stop_cell_editing = invokes;
            self.fire_property(TreeProperty::InvokesStopCellEditing);
        }
    }

    pub const fn visible_row_count(&self) -> usize {
        self.options.visible_row_count
    }

    pub fn set_visible_row_count(&mut self, count: usize) {
        if self.options.visible_row_count != count {
            self.options.visible_row_count = count;
            self.fire_property(TreeProperty::VisibleRowCount);
        }
    }

    #[inline]
    pub const fn expansion_state(&self) -> &ExpansionState<M::Id> {
        self.expansion.state()
    }

    /// `true` iff the path and all its ancestors are expanded.
    pub fn is_expanded(&self, path: &TreePath<M::Id>) -> bool {
        self.expansion.state().is_expanded(path)
    }

    pub fn is_expanded_row(&self, row: usize) -> bool {
        self.path_for_row(row)
            .is_some_and(|path| self.is_expanded(&path))
    }

    pub fn is_collapsed(&self, path: &TreePath<M::Id>) -> bool {
        !self.is_expanded(path)
    }

    pub fn is_collapsed_row(&self, row: usize) -> bool {
        !self.is_expanded_row(row)
    }

    /// `true` if the path was ever expanded or collapsed and the entry is still stored.
    pub fn has_been_expanded(&self, path: &TreePath<M::Id>) -> bool {
        self.expansion.state().has_been_expanded(path)
    }

    /// `true` for the root and for paths whose parent is expanded.
    pub fn is_visible(&self, path: &TreePath<M::Id>) -> bool {
        self.expansion.state().is_visible(path)
    }

    /// Expanded, visible descendants of `parent`; empty unless `parent` is expanded.
    pub fn expanded_descendants<'a>(
        &'a self,
        parent: &'a TreePath<M::Id>,
    ) -> impl Iterator<Item = &'a TreePath<M::Id>> + 'a {
        self.expansion.state().expanded_descendants(parent)
    }

    /// Expands `path` and its collapsed ancestors. Leaves and unknown nodes are ignored.
    pub fn expand_path(&mut self, path: &TreePath<M::Id>) -> Transition {
        let node = path.last();
        if !self.model.contains(node) || self.model.is_leaf(node) {
            return Transition::Unchanged;
        }
        self.set_expanded_state(path, true)
    }

    pub fn expand_row(&mut self, row: usize) -> Transition {
        match self.path_for_row(row) {
            Some(path) => self.expand_path(&path),
            None => Transition::Unchanged,
        }
    }

    pub fn collapse_path(&mut self, path: &TreePath<M::Id>) -> Transition {
        self.set_expanded_state(path, false)
    }

    pub fn collapse_row(&mut self, row: usize) -> Transition {
        match self.path_for_row(row) {
            Some(path) => self.collapse_path(&path),
            None => Transition::Unchanged,
        }
    }

    pub fn toggle_path(&mut self, path: &TreePath<M::Id>) -> Transition {
        if self.is_expanded(path) {
            self.collapse_path(path)
        } else {
            self.expand_path(path)
        }
    }

    fn set_expanded_state(&mut self, path: &TreePath<M::Id>, expand: bool) -> Transition {
        let commits = self.expansion.commit_count();
        let outcome = self
            .expansion
            .set_expanded_state(path, expand, self.selection.as_mut());
        // A veto can still follow committed ancestors.
        if self.expansion.commit_count() != commits {
            self.complete_editing();
            self.after_change();
        }
        if outcome == Transition::Committed && expand && self.options.scrolls_on_expand {
            self.scroll_children_to_visible(path);
        }
        outcome
    }

    fn scroll_children_to_visible(&mut self, path: &TreePath<M::Id>) {
        let Some(ui) = self.ui.as_mut() else {
            return;
        };
        let Some(mut bounds) = ui.path_bounds(path) else {
            return;
        };
        let node = path.last();
        if let Some(last) = self
            .model
            .child_count(node)
            .checked_sub(1)
            .and_then(|index| self.model.child(node, index))
            && let Some(child) = ui.path_bounds(&path.child(last))
        {
            bounds = bounds.union(child);
        }
        ui.scroll_rect_to_visible(bounds);
    }

    /// Expands every non-leaf node at or below `path`, parents first.
    ///
    /// A vetoed node keeps its subtree untouched.
    pub fn expand_subtree(&mut self, path: &TreePath<M::Id>) {
        let mut pending = vec![path.clone()];
        while let Some(path) = pending.pop() {
            let node = path.last();
            if !self.model.contains(node) || self.model.is_leaf(node) {
                continue;
            }
            let outcome = self
                .expansion
                .set_expanded_state(&path, true, self.selection.as_mut());
            if outcome == Transition::Vetoed {
                continue;
            }
            let kids: SmallVec<[M::Id; 8]> = children(&self.model, node).collect();
            pending.extend(kids.into_iter().rev().map(|child| path.child(child)));
        }
        self.complete_editing();
        self.after_change();
    }

    /// Collapses `path` and every expanded path below it, deepest first.
    pub fn collapse_subtree(&mut self, path: &TreePath<M::Id>) {
        self.collapse_below(path, true);
    }

    pub fn expand_all(&mut self) {
        if let Some(root) = self.model.root() {
            self.expand_subtree(&TreePath::new(root));
        }
    }

    /// Collapses everything; a hidden root stays expanded so its children keep their rows.
    pub fn collapse_all(&mut self) {
        if let Some(root) = self.model.root() {
            self.collapse_below(&TreePath::new(root), self.options.root_visible);
        }
    }

    fn collapse_below(&mut self, path: &TreePath<M::Id>, inclusive: bool) {
        let state = self.expansion.state();
        let mut expanded: Vec<TreePath<M::Id>> = state
            .descendant_toggled_paths(path)
            .filter(|toggled| {
                (inclusive || *toggled != path) && state.entry(toggled.nodes()) == Some(true)
            })
            .cloned()
            .collect();
        expanded.sort_by_key(|toggled| Reverse(toggled.len()));
        for toggled in &expanded {
            self.expansion
                .set_expanded_state(toggled, false, self.selection.as_mut());
        }
        self.complete_editing();
        self.after_change();
    }

    /// Expands the parent of `path` so the path gets a row.
    pub fn make_visible(&mut self, path: &TreePath<M::Id>) {
        if let Some(parent) = path.parent()
            && !self.is_expanded(&parent)
        {
            self.expand_path(&parent);
        }
    }

    /// Makes the path visible and scrolls its row into the viewport.
    pub fn scroll_path_to_visible(&mut self, path: &TreePath<M::Id>) {
        self.make_visible(path);
        if let Some(ui) = self.ui.as_mut()
            && let Some(bounds) = ui.path_bounds(path)
        {
            ui.scroll_rect_to_visible(bounds);
        }
    }

    pub fn scroll_row_to_visible(&mut self, row: usize) {
        if let Some(path) = self.path_for_row(row) {
            self.scroll_path_to_visible(&path);
        }
    }

    pub fn row_count(&self) -> usize {
        self.ui.as_ref().map_or(0, |ui| ui.row_count())
    }

    pub fn path_for_row(&self, row: usize) -> Option<TreePath<M::Id>> {
        self.ui.as_ref()?.path_for_row(row)
    }

    pub fn row_for_path(&self, path: &TreePath<M::Id>) -> Option<usize> {
        self.ui.as_ref()?.row_for_path(path)
    }

    pub fn path_bounds(&self, path: &TreePath<M::Id>) -> Option<ContentRect> {
        self.ui.as_ref()?.path_bounds(path)
    }

    pub fn row_bounds(&self, row: usize) -> Option<ContentRect> {
        self.path_bounds(&self.path_for_row(row)?)
    }

    /// Path whose bounds contain the location.
    pub fn path_for_location(&self, x: u16, y: usize) -> Option<TreePath<M::Id>> {
        let path = self.closest_path_for_location(x, y)?;
        self.path_bounds(&path)
            .is_some_and(|bounds| bounds.contains(x, y))
            .then_some(path)
    }

    pub fn row_for_location(&self, x: u16, y: usize) -> Option<usize> {
        self.row_for_path(&self.path_for_location(x, y)?)
    }

    pub fn closest_path_for_location(&self, x: u16, y: usize) -> Option<TreePath<M::Id>> {
        self.ui.as_ref()?.closest_path_for_location(x, y)
    }

    pub fn closest_row_for_location(&self, x: u16, y: usize) -> Option<usize> {
        self.row_for_path(&self.closest_path_for_location(x, y)?)
    }

    /// Paths of the rows between `first` and `second` inclusive, clamped to existing rows.
    pub fn path_between_rows(&self, first: usize, second: usize) -> Vec<TreePath<M::Id>> {
        let Some(last) = self.row_count().checked_sub(1) else {
            return Vec::new();
        };
        let (low, high) = (first.min(second), first.max(second).min(last));
        (low..=high)
            .filter_map(|row| self.path_for_row(row))
            .collect()
    }

    fn paths_for_rows(&self, rows: &[usize]) -> Vec<TreePath<M::Id>> {
        rows.iter().filter_map(|&row| self.path_for_row(row)).collect()
    }

    pub fn selection_model(&self) -> &dyn TreeSelectionModel<M::Id> {
        self.selection.as_ref()
    }

    /// Runs `edit` against the selection model, then forwards its change events.
    pub fn edit_selection_model<R>(
        &mut self,
        edit: impl FnOnce(&mut dyn TreeSelectionModel<M::Id>) -> R,
    ) -> R {
        let result = edit(self.selection.as_mut());
        self.drain_selection_events();
        result
    }

    /// Installs a selection model (`None` disables selection) and returns the previous one.
    pub fn set_selection_model(
        &mut self,
        model: Option<Box<dyn TreeSelectionModel<M::Id>>>,
    ) -> Box<dyn TreeSelectionModel<M::Id>> {
        self.drain_selection_events();
        let mut model = match model {
            Some(model) => model,
            None => Box::new(EmptySelectionModel),
        };
        let listener = model.add_selection_listener(self.selection_events.listener());
        let mut old = std::mem::replace(&mut self.selection, model);
        if let Some(id) = std::mem::replace(&mut self.selection_listener, listener) {
            old.remove_selection_listener(id);
        }
        self.fire_property(TreeProperty::SelectionModel);
        old
    }

    fn drain_selection_events(&mut self) {
        while let Some(event) = self.selection_events.pop() {
            for listener in self.selection_listeners.iter_mut() {
                listener(&event);
            }
        }
    }

    fn reveal(&mut self, paths: &[TreePath<M::Id>]) {
        if self.options.expands_selected_paths {
            for path in paths {
                self.make_visible(path);
            }
        }
    }

    pub fn set_selection_path(&mut self, path: &TreePath<M::Id>) {
        self.set_selection_paths(slice::from_ref(path));
    }

    pub fn set_selection_paths(&mut self, paths: &[TreePath<M::Id>]) {
        self.reveal(paths);
        self.selection.set_paths(paths);
        self.drain_selection_events();
    }

    pub fn add_selection_path(&mut self, path: &TreePath<M::Id>) {
        self.add_selection_paths(slice::from_ref(path));
    }

    pub fn add_selection_paths(&mut self, paths: &[TreePath<M::Id>]) {
        self.reveal(paths);
        self.selection.add_paths(paths);
        self.drain_selection_events();
    }

    pub fn remove_selection_path(&mut self, path: &TreePath<M::Id>) {
        self.remove_selection_paths(slice::from_ref(path));
    }

    pub fn remove_selection_paths(&mut self, paths: &[TreePath<M::Id>]) {
        self.selection.remove_paths(paths);
        self.drain_selection_events();
    }

    pub fn set_selection_row(&mut self, row: usize) {
        self.set_selection_rows(&[row]);
    }

    /// Selects the paths of `rows`; rows without a path are skipped.
    pub fn set_selection_rows(&mut self, rows: &[usize]) {
        let paths = self.paths_for_rows(rows);
        self.set_selection_paths(&paths);
    }

    pub fn add_selection_row(&mut self, row: usize) {
        self.add_selection_rows(&[row]);
    }

    pub fn add_selection_rows(&mut self, rows: &[usize]) {
        let paths = self.paths_for_rows(rows);
        self.add_selection_paths(&paths);
    }

    pub fn remove_selection_row(&mut self, row: usize) {
        self.remove_selection_rows(&[row]);
    }

    pub fn remove_selection_rows(&mut self, rows: &[usize]) {
        let paths = self.paths_for_rows(rows);
        self.remove_selection_paths(&paths);
    }

    pub fn set_selection_interval(&mut self, first: usize, second: usize) {
        let paths = self.path_between_rows(first, second);
        self.set_selection_paths(&paths);
    }

    pub fn add_selection_interval(&mut self, first: usize, second: usize) {
        let paths = self.path_between_rows(first, second);
        self.add_selection_paths(&paths);
    }

    pub fn remove_selection_interval(&mut self, first: usize, second: usize) {
        let paths = self.path_between_rows(first, second);
        self.remove_selection_paths(&paths);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.drain_selection_events();
    }

    pub fn is_selection_empty(&self) -> bool {
        self.selection.is_selection_empty()
    }

    /// First selected path.
    pub fn selection_path(&self) -> Option<&TreePath<M::Id>> {
        self.selection.selection_path()
    }

    pub fn selection_paths(&self) -> &[TreePath<M::Id>] {
        self.selection.paths()
    }

    /// Rows of the selected paths that currently have one, in selection order.
    pub fn selection_rows(&self) -> Vec<usize> {
        self.selection
            .paths()
            .iter()
            .filter_map(|path| self.row_for_path(path))
            .collect()
    }

    pub fn selection_count(&self) -> usize {
        self.selection.selection_count()
    }

    pub fn min_selection_row(&self) -> Option<usize> {
        self.selection_rows().into_iter().min()
    }

    pub fn max_selection_row(&self) -> Option<usize> {
        self.selection_rows().into_iter().max()
    }

    pub fn is_path_selected(&self, path: &TreePath<M::Id>) -> bool {
        self.selection.is_path_selected(path)
    }

    pub fn is_row_selected(&self, row: usize) -> bool {
        self.path_for_row(row)
            .is_some_and(|path| self.is_path_selected(&path))
    }

    /// Node at the end of the first selected path.
    pub fn last_selected_node(&self) -> Option<M::Id> {
        self.selection_path().map(TreePath::last)
    }

    #[inline]
    pub const fn lead_selection_path(&self) -> Option<&TreePath<M::Id>> {
        self.lead.as_ref()
    }

    pub fn set_lead_selection_path(&mut self, path: Option<TreePath<M::Id>>) {
        if self.lead != path {
            self.lead = path;
            self.fire_property(TreeProperty::LeadSelectionPath);
        }
    }

    pub fn lead_selection_row(&self) -> Option<usize> {
        self.row_for_path(self.lead.as_ref()?)
    }

    #[inline]
    pub const fn anchor_selection_path(&self) -> Option<&TreePath<M::Id>> {
        self.anchor.as_ref()
    }

    pub fn set_anchor_selection_path(&mut self, path: Option<TreePath<M::Id>>) {
        if self.anchor != path {
            self.anchor = path;
            self.fire_property(TreeProperty::AnchorSelectionPath);
        }
    }

    pub const fn is_editable(&self) -> bool {
        self.options.editable
    }

    /// Enables or disables editing; disabling cancels a running edit.
    pub fn set_editable(&mut self, editable: bool) {
        if self.options.editable == editable {
            return;
        }
        if !editable {
            self.cancel_editing();
        }
        self.options.editable = editable;
        self.fire_property(TreeProperty::Editable);
    }

    pub fn is_path_editable(&self, _path: &TreePath<M::Id>) -> bool {
        self.options.editable
    }

    /// Finishes any running edit, scrolls `path` into view and starts editing it.
    pub fn start_editing_at_path(&mut self, path: &TreePath<M::Id>) -> bool {
        if !self.is_path_editable(path) {
            return false;
        }
        self.complete_editing();
        self.scroll_path_to_visible(path);
        let Some(ui) = self.ui.as_mut() else {
            return false;
        };
        let started = ui.start_editing_at_path(&self.model, path);
        if started {
            log::debug!("editing {path}");
        }
        started
    }

    /// Ends the running edit keeping its result; `false` if nothing was being edited.
    pub fn stop_editing(&mut self) -> bool {
        match self.ui.as_mut() {
            Some(ui) if ui.is_editing() => ui.stop_editing(),
            _ => false,
        }
    }

    pub fn cancel_editing(&mut self) {
        if let Some(ui) = self.ui.as_mut()
            && ui.is_editing()
        {
            ui.cancel_editing();
        }
    }

    pub fn is_editing(&self) -> bool {
        self.ui.as_ref().is_some_and(|ui| ui.is_editing())
    }

    pub fn editing_path(&self) -> Option<TreePath<M::Id>> {
        self.ui.as_ref()?.editing_path()
    }

    /// Stops or cancels an edit interrupted by another change.
    fn complete_editing(&mut self) {
        if !self.is_editing() {
            return;
        }
        if self.options.invokes_stop_cell_editing && self.stop_editing() {
            return;
        }
        self.cancel_editing();
    }

    pub fn add_tree_will_expand_listener(
        &mut self,
        listener: WillExpandListener<M::Id>,
    ) -> ListenerId {
        self.expansion.add_will_expand_listener(listener)
    }

    pub fn remove_tree_will_expand_listener(&mut self, id: ListenerId) -> bool {
        self.expansion.remove_will_expand_listener(id)
    }

    pub fn add_tree_expansion_listener(&mut self, listener: ExpansionListener<M::Id>) -> ListenerId {
        self.expansion.add_expansion_listener(listener)
    }

    pub fn remove_tree_expansion_listener(&mut self, id: ListenerId) -> bool {
        self.expansion.remove_expansion_listener(id)
    }

    /// Subscribes to selection changes of whichever selection model is installed.
    pub fn add_tree_selection_listener(&mut self, listener: SelectionListener<M::Id>) -> ListenerId {
        self.selection_listeners.add(listener)
    }

    pub fn remove_tree_selection_listener(&mut self, id: ListenerId) -> bool {
        self.selection_listeners.remove(id)
    }

    pub fn add_property_listener(&mut self, listener: PropertyListener) -> ListenerId {
        self.property_listeners.add(listener)
    }

    pub fn remove_property_listener(&mut self, id: ListenerId) -> bool {
        self.property_listeners.remove(id)
    }

    fn fire_property(&mut self, property: TreeProperty) {
        log::trace!("property {property:?} changed");
        for listener in self.property_listeners.iter_mut() {
            listener(property);
        }
    }

    #[cfg(feature = "keymap")]
    /// Returns a mutable reference to the key binding set.
    pub const fn keymap_mut(&mut self) -> &mut TreeKeyBindings {
        &mut self.keymap
    }

    #[cfg(feature = "keymap")]
    /// Resolves a key event into an action and handles it.
    pub fn handle_key(&mut self, key: KeyEvent) -> TreeEvent<()> {
        let Some(action) = self.keymap.resolve(key) else {
            return TreeEvent::Unhandled;
        };
        self.handle_action(action)
    }

    #[cfg(feature = "keymap")]
    /// Resolves a key event with a custom mapping and handles it.
    pub fn handle_key_with<C, F>(&mut self, key: KeyEvent, custom: F) -> TreeEvent<C>
    where
        F: Fn(KeyEvent) -> Option<C>,
    {
        let Some(action) = self.keymap.resolve_with(key, custom) else {
            return TreeEvent::Unhandled;
        };
        self.handle_action(action)
    }

    /// Handles a tree action and returns the resulting event.
    pub fn handle_action<C>(&mut self, action: TreeAction<C>) -> TreeEvent<C> {
        if let TreeAction::Custom(custom) = action {
            return TreeEvent::Action(TreeAction::Custom(custom));
        }
        if self.row_count() == 0 {
            return TreeEvent::Unhandled;
        }

        let last_row = self.row_count() - 1;
        let handled = match action {
            TreeAction::SelectPrev => {
                let row = self
                    .lead_selection_row()
                    .map_or(0, |row| row.saturating_sub(1));
                self.select_row_as_lead(row)
            }
            TreeAction::SelectNext => {
                let row = self.lead_selection_row().map_or(0, |row| row + 1);
                self.select_row_as_lead(row.min(last_row))
            }
            TreeAction::SelectParent => self.select_parent(),
            TreeAction::SelectChild => self.select_child(),
            TreeAction::ExtendSelectionUp => self.extend_selection(false),
            TreeAction::ExtendSelectionDown => self.extend_selection(true),
            TreeAction::SelectFirst => self.select_row_as_lead(0),
            TreeAction::SelectLast => self.select_row_as_lead(last_row),
            TreeAction::ToggleNode => match self.lead.clone() {
                Some(lead) if !self.model.is_leaf(lead.last()) => {
                    self.toggle_path(&lead).took_effect()
                }
                _ => false,
            },
            TreeAction::ToggleRecursive => match self.lead.clone() {
                Some(lead) if !self.model.is_leaf(lead.last()) => {
                    if self.is_expanded(&lead) {
                        self.collapse_subtree(&lead);
                    } else {
                        self.expand_subtree(&lead);
                    }
                    true
                }
                _ => false,
            },
            TreeAction::ExpandAll => {
                self.expand_all();
                true
            }
            TreeAction::CollapseAll => {
                self.collapse_all();
                true
            }
            TreeAction::StartEditing => self
                .lead
                .clone()
                .is_some_and(|lead| self.start_editing_at_path(&lead)),
            TreeAction::StopEditing => self.stop_editing(),
            TreeAction::CancelEditing => {
                let editing = self.is_editing();
                self.cancel_editing();
                editing
            }
            TreeAction::ClearSelection => {
                let had_selection = !self.is_selection_empty();
                self.clear_selection();
                had_selection
            }
            TreeAction::Custom(_) => false,
        };

        if handled {
            TreeEvent::Handled
        } else {
            TreeEvent::Unhandled
        }
    }

    /// Selects `row` alone and makes it both lead and anchor.
    fn select_row_as_lead(&mut self, row: usize) -> bool {
        let Some(path) = self.path_for_row(row) else {
            return false;
        };
        self.complete_editing();
        self.set_selection_path(&path);
        self.set_lead_selection_path(Some(path.clone()));
        self.set_anchor_selection_path(Some(path.clone()));
        self.scroll_path_to_visible(&path);
        true
    }

    fn select_parent(&mut self) -> bool {
        let Some(lead) = self.lead.clone() else {
            return self.select_row_as_lead(0);
        };
        if self.is_expanded(&lead) && !self.model.is_leaf(lead.last()) {
            return self.collapse_path(&lead).took_effect();
        }
        match lead.parent().and_then(|parent| self.row_for_path(&parent)) {
            Some(row) => self.select_row_as_lead(row),
            None => false,
        }
    }

    fn select_child(&mut self) -> bool {
        let Some(lead) = self.lead.clone() else {
            return self.select_row_as_lead(0);
        };
        if self.model.is_leaf(lead.last()) {
            return false;
        }
        if !self.is_expanded(&lead) {
            return self.expand_path(&lead).took_effect();
        }
        // The first child directly follows an expanded row.
        let Some(row) = self.row_for_path(&lead).map(|row| row + 1) else {
            return false;
        };
        match self.path_for_row(row) {
            Some(child) if child.is_strict_descendant_of(&lead) => self.select_row_as_lead(row),
            _ => false,
        }
    }

    fn extend_selection(&mut self, down: bool) -> bool {
        let Some(lead_row) = self.lead_selection_row() else {
            return self.select_row_as_lead(0);
        };
        let target = if down {
            (lead_row + 1).min(self.row_count() - 1)
        } else {
            lead_row.saturating_sub(1)
        };
        let anchor_row = self
            .anchor
            .as_ref()
            .and_then(|anchor| self.row_for_path(anchor))
            .unwrap_or(lead_row);
        let (Some(target_path), Some(anchor_path)) =
            (self.path_for_row(target), self.path_for_row(anchor_row))
        else {
            return false;
        };

        self.complete_editing();
        self.set_selection_interval(anchor_row, target);
        self.set_lead_selection_path(Some(target_path.clone()));
        self.set_anchor_selection_path(Some(anchor_path));
        self.scroll_path_to_visible(&target_path);
        true
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use ratatui::layout::Rect;

    use super::*;
    use crate::default_model::{DefaultTreeModel, NodeId};
    use crate::expansion::{ExpandDecision, ExpansionEvent, ExpansionKind};
    use pretty_assertions::assert_eq;

    // root
    // ├── a
    // │   ├── a1
    // │   └── a2
    // └── b
    //     └── b1
    //         └── b1x
    struct Sample {
        root: NodeId,
        a: NodeId,
        a1: NodeId,
        b: NodeId,
        b1: NodeId,
        b1x: NodeId,
    }

    fn sample() -> (Tree<DefaultTreeModel<&'static str>>, Sample) {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut model = DefaultTreeModel::new("root");
        let root = model.root().unwrap();
        let a = model.append(root, "a").unwrap();
        let a1 = model.append(a, "a1").unwrap();
        model.append(a, "a2").unwrap();
        let b = model.append(root, "b").unwrap();
        let b1 = model.append(b, "b1").unwrap();
        let b1x = model.append(b1, "b1x").unwrap();
        (
            Tree::new(model),
            Sample {
                root,
                a,
                a1,
                b,
                b1,
                b1x,
            },
        )
    }

    fn path(model: &DefaultTreeModel<&'static str>, id: NodeId) -> TreePath<NodeId> {
        model.path_to_root(id).unwrap()
    }

    fn labels(tree: &Tree<DefaultTreeModel<&'static str>>) -> Vec<&'static str> {
        (0..tree.row_count())
            .map(|row| {
                let path = tree.path_for_row(row).unwrap();
                *tree.model().value(path.last()).unwrap()
            })
            .collect()
    }

    #[test]
    fn new_tree_shows_root_and_children() {
        let (tree, ids) = sample();
        assert_eq!(labels(&tree), vec!["root", "a", "b"]);
        assert!(tree.is_expanded(&TreePath::new(ids.root)));
        assert!(tree.is_visible(&path(tree.model(), ids.b)));
        assert!(!tree.is_visible(&path(tree.model(), ids.b1)));
    }

    #[test]
    fn expand_then_collapse_restores_row_count() {
        let (mut tree, _) = sample();
        assert_eq!(tree.expand_row(1), Transition::Committed);
        assert_eq!(labels(&tree), vec!["root", "a", "a1", "a2", "b"]);
        assert_eq!(tree.collapse_row(1), Transition::Committed);
        assert_eq!(tree.row_count(), 3);
        assert!(tree.has_been_expanded(&tree.path_for_row(1).unwrap()));
        assert_eq!(tree.expand_row(99), Transition::Unchanged);
    }

    #[test]
    fn expanding_a_leaf_is_ignored() {
        let (mut tree, ids) = sample();
        let a1 = path(tree.model(), ids.a1);
        assert_eq!(tree.expand_path(&a1), Transition::Unchanged);
        assert!(!tree.has_been_expanded(&a1));
    }

    #[test]
    fn veto_leaves_rows_alone() {
        let (mut tree, ids) = sample();
        tree.add_tree_will_expand_listener(Box::new(|event: &ExpansionEvent<'_, NodeId>| {
            if event.kind == ExpansionKind::WillExpand {
                ExpandDecision::Veto
            } else {
                ExpandDecision::Allow
            }
        }));
        let a = path(tree.model(), ids.a);
        assert_eq!(tree.expand_path(&a), Transition::Vetoed);
        assert_eq!(tree.row_count(), 3);
        assert!(tree.collapse_path(&a).took_effect());
    }

    #[test]
    fn selecting_hidden_path_expands_ancestors() {
        let (mut tree, ids) = sample();
        let b1x = path(tree.model(), ids.b1x);
        tree.set_selection_path(&b1x);

        assert!(tree.is_expanded(&path(tree.model(), ids.b1)));
        assert_eq!(tree.row_for_path(&b1x), Some(4));
        assert_eq!(tree.selection_rows(), vec![4]);
        assert_eq!(tree.last_selected_node(), Some(ids.b1x));
    }

    #[test]
    fn selecting_a_path_leaves_lead_and_anchor_alone() {
        let (mut tree, ids) = sample();
        let a = path(tree.model(), ids.a);
        tree.set_selection_path(&path(tree.model(), ids.b));
        assert_eq!(tree.lead_selection_path(), None);

        tree.set_lead_selection_path(Some(a.clone()));
        tree.set_anchor_selection_path(Some(a.clone()));
        tree.set_selection_path(&path(tree.model(), ids.b1x));
        tree.clear_selection();

        assert_eq!(tree.lead_selection_path(), Some(&a));
        assert_eq!(tree.anchor_selection_path(), Some(&a));
    }

    #[test]
    fn selecting_hidden_path_without_expansion_keeps_it_rowless() {
        let (mut tree, ids) = sample();
        tree.set_expands_selected_paths(false);
        let b1x = path(tree.model(), ids.b1x);
        tree.set_selection_path(&b1x);

        assert!(tree.is_path_selected(&b1x));
        assert_eq!(tree.row_for_path(&b1x), None);
        assert!(tree.selection_rows().is_empty());
        assert_eq!(tree.min_selection_row(), None);
    }

    #[test]
    fn collapsing_promotes_selection_to_collapsed_path() {
        let (mut tree, ids) = sample();
        let b = path(tree.model(), ids.b);
        let b1x = path(tree.model(), ids.b1x);
        tree.set_selection_path(&b1x);
        tree.set_lead_selection_path(Some(b1x.clone()));

        tree.collapse_path(&b);

        assert_eq!(tree.selection_paths(), &[b.clone()]);
        // The lead stays where it was set, now hidden.
        assert_eq!(tree.lead_selection_path(), Some(&b1x));
        assert_eq!(tree.lead_selection_row(), None);
        assert_eq!(labels(&tree), vec!["root", "a", "b"]);
    }

    #[test]
    fn selection_listeners_follow_installed_model() {
        let (mut tree, ids) = sample();
        let seen = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&seen);
        tree.add_tree_selection_listener(Box::new(
            move |_: &TreeSelectionEvent<NodeId>| {
                *counter.borrow_mut() += 1;
            },
        ));

        tree.set_selection_row(1);
        tree.set_selection_model(Some(Box::new(DefaultTreeSelectionModel::new())));
        tree.set_selection_row(2);
        assert_eq!(*seen.borrow(), 2);

        tree.set_selection_model(None);
        tree.set_selection_path(&path(tree.model(), ids.a));
        assert!(tree.is_selection_empty());
        assert_eq!(*seen.borrow(), 2);
    }

    #[test]
    fn removing_a_node_prunes_state_and_selection() {
        let (mut tree, ids) = sample();
        let b1x = path(tree.model(), ids.b1x);
        let b1 = path(tree.model(), ids.b1);
        tree.set_selection_path(&b1x);

        tree.set_lead_selection_path(Some(b1x.clone()));

        tree.edit_model(|model| model.remove(ids.b1)).unwrap();

        assert!(!tree.has_been_expanded(&b1));
        assert!(tree.is_selection_empty());
        assert_eq!(tree.lead_selection_path(), Some(&b1x));
        assert_eq!(labels(&tree), vec!["root", "a", "b"]);
        // b lost its only child and no longer keeps an entry.
        assert!(!tree.has_been_expanded(&path(tree.model(), ids.b)));
    }

    #[test]
    fn removed_lead_and_anchor_are_kept_stale() {
        let (mut tree, ids) = sample();
        let a = path(tree.model(), ids.a);
        tree.set_anchor_selection_path(Some(a.clone()));
        tree.set_lead_selection_path(Some(a.clone()));

        tree.edit_model(|model| model.remove(ids.a)).unwrap();

        assert_eq!(labels(&tree), vec!["root", "b"]);
        assert_eq!(tree.anchor_selection_path(), Some(&a));
        assert_eq!(tree.lead_selection_path(), Some(&a));
        assert_eq!(tree.lead_selection_row(), None);
    }

    #[test]
    fn inserted_nodes_appear_under_expanded_parent() {
        let (mut tree, ids) = sample();
        tree.expand_path(&path(tree.model(), ids.a));
        tree.edit_model(|model| model.append(ids.a, "a3")).unwrap();
        assert_eq!(labels(&tree), vec!["root", "a", "a1", "a2", "a3", "b"]);
    }

    #[test]
    fn reload_resets_expansion_to_root() {
        let (mut tree, ids) = sample();
        tree.expand_all();
        assert_eq!(tree.row_count(), 7);

        tree.edit_model(DefaultTreeModel::reload);

        assert_eq!(tree.expansion_state().len(), 1);
        assert_eq!(tree.row_count(), 3);
        assert!(tree.is_expanded(&TreePath::new(ids.root)));
    }

    #[test]
    fn set_model_detaches_old_model() {
        let (mut tree, _) = sample();
        let properties = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&properties);
        tree.add_property_listener(Box::new(move |property: TreeProperty| {
            sink.borrow_mut().push(property);
        }));
        tree.set_selection_row(1);
        tree.set_lead_selection_path(tree.path_for_row(1));
        properties.borrow_mut().clear();

        let old = tree.set_model(DefaultTreeModel::new("other"));

        assert_eq!(old.listener_count(), 0);
        assert_eq!(tree.model().listener_count(), 1);
        assert!(tree.is_selection_empty());
        assert_eq!(labels(&tree), vec!["other"]);
        assert!(tree.expansion_state().is_empty());
        assert!(properties.borrow().contains(&TreeProperty::Model));
        assert!(properties.borrow().contains(&TreeProperty::LeadSelectionPath));
    }

    #[test]
    fn hidden_root_and_collapse_all() {
        let (mut tree, ids) = sample();
        tree.set_root_visible(false);
        assert_eq!(labels(&tree), vec!["a", "b"]);

        tree.expand_all();
        tree.collapse_all();
        assert_eq!(labels(&tree), vec!["a", "b"]);
        assert!(tree.is_expanded(&TreePath::new(ids.root)));
    }

    #[test]
    fn expanded_descendants_lists_visible_expansions() {
        let (mut tree, ids) = sample();
        tree.expand_all();
        let root = TreePath::new(ids.root);
        let mut found: Vec<_> = tree.expanded_descendants(&root).map(TreePath::last).collect();
        found.sort();
        assert_eq!(found, vec![ids.a, ids.b, ids.b1]);

        tree.collapse_path(&path(tree.model(), ids.b));
        assert_eq!(tree.expanded_descendants(&root).count(), 1);
    }

    #[test]
    fn locations_map_to_rows() {
        let (mut tree, ids) = sample();
        if let Some(ui) = tree.ui_mut() {
            ui.set_viewport(Rect::new(0, 0, 30, 10));
        }
        let b = path(tree.model(), ids.b);

        assert_eq!(tree.row_bounds(2), Some(ContentRect::new(3, 2, 27, 1)));
        assert_eq!(tree.path_for_location(5, 2), Some(b.clone()));
        assert_eq!(tree.path_for_location(0, 2), None);
        assert_eq!(tree.closest_row_for_location(0, 40), Some(2));
        assert_eq!(tree.path_between_rows(2, 0).len(), 3);
    }

    #[test]
    fn expanding_scrolls_new_children_into_view() {
        let (mut tree, ids) = sample();
        tree.expand_path(&path(tree.model(), ids.a));
        if let Some(ui) = tree.ui_mut() {
            ui.set_viewport(Rect::new(0, 0, 30, 3));
        }
        // rows: root a a1 a2 b; b sits outside a three-row viewport
        tree.expand_path(&path(tree.model(), ids.b));

        let offset = tree.ui().map(TreeLayout::offset);
        assert_eq!(offset, Some(3));
    }

    #[test]
    fn keyboard_navigation_walks_the_tree() {
        let (mut tree, ids) = sample();
        assert_eq!(tree.handle_action::<()>(TreeAction::SelectNext), TreeEvent::Handled);
        assert_eq!(tree.lead_selection_row(), Some(0));

        tree.handle_action::<()>(TreeAction::SelectChild);
        assert_eq!(tree.last_selected_node(), Some(ids.a));

        tree.handle_action::<()>(TreeAction::SelectChild);
        assert!(tree.is_expanded(&path(tree.model(), ids.a)));
        tree.handle_action::<()>(TreeAction::SelectChild);
        assert_eq!(tree.last_selected_node(), Some(ids.a1));

        tree.handle_action::<()>(TreeAction::SelectParent);
        assert_eq!(tree.last_selected_node(), Some(ids.a));
        tree.handle_action::<()>(TreeAction::SelectParent);
        assert!(!tree.is_expanded(&path(tree.model(), ids.a)));

        tree.handle_action::<()>(TreeAction::SelectLast);
        assert_eq!(tree.last_selected_node(), Some(ids.b));
        assert_eq!(
            tree.handle_action(TreeAction::Custom(7)),
            TreeEvent::Action(TreeAction::Custom(7))
        );
    }

    #[test]
    fn extending_selection_keeps_anchor() {
        let (mut tree, _) = sample();
        tree.expand_row(1);
        tree.set_selection_row(1);
        tree.set_lead_selection_path(tree.path_for_row(1));
        tree.set_anchor_selection_path(tree.path_for_row(1));

        tree.handle_action::<()>(TreeAction::ExtendSelectionDown);
        tree.handle_action::<()>(TreeAction::ExtendSelectionDown);

        let mut rows = tree.selection_rows();
        rows.sort_unstable();
        assert_eq!(rows, vec![1, 2, 3]);
        assert_eq!(tree.lead_selection_row(), Some(3));
        assert_eq!(tree.anchor_selection_path(), tree.path_for_row(1).as_ref());

        tree.handle_action::<()>(TreeAction::ExtendSelectionUp);
        assert_eq!(tree.selection_count(), 2);
        assert_eq!(tree.max_selection_row(), Some(2));
    }

    #[test]
    fn interrupted_edit_is_cancelled_or_committed() {
        let (mut tree, ids) = sample();
        let a1 = path(tree.model(), ids.a1);
        assert!(!tree.start_editing_at_path(&a1));

        tree.set_editable(true);
        assert!(tree.start_editing_at_path(&a1));
        assert_eq!(tree.editing_path(), Some(a1.clone()));

        tree.collapse_path(&path(tree.model(), ids.a));
        assert!(!tree.is_editing());

        tree.set_invokes_stop_cell_editing(true);
        assert!(tree.start_editing_at_path(&a1));
        assert_eq!(
            tree.handle_action::<()>(TreeAction::StopEditing),
            TreeEvent::Handled
        );
        assert!(!tree.is_editing());
        assert_eq!(
            tree.handle_action::<()>(TreeAction::CancelEditing),
            TreeEvent::Unhandled
        );
    }

    #[test]
    fn vetoed_expansion_interrupts_edit_only_after_a_commit() {
        let (mut tree, ids) = sample();
        let b = path(tree.model(), ids.b);
        let b1 = path(tree.model(), ids.b1);
        let locked = ids.b1;
        tree.add_tree_will_expand_listener(Box::new(move |event: &ExpansionEvent<'_, NodeId>| {
            if event.kind == ExpansionKind::WillExpand && event.path.last() == locked {
                ExpandDecision::Veto
            } else {
                ExpandDecision::Allow
            }
        }));
        tree.set_editable(true);

        // b is committed before b1 is vetoed.
        assert!(tree.start_editing_at_path(&b));
        assert_eq!(tree.expand_path(&b1), Transition::Vetoed);
        assert!(tree.is_expanded(&b));
        assert!(!tree.is_editing());

        // Nothing left to commit: the edit survives.
        assert!(tree.start_editing_at_path(&b));
        assert_eq!(tree.expand_path(&b1), Transition::Vetoed);
        assert_eq!(tree.editing_path(), Some(b));
    }

    #[test]
    fn headless_tree_answers_without_rows() {
        let mut model = DefaultTreeModel::new("root");
        let root = model.root().unwrap();
        let child = model.append(root, "child").unwrap();
        let mut tree: Tree<_, TreeLayout<NodeId>> = Tree::without_ui(model);

        assert_eq!(tree.row_count(), 0);
        assert_eq!(tree.path_for_row(0), None);
        let child = TreePath::new(root).child(child);
        tree.set_selection_path(&child);
        assert!(tree.is_path_selected(&child));
        assert_eq!(tree.handle_action::<()>(TreeAction::SelectNext), TreeEvent::Unhandled);
        assert_eq!(tree.into_model().listener_count(), 0);
    }
}
