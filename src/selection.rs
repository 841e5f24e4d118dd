use std::hash::Hash;
use std::slice;

use rustc_hash::{FxBuildHasher, FxHashSet};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::event::{ListenerId, Listeners};
use crate::path::TreePath;

/// Listener registered on a selection model.
pub type SelectionListener<Id> = Box<dyn FnMut(&TreeSelectionEvent<Id>)>;

/// How many paths a selection model may hold at once.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SelectionMode {
    /// At most one path.
    Single,
    /// Any set of paths.
    #[default]
    Discontiguous,
}

/// One path entering or leaving the selection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathChange<Id> {
    pub path: TreePath<Id>,
    pub added: bool,
}

/// Notification describing an effective selection change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeSelectionEvent<Id> {
    pub changes: Vec<PathChange<Id>>,
    pub old_lead: Option<TreePath<Id>>,
    pub new_lead: Option<TreePath<Id>>,
}

impl<Id> TreeSelectionEvent<Id> {
    /// Paths that became selected.
    pub fn added_paths(&self) -> impl Iterator<Item = &TreePath<Id>> {
        self.changes
            .iter()
            .filter(|change| change.added)
            .map(|change| &change.path)
    }

    /// Paths that stopped being selected.
    pub fn removed_paths(&self) -> impl Iterator<Item = &TreePath<Id>> {
        self.changes
            .iter()
            .filter(|change| !change.added)
            .map(|change| &change.path)
    }
}

/// Tracks a set of selected paths and reports changes.
pub trait TreeSelectionModel<Id> {
    fn selection_mode(&self) -> SelectionMode;
    /// Replaces the selection.
    fn set_paths(&mut self, paths: &[TreePath<Id>]);
    /// Adds paths to the selection.
    fn add_paths(&mut self, paths: &[TreePath<Id>]);
    /// Removes paths from the selection; unknown paths are ignored.
    fn remove_paths(&mut self, paths: &[TreePath<Id>]);
    /// Selected paths in selection order.
    fn paths(&self) -> &[TreePath<Id>];
    fn is_path_selected(&self, path: &TreePath<Id>) -> bool;
    fn clear(&mut self);
    /// Most recently added path, if still selected.
    fn lead_path(&self) -> Option<&TreePath<Id>>;
    /// Returns `None` if the model never changes and keeps no listeners.
    fn add_selection_listener(&mut self, listener: SelectionListener<Id>) -> Option<ListenerId>;
    fn remove_selection_listener(&mut self, id: ListenerId) -> bool;

    fn set_path(&mut self, path: &TreePath<Id>) {
        self.set_paths(slice::from_ref(path));
    }

    fn add_path(&mut self, path: &TreePath<Id>) {
        self.add_paths(slice::from_ref(path));
    }

    fn remove_path(&mut self, path: &TreePath<Id>) {
        self.remove_paths(slice::from_ref(path));
    }

    /// First selected path.
    fn selection_path(&self) -> Option<&TreePath<Id>> {
        self.paths().first()
    }

    fn selection_count(&self) -> usize {
        self.paths().len()
    }

    fn is_selection_empty(&self) -> bool {
        self.paths().is_empty()
    }
}

/// Selection model backed by an ordered list plus a membership set.
pub struct DefaultTreeSelectionModel<Id> {
    mode: SelectionMode,
    selection: Vec<TreePath<Id>>,
    unique: FxHashSet<TreePath<Id>>,
    lead: Option<TreePath<Id>>,
    listeners: Listeners<dyn FnMut(&TreeSelectionEvent<Id>)>,
}

impl<Id: Copy + Eq + Hash> Default for DefaultTreeSelectionModel<Id> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Id: Copy + Eq + Hash> DefaultTreeSelectionModel<Id> {
    pub fn new() -> Self {
        Self::with_mode(SelectionMode::default())
    }

    pub fn with_mode(mode: SelectionMode) -> Self {
        Self {
            mode,
            selection: Vec::new(),
            unique: FxHashSet::with_hasher(FxBuildHasher),
            lead: None,
            listeners: Listeners::new(),
        }
    }

    /// Changes the mode; switching to single selection keeps only the first path.
    pub fn set_selection_mode(&mut self, mode: SelectionMode) {
        self.mode = mode;
        if mode == SelectionMode::Single && self.selection.len() > 1 {
            let first = self.selection[0].clone();
            self.set_paths(slice::from_ref(&first));
        }
    }

    pub const fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn notify(&mut self, changes: Vec<PathChange<Id>>, old_lead: Option<TreePath<Id>>) {
        if changes.is_empty() {
            return;
        }
        let event = TreeSelectionEvent {
            changes,
            old_lead,
            new_lead: self.lead.clone(),
        };
        for listener in self.listeners.iter_mut() {
            listener(&event);
        }
    }
}

impl<Id: Copy + Eq + Hash> TreeSelectionModel<Id> for DefaultTreeSelectionModel<Id> {
    fn selection_mode(&self) -> SelectionMode {
        self.mode
    }

    fn set_paths(&mut self, paths: &[TreePath<Id>]) {
        let paths = if self.mode == SelectionMode::Single && paths.len() > 1 {
            &paths[..1]
        } else {
            paths
        };

        let mut selection = Vec::with_capacity(paths.len());
        let mut unique = FxHashSet::with_capacity_and_hasher(paths.len(), FxBuildHasher);
        let mut changes = Vec::new();
        for path in paths {
            if unique.insert(path.clone()) {
                if !self.unique.contains(path) {
                    changes.push(PathChange {
                        path: path.clone(),
                        added: true,
                    });
                }
                selection.push(path.clone());
            }
        }
        for old in &self.selection {
            if !unique.contains(old) {
                changes.push(PathChange {
                    path: old.clone(),
                    added: false,
                });
            }
        }

        let old_lead = self.lead.take();
        self.lead = selection.last().cloned();
        self.selection = selection;
        self.unique = unique;
        self.notify(changes, old_lead);
    }

    fn add_paths(&mut self, paths: &[TreePath<Id>]) {
        if paths.is_empty() {
            return;
        }
        if self.mode == SelectionMode::Single {
            self.set_paths(paths);
            return;
        }

        let mut changes = Vec::new();
        for path in paths {
            if self.unique.insert(path.clone()) {
                self.selection.push(path.clone());
                changes.push(PathChange {
                    path: path.clone(),
                    added: true,
                });
            }
        }
        // The lead is the last path that was actually added.
        let Some(lead) = changes.last().map(|change| change.path.clone()) else {
            return;
        };
        let old_lead = self.lead.replace(lead);
        self.notify(changes, old_lead);
    }

    fn remove_paths(&mut self, paths: &[TreePath<Id>]) {
        let mut changes = Vec::new();
        for path in paths {
            if self.unique.remove(path) {
                changes.push(PathChange {
                    path: path.clone(),
                    added: false,
                });
            }
        }
        if changes.is_empty() {
            return;
        }
        let unique = &self.unique;
        self.selection.retain(|path| unique.contains(path));
        let old_lead = std::mem::replace(&mut self.lead, self.selection.last().cloned());
        self.notify(changes, old_lead);
    }

    fn paths(&self) -> &[TreePath<Id>] {
        &self.selection
    }

    fn is_path_selected(&self, path: &TreePath<Id>) -> bool {
        self.unique.contains(path)
    }

    fn clear(&mut self) {
        if self.selection.is_empty() {
            return;
        }
        let changes = self
            .selection
            .drain(..)
            .map(|path| PathChange { path, added: false })
            .collect();
        self.unique.clear();
        let old_lead = self.lead.take();
        self.notify(changes, old_lead);
    }

    fn lead_path(&self) -> Option<&TreePath<Id>> {
        self.lead.as_ref()
    }

    fn add_selection_listener(&mut self, listener: SelectionListener<Id>) -> Option<ListenerId> {
        Some(self.listeners.add(listener))
    }

    fn remove_selection_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }
}

/// Selection model that never holds a path; installed when selection is disabled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EmptySelectionModel;

impl<Id> TreeSelectionModel<Id> for EmptySelectionModel {
    fn selection_mode(&self) -> SelectionMode {
        SelectionMode::Single
    }

    fn set_paths(&mut self, _paths: &[TreePath<Id>]) {}

    fn add_paths(&mut self, _paths: &[TreePath<Id>]) {}

    fn remove_paths(&mut self, _paths: &[TreePath<Id>]) {}

    fn paths(&self) -> &[TreePath<Id>] {
        &[]
    }

    fn is_path_selected(&self, _path: &TreePath<Id>) -> bool {
        false
    }

    fn clear(&mut self) {}

    fn lead_path(&self) -> Option<&TreePath<Id>> {
        None
    }

    fn add_selection_listener(&mut self, _listener: SelectionListener<Id>) -> Option<ListenerId> {
        None
    }

    fn remove_selection_listener(&mut self, _id: ListenerId) -> bool {
        false
    }
}
