use std::fmt::Debug;
use std::hash::Hash;

use smallvec::SmallVec;

use crate::event::ListenerId;
use crate::path::TreePath;

/// Listener registered on a model to receive structural change notifications.
pub type ModelListener<Id> = Box<dyn FnMut(&TreeModelEvent<Id>)>;

/// Minimal tree contract required by the widget.
///
/// A proper tree is expected (not a DAG):
/// - no cycles;
/// - each node has exactly one parent;
/// - identifiers are stable for the lifetime of a node (paths hold them).
///
/// Models that never change can ignore the listener methods; the defaults accept no listeners.
pub trait TreeModel {
    /// Node identifier type.
    type Id: Copy + Eq + Hash + Debug + 'static;

    /// Returns the root node (or `None` if the tree is empty).
    fn root(&self) -> Option<Self::Id>;
    /// Number of children of `parent`.
    fn child_count(&self, parent: Self::Id) -> usize;
    /// Child of `parent` at `index`, in a deterministic order.
    fn child(&self, parent: Self::Id, index: usize) -> Option<Self::Id>;
    /// Returns `true` if the node exists in the model.
    fn contains(&self, id: Self::Id) -> bool;

    /// Returns `true` if the node can never show children.
    fn is_leaf(&self, id: Self::Id) -> bool {
        self.child_count(id) == 0
    }

    /// Position of `child` among the children of `parent`.
    fn index_of_child(&self, parent: Self::Id, child: Self::Id) -> Option<usize> {
        (0..self.child_count(parent)).find(|&index| self.child(parent, index) == Some(child))
    }

    /// Returns an approximate size hint (not required to be exact).
    fn size_hint(&self) -> usize {
        0
    }

    /// Subscribes to structural change notifications.
    ///
    /// Returns `None` if the model never changes and keeps no listeners.
    fn add_model_listener(&mut self, _listener: ModelListener<Self::Id>) -> Option<ListenerId> {
        None
    }

    /// Drops a subscription made with [`TreeModel::add_model_listener`].
    fn remove_model_listener(&mut self, _id: ListenerId) -> bool {
        false
    }
}

/// Iterates the children of `parent` in model order.
pub fn children<M: TreeModel>(model: &M, parent: M::Id) -> impl Iterator<Item = M::Id> + '_ {
    (0..model.child_count(parent)).filter_map(move |index| model.child(parent, index))
}

/// Kind of structural change reported by a model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TreeModelEventKind {
    /// Node values changed; the shape of the tree did not.
    NodesChanged,
    /// `children` were inserted under `path`.
    NodesInserted,
    /// `children` were removed from under `path`; indices are their old positions.
    NodesRemoved,
    /// Everything below `path` may have changed.
    StructureChanged,
}

/// A child referenced by a model event, with its index in the parent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChangedChild<Id> {
    pub index: usize,
    pub node: Id,
}

/// Structural change notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeModelEvent<Id> {
    pub kind: TreeModelEventKind,
    /// Path of the parent whose children changed (or of the changed subtree).
    pub path: TreePath<Id>,
    pub children: SmallVec<[ChangedChild<Id>; 4]>,
}

impl<Id: Copy + Eq> TreeModelEvent<Id> {
    pub fn new(kind: TreeModelEventKind, path: TreePath<Id>) -> Self {
        Self {
            kind,
            path,
            children: SmallVec::new(),
        }
    }

    /// Adds a child reference to the event.
    #[must_use]
    pub fn with_child(mut self, index: usize, node: Id) -> Self {
        self.children.push(ChangedChild { index, node });
        self
    }

    pub fn nodes_changed(path: TreePath<Id>) -> Self {
        Self::new(TreeModelEventKind::NodesChanged, path)
    }

    pub fn nodes_inserted(path: TreePath<Id>) -> Self {
        Self::new(TreeModelEventKind::NodesInserted, path)
    }

    pub fn nodes_removed(path: TreePath<Id>) -> Self {
        Self::new(TreeModelEventKind::NodesRemoved, path)
    }

    pub fn structure_changed(path: TreePath<Id>) -> Self {
        Self::new(TreeModelEventKind::StructureChanged, path)
    }

    /// Paths of the referenced children.
    pub fn child_paths(&self) -> impl Iterator<Item = TreePath<Id>> + '_ {
        self.children.iter().map(|child| self.path.child(child.node))
    }
}
