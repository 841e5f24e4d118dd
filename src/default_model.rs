use std::fmt;

use crate::error::{TreeError, TreeResult};
use crate::event::{ListenerId, Listeners};
use crate::model::{ModelListener, TreeModel, TreeModelEvent};
use crate::path::TreePath;

/// Identifier of a node in a [`DefaultTreeModel`].
///
/// Ids are never reused after a node is removed, so a stale path never resolves to a new node.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct Node<T> {
    value: T,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    allows_children: bool,
}

/// Arena-backed mutable tree that reports every change to its listeners.
pub struct DefaultTreeModel<T> {
    nodes: Vec<Option<Node<T>>>,
    root: Option<NodeId>,
    live: usize,
    // Leaf-ness comes from `allows_children` instead of the child count.
    asks_allows_children: bool,
    listeners: Listeners<dyn FnMut(&TreeModelEvent<NodeId>)>,
}

impl<T> DefaultTreeModel<T> {
    /// Creates a model holding a single root node.
    pub fn new(root_value: T) -> Self {
        Self {
            nodes: vec![Some(Node::new(root_value, None))],
            root: Some(NodeId(0)),
            live: 1,
            asks_allows_children: false,
            listeners: Listeners::new(),
        }
    }

    #[must_use]
    pub const fn with_asks_allows_children(mut self, asks: bool) -> Self {
        self.asks_allows_children = asks;
        self
    }

    pub const fn asks_allows_children(&self) -> bool {
        self.asks_allows_children
    }

    pub const fn set_asks_allows_children(&mut self, asks: bool) {
        self.asks_allows_children = asks;
    }

    /// Number of live nodes.
    pub const fn len(&self) -> usize {
        self.live
    }

    pub const fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of registered model listeners.
    pub const fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn node(&self, id: NodeId) -> TreeResult<&Node<T>> {
        self.nodes
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(TreeError::UnknownNode(id.0))
    }

    fn node_mut(&mut self, id: NodeId) -> TreeResult<&mut Node<T>> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(TreeError::UnknownNode(id.0))
    }

    pub fn value(&self, id: NodeId) -> Option<&T> {
        self.node(id).ok().map(|node| &node.value)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).ok().and_then(|node| node.parent)
    }

    /// Children of `id`; empty for unknown nodes.
    pub fn children_of(&self, id: NodeId) -> &[NodeId] {
        match self.node(id) {
            Ok(node) => &node.children,
            Err(_) => &[],
        }
    }

    /// Path from the root down to `id`.
    pub fn path_to_root(&self, id: NodeId) -> Option<TreePath<NodeId>> {
        let mut nodes = vec![id];
        let mut current = self.node(id).ok()?;
        while let Some(parent) = current.parent {
            nodes.push(parent);
            current = self.node(parent).ok()?;
        }
        nodes.reverse();
        TreePath::from_nodes(nodes)
    }

    /// Replaces the value of a node and reports it as changed.
    pub fn set_value(&mut self, id: NodeId, value: T) -> TreeResult<T> {
        let old = std::mem::replace(&mut self.node_mut(id)?.value, value);
        self.node_changed(id)?;
        Ok(old)
    }

    /// Inserts a new node under `parent` at `index`.
    pub fn insert(&mut self, parent: NodeId, index: usize, value: T) -> TreeResult<NodeId> {
        let parent_node = self.node(parent)?;
        if !parent_node.allows_children {
            return Err(TreeError::ChildrenNotAllowed(parent.0));
        }
        let len = parent_node.children.len();
        if index > len {
            return Err(TreeError::ChildIndexOutOfBounds { index, len });
        }

        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(Node::new(value, Some(parent))));
        self.node_mut(parent)?.children.insert(index, id);
        self.live += 1;

        if let Some(path) = self.path_to_root(parent) {
            self.fire(&TreeModelEvent::nodes_inserted(path).with_child(index, id));
        }
        Ok(id)
    }

    /// Inserts a new node as the last child of `parent`.
    pub fn append(&mut self, parent: NodeId, value: T) -> TreeResult<NodeId> {
        let index = self.node(parent)?.children.len();
        self.insert(parent, index, value)
    }

    /// Removes `id` and its whole subtree, returning the node's value.
    pub fn remove(&mut self, id: NodeId) -> TreeResult<T> {
        let parent = self.node(id)?.parent.ok_or(TreeError::RemoveRoot)?;
        let parent_path = self.path_to_root(parent);
        let siblings = &mut self.node_mut(parent)?.children;
        let index = siblings
            .iter()
            .position(|&child| child == id)
            .ok_or(TreeError::UnknownNode(id.0))?;
        siblings.remove(index);

        let value = self.free_subtree(id)?;
        if let Some(path) = parent_path {
            self.fire(&TreeModelEvent::nodes_removed(path).with_child(index, id));
        }
        Ok(value)
    }

    /// Allows or forbids children on a node; forbidding drops existing children.
    pub fn set_allows_children(&mut self, id: NodeId, allows: bool) -> TreeResult<()> {
        let node = self.node_mut(id)?;
        node.allows_children = allows;
        if allows {
            return Ok(());
        }
        let dropped = std::mem::take(&mut node.children);
        for child in dropped {
            self.free_subtree(child)?;
        }
        self.node_structure_changed(id)
    }

    /// Replaces the whole tree with a fresh root.
    pub fn set_root(&mut self, value: T) -> NodeId {
        self.nodes.iter_mut().for_each(|slot| *slot = None);
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(Node::new(value, None)));
        self.root = Some(id);
        self.live = 1;
        self.fire(&TreeModelEvent::structure_changed(TreePath::new(id)));
        id
    }

    /// Reports the whole tree as restructured.
    pub fn reload(&mut self) {
        if let Some(root) = self.root {
            self.fire(&TreeModelEvent::structure_changed(TreePath::new(root)));
        }
    }

    /// Reports the subtree below `id` as restructured.
    pub fn node_structure_changed(&mut self, id: NodeId) -> TreeResult<()> {
        let path = self.path_to_root(id).ok_or(TreeError::UnknownNode(id.0))?;
        self.fire(&TreeModelEvent::structure_changed(path));
        Ok(())
    }

    /// Reports the value of `id` as changed.
    pub fn node_changed(&mut self, id: NodeId) -> TreeResult<()> {
        let event = match self.node(id)?.parent {
            Some(parent) => {
                let index = self
                    .node(parent)?
                    .children
                    .iter()
                    .position(|&child| child == id)
                    .ok_or(TreeError::UnknownNode(id.0))?;
                let path = self
                    .path_to_root(parent)
                    .ok_or(TreeError::UnknownNode(parent.0))?;
                TreeModelEvent::nodes_changed(path).with_child(index, id)
            }
            None => TreeModelEvent::nodes_changed(TreePath::new(id)),
        };
        self.fire(&event);
        Ok(())
    }

    fn free_subtree(&mut self, id: NodeId) -> TreeResult<T> {
        let node = self
            .nodes
            .get_mut(id.0)
            .and_then(Option::take)
            .ok_or(TreeError::UnknownNode(id.0))?;
        self.live -= 1;
        let mut stack = node.children;
        while let Some(next) = stack.pop() {
            if let Some(freed) = self.nodes.get_mut(next.0).and_then(Option::take) {
                self.live -= 1;
                stack.extend(freed.children);
            }
        }
        Ok(node.value)
    }

    fn fire(&mut self, event: &TreeModelEvent<NodeId>) {
        log::trace!("model event {:?} at {}", event.kind, event.path);
        for listener in self.listeners.iter_mut() {
            listener(event);
        }
    }
}

impl<T> Node<T> {
    const fn new(value: T, parent: Option<NodeId>) -> Self {
        Self {
            value,
            parent,
            children: Vec::new(),
            allows_children: true,
        }
    }
}

impl<T> TreeModel for DefaultTreeModel<T> {
    type Id = NodeId;

    fn root(&self) -> Option<Self::Id> {
        self.root
    }

    fn child_count(&self, parent: Self::Id) -> usize {
        self.children_of(parent).len()
    }

    fn child(&self, parent: Self::Id, index: usize) -> Option<Self::Id> {
        self.children_of(parent).get(index).copied()
    }

    fn contains(&self, id: Self::Id) -> bool {
        self.node(id).is_ok()
    }

    fn is_leaf(&self, id: Self::Id) -> bool {
        match self.node(id) {
            Ok(node) if self.asks_allows_children => !node.allows_children,
            Ok(node) => node.children.is_empty(),
            Err(_) => true,
        }
    }

    fn index_of_child(&self, parent: Self::Id, child: Self::Id) -> Option<usize> {
        self.children_of(parent).iter().position(|&id| id == child)
    }

    fn size_hint(&self) -> usize {
        self.live
    }

    fn add_model_listener(&mut self, listener: ModelListener<Self::Id>) -> Option<ListenerId> {
        Some(self.listeners.add(listener))
    }

    fn remove_model_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }
}
