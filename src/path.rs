use std::borrow::Borrow;
use std::fmt;

use smallvec::SmallVec;

/// Inline capacity for path elements; deeper paths spill to the heap.
const INLINE_DEPTH: usize = 8;

/// Immutable root-to-node sequence of node identifiers.
///
/// A path always contains at least the root. Equality and hashing are element-wise, and a path
/// borrows as `[Id]`, so maps keyed by paths can be probed with any prefix slice.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TreePath<Id> {
    nodes: SmallVec<[Id; INLINE_DEPTH]>,
}

impl<Id: Copy + Eq> TreePath<Id> {
    /// Creates the single-element path of a root node.
    pub fn new(root: Id) -> Self {
        let mut nodes = SmallVec::new();
        nodes.push(root);
        Self { nodes }
    }

    /// Builds a path from root-first nodes; returns `None` for an empty sequence.
    pub fn from_nodes<I>(nodes: I) -> Option<Self>
    where
        I: IntoIterator<Item = Id>,
    {
        let nodes: SmallVec<[Id; INLINE_DEPTH]> = nodes.into_iter().collect();
        if nodes.is_empty() {
            None
        } else {
            Some(Self { nodes })
        }
    }

    pub(crate) fn from_slice(nodes: &[Id]) -> Self {
        debug_assert!(!nodes.is_empty(), "tree paths are never empty");
        Self {
            nodes: SmallVec::from_slice(nodes),
        }
    }

    /// Returns the nodes of the path, root first.
    #[inline]
    pub fn nodes(&self) -> &[Id] {
        &self.nodes
    }

    /// Number of nodes in the path (the root path has length 1).
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`; paths hold at least the root.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Returns `true` for the single-element root path.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Depth below the root (`0` for the root path).
    #[inline]
    pub fn depth(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn root(&self) -> Id {
        self.nodes[0]
    }

    /// The node this path identifies.
    pub fn last(&self) -> Id {
        self.nodes[self.nodes.len() - 1]
    }

    /// Path of the parent node, or `None` for the root path.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        Some(Self::from_slice(&self.nodes[..self.nodes.len() - 1]))
    }

    /// Extends the path by one child node.
    #[must_use]
    pub fn child(&self, node: Id) -> Self {
        let mut nodes = self.nodes.clone();
        nodes.push(node);
        Self { nodes }
    }

    /// Returns `true` if `self` equals `ancestor` or lies below it.
    pub fn is_descendant_of(&self, ancestor: &Self) -> bool {
        self.nodes.starts_with(&ancestor.nodes)
    }

    /// Returns `true` if `self` lies strictly below `ancestor`.
    pub fn is_strict_descendant_of(&self, ancestor: &Self) -> bool {
        self.nodes.len() > ancestor.nodes.len() && self.is_descendant_of(ancestor)
    }

    /// Strict ancestors, nearest first (parent, grandparent, ..., root).
    pub fn ancestors(&self) -> impl Iterator<Item = Self> + '_ {
        (1..self.nodes.len())
            .rev()
            .map(|len| Self::from_slice(&self.nodes[..len]))
    }
}

impl<Id> Borrow<[Id]> for TreePath<Id> {
    fn borrow(&self) -> &[Id] {
        &self.nodes
    }
}

impl<Id: fmt::Debug> fmt::Debug for TreePath<Id> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.nodes.iter()).finish()
    }
}

impl<Id: fmt::Debug> fmt::Display for TreePath<Id> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
