use thiserror::Error;

/// Misuse of the mutable model or of a snapshot that cannot be applied.
///
/// Stale paths and unresolvable rows are not errors; queries report them as
/// `false`/`None` instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// The node id does not refer to a live node.
    #[error("node {0} is not part of the model")]
    UnknownNode(usize),
    /// An insertion index beyond the parent's child count.
    #[error("child index {index} out of bounds for a parent with {len} children")]
    ChildIndexOutOfBounds { index: usize, len: usize },
    /// The root cannot be detached from its (nonexistent) parent.
    #[error("the root node has no parent to be removed from")]
    RemoveRoot,
    /// The parent is configured to reject children.
    #[error("node {0} does not allow children")]
    ChildrenNotAllowed(usize),
    /// A snapshot was taken against a tree with a root, but the model is empty.
    #[error("model has no root to restore the snapshot against")]
    MissingRoot,
}

pub type TreeResult<T> = Result<T, TreeError>;
