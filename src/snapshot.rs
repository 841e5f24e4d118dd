#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{TreeError, TreeResult};
use crate::model::TreeModel;
use crate::path::TreePath;
use crate::tree::Tree;
use crate::ui::TreeUi;

/// Snapshot of expansion and selection, stored as child-index paths.
///
/// An index path lists the child index taken at each level below the root (the root itself is
/// the empty index path), so a snapshot can be applied to a rebuilt model whose node ids differ.
///
/// With the `serde` feature enabled, this type derives `Serialize`/`Deserialize`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TreeSnapshot {
    /// Expanded paths, parents before children.
    pub expanded: Vec<Vec<usize>>,
    /// Selected paths in selection order.
    pub selected: Vec<Vec<usize>>,
    pub lead: Option<Vec<usize>>,
}

impl TreeSnapshot {
    pub fn is_empty(&self) -> bool {
        self.expanded.is_empty() && self.selected.is_empty() && self.lead.is_none()
    }
}

/// Child indices leading from the model's root to the end of `path`.
///
/// Returns `None` if the path does not start at the root or a step is not a child.
pub fn index_path<M: TreeModel>(model: &M, path: &TreePath<M::Id>) -> Option<Vec<usize>> {
    let nodes = path.nodes();
    if model.root() != Some(nodes[0]) {
        return None;
    }
    nodes
        .windows(2)
        .map(|pair| model.index_of_child(pair[0], pair[1]))
        .collect()
}

/// Follows child indices from the model's root; `None` once an index is out of range.
pub fn resolve_index_path<M: TreeModel>(model: &M, indices: &[usize]) -> Option<TreePath<M::Id>> {
    let mut path = TreePath::new(model.root()?);
    for &index in indices {
        let child = model.child(path.last(), index)?;
        path = path.child(child);
    }
    Some(path)
}

impl<M: TreeModel, U: TreeUi<M>> Tree<M, U> {
    /// Captures the expanded paths, the selection and the lead.
    pub fn snapshot(&self) -> TreeSnapshot {
        let model = self.model();
        let mut expanded = Vec::new();
        if let Some(root) = model.root().map(TreePath::new)
            && self.is_expanded(&root)
        {
            expanded.push(Vec::new());
            expanded.extend(
                self.expanded_descendants(&root)
                    .filter_map(|path| index_path(model, path)),
            );
        }
        // Lexicographic order puts every parent before its children.
        expanded.sort();

        TreeSnapshot {
            expanded,
            selected: self
                .selection_paths()
                .iter()
                .filter_map(|path| index_path(model, path))
                .collect(),
            lead: self
                .lead_selection_path()
                .and_then(|path| index_path(model, path)),
        }
    }

    /// Re-applies a snapshot through the regular expand and select operations.
    ///
    /// Paths expanded now stay expanded. Index paths that no longer resolve are skipped, and
    /// expansions may still be vetoed by listeners.
    pub fn restore(&mut self, snapshot: &TreeSnapshot) -> TreeResult<()> {
        if self.model().root().is_none() {
            if snapshot.is_empty() {
                return Ok(());
            }
            return Err(TreeError::MissingRoot);
        }

        let mut expanded: Vec<&[usize]> = snapshot.expanded.iter().map(Vec::as_slice).collect();
        expanded.sort_by_key(|indices| indices.len());
        for indices in expanded {
            match resolve_index_path(self.model(), indices) {
                Some(path) => {
                    self.expand_path(&path);
                }
                None => log::debug!("skipping stale expanded index path {indices:?}"),
            }
        }

        let selected: Vec<_> = snapshot
            .selected
            .iter()
            .filter_map(|indices| resolve_index_path(self.model(), indices))
            .collect();
        self.set_selection_paths(&selected);

        let lead = snapshot
            .lead
            .as_deref()
            .and_then(|indices| resolve_index_path(self.model(), indices));
        self.set_lead_selection_path(lead);
        Ok(())
    }
}
