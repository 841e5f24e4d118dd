pub use crate::{
    DefaultTreeModel, DefaultTreeSelectionModel, ExpandDecision, ExpansionEvent, ExpansionKind,
    NodeId, SelectionMode, Transition, Tree, TreeAction, TreeError, TreeEvent, TreeGlyphs,
    TreeLabelPrefix, TreeLabelProvider, TreeLabelRenderer, TreeLayout, TreeModel, TreeOptions,
    TreePath, TreeProperty, TreeResult, TreeRowContext, TreeScrollPolicy, TreeSelectionModel,
    TreeSnapshot, TreeUi, TreeView, TreeViewStyle, ValueLabel, tree_label_line,
};

#[cfg(feature = "keymap")]
pub use crate::{KeymapProfile, TreeKeyBindings};
