//! Tree view for ratatui: vetoable expansion, path-based selection, and model reconciliation.
//!
//! [`Tree`] owns a [`TreeModel`], tracks which paths are expanded, keeps a selection of
//! [`TreePath`]s, and projects the visible nodes onto rows through a [`TreeUi`]
//! ([`TreeLayout`] by default). [`TreeView`] renders that state as a ratatui widget.
//!
//! Feature flags:
//! - `keymap`: crossterm-based key bindings and `Tree::handle_key*` helpers.
//! - `serde`: serde support for [`TreeSnapshot`] and [`TreeOptions`].

mod action;
mod context;
mod default_model;
mod error;
mod event;
mod expansion;
mod glyphs;
#[cfg(feature = "keymap")]
mod keymap;
mod layout;
mod model;
mod options;
mod path;
pub mod prelude;
mod selection;
mod snapshot;
mod style;
mod tree;
mod ui;
mod widget;

pub use action::{TreeAction, TreeEvent};
pub use context::TreeRowContext;
pub use default_model::{DefaultTreeModel, NodeId};
pub use error::{TreeError, TreeResult};
pub use event::{EventQueue, ListenerId, Listeners};
pub use expansion::{
    ExpandDecision, ExpansionEvent, ExpansionKind, ExpansionListener, ExpansionState,
    ExpansionStore, Transition, WillExpandListener,
};
pub use glyphs::{
    TreeGlyphs, TreeLabelPrefix, TreeLabelProvider, TreeLabelRenderer, ValueLabel,
    tree_label_line,
};
#[cfg(feature = "keymap")]
pub use keymap::{KeymapProfile, TreeKeyBindings};
pub use layout::{DEFAULT_INDENT, TreeLayout, VisibleRow};
pub use model::{
    ChangedChild, ModelListener, TreeModel, TreeModelEvent, TreeModelEventKind, children,
};
pub use options::TreeOptions;
pub use path::TreePath;
pub use selection::{
    DefaultTreeSelectionModel, EmptySelectionModel, PathChange, SelectionListener,
    SelectionMode, TreeSelectionEvent, TreeSelectionModel,
};
pub use snapshot::{TreeSnapshot, index_path, resolve_index_path};
pub use style::{TreeScrollPolicy, TreeViewStyle};
pub use tree::{PropertyListener, Tree, TreeProperty};
pub use ui::{ContentRect, TreeUi};
pub use widget::TreeView;
