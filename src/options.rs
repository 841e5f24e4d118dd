#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Behavioural switches of a [`crate::Tree`].
///
/// With the `serde` feature enabled, this type derives `Serialize`/`Deserialize`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TreeOptions {
    /// Show the root as the first row; otherwise its children start the list.
    pub root_visible: bool,
    /// Allow editing sessions to start.
    pub editable: bool,
    /// After an expansion, scroll so the newly shown children come into view.
    pub scrolls_on_expand: bool,
    /// Expand ancestors of newly selected paths so they get a row.
    pub expands_selected_paths: bool,
    /// Commit (rather than cancel) an edit interrupted by expansion or selection changes.
    pub invokes_stop_cell_editing: bool,
    /// Preferred number of rows shown when no render area dictates it.
    pub visible_row_count: usize,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            root_visible: true,
            editable: false,
            scrolls_on_expand: true,
            expands_selected_paths: true,
            invokes_stop_cell_editing: false,
            visible_row_count: 20,
        }
    }
}
