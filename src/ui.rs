//! Row↔path projection contract implemented by tree front ends.

use crate::expansion::ExpansionState;
use crate::model::TreeModel;
use crate::options::TreeOptions;
use crate::path::TreePath;

/// Rectangle in content coordinates: `x` in columns, `y` in rows from the first row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ContentRect {
    pub x: u16,
    pub y: usize,
    pub width: u16,
    pub height: usize,
}

impl ContentRect {
    pub const fn new(x: u16, y: usize, width: u16, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub const fn right(&self) -> u16 {
        self.x.saturating_add(self.width)
    }

    #[inline]
    pub const fn bottom(&self) -> usize {
        self.y.saturating_add(self.height)
    }

    pub const fn contains(&self, x: u16, y: usize) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Smallest rectangle covering both.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Self::new(x, y, right - x, bottom - y)
    }
}

/// Maps between display rows and paths, and hosts editing sessions.
///
/// The tree calls [`TreeUi::refresh`] after every change that can move rows; between refreshes
/// the answers must be consistent with the last refresh. Unknown paths and rows answer `None`.
pub trait TreeUi<M: TreeModel> {
    /// Recomputes rows from the model and expansion state.
    fn refresh(&mut self, model: &M, state: &ExpansionState<M::Id>, options: &TreeOptions);

    fn row_count(&self) -> usize;
    fn row_for_path(&self, path: &TreePath<M::Id>) -> Option<usize>;
    fn path_for_row(&self, row: usize) -> Option<TreePath<M::Id>>;
    fn path_bounds(&self, path: &TreePath<M::Id>) -> Option<ContentRect>;
    /// Path of the row nearest to the location, or `None` when there are no rows.
    fn closest_path_for_location(&self, x: u16, y: usize) -> Option<TreePath<M::Id>>;

    /// Scrolls so `rect` is inside the viewport, when the front end has one.
    fn scroll_rect_to_visible(&mut self, _rect: ContentRect) {}

    /// Starts editing `path`; returns `false` if the front end cannot edit it.
    fn start_editing_at_path(&mut self, _model: &M, _path: &TreePath<M::Id>) -> bool {
        false
    }

    /// Ends the current edit, keeping its result; returns `false` if the edit refused to stop.
    fn stop_editing(&mut self) -> bool {
        true
    }

    fn cancel_editing(&mut self) {}

    fn is_editing(&self) -> bool {
        false
    }

    fn editing_path(&self) -> Option<TreePath<M::Id>> {
        None
    }
}
