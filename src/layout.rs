use std::hash::Hash;

use ratatui::layout::Rect;
use rustc_hash::{FxBuildHasher, FxHashMap};
use smallvec::SmallVec;

use crate::expansion::ExpansionState;
use crate::model::{TreeModel, children};
use crate::options::TreeOptions;
use crate::path::TreePath;
use crate::style::TreeScrollPolicy;
use crate::ui::{ContentRect, TreeUi};

/// Columns per nesting level when none is configured.
pub const DEFAULT_INDENT: u16 = 3;

/// A displayed row with metadata used for rendering and navigation.
#[derive(Clone, Debug)]
pub struct VisibleRow<Id> {
    pub(crate) path: TreePath<Id>,
    pub(crate) level: u16,
    pub(crate) is_leaf: bool,
    pub(crate) is_expanded: bool,
    pub(crate) is_tail_stack: SmallVec<[bool; 8]>,
}

impl<Id> VisibleRow<Id> {
    #[inline]
    pub const fn path(&self) -> &TreePath<Id> {
        &self.path
    }

    /// Indentation level (the first displayed level is 0).
    #[inline]
    pub const fn level(&self) -> u16 {
        self.level
    }

    #[inline]
    pub const fn is_leaf(&self) -> bool {
        self.is_leaf
    }

    #[inline]
    pub const fn is_expanded(&self) -> bool {
        self.is_expanded
    }

    /// For each ancestor level, whether that ancestor was the last of its siblings.
    pub fn is_tail_stack(&self) -> &[bool] {
        &self.is_tail_stack
    }
}

/// Terminal row layout: one row per visible node, one cell high, indented per level.
///
/// Also keeps the scroll position and the path being edited.
#[derive(Clone, Debug)]
pub struct TreeLayout<Id> {
    rows: Vec<VisibleRow<Id>>,
    // Fast lookup from path to row index.
    index: FxHashMap<TreePath<Id>, usize>,
    indent: u16,
    width: u16,
    offset: usize,
    // Height set by the last render; `None` until the layout has been drawn.
    viewport_height: Option<usize>,
    preferred_height: usize,
    editing: Option<TreePath<Id>>,
}

impl<Id: Copy + Eq + Hash> Default for TreeLayout<Id> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Id: Copy + Eq + Hash> TreeLayout<Id> {
    pub fn new() -> Self {
        Self::with_indent(DEFAULT_INDENT)
    }

    pub fn with_indent(indent: u16) -> Self {
        Self {
            rows: Vec::new(),
            index: FxHashMap::with_hasher(FxBuildHasher),
            indent,
            width: u16::MAX,
            offset: 0,
            viewport_height: None,
            preferred_height: 0,
            editing: None,
        }
    }

    #[inline]
    pub const fn indent(&self) -> u16 {
        self.indent
    }

    /// Changes the indentation; takes effect for bounds immediately.
    pub const fn set_indent(&mut self, indent: u16) {
        self.indent = indent;
    }

    pub fn rows(&self) -> &[VisibleRow<Id>] {
        &self.rows
    }

    pub fn row(&self, row: usize) -> Option<&VisibleRow<Id>> {
        self.rows.get(row)
    }

    /// First row shown in the viewport.
    #[inline]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    pub fn set_offset(&mut self, offset: usize) {
        self.offset = offset.min(self.max_offset());
    }

    #[inline]
    pub fn viewport_height(&self) -> usize {
        self.viewport_height.unwrap_or(self.preferred_height)
    }

    /// Sets the area rows are drawn into; clamps the offset to the new height.
    pub fn set_viewport(&mut self, area: Rect) {
        self.width = area.width;
        self.viewport_height = Some(usize::from(area.height));
        self.set_offset(self.offset);
    }

    /// Rows currently inside the viewport.
    pub fn visible_range(&self) -> std::ops::Range<usize> {
        let end = self
            .offset
            .saturating_add(self.viewport_height())
            .min(self.rows.len());
        self.offset.min(end)..end
    }

    pub fn scroll_down_by(&mut self, amount: usize) {
        self.set_offset(self.offset.saturating_add(amount));
    }

    pub fn scroll_up_by(&mut self, amount: usize) {
        self.offset = self.offset.saturating_sub(amount);
    }

    /// Adjusts the offset so `row` is within the viewport according to `policy`.
    pub fn ensure_row_visible_with_policy(&mut self, row: usize, policy: TreeScrollPolicy) {
        match policy {
            TreeScrollPolicy::KeepInView => self.ensure_row_visible(row),
            TreeScrollPolicy::CenterOnSelect => self.center_row(row),
        }
    }

    /// Scrolls the minimum amount that brings `row` into the viewport.
    pub fn ensure_row_visible(&mut self, row: usize) {
        if self.rows.is_empty() {
            self.offset = 0;
            return;
        }
        let row = row.min(self.rows.len() - 1);
        let viewport_height = self.viewport_height().max(1);
        if row < self.offset {
            self.offset = row;
        } else if row >= self.offset + viewport_height {
            self.offset = row + 1 - viewport_height;
        }
    }

    fn center_row(&mut self, row: usize) {
        let viewport_height = self.viewport_height().max(1);
        if self.rows.len() <= viewport_height {
            self.offset = 0;
            return;
        }
        // Center, then clamp to valid scroll range.
        self.offset = row.saturating_sub(viewport_height / 2).min(self.max_offset());
    }

    fn max_offset(&self) -> usize {
        self.rows.len().saturating_sub(self.viewport_height().max(1))
    }

    fn bounds_of_row(&self, row: usize) -> Option<ContentRect> {
        let level = self.rows.get(row)?.level;
        let x = level.saturating_mul(self.indent);
        Some(ContentRect::new(x, row, self.width.saturating_sub(x), 1))
    }

    fn rebuild<M: TreeModel<Id = Id>>(
        &mut self,
        model: &M,
        state: &ExpansionState<Id>,
        options: &TreeOptions,
    ) {
        self.rows.clear();
        self.index.clear();
        // Used as the height until a render sets the viewport.
        self.preferred_height = options.visible_row_count;
        let hint = model.size_hint();
        if hint > self.rows.capacity() {
            self.rows.reserve(hint - self.rows.len());
        }
        if let Some(root) = model.root() {
            let mut nodes = vec![root];
            let mut is_tail_stack: SmallVec<[bool; 8]> = SmallVec::new();
            self.build_rows(
                model,
                state,
                &mut nodes,
                0,
                options.root_visible,
                &mut is_tail_stack,
            );
        }
        self.set_offset(self.offset);
        if let Some(editing) = &self.editing
            && !self.index.contains_key(editing)
        {
            log::debug!("editing session lost its row; dropping it");
            self.editing = None;
        }
    }

    fn build_rows<M: TreeModel<Id = Id>>(
        &mut self,
        model: &M,
        state: &ExpansionState<Id>,
        nodes: &mut Vec<Id>,
        level: u16,
        show_self: bool,
        is_tail_stack: &mut SmallVec<[bool; 8]>,
    ) {
        let node = nodes[nodes.len() - 1];
        let is_leaf = model.is_leaf(node);
        // Ancestors are expanded or we would not be here; only this entry matters.
        let is_expanded = !is_leaf && state.entry(nodes.as_slice()) == Some(true);

        let child_level = if show_self {
            let path = TreePath::from_slice(nodes.as_slice());
            self.index.insert(path.clone(), self.rows.len());
            self.rows.push(VisibleRow {
                path,
                level,
                is_leaf,
                is_expanded,
                is_tail_stack: is_tail_stack.clone(),
            });
            level + 1
        } else {
            level
        };
        if !is_expanded {
            return;
        }

        let last = model.child_count(node).saturating_sub(1);
        for (i, child) in children(model, node).enumerate() {
            if show_self {
                is_tail_stack.push(i == last);
            }
            nodes.push(child);
            self.build_rows(model, state, nodes, child_level, true, is_tail_stack);
            nodes.pop();
            if show_self {
                is_tail_stack.pop();
            }
        }
    }
}

impl<M: TreeModel> TreeUi<M> for TreeLayout<M::Id> {
    fn refresh(&mut self, model: &M, state: &ExpansionState<M::Id>, options: &TreeOptions) {
        self.rebuild(model, state, options);
    }

    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn row_for_path(&self, path: &TreePath<M::Id>) -> Option<usize> {
        self.index.get(path).copied()
    }

    fn path_for_row(&self, row: usize) -> Option<TreePath<M::Id>> {
        self.rows.get(row).map(|visible| visible.path.clone())
    }

    fn path_bounds(&self, path: &TreePath<M::Id>) -> Option<ContentRect> {
        self.bounds_of_row(*self.index.get(path)?)
    }

    fn closest_path_for_location(&self, _x: u16, y: usize) -> Option<TreePath<M::Id>> {
        let last = self.rows.len().checked_sub(1)?;
        Some(self.rows[y.min(last)].path.clone())
    }

    fn scroll_rect_to_visible(&mut self, rect: ContentRect) {
        let viewport_height = self.viewport_height().max(1);
        if rect.y < self.offset {
            self.offset = rect.y;
        } else if rect.bottom() > self.offset + viewport_height {
            // Keep the top of a tall rect in view.
            self.offset = (rect.bottom() - viewport_height).min(rect.y);
        }
        self.set_offset(self.offset);
    }

    fn start_editing_at_path(&mut self, _model: &M, path: &TreePath<M::Id>) -> bool {
        if !self.index.contains_key(path) {
            return false;
        }
        self.editing = Some(path.clone());
        true
    }

    fn stop_editing(&mut self) -> bool {
        self.editing = None;
        true
    }

    fn cancel_editing(&mut self) {
        self.editing = None;
    }

    fn is_editing(&self) -> bool {
        self.editing.is_some()
    }

    fn editing_path(&self) -> Option<TreePath<M::Id>> {
        self.editing.clone()
    }
}
