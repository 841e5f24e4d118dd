use std::marker::PhantomData;

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::widgets::{
    Block, Borders, HighlightSpacing, List, ListItem, ListState, Scrollbar, ScrollbarOrientation,
    ScrollbarState, StatefulWidget, Widget,
};

use crate::context::TreeRowContext;
use crate::glyphs::TreeLabelRenderer;
use crate::layout::TreeLayout;
use crate::model::TreeModel;
use crate::style::TreeViewStyle;
use crate::tree::Tree;

/// Основной виджет дерева.
///
/// Рендерит только строки, попадающие во вьюпорт раскладки [`TreeLayout`].
pub struct TreeView<'a, M, L> {
    label: &'a L,
    style: TreeViewStyle<'a>,
    _marker: PhantomData<fn(&M)>,
}

impl<'a, M, L> TreeView<'a, M, L>
where
    M: TreeModel,
    L: TreeLabelRenderer<M>,
{
    pub fn new(label: &'a L) -> Self {
        Self {
            label,
            style: TreeViewStyle::default(),
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub fn style(mut self, style: TreeViewStyle<'a>) -> Self {
        self.style = style;
        self
    }

    fn block(&self, show_scrollbar: bool) -> Block<'a> {
        let mut borders = self.style.borders;
        // The scrollbar takes the place of the right border.
        if show_scrollbar {
            borders.remove(Borders::RIGHT);
        }
        let mut block = Block::default()
            .borders(borders)
            .style(self.style.block_style)
            .border_style(self.style.border_style);
        if let Some(title) = self.style.title.clone() {
            block = block.title(title);
        }
        block
    }
}

impl<M, L> StatefulWidget for TreeView<'_, M, L>
where
    M: TreeModel,
    L: TreeLabelRenderer<M>,
{
    type State = Tree<M, TreeLayout<M::Id>>;

    fn render(self, area: Rect, buf: &mut Buffer, tree: &mut Self::State) {
        let row_count = tree.row_count();
        let inner_height = usize::from(self.block(false).inner(area).height);
        let show_scrollbar = row_count > inner_height && area.width > 0;
        let block = self.block(show_scrollbar);
        let inner = block.inner(area);

        let lead_row = tree.lead_selection_row();
        let Some(layout) = tree.ui_mut() else {
            block.render(area, buf);
            return;
        };
        layout.set_viewport(inner);
        if let Some(row) = lead_row {
            layout.ensure_row_visible_with_policy(row, self.style.scroll_policy);
        }

        let tree = &*tree;
        let Some(layout) = tree.ui() else {
            return;
        };
        let range = layout.visible_range();
        let offset = range.start;
        let editing = tree.editing_path();
        let glyphs = self.style.glyphs;

        let items: Vec<ListItem<'_>> = layout.rows()[range]
            .iter()
            .map(|row| {
                let is_selected = tree.is_path_selected(row.path());
                let is_editing = editing.as_ref() == Some(row.path());
                let ctx = TreeRowContext {
                    level: row.level(),
                    is_tail_stack: row.is_tail_stack(),
                    is_expanded: row.is_expanded(),
                    has_children: !row.is_leaf(),
                    is_selected,
                    is_lead: tree.lead_selection_path() == Some(row.path()),
                    is_editing,
                    draw_lines: self.style.draw_lines,
                    line_style: self.style.line_style,
                };
                let line = self
                    .label
                    .line(tree.model(), row.path().last(), &ctx, &glyphs);
                let mut style = Style::default();
                if is_selected {
                    style = style.patch(self.style.selected_style);
                }
                if is_editing {
                    style = style.patch(self.style.editing_style);
                }
                ListItem::new(line).style(style)
            })
            .collect();

        let mut list_state =
            ListState::default().with_selected(lead_row.and_then(|row| row.checked_sub(offset)));
        let list = List::new(items)
            .block(block)
            .highlight_style(self.style.lead_style)
            .highlight_symbol(self.style.highlight_symbol)
            .highlight_spacing(HighlightSpacing::Always);
        StatefulWidget::render(list, area, buf, &mut list_state);

        if show_scrollbar {
            let scroll_len = row_count.saturating_sub(inner_height).saturating_add(1);
            let mut scrollbar_state = ScrollbarState::new(scroll_len)
                .position(offset)
                .viewport_content_length(inner_height);
            let bar_area = Rect {
                x: area.x,
                y: inner.y,
                width: area.width,
                height: inner.height,
            };
            Scrollbar::new(ScrollbarOrientation::VerticalRight).render(
                bar_area,
                buf,
                &mut scrollbar_state,
            );
        }
    }
}
