use ratatui::style::{Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::Borders;

use crate::glyphs::TreeGlyphs;

/// Политика скролла при изменении ведущей строки.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TreeScrollPolicy {
    #[default]
    KeepInView,
    CenterOnSelect,
}

/// Визуальные настройки виджета дерева.
#[derive(Clone)]
pub struct TreeViewStyle<'a> {
    pub title: Option<Line<'a>>,
    pub block_style: Style,
    pub border_style: Style,
    /// Applied to every selected row.
    pub selected_style: Style,
    /// Applied on top of `selected_style` to the lead row.
    pub lead_style: Style,
    /// Applied to the row being edited.
    pub editing_style: Style,
    pub line_style: Style,
    pub highlight_symbol: &'a str,
    pub borders: Borders,
    pub glyphs: TreeGlyphs<'a>,
    pub draw_lines: bool,
    pub scroll_policy: TreeScrollPolicy,
}

impl Default for TreeViewStyle<'_> {
    fn default() -> Self {
        Self {
            title: None,
            block_style: Style::default(),
            border_style: Style::default(),
            selected_style: Style::default().add_modifier(Modifier::REVERSED),
            lead_style: Style::default().add_modifier(Modifier::BOLD),
            editing_style: Style::default().add_modifier(Modifier::UNDERLINED),
            line_style: Style::default(),
            highlight_symbol: ">> ",
            borders: Borders::ALL,
            glyphs: TreeGlyphs::unicode(),
            draw_lines: true,
            scroll_policy: TreeScrollPolicy::KeepInView,
        }
    }
}
