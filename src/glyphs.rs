use std::borrow::Cow;

use ratatui::text::{Line, Span};

use crate::context::TreeRowContext;
use crate::default_model::DefaultTreeModel;
use crate::model::TreeModel;

#[derive(Clone, Copy, Debug)]
pub struct TreeGlyphs<'a> {
    pub indent: &'a str,
    pub branch_last: &'a str,
    pub branch: &'a str,
    pub vert: &'a str,
    pub empty: &'a str,
    pub leaf: &'a str,
    pub expanded: &'a str,
    pub collapsed: &'a str,
}

impl TreeGlyphs<'static> {
    pub const fn unicode() -> Self {
        Self {
            indent: "   ",
            branch_last: "└──",
            branch: "├──",
            vert: "│  ",
            empty: "   ",
            leaf: "•",
            expanded: "▼",
            collapsed: "▶",
        }
    }

    pub const fn ascii() -> Self {
        Self {
            indent: "   ",
            branch_last: "`--",
            branch: "|--",
            vert: "|  ",
            empty: "   ",
            leaf: "*",
            expanded: "v",
            collapsed: ">",
        }
    }
}

/// Label text of a node plus an optional prefix drawn between the expander and the name.
#[derive(Clone)]
pub struct TreeLabelPrefix<'a> {
    pub name: Cow<'a, str>,
    pub prefix: Option<Cow<'a, str>>,
}

impl<'a> TreeLabelPrefix<'a> {
    pub fn new(name: impl Into<Cow<'a, str>>) -> Self {
        Self {
            name: name.into(),
            prefix: None,
        }
    }
}

/// Supplies label text; rendering with guides and expanders is done by [`tree_label_line`].
pub trait TreeLabelProvider<M: TreeModel> {
    fn label_parts<'a>(&'a self, model: &'a M, id: M::Id) -> TreeLabelPrefix<'a>;
}

/// Renders the whole label line of a row.
pub trait TreeLabelRenderer<M: TreeModel> {
    fn line<'a>(
        &'a self,
        model: &'a M,
        id: M::Id,
        ctx: &TreeRowContext<'_>,
        glyphs: &TreeGlyphs<'a>,
    ) -> Line<'a>;
}

impl<M, P> TreeLabelRenderer<M> for P
where
    M: TreeModel,
    P: TreeLabelProvider<M>,
{
    fn line<'a>(
        &'a self,
        model: &'a M,
        id: M::Id,
        ctx: &TreeRowContext<'_>,
        glyphs: &TreeGlyphs<'a>,
    ) -> Line<'a> {
        let parts = self.label_parts(model, id);
        tree_label_line(ctx, parts, glyphs)
    }
}

/// Labels [`DefaultTreeModel`] nodes with their value.
#[derive(Clone, Copy, Debug, Default)]
pub struct ValueLabel;

impl<T: AsRef<str>> TreeLabelProvider<DefaultTreeModel<T>> for ValueLabel {
    fn label_parts<'a>(
        &'a self,
        model: &'a DefaultTreeModel<T>,
        id: <DefaultTreeModel<T> as TreeModel>::Id,
    ) -> TreeLabelPrefix<'a> {
        TreeLabelPrefix::new(model.value(id).map_or("", AsRef::as_ref))
    }
}

pub fn tree_label_line<'a>(
    ctx: &TreeRowContext<'_>,
    parts: TreeLabelPrefix<'a>,
    glyphs: &TreeGlyphs<'a>,
) -> Line<'a> {
    let TreeLabelPrefix { name, prefix: op } = parts;
    let op = op.filter(|value| !value.is_empty());
    let expander = if ctx.has_children {
        if ctx.is_expanded {
            glyphs.expanded
        } else {
            glyphs.collapsed
        }
    } else if ctx.level == 0 {
        ""
    } else {
        glyphs.leaf
    };

    if ctx.level == 0 || !ctx.draw_lines {
        let mut spans = Vec::with_capacity(ctx.level as usize + 4);
        for _ in 0..ctx.level {
            spans.push(Span::raw(glyphs.empty));
        }
        if !expander.is_empty() {
            spans.push(Span::raw(expander));
        }
        if let Some(op) = op {
            spans.push(Span::raw(op));
        }
        spans.push(Span::raw(" "));
        spans.push(Span::raw(name));
        return Line::from(spans);
    }

    let mut name_spans = Vec::with_capacity(ctx.is_tail_stack.len() + 5);
    let own_level = ctx.is_tail_stack.len().saturating_sub(1);
    for (l, &is_last) in ctx.is_tail_stack.iter().enumerate() {
        let part = match (l == own_level, is_last) {
            (true, true) => glyphs.branch_last,
            (true, false) => glyphs.branch,
            (false, true) => glyphs.indent,
            (false, false) => glyphs.vert,
        };
        name_spans.push(Span::styled(part, ctx.line_style));
    }

    if !expander.is_empty() {
        name_spans.push(Span::raw(expander));
        name_spans.push(Span::raw(" "));
    }

    if let Some(op) = op {
        name_spans.push(Span::raw(op));
        name_spans.push(Span::raw(" "));
    }

    name_spans.push(Span::raw(name));
    Line::from(name_spans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::style::Style;

    fn ctx(level: u16, is_tail_stack: &[bool], has_children: bool) -> TreeRowContext<'_> {
        TreeRowContext {
            level,
            is_tail_stack,
            is_expanded: false,
            has_children,
            is_selected: false,
            is_lead: false,
            is_editing: false,
            draw_lines: true,
            line_style: Style::default(),
        }
    }

    fn text(line: &Line<'_>) -> String {
        line.spans.iter().map(|span| span.content.as_ref()).collect()
    }

    #[test]
    fn guides_follow_tail_stack() {
        let glyphs = TreeGlyphs::ascii();
        let line = tree_label_line(
            &ctx(2, &[false, true], false),
            TreeLabelPrefix::new("leaf"),
            &glyphs,
        );
        assert_eq!(text(&line), "|  `--* leaf");

        let line = tree_label_line(&ctx(1, &[false], true), TreeLabelPrefix::new("dir"), &glyphs);
        assert_eq!(text(&line), "|--> dir");
    }

    #[test]
    fn top_level_rows_skip_guides() {
        let glyphs = TreeGlyphs::ascii();
        let parts = TreeLabelPrefix {
            name: "root".into(),
            prefix: Some("[x]".into()),
        };
        let line = tree_label_line(&ctx(0, &[], true), parts, &glyphs);
        assert_eq!(text(&line), ">[x] root");
    }

    #[test]
    fn value_label_reads_model_values() {
        let model = DefaultTreeModel::new(String::from("root"));
        let root = model.root().unwrap();
        let parts = ValueLabel.label_parts(&model, root);
        assert_eq!(parts.name, "root");
    }
}
