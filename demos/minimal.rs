// Minimal example: a fixed tree with a custom model and default styling.
use ratatui::layout::Rect;
use ratatui::prelude::Buffer;
use ratatui::widgets::StatefulWidget;

use tui_treeview::{Tree, TreeLabelPrefix, TreeLabelProvider, TreeModel, TreePath, TreeView};

// Simple in-memory tree model with fixed children lists.
struct Model {
    children: Vec<Vec<usize>>,
    names: Vec<&'static str>,
}

impl Model {
    // root -> {alpha -> {alpha.1}, beta}
    fn new() -> Self {
        Self {
            children: vec![vec![1, 3], vec![2], vec![], vec![]],
            names: vec!["root", "alpha", "alpha.1", "beta"],
        }
    }
}

// The tree queries the model through this trait only. The model never changes, so the
// listener methods keep their defaults.
impl TreeModel for Model {
    type Id = usize;

    fn root(&self) -> Option<Self::Id> {
        Some(0)
    }

    fn child_count(&self, parent: Self::Id) -> usize {
        self.children.get(parent).map_or(0, Vec::len)
    }

    fn child(&self, parent: Self::Id, index: usize) -> Option<Self::Id> {
        self.children.get(parent)?.get(index).copied()
    }

    fn contains(&self, id: Self::Id) -> bool {
        id < self.children.len()
    }
}

struct Label;

impl TreeLabelProvider<Model> for Label {
    fn label_parts<'a>(&'a self, model: &'a Model, id: usize) -> TreeLabelPrefix<'a> {
        TreeLabelPrefix::new(model.names[id])
    }
}

fn main() {
    // The tree owns the model and keeps expansion/selection across frames.
    let mut tree = Tree::new(Model::new());
    // Selecting a hidden path expands its ancestors first.
    if let Some(alpha_1) = TreePath::from_nodes([0, 1, 2]) {
        tree.set_selection_path(&alpha_1);
    }

    // Render into an in-memory buffer (no terminal required for the example).
    let area = Rect::new(0, 0, 40, 8);
    let mut buffer = Buffer::empty(area);
    TreeView::<Model, _>::new(&Label).render(area, &mut buffer, &mut tree);

    for y in area.top()..area.bottom() {
        let line: String = (area.left()..area.right())
            .map(|x| buffer.cell((x, y)).map_or(" ", |cell| cell.symbol()))
            .collect();
        println!("{line}");
    }
}
