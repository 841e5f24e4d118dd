use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use tui_treeview::{DefaultTreeModel, NodeId, Tree, TreeLayout, TreeModel, TreePath, TreeUi};

// Four levels of fan-out 12: about 22k nodes.
fn build_tree(fan_out: u32, depth: u32) -> Tree<DefaultTreeModel<u32>> {
    let mut model = DefaultTreeModel::new(0);
    let mut frontier: Vec<NodeId> = model.root().into_iter().collect();
    let mut next = 1;
    for _ in 0..depth {
        let mut level = Vec::with_capacity(frontier.len() * fan_out as usize);
        for &parent in &frontier {
            for _ in 0..fan_out {
                if let Ok(id) = model.append(parent, next) {
                    level.push(id);
                }
                next += 1;
            }
        }
        frontier = level;
    }
    let mut tree = Tree::new(model);
    tree.expand_all();
    tree
}

fn bench_layout_refresh(c: &mut Criterion) {
    let tree = build_tree(12, 4);
    let mut layout = TreeLayout::new();

    c.bench_function("layout_refresh_expanded", |b| {
        b.iter(|| {
            layout.refresh(tree.model(), tree.expansion_state(), tree.options());
            black_box(TreeUi::<DefaultTreeModel<u32>>::row_count(&layout));
        });
    });
}

fn bench_expanded_descendants(c: &mut Criterion) {
    let tree = build_tree(12, 4);
    let Some(root) = tree.model().root().map(TreePath::new) else {
        return;
    };

    c.bench_function("expanded_descendants_root", |b| {
        b.iter(|| black_box(tree.expanded_descendants(&root).count()));
    });
}

fn bench_toggle_root(c: &mut Criterion) {
    let mut tree = build_tree(12, 3);
    let Some(root) = tree.model().root().map(TreePath::new) else {
        return;
    };

    c.bench_function("collapse_expand_root", |b| {
        b.iter(|| {
            black_box(tree.collapse_path(&root));
            black_box(tree.expand_path(&root));
        });
    });
}

criterion_group!(
    perf,
    bench_layout_refresh,
    bench_expanded_descendants,
    bench_toggle_root
);
criterion_main!(perf);
