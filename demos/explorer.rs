// Filesystem explorer: key handling, vetoed expansion, model edits and snapshots.
use std::cell::RefCell;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::layout::{Constraint, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::Paragraph;
use ratatui::{DefaultTerminal, Frame};
use rustc_hash::FxHashSet;

use tui_treeview::{
    DefaultTreeModel, ExpandDecision, ExpansionEvent, ExpansionKind, NodeId, Tree, TreeEvent,
    TreeModel, TreeSnapshot, TreeView, TreeViewStyle, ValueLabel,
};

type Model = DefaultTreeModel<String>;

struct DemoArgs {
    root: PathBuf,
    max_depth: usize,
}

impl DemoArgs {
    fn usage() {
        eprintln!("Usage: explorer [PATH] [DEPTH]");
        eprintln!("  PATH   Root directory (default: current dir)");
        eprintln!("  DEPTH  Max depth from root (default: 3)");
    }

    fn parse() -> Self {
        let mut path: Option<PathBuf> = None;
        let mut depth: Option<usize> = None;

        for arg in env::args().skip(1) {
            match arg.as_str() {
                "-h" | "--help" => {
                    Self::usage();
                    std::process::exit(0);
                }
                _ if path.is_none() => path = Some(PathBuf::from(arg)),
                _ => depth = arg.parse().ok(),
            }
        }

        let root =
            path.unwrap_or_else(|| env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
        Self {
            root,
            max_depth: depth.unwrap_or(3),
        }
    }
}

// Directories that could not be read; expanding them is vetoed.
type Locked = Rc<RefCell<FxHashSet<NodeId>>>;

fn build_model(root: &Path, max_depth: usize, locked: &Locked) -> Model {
    let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    let mut model = DefaultTreeModel::new(root.display().to_string());
    if let Some(root_id) = model.root() {
        build_children(&mut model, root_id, &root, 0, max_depth, locked);
    }
    model
}

fn build_children(
    model: &mut Model,
    parent: NodeId,
    path: &Path,
    depth: usize,
    max_depth: usize,
    locked: &Locked,
) {
    if depth >= max_depth {
        return;
    }
    let mut entries: Vec<(bool, String, PathBuf)> = match fs::read_dir(path) {
        Ok(read_dir) => read_dir
            .filter_map(Result::ok)
            .map(|entry| {
                let is_dir = entry.file_type().is_ok_and(|kind| kind.is_dir());
                let name = entry.file_name().to_string_lossy().to_string();
                (is_dir, name, entry.path())
            })
            .collect(),
        Err(_) => {
            // Keep a placeholder child so the node still shows an expander.
            if model.append(parent, "(unreadable)".to_string()).is_ok() {
                locked.borrow_mut().insert(parent);
            }
            return;
        }
    };
    // Directories first, then by name.
    entries.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

    for (is_dir, name, path) in entries {
        let Ok(id) = model.append(parent, name) else {
            continue;
        };
        if is_dir {
            build_children(model, id, &path, depth + 1, max_depth, locked);
        }
    }
}

struct App {
    tree: Tree<Model>,
    locked: Locked,
    snapshot: Option<TreeSnapshot>,
    status: Rc<RefCell<String>>,
    created: usize,
}

impl App {
    fn new(model: Model, locked: Locked) -> Self {
        let mut tree = Tree::new(model);
        let status = Rc::new(RefCell::new(String::from(
            "q quit | a add | x delete | s snapshot | r restore",
        )));

        let vetoed = Rc::clone(&locked);
        let veto_status = Rc::clone(&status);
        tree.add_tree_will_expand_listener(Box::new(move |event: &ExpansionEvent<'_, NodeId>| {
            if event.kind == ExpansionKind::WillExpand && vetoed.borrow().contains(&event.path.last())
            {
                *veto_status.borrow_mut() = format!("expansion of {} vetoed", event.path);
                return ExpandDecision::Veto;
            }
            ExpandDecision::Allow
        }));

        if let Some(first) = tree.path_for_row(0) {
            tree.set_selection_path(&first);
            tree.set_lead_selection_path(Some(first));
        }
        Self {
            tree,
            locked,
            snapshot: None,
            status,
            created: 0,
        }
    }

    fn set_status(&self, status: impl Into<String>) {
        *self.status.borrow_mut() = status.into();
    }

    fn add_child(&mut self) {
        let Some(lead) = self.tree.lead_selection_path().cloned() else {
            return;
        };
        self.created += 1;
        let name = format!("new-node-{}", self.created);
        let added = self
            .tree
            .edit_model(|model| model.append(lead.last(), name));
        match added {
            Ok(id) => {
                let path = lead.child(id);
                self.tree.set_selection_path(&path);
                self.tree.set_lead_selection_path(Some(path));
            }
            Err(err) => self.set_status(err.to_string()),
        }
    }

    fn delete_lead(&mut self) {
        let Some(lead) = self.tree.lead_selection_path().cloned() else {
            return;
        };
        let removed = self.tree.edit_model(|model| model.remove(lead.last()));
        match removed {
            Ok(name) => {
                self.locked.borrow_mut().remove(&lead.last());
                if let Some(parent) = lead.parent() {
                    self.tree.set_selection_path(&parent);
                    self.tree.set_lead_selection_path(Some(parent));
                }
                self.set_status(format!("deleted {name}"));
            }
            Err(err) => self.set_status(err.to_string()),
        }
    }

    fn handle_key(&mut self, code: KeyCode, key: event::KeyEvent) -> bool {
        match code {
            KeyCode::Char('q') => return false,
            KeyCode::Char('a') => self.add_child(),
            KeyCode::Char('x') => self.delete_lead(),
            KeyCode::Char('s') => {
                let snapshot = self.tree.snapshot();
                self.set_status(format!(
                    "snapshot: {} expanded, {} selected",
                    snapshot.expanded.len(),
                    snapshot.selected.len()
                ));
                self.snapshot = Some(snapshot);
            }
            KeyCode::Char('r') => match self.snapshot.as_ref().map(|s| self.tree.restore(s)) {
                Some(Ok(())) => self.set_status("snapshot restored"),
                Some(Err(err)) => self.set_status(err.to_string()),
                None => self.set_status("no snapshot yet"),
            },
            _ => {
                if let TreeEvent::Unhandled = self.tree.handle_key(key) {
                    self.set_status(format!("unbound key {code}"));
                }
            }
        }
        true
    }
}

fn render(frame: &mut Frame, app: &mut App, style: &TreeViewStyle<'_>) {
    let [tree_area, status_area] =
        Layout::vertical([Constraint::Fill(1), Constraint::Length(1)]).areas(frame.area());
    let widget = TreeView::<Model, _>::new(&ValueLabel).style(style.clone());
    frame.render_stateful_widget(widget, tree_area, &mut app.tree);
    frame.render_widget(Paragraph::new(app.status.borrow().as_str()), status_area);
}

fn run_app(mut terminal: DefaultTerminal, mut app: App, style: &TreeViewStyle<'_>) -> io::Result<()> {
    loop {
        terminal.draw(|frame| render(frame, &mut app, style))?;

        if event::poll(Duration::from_millis(200))?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
            && !app.handle_key(key.code, key)
        {
            break;
        }
    }
    Ok(())
}

fn main() -> io::Result<()> {
    let args = DemoArgs::parse();
    if !args.root.is_dir() {
        eprintln!("Path is not a directory: {}", args.root.display());
        return Ok(());
    }

    let locked = Locked::default();
    let model = build_model(&args.root, args.max_depth, &locked);
    let app = App::new(model, locked);

    let style = TreeViewStyle {
        title: Some(Line::from(format!(
            "{} (depth {})",
            args.root.display(),
            args.max_depth
        ))),
        block_style: Style::default()
            .fg(Color::Rgb(221, 227, 235))
            .bg(Color::Rgb(24, 28, 36)),
        border_style: Style::default().fg(Color::Rgb(92, 110, 140)),
        line_style: Style::default().fg(Color::Rgb(86, 98, 120)),
        selected_style: Style::default()
            .fg(Color::Rgb(255, 255, 255))
            .bg(Color::Rgb(52, 66, 96)),
        lead_style: Style::default().add_modifier(Modifier::BOLD),
        ..TreeViewStyle::default()
    };

    let terminal = ratatui::init();
    let result = run_app(terminal, app, &style);
    ratatui::restore();
    result
}
