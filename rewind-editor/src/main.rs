//! rewind-editor: scripted editing session showing undo, redo, branching,
//! squashing and history retention on a layered canvas.
//!
//! Usage: `rewind-editor [settings.json]`. Set `RUST_LOG=debug` (or `trace`)
//! to follow what the history engine does.

mod editor;

use std::fs;
use std::path::Path;
use std::rc::Rc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use editor::{Brush, Canvas, Color, EditorSettings, Eraser, Fill, History, Tool};

fn load_settings(path: &Path) -> Result<EditorSettings> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading settings from {}", path.display()))?;
    let settings: EditorSettings = serde_json::from_str(&data)
        .with_context(|| format!("parsing settings in {}", path.display()))?;
    settings
        .validate()
        .with_context(|| format!("invalid settings in {}", path.display()))?;
    Ok(settings)
}

fn print_state(history: &History) {
    let canvas = history.canvas();
    let layers: Vec<String> = canvas
        .layers()
        .iter()
        .map(|l| format!("{}({})", l.name.get(), l.painted_pixels()))
        .collect();
    let tags: Vec<String> = canvas
        .tags
        .to_vec()
        .into_iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect();
    println!(
        "[{}] {:<14} title={:?} layers=[{}] tags=[{}]",
        history.current_index(),
        history.current_label(),
        canvas.title.get(),
        layers.join(", "),
        tags.join(", ")
    );
}

fn run(settings: EditorSettings) -> Result<()> {
    let size = settings.canvas_size;
    let canvas = Rc::new(Canvas::new("untitled", size, size, Color::WHITE));
    let mut history = History::new(canvas.clone(), settings.history)?;
    print_state(&history);

    let sketch = canvas.add_layer("sketch");
    canvas.tags.insert("status".into(), "draft".into());
    history.commit("add sketch")?;
    print_state(&history);

    let brush = Brush::new(3, Color::BLACK);
    brush.apply(&canvas, &sketch, size / 2, size / 2);
    history.commit(brush.name())?;
    print_state(&history);

    let color = canvas.add_layer("color");
    Fill::new(Color::RED).apply(&canvas, &color, 0, 0);
    history.commit("fill color")?;
    print_state(&history);

    history.undo()?;
    history.undo()?;
    print_state(&history);
    history.redo()?;
    print_state(&history);

    // a new edit here drops "fill color" for good
    Eraser::new(1).apply(&canvas, &sketch, size / 2, size / 2);
    canvas.title.set("portrait".into());
    history.commit("erase + rename")?;
    print_state(&history);
    info!(redo = history.redo_possible(), "after branch");

    for i in 0..4 {
        Brush::new(1, Color::BLUE).apply(&canvas, &sketch, i, 0);
        history.commit(&format!("dot {i}"))?;
    }
    print_state(&history);

    let before_dots = history.current_index() - 4;
    history.squash_since(before_dots + 1, "dots")?;
    canvas.tags.insert("status".into(), "final".into());
    history.commit("finalize")?;
    print_state(&history);

    let scratch = canvas.add_layer("scratch");
    Fill::new(Color::BLUE).apply(&canvas, &scratch, 0, 0);
    history.commit("scratch layer")?;
    if let Some(layer) = canvas.layer("sketch") {
        layer.opacity.set(0.5);
    }
    canvas.remove_layer("scratch");
    history.commit("drop scratch")?;
    print_state(&history);
    println!("composite at (0, 0): {:?}", canvas.composite(0, 0));

    history.undo()?;
    print_state(&history);
    println!("composite at (0, 0): {:?}", canvas.composite(0, 0));

    while history.undo_possible() {
        history.undo()?;
    }
    print_state(&history);

    println!("reachable steps:");
    for (index, label) in history.steps() {
        println!("  {index:>3} {label}");
    }
    let session = history.session();
    println!(
        "min={} current={} max={} limit={}",
        session.min_index(),
        session.current_index(),
        session.max_index(),
        session.max_history_size()
    );
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = match std::env::args().nth(1) {
        Some(path) => load_settings(Path::new(&path))?,
        None => EditorSettings::default(),
    };
    info!(?settings, "settings loaded");
    run(settings)
}
