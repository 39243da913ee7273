// Editor module: a layered canvas whose edits go through undo/redo history.

pub mod canvas;
pub mod history;
pub mod tools;

pub use canvas::{Canvas, Color};
pub use history::{EditorSettings, History};
pub use tools::{Brush, Eraser, Fill, Tool};
