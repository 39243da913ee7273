// Undo/redo history for the editor, backed by a rewind session.

use std::collections::BTreeMap;
use std::rc::Rc;

use anyhow::{ensure, Context};
use rewind::{HistoryConfig, UndoRedo, UndoRedoError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::canvas::Canvas;

/// Editor settings file. Only the history section is used for now.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorSettings {
    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default = "default_canvas_size")]
    pub canvas_size: u32,
}

/// Largest accepted canvas side, in pixels.
pub const MAX_CANVAS_SIZE: u32 = 4096;

fn default_canvas_size() -> u32 {
    16
}

impl EditorSettings {
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            (1..=MAX_CANVAS_SIZE).contains(&self.canvas_size),
            "canvas_size must be between 1 and {MAX_CANVAS_SIZE}, got {}",
            self.canvas_size
        );
        self.history
            .validate()
            .context("invalid history settings")?;
        Ok(())
    }
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            history: HistoryConfig::default(),
            canvas_size: default_canvas_size(),
        }
    }
}

pub struct History {
    session: UndoRedo,
    canvas: Rc<Canvas>,
    // label of the step that produced each index
    labels: BTreeMap<usize, String>,
}

impl History {
    pub fn new(canvas: Rc<Canvas>, config: HistoryConfig) -> Result<Self, UndoRedoError> {
        let mut session = UndoRedo::with_config(config)?;
        session.add(canvas.clone())?;
        let mut labels = BTreeMap::new();
        labels.insert(0, "open".to_owned());
        info!(session = %session.id(), "history started");
        Ok(Self {
            session,
            canvas,
            labels,
        })
    }

    pub fn canvas(&self) -> &Rc<Canvas> {
        &self.canvas
    }

    /// Record pending edits as one step. Returns false when nothing changed.
    pub fn commit(&mut self, label: &str) -> Result<bool, UndoRedoError> {
        let before = self.session.current_index();
        let index = self.session.save()?;
        if index == before {
            debug!(label, "nothing to commit");
            return Ok(false);
        }
        self.labels.retain(|i, _| *i < index);
        self.labels.insert(index, label.to_owned());
        info!(index, label, "committed");
        Ok(true)
    }

    pub fn undo(&mut self) -> Result<bool, UndoRedoError> {
        if !self.session.undo_possible() {
            debug!("nothing to undo");
            return Ok(false);
        }
        let undone = self.current_label().to_owned();
        let index = self.session.undo(None)?;
        info!(index, undone = %undone, "undo");
        Ok(true)
    }

    pub fn redo(&mut self) -> Result<bool, UndoRedoError> {
        if !self.session.redo_possible() {
            debug!("nothing to redo");
            return Ok(false);
        }
        let index = self.session.redo(None)?;
        info!(index, redone = self.current_label(), "redo");
        Ok(true)
    }

    /// Squash every step after `index` into it, under a new label.
    pub fn squash_since(&mut self, index: usize, label: &str) -> Result<(), UndoRedoError> {
        let index = self.session.collapse(index)?;
        self.labels.retain(|i, _| *i < index);
        self.labels.insert(index, label.to_owned());
        info!(index, label, "steps squashed");
        Ok(())
    }

    pub fn current_index(&self) -> usize {
        self.session.current_index()
    }

    pub fn current_label(&self) -> &str {
        self.labels
            .range(..=self.session.current_index())
            .next_back()
            .map_or("", |(_, label)| label.as_str())
    }

    pub fn undo_possible(&self) -> bool {
        self.session.undo_possible()
    }

    pub fn redo_possible(&self) -> bool {
        self.session.redo_possible()
    }

    pub fn session(&self) -> &UndoRedo {
        &self.session
    }

    /// Labels of the steps still reachable, oldest first.
    pub fn steps(&self) -> Vec<(usize, &str)> {
        let min = self.session.min_index();
        let max = self.session.max_index();
        self.labels
            .range(min..=max)
            .map(|(i, label)| (*i, label.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::canvas::Color;
    use crate::editor::tools::{Brush, Tool};

    fn history() -> History {
        let canvas = Rc::new(Canvas::new("doc", 8, 8, Color::WHITE));
        History::new(canvas, HistoryConfig::default()).unwrap()
    }

    #[test]
    fn test_commit_and_undo_stroke() {
        let mut h = history();
        let layer = h.canvas().add_layer("ink");
        assert!(h.commit("add layer").unwrap());

        Brush::new(1, Color::RED).apply(h.canvas(), &layer, 2, 2);
        assert!(h.commit("stroke").unwrap());
        assert_eq!(h.current_label(), "stroke");

        assert!(h.undo().unwrap());
        assert_eq!(layer.painted_pixels(), 0);
        assert_eq!(h.current_label(), "add layer");

        assert!(h.redo().unwrap());
        assert_eq!(h.canvas().get_pixel(&layer, 2, 2), Some(Color::RED));
        assert!(!h.redo().unwrap());
    }

    #[test]
    fn test_empty_commit() {
        let mut h = history();
        assert!(!h.commit("nothing").unwrap());
        assert!(!h.undo().unwrap());
        assert_eq!(h.steps(), vec![(0, "open")]);
    }

    #[test]
    fn test_branch_drops_labels() {
        let mut h = history();
        h.canvas().title.set("one".into());
        h.commit("rename 1").unwrap();
        h.canvas().title.set("two".into());
        h.commit("rename 2").unwrap();

        h.undo().unwrap();
        h.canvas().title.set("three".into());
        h.commit("rename 3").unwrap();
        assert_eq!(h.steps(), vec![(0, "open"), (1, "rename 1"), (2, "rename 3")]);
    }

    #[test]
    fn test_squash() {
        let mut h = history();
        for title in ["a", "b", "c"] {
            h.canvas().title.set(title.into());
            h.commit(title).unwrap();
        }
        h.squash_since(1, "titles").unwrap();
        assert_eq!(h.steps(), vec![(0, "open"), (1, "titles")]);
        assert_eq!(h.canvas().title.get(), "c");

        h.undo().unwrap();
        assert_eq!(h.canvas().title.get(), "doc");
    }

    #[test]
    fn test_settings_defaults() {
        let settings: EditorSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.canvas_size, 16);
        assert!(settings.history.replace_last_state_on_add);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_settings_reject_oversized_canvas() {
        let settings: EditorSettings =
            serde_json::from_str(r#"{ "canvas_size": 4294967295 }"#).unwrap();
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("canvas_size"));

        let settings: EditorSettings = serde_json::from_str(r#"{ "canvas_size": 0 }"#).unwrap();
        assert!(settings.validate().is_err());

        let settings: EditorSettings =
            serde_json::from_str(r#"{ "history": { "max_history_size": 3 } }"#).unwrap();
        assert!(settings.validate().is_err());
    }
}
