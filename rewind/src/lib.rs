//! rewind: undo/redo for graphs of tracked objects.
//!
//! Objects opt in by implementing [`Trackable`] (usually through
//! [`trackable!`]) and holding their state in [`Tracked`] or [`TrackedMap`]
//! members. An [`UndoRedo`] session records those members on `save` and
//! writes historical values back on `undo` and `redo`.
//!
//! ```ignore
//! let doc = Rc::new(Document::new("untitled"));
//! let mut history = UndoRedo::new();
//! history.add(doc.clone())?;
//!
//! doc.title.set("draft".into());
//! history.save()?;
//! history.undo(None)?;
//! assert_eq!(doc.title.get(), "untitled");
//! ```

pub mod config;
pub mod error;
pub mod session;
pub mod track;
pub mod tracked;

pub use config::{HistoryConfig, TrackingConfig, TrackingRegistry};
pub use error::UndoRedoError;
pub use session::{Scope, SessionId, UndoRedo};
pub use track::{Depth, FieldVisitor, Member, Trackable, TrackedValue, Tracker, VisitMode};
pub use tracked::{Tracked, TrackedMap, TrackedSet};

pub use rewind_core::{HistoryError, SameValue, Slot, MIN_HISTORY_SIZE};
