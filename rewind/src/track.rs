//! The contract between tracked objects and a session.
//!
//! A session never inspects objects by itself. Each trackable type lists its
//! members to a [`FieldVisitor`], and each member knows how to push its value
//! into its history (save), pull the value back (load) or squash it into the
//! current step (collapse). Children reachable through member values are
//! visited recursively, at most once per traversal.

use std::any::TypeId;
use std::cell::Cell;
use std::rc::Rc;

use rewind_core::{MasterIndex, SameValue};

use crate::config::TrackingConfig;
use crate::{SessionId, TrackingRegistry, UndoRedoError};

/// What a traversal does to every member it reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitMode {
    Save,
    Load,
    Collapse,
    /// Ownership walk ahead of a mutating traversal. Members are left alone
    /// and unbound objects stay unbound.
    Check,
}

/// How far below a target a traversal may go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    Unbounded,
    /// `Levels(0)` visits the target itself and none of its children.
    Levels(usize),
}

impl Depth {
    /// Depth granted to children, `None` once exhausted.
    pub fn descend(self) -> Option<Depth> {
        match self {
            Depth::Unbounded => Some(Depth::Unbounded),
            Depth::Levels(0) => None,
            Depth::Levels(n) => Some(Depth::Levels(n - 1)),
        }
    }
}

/// An object whose members are recorded by a session.
///
/// Use [`trackable!`](crate::trackable) for the common case; implement it by
/// hand to add an [`after_load`](Trackable::after_load) hook.
pub trait Trackable: 'static {
    fn tracker(&self) -> &Tracker;

    /// Key under which this type's [`TrackingConfig`] is registered.
    fn type_key(&self) -> TypeId {
        TypeId::of::<Self>()
    }

    /// Report every member, by name, to `fields`.
    fn visit_fields(&self, fields: &mut FieldVisitor<'_, '_>) -> Result<(), UndoRedoError>;

    /// Called once the object's members were reloaded by an undo or redo.
    fn after_load(&self) {}
}

/// Per-instance bookkeeping: which session owns the object and which
/// traversal last reached it.
#[derive(Debug, Default)]
pub struct Tracker {
    session: Cell<Option<SessionId>>,
    last_action: Cell<Option<u64>>,
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> Option<SessionId> {
        self.session.get()
    }

    /// Bind to `session` and mark the traversal `action`. Returns `false` if
    /// that traversal already went through this object. A `Check` traversal
    /// marks without binding.
    pub(crate) fn enter(
        &self,
        session: SessionId,
        action: u64,
        mode: VisitMode,
    ) -> Result<bool, UndoRedoError> {
        match self.session.get() {
            Some(owner) if owner != session => {
                tracing::error!(%owner, %session, "object reached by a second session");
                return Err(UndoRedoError::Conflict { owner, session });
            }
            Some(_) => {}
            None if mode == VisitMode::Check => {}
            None => self.session.set(Some(session)),
        }
        if self.last_action.get() == Some(action) {
            return Ok(false);
        }
        self.last_action.set(Some(action));
        Ok(true)
    }
}

/// A value that can live inside a tracked member.
///
/// `children` reports the trackable objects reachable through the value so a
/// traversal can descend into them.
pub trait TrackedValue: SameValue + Clone + 'static {
    fn children(&self, _out: &mut Vec<Rc<dyn Trackable>>) {}
}

macro_rules! leaf_values {
    ($($t:ty),* $(,)?) => {
        $( impl TrackedValue for $t {} )*
    };
}

leaf_values!(
    (), bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64,
    String, &'static str,
);

impl<T: TrackedValue> TrackedValue for Option<T> {
    fn children(&self, out: &mut Vec<Rc<dyn Trackable>>) {
        if let Some(value) = self {
            value.children(out);
        }
    }
}

impl<T: TrackedValue> TrackedValue for Vec<T> {
    fn children(&self, out: &mut Vec<Rc<dyn Trackable>>) {
        for value in self {
            value.children(out);
        }
    }
}

impl<T: TrackedValue> TrackedValue for Box<T> {
    fn children(&self, out: &mut Vec<Rc<dyn Trackable>>) {
        (**self).children(out);
    }
}

impl<A: TrackedValue, B: TrackedValue> TrackedValue for (A, B) {
    fn children(&self, out: &mut Vec<Rc<dyn Trackable>>) {
        self.0.children(out);
        self.1.children(out);
    }
}

impl<A: TrackedValue, B: TrackedValue, C: TrackedValue> TrackedValue for (A, B, C) {
    fn children(&self, out: &mut Vec<Rc<dyn Trackable>>) {
        self.0.children(out);
        self.1.children(out);
        self.2.children(out);
    }
}

impl<T: Trackable> TrackedValue for Rc<T> {
    fn children(&self, out: &mut Vec<Rc<dyn Trackable>>) {
        out.push(self.clone());
    }
}

impl TrackedValue for Rc<dyn Trackable> {
    fn children(&self, out: &mut Vec<Rc<dyn Trackable>>) {
        out.push(self.clone());
    }
}

/// Something a trackable object holds and a session records.
pub trait Member {
    /// Push the live value into history; returns whether anything was recorded.
    fn save(&self, master: &mut MasterIndex) -> bool;

    /// Overwrite the live value with the one effective at the master's index.
    fn load(&self, master: &MasterIndex);

    /// Record the live value into the master's current step.
    fn collapse(&self, master: &mut MasterIndex);

    fn children(&self) -> Vec<Rc<dyn Trackable>>;
}

/// State shared by every object reached in one traversal.
pub(crate) struct VisitContext<'a> {
    pub(crate) mode: VisitMode,
    pub(crate) master: &'a mut MasterIndex,
    pub(crate) session: SessionId,
    pub(crate) action: u64,
    pub(crate) registry: &'a TrackingRegistry,
    pub(crate) recorded: usize,
}

/// Receives the members of one object during a traversal.
pub struct FieldVisitor<'v, 'a> {
    cx: &'v mut VisitContext<'a>,
    config: &'a TrackingConfig,
    depth: Depth,
}

impl FieldVisitor<'_, '_> {
    pub fn mode(&self) -> VisitMode {
        self.cx.mode
    }

    /// Record one named member and descend into its children.
    pub fn field(&mut self, name: &str, member: &dyn Member) -> Result<(), UndoRedoError> {
        if !self.config.tracks(name) {
            return Ok(());
        }

        match self.cx.mode {
            VisitMode::Save => {
                if member.save(self.cx.master) {
                    self.cx.recorded += 1;
                    tracing::trace!(field = name, "member saved");
                }
            }
            VisitMode::Load => member.load(self.cx.master),
            VisitMode::Collapse => member.collapse(self.cx.master),
            VisitMode::Check => {}
        }

        if self.config.recurses(name) {
            for child in member.children() {
                self.child(child.as_ref())?;
            }
        }
        Ok(())
    }

    /// Descend into an object that is reachable but not held by a member.
    pub fn child(&mut self, child: &dyn Trackable) -> Result<(), UndoRedoError> {
        match self.depth.descend() {
            Some(depth) => visit(child, self.cx, depth),
            None => Ok(()),
        }
    }
}

/// Run the current traversal over `target` and whatever it reaches.
pub(crate) fn visit(
    target: &dyn Trackable,
    cx: &mut VisitContext<'_>,
    depth: Depth,
) -> Result<(), UndoRedoError> {
    if !target.tracker().enter(cx.session, cx.action, cx.mode)? {
        return Ok(());
    }

    let registry = cx.registry;
    let config = registry.config_for(target.type_key());
    let mode = cx.mode;
    let mut fields = FieldVisitor { cx, config, depth };
    target.visit_fields(&mut fields)?;

    if mode == VisitMode::Load {
        target.after_load();
    }
    Ok(())
}

/// Implement [`Trackable`] for a struct from its tracker field and its
/// member fields.
///
/// ```ignore
/// struct Layer {
///     tracker: Tracker,
///     name: Tracked<String>,
///     opacity: Tracked<f32>,
/// }
/// trackable!(Layer => tracker { name, opacity });
/// ```
#[macro_export]
macro_rules! trackable {
    ($ty:ty => $tracker:ident { $($field:ident),* $(,)? }) => {
        impl $crate::Trackable for $ty {
            fn tracker(&self) -> &$crate::Tracker {
                &self.$tracker
            }

            fn visit_fields(
                &self,
                fields: &mut $crate::FieldVisitor<'_, '_>,
            ) -> ::std::result::Result<(), $crate::UndoRedoError> {
                $( fields.field(stringify!($field), &self.$field)?; )*
                Ok(())
            }
        }
    };
}
