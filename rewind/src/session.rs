//! The undo/redo session.
//!
//! A session owns one [`MasterIndex`] and a list of root objects. Every
//! operation is one traversal: it validates its arguments, moves the master
//! index, then visits the roots (or an explicit [`Scope`]) so that each
//! member saves, loads or collapses its value.

use std::fmt;
use std::rc::Rc;

use rewind_core::MasterIndex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::track::{visit, Depth, VisitContext, VisitMode};
use crate::{HistoryConfig, Trackable, TrackingRegistry, UndoRedoError};

/// Identity of a session; tracked objects remember the session that first
/// reached them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Restricts an operation to some objects of the session.
///
/// Deep targets are visited with their whole subgraph, shallow targets down
/// to a number of levels. An empty scope means every root, deeply. Targets
/// must already be tracked by the session.
#[derive(Clone, Default)]
pub struct Scope {
    deep: Vec<Rc<dyn Trackable>>,
    shallow: Vec<(Rc<dyn Trackable>, usize)>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deep(mut self, target: Rc<dyn Trackable>) -> Self {
        self.deep.push(target);
        self
    }

    /// Visit `target` and its children down to `depth` levels.
    pub fn shallow(mut self, target: Rc<dyn Trackable>, depth: usize) -> Self {
        self.shallow.push((target, depth));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.deep.is_empty() && self.shallow.is_empty()
    }

    fn targets(&self) -> impl Iterator<Item = &Rc<dyn Trackable>> {
        self.deep.iter().chain(self.shallow.iter().map(|(target, _)| target))
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("deep", &self.deep.len())
            .field(
                "shallow",
                &self.shallow.iter().map(|(_, depth)| *depth).collect::<Vec<_>>(),
            )
            .finish()
    }
}

fn same_object(a: &Rc<dyn Trackable>, b: &Rc<dyn Trackable>) -> bool {
    std::ptr::eq(Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ())
}

/// Undo/redo over a set of root objects and everything they reach.
pub struct UndoRedo {
    id: SessionId,
    master: MasterIndex,
    roots: Vec<Rc<dyn Trackable>>,
    registry: TrackingRegistry,
    config: HistoryConfig,
    action: u64,
    ignited: bool,
}

impl Default for UndoRedo {
    fn default() -> Self {
        Self::new()
    }
}

impl UndoRedo {
    pub fn new() -> Self {
        let id = SessionId::new();
        debug!(session = %id, "session created");
        Self {
            id,
            master: MasterIndex::new(),
            roots: Vec::new(),
            registry: TrackingRegistry::default(),
            config: HistoryConfig::default(),
            action: 0,
            ignited: false,
        }
    }

    pub fn with_config(config: HistoryConfig) -> Result<Self, UndoRedoError> {
        config.validate()?;
        let mut session = Self::new();
        session.master.set_max_history_size(config.max_history_size)?;
        session.config = config;
        Ok(session)
    }

    /// Use `registry` to look up per-type tracking configuration.
    pub fn with_registry(mut self, registry: TrackingRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    pub fn root_count(&self) -> usize {
        self.roots.len()
    }

    /// Register `root` and record its current values. Returns the current
    /// index.
    pub fn add(&mut self, root: Rc<dyn Trackable>) -> Result<usize, UndoRedoError> {
        self.add_with(root, self.config.replace_last_state_on_add)
    }

    /// Like [`add`](Self::add). With `replace_last_state` the values land in
    /// the current step, otherwise a new step is opened if anything is
    /// recorded. The first registration always records into index 0.
    pub fn add_with(
        &mut self,
        root: Rc<dyn Trackable>,
        replace_last_state: bool,
    ) -> Result<usize, UndoRedoError> {
        self.register(vec![root], replace_last_state)
    }

    /// Register several roots in a single step.
    pub fn multi_add(
        &mut self,
        roots: impl IntoIterator<Item = Rc<dyn Trackable>>,
    ) -> Result<usize, UndoRedoError> {
        let replace = self.config.replace_last_state_on_add;
        self.register(roots.into_iter().collect(), replace)
    }

    fn register(
        &mut self,
        roots: Vec<Rc<dyn Trackable>>,
        replace_last_state: bool,
    ) -> Result<usize, UndoRedoError> {
        for root in &roots {
            if let Some(owner) = root.tracker().session() {
                if owner != self.id {
                    warn!(%owner, session = %self.id, "root belongs to another session");
                    return Err(UndoRedoError::Conflict {
                        owner,
                        session: self.id,
                    });
                }
            }
        }

        let mut added = Vec::new();
        for root in roots {
            let known = self
                .roots
                .iter()
                .chain(added.iter())
                .any(|r| same_object(r, &root));
            if !known {
                added.push(root);
            }
        }

        let scope = added.iter().fold(Scope::new(), |scope, root| scope.deep(root.clone()));
        if !scope.is_empty() {
            self.check_ownership(&scope)?;
        }

        if !self.ignited {
            self.master.init();
            self.master.load_init();
            self.ignited = true;
        } else if replace_last_state {
            self.master.load_init();
        } else {
            self.master.save_init();
        }

        self.roots.extend(added);
        if !scope.is_empty() {
            self.run(VisitMode::Save, &scope)?;
        }
        info!(
            session = %self.id,
            roots = self.roots.len(),
            index = self.master.current_index(),
            "roots registered"
        );
        Ok(self.master.current_index())
    }

    /// Commit every change since the last boundary as one step. Returns the
    /// current index, unchanged when nothing was modified.
    pub fn save(&mut self) -> Result<usize, UndoRedoError> {
        self.save_scoped(&Scope::new())
    }

    pub fn save_scoped(&mut self, scope: &Scope) -> Result<usize, UndoRedoError> {
        self.check_scope(scope)?;
        self.check_ownership(scope)?;
        self.master.save_init();
        let recorded = self.run(VisitMode::Save, scope)?;
        debug!(index = self.master.current_index(), recorded, "save");
        Ok(self.master.current_index())
    }

    /// Go back to `target` (default: the previous step) and reload values.
    pub fn undo(&mut self, target: Option<usize>) -> Result<usize, UndoRedoError> {
        self.undo_scoped(target, &Scope::new())
    }

    pub fn undo_scoped(
        &mut self,
        target: Option<usize>,
        scope: &Scope,
    ) -> Result<usize, UndoRedoError> {
        self.check_scope(scope)?;
        self.check_ownership(scope)?;
        self.master.undo(target)?;
        self.run(VisitMode::Load, scope)?;
        Ok(self.master.current_index())
    }

    /// Go forward to `target` (default: the next step) and reload values.
    pub fn redo(&mut self, target: Option<usize>) -> Result<usize, UndoRedoError> {
        self.redo_scoped(target, &Scope::new())
    }

    pub fn redo_scoped(
        &mut self,
        target: Option<usize>,
        scope: &Scope,
    ) -> Result<usize, UndoRedoError> {
        self.check_scope(scope)?;
        self.check_ownership(scope)?;
        self.master.redo(target)?;
        self.run(VisitMode::Load, scope)?;
        Ok(self.master.current_index())
    }

    /// Merge every step after `target` into `target`, keeping the live
    /// values. The redo future is discarded.
    pub fn collapse(&mut self, target: usize) -> Result<usize, UndoRedoError> {
        self.collapse_scoped(target, &Scope::new())
    }

    pub fn collapse_scoped(&mut self, target: usize, scope: &Scope) -> Result<usize, UndoRedoError> {
        self.check_scope(scope)?;
        self.check_ownership(scope)?;
        self.master.begin_collapse(target)?;
        self.run(VisitMode::Collapse, scope)?;
        Ok(self.master.current_index())
    }

    pub fn current_index(&self) -> usize {
        self.master.current_index()
    }

    pub fn min_index(&self) -> usize {
        self.master.min_index()
    }

    pub fn max_index(&self) -> usize {
        self.master.max_index()
    }

    pub fn undo_possible(&self) -> bool {
        self.master.undo_possible()
    }

    pub fn redo_possible(&self) -> bool {
        self.master.redo_possible()
    }

    pub fn max_redo_possible(&self) -> usize {
        self.master.max_redo_possible()
    }

    pub fn max_history_size(&self) -> usize {
        self.master.max_history_size()
    }

    /// `0` keeps everything; otherwise at least
    /// [`MIN_HISTORY_SIZE`](rewind_core::MIN_HISTORY_SIZE) steps.
    pub fn set_max_history_size(&mut self, size: usize) -> Result<(), UndoRedoError> {
        self.master.set_max_history_size(size)?;
        self.config.max_history_size = size;
        Ok(())
    }

    /// Drop the ability to undo before `older_than`.
    pub fn clear_history(&mut self, older_than: usize) -> Result<(), UndoRedoError> {
        self.master.clear_history(older_than)?;
        Ok(())
    }

    fn check_scope(&self, scope: &Scope) -> Result<(), UndoRedoError> {
        for target in scope.targets() {
            match target.tracker().session() {
                Some(owner) if owner == self.id => {}
                Some(owner) => {
                    warn!(%owner, session = %self.id, "scope target belongs to another session");
                    return Err(UndoRedoError::Conflict {
                        owner,
                        session: self.id,
                    });
                }
                None => {
                    warn!(session = %self.id, "scope target is not tracked");
                    return Err(UndoRedoError::invalid(
                        "target is not tracked by this session, add it or one of its parents first",
                    ));
                }
            }
        }
        Ok(())
    }

    /// Walk what a traversal over `scope` would reach and fail with
    /// `Conflict` before anything is written if another session owns any of
    /// it.
    fn check_ownership(&mut self, scope: &Scope) -> Result<(), UndoRedoError> {
        self.run(VisitMode::Check, scope)?;
        Ok(())
    }

    /// One traversal in `mode`. Returns the number of members recorded.
    fn run(&mut self, mode: VisitMode, scope: &Scope) -> Result<usize, UndoRedoError> {
        self.action += 1;
        let mut cx = VisitContext {
            mode,
            master: &mut self.master,
            session: self.id,
            action: self.action,
            registry: &self.registry,
            recorded: 0,
        };

        if scope.is_empty() {
            for root in &self.roots {
                visit(root.as_ref(), &mut cx, Depth::Unbounded)?;
            }
        } else {
            for target in &scope.deep {
                visit(target.as_ref(), &mut cx, Depth::Unbounded)?;
            }
            let mut shallow: Vec<_> = scope.shallow.iter().collect();
            shallow.sort_by(|a, b| b.1.cmp(&a.1));
            for (target, depth) in shallow {
                visit(target.as_ref(), &mut cx, Depth::Levels(*depth))?;
            }
        }
        Ok(cx.recorded)
    }
}

impl fmt::Debug for UndoRedo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UndoRedo")
            .field("id", &self.id)
            .field("master", &self.master)
            .field("roots", &self.roots.len())
            .field("config", &self.config)
            .finish()
    }
}
