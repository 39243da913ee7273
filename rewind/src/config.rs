//! Session and per-type tracking configuration.

use std::any::TypeId;
use std::collections::{BTreeSet, HashMap};

use rewind_core::MIN_HISTORY_SIZE;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Trackable, UndoRedoError};

/// Settings for one undo/redo session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Retained steps; `0` keeps everything.
    #[serde(default)]
    pub max_history_size: usize,

    /// Whether `add` records a new root into the current step instead of
    /// opening a new one.
    #[serde(default = "default_replace_last_state")]
    pub replace_last_state_on_add: bool,
}

fn default_replace_last_state() -> bool {
    true
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_history_size: 0,
            replace_last_state_on_add: default_replace_last_state(),
        }
    }
}

impl HistoryConfig {
    pub fn validate(&self) -> Result<(), UndoRedoError> {
        if self.max_history_size != 0 && self.max_history_size < MIN_HISTORY_SIZE {
            return Err(UndoRedoError::InvalidParameter {
                reason: format!(
                    "max_history_size must be 0 or at least {MIN_HISTORY_SIZE}, got {}",
                    self.max_history_size
                ),
            });
        }
        Ok(())
    }

    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, UndoRedoError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

/// Which members of a type are recorded and which are walked into.
///
/// A derived configuration starts as a copy of its parent's and can only add
/// names to either set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingConfig {
    #[serde(default)]
    do_not_track: BTreeSet<String>,
    #[serde(default)]
    do_not_recurse: BTreeSet<String>,
}

impl TrackingConfig {
    pub const fn new() -> Self {
        Self {
            do_not_track: BTreeSet::new(),
            do_not_recurse: BTreeSet::new(),
        }
    }

    pub fn inherit(parent: &TrackingConfig) -> Self {
        parent.clone()
    }

    /// Skip `field` entirely: neither recorded nor walked into.
    pub fn do_not_track(mut self, field: impl Into<String>) -> Self {
        self.do_not_track.insert(field.into());
        self
    }

    /// Record `field` but do not visit the objects it holds.
    pub fn do_not_recurse(mut self, field: impl Into<String>) -> Self {
        self.do_not_recurse.insert(field.into());
        self
    }

    /// Add every restriction of `other` to this configuration.
    pub fn extend(&mut self, other: &TrackingConfig) {
        self.do_not_track.extend(other.do_not_track.iter().cloned());
        self.do_not_recurse.extend(other.do_not_recurse.iter().cloned());
    }

    pub fn tracks(&self, field: &str) -> bool {
        !self.do_not_track.contains(field)
    }

    pub fn recurses(&self, field: &str) -> bool {
        self.tracks(field) && !self.do_not_recurse.contains(field)
    }
}

static DEFAULT_TRACKING: TrackingConfig = TrackingConfig::new();

/// Tracking configuration per trackable type, handed to a session explicitly.
/// Unregistered types track every member.
#[derive(Debug, Clone, Default)]
pub struct TrackingRegistry {
    configs: HashMap<TypeId, TrackingConfig>,
}

impl TrackingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: Trackable>(&mut self, config: TrackingConfig) -> &mut Self {
        debug!(ty = std::any::type_name::<T>(), ?config, "tracking config registered");
        self.configs.insert(TypeId::of::<T>(), config);
        self
    }

    /// Register `T` with `Parent`'s configuration extended by `extra`.
    pub fn register_derived<T: Trackable, Parent: Trackable>(
        &mut self,
        extra: TrackingConfig,
    ) -> &mut Self {
        let mut config = TrackingConfig::inherit(self.get::<Parent>());
        config.extend(&extra);
        self.register::<T>(config)
    }

    pub fn get<T: Trackable>(&self) -> &TrackingConfig {
        self.config_for(TypeId::of::<T>())
    }

    pub(crate) fn config_for(&self, ty: TypeId) -> &TrackingConfig {
        self.configs.get(&ty).unwrap_or(&DEFAULT_TRACKING)
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}
