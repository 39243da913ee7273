//! The shared logical clock of a session.
//!
//! The master index only advances once per committed step, however many
//! property writes that step contains. While the state is `Dirty` every write
//! lands on the current index; the first write after a `Clean` boundary opens
//! a new index and, if the session had been rewound, cuts the redo branch.
//!
//! Every opened index gets a fresh [`Stamp`], kept in a bounded step
//! timeline. Revisions carry the stamp of the step that wrote them. Each time
//! a redo branch is erased the master records a [`Cut`]: every revision at or
//! above the cut index written before the cut is dead, even once its index
//! is reached again by the new branch or has left the step timeline.

use tracing::{debug, trace, warn};

use crate::history::Revision;
use crate::{
    BoundedTimeline, Capacity, HistoryError, PropertyHistory, SameValue, Slot, Stamp,
    MIN_HISTORY_SIZE, ORIGIN_STAMP,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Nothing written since the last boundary; the next write opens an index.
    Clean,
    /// Writes land on the current index.
    Dirty,
}

/// Erasure of every step from `index` on. Revisions at `index` or above
/// whose stamp is older than `stamp` belong to the erased branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cut {
    index: usize,
    stamp: Stamp,
}

#[derive(Debug, Clone)]
pub struct MasterIndex {
    current: usize,
    max: usize,
    min: usize,
    state: State,
    steps: BoundedTimeline<Stamp>,
    /// Index and stamp both strictly increase along the list.
    cuts: Vec<Cut>,
    next_stamp: Stamp,
    max_history_size: usize,
}

impl Default for MasterIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl MasterIndex {
    /// A fresh clock pinned at index 0, ready to record initial values there.
    pub fn new() -> Self {
        let mut steps = BoundedTimeline::new(Capacity::Unlimited);
        steps.push(ORIGIN_STAMP);
        Self {
            current: 0,
            max: 0,
            min: 0,
            state: State::Dirty,
            steps,
            cuts: Vec::new(),
            next_stamp: ORIGIN_STAMP + 1,
            max_history_size: 0,
        }
    }

    /// Reset to index 0, keeping the configured history size.
    pub fn init(&mut self) {
        let max_history_size = self.max_history_size;
        *self = Self::new();
        self.max_history_size = max_history_size;
        self.sync_step_capacity();
        debug!("master index pinned to 0");
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn max_index(&self) -> usize {
        self.max
    }

    pub fn min_index(&self) -> usize {
        self.min
    }

    pub fn max_history_size(&self) -> usize {
        self.max_history_size
    }

    pub fn is_dirty(&self) -> bool {
        self.state == State::Dirty
    }

    pub fn undo_possible(&self) -> bool {
        self.current > self.min
    }

    pub fn redo_possible(&self) -> bool {
        self.current < self.max
    }

    pub fn max_redo_possible(&self) -> usize {
        self.max - self.current
    }

    /// Start a transaction: the next write opens a new index.
    pub fn save_init(&mut self) {
        self.state = State::Clean;
    }

    /// Start a transaction that writes into the current index.
    pub fn load_init(&mut self) {
        self.state = State::Dirty;
    }

    /// Move back to `target` (default: one step back, floored at the
    /// retention floor). Valid targets are `[min_index, current_index]`.
    pub fn undo(&mut self, target: Option<usize>) -> Result<usize, HistoryError> {
        let target = target.unwrap_or_else(|| self.current.saturating_sub(1).max(self.min));
        if target < self.min || target > self.current {
            warn!(
                target,
                min = self.min,
                current = self.current,
                "undo target out of range"
            );
            return Err(HistoryError::index(target, self.min, self.current));
        }
        self.current = target;
        self.state = State::Clean;
        debug!(current = self.current, max = self.max, "undo");
        Ok(self.current)
    }

    /// Move forward to `target` (default: one step forward). Valid targets
    /// are `[current_index, max_index]`.
    pub fn redo(&mut self, target: Option<usize>) -> Result<usize, HistoryError> {
        let target = target.unwrap_or(self.current + 1);
        if target < self.current || target > self.max {
            warn!(
                target,
                current = self.current,
                max = self.max,
                "redo target out of range"
            );
            return Err(HistoryError::index(target, self.current, self.max));
        }
        self.current = target.min(self.max);
        self.state = State::Clean;
        debug!(current = self.current, max = self.max, "redo");
        Ok(self.current)
    }

    /// Rewind to `target` and make it the last step, so that properties can
    /// then be collapsed into it. Valid targets are `[min_index, current_index]`.
    pub fn begin_collapse(&mut self, target: usize) -> Result<(), HistoryError> {
        if target < self.min || target > self.current {
            warn!(
                target,
                min = self.min,
                current = self.current,
                "collapse target out of range"
            );
            return Err(HistoryError::index(target, self.min, self.current));
        }
        debug!(target, from = self.current, "collapsing steps");
        if target < self.max {
            self.record_cut(target + 1, self.next_stamp);
        }
        self.current = target;
        self.max = target;
        self.steps.splice(target + 1);
        self.state = State::Clean;
        Ok(())
    }

    /// Limit the number of retained steps. `0` means unlimited; any other
    /// value must be at least [`MIN_HISTORY_SIZE`].
    pub fn set_max_history_size(&mut self, size: usize) -> Result<(), HistoryError> {
        if size != 0 && size < MIN_HISTORY_SIZE {
            warn!(size, "history size below minimum");
            return Err(HistoryError::InvalidParameter {
                reason: format!(
                    "max history size must be 0 (unlimited) or at least {MIN_HISTORY_SIZE}, got {size}"
                ),
            });
        }
        self.max_history_size = size;
        self.apply_retention();
        debug!(size, min = self.min, "max history size set");
        Ok(())
    }

    /// Forget everything older than `older_than`. The floor never moves back.
    pub fn clear_history(&mut self, older_than: usize) -> Result<(), HistoryError> {
        if older_than > self.current {
            warn!(older_than, current = self.current, "clear_history past current index");
            return Err(HistoryError::InvalidParameter {
                reason: format!(
                    "cannot clear history up to {older_than}, current index is {}",
                    self.current
                ),
            });
        }
        self.min = self.min.max(older_than);
        debug!(min = self.min, "history floor moved");
        Ok(())
    }

    /// Position in `log` of the revision effective at the current index.
    pub fn get<V>(&self, log: &PropertyHistory<V>) -> Option<usize> {
        self.position_at(log, self.current)
    }

    /// Position in `log` of the latest live revision at or before `index`.
    pub fn position_at<V>(&self, log: &PropertyHistory<V>, index: usize) -> Option<usize> {
        log.revisions
            .iter()
            .rposition(|revision| revision.index <= index && self.is_live(revision))
    }

    /// Record `value` for `log` at the current index. Returns `false` when the
    /// value equals the one already effective, in which case nothing changes.
    pub fn set<V: SameValue>(&mut self, log: &mut PropertyHistory<V>, value: Slot<V>) -> bool {
        let position = self.get(log);
        let unchanged = match position {
            Some(p) => log.revisions[p].slot.same_value(&value),
            None => !value.is_defined(),
        };
        if unchanged {
            return false;
        }

        log.revisions.truncate(position.map_or(0, |p| p + 1));

        if self.state == State::Clean {
            self.open_step();
        }

        self.write_current(log, value);
        self.trim_prefix(log);
        trace!(index = self.current, revisions = log.revisions.len(), "property recorded");
        true
    }

    /// Record `value` into the current slot of `log`, dropping the revisions
    /// above it. Used after [`begin_collapse`](Self::begin_collapse).
    pub fn collapse<V: SameValue>(&mut self, log: &mut PropertyHistory<V>, value: Slot<V>) {
        let position = self.get(log);
        log.revisions.truncate(position.map_or(0, |p| p + 1));

        let active_matches = log
            .revisions
            .last()
            .is_some_and(|revision| revision.slot.same_value(&value));
        let at_current = log
            .revisions
            .last()
            .is_some_and(|revision| revision.index == self.current);

        if at_current {
            if !active_matches {
                self.write_current(log, value);
            }
        } else if !active_matches {
            let stamp = self.stamp_at(self.current);
            log.revisions.push(Revision {
                index: self.current,
                stamp,
                slot: value,
            });
        }
        self.trim_prefix(log);
        trace!(index = self.current, revisions = log.revisions.len(), "property collapsed");
    }

    /// Write `value` as the revision at the current index. A revision already
    /// there is replaced, or dropped when the previous one holds `value`.
    fn write_current<V: SameValue>(&self, log: &mut PropertyHistory<V>, value: Slot<V>) {
        let stamp = self.stamp_at(self.current);
        let len = log.revisions.len();
        let at_current = log
            .revisions
            .last()
            .is_some_and(|revision| revision.index == self.current);

        if !at_current {
            log.revisions.push(Revision {
                index: self.current,
                stamp,
                slot: value,
            });
        } else if len >= 2 && log.revisions[len - 2].slot.same_value(&value) {
            log.revisions.pop();
        } else if let Some(last) = log.revisions.last_mut() {
            last.slot = value;
            last.stamp = stamp;
        }
    }

    fn open_step(&mut self) {
        if self.current < self.max {
            debug!(
                from = self.current,
                discarded = self.max - self.current,
                "redo branch cut"
            );
            self.steps.splice(self.current + 1);
            self.record_cut(self.current + 1, self.next_stamp);
        }
        self.current += 1;
        self.max = self.current;
        self.state = State::Dirty;

        let stamp = self.next_stamp;
        self.next_stamp += 1;
        let index = self.steps.push(stamp);
        debug_assert_eq!(index, self.current);

        self.apply_retention();
        debug!(index = self.current, min = self.min, "step opened");
    }

    /// Discard the oldest quarter of the window once it outgrows the limit.
    fn apply_retention(&mut self) {
        let size = self.max_history_size;
        if size > 0 && self.current - self.min > size {
            self.min = self.current - (size - size / 4);
            debug!(min = self.min, current = self.current, "history floor raised");
        }
        self.sync_step_capacity();
    }

    /// Keep the step timeline just large enough to cover `[min, max]`.
    fn sync_step_capacity(&mut self) {
        let wanted = match self.max_history_size {
            0 => Capacity::Unlimited,
            size => Capacity::from((size + 1).max(self.max - self.min + 1)),
        };
        if wanted != self.steps.capacity() {
            self.steps.resize(wanted);
        }
    }

    /// Drop revisions made redundant by the retention floor, keeping the
    /// origin and the latest revision at or below the floor.
    fn trim_prefix<V>(&self, log: &mut PropertyHistory<V>) {
        if self.min == 0 {
            return;
        }
        if let Some(keep) = self.position_at(log, self.min) {
            if keep > 1 {
                log.revisions.drain(1..keep);
            }
        }
    }

    fn stamp_at(&self, index: usize) -> Stamp {
        self.steps.get(index).copied().unwrap_or(ORIGIN_STAMP)
    }

    /// A newer cut at or below an older one covers everything it erased, so
    /// the older one is dropped.
    fn record_cut(&mut self, index: usize, stamp: Stamp) {
        self.cuts.retain(|cut| cut.index < index);
        self.cuts.push(Cut { index, stamp });
        trace!(index, stamp, cuts = self.cuts.len(), "branch cut recorded");
    }

    fn is_live<V>(&self, revision: &Revision<V>) -> bool {
        !self
            .cuts
            .iter()
            .any(|cut| cut.index <= revision.index && cut.stamp > revision.stamp)
    }
}
