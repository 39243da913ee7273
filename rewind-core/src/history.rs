//! Per-property value logs.

use crate::{MasterIndex, SameValue, Slot, Stamp, ORIGIN_STAMP};

/// One recorded value: "from master index `index` on, the property held `slot`".
#[derive(Debug, Clone, PartialEq)]
pub struct Revision<V> {
    pub(crate) index: usize,
    pub(crate) stamp: Stamp,
    pub(crate) slot: Slot<V>,
}

impl<V> Revision<V> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn slot(&self) -> &Slot<V> {
        &self.slot
    }
}

/// The value log of a single tracked property.
///
/// Revisions are ordered by strictly increasing master index. The first one
/// is the origin record: it sits at index 0 and holds `NotDefined` until the
/// property is first written at index 0. Every write goes through the
/// [`MasterIndex`] so that all logs of a session share one timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyHistory<V> {
    pub(crate) revisions: Vec<Revision<V>>,
}

/// A log holding only the origin record.
impl<V> Default for PropertyHistory<V> {
    fn default() -> Self {
        Self {
            revisions: vec![Revision {
                index: 0,
                stamp: ORIGIN_STAMP,
                slot: Slot::NotDefined,
            }],
        }
    }
}

impl<V: SameValue> PropertyHistory<V> {
    /// Create the log and record `value` as of the master's current index.
    pub fn new(master: &mut MasterIndex, value: Slot<V>) -> Self {
        let mut history = Self::default();
        master.set(&mut history, value);
        history
    }

    /// Value effective at the master's current index.
    pub fn get(&self, master: &MasterIndex) -> Slot<&V> {
        self.get_at(master, master.current_index())
    }

    /// Value effective at an arbitrary master index.
    pub fn get_at(&self, master: &MasterIndex, index: usize) -> Slot<&V> {
        match master.position_at(self, index) {
            Some(position) => self.revisions[position].slot.as_ref(),
            None => Slot::NotDefined,
        }
    }

    /// Record `value`; returns whether anything was written.
    pub fn set(&mut self, master: &mut MasterIndex, value: Slot<V>) -> bool {
        master.set(self, value)
    }

    /// Record `value` into the master's current slot without opening a step.
    pub fn collapse(&mut self, master: &mut MasterIndex, value: Slot<V>) {
        master.collapse(self, value);
    }
}

impl<V> PropertyHistory<V> {
    /// Number of retained revisions, origin included.
    pub fn revision_count(&self) -> usize {
        self.revisions.len()
    }

    pub fn revisions(&self) -> impl Iterator<Item = &Revision<V>> + '_ {
        self.revisions.iter()
    }
}
