//! A logically indexed sequence that forgets its oldest entries.
//!
//! Entries are addressed by ever-increasing user indices. Only the window
//! `[min_index, end)` is readable. In bounded mode the backing store is a ring
//! of `capacity` slots; appending past it evicts from the front. In unlimited
//! mode the store is a plain vector offset by `min_index`.

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::HistoryError;

/// How many entries a [`BoundedTimeline`] keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Capacity {
    Unlimited,
    Bounded(NonZeroUsize),
}

impl Capacity {
    pub fn limit(self) -> Option<usize> {
        match self {
            Capacity::Unlimited => None,
            Capacity::Bounded(n) => Some(n.get()),
        }
    }
}

/// `0` means unlimited.
impl From<usize> for Capacity {
    fn from(size: usize) -> Self {
        match NonZeroUsize::new(size) {
            Some(n) => Capacity::Bounded(n),
            None => Capacity::Unlimited,
        }
    }
}

impl TryFrom<i64> for Capacity {
    type Error = HistoryError;

    fn try_from(requested: i64) -> Result<Self, Self::Error> {
        if requested < 0 {
            tracing::error!(requested, "timeline capacity below zero");
            return Err(HistoryError::Size { requested });
        }
        usize::try_from(requested)
            .map(Capacity::from)
            .map_err(|_| HistoryError::Size { requested })
    }
}

impl From<Capacity> for i64 {
    fn from(capacity: Capacity) -> Self {
        capacity
            .limit()
            .map_or(0, |n| i64::try_from(n).unwrap_or(i64::MAX))
    }
}

#[derive(Debug, Clone)]
pub struct BoundedTimeline<T> {
    data: Vec<Option<T>>,
    capacity: Capacity,
    /// inclusive
    min_user_index: usize,
    /// exclusive
    max_user_index: usize,
    /// physical slot holding `min_user_index`
    head: usize,
}

impl<T> BoundedTimeline<T> {
    pub fn new(capacity: Capacity) -> Self {
        Self {
            data: empty_store(capacity),
            capacity,
            min_user_index: 0,
            max_user_index: 0,
            head: 0,
        }
    }

    /// Build from a signed size request, rejecting negative sizes.
    pub fn with_size(size: i64) -> Result<Self, HistoryError> {
        Ok(Self::new(Capacity::try_from(size)?))
    }

    pub fn capacity(&self) -> Capacity {
        self.capacity
    }

    /// Lowest readable index.
    pub fn min_index(&self) -> usize {
        self.min_user_index
    }

    /// Highest readable index, `None` while the window is empty.
    pub fn max_index(&self) -> Option<usize> {
        (self.max_user_index > self.min_user_index).then(|| self.max_user_index - 1)
    }

    /// Index the next append lands on.
    pub fn end_index(&self) -> usize {
        self.max_user_index
    }

    pub fn len(&self) -> usize {
        self.max_user_index - self.min_user_index
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        if index < self.min_user_index || index >= self.max_user_index {
            return None;
        }
        self.data[self.physical(index)].as_ref()
    }

    /// Write `value` at `index`.
    ///
    /// `index` must be inside the window (overwrite) or equal to
    /// [`end_index`](Self::end_index) (append). Appending to a full bounded
    /// timeline evicts the oldest entry.
    pub fn set(&mut self, index: usize, value: T) -> Result<(), HistoryError> {
        if index < self.min_user_index || index > self.max_user_index {
            tracing::error!(
                index,
                min = self.min_user_index,
                end = self.max_user_index,
                "timeline write outside window"
            );
            return Err(HistoryError::index(
                index,
                self.min_user_index,
                self.max_user_index,
            ));
        }
        if index == self.max_user_index {
            self.push(value);
        } else {
            let slot = self.physical(index);
            self.data[slot] = Some(value);
        }
        Ok(())
    }

    /// Append at the end of the window and return the index used.
    pub fn push(&mut self, value: T) -> usize {
        let index = self.max_user_index;
        self.max_user_index += 1;
        match self.capacity {
            Capacity::Unlimited => self.data.push(Some(value)),
            Capacity::Bounded(cap) => {
                let overflow = self.len().saturating_sub(cap.get());
                if overflow > 0 {
                    self.min_user_index += overflow;
                    self.head = (self.head + overflow) % cap.get();
                }
                let slot = self.physical(index);
                self.data[slot] = Some(value);
            }
        }
        index
    }

    /// Drop every entry at or after `start`.
    ///
    /// A `start` below the window empties it and re-anchors it at `start`.
    pub fn splice(&mut self, start: usize) {
        if start >= self.max_user_index {
            return;
        }
        if start <= self.min_user_index {
            self.data = empty_store(self.capacity);
            self.min_user_index = start;
            self.max_user_index = start;
            self.head = 0;
            return;
        }
        match self.capacity {
            Capacity::Unlimited => self.data.truncate(start - self.min_user_index),
            Capacity::Bounded(_) => {
                for index in start..self.max_user_index {
                    let slot = self.physical(index);
                    self.data[slot] = None;
                }
            }
        }
        self.max_user_index = start;
    }

    /// Change the capacity, keeping the most recent entries that still fit.
    pub fn resize(&mut self, capacity: Capacity) {
        let keep_from = match capacity {
            Capacity::Unlimited => self.min_user_index,
            Capacity::Bounded(n) => self
                .min_user_index
                .max(self.max_user_index.saturating_sub(n.get())),
        };

        let mut kept = Vec::with_capacity(self.max_user_index - keep_from);
        for index in keep_from..self.max_user_index {
            let slot = self.physical(index);
            kept.push(self.data[slot].take());
        }

        if let Capacity::Bounded(n) = capacity {
            kept.resize_with(n.get(), || None);
        }

        tracing::trace!(
            from = ?self.capacity,
            to = ?capacity,
            dropped = keep_from - self.min_user_index,
            "timeline resized"
        );

        self.data = kept;
        self.capacity = capacity;
        self.min_user_index = keep_from;
        self.head = 0;
    }

    /// Readable entries in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        (self.min_user_index..self.max_user_index)
            .filter_map(move |index| self.get(index).map(|value| (index, value)))
    }

    fn physical(&self, index: usize) -> usize {
        let offset = index - self.min_user_index + self.head;
        match self.capacity {
            Capacity::Unlimited => offset,
            Capacity::Bounded(cap) => offset % cap.get(),
        }
    }
}

impl<T> Default for BoundedTimeline<T> {
    fn default() -> Self {
        Self::new(Capacity::Unlimited)
    }
}

fn empty_store<T>(capacity: Capacity) -> Vec<Option<T>> {
    match capacity {
        Capacity::Unlimited => Vec::new(),
        Capacity::Bounded(n) => std::iter::repeat_with(|| None).take(n.get()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(capacity: usize, values: &[&'static str]) -> BoundedTimeline<&'static str> {
        let mut timeline = BoundedTimeline::new(Capacity::from(capacity));
        for (index, value) in values.iter().enumerate() {
            timeline.set(index, *value).unwrap();
        }
        timeline
    }

    #[test]
    fn test_max_size_reached() {
        let timeline = filled(2, &["A", "B", "C"]);
        assert_eq!(timeline.min_index(), 1);
        assert_eq!(timeline.max_index(), Some(2));
        assert_eq!(timeline.get(0), None);
        assert_eq!(timeline.get(1), Some(&"B"));
        assert_eq!(timeline.get(2), Some(&"C"));
        assert_eq!(timeline.get(3), None);
    }

    #[test]
    fn test_max_size_not_reached() {
        let timeline = filled(3, &["A", "B", "C"]);
        assert_eq!(timeline.min_index(), 0);
        assert_eq!(timeline.max_index(), Some(2));
        assert_eq!(timeline.get(0), Some(&"A"));
    }

    #[test]
    fn test_gap_rejected() {
        let mut timeline = BoundedTimeline::new(Capacity::from(2));
        timeline.set(0, "A").unwrap();
        let err = timeline.set(2, "C").unwrap_err();
        assert!(matches!(err, HistoryError::Index { index: 2, .. }));
        assert_eq!(timeline.max_index(), Some(0));
    }

    #[test]
    fn test_evicted_index_rejected() {
        let mut timeline = filled(2, &["A", "B", "C"]);
        assert!(timeline.set(0, "Z").is_err());
        timeline.set(1, "b").unwrap();
        assert_eq!(timeline.get(1), Some(&"b"));
        assert_eq!(timeline.min_index(), 1);
    }

    #[test]
    fn test_negative_size_rejected() {
        let err = BoundedTimeline::<u8>::with_size(-1).unwrap_err();
        assert_eq!(err, HistoryError::Size { requested: -1 });
        assert_eq!(Capacity::try_from(0i64).unwrap(), Capacity::Unlimited);
    }

    #[test]
    fn test_resize_grow_then_shrink() {
        let mut timeline = filled(2, &["A", "B", "C"]);

        timeline.resize(Capacity::from(3));
        assert_eq!(timeline.min_index(), 1);
        assert_eq!(timeline.max_index(), Some(2));
        assert_eq!(timeline.get(0), None);
        assert_eq!(timeline.get(1), Some(&"B"));
        assert_eq!(timeline.get(2), Some(&"C"));

        timeline.resize(Capacity::from(1));
        assert_eq!(timeline.min_index(), 2);
        assert_eq!(timeline.max_index(), Some(2));
        assert_eq!(timeline.get(1), None);
        assert_eq!(timeline.get(2), Some(&"C"));

        timeline.set(3, "D").unwrap();
        assert_eq!(timeline.min_index(), 3);
        assert_eq!(timeline.max_index(), Some(3));
        assert_eq!(timeline.get(2), None);
        assert_eq!(timeline.get(3), Some(&"D"));
    }

    #[test]
    fn test_grow_then_append() {
        let mut timeline = filled(2, &["A", "B", "C"]);
        timeline.resize(Capacity::from(3));
        timeline.set(3, "D").unwrap();
        assert_eq!(timeline.min_index(), 1);
        assert_eq!(timeline.get(1), Some(&"B"));
        assert_eq!(timeline.get(3), Some(&"D"));
        assert_eq!(timeline.get(5), None);
    }

    #[test]
    fn test_resize_to_unlimited_keeps_window() {
        let mut timeline = filled(2, &["A", "B", "C"]);
        timeline.resize(Capacity::Unlimited);
        for (index, value) in ["D", "E", "F"].into_iter().enumerate() {
            timeline.set(index + 3, value).unwrap();
        }
        assert_eq!(timeline.min_index(), 1);
        assert_eq!(timeline.len(), 5);
        assert_eq!(
            timeline.iter().map(|(_, v)| *v).collect::<Vec<_>>(),
            vec!["B", "C", "D", "E", "F"]
        );
    }

    #[test]
    fn test_splice_cuts_future() {
        let mut timeline = filled(0, &["A", "B", "C", "D"]);
        timeline.splice(2);
        assert_eq!(timeline.max_index(), Some(1));
        assert_eq!(timeline.get(2), None);
        timeline.set(2, "c").unwrap();
        assert_eq!(timeline.get(2), Some(&"c"));
    }

    #[test]
    fn test_splice_wrapped_ring() {
        let mut timeline = filled(3, &["A", "B", "C", "D", "E"]);
        assert_eq!(timeline.min_index(), 2);
        timeline.splice(4);
        assert_eq!(timeline.max_index(), Some(3));
        assert_eq!(timeline.push("e"), 4);
        assert_eq!(
            timeline.iter().collect::<Vec<_>>(),
            vec![(2, &"C"), (3, &"D"), (4, &"e")]
        );
    }

    #[test]
    fn test_splice_below_window_reanchors() {
        let mut timeline = filled(2, &["A", "B", "C"]);
        timeline.splice(0);
        assert!(timeline.is_empty());
        assert_eq!(timeline.min_index(), 0);
        assert_eq!(timeline.push("a"), 0);
        assert_eq!(timeline.get(0), Some(&"a"));
    }
}
