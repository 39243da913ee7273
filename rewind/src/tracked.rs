//! Wrapper types that hold tracked state.
//!
//! All wrappers use interior mutability: tracked objects are shared through
//! `Rc` (possibly in cycles) and a traversal only ever holds `&self`.

use std::cell::{Ref, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

use rewind_core::{MasterIndex, PropertyHistory, Slot};

use crate::track::{Member, Trackable, TrackedValue};

/// A single tracked value and its history.
///
/// Mutations are only recorded when the owning session saves. A value whose
/// history reads "not defined" at a load target (the owner was not tracked
/// yet at that point) is left as it is.
pub struct Tracked<T: TrackedValue> {
    value: RefCell<T>,
    history: RefCell<Option<PropertyHistory<T>>>,
}

impl<T: TrackedValue> Tracked<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: RefCell::new(value),
            history: RefCell::new(None),
        }
    }

    pub fn get(&self) -> T {
        self.value.borrow().clone()
    }

    pub fn borrow(&self) -> Ref<'_, T> {
        self.value.borrow()
    }

    pub fn set(&self, value: T) {
        *self.value.borrow_mut() = value;
    }

    /// Replace the value, returning the previous one.
    pub fn replace(&self, value: T) -> T {
        self.value.replace(value)
    }

    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut self.value.borrow_mut());
    }

    /// Retained revisions, `0` before the first save.
    pub fn revision_count(&self) -> usize {
        self.history
            .borrow()
            .as_ref()
            .map_or(0, PropertyHistory::revision_count)
    }
}

impl<T: TrackedValue> Member for Tracked<T> {
    fn save(&self, master: &mut MasterIndex) -> bool {
        let value = Slot::Defined(self.get());
        let mut history = self.history.borrow_mut();
        match history.as_mut() {
            Some(history) => history.set(master, value),
            None => {
                *history = Some(PropertyHistory::new(master, value));
                true
            }
        }
    }

    fn load(&self, master: &MasterIndex) {
        let history = self.history.borrow();
        let Some(history) = history.as_ref() else {
            return;
        };
        if let Slot::Defined(recorded) = history.get(master) {
            if !recorded.same_value(&self.value.borrow()) {
                let recorded = recorded.clone();
                self.set(recorded);
            }
        }
    }

    fn collapse(&self, master: &mut MasterIndex) {
        let value = Slot::Defined(self.get());
        self.history
            .borrow_mut()
            .get_or_insert_with(PropertyHistory::default)
            .collapse(master, value);
    }

    fn children(&self) -> Vec<Rc<dyn Trackable>> {
        let mut children = Vec::new();
        self.value.borrow().children(&mut children);
        children
    }
}

impl<T: TrackedValue + Default> Default for Tracked<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: TrackedValue + fmt::Debug> fmt::Debug for Tracked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracked")
            .field("value", &self.value.borrow())
            .field("revisions", &self.revision_count())
            .finish()
    }
}

/// A tracked keyed collection. Each key has its own history; a key that did
/// not exist at a load target is removed.
pub struct TrackedMap<K, V: TrackedValue> {
    entries: RefCell<BTreeMap<K, V>>,
    history: RefCell<BTreeMap<K, PropertyHistory<V>>>,
}

impl<K: Ord + Clone + 'static, V: TrackedValue> TrackedMap<K, V> {
    pub fn new() -> Self {
        Self {
            entries: RefCell::new(BTreeMap::new()),
            history: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn insert(&self, key: K, value: V) -> Option<V> {
        self.entries.borrow_mut().insert(key, value)
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.entries.borrow_mut().remove(key)
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.borrow().get(key).cloned()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.borrow().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    pub fn keys(&self) -> Vec<K> {
        self.entries.borrow().keys().cloned().collect()
    }

    /// Snapshot of the live entries in key order.
    pub fn to_vec(&self) -> Vec<(K, V)> {
        self.entries
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Every key that is live or has a history.
    fn known_keys(&self) -> Vec<K> {
        let mut keys = self.keys();
        for key in self.history.borrow().keys() {
            if !self.entries.borrow().contains_key(key) {
                keys.push(key.clone());
            }
        }
        keys
    }

    fn live_slot(&self, key: &K) -> Slot<V> {
        self.get(key).into()
    }
}

impl<K: Ord + Clone + 'static, V: TrackedValue> Member for TrackedMap<K, V> {
    fn save(&self, master: &mut MasterIndex) -> bool {
        let mut recorded = false;
        for key in self.known_keys() {
            let value = self.live_slot(&key);
            let mut history = self.history.borrow_mut();
            match history.get_mut(&key) {
                Some(log) => recorded |= log.set(master, value),
                None => {
                    history.insert(key, PropertyHistory::new(master, value));
                    recorded = true;
                }
            }
        }
        recorded
    }

    fn load(&self, master: &MasterIndex) {
        let history = self.history.borrow();
        let mut entries = self.entries.borrow_mut();
        entries.retain(|key, _| history.contains_key(key));
        for (key, log) in history.iter() {
            match log.get(master) {
                Slot::Defined(recorded) => {
                    let unchanged = entries
                        .get(key)
                        .is_some_and(|live| live.same_value(recorded));
                    if !unchanged {
                        entries.insert(key.clone(), recorded.clone());
                    }
                }
                Slot::NotDefined => {
                    entries.remove(key);
                }
            }
        }
    }

    fn collapse(&self, master: &mut MasterIndex) {
        for key in self.known_keys() {
            let value = self.live_slot(&key);
            self.history
                .borrow_mut()
                .entry(key)
                .or_default()
                .collapse(master, value);
        }
    }

    fn children(&self) -> Vec<Rc<dyn Trackable>> {
        let mut children = Vec::new();
        for value in self.entries.borrow().values() {
            value.children(&mut children);
        }
        children
    }
}

impl<K: Ord + Clone + 'static, V: TrackedValue> Default for TrackedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Clone + 'static, V: TrackedValue> FromIterator<(K, V)> for TrackedMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let map = Self::new();
        map.entries.borrow_mut().extend(iter);
        map
    }
}

impl<K: fmt::Debug, V: TrackedValue + fmt::Debug> fmt::Debug for TrackedMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.borrow().iter()).finish()
    }
}

/// A tracked set. Each element's presence has its own history: present is
/// recorded as a defined unit value, absent as not defined. Elements that
/// were absent at a load target are removed.
pub struct TrackedSet<K> {
    elements: RefCell<BTreeSet<K>>,
    presence: RefCell<BTreeMap<K, PropertyHistory<()>>>,
}

impl<K: Ord + Clone + 'static> TrackedSet<K> {
    pub fn new() -> Self {
        Self {
            elements: RefCell::new(BTreeSet::new()),
            presence: RefCell::new(BTreeMap::new()),
        }
    }

    /// Returns `false` if the element was already present.
    pub fn insert(&self, element: K) -> bool {
        self.elements.borrow_mut().insert(element)
    }

    pub fn remove(&self, element: &K) -> bool {
        self.elements.borrow_mut().remove(element)
    }

    pub fn contains(&self, element: &K) -> bool {
        self.elements.borrow().contains(element)
    }

    pub fn len(&self) -> usize {
        self.elements.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.elements.borrow_mut().clear();
    }

    /// Snapshot of the live elements in order.
    pub fn to_vec(&self) -> Vec<K> {
        self.elements.borrow().iter().cloned().collect()
    }

    fn known_elements(&self) -> Vec<K> {
        let mut known = self.to_vec();
        for element in self.presence.borrow().keys() {
            if !self.contains(element) {
                known.push(element.clone());
            }
        }
        known
    }

    fn live_slot(&self, element: &K) -> Slot<()> {
        if self.contains(element) {
            Slot::Defined(())
        } else {
            Slot::NotDefined
        }
    }
}

impl<K: Ord + Clone + 'static> Member for TrackedSet<K> {
    fn save(&self, master: &mut MasterIndex) -> bool {
        let mut recorded = false;
        for element in self.known_elements() {
            let slot = self.live_slot(&element);
            let mut presence = self.presence.borrow_mut();
            match presence.get_mut(&element) {
                Some(log) => recorded |= log.set(master, slot),
                None => {
                    presence.insert(element, PropertyHistory::new(master, slot));
                    recorded = true;
                }
            }
        }
        recorded
    }

    fn load(&self, master: &MasterIndex) {
        let presence = self.presence.borrow();
        let mut elements = self.elements.borrow_mut();
        elements.retain(|element| presence.contains_key(element));
        for (element, log) in presence.iter() {
            match log.get(master) {
                Slot::Defined(_) => {
                    elements.insert(element.clone());
                }
                Slot::NotDefined => {
                    elements.remove(element);
                }
            }
        }
    }

    fn collapse(&self, master: &mut MasterIndex) {
        for element in self.known_elements() {
            let slot = self.live_slot(&element);
            self.presence
                .borrow_mut()
                .entry(element)
                .or_default()
                .collapse(master, slot);
        }
    }

    fn children(&self) -> Vec<Rc<dyn Trackable>> {
        Vec::new()
    }
}

impl<K: Ord + Clone + 'static> Default for TrackedSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Clone + 'static> FromIterator<K> for TrackedSet<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let set = Self::new();
        set.elements.borrow_mut().extend(iter);
        set
    }
}

impl<K: fmt::Debug> fmt::Debug for TrackedSet<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.elements.borrow().iter()).finish()
    }
}
