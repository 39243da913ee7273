//! Value equality used to decide whether a write changes anything.

use std::rc::Rc;

/// The value a property holds at some point of the timeline.
///
/// `NotDefined` means the property did not exist at that point. It is distinct
/// from every real value, including `None` when `V` is itself an `Option`.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot<V> {
    NotDefined,
    Defined(V),
}

impl<V> Slot<V> {
    pub fn is_defined(&self) -> bool {
        matches!(self, Slot::Defined(_))
    }

    pub fn as_ref(&self) -> Slot<&V> {
        match self {
            Slot::NotDefined => Slot::NotDefined,
            Slot::Defined(v) => Slot::Defined(v),
        }
    }

    /// The defined value, if any.
    pub fn defined(self) -> Option<V> {
        match self {
            Slot::NotDefined => None,
            Slot::Defined(v) => Some(v),
        }
    }
}

impl<V> From<Option<V>> for Slot<V> {
    fn from(value: Option<V>) -> Self {
        match value {
            Some(v) => Slot::Defined(v),
            None => Slot::NotDefined,
        }
    }
}

/// Equality as seen by the history engine.
///
/// This is plain `==` except for floats, where `NaN` equals `NaN` so that
/// re-saving a NaN never grows a history, and for `Rc`, where identity is
/// compared rather than contents.
pub trait SameValue {
    fn same_value(&self, other: &Self) -> bool;
}

macro_rules! same_value_by_eq {
    ($($t:ty),* $(,)?) => {
        $(
            impl SameValue for $t {
                fn same_value(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

same_value_by_eq!(
    (), bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, String,
    &'static str,
);

macro_rules! same_value_float {
    ($($t:ty),*) => {
        $(
            impl SameValue for $t {
                fn same_value(&self, other: &Self) -> bool {
                    self == other || (self.is_nan() && other.is_nan())
                }
            }
        )*
    };
}

same_value_float!(f32, f64);

impl<V: SameValue> SameValue for Slot<V> {
    fn same_value(&self, other: &Self) -> bool {
        match (self, other) {
            (Slot::NotDefined, Slot::NotDefined) => true,
            (Slot::Defined(a), Slot::Defined(b)) => a.same_value(b),
            _ => false,
        }
    }
}

impl<V: SameValue> SameValue for Option<V> {
    fn same_value(&self, other: &Self) -> bool {
        match (self, other) {
            (None, None) => true,
            (Some(a), Some(b)) => a.same_value(b),
            _ => false,
        }
    }
}

impl<V: SameValue> SameValue for Vec<V> {
    fn same_value(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.same_value(b))
    }
}

impl<V: SameValue + ?Sized> SameValue for Box<V> {
    fn same_value(&self, other: &Self) -> bool {
        (**self).same_value(other)
    }
}

impl<T: ?Sized> SameValue for Rc<T> {
    fn same_value(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

impl<A: SameValue, B: SameValue> SameValue for (A, B) {
    fn same_value(&self, other: &Self) -> bool {
        self.0.same_value(&other.0) && self.1.same_value(&other.1)
    }
}

impl<A: SameValue, B: SameValue, C: SameValue> SameValue for (A, B, C) {
    fn same_value(&self, other: &Self) -> bool {
        self.0.same_value(&other.0) && self.1.same_value(&other.1) && self.2.same_value(&other.2)
    }
}
