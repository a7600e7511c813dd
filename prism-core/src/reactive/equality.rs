//! Shallow equality for selected slices.
//!
//! A selector only notifies its owner when the selected slice is no longer
//! the *same value* as before. "Same" is shallow:
//!
//! - Primitives (numbers, booleans, chars, strings) compare by value.
//! - Floats follow `Object.is`: `NaN` is the same as `NaN`, and `0.0` is not
//!   the same as `-0.0`.
//! - Shared references (`Arc`, `Rc`) compare by identity, never by contents.
//!   A slice that is an object, list or callback is modelled as an `Arc` so
//!   that replacing it is a change even when the contents are equal, and
//!   handing back the same `Arc` is not a change even when the contents were
//!   mutated through interior mutability.
//!
//! Deep equality is deliberately absent.

use std::rc::Rc;
use std::sync::Arc;

/// Shallow "is the same value" comparison used by selectors.
pub trait SameValue {
    fn same_value(&self, other: &Self) -> bool;
}

macro_rules! same_value_by_eq {
    ($($ty:ty),* $(,)?) => {
        $(
            impl SameValue for $ty {
                #[inline]
                fn same_value(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

same_value_by_eq!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, bool, char, (), str, String,
    &'static str,
);

macro_rules! same_value_float {
    ($($ty:ty),*) => {
        $(
            impl SameValue for $ty {
                #[inline]
                fn same_value(&self, other: &Self) -> bool {
                    if self.is_nan() && other.is_nan() {
                        return true;
                    }
                    self.to_bits() == other.to_bits()
                }
            }
        )*
    };
}

same_value_float!(f32, f64);

impl<T: ?Sized> SameValue for Arc<T> {
    #[inline]
    fn same_value(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

impl<T: ?Sized> SameValue for Rc<T> {
    #[inline]
    fn same_value(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

impl<T: SameValue> SameValue for Option<T> {
    fn same_value(&self, other: &Self) -> bool {
        match (self, other) {
            (None, None) => true,
            (Some(a), Some(b)) => a.same_value(b),
            _ => false,
        }
    }
}
