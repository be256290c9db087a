#![doc = include_str!("../README.md")]
#![cfg_attr(not(any(feature = "std", test)), no_std)]
#![cfg_attr(feature = "allocator_api", feature(allocator_api))]
#![cfg_attr(feature = "dropck_eyepatch", feature(dropck_eyepatch))]
#![cfg_attr(feature = "extend_one", feature(extend_one))]
#![cfg_attr(feature = "specialization", feature(specialization))]
#![cfg_attr(feature = "trusted_len", feature(trusted_len))]
// documentation controls
#![cfg_attr(docsrs, feature(doc_auto_cfg, doc_cfg))]
#![warn(missing_docs)]
// linting controls
#![cfg_attr(feature = "specialization", allow(incomplete_features))]
#![allow(clippy::type_complexity)]
#![cfg_attr(
    test,
    allow(
        clippy::bool_assert_comparison,
        clippy::needless_range_loop,
        clippy::redundant_clone,
        clippy::redundant_closure,
        clippy::uninlined_format_args,
        clippy::useless_vec,
    )
)]

extern crate alloc;

#[macro_use]
mod macros;

mod default;
mod polyfill;

pub mod collections;

use core::cmp::Ordering;

pub use collections::{
    Buffer, PriorityQueue, TryReserveError, TryReserveErrorKind, Vector, WinnerTree,
};
pub use default::{OrdTotalOrder, ReverseOrder};
pub use polyfill::{AllocError, Allocator, Global};

/// A total order over values of type `T`, supplied at runtime.
///
/// Every ordered structure in this crate (the heap algorithms, the
/// [`PriorityQueue`] and the [`WinnerTree`]) is parameterised by one of these
/// rather than relying on `T`'s [`Ord`] implementation. The "greatest" value
/// under the order is the one that rises to the top of a heap or wins a
/// tournament.
///
/// Any closure of the shape `Fn(&T, &T) -> Ordering` is a `TotalOrder<T>`.
///
/// ```
/// use tourney::{collections::heap, TotalOrder};
///
/// // A min-heap is a max-heap under the reversed order.
/// let by_smallest = |a: &u32, b: &u32| b.cmp(a);
/// let mut data = [5, 1, 4, 2, 3];
/// heap::make_heap(&mut data, &by_smallest);
/// assert_eq!(data[0], 1);
/// assert!(by_smallest.gt(&1, &2));
/// ```
pub trait TotalOrder<T: ?Sized> {
    /// Compares `this` with `that` under this order.
    fn cmp(&self, this: &T, that: &T) -> Ordering;

    /// Whether `this` and `that` are equivalent under this order.
    fn eq(&self, this: &T, that: &T) -> bool {
        self.cmp(this, that).is_eq()
    }
    /// Whether `this` and `that` are not equivalent under this order.
    fn ne(&self, this: &T, that: &T) -> bool {
        self.cmp(this, that).is_ne()
    }

    /// Whether `this` is ordered at or above `that`.
    fn ge(&self, this: &T, that: &T) -> bool {
        self.cmp(this, that).is_ge()
    }
    /// Whether `this` is ordered strictly above `that`.
    fn gt(&self, this: &T, that: &T) -> bool {
        self.cmp(this, that).is_gt()
    }
    /// Whether `this` is ordered at or below `that`.
    fn le(&self, this: &T, that: &T) -> bool {
        self.cmp(this, that).is_le()
    }
    /// Whether `this` is ordered strictly below `that`.
    fn lt(&self, this: &T, that: &T) -> bool {
        self.cmp(this, that).is_lt()
    }
}

impl<T: ?Sized, F> TotalOrder<T> for F
where
    F: Fn(&T, &T) -> Ordering,
{
    fn cmp(&self, this: &T, that: &T) -> Ordering {
        self(this, that)
    }
}

#[cfg(test)]
mod testing;
