//! Ready-made [`TotalOrder`]s.
//!
//! [`OrdTotalOrder`] makes the ordered structures of this crate behave like
//! their standard library counterparts, using the [`Ord`] trait for
//! comparisons. [`ReverseOrder`] flips any other order, turning max-heaps into
//! min-heaps and champions into wooden spoons.

use crate::TotalOrder;
use core::{cmp::Ordering, fmt, marker::PhantomData};

/// A zero-sized total order that delegates to the [`Ord`] implementation
/// of its type parameter `T`.
pub struct OrdTotalOrder<T: ?Sized>(PhantomData<fn(&T)>);

impl<T: ?Sized> OrdTotalOrder<T> {
    /// Creates the order.
    #[must_use]
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T: ?Sized> Default for OrdTotalOrder<T> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<T: ?Sized> Clone for OrdTotalOrder<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Copy for OrdTotalOrder<T> {}

impl<T: ?Sized> fmt::Debug for OrdTotalOrder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OrdTotalOrder")
    }
}

impl<T: ?Sized + Ord> TotalOrder<T> for OrdTotalOrder<T> {
    fn cmp(&self, this: &T, that: &T) -> Ordering {
        this.cmp(that)
    }

    // The comparisons below go through `T`'s own `PartialEq` and `PartialOrd`,
    // so a heap of such values sifts exactly as one keyed on `Ord` would.

    fn eq(&self, this: &T, that: &T) -> bool {
        this == that
    }
    fn ne(&self, this: &T, that: &T) -> bool {
        this != that
    }

    fn ge(&self, this: &T, that: &T) -> bool {
        this >= that
    }
    fn gt(&self, this: &T, that: &T) -> bool {
        this > that
    }
    fn le(&self, this: &T, that: &T) -> bool {
        this <= that
    }
    fn lt(&self, this: &T, that: &T) -> bool {
        this < that
    }
}

/// The reverse of another total order.
///
/// ```
/// use tourney::{OrdTotalOrder, PriorityQueue, ReverseOrder};
///
/// let mut heap = PriorityQueue::new(ReverseOrder(OrdTotalOrder::new()));
/// heap.push(3);
/// heap.push(1);
/// heap.push(2);
/// assert_eq!(heap.pop(), Some(1));
/// ```
#[derive(Copy, Clone, Debug, Default)]
pub struct ReverseOrder<O>(pub O);

impl<T: ?Sized, O: TotalOrder<T>> TotalOrder<T> for ReverseOrder<O> {
    fn cmp(&self, this: &T, that: &T) -> Ordering {
        self.0.cmp(that, this)
    }
}
