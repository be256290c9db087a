//! A priority queue over a [`Vector`], ordered by a runtime [`TotalOrder`].
//!
//! [`PriorityQueue`] is a thin composition of a [`Vector`], an order and the
//! [`heap`](super::heap) algorithms: pushing appends and sifts up, popping
//! moves the top to the back and pops it off the vector. The greatest element
//! under the order is always on top.
//!
//! # Examples
//!
//! ```
//! use core::cmp::Ordering;
//! use tourney::PriorityQueue;
//!
//! #[derive(Debug, PartialEq, Eq)]
//! struct Job {
//!     name: &'static str,
//!     cost: u32,
//! }
//!
//! // Cheapest job first.
//! let cheapest = |a: &Job, b: &Job| -> Ordering { b.cost.cmp(&a.cost) };
//! let mut jobs = PriorityQueue::new(cheapest);
//! jobs.push(Job { name: "index", cost: 30 });
//! jobs.push(Job { name: "lint", cost: 5 });
//! jobs.push(Job { name: "build", cost: 12 });
//!
//! assert_eq!(jobs.top().map(|j| j.name), Some("lint"));
//! let order: Vec<_> = std::iter::from_fn(|| jobs.pop()).map(|j| j.cost).collect();
//! assert_eq!(order, [5, 12, 30]);
//! ```

use core::fmt;
use core::iter::FusedIterator;
use core::mem::swap;
use core::num::NonZeroUsize;
use core::ops::{Deref, DerefMut};
use core::slice;

use super::heap::{self, sift_down, sift_up};
use super::vector::{IntoIter, Vector};
use super::TryReserveError;
use crate::polyfill::{Allocator, Global};
use crate::{OrdTotalOrder, TotalOrder};


/// A priority queue implemented with a binary heap in a [`Vector`].
///
/// It is a logic error for an item to be modified in such a way that its
/// ordering relative to any other item, as determined by the queue's order,
/// changes while it is in the queue. This is normally only possible through
/// interior mutability. The behavior resulting from such a logic error is not
/// specified, but will not result in undefined behavior.
pub struct PriorityQueue<T, C = OrdTotalOrder<T>, A: Allocator = Global> {
    data: Vector<T, A>,
    order: C,
}

/// Structure wrapping a mutable reference to the greatest item on a
/// [`PriorityQueue`].
///
/// This `struct` is created by [`PriorityQueue::peek_mut`]. When it is
/// dropped, the (possibly modified) item is sifted back into place.
pub struct PeekMut<'a, T: 'a, C: TotalOrder<T>, A: Allocator = Global> {
    queue: &'a mut PriorityQueue<T, C, A>,
    // If a set_len + sift_down are required, this is Some. If a &mut T has not
    // yet been exposed to peek_mut()'s caller, it's None.
    original_len: Option<NonZeroUsize>,
}

impl<T: fmt::Debug, C: TotalOrder<T>, A: Allocator> fmt::Debug for PeekMut<'_, T, C, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PeekMut").field(&self.queue.data[0]).finish()
    }
}

impl<T, C: TotalOrder<T>, A: Allocator> Drop for PeekMut<'_, T, C, A> {
    fn drop(&mut self) {
        if let Some(original_len) = self.original_len {
            // SAFETY: That's how many elements were in the vector when the
            // &mut T was handed out; undo the leak amplification.
            unsafe { self.queue.data.set_len(original_len.get()) };

            // SAFETY: PeekMut is only instantiated for non-empty queues.
            let PriorityQueue { data, order } = &mut *self.queue;
            unsafe { sift_down(data, 0, &*order) };
        }
    }
}

impl<T, C: TotalOrder<T>, A: Allocator> Deref for PeekMut<'_, T, C, A> {
    type Target = T;

    fn deref(&self) -> &T {
        debug_assert!(!self.queue.is_empty());
        // SAFE: PeekMut is only instantiated for non-empty queues
        unsafe { self.queue.data.get_unchecked(0) }
    }
}

impl<T, C: TotalOrder<T>, A: Allocator> DerefMut for PeekMut<'_, T, C, A> {
    fn deref_mut(&mut self) -> &mut T {
        debug_assert!(!self.queue.is_empty());

        let len = self.queue.len();
        if len > 1 {
            // Leak everything after the top until this guard is dropped or
            // popped, so that leaking the guard after mutating the top cannot
            // leave a broken heap behind.
            unsafe {
                // SAFETY: len > 1 so len != 0.
                self.original_len = Some(NonZeroUsize::new_unchecked(len));
                // SAFETY: len > 1 so all this does for now is leak elements,
                // which is safe.
                self.queue.data.set_len(1);
            }
        }

        // SAFE: PeekMut is only instantiated for non-empty queues
        unsafe { self.queue.data.get_unchecked_mut(0) }
    }
}

impl<'a, T, C: TotalOrder<T>, A: Allocator> PeekMut<'a, T, C, A> {
    /// Removes the peeked value from the queue and returns it.
    pub fn pop(mut this: PeekMut<'a, T, C, A>) -> T {
        if let Some(original_len) = this.original_len.take() {
            // SAFETY: This is how many elements were in the vector at the time
            // of the PriorityQueue::peek_mut call. No sift is needed: the item
            // leaves the queue on the next line.
            unsafe { this.queue.data.set_len(original_len.get()) };
        }
        match this.queue.pop() {
            Some(item) => item,
            None => unreachable!("PeekMut is only created for non-empty queues"),
        }
    }
}

impl<T: Clone, C: Clone, A: Allocator + Clone> Clone for PriorityQueue<T, C, A> {
    fn clone(&self) -> Self {
        Self { data: self.data.clone(), order: self.order.clone() }
    }
}

impl<T, C: TotalOrder<T> + Default, A: Allocator + Default> Default for PriorityQueue<T, C, A> {
    /// Creates an empty queue using the default order.
    #[inline]
    fn default() -> Self {
        Self::new_in(C::default(), A::default())
    }
}

impl<T: fmt::Debug, C, A: Allocator> fmt::Debug for PriorityQueue<T, C, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T, C: TotalOrder<T>> PriorityQueue<T, C> {
    /// Creates an empty queue ordered by `order`.
    ///
    /// ```
    /// use tourney::{OrdTotalOrder, PriorityQueue};
    ///
    /// let mut queue = PriorityQueue::new(OrdTotalOrder::new());
    /// queue.push(4);
    /// assert_eq!(queue.top(), Some(&4));
    /// ```
    #[must_use]
    pub const fn new(order: C) -> Self {
        Self::new_in(order, Global)
    }

    /// Creates an empty queue with room for exactly `capacity` items.
    #[must_use]
    #[track_caller]
    pub fn with_capacity(order: C, capacity: usize) -> Self {
        Self::with_capacity_in(order, capacity, Global)
    }
}

impl<T, C: TotalOrder<T>, A: Allocator> PriorityQueue<T, C, A> {
    /// Creates an empty queue in `alloc`.
    #[must_use]
    pub const fn new_in(order: C, alloc: A) -> Self {
        Self { data: Vector::new_in(alloc), order }
    }

    /// Creates an empty queue in `alloc` with room for exactly `capacity`
    /// items.
    #[track_caller]
    pub fn with_capacity_in(order: C, capacity: usize, alloc: A) -> Self {
        Self { data: Vector::with_capacity_in(capacity, alloc), order }
    }

    /// Turns `data` into a queue with one *O*(*n*) heapify pass.
    ///
    /// ```
    /// use tourney::{OrdTotalOrder, PriorityQueue, Vector};
    ///
    /// let queue = PriorityQueue::from_vector(Vector::from([2, 7, 1]), OrdTotalOrder::new());
    /// assert_eq!(queue.top(), Some(&7));
    /// ```
    pub fn from_vector(mut data: Vector<T, A>, order: C) -> Self {
        heap::make_heap(&mut data, &order);
        Self { data, order }
    }

    /// Returns a mutable reference to the greatest item, or `None` if the
    /// queue is empty. The item is sifted back into place when the guard is
    /// dropped.
    ///
    /// ```
    /// use tourney::{PriorityQueue, Vector};
    ///
    /// let mut queue = PriorityQueue::from(Vector::from([1, 5, 2]));
    /// if let Some(mut top) = queue.peek_mut() {
    ///     *top = 0;
    /// }
    /// assert_eq!(queue.into_sorted_vector(), [0, 1, 2]);
    /// ```
    pub fn peek_mut(&mut self) -> Option<PeekMut<'_, T, C, A>> {
        if self.is_empty() {
            None
        } else {
            Some(PeekMut { queue: self, original_len: None })
        }
    }

    /// Removes the greatest item and returns it, or `None` if the queue is
    /// empty.
    ///
    /// This is [`pop_heap`](heap::pop_heap) followed by [`Vector::pop`].
    pub fn pop(&mut self) -> Option<T> {
        heap::pop_heap(&mut self.data, &self.order);
        self.data.pop()
    }

    /// Pushes an item onto the queue.
    #[track_caller]
    pub fn push(&mut self, item: T) {
        self.data.push(item);
        heap::push_heap(&mut self.data, &self.order);
    }

    /// Pushes the item returned by `make`, constructed in its slot at the end
    /// of the vector and then sifted up. If `make` panics the queue is
    /// unchanged.
    ///
    /// ```
    /// use tourney::PriorityQueue;
    ///
    /// let mut queue: PriorityQueue<String> = PriorityQueue::default();
    /// queue.emplace(|| "b".repeat(2));
    /// queue.emplace(|| String::from("c"));
    /// assert_eq!(queue.top().map(String::as_str), Some("c"));
    /// ```
    #[track_caller]
    pub fn emplace<F: FnOnce() -> T>(&mut self, make: F) {
        let old_len = self.data.len();
        self.data.emplace_back(make);
        // SAFETY: old_len is the index of the item just constructed.
        unsafe { sift_up(&mut self.data, 0, old_len, &self.order) };
    }

    /// Consumes the queue and returns its items in ascending order.
    ///
    /// ```
    /// use tourney::PriorityQueue;
    ///
    /// let mut queue = PriorityQueue::from([1, 2, 4, 5, 7]);
    /// queue.push(6);
    /// queue.push(3);
    /// assert_eq!(queue.into_sorted_vector(), [1, 2, 3, 4, 5, 6, 7]);
    /// ```
    #[must_use = "`self` will be dropped if the result is not used"]
    pub fn into_sorted_vector(mut self) -> Vector<T, A> {
        heap::sort_heap(&mut self.data, &self.order);
        self.into_vector()
    }

    /// Rebuild assuming data[0..start] is still a proper heap.
    fn rebuild_tail(&mut self, start: usize) {
        if start == self.len() {
            return;
        }

        let tail_len = self.len() - start;

        #[inline(always)]
        fn log2_fast(x: usize) -> usize {
            (usize::BITS - x.leading_zeros() - 1) as usize
        }

        // A full rebuild costs about 2 * len comparisons, sifting the tail up
        // about tail_len * log2(start). The crossover for large queues was
        // determined empirically.
        let better_to_rebuild = if start < tail_len {
            true
        } else if self.len() <= 2048 {
            2 * self.len() < tail_len * log2_fast(start)
        } else {
            2 * self.len() < tail_len * 11
        };

        if better_to_rebuild {
            self.rebuild();
        } else {
            for i in start..self.len() {
                // SAFETY: The index `i` is always less than self.len().
                unsafe { sift_up(&mut self.data, 0, i, &self.order) };
            }
        }
    }

    fn rebuild(&mut self) {
        heap::make_heap(&mut self.data, &self.order);
    }

    /// Moves all the items of `other` into `self`, leaving `other` empty.
    ///
    /// ```
    /// use tourney::PriorityQueue;
    ///
    /// let mut a = PriorityQueue::from([-10, 1, 2, 3, 3]);
    /// let mut b = PriorityQueue::from([-20, 5, 43]);
    ///
    /// a.append(&mut b);
    ///
    /// assert_eq!(a.into_sorted_vector(), [-20, -10, 1, 2, 3, 3, 5, 43]);
    /// assert!(b.is_empty());
    /// ```
    #[track_caller]
    pub fn append(&mut self, other: &mut Self) {
        if self.len() < other.len() {
            swap(self, other);
        }

        let start = self.data.len();

        self.data.append(&mut other.data);

        self.rebuild_tail(start);
    }

    /// Borrow this queue's order.
    pub fn order(&self) -> &C {
        &self.order
    }

    /// Mutably borrow this queue's order. When the returned guard is
    /// dropped, the queue is rebuilt.
    pub fn order_mut(&mut self) -> OrderMut<'_, T, C, A> {
        OrderMut { queue: self }
    }

    /// Mutably borrow this queue's order without rebuilding afterwards.
    ///
    /// It is a logic error to change the order in a way that changes the
    /// relative ordering of any two items in the queue. The behavior
    /// resulting from such a logic error is not specified, but will not
    /// result in undefined behavior. Use [`order_mut`](Self::order_mut) if
    /// the order may change that way.
    pub fn order_mut_unchecked(&mut self) -> &mut C {
        &mut self.order
    }
}

/// A mutable borrow of a queue's order; the queue is rebuilt when it is
/// dropped.
///
/// This `struct` is created by [`PriorityQueue::order_mut`].
pub struct OrderMut<'a, T, C: TotalOrder<T>, A: Allocator = Global> {
    queue: &'a mut PriorityQueue<T, C, A>,
}

impl<T, C: TotalOrder<T>, A: Allocator> Deref for OrderMut<'_, T, C, A> {
    type Target = C;
    fn deref(&self) -> &Self::Target {
        &self.queue.order
    }
}

impl<T, C: TotalOrder<T>, A: Allocator> DerefMut for OrderMut<'_, T, C, A> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.queue.order
    }
}

impl<T, C: TotalOrder<T>, A: Allocator> Drop for OrderMut<'_, T, C, A> {
    fn drop(&mut self) {
        self.queue.rebuild()
    }
}

impl<T, C, A: Allocator> PriorityQueue<T, C, A> {
    /// Returns an iterator visiting all values in the underlying vector, in
    /// arbitrary order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter { iter: self.data.iter() }
    }

    /// Returns the greatest item, or `None` if the queue is empty.
    #[must_use]
    pub fn top(&self) -> Option<&T> {
        self.data.front()
    }

    /// Alias of [`top`](Self::top).
    #[must_use]
    pub fn peek(&self) -> Option<&T> {
        self.top()
    }

    /// The number of items the queue can hold without reallocating.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Ensures room for at least `additional` more items.
    #[track_caller]
    pub fn reserve(&mut self, additional: usize) {
        self.data.reserve_additional(additional);
    }

    /// Fallible variant of [`reserve`](Self::reserve).
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), TryReserveError> {
        self.data.try_reserve_additional(additional)
    }

    /// Discards as much additional capacity as possible.
    #[track_caller]
    pub fn shrink_to_fit(&mut self) {
        self.data.shrink_to_fit();
    }

    /// The items in underlying-vector (heap) order.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        self.data.as_slice()
    }

    /// Consumes the queue and returns the underlying vector in heap order.
    #[must_use = "`self` will be dropped if the result is not used"]
    pub fn into_vector(self) -> Vector<T, A> {
        self.into()
    }

    /// The number of items in the queue.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops all items and releases the storage.
    pub fn clear(&mut self) {
        self.data.clear();
    }
}

/// An iterator over the items of a [`PriorityQueue`], in heap order.
///
/// This `struct` is created by [`PriorityQueue::iter()`].
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Iter<'a, T: 'a> {
    iter: slice::Iter<'a, T>,
}

impl<T: fmt::Debug> fmt::Debug for Iter<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Iter").field(&self.iter.as_slice()).finish()
    }
}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Iter { iter: self.iter.clone() }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<&'a T> {
        self.iter.next()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }

    #[inline]
    fn last(self) -> Option<&'a T> {
        self.iter.last()
    }
}

impl<'a, T> DoubleEndedIterator for Iter<'a, T> {
    #[inline]
    fn next_back(&mut self) -> Option<&'a T> {
        self.iter.next_back()
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

impl<T: Ord, A: Allocator> From<Vector<T, A>> for PriorityQueue<T, OrdTotalOrder<T>, A> {
    /// Converts a `Vector<T>` into a `PriorityQueue<T>`.
    ///
    /// This conversion happens in-place, and has *O*(*n*) time complexity.
    fn from(vec: Vector<T, A>) -> Self {
        Self::from_vector(vec, OrdTotalOrder::new())
    }
}

impl<T: Ord, const N: usize> From<[T; N]> for PriorityQueue<T> {
    /// ```
    /// use tourney::PriorityQueue;
    ///
    /// let mut q1 = PriorityQueue::from([1, 4, 2, 3]);
    /// let mut q2: PriorityQueue<_> = [1, 4, 2, 3].into();
    /// while let Some((a, b)) = q1.pop().zip(q2.pop()) {
    ///     assert_eq!(a, b);
    /// }
    /// ```
    #[track_caller]
    fn from(arr: [T; N]) -> Self {
        Self::from(Vector::from(arr))
    }
}

impl<T, C, A: Allocator> From<PriorityQueue<T, C, A>> for Vector<T, A> {
    /// Converts a `PriorityQueue<T>` into a `Vector<T>`.
    ///
    /// This conversion requires no data movement or allocation, and has
    /// constant time complexity.
    fn from(queue: PriorityQueue<T, C, A>) -> Vector<T, A> {
        queue.data
    }
}

impl<T: Ord> FromIterator<T> for PriorityQueue<T> {
    #[track_caller]
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vector<_>>())
    }
}

impl<T, C, A: Allocator> IntoIterator for PriorityQueue<T, C, A> {
    type Item = T;
    type IntoIter = IntoIter<T, A>;

    /// Creates a consuming iterator, that is, one that moves each value out of
    /// the queue in arbitrary order. The queue cannot be used after calling
    /// this.
    fn into_iter(self) -> IntoIter<T, A> {
        self.data.into_iter()
    }
}

impl<'a, T, C, A: Allocator> IntoIterator for &'a PriorityQueue<T, C, A> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

impl<T, C: TotalOrder<T>, A: Allocator> Extend<T> for PriorityQueue<T, C, A> {
    #[track_caller]
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let start = self.data.len();
        self.data.extend(iter);
        self.rebuild_tail(start);
    }

    #[cfg(feature = "extend_one")]
    #[inline]
    fn extend_one(&mut self, item: T) {
        self.push(item);
    }

    #[cfg(feature = "extend_one")]
    #[inline]
    fn extend_reserve(&mut self, additional: usize) {
        self.reserve(additional);
    }
}

impl<'a, T: 'a + Copy, C: TotalOrder<T>, A: Allocator> Extend<&'a T> for PriorityQueue<T, C, A> {
    #[track_caller]
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied());
    }

    #[cfg(feature = "extend_one")]
    #[inline]
    fn extend_one(&mut self, &item: &'a T) {
        self.push(item);
    }

    #[cfg(feature = "extend_one")]
    #[inline]
    fn extend_reserve(&mut self, additional: usize) {
        self.reserve(additional);
    }
}
