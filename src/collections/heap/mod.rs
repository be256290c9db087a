//! Binary max-heap algorithms over slices.
//!
//! The functions here maintain the heap property on a plain `&mut [T]`
//! under a caller-supplied [`TotalOrder`]: no element is ordered above its
//! parent, so `data[0]` is a greatest element. They never allocate; a
//! container (such as [`PriorityQueue`](super::PriorityQueue)) owns the
//! storage and pairs these with its own push and pop.
//!
//! Elements are moved through a "hole" rather than swapped, and the hole is
//! always filled again, so if the order panics the slice is still a
//! permutation of its input.
//!
//! ```
//! use tourney::collections::heap;
//! use tourney::OrdTotalOrder;
//!
//! let order = OrdTotalOrder::new();
//! let mut data = [3, 1, 4, 1, 5, 9, 2, 6];
//! heap::make_heap(&mut data, &order);
//! assert_eq!(data[0], 9);
//! assert!(heap::is_heap(&data, &order));
//!
//! heap::pop_heap(&mut data, &order);
//! assert_eq!(data[7], 9);
//! assert_eq!(data[0], 6);
//!
//! heap::sort_heap(&mut data[..7], &order);
//! assert_eq!(data, [1, 1, 2, 3, 4, 5, 6, 9]);
//! ```

use core::mem::ManuallyDrop;
use core::ptr;

use crate::TotalOrder;


/// Rearranges `data` into a heap, sifting down from the last parent to the
/// root. *O*(*n*).
pub fn make_heap<T, C>(data: &mut [T], order: &C)
where
    C: TotalOrder<T> + ?Sized,
{
    let mut n = data.len() / 2;
    while n > 0 {
        n -= 1;
        // SAFETY: n < data.len() / 2.
        unsafe { sift_down(data, n, order) };
    }
}

/// Restores the heap after an element was appended: `data[..len - 1]` must be
/// a heap, and its last element is sifted up into place. *O*(log *n*).
pub fn push_heap<T, C>(data: &mut [T], order: &C)
where
    C: TotalOrder<T> + ?Sized,
{
    if let Some(last) = data.len().checked_sub(1) {
        // SAFETY: last < data.len().
        unsafe { sift_up(data, 0, last, order) };
    }
}

/// Moves a greatest element of the heap `data` to its last slot and restores
/// the heap over `data[..len - 1]`. *O*(log *n*).
///
/// The element is not removed; the caller does that afterwards if it wants
/// to.
pub fn pop_heap<T, C>(data: &mut [T], order: &C)
where
    C: TotalOrder<T> + ?Sized,
{
    let len = data.len();
    if len > 1 {
        data.swap(0, len - 1);
        // SAFETY: 0 < len - 1.
        unsafe { sift_down_to_bottom(&mut data[..len - 1], 0, order) };
    }
}

/// Sorts the heap `data` into ascending order under `order`.
/// *O*(*n* log *n*).
pub fn sort_heap<T, C>(data: &mut [T], order: &C)
where
    C: TotalOrder<T> + ?Sized,
{
    let mut end = data.len();
    while end > 1 {
        end -= 1;
        data.swap(0, end);
        // SAFETY: 0 < end <= data.len().
        unsafe { sift_down_range(data, 0, end, order) };
    }
}

/// Whether `data` satisfies the heap property under `order`.
pub fn is_heap<T, C>(data: &[T], order: &C) -> bool
where
    C: TotalOrder<T> + ?Sized,
{
    (1..data.len()).all(|child| order.ge(&data[(child - 1) / 2], &data[child]))
}

// The implementations of sift_up and sift_down use unsafe blocks in
// order to move an element out of the slice (leaving behind a
// hole), shift along the others and move the removed element back into the
// slice at the final location of the hole.
// The `Hole` type is used to represent this, and make sure
// the hole is filled back at the end of its scope, even on panic.
// Using a hole reduces the constant factor compared to using swaps,
// which involves twice as many moves.

/// Sifts `data[pos]` up, no further than `start`. Returns its new position.
///
/// # Safety
///
/// The caller must guarantee that `pos < data.len()`.
pub(crate) unsafe fn sift_up<T, C>(data: &mut [T], start: usize, pos: usize, order: &C) -> usize
where
    C: TotalOrder<T> + ?Sized,
{
    // SAFETY: The caller guarantees that pos < data.len().
    let mut hole = unsafe { Hole::new(data, pos) };

    while hole.pos() > start {
        let parent = (hole.pos() - 1) / 2;

        // SAFETY: hole.pos() > start >= 0, so parent < hole.pos() is a valid
        // index distinct from the hole.
        if order.le(hole.element(), unsafe { hole.get(parent) }) {
            break;
        }

        // SAFETY: Same as above
        unsafe { hole.move_to(parent) };
    }

    hole.pos()
}

/// Take an element at `pos` and move it down the heap `data[..end]`, while
/// its children are larger.
///
/// # Safety
///
/// The caller must guarantee that `pos < end <= data.len()`.
pub(crate) unsafe fn sift_down_range<T, C>(data: &mut [T], pos: usize, end: usize, order: &C)
where
    C: TotalOrder<T> + ?Sized,
{
    // SAFETY: The caller guarantees that pos < end <= data.len().
    let mut hole = unsafe { Hole::new(data, pos) };
    let mut child = 2 * hole.pos() + 1;

    // Loop invariant: child == 2 * hole.pos() + 1.
    while child <= end.saturating_sub(2) {
        // compare with the greater of the two children
        // SAFETY: child + 1 < end <= data.len(), and neither child is the hole.
        child += unsafe { order.le(hole.get(child), hole.get(child + 1)) } as usize;

        // if we are already in order, stop.
        // SAFETY: child is now either the old child or the old child+1
        if order.ge(hole.element(), unsafe { hole.get(child) }) {
            return;
        }

        // SAFETY: same as above.
        unsafe { hole.move_to(child) };
        child = 2 * hole.pos() + 1;
    }

    // SAFETY: && short circuit, which means that in the
    //  second condition it's already true that child == end - 1 < data.len().
    if child == end - 1 && order.lt(hole.element(), unsafe { hole.get(child) }) {
        // SAFETY: child is a valid index distinct from the hole.
        unsafe { hole.move_to(child) };
    }
}

/// # Safety
///
/// The caller must guarantee that `pos < data.len()`.
pub(crate) unsafe fn sift_down<T, C>(data: &mut [T], pos: usize, order: &C)
where
    C: TotalOrder<T> + ?Sized,
{
    let len = data.len();
    // SAFETY: pos < len is guaranteed by the caller.
    unsafe { sift_down_range(data, pos, len, order) };
}

/// Take an element at `pos` and move it all the way down the heap,
/// then sift it up to its position.
///
/// Note: This is faster when the element is known to be large / should
/// be closer to the bottom.
///
/// # Safety
///
/// The caller must guarantee that `pos < data.len()`.
pub(crate) unsafe fn sift_down_to_bottom<T, C>(data: &mut [T], mut pos: usize, order: &C)
where
    C: TotalOrder<T> + ?Sized,
{
    let end = data.len();
    let start = pos;

    // SAFETY: The caller guarantees that pos < data.len().
    let mut hole = unsafe { Hole::new(data, pos) };
    let mut child = 2 * hole.pos() + 1;

    // Loop invariant: child == 2 * hole.pos() + 1.
    while child <= end.saturating_sub(2) {
        // SAFETY: child + 1 < end, and neither child is the hole.
        child += unsafe { order.le(hole.get(child), hole.get(child + 1)) } as usize;

        // SAFETY: Same as above
        unsafe { hole.move_to(child) };
        child = 2 * hole.pos() + 1;
    }

    if child == end - 1 {
        // SAFETY: child == end - 1 < data.len(), and is not the hole.
        unsafe { hole.move_to(child) };
    }
    pos = hole.pos();
    drop(hole);

    // SAFETY: pos is the position in the hole and was already proven
    //  to be a valid index.
    unsafe { sift_up(data, start, pos, order) };
}

/// Hole represents a hole in a slice i.e., an index without valid value
/// (because it was moved from or duplicated).
/// In drop, `Hole` will restore the slice by filling the hole
/// position with the value that was originally removed.
struct Hole<'a, T: 'a> {
    data: &'a mut [T],
    elt: ManuallyDrop<T>,
    pos: usize,
}

impl<'a, T> Hole<'a, T> {
    /// Create a new `Hole` at index `pos`.
    ///
    /// Unsafe because pos must be within the data slice.
    #[inline]
    unsafe fn new(data: &'a mut [T], pos: usize) -> Self {
        debug_assert!(pos < data.len());
        // SAFE: pos should be inside the slice
        let elt = unsafe { ptr::read(data.get_unchecked(pos)) };
        Hole { data, elt: ManuallyDrop::new(elt), pos }
    }

    #[inline]
    fn pos(&self) -> usize {
        self.pos
    }

    /// Returns a reference to the element removed.
    #[inline]
    fn element(&self) -> &T {
        &self.elt
    }

    /// Returns a reference to the element at `index`.
    ///
    /// Unsafe because index must be within the data slice and not equal to pos.
    #[inline]
    unsafe fn get(&self, index: usize) -> &T {
        debug_assert!(index != self.pos);
        debug_assert!(index < self.data.len());
        unsafe { self.data.get_unchecked(index) }
    }

    /// Move hole to new location
    ///
    /// Unsafe because index must be within the data slice and not equal to pos.
    #[inline]
    unsafe fn move_to(&mut self, index: usize) {
        debug_assert!(index != self.pos);
        debug_assert!(index < self.data.len());
        unsafe {
            let ptr = self.data.as_mut_ptr();
            let index_ptr: *const _ = ptr.add(index);
            let hole_ptr = ptr.add(self.pos);
            ptr::copy_nonoverlapping(index_ptr, hole_ptr, 1);
        }
        self.pos = index;
    }
}

impl<T> Drop for Hole<'_, T> {
    #[inline]
    fn drop(&mut self) {
        // fill the hole again
        unsafe {
            let pos = self.pos;
            ptr::copy_nonoverlapping(&*self.elt, self.data.get_unchecked_mut(pos), 1);
        }
    }
}
