//! A growable array with an allocator-aware storage core.
//!
//! [`Vector`] keeps its live values at the front of one owned block: slots
//! `[0, len)` hold values and `[len, capacity)` are allocated but
//! uninitialised. Growth follows a fixed policy (see [`Vector::recommend`])
//! and every mutation documents what it leaves behind if a clone, closure,
//! iterator or destructor panics part-way through:
//!
//! * reallocation only ever moves values bitwise, so it cannot fail once the
//!   new block exists, and allocation failure leaves the vector untouched;
//! * insertion is all-or-nothing for the values (capacity may have grown);
//! * erasure always removes the requested range, even if a destructor
//!   panics;
//! * growing [`resize`](Vector::resize) whose fill panics keeps only the
//!   values that were already there, in the new block.
//!
//! # Examples
//!
//! ```
//! use tourney::Vector;
//!
//! let mut v: Vector<i32> = (1..=10).collect();
//! let at = v.insert(5, 99);
//! assert_eq!(v, [1, 2, 3, 4, 5, 99, 6, 7, 8, 9, 10]);
//!
//! v.erase(at..at + 1);
//! assert_eq!(v, [1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
//! assert_eq!(*v.at(-1), 10);
//! ```

use core::cmp::{self, Ordering};
use core::fmt;
use core::hash::{Hash, Hasher};
use core::iter::FusedIterator;
use core::mem::{self, ManuallyDrop};
use core::ops::{Bound, Deref, DerefMut, Range, RangeBounds};
use core::ptr;
use core::slice;

use cfg_if::cfg_if;

use super::raw_block::{RawBlock, ReleaseOnDrop, WriteCloned};
use super::{handle_reserve, resolve_index, Buffer, TryReserveError, TryReserveErrorKind};
use crate::polyfill::{Allocator, Global};


/// A contiguous growable array of `T` in storage obtained from `A`.
pub struct Vector<T, A: Allocator = Global> {
    buf: RawBlock<T, A>,
    len: usize,
}

impl<T> Vector<T> {
    /// Creates an empty vector. Does not allocate.
    #[must_use]
    pub const fn new() -> Self {
        Self::new_in(Global)
    }

    /// Creates an empty vector with room for exactly `capacity` values.
    #[must_use]
    #[track_caller]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_in(capacity, Global)
    }

    /// Creates a vector of `n` clones of `value`.
    ///
    /// ```
    /// use tourney::Vector;
    ///
    /// let v = Vector::from_elem('z', 3);
    /// assert_eq!(v, ['z', 'z', 'z']);
    /// assert_eq!(v.capacity(), 6);
    /// ```
    #[must_use]
    #[track_caller]
    pub fn from_elem(value: T, n: usize) -> Self
    where
        T: Clone,
    {
        Self::from_elem_in(value, n, Global)
    }

    /// Creates a vector holding clones of `items`.
    #[must_use]
    #[track_caller]
    pub fn from_slice(items: &[T]) -> Self
    where
        T: Clone,
    {
        Self::from_slice_in(items, Global)
    }
}

impl<T, A: Allocator> Vector<T, A> {
    /// Capacity of the first block allocated for elements of at most
    /// [`LARGE_ELEMENT_THRESHOLD`](Self::LARGE_ELEMENT_THRESHOLD) bytes.
    pub const DEFAULT_CAPACITY: usize = 64;

    /// Element size, in bytes, above which the first block holds
    /// [`LARGE_DEFAULT_CAPACITY`](Self::LARGE_DEFAULT_CAPACITY) slots instead.
    pub const LARGE_ELEMENT_THRESHOLD: usize = 128;

    /// Capacity of the first block allocated for large elements.
    pub const LARGE_DEFAULT_CAPACITY: usize = 16;

    const IS_ZST: bool = mem::size_of::<T>() == 0;

    /// Creates an empty vector in `alloc`. Does not allocate.
    #[must_use]
    pub const fn new_in(alloc: A) -> Self {
        Self { buf: RawBlock::new_in(alloc), len: 0 }
    }

    /// Creates an empty vector in `alloc` with room for exactly `capacity`
    /// values.
    #[track_caller]
    pub fn with_capacity_in(capacity: usize, alloc: A) -> Self {
        Self { buf: RawBlock::allocate_in(capacity, alloc), len: 0 }
    }

    /// Fallible variant of [`with_capacity_in`](Self::with_capacity_in).
    pub fn try_with_capacity_in(capacity: usize, alloc: A) -> Result<Self, TryReserveError> {
        Ok(Self { buf: RawBlock::try_allocate_in(capacity, alloc)?, len: 0 })
    }

    /// Creates a vector of `n` clones of `value` in `alloc`, with capacity
    /// [`initial_capacity(n)`](Self::initial_capacity).
    #[track_caller]
    pub fn from_elem_in(value: T, n: usize, alloc: A) -> Self
    where
        T: Clone,
    {
        let mut vec = Self::with_capacity_in(Self::initial_capacity(n), alloc);
        vec.extend_with(n, ExtendElement(value));
        vec
    }

    /// Creates a vector holding clones of `items` in `alloc`, with capacity
    /// [`initial_capacity(items.len())`](Self::initial_capacity).
    #[track_caller]
    pub fn from_slice_in(items: &[T], alloc: A) -> Self
    where
        T: Clone,
    {
        let mut vec = Self::with_capacity_in(Self::initial_capacity(items.len()), alloc);
        vec.extend_from_slice(items);
        vec
    }

    /// Creates a vector from the items of `iter` in `alloc`.
    ///
    /// Input of exactly known length `n` starts with capacity
    /// [`initial_capacity(n)`](Self::initial_capacity); other input grows as
    /// [`push`](Self::push) would.
    ///
    /// ```
    /// use tourney::{Global, Vector};
    ///
    /// let v = Vector::from_iter_in(0..1000, Global);
    /// assert_eq!(v.capacity(), 1200);
    /// ```
    #[track_caller]
    pub fn from_iter_in<I: IntoIterator<Item = T>>(iter: I, alloc: A) -> Self {
        let iter = iter.into_iter();
        let mut vec = match iter.size_hint() {
            (lower, Some(upper)) if lower == upper => {
                Self::with_capacity_in(Self::initial_capacity(lower), alloc)
            }
            _ => Self::new_in(alloc),
        };
        vec.extend_desugared(iter);
        vec
    }

    /// Capacity used when building a vector of `n` values in one go: 20%
    /// headroom above five values, double below.
    #[inline]
    #[must_use]
    pub fn initial_capacity(n: usize) -> usize {
        if n > 5 {
            n.saturating_add(n / 5)
        } else {
            n * 2
        }
    }

    fn default_capacity() -> usize {
        if mem::size_of::<T>() > Self::LARGE_ELEMENT_THRESHOLD {
            Self::LARGE_DEFAULT_CAPACITY
        } else {
            Self::DEFAULT_CAPACITY
        }
    }

    /// The capacity growth would move to in order to make room for `extra`
    /// more values.
    ///
    /// An unallocated vector starts at its default capacity (or `extra`, if
    /// larger); otherwise capacity at least doubles.
    ///
    /// ```
    /// use tourney::Vector;
    ///
    /// let mut v: Vector<u8> = Vector::new();
    /// assert_eq!(v.recommend(1), Ok(64));
    /// assert_eq!(v.recommend(100), Ok(100));
    ///
    /// v.reserve(10);
    /// assert_eq!(v.recommend(1), Ok(20));
    /// assert_eq!(v.recommend(15), Ok(25));
    /// ```
    pub fn recommend(&self, extra: usize) -> Result<usize, TryReserveError> {
        let cap = self.capacity();
        if cap == 0 {
            return Ok(cmp::max(extra, Self::default_capacity()));
        }
        let needed = cap.checked_add(extra).ok_or(TryReserveErrorKind::CapacityOverflow)?;
        Ok(cmp::max(cap.saturating_mul(2), needed))
    }

    fn try_grow_for(&mut self, extra: usize) -> Result<(), TryReserveError> {
        if extra <= self.remain() {
            return Ok(());
        }
        let new_cap = self.recommend(extra)?;
        self.try_reallocate(new_cap)
    }

    #[track_caller]
    fn grow_for(&mut self, extra: usize) {
        handle_reserve(self.try_grow_for(extra))
    }

    /// Moves every value into a fresh block of exactly `new_cap` slots.
    fn try_reallocate(&mut self, new_cap: usize) -> Result<(), TryReserveError> {
        debug_assert!(new_cap >= self.len);
        // SAFETY: exactly the first `len` slots are live and `len <= new_cap`.
        unsafe { self.buf.try_reallocate(new_cap, self.len) }
    }

    /// The number of values.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the vector holds no values.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The number of slots in the current block; `usize::MAX` for zero-sized
    /// `T`, which never allocates.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        if Self::IS_ZST {
            usize::MAX
        } else {
            self.buf.capacity()
        }
    }

    /// Unused slots: `capacity() - len()`.
    #[inline]
    #[must_use]
    pub fn remain(&self) -> usize {
        self.capacity() - self.len
    }

    /// Returns a copy of the allocator state.
    #[must_use]
    pub fn allocator(&self) -> A
    where
        A: Clone,
    {
        self.buf.allocator().clone()
    }

    /// Forces the length of the vector to `new_len`.
    ///
    /// # Safety
    ///
    /// `new_len <= capacity()`, and the slots `[0, new_len)` must be
    /// initialised.
    #[inline]
    pub unsafe fn set_len(&mut self, new_len: usize) {
        debug_assert!(new_len <= self.capacity());
        self.len = new_len;
    }

    /// Raw pointer to the first slot (dangling without storage).
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.buf.ptr()
    }

    /// Raw mutable pointer to the first slot (dangling without storage).
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.buf.ptr()
    }

    /// The values as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: the first `len` slots are live.
        unsafe { slice::from_raw_parts(self.buf.ptr(), self.len) }
    }

    /// The values as a mutable slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: the first `len` slots are live.
        unsafe { slice::from_raw_parts_mut(self.buf.ptr(), self.len) }
    }

    /// The value at `index`; negative indices count back from the end.
    ///
    /// # Panics
    ///
    /// Panics if the resolved index is out of bounds.
    #[track_caller]
    pub fn at(&self, index: isize) -> &T {
        &self.as_slice()[resolve_index(index, self.len)]
    }

    /// Mutable variant of [`at`](Self::at).
    #[track_caller]
    pub fn at_mut(&mut self, index: isize) -> &mut T {
        let index = resolve_index(index, self.len);
        &mut self.as_mut_slice()[index]
    }

    /// Ensures the capacity is at least `new_cap`, reallocating to exactly
    /// `new_cap` if it is not.
    #[track_caller]
    pub fn reserve(&mut self, new_cap: usize) {
        handle_reserve(self.try_reserve(new_cap))
    }

    /// Fallible variant of [`reserve`](Self::reserve). On error the vector is
    /// unchanged.
    pub fn try_reserve(&mut self, new_cap: usize) -> Result<(), TryReserveError> {
        if new_cap <= self.capacity() {
            return Ok(());
        }
        self.try_reallocate(new_cap)
    }

    /// Ensures room for `extra` more values, growing by the usual policy.
    #[track_caller]
    pub fn reserve_additional(&mut self, extra: usize) {
        self.grow_for(extra)
    }

    /// Fallible variant of [`reserve_additional`](Self::reserve_additional).
    pub fn try_reserve_additional(&mut self, extra: usize) -> Result<(), TryReserveError> {
        self.try_grow_for(extra)
    }

    /// Reallocates to exactly `len()` slots if there is any slack; an empty
    /// vector releases its block.
    #[track_caller]
    pub fn shrink_to_fit(&mut self) {
        if !Self::IS_ZST && self.capacity() > self.len {
            handle_reserve(self.try_reallocate(self.len));
        }
    }

    /// Appends `value`.
    #[track_caller]
    pub fn push(&mut self, value: T) {
        if self.len == self.capacity() {
            self.grow_for(1);
        }
        // SAFETY: there is room for one more.
        unsafe { self.buf.ptr().add(self.len).write(value) };
        self.len += 1;
    }

    /// Appends the value returned by `make`, constructing it after any growth
    /// so that it lands directly in its slot. If `make` panics the values are
    /// unchanged.
    ///
    /// ```
    /// use tourney::Vector;
    ///
    /// let mut v = Vector::new();
    /// *v.emplace_back(|| 41) += 1;
    /// assert_eq!(v, [42]);
    /// ```
    #[track_caller]
    pub fn emplace_back<F: FnOnce() -> T>(&mut self, make: F) -> &mut T {
        if self.len == self.capacity() {
            self.grow_for(1);
        }
        // SAFETY: there is room for one more; `len` moves only after the write.
        unsafe {
            let slot = self.buf.ptr().add(self.len);
            slot.write(make());
            self.len += 1;
            &mut *slot
        }
    }

    /// Removes and returns the last value.
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            None
        } else {
            self.len -= 1;
            // SAFETY: the slot was live and is now outside the live range.
            Some(unsafe { self.buf.ptr().add(self.len).read() })
        }
    }

    /// The first value.
    #[inline]
    pub fn front(&self) -> Option<&T> {
        self.as_slice().first()
    }

    /// The last value.
    #[inline]
    pub fn back(&self) -> Option<&T> {
        self.as_slice().last()
    }

    /// Inserts `value` at `pos`, shifting later values up. Returns `pos`.
    ///
    /// # Panics
    ///
    /// Panics if `pos > len()`.
    #[track_caller]
    pub fn insert(&mut self, pos: usize, value: T) -> usize {
        let mut gap = self.open_gap(pos, 1);
        // SAFETY: the gap has one slot.
        unsafe { gap.write(value) };
        gap.close();
        pos
    }

    /// Inserts `count` clones of `value` at `pos`. Returns `pos`.
    ///
    /// If a clone panics, the clones already made are dropped and the later
    /// values moved back: the values are as before (capacity may have grown).
    ///
    /// # Panics
    ///
    /// Panics if `pos > len()`.
    #[track_caller]
    pub fn insert_n(&mut self, pos: usize, count: usize, value: &T) -> usize
    where
        T: Clone,
    {
        let mut gap = self.open_gap(pos, count);
        for _ in 0..count {
            let clone = value.clone();
            // SAFETY: fewer than `count` slots have been written.
            unsafe { gap.write(clone) };
        }
        gap.close();
        pos
    }

    /// Inserts clones of `items` at `pos`, with the same guarantee as
    /// [`insert_n`](Self::insert_n). Returns `pos`.
    #[track_caller]
    pub fn insert_slice(&mut self, pos: usize, items: &[T]) -> usize
    where
        T: Clone,
    {
        let mut gap = self.open_gap(pos, items.len());
        let base = gap.first_slot();
        // SAFETY: the gap holds exactly `items.len()` slots, which cannot
        // overlap `items` since they were uninitialised.
        unsafe { T::write_cloned(items, base, &mut gap.filled) };
        gap.close();
        pos
    }

    /// Inserts the items of `iter` at `pos`, in order. Returns `pos`.
    ///
    /// Input of exactly known length is written straight into place. Other
    /// input is first collected into a scratch vector (in a copy of this
    /// vector's allocator) and then moved in. At `len()` the items are
    /// appended directly. A panic from the iterator leaves the values as they
    /// were.
    ///
    /// ```
    /// use tourney::Vector;
    ///
    /// let mut v = Vector::from([1, 5]);
    /// v.insert_iter(1, (2..5).filter(|_| true));
    /// assert_eq!(v, [1, 2, 3, 4, 5]);
    /// ```
    #[track_caller]
    pub fn insert_iter<I>(&mut self, pos: usize, iter: I) -> usize
    where
        I: IntoIterator<Item = T>,
        A: Clone,
    {
        assert!(pos <= self.len, "insertion index (is {pos}) should be <= len (is {})", self.len);
        let mut iter = iter.into_iter();
        if pos == self.len {
            let guard = Rollback { start: pos, vec: self };
            guard.vec.extend_desugared(iter);
            mem::forget(guard);
            return pos;
        }
        match iter.size_hint() {
            (lower, Some(upper)) if lower == upper => {
                let mut gap = self.open_gap(pos, lower);
                while gap.filled < gap.count {
                    match iter.next() {
                        // SAFETY: the gap is not yet full.
                        Some(value) => unsafe { gap.write(value) },
                        None => break,
                    }
                }
                let end = gap.close();
                // Anything the iterator failed to announce goes in after.
                self.insert_collected(end, iter);
            }
            _ => self.insert_collected(pos, iter),
        }
        pos
    }

    #[track_caller]
    fn insert_collected<I: Iterator<Item = T>>(&mut self, pos: usize, iter: I)
    where
        A: Clone,
    {
        let mut scratch = Self::from_iter_in(iter, self.allocator());
        if !scratch.is_empty() {
            self.move_in(pos, &mut scratch);
        }
    }

    /// Moves every value of `other` into place at `pos`, leaving `other`
    /// empty.
    #[track_caller]
    fn move_in<B: Allocator>(&mut self, pos: usize, other: &mut Vector<T, B>) {
        let count = other.len;
        let mut gap = self.open_gap(pos, count);
        // SAFETY: the gap has exactly `count` uninitialised slots; `other`
        // forgets the values once they are copied.
        unsafe {
            ptr::copy_nonoverlapping(other.as_ptr(), gap.first_slot(), count);
            other.set_len(0);
        }
        gap.filled = count;
        gap.close();
    }

    /// Makes room for `count` values at `pos`: grows if needed, then shifts
    /// the tail up in a single move.
    #[track_caller]
    fn open_gap(&mut self, pos: usize, count: usize) -> Gap<'_, T, A> {
        assert!(pos <= self.len, "insertion index (is {pos}) should be <= len (is {})", self.len);
        self.grow_for(count);
        let tail = self.len - pos;
        // SAFETY: growth made room for `count` more slots past the tail.
        unsafe {
            let base = self.buf.ptr();
            ptr::copy(base.add(pos), base.add(pos + count), tail);
        }
        self.len = pos;
        Gap { vec: self, pos, count, filled: 0, tail }
    }

    /// Removes the values in `range`, shifting later values down. Returns the
    /// start of the range, which now holds the first survivor (if any).
    ///
    /// If a removed value's destructor panics, the rest of the range is still
    /// dropped and the survivors still shifted down.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds or decreasing.
    #[track_caller]
    pub fn erase<R: RangeBounds<usize>>(&mut self, range: R) -> usize {
        let Range { start, end } = resolve_range(range, self.len);
        if start == end {
            return start;
        }
        let tail = self.len - end;
        // SAFETY: `[start, end)` is live and is forgotten by `len = start`;
        // `CloseTail` restores the survivors whatever the drops do.
        unsafe {
            let erased = ptr::slice_from_raw_parts_mut(self.buf.ptr().add(start), end - start);
            self.len = start;
            let _close = CloseTail { vec: self, start, end, tail };
            ptr::drop_in_place(erased);
        }
        start
    }

    /// Removes and returns the value at `pos`, shifting later values down.
    ///
    /// # Panics
    ///
    /// Panics if `pos >= len()`.
    #[track_caller]
    pub fn remove(&mut self, pos: usize) -> T {
        assert!(pos < self.len, "removal index (is {pos}) should be < len (is {})", self.len);
        // SAFETY: `pos` is live; the tail move closes the hole it leaves.
        unsafe {
            let slot = self.buf.ptr().add(pos);
            let value = slot.read();
            ptr::copy(slot.add(1), slot, self.len - pos - 1);
            self.len -= 1;
            value
        }
    }

    /// Drops every value past `new_len`. Does nothing if `new_len >= len()`.
    pub fn truncate(&mut self, new_len: usize) {
        if new_len >= self.len {
            return;
        }
        // SAFETY: the tail is live, and is forgotten before it is dropped so
        // that a panicking destructor cannot expose it again.
        unsafe {
            let tail =
                ptr::slice_from_raw_parts_mut(self.buf.ptr().add(new_len), self.len - new_len);
            self.len = new_len;
            ptr::drop_in_place(tail);
        }
    }

    /// Drops every value and releases the block. Capacity is zero afterwards.
    ///
    /// ```
    /// use tourney::Vector;
    ///
    /// let mut v = Vector::from([1, 2, 3]);
    /// v.clear();
    /// assert!(v.is_empty());
    /// assert_eq!(v.capacity(), 0);
    /// ```
    pub fn clear(&mut self) {
        let values: *mut [T] = self.as_mut_slice();
        self.len = 0;
        let _release = ReleaseOnDrop(&mut self.buf);
        // SAFETY: the values are dropped exactly once before the block goes.
        unsafe { ptr::drop_in_place(values) };
    }

    /// Resizes to `new_len`, filling new slots with clones of `value`.
    ///
    /// When `new_len` equals the capacity only the spare slots are filled.
    /// Any other target reallocates to exactly `new_len` slots, dropping
    /// values past `new_len` first when shrinking.
    ///
    /// If a clone panics after reallocating, the clones already made are
    /// dropped and the vector keeps only its previous values in the new
    /// block; the old block is gone.
    #[track_caller]
    pub fn resize(&mut self, new_len: usize, value: T)
    where
        T: Clone,
    {
        self.resize_impl(new_len, ExtendElement(value))
    }

    /// Like [`resize`](Self::resize), filling new slots with values returned
    /// by `f`.
    #[track_caller]
    pub fn resize_with<F: FnMut() -> T>(&mut self, new_len: usize, f: F) {
        self.resize_impl(new_len, ExtendFunc(f))
    }

    #[track_caller]
    fn resize_impl<E: ExtendWith<T>>(&mut self, new_len: usize, value: E) {
        if new_len != self.capacity() {
            self.truncate(new_len);
            if !Self::IS_ZST {
                handle_reserve(self.try_reallocate(new_len));
            }
        }
        if new_len > self.len {
            self.fill_or_roll_back(new_len - self.len, value);
        }
    }

    /// Replaces the contents with `n` clones of `value`.
    #[track_caller]
    pub fn assign(&mut self, n: usize, value: &T)
    where
        T: Clone,
    {
        self.truncate(0);
        self.reserve(n);
        self.extend_with(n, ExtendElement(value.clone()));
    }

    /// Replaces the contents with the items of `iter`.
    #[track_caller]
    pub fn assign_iter<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.truncate(0);
        self.extend_desugared(iter.into_iter());
    }

    /// Exchanges contents (and allocators) with `other`.
    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other)
    }

    /// Moves every value of `other` onto the end of `self`, leaving `other`
    /// empty. `other` keeps its block.
    #[track_caller]
    pub fn append<B: Allocator>(&mut self, other: &mut Vector<T, B>) {
        if !other.is_empty() {
            self.move_in(self.len, other);
        }
    }

    /// Appends clones of `items`.
    #[track_caller]
    pub fn extend_from_slice(&mut self, items: &[T])
    where
        T: Clone,
    {
        self.grow_for(items.len());
        let base = self.buf.ptr();
        let mut len = SetLenOnDrop::new(&mut self.len);
        // SAFETY: growth made room for `items.len()` more values.
        unsafe { T::write_cloned(items, base, &mut len.local_len) };
    }

    /// Converts into a [`Buffer`] holding exactly the live values.
    #[track_caller]
    pub fn into_buffer(mut self) -> Buffer<T, A> {
        self.shrink_to_fit();
        let me = ManuallyDrop::new(self);
        // SAFETY: `me` is never used or dropped again. After the shrink every
        // slot is live (zero-sized values take the length as their count).
        unsafe {
            let (ptr, _, alloc) = ptr::read(&me.buf).into_raw_parts();
            Buffer::from_block(RawBlock::from_raw_parts_in(ptr, me.len, alloc))
        }
    }

    /// Iterates over the values.
    #[inline]
    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    /// Iterates mutably over the values.
    #[inline]
    pub fn iter_mut(&mut self) -> slice::IterMut<'_, T> {
        self.as_mut_slice().iter_mut()
    }

    /// Appends `n` values; values written before a panic are kept.
    #[track_caller]
    fn extend_with<E: ExtendWith<T>>(&mut self, n: usize, mut value: E) {
        self.grow_for(n);
        // SAFETY: growth made room for `n` more values; the length follows
        // every write.
        unsafe {
            let mut ptr = self.buf.ptr().add(self.len);
            let mut len = SetLenOnDrop::new(&mut self.len);
            for _ in 1..n {
                ptr::write(ptr, value.next());
                ptr = ptr.add(1);
                len.increment_len(1);
            }
            if n > 0 {
                ptr::write(ptr, value.last());
                len.increment_len(1);
            }
        }
    }

    /// Appends `n` values into spare capacity; if producing one panics, the
    /// ones already appended are dropped again.
    fn fill_or_roll_back<E: ExtendWith<T>>(&mut self, n: usize, mut value: E) {
        debug_assert!(n <= self.remain());
        let start = self.len;
        let guard = Rollback { vec: self, start };
        for _ in 1..n {
            let next = value.next();
            // SAFETY: fewer than `n` of the spare slots have been written.
            unsafe { guard.vec.buf.ptr().add(guard.vec.len).write(next) };
            guard.vec.len += 1;
        }
        if n > 0 {
            let last = value.last();
            // SAFETY: exactly one of the `n` spare slots remains.
            unsafe { guard.vec.buf.ptr().add(guard.vec.len).write(last) };
            guard.vec.len += 1;
        }
        mem::forget(guard);
    }

    fn extend_desugared<I: Iterator<Item = T>>(&mut self, mut iter: I) {
        while let Some(value) = iter.next() {
            if self.len == self.capacity() {
                let (lower, _) = iter.size_hint();
                self.grow_for(lower.saturating_add(1));
            }
            // SAFETY: there is room for one more; `len` follows every write in
            // case `next` panics.
            unsafe { self.buf.ptr().add(self.len).write(value) };
            self.len += 1;
        }
    }
}

/// Drops every value appended past `start` and retracts `len` to it, unless
/// forgotten.
struct Rollback<'a, T, A: Allocator> {
    vec: &'a mut Vector<T, A>,
    start: usize,
}

impl<T, A: Allocator> Drop for Rollback<'_, T, A> {
    fn drop(&mut self) {
        let appended = self.vec.len - self.start;
        alloc_debug!("rolling back {} appended values", appended);
        // SAFETY: `[start, len)` was appended under this guard.
        unsafe {
            let tail = ptr::slice_from_raw_parts_mut(self.vec.buf.ptr().add(self.start), appended);
            self.vec.len = self.start;
            ptr::drop_in_place(tail);
        }
    }
}

/// A run of uninitialised slots opened inside a vector by an insertion.
///
/// Layout while open: `[0, pos)` live, `[pos, pos + filled)` written so far,
/// `[pos + filled, pos + count)` uninitialised, then `tail` live values. The
/// vector's `len` is `pos` meanwhile. Dropping the gap (on unwind) drops what
/// was written and moves the tail back.
struct Gap<'a, T, A: Allocator> {
    vec: &'a mut Vector<T, A>,
    pos: usize,
    count: usize,
    filled: usize,
    tail: usize,
}

impl<T, A: Allocator> Gap<'_, T, A> {
    fn first_slot(&mut self) -> *mut T {
        // SAFETY: `pos` is within the block.
        unsafe { self.vec.buf.ptr().add(self.pos) }
    }

    /// # Safety
    ///
    /// `self.filled < self.count`.
    #[inline]
    unsafe fn write(&mut self, value: T) {
        debug_assert!(self.filled < self.count);
        unsafe { self.first_slot().add(self.filled).write(value) };
        self.filled += 1;
    }

    /// Commits the written values, closing up any unused part of the gap.
    /// Returns the index just past the inserted run.
    fn close(self) -> usize {
        let mut me = ManuallyDrop::new(self);
        let (pos, count, filled, tail) = (me.pos, me.count, me.filled, me.tail);
        if filled < count {
            // SAFETY: the tail is live and moves down over unused slots.
            unsafe {
                let base = me.vec.buf.ptr();
                ptr::copy(base.add(pos + count), base.add(pos + filled), tail);
            }
        }
        me.vec.len = pos + filled + tail;
        pos + filled
    }
}

impl<T, A: Allocator> Drop for Gap<'_, T, A> {
    fn drop(&mut self) {
        alloc_debug!("rolling back insertion of {} values at {}", self.filled, self.pos);
        // SAFETY: exactly `filled` values were written at `pos`; the tail is
        // live at `pos + count`.
        unsafe {
            let base = self.vec.buf.ptr();
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(base.add(self.pos), self.filled));
            ptr::copy(base.add(self.pos + self.count), base.add(self.pos), self.tail);
        }
        self.vec.len = self.pos + self.tail;
    }
}

/// Moves the survivors of an erase down over the erased range when dropped.
struct CloseTail<'a, T, A: Allocator> {
    vec: &'a mut Vector<T, A>,
    start: usize,
    end: usize,
    tail: usize,
}

impl<T, A: Allocator> Drop for CloseTail<'_, T, A> {
    fn drop(&mut self) {
        // SAFETY: the tail is live at `end`; `[start, end)` has been dropped.
        unsafe {
            let base = self.vec.buf.ptr();
            ptr::copy(base.add(self.end), base.add(self.start), self.tail);
        }
        self.vec.len = self.start + self.tail;
    }
}

// Set the length of the vector when the `SetLenOnDrop` value goes out of scope.
//
// The length field in SetLenOnDrop is a local variable that the optimizer
// will see does not alias with any stores through the vector's data pointer.
struct SetLenOnDrop<'a> {
    len: &'a mut usize,
    local_len: usize,
}

impl<'a> SetLenOnDrop<'a> {
    #[inline]
    fn new(len: &'a mut usize) -> Self {
        SetLenOnDrop { local_len: *len, len }
    }

    #[inline]
    fn increment_len(&mut self, increment: usize) {
        self.local_len += increment;
    }
}

impl Drop for SetLenOnDrop<'_> {
    #[inline]
    fn drop(&mut self) {
        *self.len = self.local_len;
    }
}

/// A source of fill values: clones of one value, or calls to a closure.
trait ExtendWith<T> {
    fn next(&mut self) -> T;
    fn last(self) -> T;
}

struct ExtendElement<T>(T);

impl<T: Clone> ExtendWith<T> for ExtendElement<T> {
    fn next(&mut self) -> T {
        self.0.clone()
    }
    fn last(self) -> T {
        self.0
    }
}

struct ExtendFunc<F>(F);

impl<T, F: FnMut() -> T> ExtendWith<T> for ExtendFunc<F> {
    fn next(&mut self) -> T {
        (self.0)()
    }
    fn last(mut self) -> T {
        (self.0)()
    }
}

#[track_caller]
fn resolve_range<R: RangeBounds<usize>>(range: R, len: usize) -> Range<usize> {
    let start = match range.start_bound() {
        Bound::Included(&start) => start,
        Bound::Excluded(&start) => start.saturating_add(1),
        Bound::Unbounded => 0,
    };
    let end = match range.end_bound() {
        Bound::Included(&end) => end.saturating_add(1),
        Bound::Excluded(&end) => end,
        Bound::Unbounded => len,
    };
    assert!(start <= end, "range start (is {start}) should be <= range end (is {end})");
    assert!(end <= len, "range end (is {end}) should be <= len (is {len})");
    start..end
}

cfg_if! {
    if #[cfg(feature = "dropck_eyepatch")] {
        unsafe impl<#[may_dangle] T, A: Allocator> Drop for Vector<T, A> {
            fn drop(&mut self) {
                // SAFETY: the live values are dropped once; the block follows.
                unsafe { ptr::drop_in_place(self.as_mut_slice()) }
            }
        }
    } else {
        impl<T, A: Allocator> Drop for Vector<T, A> {
            fn drop(&mut self) {
                // SAFETY: the live values are dropped once; the block follows.
                unsafe { ptr::drop_in_place(self.as_mut_slice()) }
            }
        }
    }
}

impl<T, A: Allocator> Deref for Vector<T, A> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, A: Allocator> DerefMut for Vector<T, A> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: Clone, A: Allocator + Clone> Clone for Vector<T, A> {
    fn clone(&self) -> Self {
        Self::from_slice_in(self, self.allocator())
    }
}

impl<T, A: Allocator + Default> Default for Vector<T, A> {
    fn default() -> Self {
        Self::new_in(A::default())
    }
}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for Vector<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T, U, A1, A2> PartialEq<Vector<U, A2>> for Vector<T, A1>
where
    T: PartialEq<U>,
    A1: Allocator,
    A2: Allocator,
{
    fn eq(&self, other: &Vector<U, A2>) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T, U, A: Allocator> PartialEq<[U]> for Vector<T, A>
where
    T: PartialEq<U>,
{
    fn eq(&self, other: &[U]) -> bool {
        self.as_slice() == other
    }
}

impl<T, U, A: Allocator> PartialEq<&[U]> for Vector<T, A>
where
    T: PartialEq<U>,
{
    fn eq(&self, other: &&[U]) -> bool {
        self.as_slice() == *other
    }
}

impl<T, U, A: Allocator, const N: usize> PartialEq<[U; N]> for Vector<T, A>
where
    T: PartialEq<U>,
{
    fn eq(&self, other: &[U; N]) -> bool {
        self.as_slice() == other
    }
}

impl<T: Eq, A: Allocator> Eq for Vector<T, A> {}

impl<T: PartialOrd, A: Allocator> PartialOrd for Vector<T, A> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.as_slice().partial_cmp(other.as_slice())
    }
}

impl<T: Ord, A: Allocator> Ord for Vector<T, A> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_slice().cmp(other.as_slice())
    }
}

impl<T: Hash, A: Allocator> Hash for Vector<T, A> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_slice().hash(state)
    }
}

impl<T> FromIterator<T> for Vector<T> {
    #[track_caller]
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_iter_in(iter, Global)
    }
}

impl<T, const N: usize> From<[T; N]> for Vector<T> {
    #[track_caller]
    fn from(array: [T; N]) -> Self {
        let array = ManuallyDrop::new(array);
        let mut vec = Self::with_capacity(Self::initial_capacity(N));
        // SAFETY: the array's values move into the fresh block and the array
        // is never dropped.
        unsafe {
            ptr::copy_nonoverlapping(array.as_ptr(), vec.as_mut_ptr(), N);
            vec.set_len(N);
        }
        vec
    }
}

impl<T, A: Allocator> From<Buffer<T, A>> for Vector<T, A> {
    /// Adopts the buffer's block; no values move.
    fn from(buffer: Buffer<T, A>) -> Self {
        let len = buffer.len();
        Self { buf: buffer.into_block(), len }
    }
}

impl<T, A: Allocator> Extend<T> for Vector<T, A> {
    #[track_caller]
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.extend_desugared(iter.into_iter())
    }

    #[cfg(feature = "extend_one")]
    #[inline]
    fn extend_one(&mut self, item: T) {
        self.push(item);
    }

    #[cfg(feature = "extend_one")]
    #[inline]
    fn extend_reserve(&mut self, additional: usize) {
        self.reserve_additional(additional);
    }
}

impl<'a, T: Copy + 'a, A: Allocator> Extend<&'a T> for Vector<T, A> {
    #[track_caller]
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend_desugared(iter.into_iter().copied())
    }

    #[cfg(feature = "extend_one")]
    #[inline]
    fn extend_one(&mut self, &item: &'a T) {
        self.push(item);
    }

    #[cfg(feature = "extend_one")]
    #[inline]
    fn extend_reserve(&mut self, additional: usize) {
        self.reserve_additional(additional);
    }
}

impl<T, A: Allocator> IntoIterator for Vector<T, A> {
    type Item = T;
    type IntoIter = IntoIter<T, A>;

    /// Moves the values out front to back.
    fn into_iter(self) -> IntoIter<T, A> {
        let me = ManuallyDrop::new(self);
        // SAFETY: `me` is never used or dropped again.
        let buf = unsafe { ptr::read(&me.buf) };
        IntoIter::new(buf, me.len)
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a Vector<T, A> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> slice::Iter<'a, T> {
        self.iter()
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a mut Vector<T, A> {
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;

    fn into_iter(self) -> slice::IterMut<'a, T> {
        self.iter_mut()
    }
}

/// An owning iterator over the values of a [`Vector`] or
/// [`Buffer`](super::Buffer).
///
/// Values not yet yielded are dropped with the iterator, after which the
/// block is released.
pub struct IntoIter<T, A: Allocator = Global> {
    block: RawBlock<T, A>,
    start: usize,
    end: usize,
}

impl<T, A: Allocator> IntoIter<T, A> {
    /// Takes over `block`, whose first `len` slots are live.
    pub(crate) fn new(block: RawBlock<T, A>, len: usize) -> Self {
        Self { block, start: 0, end: len }
    }

    /// The values not yet yielded.
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: `[start, end)` is live.
        unsafe { slice::from_raw_parts(self.block.ptr().add(self.start), self.end - self.start) }
    }

    /// The values not yet yielded, mutably.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: `[start, end)` is live.
        unsafe {
            slice::from_raw_parts_mut(self.block.ptr().add(self.start), self.end - self.start)
        }
    }
}

impl<T, A: Allocator> Iterator for IntoIter<T, A> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<T> {
        if self.start == self.end {
            None
        } else {
            // SAFETY: `start` is live and leaves the live range.
            let value = unsafe { self.block.ptr().add(self.start).read() };
            self.start += 1;
            Some(value)
        }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.end - self.start;
        (len, Some(len))
    }

    #[inline]
    fn count(self) -> usize {
        self.len()
    }
}

impl<T, A: Allocator> DoubleEndedIterator for IntoIter<T, A> {
    #[inline]
    fn next_back(&mut self) -> Option<T> {
        if self.start == self.end {
            None
        } else {
            self.end -= 1;
            // SAFETY: `end` was live and has left the live range.
            Some(unsafe { self.block.ptr().add(self.end).read() })
        }
    }
}

impl<T, A: Allocator> ExactSizeIterator for IntoIter<T, A> {}

impl<T, A: Allocator> FusedIterator for IntoIter<T, A> {}

#[cfg(feature = "trusted_len")]
unsafe impl<T, A: Allocator> core::iter::TrustedLen for IntoIter<T, A> {}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for IntoIter<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IntoIter").field(&self.as_slice()).finish()
    }
}

impl<T: Clone, A: Allocator + Clone> Clone for IntoIter<T, A> {
    fn clone(&self) -> Self {
        Vector::from_slice_in(self.as_slice(), self.block.allocator().clone()).into_iter()
    }
}

cfg_if! {
    if #[cfg(feature = "dropck_eyepatch")] {
        unsafe impl<#[may_dangle] T, A: Allocator> Drop for IntoIter<T, A> {
            fn drop(&mut self) {
                // SAFETY: the values not yet yielded are dropped once; the
                // block is released afterwards.
                unsafe { ptr::drop_in_place(self.as_mut_slice()) }
            }
        }
    } else {
        impl<T, A: Allocator> Drop for IntoIter<T, A> {
            fn drop(&mut self) {
                // SAFETY: the values not yet yielded are dropped once; the
                // block is released afterwards.
                unsafe { ptr::drop_in_place(self.as_mut_slice()) }
            }
        }
    }
}
