//! A fixed-population owned buffer.
//!
//! A [`Buffer`] owns one contiguous block whose every slot holds a live value:
//! there is no separate "used" count, so its length *is* its capacity. It is a
//! fill-once primitive for building blocks of known (or discoverable) size;
//! variable-length sequences belong in a [`Vector`](super::Vector).
//!
//! # Examples
//!
//! ```
//! use tourney::Buffer;
//!
//! // A zero size selects the default capacity.
//! let zeroes: Buffer<i32> = Buffer::with_len(0);
//! assert_eq!(zeroes.len(), 64);
//! assert!(zeroes.iter().all(|&x| x == 0));
//!
//! // Negative indices count from the end.
//! let letters: Buffer<char> = "abcde".chars().collect();
//! assert_eq!(*letters.at(-1), 'e');
//! assert_eq!(*letters.at(1), 'b');
//! ```

use core::cmp;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::mem::{self, ManuallyDrop};
use core::ops::{Deref, DerefMut};
use core::ptr;
use core::slice;

use cfg_if::cfg_if;

use super::raw_block::{PartialFill, RawBlock, ReleaseOnDrop, WriteCloned};
use super::{handle_reserve, resolve_index, TryReserveError, TryReserveErrorKind};
use crate::polyfill::{Allocator, Global};

pub use super::vector::IntoIter;

#[cfg(test)]
mod tests;

/// Slot count used when a buffer is requested with size zero, and the
/// starting capacity when consuming input of unknown length.
pub const DEFAULT_CAPACITY: usize = 64;

/// An owned block of exactly [`len`](Buffer::len) live values.
///
/// Invariant: if the buffer holds storage, every one of its `capacity` slots
/// is initialised. Growing or shrinking replaces the whole block.
pub struct Buffer<T, A: Allocator = Global> {
    block: RawBlock<T, A>,
}

impl<T> Buffer<T> {
    /// Creates an empty buffer that holds no storage.
    #[must_use]
    pub const fn new() -> Self {
        Self::new_in(Global)
    }

    /// Creates a buffer of `len` default values; `0` selects
    /// [`DEFAULT_CAPACITY`].
    #[must_use]
    #[track_caller]
    pub fn with_len(len: usize) -> Self
    where
        T: Default,
    {
        Self::with_len_in(len, Global)
    }

    /// Creates a buffer of `len` clones of `value`; `0` selects
    /// [`DEFAULT_CAPACITY`].
    #[must_use]
    #[track_caller]
    pub fn from_elem(value: T, len: usize) -> Self
    where
        T: Clone,
    {
        Self::from_elem_in(value, len, Global)
    }

    /// Creates a buffer holding clones of `items`, allocated at exactly
    /// `items.len()` slots.
    #[must_use]
    #[track_caller]
    pub fn from_slice(items: &[T]) -> Self
    where
        T: Clone,
    {
        Self::from_slice_in(items, Global)
    }
}

impl<T, A: Allocator> Buffer<T, A> {
    /// Creates an empty buffer that holds no storage.
    #[must_use]
    pub const fn new_in(alloc: A) -> Self {
        Self { block: RawBlock::new_in(alloc) }
    }

    /// Creates a buffer of `len` default values in `alloc`; `0` selects
    /// [`DEFAULT_CAPACITY`].
    ///
    /// If `T::default` panics, the values already made are dropped and the
    /// storage released before the panic continues.
    #[track_caller]
    pub fn with_len_in(len: usize, alloc: A) -> Self
    where
        T: Default,
    {
        Self::from_fn_in(Self::substitute_default(len), alloc, |_| T::default())
    }

    /// Creates a buffer of `len` clones of `value` in `alloc`; `0` selects
    /// [`DEFAULT_CAPACITY`].
    ///
    /// ```
    /// use tourney::{Buffer, Global};
    ///
    /// let buf = Buffer::from_elem_in("x", 3, Global);
    /// assert_eq!(*buf, ["x", "x", "x"]);
    /// ```
    #[track_caller]
    pub fn from_elem_in(value: T, len: usize, alloc: A) -> Self
    where
        T: Clone,
    {
        let len = Self::substitute_default(len);
        let mut fill = PartialFill::new(RawBlock::allocate_in(len, alloc));
        // SAFETY: the loops write exactly `len` values.
        unsafe {
            for _ in 1..len {
                fill.push_unchecked(value.clone());
            }
            fill.push_unchecked(value);
        }
        Self::from_complete(fill)
    }

    /// Creates a buffer of `len` values produced by `f(index)`, allocated at
    /// exactly `len` slots (no storage for `0`).
    ///
    /// ```
    /// use tourney::{Buffer, Global};
    ///
    /// let squares = Buffer::from_fn_in(4, Global, |i| i * i);
    /// assert_eq!(*squares, [0, 1, 4, 9]);
    /// ```
    #[track_caller]
    pub fn from_fn_in<F>(len: usize, alloc: A, f: F) -> Self
    where
        F: FnMut(usize) -> T,
    {
        handle_reserve(Self::try_from_fn_in(len, alloc, f))
    }

    /// Fallible variant of [`from_fn_in`](Self::from_fn_in); nothing is
    /// called if the block cannot be allocated.
    pub(crate) fn try_from_fn_in<F>(len: usize, alloc: A, mut f: F) -> Result<Self, TryReserveError>
    where
        F: FnMut(usize) -> T,
    {
        let mut fill = PartialFill::new(RawBlock::try_allocate_in(len, alloc)?);
        while fill.filled < len {
            let value = f(fill.filled);
            // SAFETY: `filled < len`.
            unsafe { fill.push_unchecked(value) };
        }
        Ok(Self::from_complete(fill))
    }

    /// Creates a buffer holding clones of `items` in `alloc`, allocated at
    /// exactly `items.len()` slots (no storage for an empty slice).
    #[track_caller]
    pub fn from_slice_in(items: &[T], alloc: A) -> Self
    where
        T: Clone,
    {
        let mut fill = PartialFill::new(RawBlock::allocate_in(items.len(), alloc));
        let base = fill.block.ptr();
        // SAFETY: the block has exactly `items.len()` fresh slots.
        unsafe { T::write_cloned(items, base, &mut fill.filled) };
        Self::from_complete(fill)
    }

    /// Creates a buffer from the items of `iter`.
    ///
    /// Input whose length is known up front (an exact `size_hint`) is written
    /// straight into a block of exactly that size. Otherwise the buffer starts
    /// at [`DEFAULT_CAPACITY`] slots, doubles whenever it is full and more
    /// input arrives, and is trimmed to an exact fit at the end. No input
    /// yields an empty buffer holding no storage.
    ///
    /// If the iterator panics, everything produced so far is dropped and all
    /// storage released.
    ///
    /// ```
    /// use tourney::{Buffer, Global};
    ///
    /// let evens = Buffer::from_iter_in((0..100).filter(|x| x % 2 == 0), Global);
    /// assert_eq!(evens.len(), 50);
    /// assert_eq!(evens[49], 98);
    /// ```
    #[track_caller]
    pub fn from_iter_in<I>(iter: I, alloc: A) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let iter = iter.into_iter();
        match iter.size_hint() {
            (lower, Some(upper)) if lower == upper => Self::from_exact_iter(iter, lower, alloc),
            _ => Self::from_single_pass(iter, alloc),
        }
    }

    #[track_caller]
    fn from_exact_iter<I: Iterator<Item = T>>(mut iter: I, len: usize, alloc: A) -> Self {
        let mut fill = PartialFill::new(RawBlock::allocate_in(len, alloc));
        while fill.filled < len {
            match iter.next() {
                // SAFETY: `filled < len`.
                Some(value) => unsafe { fill.push_unchecked(value) },
                // The iterator overstated its length.
                None => return Self::trimmed(fill),
            }
        }
        // Anything the iterator failed to announce goes in after.
        Self::fill_rest(fill, iter)
    }

    #[track_caller]
    fn from_single_pass<I: Iterator<Item = T>>(iter: I, alloc: A) -> Self {
        Self::fill_rest(PartialFill::new(RawBlock::allocate_in(DEFAULT_CAPACITY, alloc)), iter)
    }

    /// Appends the rest of `iter`, doubling the block whenever it is full,
    /// then trims to fit.
    #[track_caller]
    fn fill_rest<I: Iterator<Item = T>>(mut fill: PartialFill<T, A>, iter: I) -> Self {
        for value in iter {
            if fill.filled == fill.block.capacity() {
                let filled = fill.filled;
                let doubled = handle_reserve(
                    filled.checked_mul(2).ok_or(TryReserveErrorKind::CapacityOverflow.into()),
                );
                let grown = cmp::max(doubled, DEFAULT_CAPACITY);
                // SAFETY: every slot of the full block is live and carried over.
                handle_reserve(unsafe { fill.block.try_reallocate(grown, filled) });
            }
            // SAFETY: the block was just grown if it was full.
            unsafe { fill.push_unchecked(value) };
        }
        Self::trimmed(fill)
    }

    #[track_caller]
    fn trimmed(mut fill: PartialFill<T, A>) -> Self {
        if fill.filled < fill.block.capacity() {
            let filled = fill.filled;
            // SAFETY: only the first `filled` slots are live.
            handle_reserve(unsafe { fill.block.try_reallocate(filled, filled) });
        }
        Self::from_complete(fill)
    }

    fn from_complete(fill: PartialFill<T, A>) -> Self {
        let (block, filled) = fill.finish();
        debug_assert_eq!(filled, block.capacity());
        Self { block }
    }

    fn substitute_default(len: usize) -> usize {
        if len == 0 {
            DEFAULT_CAPACITY
        } else {
            len
        }
    }

    /// Adopts a block whose every slot is live.
    ///
    /// # Safety
    ///
    /// All `block.capacity()` slots must be initialised.
    pub(crate) unsafe fn from_block(block: RawBlock<T, A>) -> Self {
        Self { block }
    }

    /// Gives up the block without dropping the values in it; they become the
    /// caller's responsibility.
    pub(crate) fn into_block(self) -> RawBlock<T, A> {
        let me = ManuallyDrop::new(self);
        // SAFETY: `me` is never used or dropped again.
        unsafe { ptr::read(&me.block) }
    }

    /// The number of values, which is also the number of slots.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.block.capacity()
    }

    /// The number of slots; always equal to [`len`](Self::len).
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.block.capacity()
    }

    /// Whether the buffer holds no values.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a copy of the allocator state.
    #[must_use]
    pub fn allocator(&self) -> A
    where
        A: Clone,
    {
        self.block.allocator().clone()
    }

    pub(crate) fn allocator_ref(&self) -> &A {
        self.block.allocator()
    }

    /// Raw pointer to the first slot (dangling when empty).
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.block.ptr()
    }

    /// Raw mutable pointer to the first slot (dangling when empty).
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.block.ptr()
    }

    /// The values as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: every slot is live.
        unsafe { slice::from_raw_parts(self.block.ptr(), self.len()) }
    }

    /// The values as a mutable slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: every slot is live.
        unsafe { slice::from_raw_parts_mut(self.block.ptr(), self.len()) }
    }

    /// The value at `index`, where a negative index counts back from the end
    /// (`-1` is the last value).
    ///
    /// # Panics
    ///
    /// Panics if the resolved index is out of bounds.
    #[track_caller]
    pub fn at(&self, index: isize) -> &T {
        &self.as_slice()[resolve_index(index, self.len())]
    }

    /// Mutable variant of [`at`](Self::at).
    #[track_caller]
    pub fn at_mut(&mut self, index: isize) -> &mut T {
        let index = resolve_index(index, self.len());
        &mut self.as_mut_slice()[index]
    }

    /// Drops every value and releases the storage. The buffer is empty
    /// afterwards and holds no storage.
    pub fn clear(&mut self) {
        let values: *mut [T] = self.as_mut_slice();
        let _release = ReleaseOnDrop(&mut self.block);
        // SAFETY: the values are dropped exactly once; the block is released
        // afterwards even if one of them panics.
        unsafe { ptr::drop_in_place(values) };
    }

    /// Moves the contents out, leaving `self` empty with no storage.
    ///
    /// ```
    /// use tourney::Buffer;
    ///
    /// let mut a = Buffer::from_slice(&[1, 2, 3]);
    /// let b = a.take();
    /// assert!(a.is_empty());
    /// assert_eq!(*b, [1, 2, 3]);
    /// ```
    #[must_use = "use `clear` to drop the contents"]
    pub fn take(&mut self) -> Self
    where
        A: Clone,
    {
        let empty = Self::new_in(self.allocator());
        mem::replace(self, empty)
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
}

cfg_if! {
    if #[cfg(feature = "dropck_eyepatch")] {
        unsafe impl<#[may_dangle] T, A: Allocator> Drop for Buffer<T, A> {
            fn drop(&mut self) {
                // SAFETY: every slot is live; the block releases its memory afterwards.
                unsafe { ptr::drop_in_place(self.as_mut_slice()) }
            }
        }
    } else {
        impl<T, A: Allocator> Drop for Buffer<T, A> {
            fn drop(&mut self) {
                // SAFETY: every slot is live; the block releases its memory afterwards.
                unsafe { ptr::drop_in_place(self.as_mut_slice()) }
            }
        }
    }
}

impl<T, A: Allocator> Deref for Buffer<T, A> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, A: Allocator> DerefMut for Buffer<T, A> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: Clone, A: Allocator + Clone> Clone for Buffer<T, A> {
    fn clone(&self) -> Self {
        Self::from_slice_in(self, self.allocator())
    }
}

impl<T, A: Allocator + Default> Default for Buffer<T, A> {
    /// An empty buffer holding no storage.
    fn default() -> Self {
        Self::new_in(A::default())
    }
}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for Buffer<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T, U, A1, A2> PartialEq<Buffer<U, A2>> for Buffer<T, A1>
where
    T: PartialEq<U>,
    A1: Allocator,
    A2: Allocator,
{
    fn eq(&self, other: &Buffer<U, A2>) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T, U, A: Allocator> PartialEq<[U]> for Buffer<T, A>
where
    T: PartialEq<U>,
{
    fn eq(&self, other: &[U]) -> bool {
        self.as_slice() == other
    }
}

impl<T, U, A: Allocator, const N: usize> PartialEq<[U; N]> for Buffer<T, A>
where
    T: PartialEq<U>,
{
    fn eq(&self, other: &[U; N]) -> bool {
        self.as_slice() == other
    }
}

impl<T: Eq, A: Allocator> Eq for Buffer<T, A> {}

impl<T: Hash, A: Allocator> Hash for Buffer<T, A> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_slice().hash(state)
    }
}

impl<T> FromIterator<T> for Buffer<T> {
    #[track_caller]
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_iter_in(iter, Global)
    }
}

impl<T, A: Allocator> IntoIterator for Buffer<T, A> {
    type Item = T;
    type IntoIter = IntoIter<T, A>;

    /// Moves the values out front to back. Values never yielded are dropped
    /// with the iterator.
    fn into_iter(self) -> IntoIter<T, A> {
        let len = self.len();
        IntoIter::new(self.into_block(), len)
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a Buffer<T, A> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> slice::Iter<'a, T> {
        self.iter()
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a mut Buffer<T, A> {
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;

    fn into_iter(self) -> slice::IterMut<'a, T> {
        self.iter_mut()
    }
}
