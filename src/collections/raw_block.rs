//! The storage core shared by [`Buffer`](super::Buffer), [`Vector`](super::Vector)
//! and [`WinnerTree`](super::WinnerTree): one exclusively owned block of
//! possibly-uninitialised slots obtained from an [`Allocator`].
//!
//! A `RawBlock` knows nothing about which of its slots are live. Dropping it
//! releases the memory and never drops elements; that is the owner's job.

use core::alloc::Layout;
use core::marker::PhantomData;
use core::mem::{self, ManuallyDrop};
use core::ptr::{self, NonNull};

use cfg_if::cfg_if;

use super::{handle_reserve, TryReserveError, TryReserveErrorKind};
use crate::polyfill::{Allocator, Global};

pub(crate) struct RawBlock<T, A: Allocator = Global> {
    ptr: NonNull<T>,
    cap: usize,
    alloc: A,
    _owns: PhantomData<T>,
}

unsafe impl<T: Send, A: Allocator + Send> Send for RawBlock<T, A> {}
unsafe impl<T: Sync, A: Allocator + Sync> Sync for RawBlock<T, A> {}

impl<T, A: Allocator> RawBlock<T, A> {
    pub(crate) const IS_ZST: bool = mem::size_of::<T>() == 0;

    /// An empty block; does not allocate.
    pub(crate) const fn new_in(alloc: A) -> Self {
        Self { ptr: NonNull::dangling(), cap: 0, alloc, _owns: PhantomData }
    }

    /// A block of exactly `cap` slots.
    pub(crate) fn try_allocate_in(cap: usize, alloc: A) -> Result<Self, TryReserveError> {
        let ptr = Self::allocate_slots(cap, &alloc)?;
        Ok(Self { ptr, cap, alloc, _owns: PhantomData })
    }

    #[track_caller]
    pub(crate) fn allocate_in(cap: usize, alloc: A) -> Self {
        handle_reserve(Self::try_allocate_in(cap, alloc))
    }

    /// Reassembles a block from its parts.
    ///
    /// # Safety
    ///
    /// `ptr` must have been allocated by `alloc` for exactly `cap` slots of `T`
    /// (or be dangling when no memory is held).
    pub(crate) unsafe fn from_raw_parts_in(ptr: NonNull<T>, cap: usize, alloc: A) -> Self {
        Self { ptr, cap, alloc, _owns: PhantomData }
    }

    pub(crate) fn into_raw_parts(self) -> (NonNull<T>, usize, A) {
        let me = ManuallyDrop::new(self);
        // SAFETY: `me` is never used or dropped again.
        let alloc = unsafe { ptr::read(&me.alloc) };
        (me.ptr, me.cap, alloc)
    }

    #[inline]
    pub(crate) fn ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// Number of slots. For zero-sized `T` this is the logical slot count;
    /// no memory backs it.
    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.cap
    }

    #[inline]
    pub(crate) fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Moves the first `live` slots into a fresh block of exactly `new_cap`
    /// slots and releases the old block. On failure nothing changes.
    ///
    /// # Safety
    ///
    /// `live <= self.capacity()` and `live <= new_cap`. Slots past `live` are
    /// not carried over, so any of them still holding values must have been
    /// dropped or moved out by the caller.
    pub(crate) unsafe fn try_reallocate(
        &mut self,
        new_cap: usize,
        live: usize,
    ) -> Result<(), TryReserveError> {
        debug_assert!(live <= self.cap && live <= new_cap);

        let new_ptr = Self::allocate_slots(new_cap, &self.alloc)?;
        alloc_trace!(
            "reallocating {} slots ({} live) to {} at {:p}",
            self.cap,
            live,
            new_cap,
            new_ptr
        );
        unsafe {
            if !Self::IS_ZST {
                ptr::copy_nonoverlapping(self.ptr(), new_ptr.as_ptr(), live);
            }
            self.release();
        }
        self.ptr = new_ptr;
        self.cap = new_cap;
        Ok(())
    }

    /// Releases the memory, leaving an empty block.
    ///
    /// # Safety
    ///
    /// Every value still in the block is leaked; the caller must have dropped
    /// or moved them out.
    pub(crate) unsafe fn release(&mut self) {
        if let Some(layout) = self.current_layout() {
            alloc_trace!("releasing {} slots at {:p}", self.cap, self.ptr);
            unsafe { self.alloc.deallocate(self.ptr.cast(), layout) };
        }
        self.ptr = NonNull::dangling();
        self.cap = 0;
    }

    fn current_layout(&self) -> Option<Layout> {
        if Self::IS_ZST || self.cap == 0 {
            None
        } else {
            // SAFETY: this layout was successfully computed when the block was
            // allocated.
            unsafe {
                Some(Layout::from_size_align_unchecked(
                    mem::size_of::<T>() * self.cap,
                    mem::align_of::<T>(),
                ))
            }
        }
    }

    fn allocate_slots(cap: usize, alloc: &A) -> Result<NonNull<T>, TryReserveError> {
        if Self::IS_ZST || cap == 0 {
            return Ok(NonNull::dangling());
        }
        let layout = Layout::array::<T>(cap).map_err(TryReserveErrorKind::from)?;
        match alloc.allocate(layout) {
            Ok(block) => {
                alloc_trace!("allocated {} slots of {} bytes at {:p}", cap, mem::size_of::<T>(), block);
                Ok(block.cast())
            }
            Err(_) => {
                alloc_debug!("allocator refused {} slots ({} bytes)", cap, layout.size());
                Err(TryReserveErrorKind::AllocError { layout }.into())
            }
        }
    }
}

cfg_if! {
    if #[cfg(feature = "dropck_eyepatch")] {
        unsafe impl<#[may_dangle] T, A: Allocator> Drop for RawBlock<T, A> {
            fn drop(&mut self) {
                // SAFETY: owners drop or move out their elements before the block.
                unsafe { self.release() }
            }
        }
    } else {
        impl<T, A: Allocator> Drop for RawBlock<T, A> {
            fn drop(&mut self) {
                // SAFETY: owners drop or move out their elements before the block.
                unsafe { self.release() }
            }
        }
    }
}

/// Releases a block when dropped, leaking whatever values it still holds.
///
/// Used to free storage after its values have been dropped, even when one of
/// those drops panics.
pub(crate) struct ReleaseOnDrop<'a, T, A: Allocator>(pub(crate) &'a mut RawBlock<T, A>);

impl<T, A: Allocator> Drop for ReleaseOnDrop<'_, T, A> {
    fn drop(&mut self) {
        // SAFETY: the owner has dropped (or is dropping) the values.
        unsafe { self.0.release() }
    }
}

/// A block being filled front to back. If dropped before [`finish`], the
/// filled prefix is dropped and the block released.
///
/// [`finish`]: PartialFill::finish
pub(crate) struct PartialFill<T, A: Allocator> {
    pub(crate) block: RawBlock<T, A>,
    pub(crate) filled: usize,
}

impl<T, A: Allocator> PartialFill<T, A> {
    pub(crate) fn new(block: RawBlock<T, A>) -> Self {
        Self { block, filled: 0 }
    }

    /// Writes `value` into the next slot.
    ///
    /// # Safety
    ///
    /// `self.filled < self.block.capacity()`.
    #[inline]
    pub(crate) unsafe fn push_unchecked(&mut self, value: T) {
        debug_assert!(self.filled < self.block.capacity());
        unsafe { self.block.ptr().add(self.filled).write(value) };
        self.filled += 1;
    }

    /// Hands back the block with its filled prefix live.
    pub(crate) fn finish(self) -> (RawBlock<T, A>, usize) {
        let me = ManuallyDrop::new(self);
        // SAFETY: `me` is never used or dropped again.
        (unsafe { ptr::read(&me.block) }, me.filled)
    }
}

impl<T, A: Allocator> Drop for PartialFill<T, A> {
    fn drop(&mut self) {
        if self.filled != 0 {
            alloc_debug!("rolling back {} constructed slots", self.filled);
        }
        // SAFETY: exactly the first `filled` slots were written.
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(self.block.ptr(), self.filled));
        }
    }
}

/// Writes clones of a slice into uninitialised slots.
pub(crate) trait WriteCloned: Sized {
    /// Clones `src[i]` into `base + *filled` in turn, bumping `*filled` after
    /// every write so that a panicking `clone` leaves an exact count behind.
    ///
    /// # Safety
    ///
    /// `src.len()` slots starting at `base + *filled` must be writable and must
    /// not overlap `src`.
    unsafe fn write_cloned(src: &[Self], base: *mut Self, filled: &mut usize);
}

cfg_if! {
    if #[cfg(feature = "specialization")] {
        impl<T: Clone> WriteCloned for T {
            default unsafe fn write_cloned(src: &[T], base: *mut T, filled: &mut usize) {
                for item in src {
                    unsafe { base.add(*filled).write(item.clone()) };
                    *filled += 1;
                }
            }
        }

        impl<T: Copy> WriteCloned for T {
            unsafe fn write_cloned(src: &[T], base: *mut T, filled: &mut usize) {
                unsafe { ptr::copy_nonoverlapping(src.as_ptr(), base.add(*filled), src.len()) };
                *filled += src.len();
            }
        }
    } else {
        impl<T: Clone> WriteCloned for T {
            unsafe fn write_cloned(src: &[T], base: *mut T, filled: &mut usize) {
                for item in src {
                    unsafe { base.add(*filled).write(item.clone()) };
                    *filled += 1;
                }
            }
        }
    }
}
