#![allow(unused_imports)]

use cfg_if::cfg_if;

cfg_if! {
    if #[cfg(feature = "allocator_api")] {
        pub use alloc::alloc::{AllocError, Allocator, Global};
    } else {
        use alloc::alloc::Layout;
        use core::{fmt, ptr::NonNull};

        /// The error returned by an [`Allocator`] that could not satisfy a request.
        #[derive(Copy, Clone, PartialEq, Eq, Debug)]
        pub struct AllocError;

        impl fmt::Display for AllocError {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("memory allocation failed")
            }
        }

        #[cfg(feature = "std")]
        impl std::error::Error for AllocError {}

        /// The allocator capability consumed by every container in this crate.
        ///
        /// This mirrors the unstable `core::alloc::Allocator` trait, which it is
        /// replaced by when the `allocator_api` feature is enabled. Containers
        /// never issue zero-sized requests.
        ///
        /// # Safety
        ///
        /// Memory blocks returned by `allocate` must remain valid until they are
        /// passed to `deallocate` on the same allocator (or a clone of it), and
        /// must satisfy the requested layout.
        pub unsafe trait Allocator {
            /// Attempts to allocate a block of memory fitting `layout`.
            fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError>;

            /// Releases the block at `ptr`.
            ///
            /// # Safety
            ///
            /// `ptr` must denote a block currently allocated by this allocator,
            /// and `layout` must be the layout it was allocated with.
            unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
        }

        unsafe impl<A: Allocator + ?Sized> Allocator for &A {
            #[inline]
            fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
                (**self).allocate(layout)
            }

            #[inline]
            unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
                unsafe { (**self).deallocate(ptr, layout) }
            }
        }

        /// The global memory allocator.
        #[derive(Copy, Clone, Default, Debug)]
        pub struct Global;

        unsafe impl Allocator for Global {
            #[inline]
            fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
                unsafe {
                    let len = layout.size();
                    let data = if len == 0 {
                        layout.align() as *mut u8
                    } else {
                        NonNull::new(alloc::alloc::alloc(layout)).ok_or(AllocError)?.as_ptr()
                    };
                    Ok(NonNull::new_unchecked(core::ptr::slice_from_raw_parts_mut(data, len)))
                }
            }

            #[inline]
            unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
                if layout.size() != 0 {
                    unsafe { alloc::alloc::dealloc(ptr.as_ptr(), layout) }
                }
            }
        }
    }
}
