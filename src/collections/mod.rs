//! Allocator-aware collections and the algorithms they are built from.

mod raw_block;

pub mod buffer;
pub mod heap;
pub mod priority_queue;
pub mod vector;
pub mod winner_tree;

#[doc(no_inline)]
pub use buffer::Buffer;

#[doc(no_inline)]
pub use priority_queue::PriorityQueue;

#[doc(no_inline)]
pub use vector::Vector;

#[doc(no_inline)]
pub use winner_tree::WinnerTree;

use alloc::alloc::{Layout, LayoutError};
use core::fmt::{self, Display};

/// The error type for `try_*` methods that may need to allocate.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct TryReserveError {
    kind: TryReserveErrorKind,
}

impl TryReserveError {
    /// Details about the allocation that caused the error
    #[inline]
    #[must_use]
    pub fn kind(&self) -> TryReserveErrorKind {
        self.kind.clone()
    }
}

/// Details of the allocation that caused a [`TryReserveError`]
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum TryReserveErrorKind {
    /// Error due to the computed capacity exceeding the collection's maximum
    /// (usually `isize::MAX` bytes).
    CapacityOverflow,

    /// The memory allocator returned an error
    AllocError {
        /// The layout of allocation request that failed
        layout: Layout,
    },
}

impl From<TryReserveErrorKind> for TryReserveError {
    #[inline]
    fn from(kind: TryReserveErrorKind) -> Self {
        Self { kind }
    }
}

impl From<LayoutError> for TryReserveErrorKind {
    /// Always evaluates to [`TryReserveErrorKind::CapacityOverflow`].
    #[inline]
    fn from(_: LayoutError) -> Self {
        TryReserveErrorKind::CapacityOverflow
    }
}

impl Display for TryReserveError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str("memory allocation failed")?;
        let reason = match self.kind {
            TryReserveErrorKind::CapacityOverflow => {
                " because the computed capacity exceeded the collection's maximum"
            }
            TryReserveErrorKind::AllocError { .. } => {
                " because the memory allocator returned an error"
            }
        };
        fmt.write_str(reason)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for TryReserveError {}

/// Converts the outcome of a fallible reservation into the behaviour of the
/// infallible API: capacity overflow panics, allocator failure goes through
/// [`handle_alloc_error`](alloc::alloc::handle_alloc_error).
#[inline]
#[track_caller]
pub(crate) fn handle_reserve<R>(result: Result<R, TryReserveError>) -> R {
    match result {
        Ok(value) => value,
        Err(err) => match err.kind {
            TryReserveErrorKind::CapacityOverflow => capacity_overflow(),
            TryReserveErrorKind::AllocError { layout } => {
                alloc::alloc::handle_alloc_error(layout)
            }
        },
    }
}

#[cold]
#[track_caller]
fn capacity_overflow() -> ! {
    panic!("capacity overflow");
}

/// Resolves a possibly end-relative index: `-1` is the last element.
#[inline]
#[track_caller]
pub(crate) fn resolve_index(index: isize, len: usize) -> usize {
    if index >= 0 {
        index as usize
    } else {
        let back = index.unsigned_abs();
        assert!(back <= len, "relative index (is {index}) out of range for length {len}");
        len - back
    }
}
