//! An allocator that keeps a ledger of the blocks it hands out.

use alloc::alloc::Layout;
use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use core::cell::RefCell;
use core::ptr::NonNull;

use crate::polyfill::{AllocError, Allocator, Global};

#[derive(Debug, Default)]
struct Record {
    outstanding: BTreeMap<usize, Layout>,
    allocations: usize,
    fail_from: Option<usize>,
}

/// Forwards to [`Global`], recording every block that is currently
/// allocated. Clones share one ledger.
///
/// It can be told to refuse requests, to exercise allocation failure paths.
#[derive(Clone, Debug, Default)]
pub struct RecordingAlloc {
    record: Rc<RefCell<Record>>,
}

impl RecordingAlloc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blocks allocated and not yet released.
    pub fn outstanding(&self) -> usize {
        self.record.borrow().outstanding.len()
    }

    /// Total bytes in outstanding blocks.
    pub fn outstanding_bytes(&self) -> usize {
        self.record.borrow().outstanding.values().map(Layout::size).sum()
    }

    /// Number of allocation requests seen, including refused ones.
    pub fn allocations(&self) -> usize {
        self.record.borrow().allocations
    }

    pub fn is_clean(&self) -> bool {
        self.outstanding() == 0
    }

    /// Refuses every request from now on.
    pub fn fail_from_now(&self) {
        let mut record = self.record.borrow_mut();
        record.fail_from = Some(record.allocations);
    }

    /// Refuses every request after the next `n` succeed.
    pub fn fail_after(&self, n: usize) {
        let mut record = self.record.borrow_mut();
        record.fail_from = Some(record.allocations + n);
    }

    pub fn stop_failing(&self) {
        self.record.borrow_mut().fail_from = None;
    }
}

unsafe impl Allocator for RecordingAlloc {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        let mut record = self.record.borrow_mut();
        let nth = record.allocations;
        record.allocations += 1;
        if record.fail_from.map_or(false, |from| nth >= from) {
            return Err(AllocError);
        }
        let block = Global.allocate(layout)?;
        record.outstanding.insert(block.cast::<u8>().as_ptr() as usize, layout);
        Ok(block)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        let known = self.record.borrow_mut().outstanding.remove(&(ptr.as_ptr() as usize));
        assert_eq!(known, Some(layout), "released a block this allocator does not own");
        unsafe { Global.deallocate(ptr, layout) }
    }
}
