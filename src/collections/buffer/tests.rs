use super::*;
use crate::testing::crash_test::{CrashTestDummy, Panic};
use crate::testing::recording::RecordingAlloc;
use crate::Vector;
use alloc::vec::Vec;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// An iterator that claims an exact length it does not keep to.
struct Misstated {
    claimed: usize,
    actual: usize,
}

impl Iterator for Misstated {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.actual == 0 {
            None
        } else {
            self.actual -= 1;
            self.claimed = self.claimed.saturating_sub(1);
            Some(self.actual)
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.claimed, Some(self.claimed))
    }
}

#[test]
fn test_with_len_zero_uses_default_capacity() {
    let buf: Buffer<i32> = Buffer::with_len(0);
    assert_eq!(buf.capacity(), 64);
    assert_eq!(buf.len(), 64);
    assert!(buf.iter().all(|&x| x == 0));
}

#[test]
fn test_with_len() {
    let buf: Buffer<i32> = Buffer::with_len(42);
    assert_eq!(buf.capacity(), 42);
    assert!(buf.iter().all(|&x| x == 0));
}

#[test]
fn test_from_elem() {
    let buf = Buffer::from_elem(String::from("v"), 5);
    assert_eq!(buf.len(), 5);
    assert!(buf.iter().all(|s| s == "v"));

    let buf = Buffer::from_elem(7u8, 0);
    assert_eq!(buf.len(), DEFAULT_CAPACITY);
}

#[test]
fn test_from_iter_exact() {
    let alloc = RecordingAlloc::new();
    let buf = Buffer::from_iter_in(0..10, alloc.clone());
    assert_eq!(*buf, [0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
    assert_eq!(buf.capacity(), 10);
    assert_eq!(alloc.allocations(), 1);
    drop(buf);
    assert!(alloc.is_clean());
}

#[test]
fn test_from_iter_exact_empty_does_not_allocate() {
    let alloc = RecordingAlloc::new();
    let buf = Buffer::from_iter_in(core::iter::empty::<u32>(), alloc.clone());
    assert!(buf.is_empty());
    assert_eq!(alloc.allocations(), 0);
}

#[test]
fn test_from_iter_single_pass_grows_and_trims() {
    let alloc = RecordingAlloc::new();
    let buf = Buffer::from_iter_in((0..400).filter(|x| x % 2 == 1), alloc.clone());
    assert_eq!(buf.len(), 200);
    assert_eq!(buf.capacity(), 200);
    assert!(buf.iter().copied().eq((0..400).filter(|x| x % 2 == 1)));
    // 64, 128, 256, then the trim to 200.
    assert_eq!(alloc.allocations(), 4);
    assert_eq!(alloc.outstanding(), 1);
    assert_eq!(alloc.outstanding_bytes(), 200 * core::mem::size_of::<i32>());
}

#[test]
fn test_from_iter_single_pass_exact_fit_keeps_block() {
    let alloc = RecordingAlloc::new();
    let buf = Buffer::from_iter_in((0..64).filter(|_| true), alloc.clone());
    assert_eq!(buf.len(), 64);
    assert_eq!(alloc.allocations(), 1);
}

#[test]
fn test_from_iter_single_pass_empty() {
    let alloc = RecordingAlloc::new();
    let buf = Buffer::from_iter_in((0..10).filter(|_| false), alloc.clone());
    assert!(buf.is_empty());
    assert_eq!(buf.capacity(), 0);
    assert!(alloc.is_clean());
}

#[test]
fn test_from_iter_overstated_length_is_trimmed() {
    let buf: Buffer<usize> = Misstated { claimed: 5, actual: 3 }.collect();
    assert_eq!(*buf, [2, 1, 0]);
    assert_eq!(buf.capacity(), 3);
}

#[test]
fn test_from_iter_understated_length_keeps_extra() {
    let alloc = RecordingAlloc::new();
    let buf = Buffer::from_iter_in(Misstated { claimed: 2, actual: 5 }, alloc.clone());
    assert_eq!(*buf, [4, 3, 2, 1, 0]);
    assert_eq!(buf.capacity(), 5);
    assert_eq!(alloc.outstanding(), 1);
    drop(buf);

    let buf: Buffer<usize> = Misstated { claimed: 0, actual: 3 }.collect();
    assert_eq!(*buf, [2, 1, 0]);
    drop(buf);

    let d = CrashTestDummy::new(0);
    let claimed = Misstated { claimed: 1, actual: 3 };
    let result = catch_unwind(AssertUnwindSafe(|| {
        Buffer::from_iter_in(
            claimed.map(|i| if i == 0 { panic!("input failed") } else { d.spawn(Panic::Never) }),
            alloc.clone(),
        )
    }));
    assert!(result.is_err());
    assert_eq!(d.dropped(), 2);
    assert!(alloc.is_clean());
}

#[test]
fn test_from_slice() {
    let buf = Buffer::from_slice(&["a", "b"]);
    assert_eq!(buf, ["a", "b"]);
    assert!(Buffer::<u8>::from_slice(&[]).is_empty());
}

#[test]
fn test_construction_panic_rolls_back() {
    let alloc = RecordingAlloc::new();
    let dummy = CrashTestDummy::new(0);
    let result = catch_unwind(AssertUnwindSafe(|| {
        Buffer::from_fn_in(5, alloc.clone(), |i| {
            if i == 3 {
                panic!("construction failed");
            }
            dummy.spawn(Panic::Never)
        })
    }));
    assert!(result.is_err());
    assert_eq!(dummy.dropped(), 3);
    assert!(alloc.is_clean());
}

#[test]
fn test_fill_clone_panic_rolls_back() {
    let alloc = RecordingAlloc::new();
    let good = CrashTestDummy::new(0);
    let bad = CrashTestDummy::new(1);
    let result = catch_unwind(AssertUnwindSafe(|| {
        let items = [good.spawn(Panic::Never), good.spawn(Panic::Never), bad.spawn(Panic::InClone)];
        Buffer::from_slice_in(&items, alloc.clone())
    }));
    assert!(result.is_err());
    assert_eq!(good.cloned(), 2);
    // Two originals and their two clones.
    assert_eq!(good.dropped(), 4);
    assert_eq!(bad.dropped(), 1);
    assert!(alloc.is_clean());
}

#[test]
fn test_iterator_panic_rolls_back() {
    let alloc = RecordingAlloc::new();
    let dummy = CrashTestDummy::new(0);
    let result = catch_unwind(AssertUnwindSafe(|| {
        let items = (0..100).map(|i| {
            if i == 70 {
                panic!("input failed");
            }
            dummy.spawn(Panic::Never)
        });
        Buffer::from_iter_in(items.filter(|_| true), alloc.clone())
    }));
    assert!(result.is_err());
    assert_eq!(dummy.dropped(), 70);
    assert!(alloc.is_clean());
}

#[test]
fn test_at_relative() {
    let mut buf = Buffer::from_slice(&[10, 20, 30]);
    assert_eq!(*buf.at(0), 10);
    assert_eq!(*buf.at(-1), 30);
    assert_eq!(*buf.at(-3), 10);
    *buf.at_mut(-2) += 1;
    assert_eq!(buf[1], 21);
}

#[test]
#[should_panic]
fn test_at_out_of_range() {
    let buf = Buffer::from_slice(&[10, 20, 30]);
    let _ = buf.at(3);
}

#[test]
#[should_panic(expected = "relative index")]
fn test_at_relative_out_of_range() {
    let buf = Buffer::from_slice(&[10, 20, 30]);
    let _ = buf.at(-4);
}

#[test]
fn test_clear_releases_storage() {
    let alloc = RecordingAlloc::new();
    let dummy = CrashTestDummy::new(0);
    let mut buf = Buffer::from_fn_in(4, alloc.clone(), |_| dummy.spawn(Panic::Never));
    assert_eq!(alloc.outstanding(), 1);
    buf.clear();
    assert_eq!(dummy.dropped(), 4);
    assert!(buf.is_empty());
    assert!(alloc.is_clean());
}

#[test]
fn test_clear_releases_storage_when_drop_panics() {
    let alloc = RecordingAlloc::new();
    let dummy = CrashTestDummy::new(0);
    let mut buf = Buffer::from_fn_in(3, alloc.clone(), |i| {
        dummy.spawn(if i == 1 { Panic::InDrop } else { Panic::Never })
    });
    assert!(catch_unwind(AssertUnwindSafe(|| buf.clear())).is_err());
    assert_eq!(dummy.dropped(), 3);
    assert!(buf.is_empty());
    assert!(alloc.is_clean());
}

#[test]
fn test_take_leaves_empty() {
    let alloc = RecordingAlloc::new();
    let mut a = Buffer::from_slice_in(&[1, 2, 3], alloc.clone());
    let b = a.take();
    assert!(a.is_empty());
    assert_eq!(a.capacity(), 0);
    assert_eq!(b, [1, 2, 3]);
    assert_eq!(alloc.outstanding(), 1);
    drop(b);
    assert!(alloc.is_clean());
}

#[test]
fn test_clone_is_deep() {
    let alloc = RecordingAlloc::new();
    let a = Buffer::from_slice_in(&[String::from("x"), String::from("y")], alloc.clone());
    let mut b = a.clone();
    b[0].push('!');
    assert_eq!(a[0], "x");
    assert_eq!(b[0], "x!");
    assert_eq!(alloc.outstanding(), 2);
}

#[test]
fn test_into_iter_drops_remainder() {
    let alloc = RecordingAlloc::new();
    let dummy = CrashTestDummy::new(0);
    let buf = Buffer::from_fn_in(5, alloc.clone(), |_| dummy.spawn(Panic::Never));
    let mut iter = buf.into_iter();
    let first = iter.next();
    let last = iter.next_back();
    assert_eq!(iter.len(), 3);
    drop(iter);
    assert_eq!(dummy.dropped(), 3);
    drop((first, last));
    assert_eq!(dummy.dropped(), 5);
    assert!(alloc.is_clean());
}

#[test]
fn test_into_vector() {
    let buf: Buffer<u32> = (1..=3).collect();
    let mut vec = Vector::from(buf);
    assert_eq!(vec.capacity(), 3);
    vec.push(4);
    assert_eq!(vec, [1, 2, 3, 4]);
    let back = vec.into_buffer();
    assert_eq!(back, [1, 2, 3, 4]);
    assert_eq!(back.capacity(), 4);
}

#[test]
fn test_zero_sized() {
    let buf: Buffer<()> = Buffer::with_len(0);
    assert_eq!(buf.len(), 64);
    let buf: Buffer<()> = (0..1000).map(|_| ()).filter(|_| true).collect();
    assert_eq!(buf.len(), 1000);
    assert_eq!(buf.into_iter().count(), 1000);
}

#[test]
fn test_debug_and_eq() {
    let buf: Buffer<i32> = Vec::from([3, 1]).into_iter().collect();
    assert_eq!(format!("{buf:?}"), "[3, 1]");
    assert_eq!(buf, Buffer::from_slice(&[3, 1]));
    assert_ne!(buf, Buffer::from_slice(&[1, 3]));
}
