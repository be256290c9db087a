use super::*;
use crate::test_helpers::test_rng;
use crate::testing::crash_test::{CrashTestDummy, Instance, Panic};
use crate::testing::recording::RecordingAlloc;
use crate::ReverseOrder;
use alloc::vec::Vec;
use core::cell::Cell;
use rand::Rng;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Leftmost index holding the greatest value.
fn leftmost_max(values: &[u32]) -> Option<usize> {
    let max = values.iter().max()?;
    values.iter().position(|x| x == max)
}

fn check_random_mutations<const K: usize>() {
    let mut rng = test_rng();
    let mut tree = WinnerTree::<u32, OrdTotalOrder<u32>, Global, K>::new_in(OrdTotalOrder::new(), Global);
    let mut mirror: Vec<u32> = Vec::new();
    for _ in 0..400 {
        match rng.gen_range(0..4) {
            0 | 1 => {
                let pos = rng.gen_range(0..=mirror.len());
                let value = rng.gen_range(0..60);
                tree.insert(pos, value);
                mirror.insert(pos, value);
            }
            2 if !mirror.is_empty() => {
                let pos = rng.gen_range(0..mirror.len());
                assert_eq!(tree.erase(pos), mirror.remove(pos));
            }
            _ if !mirror.is_empty() => {
                let pos = rng.gen_range(0..mirror.len());
                let value = rng.gen_range(0..60);
                assert_eq!(tree.replace(pos, value), core::mem::replace(&mut mirror[pos], value));
            }
            _ => {}
        }
        assert_eq!(tree.leaves(), &mirror[..]);
        assert_eq!(tree.champion_index(), leftmost_max(&mirror));
        assert_eq!(tree.champion(), mirror.iter().max());
        if let Some(champion) = tree.champion() {
            assert_eq!(tree.at(0), champion);
        }
    }
}

#[test]
fn test_champion_after_mutations_binary() {
    check_random_mutations::<2>();
}

#[test]
fn test_champion_after_mutations_ternary() {
    check_random_mutations::<3>();
}

#[test]
fn test_champion_after_mutations_wide() {
    check_random_mutations::<7>();
}

#[test]
fn test_empty_and_single() {
    let mut tree: WinnerTree<i32> = WinnerTree::default();
    assert!(tree.is_empty());
    assert_eq!(tree.champion(), None);
    assert_eq!(tree.pop_champion(), None);

    tree.push(4);
    assert_eq!(tree.champion(), Some(&4));
    assert_eq!(tree.champion_index(), Some(0));
    tree.replace(0, -1);
    assert_eq!(tree.champion(), Some(&-1));
    assert_eq!(tree.erase(0), -1);
    assert_eq!(tree.champion(), None);
}

#[test]
fn test_ties_go_to_leftmost() {
    let tree: WinnerTree<u32, OrdTotalOrder<u32>, Global, 3> = [1, 7, 2, 7, 7, 0, 7].into();
    assert_eq!(tree.champion_index(), Some(1));
}

#[test]
fn test_rank_selection() {
    let mut rng = test_rng();
    for len in 1..50 {
        let values: Vec<u32> = (0..len).map(|_| rng.gen_range(0..10)).collect();
        let tree: WinnerTree<u32> = values.iter().copied().collect();
        let mut ranked = values.clone();
        ranked.sort_unstable_by(|a, b| b.cmp(a));
        for (rank, expected) in ranked.iter().enumerate() {
            assert_eq!(tree.at(rank), expected);
        }
    }
}

#[test]
#[should_panic(expected = "rank (is 3) should be < len (is 3)")]
fn test_rank_out_of_range() {
    let tree: WinnerTree<u8> = [1, 2, 3].into();
    tree.at(3);
}

#[test]
fn test_reverse_order_crowns_smallest() {
    let tree: WinnerTree<i32, _> =
        WinnerTree::from_iter_in([4, 2, 9, 3], ReverseOrder(OrdTotalOrder::new()), Global);
    assert_eq!(tree.champion(), Some(&2));
    assert_eq!(*tree.at(3), 9);
}

#[test]
fn test_pop_champion_ranks() {
    let mut tree: WinnerTree<u32, OrdTotalOrder<u32>, Global, 4> =
        (0..30).map(|x| (x * 17) % 30).collect();
    let mut previous = u32::MAX;
    let mut count = 0;
    while let Some(champion) = tree.pop_champion() {
        assert!(champion < previous);
        previous = champion;
        count += 1;
    }
    assert_eq!(count, 30);
}

#[test]
fn test_insert_alloc_failure_leaves_tree_unchanged() {
    for succeed in 0..3 {
        let alloc = RecordingAlloc::new();
        let mut tree = WinnerTree::<_, _, _, 2>::from_iter_in([3, 8, 5], OrdTotalOrder::new(), alloc.clone());
        let outstanding = alloc.outstanding();

        alloc.fail_after(succeed);
        assert!(tree.try_insert(1, 10).is_err());
        alloc.stop_failing();

        assert_eq!(tree.leaves(), [3, 8, 5]);
        assert_eq!(tree.champion(), Some(&8));
        assert_eq!(alloc.outstanding(), outstanding);
    }
}

#[test]
fn test_erase_alloc_failure_leaves_tree_unchanged() {
    let alloc = RecordingAlloc::new();
    let mut tree = WinnerTree::<_, _, _, 2>::from_iter_in([3, 8, 5, 1, 9], OrdTotalOrder::new(), alloc.clone());
    alloc.fail_from_now();
    assert!(tree.try_erase(4).is_err());
    alloc.stop_failing();
    assert_eq!(tree.leaves(), [3, 8, 5, 1, 9]);
    assert_eq!(tree.champion(), Some(&9));
    assert_eq!(tree.try_erase(4), Ok(9));
    assert_eq!(tree.champion(), Some(&8));
}

#[test]
fn test_insert_with_panicking_order_is_strong() {
    let alloc = RecordingAlloc::new();
    let dummies: Vec<_> = (0..5).map(CrashTestDummy::new).collect();
    let mut tree = WinnerTree::<_, _, _, 2>::from_iter_in(
        dummies[..4].iter().map(|d| d.spawn(Panic::Never)),
        OrdTotalOrder::new(),
        alloc.clone(),
    );
    let outstanding = alloc.outstanding();

    let result = catch_unwind(AssertUnwindSafe(|| tree.insert(2, dummies[4].spawn(Panic::InQuery))));
    assert!(result.is_err());
    assert_eq!(dummies[4].dropped(), 1);
    assert!(dummies[..4].iter().all(|d| d.dropped() == 0));
    assert_eq!(alloc.outstanding(), outstanding);
    assert_eq!(tree.len(), 4);
    assert_eq!(tree.champion().map(|i| i.id()), Some(3));

    drop(tree);
    assert!(dummies[..4].iter().all(|d| d.dropped() == 1));
    assert!(alloc.is_clean());
}

/// Orders crash test dummies by id, panicking while the flag is set.
struct Fragile<'a>(&'a Cell<bool>);

impl<'i> TotalOrder<Instance<'i>> for Fragile<'_> {
    fn cmp(&self, this: &Instance<'i>, that: &Instance<'i>) -> core::cmp::Ordering {
        if self.0.get() {
            panic!("order failed");
        }
        this.id().cmp(&that.id())
    }
}

#[test]
fn test_erase_with_panicking_order_is_strong() {
    let dummies: Vec<_> = (0..4).map(CrashTestDummy::new).collect();
    let explode = Cell::new(false);
    let mut tree = WinnerTree::<_, _, _, 2>::from_iter_in(
        dummies.iter().map(|d| d.spawn(Panic::Never)),
        Fragile(&explode),
        Global,
    );

    explode.set(true);
    assert!(catch_unwind(AssertUnwindSafe(|| tree.erase(1))).is_err());
    explode.set(false);

    assert_eq!(tree.len(), 4);
    assert!(dummies.iter().all(|d| d.dropped() == 0));
    assert_eq!(tree.champion().map(Instance::id), Some(3));

    assert_eq!(tree.erase(1).id(), 1);
    assert_eq!(dummies[1].dropped(), 1);
    assert_eq!(tree.champion().map(Instance::id), Some(3));
    drop(tree);
    assert!(dummies.iter().all(|d| d.dropped() == 1));
}

#[test]
fn test_replace_panic_falls_back_to_scan() {
    let explode = Cell::new(false);
    let order = |a: &i32, b: &i32| {
        if explode.get() {
            panic!("order failed");
        }
        a.cmp(b)
    };
    let mut tree: WinnerTree<i32, _> = WinnerTree::from_iter_in([5, 1, 8, 3, 9, 2], order, Global);
    assert_eq!(tree.champion(), Some(&9));

    explode.set(true);
    assert!(catch_unwind(AssertUnwindSafe(|| tree.replace(0, 100))).is_err());
    explode.set(false);

    assert_eq!(tree.leaves(), [100, 1, 8, 3, 9, 2]);
    assert_eq!(tree.champion(), Some(&100));
    assert_eq!(*tree.at(0), 100);

    // The next replace replays the whole tournament.
    assert_eq!(tree.replace(4, 0), 9);
    assert_eq!(tree.champion_index(), Some(0));
    assert!(!tree.stale);
    tree.replace(0, -5);
    assert_eq!(tree.champion(), Some(&8));
}

#[test]
fn test_assign() {
    let mut tree: WinnerTree<i32> = [1, 2, 3].into();
    tree.assign([10, -3, 44, 7]);
    assert_eq!(tree.leaves(), [10, -3, 44, 7]);
    assert_eq!(tree.champion(), Some(&44));

    let result = catch_unwind(AssertUnwindSafe(|| {
        tree.assign((0..10).map(|x| if x == 6 { panic!("input failed") } else { x }).filter(|_| true))
    }));
    assert!(result.is_err());
    assert_eq!(tree.leaves(), [10, -3, 44, 7]);
    assert_eq!(tree.champion(), Some(&44));

    tree.assign(core::iter::empty());
    assert!(tree.is_empty());
    assert_eq!(tree.champion(), None);
}

#[test]
fn test_clear_releases_storage() {
    let alloc = RecordingAlloc::new();
    let mut tree = WinnerTree::<_, _, _, 3>::new_in(OrdTotalOrder::new(), alloc.clone());
    for x in 0..20 {
        tree.push(x);
    }
    assert!(!alloc.is_clean());
    tree.clear();
    assert!(tree.is_empty());
    assert_eq!(tree.champion(), None);
    assert!(alloc.is_clean());
}

#[test]
fn test_clone_is_independent() {
    let mut a: WinnerTree<String> = ["kiwi", "fig", "pear"].map(String::from).into();
    let b = a.clone();
    a.replace(0, String::from("apple"));
    assert_eq!(a.champion().map(String::as_str), Some("pear"));
    assert_eq!(b.leaves()[0], "kiwi");
    assert_eq!(b.champion().map(String::as_str), Some("pear"));
}

#[test]
fn test_accessors() {
    let tree: WinnerTree<char> = "tourney".chars().collect();
    assert_eq!(tree.len(), 7);
    assert_eq!(tree.get(1), Some(&'o'));
    assert_eq!(tree.get(7), None);
    assert_eq!(tree.iter().rev().next(), Some(&'y'));
    assert_eq!((&tree).into_iter().count(), 7);
    assert_eq!(format!("{tree:?}"), "['t', 'o', 'u', 'r', 'n', 'e', 'y']");
    assert_eq!(tree.champion(), Some(&'y'));
    assert_eq!(tree.into_iter().collect::<String>(), "tourney");
}
