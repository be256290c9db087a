//! A K-ary tournament tree.
//!
//! A [`WinnerTree`] keeps its contestants in a [`Buffer`] of leaves and, above
//! them, one row of competition nodes per round. Each node records which leaf
//! won its group of `K` children, so the root names the champion: the
//! greatest leaf under the tree's [`TotalOrder`]. Ties go to the leftmost
//! contestant.
//!
//! Structural changes (insert, erase, assign) build a new leaf block and a
//! whole new set of rounds, and commit only when both are complete, so a
//! failed allocation or a panicking order leaves the tree as it was.
//! [`replace`](WinnerTree::replace) instead replays the rounds on the path
//! from the changed leaf to the root, stopping as soon as a result stands.
//!
//! ```
//! use tourney::WinnerTree;
//!
//! let mut tree: WinnerTree<u32> = [12, 40, 7, 33].into();
//! assert_eq!(tree.champion(), Some(&40));
//!
//! tree.replace(1, 5);
//! assert_eq!(tree.champion(), Some(&33));
//! assert_eq!(tree.champion_index(), Some(3));
//!
//! tree.insert(0, 50);
//! assert_eq!(tree.leaves(), [50, 12, 5, 7, 33]);
//! assert_eq!(*tree.at(1), 33);
//! ```

use core::cmp::{min, Ordering};
use core::fmt;
use core::mem::{self, ManuallyDrop};
use core::ptr;
use core::slice;

use super::raw_block::RawBlock;
use super::{handle_reserve, Buffer, TryReserveError, Vector};
use crate::polyfill::{Allocator, Global};
use crate::{OrdTotalOrder, TotalOrder};

#[cfg(test)]
mod tests;

/// A tournament over a row of contestants, `K` to a group.
///
/// `K` must be at least two; smaller values are rejected at compile time:
///
/// ```compile_fail
/// use tourney::{Global, OrdTotalOrder, WinnerTree};
///
/// let mut tree = WinnerTree::<i32, OrdTotalOrder<i32>, Global, 1>::new_in(OrdTotalOrder::new(), Global);
/// tree.push(1);
/// ```
pub struct WinnerTree<T, C = OrdTotalOrder<T>, A: Allocator = Global, const K: usize = 2> {
    leaves: Buffer<T, A>,
    // levels[0] groups the leaves; the last level is the single root.
    levels: Vector<Buffer<usize, A>, A>,
    order: C,
    // Set while a rematch is under way. If it is still set afterwards the
    // rematch unwound and `levels` cannot be trusted until the next rebuild.
    stale: bool,
}

impl<T, C: TotalOrder<T>> WinnerTree<T, C> {
    /// Creates an empty binary tournament ordered by `order`.
    #[must_use]
    pub const fn new(order: C) -> Self {
        Self {
            leaves: Buffer::new_in(Global),
            levels: Vector::new_in(Global),
            order,
            stale: false,
        }
    }
}

impl<T, C: TotalOrder<T>, A: Allocator + Clone, const K: usize> WinnerTree<T, C, A, K> {
    const GROUP: usize = {
        assert!(K >= 2, "a winner tree needs at least two contestants per group");
        K
    };

    /// Creates an empty tournament in `alloc`.
    #[must_use]
    pub fn new_in(order: C, alloc: A) -> Self {
        Self {
            levels: Vector::new_in(alloc.clone()),
            leaves: Buffer::new_in(alloc),
            order,
            stale: false,
        }
    }

    /// Creates a tournament over the items of `iter`, in order, and plays it.
    ///
    /// ```
    /// use tourney::{Global, WinnerTree};
    ///
    /// // Shortest word wins; three to a group.
    /// let shortest = |a: &&str, b: &&str| b.len().cmp(&a.len());
    /// let tree = WinnerTree::<_, _, _, 3>::from_iter_in(
    ///     ["quartz", "ox", "fjord", "nymph", "vex", "by"],
    ///     shortest,
    ///     Global,
    /// );
    /// assert_eq!(tree.champion(), Some(&"ox"));
    /// ```
    #[track_caller]
    pub fn from_iter_in<I: IntoIterator<Item = T>>(iter: I, order: C, alloc: A) -> Self {
        let leaves = Buffer::from_iter_in(iter, alloc.clone());
        let levels = handle_reserve(tournament(leaves.as_slice(), &order, Self::GROUP, &alloc));
        Self { leaves, levels, order, stale: false }
    }

    /// The leaf index of the champion, or `None` if there are no contestants.
    pub fn champion_index(&self) -> Option<usize> {
        if self.stale {
            // An interrupted rematch left the rounds half played; decide
            // without them.
            let leaves = self.leaves.as_slice();
            (!leaves.is_empty()).then(|| play_off(leaves, &self.order, 0, 1..leaves.len()))
        } else {
            self.levels.back().map(|root| root[0])
        }
    }

    /// The greatest contestant, or `None` if there are none.
    pub fn champion(&self) -> Option<&T> {
        self.champion_index().map(|i| &self.leaves[i])
    }

    /// The contestant of rank `rank`, counting down from the champion at
    /// rank 0. Equal contestants take consecutive ranks.
    ///
    /// Runs a quickselect over the leaf indices, independently of the rounds;
    /// *O*(*n*) on average.
    ///
    /// # Panics
    ///
    /// Panics if `rank >= self.len()`.
    ///
    /// ```
    /// use tourney::WinnerTree;
    ///
    /// let tree: WinnerTree<i32> = [3, 9, 1, 9, 4].into_iter().collect();
    /// assert_eq!(*tree.at(0), 9);
    /// assert_eq!(*tree.at(1), 9);
    /// assert_eq!(*tree.at(2), 4);
    /// assert_eq!(*tree.at(4), 1);
    /// ```
    #[track_caller]
    pub fn at(&self, rank: usize) -> &T {
        let len = self.len();
        assert!(rank < len, "rank (is {rank}) should be < len (is {len})");

        let mut scratch = Vector::from_iter_in(0..len, self.leaves.allocator());
        let ids = scratch.as_mut_slice();
        let (mut lo, mut hi) = (0, len);
        loop {
            let pivot = &self.leaves[ids[lo + (hi - lo) / 2]];
            // ids[lo..above] beat the pivot, ids[above..i] tie with it and
            // ids[below..hi] lose to it.
            let (mut above, mut i, mut below) = (lo, lo, hi);
            while i < below {
                match self.order.cmp(&self.leaves[ids[i]], pivot) {
                    Ordering::Greater => {
                        ids.swap(above, i);
                        above += 1;
                        i += 1;
                    }
                    Ordering::Equal => i += 1,
                    Ordering::Less => {
                        below -= 1;
                        ids.swap(i, below);
                    }
                }
            }

            if rank < above {
                hi = above;
            } else if rank >= below {
                lo = below;
            } else {
                return &self.leaves[ids[rank]];
            }
        }
    }

    /// Inserts `value` as the contestant at `pos`, shifting later ones right,
    /// and replays the tournament.
    ///
    /// # Panics
    ///
    /// Panics if `pos > len`. If the order panics, the tree is unchanged and
    /// `value` is dropped.
    #[track_caller]
    pub fn insert(&mut self, pos: usize, value: T) {
        handle_reserve(self.try_insert(pos, value));
    }

    /// Fallible variant of [`insert`](Self::insert). On error the tree is
    /// unchanged.
    #[track_caller]
    pub fn try_insert(&mut self, pos: usize, value: T) -> Result<(), TryReserveError> {
        let len = self.len();
        assert!(pos <= len, "insertion index (is {pos}) should be <= len (is {len})");

        let block = RawBlock::try_allocate_in(len + 1, self.leaves.allocator())?;
        let src = self.leaves.as_ptr();
        let dst = block.ptr();
        // SAFETY: the new block has `len + 1` fresh slots. The bitwise copies
        // stay owned by the current leaves until the draft is committed.
        unsafe {
            ptr::copy_nonoverlapping(src, dst, pos);
            dst.add(pos).write(value);
            ptr::copy_nonoverlapping(src.add(pos), dst.add(pos + 1), len - pos);
        }
        self.try_commit(Draft { block, own: Some(pos) })?;
        Ok(())
    }

    /// Adds `value` as the last contestant.
    #[track_caller]
    pub fn push(&mut self, value: T) {
        self.insert(self.len(), value);
    }

    /// Removes and returns the contestant at `pos`, shifting later ones left,
    /// and replays the tournament.
    ///
    /// # Panics
    ///
    /// Panics if `pos >= len`. If the order panics, the tree is unchanged.
    #[track_caller]
    pub fn erase(&mut self, pos: usize) -> T {
        handle_reserve(self.try_erase(pos))
    }

    /// Fallible variant of [`erase`](Self::erase). On error the tree is
    /// unchanged.
    #[track_caller]
    pub fn try_erase(&mut self, pos: usize) -> Result<T, TryReserveError> {
        let len = self.len();
        assert!(pos < len, "removal index (is {pos}) should be < len (is {len})");

        let block = RawBlock::try_allocate_in(len - 1, self.leaves.allocator())?;
        let src = self.leaves.as_ptr();
        let dst = block.ptr();
        // SAFETY: the new block has `len - 1` fresh slots, filled by bitwise
        // copies of every leaf except `pos`.
        unsafe {
            ptr::copy_nonoverlapping(src, dst, pos);
            ptr::copy_nonoverlapping(src.add(pos + 1), dst.add(pos), len - pos - 1);
        }
        let old = self.try_commit(Draft { block, own: None })?;
        // SAFETY: every other value in the old block now lives in the new one.
        Ok(unsafe { ptr::read(old.ptr().add(pos)) })
    }

    /// Removes and returns the champion, or `None` if there are no
    /// contestants.
    ///
    /// ```
    /// use tourney::WinnerTree;
    ///
    /// let mut tree: WinnerTree<_> = ["b", "d", "a", "c"].into();
    /// let ranked: Vec<_> = std::iter::from_fn(|| tree.pop_champion()).collect();
    /// assert_eq!(ranked, ["d", "c", "b", "a"]);
    /// ```
    #[track_caller]
    pub fn pop_champion(&mut self) -> Option<T> {
        let pos = self.champion_index()?;
        Some(self.erase(pos))
    }

    /// Replaces every contestant with the items of `iter` and replays the
    /// tournament. If `iter` or the order panics, the tree is unchanged.
    #[track_caller]
    pub fn assign<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let leaves = Buffer::from_iter_in(iter, self.leaves.allocator());
        let levels = handle_reserve(tournament(
            leaves.as_slice(),
            &self.order,
            Self::GROUP,
            leaves.allocator_ref(),
        ));
        self.levels = levels;
        self.stale = false;
        self.leaves = leaves;
    }

    /// Overwrites the contestant at `pos` with `value`, returning the old one,
    /// and replays only the rounds that `pos` took part in, in *O*(*K* log *n*).
    ///
    /// If the order panics the new value stays in place; the champion is then
    /// found by a linear scan until the next structural change replays the
    /// whole tournament.
    ///
    /// # Panics
    ///
    /// Panics if `pos >= len`.
    #[track_caller]
    pub fn replace(&mut self, pos: usize, value: T) -> T {
        let old = mem::replace(&mut self.leaves[pos], value);
        if self.stale {
            self.rebuild();
        } else {
            self.stale = true;
            self.rematch(pos);
            self.stale = false;
        }
        old
    }

    /// Drops every contestant and releases all storage.
    pub fn clear(&mut self) {
        self.levels.clear();
        self.stale = false;
        self.leaves.clear();
    }

    /// Replays the rounds above leaf `pos` after its value changed.
    fn rematch(&mut self, pos: usize) {
        let k = Self::GROUP;
        let leaves = self.leaves.as_slice();
        let mut child = pos;
        for depth in 0..self.levels.len() {
            let node = child / k;
            let first = node * k;
            let winner = if depth == 0 {
                let last = min(first + k, leaves.len());
                play_off(leaves, &self.order, first, first + 1..last)
            } else {
                let below = &self.levels[depth - 1];
                let last = min(first + k, below.len());
                play_off(leaves, &self.order, below[first], below[first + 1..last].iter().copied())
            };

            let previous = mem::replace(&mut self.levels[depth][node], winner);
            if previous == winner && winner != pos {
                // `pos` neither won nor lost anything here, so nothing above
                // changes either.
                break;
            }
            child = node;
        }
    }

    /// Replays the whole tournament over the current leaves.
    #[track_caller]
    fn rebuild(&mut self) {
        self.levels = handle_reserve(tournament(
            self.leaves.as_slice(),
            &self.order,
            Self::GROUP,
            self.leaves.allocator_ref(),
        ));
        self.stale = false;
    }

    /// Plays the tournament over a draft leaf block and, if that succeeds,
    /// swaps the draft in. Returns the old block, whose values have either
    /// moved into the draft or are left for the caller to take.
    fn try_commit(&mut self, draft: Draft<T, A>) -> Result<RawBlock<T, A>, TryReserveError> {
        let levels = tournament(draft.as_slice(), &self.order, Self::GROUP, self.leaves.allocator_ref())?;
        // SAFETY: every slot of the draft is live.
        let leaves = unsafe { Buffer::from_block(draft.finish()) };
        let old = mem::replace(&mut self.leaves, leaves);
        self.levels = levels;
        self.stale = false;
        Ok(old.into_block())
    }
}

impl<T, C, A: Allocator, const K: usize> WinnerTree<T, C, A, K> {
    /// The number of contestants.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    /// Whether there are no contestants.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// The contestant at `pos`, if any.
    #[must_use]
    pub fn get(&self, pos: usize) -> Option<&T> {
        self.leaves.get(pos)
    }

    /// The contestants in leaf order.
    #[must_use]
    pub fn leaves(&self) -> &[T] {
        self.leaves.as_slice()
    }

    /// Iterates over the contestants in leaf order.
    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.leaves.iter()
    }

    /// Borrow this tree's order.
    pub fn order(&self) -> &C {
        &self.order
    }
}

/// Plays the rounds over `leaves`, `k` to a group, and returns them from the
/// first round up to the root. An empty row of leaves plays no rounds.
fn tournament<T, C, A>(
    leaves: &[T],
    order: &C,
    k: usize,
    alloc: &A,
) -> Result<Vector<Buffer<usize, A>, A>, TryReserveError>
where
    C: TotalOrder<T> + ?Sized,
    A: Allocator + Clone,
{
    let mut rounds = 0;
    let mut width = leaves.len();
    while width > 1 || (width == 1 && rounds == 0) {
        width = width.div_ceil(k);
        rounds += 1;
    }
    alloc_debug!("playing {} rounds over {} contestants", rounds, leaves.len());

    let mut levels: Vector<Buffer<usize, A>, A> = Vector::try_with_capacity_in(rounds, alloc.clone())?;
    let mut width = leaves.len();
    for _ in 0..rounds {
        let below = levels.back().map(Buffer::as_slice);
        let level = Buffer::try_from_fn_in(width.div_ceil(k), alloc.clone(), |node| {
            let first = node * k;
            let last = min(first + k, width);
            match below {
                None => play_off(leaves, order, first, first + 1..last),
                Some(below) => play_off(leaves, order, below[first], below[first + 1..last].iter().copied()),
            }
        })?;
        width = level.len();
        levels.push(level);
    }
    Ok(levels)
}

/// Returns whichever of `seed` and `rivals` holds the greatest leaf. A rival
/// has to beat the current leader outright to take over.
fn play_off<T, C, I>(leaves: &[T], order: &C, seed: usize, rivals: I) -> usize
where
    C: TotalOrder<T> + ?Sized,
    I: IntoIterator<Item = usize>,
{
    rivals.into_iter().fold(seed, |best, rival| {
        if order.gt(&leaves[rival], &leaves[best]) {
            rival
        } else {
            best
        }
    })
}

/// A replacement leaf block. Its slots are bitwise copies of the current
/// leaves plus at most one value of its own; dropping it drops only that one
/// and releases the block.
struct Draft<T, A: Allocator> {
    block: RawBlock<T, A>,
    own: Option<usize>,
}

impl<T, A: Allocator> Draft<T, A> {
    fn as_slice(&self) -> &[T] {
        // SAFETY: every slot is initialised.
        unsafe { slice::from_raw_parts(self.block.ptr(), self.block.capacity()) }
    }

    fn finish(self) -> RawBlock<T, A> {
        let me = ManuallyDrop::new(self);
        // SAFETY: `me` is never used or dropped again.
        unsafe { ptr::read(&me.block) }
    }
}

impl<T, A: Allocator> Drop for Draft<T, A> {
    fn drop(&mut self) {
        if let Some(pos) = self.own {
            alloc_debug!("discarding draft of {} leaves", self.block.capacity());
            // SAFETY: slot `pos` holds the draft's own value.
            unsafe { ptr::drop_in_place(self.block.ptr().add(pos)) };
        }
    }
}

impl<T: Clone, C: Clone, A: Allocator + Clone, const K: usize> Clone for WinnerTree<T, C, A, K> {
    fn clone(&self) -> Self {
        Self {
            leaves: self.leaves.clone(),
            levels: self.levels.clone(),
            order: self.order.clone(),
            stale: self.stale,
        }
    }
}

impl<T, C: TotalOrder<T> + Default, A: Allocator + Clone + Default, const K: usize> Default
    for WinnerTree<T, C, A, K>
{
    /// Creates an empty tournament using the default order.
    fn default() -> Self {
        Self::new_in(C::default(), A::default())
    }
}

impl<T: fmt::Debug, C, A: Allocator, const K: usize> fmt::Debug for WinnerTree<T, C, A, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: Ord, const K: usize> FromIterator<T> for WinnerTree<T, OrdTotalOrder<T>, Global, K> {
    #[track_caller]
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_iter_in(iter, OrdTotalOrder::new(), Global)
    }
}

impl<T: Ord, const K: usize, const N: usize> From<[T; N]> for WinnerTree<T, OrdTotalOrder<T>, Global, K> {
    #[track_caller]
    fn from(arr: [T; N]) -> Self {
        Self::from_iter_in(arr, OrdTotalOrder::new(), Global)
    }
}

impl<'a, T, C, A: Allocator, const K: usize> IntoIterator for &'a WinnerTree<T, C, A, K> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> slice::Iter<'a, T> {
        self.iter()
    }
}

impl<T, C, A: Allocator, const K: usize> IntoIterator for WinnerTree<T, C, A, K> {
    type Item = T;
    type IntoIter = super::vector::IntoIter<T, A>;

    /// Moves the contestants out in leaf order.
    fn into_iter(self) -> Self::IntoIter {
        self.leaves.into_iter()
    }
}
