//! `Tree<T, B>`: the public surface — lifecycle, mutation, lookup, and
//! cursor-based iteration over a clustered crit-bit index.

use crate::bitops::{BitOps, FIRST_DIFF_EQUAL};
use crate::cell::{Cell, PSlot};
use crate::delete;
use crate::error::TreeError;
use crate::insert;
use crate::stats::Stats;
use crate::walker::{self, Cursor};
use crate::KBITS_MAX;

/// An index over objects of type `T`, keyed by whatever `B` reads out of
/// them. Holds borrowed object pointers only — it never allocates or frees
/// a `T`.
pub struct Tree<T, B: BitOps<T>> {
    root: Option<*mut Cell<T>>,
    bitops: B,
    n_objects: usize,
    merge_down: bool,
    stats: Stats,
}

impl<T, B: BitOps<T>> Tree<T, B> {
    /// An empty tree with merge-down disabled.
    pub fn new(bitops: B) -> Self {
        Tree { root: None, bitops, n_objects: 0, merge_down: false, stats: Stats::default() }
    }

    /// Same as `new`, but also folds a sub-cell into its parent on deletion
    /// whenever the combined population still fits one cell.
    pub fn with_merge_down(bitops: B) -> Self {
        Tree { root: None, bitops, n_objects: 0, merge_down: true, stats: Stats::default() }
    }

    pub fn count(&self) -> usize {
        self.n_objects
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Indexes `obj`. Fails with `AlreadyPresent` if an object with the same
    /// key is already indexed, or `BadArgument` if `obj` is null.
    ///
    /// # Safety
    /// `obj` must stay valid and its key bytes immutable for as long as it
    /// remains indexed.
    pub unsafe fn add(&mut self, obj: *const T) -> Result<(), TreeError> {
        if obj.is_null() {
            return Err(TreeError::BadArgument);
        }
        insert::add(&mut self.root, &self.bitops, obj, &mut self.stats)?;
        self.n_objects += 1;
        Ok(())
    }

    /// Removes the object whose key matches `key`'s. Fails with `Absent` if
    /// no such key is indexed.
    ///
    /// # Safety
    /// Every object pointer remaining reachable in the tree must stay valid.
    pub unsafe fn remove(&mut self, key: &T) -> Result<(), TreeError> {
        delete::remove(&mut self.root, &self.bitops, key, self.merge_down, &mut self.stats)?;
        self.n_objects -= 1;
        Ok(())
    }

    /// Finds the indexed object whose key matches `key`'s, with a cursor to
    /// it for further iteration.
    ///
    /// # Safety
    /// The tree's cells must be consistent (no in-progress mutation).
    pub unsafe fn locate(&self, key: &T) -> Option<(*const T, Cursor<T>)> {
        let root = self.root?;
        let (cur, witness) = walker::descend(root, &self.bitops, key);
        let c = self.bitops.first_diff(KBITS_MAX + 1, key, &*witness);
        if c == FIRST_DIFF_EQUAL {
            Some((witness, cur))
        } else {
            None
        }
    }

    /// Shorthand for `locate` when only the object is wanted. Serves as the
    /// typed finder for every built-in bitops kind, since the comparison is
    /// entirely key-driven and does not depend on `T`'s identity.
    ///
    /// # Safety
    /// Same as `locate`.
    pub unsafe fn find(&self, key: &T) -> Option<*const T> {
        self.locate(key).map(|(obj, _)| obj)
    }

    /// The object with the smallest key, with a cursor to it.
    ///
    /// # Safety
    /// The tree's cells must be consistent.
    pub unsafe fn first(&self) -> Option<(*const T, Cursor<T>)> {
        let root = self.root?;
        let cur = walker::rush_to_extreme(root, 0, 0);
        Some((walker::object_at(&cur), cur))
    }

    /// The object with the largest key, with a cursor to it.
    ///
    /// # Safety
    /// The tree's cells must be consistent.
    pub unsafe fn last(&self) -> Option<(*const T, Cursor<T>)> {
        let root = self.root?;
        let cur = walker::rush_to_extreme(root, 0, 1);
        Some((walker::object_at(&cur), cur))
    }

    /// The object just past `cur` in ascending key order, or `None` if `cur`
    /// is already the last.
    ///
    /// # Safety
    /// `cur` must be a live cursor this tree produced.
    pub unsafe fn next(&self, cur: &Cursor<T>) -> Option<(*const T, Cursor<T>)> {
        let nxt = walker::climb(&self.bitops, cur, 1)?;
        Some((walker::object_at(&nxt), nxt))
    }

    /// The object just before `cur` in ascending key order, or `None` if
    /// `cur` is already the first.
    ///
    /// # Safety
    /// `cur` must be a live cursor this tree produced.
    pub unsafe fn prev(&self, cur: &Cursor<T>) -> Option<(*const T, Cursor<T>)> {
        let prv = walker::climb(&self.bitops, cur, 0)?;
        Some((walker::object_at(&prv), prv))
    }
}

/// Finds any still-linked CELL child of `cell` and delists it (so a later
/// scan from the parent won't revisit it), without touching anything else.
unsafe fn delist_any_child<T>(cell: &mut Cell<T>) -> Option<*mut Cell<T>> {
    for slot in cell.ptrs.iter_mut() {
        if let PSlot::Cell(c) = *slot {
            *slot = PSlot::Null;
            return Some(c);
        }
    }
    None
}

/// Iterative post-order teardown: descend to an arbitrary leaf cell via any
/// remaining CELL edge, free it, backtrack one level via the cell's own
/// parent link, continue. Uses no call stack beyond this loop.
unsafe fn destroy_cells<T>(root: *mut Cell<T>, stats: &mut Stats) {
    let mut current = root;
    loop {
        let c = &mut *current;
        if let Some(child) = delist_any_child(c) {
            current = child;
            continue;
        }
        stats.record_occupancy(c.count());
        let parent = c.parent();
        Cell::free(current);
        stats.note_cell_free();
        match parent {
            Some(p) => current = p,
            None => break,
        }
    }
}

impl<T, B: BitOps<T>> Drop for Tree<T, B> {
    fn drop(&mut self) {
        if let Some(root) = self.root {
            unsafe { destroy_cells(root, &mut self.stats) };
        }
    }
}
