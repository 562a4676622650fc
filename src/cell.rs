//! Cell record layout: the cache-line-sized cluster that holds a small
//! crit-bit subtree, its tagged child encoding, and the allocator.
//!
//! Mirrors the raw-pointer, offset-constant accessor style of a generic
//! fixed-size page record: a boxed, 8-byte-aligned block with typed
//! accessors over its slots rather than a byte buffer reinterpreted through
//! `bincode`, since nothing here is ever serialized to disk.

use std::ptr;

/// Crit-bit nodes per cell. `node_count` ranges over `1..=NODES_PER_CELL`
/// except for the singleton root (see `Cell::is_singleton`).
pub const NODES_PER_CELL: usize = 8;
/// External-pointer slots per cell: one more than node slots, since a fully
/// populated binary subtree of N nodes has N+1 leaf edges.
pub const PTRS_PER_CELL: usize = NODES_PER_CELL + 1;

/// Minimum working occupancy the insertion/deletion engines try to keep a
/// non-root cell within. The root may fall below this.
pub const CELL_MIN: usize = 3;

const VACANT: u8 = 0x3F;
const TAG_UOBJ: u8 = 0x80;
const TAG_CELL: u8 = 0x40;
const TAG_MASK: u8 = 0xC0;
const IDX_MASK: u8 = 0x0F;

/// `cbit` value that marks node 0 of a singleton root: the tree holds
/// exactly one object and there is no real divergence to record.
pub const SINGLETON_CBIT: u32 = u32::MAX;

#[inline]
pub fn is_vacant(child: u8) -> bool {
    child == VACANT
}
#[inline]
pub fn is_intra(child: u8) -> bool {
    (child as usize) < NODES_PER_CELL
}
#[inline]
pub fn is_cell_edge(child: u8) -> bool {
    child & TAG_MASK == TAG_CELL
}
#[inline]
pub fn is_uobj_edge(child: u8) -> bool {
    child & TAG_MASK == TAG_UOBJ
}
#[inline]
pub fn ptr_index(child: u8) -> usize {
    (child & IDX_MASK) as usize
}
#[inline]
pub fn cell_edge(idx: usize) -> u8 {
    TAG_CELL | (idx as u8)
}
#[inline]
pub fn uobj_edge(idx: usize) -> u8 {
    TAG_UOBJ | (idx as u8)
}

/// One crit-bit branching point: the bit position at which its two
/// subtrees diverge, and a tagged reference to each.
#[derive(Clone, Copy)]
pub struct Node {
    pub cbit: u32,
    pub child: [u8; 2],
}

impl Node {
    fn vacant() -> Self {
        Node { cbit: 0, child: [VACANT, VACANT] }
    }
}

/// One external-pointer slot: either empty, a user object handle, or a
/// pointer to a subordinate cell.
pub enum PSlot<T> {
    Null,
    Obj(*const T),
    Cell(*mut Cell<T>),
}

impl<T> Clone for PSlot<T> {
    fn clone(&self) -> Self {
        match self {
            PSlot::Null => PSlot::Null,
            PSlot::Obj(p) => PSlot::Obj(*p),
            PSlot::Cell(p) => PSlot::Cell(*p),
        }
    }
}
impl<T> Copy for PSlot<T> {}

const COUNT_MASK: usize = 0x7;

/// A fixed-size clustered record. `pnc` packs the parent-cell pointer
/// (8-byte aligned, so its low 3 bits are free) together with
/// `node_count - 1`. Cell addresses must stay 8-byte aligned for this to be
/// sound, which `#[repr(align(8))]` guarantees regardless of host pointer
/// width.
#[repr(align(8))]
pub struct Cell<T> {
    pnc: usize,
    pub nodes: [Node; NODES_PER_CELL],
    pub ptrs: [PSlot<T>; PTRS_PER_CELL],
}

impl<T> Cell<T> {
    /// Allocates a fresh, empty cell (all node slots vacant, all pointer
    /// slots null, count = 1, no parent). Callers write node 0 and wire a
    /// parent before the cell becomes reachable.
    pub fn alloc() -> *mut Cell<T> {
        let cell = Box::new(Cell {
            pnc: 0,
            nodes: [Node::vacant(); NODES_PER_CELL],
            ptrs: [PSlot::Null; PTRS_PER_CELL],
        });
        Box::into_raw(cell)
    }

    /// Frees a cell allocated by `alloc`. Does not touch child cells or
    /// objects it may still reference — callers must have already detached
    /// or relocated anything it owns.
    ///
    /// # Safety
    /// `ptr` must have come from `Cell::alloc` and not have been freed yet.
    pub unsafe fn free(ptr: *mut Cell<T>) {
        drop(Box::from_raw(ptr));
    }

    pub fn parent(&self) -> Option<*mut Cell<T>> {
        let raw = (self.pnc & !COUNT_MASK) as *mut Cell<T>;
        if raw.is_null() {
            None
        } else {
            Some(raw)
        }
    }

    pub fn set_parent(&mut self, parent: Option<*mut Cell<T>>) {
        let raw = parent.map_or(ptr::null_mut(), |p| p) as usize;
        debug_assert_eq!(raw & COUNT_MASK, 0, "cell addresses must be 8-byte aligned");
        self.pnc = raw | (self.pnc & COUNT_MASK);
    }

    pub fn count(&self) -> usize {
        (self.pnc & COUNT_MASK) + 1
    }

    pub fn set_count(&mut self, n: usize) {
        debug_assert!((1..=NODES_PER_CELL).contains(&n));
        self.pnc = (self.pnc & !COUNT_MASK) | (n - 1);
    }

    /// A cell is a singleton when it is the sole cell of a one-object tree:
    /// node 0 carries the sentinel cbit and a single UOBJ child.
    pub fn is_singleton(&self) -> bool {
        self.nodes[0].cbit == SINGLETON_CBIT
    }

    pub fn make_singleton(&mut self, obj: *const T) {
        self.ptrs[0] = PSlot::Obj(obj);
        self.nodes[0] = Node { cbit: SINGLETON_CBIT, child: [uobj_edge(0), VACANT] };
        self.set_count(1);
    }

    /// Lowest vacant node slot index, excluding slot 0 (the subtree root,
    /// never reallocated).
    pub fn alloc_node_slot(&self) -> Option<usize> {
        (1..NODES_PER_CELL).find(|&i| is_vacant(self.nodes[i].child[0]))
    }

    pub fn free_node_slot(&mut self, idx: usize) {
        debug_assert_ne!(idx, 0, "node slot 0 is the subtree root and is never freed directly");
        self.nodes[idx] = Node::vacant();
    }

    /// Lowest vacant external-pointer slot.
    pub fn alloc_ptr_slot(&self) -> Option<usize> {
        (0..PTRS_PER_CELL).find(|&i| matches!(self.ptrs[i], PSlot::Null))
    }

    pub fn free_ptr_slot(&mut self, idx: usize) {
        self.ptrs[idx] = PSlot::Null;
    }

    /// Finds the node (and which side) whose child equals `target` node
    /// index. Bounded by `NODES_PER_CELL`; there is no parent link at node
    /// granularity by design (see module docs on ancestor climb).
    pub fn node_parent(&self, target: usize) -> Option<(usize, u8)> {
        for i in 0..NODES_PER_CELL {
            if is_vacant(self.nodes[i].child[0]) {
                continue;
            }
            for side in 0..2u8 {
                let c = self.nodes[i].child[side as usize];
                if is_intra(c) && c as usize == target {
                    return Some((i, side));
                }
            }
        }
        None
    }

    /// Finds the node (and side) whose child is a CELL edge referencing
    /// pointer slot `ptr_idx`.
    pub fn node_for_cell_ptr(&self, ptr_idx: usize) -> Option<(usize, u8)> {
        for i in 0..NODES_PER_CELL {
            if is_vacant(self.nodes[i].child[0]) {
                continue;
            }
            for side in 0..2u8 {
                let c = self.nodes[i].child[side as usize];
                if is_cell_edge(c) && ptr_index(c) == ptr_idx {
                    return Some((i, side));
                }
            }
        }
        None
    }

    /// Scans the parent cell for the pointer slot referencing `child`, then
    /// finds the node edge carrying that slot's CELL tag. Used to locate a
    /// cell's own anchor in its parent without a node-level back-link.
    pub fn anchor_in_parent(parent: &Cell<T>, child: *mut Cell<T>) -> Option<(usize, usize, u8)> {
        for (pi, slot) in parent.ptrs.iter().enumerate() {
            if let PSlot::Cell(c) = slot {
                if *c == child {
                    let (ni, side) = parent.node_for_cell_ptr(pi)?;
                    return Some((pi, ni, side));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_cell_has_all_vacant_slots() {
        let c = Cell::<u32>::alloc();
        unsafe {
            let cell = &*c;
            for i in 0..NODES_PER_CELL {
                assert!(is_vacant(cell.nodes[i].child[0]));
            }
            for i in 0..PTRS_PER_CELL {
                assert!(matches!(cell.ptrs[i], PSlot::Null));
            }
            Cell::free(c);
        }
    }

    #[test]
    fn pnc_packs_parent_and_count_independently() {
        let c = Cell::<u32>::alloc();
        unsafe {
            let cell = &mut *c;
            cell.set_count(5);
            assert_eq!(cell.count(), 5);
            assert!(cell.parent().is_none());
            cell.set_count(1);
            assert_eq!(cell.count(), 1);
            Cell::free(c);
        }
    }

    #[test]
    fn child_tag_round_trips() {
        assert!(is_intra(3));
        assert!(!is_vacant(3));
        let ce = cell_edge(5);
        assert!(is_cell_edge(ce));
        assert_eq!(ptr_index(ce), 5);
        let ue = uobj_edge(8);
        assert!(is_uobj_edge(ue));
        assert_eq!(ptr_index(ue), 8);
        assert!(is_vacant(VACANT));
    }
}
