//! Four-phase insertion: locate a witness, compute the crit-bit, compute
//! direction, install — with push-down/split admission when the target
//! cell is full.

use crate::bitops::{BitOps, FIRST_DIFF_EQUAL};
use crate::cell::{
    cell_edge, is_cell_edge, is_intra, is_uobj_edge, is_vacant, ptr_index, uobj_edge, Cell, Node,
    PSlot, NODES_PER_CELL,
};
use crate::error::TreeError;
use crate::stats::Stats;
use crate::walker::descend;
use crate::KBITS_MAX;

/// Where the insertion-point rule says the new node must attach.
enum StopPoint<T> {
    /// No ancestor node had `cbit < c`; the root cell's own node 0 must be
    /// relocated to make room for the new divergence at the top.
    AtRootCellNode0,
    /// `upper.child[bit]` (currently whatever `AfterUpper` names) is the
    /// edge the new node displaces.
    AfterUpper { upper_cell: *mut Cell<T>, upper_node: usize, bit: u8 },
}

/// Re-walks from the tree root guided by `key`, stopping the instant a
/// node's own `cbit` would meet or exceed `c` — that node (or, if none was
/// ever a valid ancestor, the very first node visited) marks the
/// insertion point. Always starts at the root rather than reusing the
/// witness-search cursor; the spec's "shortcut" (confining the walk to the
/// witness's own cell when possible) is a performance optimization this
/// implementation does not need for correctness.
unsafe fn find_insertion_point<T, B: BitOps<T>>(
    root: *mut Cell<T>,
    bitops: &B,
    key: &T,
    c: u32,
) -> StopPoint<T> {
    let mut cell = root;
    let mut node = 0usize;
    let mut upper: Option<(*mut Cell<T>, usize, u8)> = None;
    loop {
        let cc = &*cell;
        let n = cc.nodes[node];
        if n.cbit >= c {
            return match upper {
                None => StopPoint::AtRootCellNode0,
                Some((upper_cell, upper_node, bit)) => {
                    StopPoint::AfterUpper { upper_cell, upper_node, bit }
                }
            };
        }
        let bit = bitops.get_bit(n.cbit, key);
        upper = Some((cell, node, bit));
        let child = n.child[bit as usize];
        if is_intra(child) {
            node = child as usize;
        } else if is_cell_edge(child) {
            let pidx = ptr_index(child);
            cell = match cc.ptrs[pidx] {
                PSlot::Cell(c2) => c2,
                _ => unreachable!(),
            };
            node = 0;
        } else {
            return StopPoint::AfterUpper { upper_cell: cell, upper_node: node, bit };
        }
    }
}

unsafe fn install_after_upper<T>(
    upper_cell: *mut Cell<T>,
    upper_node: usize,
    bit: u8,
    new_obj: *const T,
    c: u32,
) {
    let uc = &mut *upper_cell;
    let slot = uc.alloc_node_slot().expect("caller confirmed a free node slot");
    let old_edge = uc.nodes[upper_node].child[bit as usize];
    let ptr_slot = uc
        .alloc_ptr_slot()
        .expect("adding one node adds exactly one leaf edge, and a non-full cell always has room for it");
    uc.ptrs[ptr_slot] = PSlot::Obj(new_obj);
    let mut n = Node { cbit: c, child: [0, 0] };
    n.child[bit as usize] = uobj_edge(ptr_slot);
    n.child[1 - bit as usize] = old_edge;
    uc.nodes[slot] = n;
    uc.nodes[upper_node].child[bit as usize] = slot as u8;
    uc.set_count(uc.count() + 1);
}

unsafe fn install_at_root_node0<T>(root: *mut Cell<T>, new_obj: *const T, c: u32, b: u8) {
    let rc = &mut *root;
    let slot = rc.alloc_node_slot().expect("caller confirmed a free node slot");
    let old_root = rc.nodes[0];
    rc.nodes[slot] = old_root;
    let ptr_slot = rc.alloc_ptr_slot().expect("adding one node adds exactly one leaf edge");
    rc.ptrs[ptr_slot] = PSlot::Obj(new_obj);
    let mut n = Node { cbit: c, child: [0, 0] };
    n.child[b as usize] = uobj_edge(ptr_slot);
    n.child[1 - b as usize] = slot as u8;
    rc.nodes[0] = n;
    rc.set_count(rc.count() + 1);
}

fn install_into_singleton<T>(rc: &mut Cell<T>, new_obj: *const T, c: u32, b: u8) {
    let new_ptr_slot = rc.alloc_ptr_slot().expect("a fresh singleton cell only has slot 0 in use");
    rc.ptrs[new_ptr_slot] = PSlot::Obj(new_obj);
    let mut n = Node { cbit: c, child: [0, 0] };
    n.child[b as usize] = uobj_edge(new_ptr_slot);
    n.child[1 - b as usize] = uobj_edge(0);
    rc.nodes[0] = n;
    rc.set_count(1);
}

fn collect_subtree<T>(cell: &Cell<T>, idx: usize, out: &mut Vec<usize>) {
    out.push(idx);
    for side in 0..2usize {
        let c = cell.nodes[idx].child[side];
        if is_intra(c) {
            collect_subtree(cell, c as usize, out);
        }
    }
}

/// An "edge node": one child is a CELL edge, the other is not an intra-cell
/// node, and the referenced sub-cell has room for at least 2 more nodes.
unsafe fn find_pushdown_candidate<T>(cell: &Cell<T>) -> Option<(usize, u8, *mut Cell<T>)> {
    // Node 0 is the cell's own subtree root and has no in-cell parent slot
    // to vacate, so it is never a push-down candidate.
    for i in 1..NODES_PER_CELL {
        if is_vacant(cell.nodes[i].child[0]) {
            continue;
        }
        let ch = cell.nodes[i].child;
        for side in 0..2usize {
            let this = ch[side];
            let other = ch[1 - side];
            if is_cell_edge(this) && !is_intra(other) {
                let pidx = ptr_index(this);
                if let PSlot::Cell(sub) = cell.ptrs[pidx] {
                    let free = NODES_PER_CELL - (&*sub).count();
                    if free >= 2 {
                        return Some((i, side as u8, sub));
                    }
                }
            }
        }
    }
    None
}

/// Relocates `node_idx` (an edge node of `parent`) into the root of its own
/// referenced sub-cell, giving `parent` a free node slot back.
unsafe fn push_down<T>(parent: *mut Cell<T>, node_idx: usize, cell_side: u8, sub: *mut Cell<T>) {
    let p = &mut *parent;
    let s = &mut *sub;

    let node = p.nodes[node_idx];
    let cell_edge_child = node.child[cell_side as usize];
    let sib_side = 1 - cell_side;
    let sibling = node.child[sib_side as usize];

    let (gp_idx, gp_side) = p
        .node_parent(node_idx)
        .expect("push-down candidates are never the cell root, so they always have an in-cell parent");

    let sib_new = if is_uobj_edge(sibling) {
        let old_pidx = ptr_index(sibling);
        let obj = match p.ptrs[old_pidx] {
            PSlot::Obj(o) => o,
            _ => unreachable!(),
        };
        p.free_ptr_slot(old_pidx);
        let slot = s
            .alloc_ptr_slot()
            .expect("candidate search guaranteed the sub-cell has 2 free slots");
        s.ptrs[slot] = PSlot::Obj(obj);
        uobj_edge(slot)
    } else {
        debug_assert!(is_cell_edge(sibling));
        let old_pidx = ptr_index(sibling);
        let gc = match p.ptrs[old_pidx] {
            PSlot::Cell(c) => c,
            _ => unreachable!(),
        };
        p.free_ptr_slot(old_pidx);
        let slot = s
            .alloc_ptr_slot()
            .expect("candidate search guaranteed the sub-cell has 2 free slots");
        s.ptrs[slot] = PSlot::Cell(gc);
        (&mut *gc).set_parent(Some(sub));
        cell_edge(slot)
    };

    let old_sub_root = s.nodes[0];
    let fresh = s
        .alloc_node_slot()
        .expect("candidate search guaranteed the sub-cell has 2 free slots");
    s.nodes[fresh] = old_sub_root;

    let mut new_root = Node { cbit: node.cbit, child: [0, 0] };
    new_root.child[cell_side as usize] = fresh as u8;
    new_root.child[sib_side as usize] = sib_new;
    s.nodes[0] = new_root;
    s.set_count(s.count() + 1);

    p.nodes[gp_idx].child[gp_side as usize] = cell_edge_child;
    p.free_node_slot(node_idx);
    p.set_count(p.count() - 1);
}

/// Partitions `cell`'s internal subtree at a pivot chosen to minimize
/// `|2*size - NODES_PER_CELL|`, moving the pivot and its descendants
/// (slot numbers preserved, except the pivot itself which becomes the new
/// cell's node 0) into a freshly allocated cell.
unsafe fn split<T>(cell: *mut Cell<T>) -> *mut Cell<T> {
    let c = &mut *cell;

    let mut best: Option<(usize, i64, Vec<usize>)> = None;
    for i in 1..NODES_PER_CELL {
        if is_vacant(c.nodes[i].child[0]) {
            continue;
        }
        let mut members = Vec::new();
        collect_subtree(c, i, &mut members);
        let score = (2 * members.len() as i64 - NODES_PER_CELL as i64).abs();
        if best.as_ref().map_or(true, |(_, bs, _)| score < *bs) {
            best = Some((i, score, members));
        }
    }
    let (pivot_idx, _, members) = best.expect("a full cell always has at least one non-root node");

    let (gp_idx, gp_side) = c
        .node_parent(pivot_idx)
        .expect("the split pivot is never the cell root");

    // Allocate before any mutation of `cell`, so a future fallible allocator
    // can fail here with the old cell still fully intact.
    let new_cell = Cell::<T>::alloc();
    let nc = &mut *new_cell;

    for &idx in &members {
        let mut n = c.nodes[idx];
        for side in 0..2usize {
            let ch = n.child[side];
            if is_cell_edge(ch) || is_uobj_edge(ch) {
                let old_pidx = ptr_index(ch);
                let slot = nc
                    .alloc_ptr_slot()
                    .expect("the moved subtree's leaf count always matches its freed pointer slots");
                nc.ptrs[slot] = c.ptrs[old_pidx];
                if let PSlot::Cell(gc) = nc.ptrs[slot] {
                    (&mut *gc).set_parent(Some(new_cell));
                }
                c.free_ptr_slot(old_pidx);
                n.child[side] = if is_cell_edge(ch) { cell_edge(slot) } else { uobj_edge(slot) };
            }
        }
        if idx == pivot_idx {
            nc.nodes[0] = n;
        } else {
            nc.nodes[idx] = n;
        }
        c.free_node_slot(idx);
    }
    nc.set_count(members.len());
    c.set_count(c.count() - members.len());

    let new_ptr_slot = c
        .alloc_ptr_slot()
        .expect("freeing the moved subtree's leaves leaves room for one new CELL edge");
    c.ptrs[new_ptr_slot] = PSlot::Cell(new_cell);
    c.nodes[gp_idx].child[gp_side as usize] = cell_edge(new_ptr_slot);
    nc.set_parent(Some(cell));

    new_cell
}

unsafe fn full_cell_admit<T>(cell: *mut Cell<T>, stats: &mut Stats) {
    if let Some((node_idx, side, sub)) = find_pushdown_candidate(&*cell) {
        push_down(cell, node_idx, side, sub);
        stats.note_push_down();
    } else {
        split(cell);
        stats.note_split();
    }
}

/// Adds `obj` (by reference — the tree never allocates or frees user
/// objects) under the key `bitops` reads from it.
///
/// # Safety
/// `obj` must stay valid and its key bytes immutable for as long as it
/// remains in the tree.
pub unsafe fn add<T, B: BitOps<T>>(
    root: &mut Option<*mut Cell<T>>,
    bitops: &B,
    obj: *const T,
    stats: &mut Stats,
) -> Result<(), TreeError> {
    let key = &*obj;

    let r = match *root {
        None => {
            let cell = Cell::<T>::alloc();
            (&mut *cell).make_singleton(obj);
            *root = Some(cell);
            stats.note_cell_alloc();
            return Ok(());
        }
        Some(r) => r,
    };

    let (_, witness) = descend(r, bitops, key);
    let c = bitops.first_diff(KBITS_MAX + 1, key, &*witness);
    if c == FIRST_DIFF_EQUAL {
        return Err(TreeError::AlreadyPresent);
    }
    let c = c as u32;
    let b = bitops.get_bit(c, key);

    if (&*r).is_singleton() {
        install_into_singleton(&mut *r, obj, c, b);
        return Ok(());
    }

    loop {
        match find_insertion_point(r, bitops, key, c) {
            StopPoint::AtRootCellNode0 => {
                if (&*r).alloc_node_slot().is_some() {
                    install_at_root_node0(r, obj, c, b);
                    return Ok(());
                }
                full_cell_admit(r, stats);
            }
            StopPoint::AfterUpper { upper_cell, upper_node, bit } => {
                if (&*upper_cell).alloc_node_slot().is_some() {
                    install_after_upper(upper_cell, upper_node, bit, obj, c);
                    return Ok(());
                }
                full_cell_admit(upper_cell, stats);
            }
        }
    }
}
