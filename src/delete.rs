//! Deletion engine: locate, local detach, push-up, merge-up, and the
//! optional merge-down pass.

use crate::bitops::{BitOps, FIRST_DIFF_EQUAL};
use crate::cell::{
    cell_edge, is_cell_edge, is_intra, is_uobj_edge, is_vacant, ptr_index, uobj_edge, Cell,
    PSlot, SINGLETON_CBIT, NODES_PER_CELL,
};
use crate::error::TreeError;
use crate::stats::Stats;
use crate::walker::descend;
use crate::KBITS_MAX;

/// Outcome of detaching one UOBJ edge from its node.
enum DetachOutcome {
    /// An ordinary in-cell collapse happened; the cell is still structurally
    /// intact (its own node 0 untouched as the cell's subtree root).
    Done,
    /// The deleted edge lived at node 0 and its sibling wasn't an intra-cell
    /// node, so the cell's entire subtree has reduced to that one surviving
    /// edge. The cell itself now needs to be dissolved by its caller.
    CellDissolved { edge: u8 },
}

/// Removes the UOBJ edge at `(node, side)` of `cell` and collapses its
/// sibling into place.
unsafe fn detach<T>(cell: *mut Cell<T>, node: usize, side: u8) -> DetachOutcome {
    let c = &mut *cell;
    let removed = c.nodes[node].child[side as usize];
    debug_assert!(is_uobj_edge(removed));
    c.free_ptr_slot(ptr_index(removed));

    let sib_side = 1 - side;
    let sibling = c.nodes[node].child[sib_side as usize];

    if is_intra(sibling) {
        let sib_idx = sibling as usize;
        c.nodes[node] = c.nodes[sib_idx];
        c.free_node_slot(sib_idx);
        c.set_count(c.count() - 1);
        DetachOutcome::Done
    } else if node != 0 {
        let (gp_idx, gp_side) = c
            .node_parent(node)
            .expect("a non-root node always has an in-cell parent");
        c.nodes[gp_idx].child[gp_side as usize] = sibling;
        c.free_node_slot(node);
        c.set_count(c.count() - 1);
        DetachOutcome::Done
    } else {
        DetachOutcome::CellDissolved { edge: sibling }
    }
}

/// Dissolves a one-edge cell by lifting its surviving edge into the pointer
/// slot its parent used to reference it with, reparenting if the edge is
/// itself a cell.
unsafe fn push_up<T>(parent: *mut Cell<T>, anchor_pidx: usize, dissolved: *mut Cell<T>, edge: u8) {
    let p = &mut *parent;
    let (anchor_node, anchor_side) = p
        .node_for_cell_ptr(anchor_pidx)
        .expect("anchor_pidx must currently hold the CELL edge to the dissolved cell");
    let d = &*dissolved;
    if is_cell_edge(edge) {
        let gc = match d.ptrs[ptr_index(edge)] {
            PSlot::Cell(c) => c,
            _ => unreachable!(),
        };
        p.ptrs[anchor_pidx] = PSlot::Cell(gc);
        (&mut *gc).set_parent(Some(parent));
        p.nodes[anchor_node].child[anchor_side as usize] = cell_edge(anchor_pidx);
    } else {
        let obj = match d.ptrs[ptr_index(edge)] {
            PSlot::Obj(o) => o,
            _ => unreachable!(),
        };
        p.ptrs[anchor_pidx] = PSlot::Obj(obj);
        p.nodes[anchor_node].child[anchor_side as usize] = uobj_edge(anchor_pidx);
    }
    Cell::free(dissolved);
}

/// Folds `src`'s entire subtree into `dst`, replacing the CELL edge at
/// `dst.ptrs[anchor_pidx]` with `src`'s migrated root, then frees `src`.
/// Used for both merge-up (`dst` = parent) and merge-down (`dst` = child).
unsafe fn fold_into<T>(dst: *mut Cell<T>, anchor_pidx: usize, src: *mut Cell<T>) {
    let d = &mut *dst;
    let s = &*src;

    let (anchor_node, anchor_side) = d
        .node_for_cell_ptr(anchor_pidx)
        .expect("anchor_pidx must currently hold the CELL edge being folded");

    let mut slot_map = [usize::MAX; NODES_PER_CELL];
    for i in 0..NODES_PER_CELL {
        if is_vacant(s.nodes[i].child[0]) {
            continue;
        }
        slot_map[i] = d
            .alloc_node_slot()
            .expect("the combined count was checked to fit before folding");
    }

    d.free_ptr_slot(anchor_pidx);

    for i in 0..NODES_PER_CELL {
        if slot_map[i] == usize::MAX {
            continue;
        }
        let mut n = s.nodes[i];
        for side in 0..2usize {
            let ch = n.child[side];
            if is_intra(ch) {
                n.child[side] = slot_map[ch as usize] as u8;
            } else {
                let old_pidx = ptr_index(ch);
                let new_slot = d
                    .alloc_ptr_slot()
                    .expect("folding preserves total leaf-edge count, which fits by the pre-fold size check");
                d.ptrs[new_slot] = s.ptrs[old_pidx];
                if let PSlot::Cell(gc) = d.ptrs[new_slot] {
                    (&mut *gc).set_parent(Some(dst));
                }
                n.child[side] = if is_cell_edge(ch) { cell_edge(new_slot) } else { uobj_edge(new_slot) };
            }
        }
        d.nodes[slot_map[i]] = n;
    }

    d.nodes[anchor_node].child[anchor_side as usize] = slot_map[0] as u8;
    d.set_count(d.count() + s.count());
    Cell::free(src);
}

unsafe fn resolve_dissolution<T>(
    cell: *mut Cell<T>,
    root: &mut Option<*mut Cell<T>>,
    edge: u8,
    stats: &mut Stats,
) {
    let c = &*cell;
    match c.parent() {
        Some(parent) => {
            let (anchor_pidx, _, _) = Cell::anchor_in_parent(&*parent, cell)
                .expect("a non-root cell's parent always references it exactly once");
            push_up(parent, anchor_pidx, cell, edge);
            stats.note_push_up();
        }
        None => {
            // `cell` is the tree root; there is no parent to push up into.
            let rc = &mut *cell;
            if is_uobj_edge(edge) {
                // reuse the existing pointer slot; it already holds the
                // surviving object, only node 0's shape needs to change.
                let pidx = ptr_index(edge);
                rc.nodes[0].cbit = SINGLETON_CBIT;
                rc.nodes[0].child = [uobj_edge(pidx), 0x3F];
                rc.set_count(1);
            } else {
                let gc = match rc.ptrs[ptr_index(edge)] {
                    PSlot::Cell(cc) => cc,
                    _ => unreachable!(),
                };
                (&mut *gc).set_parent(None);
                *root = Some(gc);
                Cell::free(cell);
                stats.note_cell_free();
            }
        }
    }
}

unsafe fn rebalance_after_detach<T>(cell: *mut Cell<T>, merge_down: bool, stats: &mut Stats) {
    let c = &*cell;
    if let Some(parent) = c.parent() {
        let p = &*parent;
        if c.count() + p.count() <= NODES_PER_CELL {
            if let Some((anchor_pidx, _, _)) = Cell::anchor_in_parent(p, cell) {
                fold_into(parent, anchor_pidx, cell);
                stats.note_merge_up();
                return;
            }
        }
    }

    if merge_down {
        let c = &*cell;
        for (pidx, slot) in c.ptrs.iter().enumerate() {
            if let PSlot::Cell(child) = slot {
                let child_count = (&**child).count();
                if c.count() + child_count <= NODES_PER_CELL {
                    fold_into(cell, pidx, *child);
                    stats.note_merge_down();
                    return;
                }
                stats.note_failed_merge();
            }
        }
    }
}

/// Removes the object whose key matches `key`'s, by value.
///
/// # Safety
/// Every object pointer remaining reachable in the tree must stay valid.
pub unsafe fn remove<T, B: BitOps<T>>(
    root: &mut Option<*mut Cell<T>>,
    bitops: &B,
    key: &T,
    merge_down: bool,
    stats: &mut Stats,
) -> Result<(), TreeError> {
    let r = match *root {
        Some(r) => r,
        None => return Err(TreeError::Absent),
    };

    let (cur, witness) = descend(r, bitops, key);
    let c = bitops.first_diff(KBITS_MAX + 1, key, &*witness);
    if c != FIRST_DIFF_EQUAL {
        return Err(TreeError::Absent);
    }

    if (&*r).is_singleton() {
        Cell::free(r);
        *root = None;
        stats.note_cell_free();
        return Ok(());
    }

    match detach(cur.cell, cur.node, cur.side) {
        DetachOutcome::Done => rebalance_after_detach(cur.cell, merge_down, stats),
        DetachOutcome::CellDissolved { edge } => resolve_dissolution(cur.cell, root, edge, stats),
    }
    Ok(())
}
