//! Optional process-wide counters and the teardown-time occupancy
//! histogram. Gated behind the `stats` feature (default-on, since the
//! counters cost a handful of integer increments and the reference crate's
//! own diagnostics — constants and tree-shape printing — are likewise
//! always compiled in, just not always invoked).

use crate::cell::NODES_PER_CELL;

#[cfg(feature = "stats")]
#[derive(Debug, Default, Clone)]
pub struct Stats {
    pub cells_in_use: u64,
    pub push_downs: u64,
    pub splits: u64,
    pub push_ups: u64,
    pub merge_ups: u64,
    pub merge_downs: u64,
    pub failed_merges: u64,
    /// `occupancy_histogram[i]` counts cells with `i + 1` nodes in use.
    /// Populated by `Tree::destroy`.
    pub occupancy_histogram: [u64; NODES_PER_CELL],
}

#[cfg(feature = "stats")]
impl Stats {
    pub(crate) fn note_cell_alloc(&mut self) {
        self.cells_in_use += 1;
    }
    pub(crate) fn note_cell_free(&mut self) {
        self.cells_in_use -= 1;
    }
    pub(crate) fn note_push_down(&mut self) {
        self.push_downs += 1;
    }
    pub(crate) fn note_split(&mut self) {
        self.splits += 1;
        self.cells_in_use += 1;
    }
    pub(crate) fn note_push_up(&mut self) {
        self.push_ups += 1;
        self.cells_in_use -= 1;
    }
    pub(crate) fn note_merge_up(&mut self) {
        self.merge_ups += 1;
        self.cells_in_use -= 1;
    }
    #[allow(dead_code)]
    pub(crate) fn note_merge_down(&mut self) {
        self.merge_downs += 1;
        self.cells_in_use -= 1;
    }
    #[allow(dead_code)]
    pub(crate) fn note_failed_merge(&mut self) {
        self.failed_merges += 1;
    }
    pub(crate) fn record_occupancy(&mut self, node_count: usize) {
        if (1..=NODES_PER_CELL).contains(&node_count) {
            self.occupancy_histogram[node_count - 1] += 1;
        }
    }
}

/// No-op stand-in used when the `stats` feature is disabled, so call sites
/// in `insert`/`delete`/`tree` never need their own `#[cfg]`.
#[cfg(not(feature = "stats"))]
#[derive(Debug, Default, Clone)]
pub struct Stats;

#[cfg(not(feature = "stats"))]
impl Stats {
    pub(crate) fn note_cell_alloc(&mut self) {}
    pub(crate) fn note_cell_free(&mut self) {}
    pub(crate) fn note_push_down(&mut self) {}
    pub(crate) fn note_split(&mut self) {}
    pub(crate) fn note_push_up(&mut self) {}
    pub(crate) fn note_merge_up(&mut self) {}
    pub(crate) fn note_merge_down(&mut self) {}
    pub(crate) fn note_failed_merge(&mut self) {}
    pub(crate) fn record_occupancy(&mut self, _node_count: usize) {}
}
