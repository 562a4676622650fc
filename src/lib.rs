//! A clustered crit-bit (radix) tree index.
//!
//! Cache-line-sized "cells" each pack up to a handful of crit-bit nodes
//! together with their external pointers, so a lookup crosses far fewer
//! allocations than a node-per-pointer crit-bit tree would. The engine is
//! split the way a typical page-store module is: record layout and
//! allocator (`cell`), traversal (`walker`), and the two mutating passes
//! (`insert`, `delete`) each own their piece, with `tree` tying them into
//! one public type.

mod cell;
mod delete;
mod insert;
mod tree;
mod walker;

pub mod bitops;
pub mod error;
pub mod stats;

pub use bitops::{BitOps, KeyKind};
pub use error::TreeError;
pub use stats::Stats;
pub use tree::Tree;
pub use walker::Cursor;

/// Upper bound on key length in bits that `first_diff` will ever scan past,
/// for kinds whose `key_bits` is given as 0 ("best effort"). Large enough to
/// cover any realistic fixed- or variable-length key; see `bitops::builtin`.
pub const KBITS_MAX: u32 = 4096;

pub use cell::{CELL_MIN, NODES_PER_CELL, PTRS_PER_CELL};
