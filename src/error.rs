//! Error surface for tree mutation and lookup operations.

/// Failure kinds a tree operation can report.
///
/// Mutation operations return `Result<(), TreeError>`; lookups return
/// `Option<_>` and never produce a `TreeError` of their own (a miss is not an
/// error). No kind here carries a payload — callers have the object or key
/// they passed in hand already.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeError {
    /// Null receiver, wrong key kind for a typed finder, or similar misuse.
    BadArgument,
    /// `add` of a key that already compares equal to one in the tree.
    AlreadyPresent,
    /// `remove`/`locate` of a key that isn't indexed.
    Absent,
    /// Cell allocation failed during a split or push-down.
    OutOfMemory,
}

impl std::fmt::Display for TreeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            TreeError::BadArgument => "bad argument",
            TreeError::AlreadyPresent => "key already present",
            TreeError::Absent => "key absent",
            TreeError::OutOfMemory => "out of memory",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for TreeError {}
