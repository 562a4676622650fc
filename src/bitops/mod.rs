//! Key-type-agnostic bit inspection: the one indirection that keeps the cell
//! engine from knowing anything about sign, byte order, collation or hashing.

pub mod builtin;

/// Sentinel `first_diff` result meaning "equal up to `limit`".
pub const FIRST_DIFF_EQUAL: i64 = -1;

/// Key metadata recorded at tree construction time, for the typed finders
/// and for whatever diagnostic a caller wants to print about a tree's
/// configuration. The structural engine itself never inspects this — it
/// only ever calls through `BitOps`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Bits,
    Cstr,
    PCstr,
    U32,
    S32,
    U64,
    S64,
    Custom,
}

/// The pluggable key interface. `B` is chosen once per `Tree` at the type
/// level (see `crate::tree::Tree`) so that the hot descent path dispatches
/// through a monomorphized call rather than an indirect one.
pub trait BitOps<T> {
    /// The bit at position `pos` of the virtual key carried by `key`.
    /// Positions beyond the key's logical length must return 0.
    fn get_bit(&self, pos: u32, key: &T) -> u8;

    /// The smallest position below `limit` at which `a` and `b` differ, or
    /// `FIRST_DIFF_EQUAL` if they agree on every position below `limit`.
    ///
    /// The default walks bit by bit through `get_bit`, which is correct for
    /// every built-in kind since each already folds "beyond my length" into
    /// a constant 0. Override only if a type can do better than one call per
    /// bit.
    fn first_diff(&self, limit: u32, a: &T, b: &T) -> i64 {
        for pos in 0..limit {
            if self.get_bit(pos, a) != self.get_bit(pos, b) {
                return pos as i64;
            }
        }
        FIRST_DIFF_EQUAL
    }
}

#[inline]
pub(crate) fn bit_of_byte(byte: u8, bit_in_byte: u32) -> u8 {
    (byte >> (7 - bit_in_byte)) & 1
}
