//! Loc - source location tracking for tree nodes and diagnostics.
//!
//! The parser stamps every block, statement, and expression with the source
//! line it came from; the binder reports fatal errors at the line of the
//! statement task that triggered them. Locs are small and cheap to copy.

use serde::{Deserialize, Serialize};

/// A source location: one-based line number within the compiled module.
///
/// Line 0 is reserved for synthetic nodes the binder creates itself
/// (default `values()` iterators, synthesized `return` statements, inlined
/// iterator bodies).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Loc {
    pub line: u32,
}

impl Loc {
    #[inline]
    #[must_use]
    pub const fn new(line: u32) -> Self {
        Loc { line }
    }

    /// Location for synthetic nodes with no source counterpart.
    #[inline]
    #[must_use]
    pub const fn synthetic() -> Self {
        Loc { line: 0 }
    }

    #[inline]
    #[must_use]
    pub const fn is_synthetic(&self) -> bool {
        self.line == 0
    }

    /// Pick the earlier of two locations, preferring real ones over
    /// synthetic ones.
    #[inline]
    #[must_use]
    pub const fn merge(&self, other: Loc) -> Loc {
        if self.is_synthetic() {
            other
        } else if other.is_synthetic() || self.line <= other.line {
            *self
        } else {
            other
        }
    }
}

impl std::fmt::Display for Loc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_synthetic() {
            write!(f, "<synthetic>")
        } else {
            write!(f, "line {}", self.line)
        }
    }
}
