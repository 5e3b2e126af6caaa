//! Typed index IDs for the program graph.
//!
//! Every arena and pool in the program hands out one of these newtypes
//! instead of raw indices or references. Components hold IDs rather than
//! owning pointers, so rebinding a function body under a new signature never
//! invalidates older bound signatures, and cyclic class graphs are expressed
//! with stable handles into a central pool.

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(pub u32);

        impl $name {
            #[inline]
            #[must_use]
            pub const fn new(index: usize) -> Self {
                Self(index as u32)
            }

            #[inline]
            #[must_use]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }
    };
}

define_id!(
    /// Index of an expression node in the expression arena.
    ExprId
);
define_id!(
    /// Index of a statement in the statement arena.
    StmtId
);
define_id!(
    /// Index of a lexical block in the block arena.
    BlockId
);
define_id!(
    /// Index of a function in the function arena.
    FuncId
);
define_id!(
    /// Index of a variable in the variable arena.
    VarId
);
define_id!(
    /// Index of a generic class template in the tclass arena.
    TclassId
);
define_id!(
    /// Handle of a concrete class instantiation in the class pool.
    ClassId
);
define_id!(
    /// Handle of an interned function signature in the signature pool.
    SigId
);
