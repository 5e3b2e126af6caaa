//! Program tree for the sable compiler.
//!
//! This crate defines the tree the parser hands the binder - blocks
//! containing statements containing expressions, plus tables of functions,
//! variables, and identifiers - together with the arenas and pools the
//! binder refines: tclasses, concrete classes, and signatures. The
//! `Program` root owns all of it.

pub mod block;
pub mod display;
pub mod expr;
pub mod func;
pub mod program;
pub mod sig;
pub mod stmt;
pub mod tclass;
pub mod var;

pub use block::{Block, BlockArena, BlockOwner};
pub use expr::{BinOp, CmpOp, Expr, ExprArena, ExprFlags, ExprKind, IdentTarget, LogOp, UnOp};
pub use func::{FuncArena, FuncKind, Function, OverloadOp};
pub use program::Program;
pub use sig::{Paramspec, SigArena, Signature};
pub use stmt::{RelationKind, Stmt, StmtArena, StmtFlags, StmtKind};
pub use tclass::{Class, ClassArena, Tclass, TclassArena};
pub use var::{VarArena, VarKind, Variable};

#[cfg(test)]
#[path = "tests/tree_tests.rs"]
mod tests;
