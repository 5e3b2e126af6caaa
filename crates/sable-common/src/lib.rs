//! Common types and utilities shared by every sable crate.
//!
//! This crate provides:
//! - Typed index IDs for every arena and pool in the program graph
//! - `Atom` - interned identifier names backed by a `StringTable`
//! - `Loc` - source line tracking for diagnostics
//! - `BindError` / `ErrorKind` - the structured diagnostic type

pub mod atom;
pub mod diagnostics;
pub mod ids;
pub mod loc;

pub use atom::{Atom, StringTable};
pub use diagnostics::{BindError, ErrorKind};
pub use ids::{BlockId, ClassId, ExprId, FuncId, SigId, StmtId, TclassId, VarId};
pub use loc::Loc;
