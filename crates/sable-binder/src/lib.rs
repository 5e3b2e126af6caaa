//! Semantic binder for the sable compiler.
//!
//! The binder walks the parsed program, resolves identifiers, instantiates
//! generic functions and classes on demand per unique argument-type
//! signature, performs type inference and unification (integer
//! auto-casting, nullable-class refinement, secrecy propagation), inlines
//! iterator bodies into `for … in …` loops, and folds constants. Binding is
//! event-driven: statement tasks that cannot complete park on events and
//! re-run when the event fires, reaching a fixed point across mutually
//! recursive generic instantiations.

mod call;
mod copy;
mod expr;
mod fold;
mod format;
mod inline;
mod reach;
mod resolve;
mod sig;
mod state;
mod stmt;

pub use state::Binder;

use sable_common::BindError;
use sable_tree::Program;

/// Bind a parsed program in place. On success every reachable expression
/// carries a datatype, every call a resolved signature, iterator loops are
/// inlined, and constants are folded; the refined program is what the code
/// generator consumes. The first fatal semantic error aborts the pass.
pub fn bind(prog: &mut Program) -> Result<(), BindError> {
    Binder::new(prog).run()
}
