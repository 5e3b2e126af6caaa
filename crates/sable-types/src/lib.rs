//! Datatype interner and unifier for the sable compiler.
//!
//! Every datatype in a program is hash-consed through the `TypeInterner`, so
//! `TypeId` identity comparison implies structural equality. The unifier
//! computes the least common refinement of two datatypes, including integer
//! auto-cast adoption, the class/null sub-lattice, and secrecy propagation.

pub mod intern;
pub mod unify;

pub use intern::{TypeId, TypeInterner, TypeKey};
pub use unify::{CastEnv, check_cast, unify};
