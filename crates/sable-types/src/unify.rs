//! Unification and cast verification.
//!
//! `unify` computes the least common refinement of two datatypes, or `None`
//! when no refinement exists (the caller reports a type-mismatch with both
//! datatypes rendered). Secrecy is monotone: if either side is secret the
//! result is secret. NullClass is the bottom of the class sub-lattice and is
//! refined upward by any concrete Class of the same tclass.

use crate::intern::{TypeId, TypeInterner, TypeKey};
use sable_common::{FuncId, TclassId};
use tracing::trace;

/// Environment the cast checker consults for program facts the type graph
/// itself does not carry.
pub trait CastEnv {
    /// Bit width of the object references of a tclass.
    fn class_ref_width(&self, tclass: TclassId) -> u32;
    /// Bit width of an enum's runtime representation.
    fn enum_width(&self, func: FuncId) -> u32;
}

/// Compute the least common refinement of `a` and `b`.
///
/// `a_auto` / `b_auto` mark operands whose value is an integer literal with
/// no explicit width: such an operand adopts the width (and signedness) of
/// the other side. Reflexive, and symmetric modulo secrecy.
pub fn unify(
    tys: &TypeInterner,
    a: TypeId,
    b: TypeId,
    a_auto: bool,
    b_auto: bool,
) -> Option<TypeId> {
    if a == b {
        return Some(a);
    }
    let ka = tys.key(a);
    let kb = tys.key(b);
    trace!(?ka, ?kb, "unify");
    match (ka, kb) {
        (TypeKey::Bool { secret: s1 }, TypeKey::Bool { secret: s2 }) => {
            Some(tys.intern(TypeKey::Bool { secret: s1 || s2 }))
        }
        (TypeKey::Str { secret: s1 }, TypeKey::Str { secret: s2 }) => {
            Some(tys.intern(TypeKey::Str { secret: s1 || s2 }))
        }
        (
            TypeKey::Uint {
                width: w1,
                secret: s1,
            },
            TypeKey::Uint {
                width: w2,
                secret: s2,
            },
        ) => {
            let width = unify_width(w1, w2, a_auto, b_auto)?;
            Some(tys.intern(TypeKey::Uint {
                width,
                secret: s1 || s2,
            }))
        }
        (
            TypeKey::Int {
                width: w1,
                secret: s1,
            },
            TypeKey::Int {
                width: w2,
                secret: s2,
            },
        ) => {
            let width = unify_width(w1, w2, a_auto, b_auto)?;
            Some(tys.intern(TypeKey::Int {
                width,
                secret: s1 || s2,
            }))
        }
        // Mixed signedness only unifies when the autocast side adopts the
        // signedness of the constrained side.
        (
            TypeKey::Uint { secret: s1, .. } | TypeKey::Int { secret: s1, .. },
            TypeKey::Uint { secret: s2, .. } | TypeKey::Int { secret: s2, .. },
        ) => {
            if a_auto && !b_auto {
                Some(tys.with_secret(b, s1 || s2))
            } else if b_auto && !a_auto {
                Some(tys.with_secret(a, s1 || s2))
            } else {
                None
            }
        }
        (TypeKey::Float { width: w1 }, TypeKey::Float { width: w2 }) => {
            (w1 == w2).then(|| tys.float(w1))
        }
        (TypeKey::Array { elem: e1 }, TypeKey::Array { elem: e2 }) => {
            let elem = unify(tys, e1, e2, a_auto, b_auto)?;
            Some(tys.array(elem))
        }
        (TypeKey::Tuple { elems: e1 }, TypeKey::Tuple { elems: e2 }) => {
            if e1.len() != e2.len() {
                return None;
            }
            let elems = e1
                .iter()
                .zip(&e2)
                .map(|(&x, &y)| unify(tys, x, y, a_auto, b_auto))
                .collect::<Option<Vec<_>>>()?;
            Some(tys.tuple(elems))
        }
        (TypeKey::Struct { fields: f1 }, TypeKey::Struct { fields: f2 }) => {
            if f1.len() != f2.len() {
                return None;
            }
            let fields = f1
                .iter()
                .zip(&f2)
                .map(|(&(n1, t1), &(n2, t2))| {
                    if n1 != n2 {
                        return None;
                    }
                    Some((n1, unify(tys, t1, t2, a_auto, b_auto)?))
                })
                .collect::<Option<Vec<_>>>()?;
            Some(tys.struct_type(fields))
        }
        (
            TypeKey::Class {
                tclass: t1,
                sig: sig1,
                nullable: n1,
            },
            TypeKey::Class {
                tclass: t2,
                sig: sig2,
                nullable: n2,
            },
        ) => {
            if t1 != t2 || sig1 != sig2 {
                return None;
            }
            Some(tys.class(t1, sig1, n1 || n2))
        }
        (
            TypeKey::Class {
                tclass: t1, sig, ..
            },
            TypeKey::NullClass { tclass: t2 },
        )
        | (
            TypeKey::NullClass { tclass: t2 },
            TypeKey::Class {
                tclass: t1, sig, ..
            },
        ) => {
            // NullClass refines upward; the value held null at some point,
            // so the refined class is nullable.
            (t1 == t2).then(|| tys.class(t1, sig, true))
        }
        (TypeKey::NullClass { tclass: t1 }, TypeKey::NullClass { tclass: t2 }) => {
            (t1 == t2).then(|| tys.null_class(t1))
        }
        (
            TypeKey::Funcptr {
                ret: r1,
                params: p1,
            },
            TypeKey::Funcptr {
                ret: r2,
                params: p2,
            },
        ) => {
            if p1.len() != p2.len() {
                return None;
            }
            let ret = unify(tys, r1, r2, false, false)?;
            let params = p1
                .iter()
                .zip(&p2)
                .map(|(&x, &y)| unify(tys, x, y, false, false))
                .collect::<Option<Vec<_>>>()?;
            Some(tys.funcptr(ret, params))
        }
        // Function, Enum, EnumClass, Tclass, Modint, and None unify only
        // with themselves, which the identity check above already handled.
        _ => None,
    }
}

fn unify_width(w1: u32, w2: u32, a_auto: bool, b_auto: bool) -> Option<u32> {
    if w1 == w2 {
        Some(w1)
    } else if a_auto && b_auto {
        Some(w1.max(w2))
    } else if a_auto {
        Some(w2)
    } else if b_auto {
        Some(w1)
    } else {
        None
    }
}

/// Verify that a cast `<to>value-of-from` is legal.
///
/// Legal casts: numeric/enum to numeric/enum of equal or widened width
/// (any width when `trunc`); String to/from Array(u8); Class to/from an
/// integer whose width equals the tclass ref-width; Class to/from
/// NullClass of the same tclass.
pub fn check_cast(
    tys: &TypeInterner,
    from: TypeId,
    to: TypeId,
    trunc: bool,
    env: &dyn CastEnv,
) -> bool {
    if from == to {
        return true;
    }
    if let (Some(wf), Some(wt)) = (numeric_width(tys, from, env), numeric_width(tys, to, env)) {
        return trunc || wt >= wf;
    }
    match (tys.key(from), tys.key(to)) {
        (TypeKey::Str { .. }, TypeKey::Array { elem })
        | (TypeKey::Array { elem }, TypeKey::Str { .. }) => {
            matches!(tys.key(elem), TypeKey::Uint { width: 8, .. })
        }
        (TypeKey::Class { tclass, .. }, TypeKey::Uint { width, .. })
        | (TypeKey::Class { tclass, .. }, TypeKey::Int { width, .. })
        | (TypeKey::Uint { width, .. }, TypeKey::Class { tclass, .. })
        | (TypeKey::Int { width, .. }, TypeKey::Class { tclass, .. }) => {
            width == env.class_ref_width(tclass)
        }
        (TypeKey::Class { tclass: t1, .. }, TypeKey::NullClass { tclass: t2 })
        | (TypeKey::NullClass { tclass: t1 }, TypeKey::Class { tclass: t2, .. }) => t1 == t2,
        _ => false,
    }
}

fn numeric_width(tys: &TypeInterner, id: TypeId, env: &dyn CastEnv) -> Option<u32> {
    match tys.key(id) {
        TypeKey::Uint { width, .. } | TypeKey::Int { width, .. } | TypeKey::Float { width } => {
            Some(width)
        }
        TypeKey::Enum { func } => Some(env.enum_width(func)),
        _ => None,
    }
}

#[cfg(test)]
#[path = "tests/unify_tests.rs"]
mod tests;
