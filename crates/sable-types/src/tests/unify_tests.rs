use super::*;
use crate::intern::{TypeId, TypeInterner, TypeKey};
use sable_common::{SigId, TclassId};

fn u(tys: &TypeInterner, a: TypeId, b: TypeId) -> Option<TypeId> {
    unify(tys, a, b, false, false)
}

#[test]
fn unify_is_reflexive() {
    let tys = TypeInterner::new();
    let arr = tys.array(TypeId::U8);
    assert_eq!(u(&tys, arr, arr), Some(arr));
    assert_eq!(u(&tys, TypeId::NONE, TypeId::NONE), Some(TypeId::NONE));
}

#[test]
fn unify_widths_must_match_without_autocast() {
    let tys = TypeInterner::new();
    assert_eq!(u(&tys, TypeId::U32, TypeId::U32), Some(TypeId::U32));
    assert_eq!(u(&tys, TypeId::U32, TypeId::U64), None);
    assert_eq!(u(&tys, TypeId::U32, TypeId::I32), None);
}

#[test]
fn autocast_adopts_width_and_signedness() {
    let tys = TypeInterner::new();
    // Unconstrained literal (defaulted u64) against u32 adopts u32.
    assert_eq!(unify(&tys, TypeId::U64, TypeId::U32, true, false), Some(TypeId::U32));
    assert_eq!(unify(&tys, TypeId::U32, TypeId::U64, false, true), Some(TypeId::U32));
    // And adopts signedness of the constrained side.
    assert_eq!(unify(&tys, TypeId::U64, TypeId::I32, true, false), Some(TypeId::I32));
    // Two constrained operands of different signedness never unify.
    assert_eq!(unify(&tys, TypeId::U64, TypeId::I32, false, false), None);
}

#[test]
fn secrecy_is_monotone() {
    let tys = TypeInterner::new();
    let secret_u32 = tys.with_secret(TypeId::U32, true);

    let out = u(&tys, secret_u32, TypeId::U32).unwrap();
    assert!(tys.is_secret(out));
    // Symmetric modulo secrecy.
    let out2 = u(&tys, TypeId::U32, secret_u32).unwrap();
    assert_eq!(out, out2);
}

#[test]
fn unify_is_idempotent() {
    let tys = TypeInterner::new();
    let secret_u32 = tys.with_secret(TypeId::U32, true);

    let cases = [
        (TypeId::U32, secret_u32),
        (TypeId::BOOL, tys.with_secret(TypeId::BOOL, true)),
        (tys.array(TypeId::U8), tys.array(tys.with_secret(TypeId::U8, true))),
        (
            tys.class(TclassId(0), SigId(0), false),
            tys.null_class(TclassId(0)),
        ),
    ];
    for (a, b) in cases {
        let ab = u(&tys, a, b).unwrap();
        assert_eq!(u(&tys, a, ab), Some(ab));
        assert_eq!(u(&tys, ab, b), Some(ab));
    }
}

#[test]
fn null_class_is_bottom_of_class_lattice() {
    let tys = TypeInterner::new();
    let point = TclassId(4);
    let class = tys.class(point, SigId(7), false);
    let null = tys.null_class(point);

    let refined = u(&tys, null, class).unwrap();
    assert_eq!(
        tys.key(refined),
        TypeKey::Class {
            tclass: point,
            sig: SigId(7),
            nullable: true
        }
    );
    // Same in the other direction.
    assert_eq!(u(&tys, class, null), Some(refined));
    // Two nulls of the same tclass stay null.
    assert_eq!(u(&tys, null, null), Some(null));
    // Different tclasses never unify.
    assert_eq!(u(&tys, null, tys.null_class(TclassId(5))), None);
}

#[test]
fn classes_unify_only_on_same_signature() {
    let tys = TypeInterner::new();
    let a = tys.class(TclassId(1), SigId(1), false);
    let b = tys.class(TclassId(1), SigId(2), false);
    let c = tys.class(TclassId(1), SigId(1), true);

    assert_eq!(u(&tys, a, b), None);
    let ac = u(&tys, a, c).unwrap();
    assert_eq!(
        tys.key(ac),
        TypeKey::Class {
            tclass: TclassId(1),
            sig: SigId(1),
            nullable: true
        }
    );
}

#[test]
fn tuples_unify_pointwise() {
    let tys = TypeInterner::new();
    let secret_u32 = tys.with_secret(TypeId::U32, true);
    let t1 = tys.tuple(vec![TypeId::U32, TypeId::BOOL]);
    let t2 = tys.tuple(vec![secret_u32, TypeId::BOOL]);
    let t3 = tys.tuple(vec![TypeId::U32]);
    let t4 = tys.tuple(vec![TypeId::U32, TypeId::STRING]);

    let out = u(&tys, t1, t2).unwrap();
    assert_eq!(out, tys.tuple(vec![secret_u32, TypeId::BOOL]));
    assert_eq!(u(&tys, t1, t3), None);
    assert_eq!(u(&tys, t1, t4), None);
}

struct FixedEnv;

impl CastEnv for FixedEnv {
    fn class_ref_width(&self, _tclass: TclassId) -> u32 {
        32
    }
    fn enum_width(&self, _func: sable_common::FuncId) -> u32 {
        8
    }
}

#[test]
fn casts_widen_but_never_narrow() {
    let tys = TypeInterner::new();
    assert!(check_cast(&tys, TypeId::U32, TypeId::U64, false, &FixedEnv));
    assert!(check_cast(&tys, TypeId::U32, TypeId::I32, false, &FixedEnv));
    assert!(!check_cast(&tys, TypeId::U64, TypeId::U32, false, &FixedEnv));
    // The trunc variant elides the width check.
    assert!(check_cast(&tys, TypeId::U64, TypeId::U32, true, &FixedEnv));
}

#[test]
fn casts_between_string_and_byte_array() {
    let tys = TypeInterner::new();
    let bytes = tys.array(TypeId::U8);
    let words = tys.array(TypeId::U32);
    assert!(check_cast(&tys, TypeId::STRING, bytes, false, &FixedEnv));
    assert!(check_cast(&tys, bytes, TypeId::STRING, false, &FixedEnv));
    assert!(!check_cast(&tys, TypeId::STRING, words, false, &FixedEnv));
}

#[test]
fn casts_between_class_and_ref_width_integer() {
    let tys = TypeInterner::new();
    let class = tys.class(TclassId(0), SigId(0), false);
    assert!(check_cast(&tys, class, TypeId::U32, false, &FixedEnv));
    assert!(check_cast(&tys, TypeId::U32, class, false, &FixedEnv));
    assert!(!check_cast(&tys, class, TypeId::U64, false, &FixedEnv));
    // Nullability hint casts.
    assert!(check_cast(&tys, class, tys.null_class(TclassId(0)), false, &FixedEnv));
    assert!(!check_cast(&tys, class, tys.null_class(TclassId(9)), false, &FixedEnv));
}

#[test]
fn enum_casts_use_enum_width() {
    let tys = TypeInterner::new();
    let e = tys.enum_value(sable_common::FuncId(3));
    assert!(check_cast(&tys, e, TypeId::U8, false, &FixedEnv));
    assert!(check_cast(&tys, e, TypeId::U32, false, &FixedEnv));
    assert!(!check_cast(&tys, TypeId::U32, e, false, &FixedEnv));
    assert!(check_cast(&tys, TypeId::U32, e, true, &FixedEnv));
}
