use super::*;
use sable_common::{SigId, TclassId};

#[test]
fn interner_intrinsics() {
    let tys = TypeInterner::new();

    assert_eq!(tys.key(TypeId::NONE), TypeKey::None);
    assert_eq!(
        tys.key(TypeId::U32),
        TypeKey::Uint {
            width: 32,
            secret: false
        }
    );
    assert_eq!(tys.uint(32), TypeId::U32);
    assert_eq!(tys.int(64), TypeId::I64);
    assert_eq!(tys.float(64), TypeId::F64);
}

#[test]
fn interner_deduplication() {
    let tys = TypeInterner::new();

    // Same structure should get the same TypeId.
    let a1 = tys.array(TypeId::U8);
    let a2 = tys.array(TypeId::U8);
    let a3 = tys.array(TypeId::U16);

    assert_eq!(a1, a2);
    assert_ne!(a1, a3);

    let t1 = tys.tuple(vec![TypeId::U32, TypeId::BOOL]);
    let t2 = tys.tuple(vec![TypeId::U32, TypeId::BOOL]);
    assert_eq!(t1, t2);
}

#[test]
fn interner_distinguishes_secrecy_and_nullability() {
    let tys = TypeInterner::new();

    let plain = tys.uint(32);
    let secret = tys.with_secret(plain, true);
    assert_ne!(plain, secret);
    assert!(tys.is_secret(secret));
    assert!(!tys.is_secret(plain));
    // Clearing secrecy returns the original identity.
    assert_eq!(tys.with_secret(secret, false), plain);

    let class = tys.class(TclassId(0), SigId(0), false);
    let nullable = tys.with_nullable(class, true);
    assert_ne!(class, nullable);
    assert_eq!(tys.with_nullable(nullable, false), class);
}

#[test]
fn secrecy_recurses_through_aggregates() {
    let tys = TypeInterner::new();

    let arr = tys.array(TypeId::U8);
    let secret_arr = tys.with_secret(arr, true);
    assert!(tys.is_secret(secret_arr));
    assert_eq!(secret_arr, tys.array(tys.with_secret(TypeId::U8, true)));

    let tup = tys.tuple(vec![TypeId::U32, TypeId::BOOL]);
    assert!(tys.is_secret(tys.with_secret(tup, true)));
}

#[test]
fn object_references_are_not_secretable() {
    let tys = TypeInterner::new();

    let class = tys.class(TclassId(0), SigId(0), false);
    assert!(!tys.secretable(class));
    assert!(!tys.secretable(tys.null_class(TclassId(0))));

    // An aggregate containing a class reference anywhere is unsecretable.
    let tup = tys.tuple(vec![TypeId::U32, class]);
    assert!(!tys.secretable(tup));
    let mixed = tys.struct_type(vec![
        (sable_common::Atom(0), TypeId::U32),
        (sable_common::Atom(1), class),
    ]);
    assert!(!tys.secretable(mixed));

    // Numeric leaves are fine.
    assert!(tys.secretable(tys.tuple(vec![TypeId::U32, TypeId::BOOL])));
}

#[test]
fn sign_flip_keeps_width_and_secrecy() {
    let tys = TypeInterner::new();

    let secret_u32 = tys.with_secret(TypeId::U32, true);
    let flipped = tys.with_signed(secret_u32, true);
    assert_eq!(
        tys.key(flipped),
        TypeKey::Int {
            width: 32,
            secret: true
        }
    );
    assert_eq!(tys.with_signed(flipped, false), secret_u32);
}

#[test]
fn snapshot_is_in_id_order() {
    let tys = TypeInterner::new();
    let arr = tys.array(TypeId::U64);
    let snapshot = tys.snapshot();
    assert_eq!(snapshot[arr.index()], TypeKey::Array { elem: TypeId::U64 });
    assert_eq!(snapshot[0], TypeKey::None);
}
