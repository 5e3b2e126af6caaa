//! Constant propagation: literal folding, overflow trapping, const
//! variable substitution, and modular evaluation.

use num_bigint::BigInt;
use sable_binder::bind;
use sable_common::{ErrorKind, Loc};
use sable_tree::{BinOp, ExprKind, Program, UnOp};

fn loc(line: u32) -> Loc {
    Loc::new(line)
}

fn int_value(p: &Program, e: sable_common::ExprId) -> BigInt {
    match &p.exprs.get(e).kind {
        ExprKind::IntLit { value, .. } => value.clone(),
        other => panic!("expected a folded integer literal, got {other:?}"),
    }
}

#[test]
fn literal_arithmetic_folds() {
    let mut p = Program::new();
    let a = p.e_int_typed(6, 32, false, loc(1));
    let b = p.e_int_typed(7, 32, false, loc(1));
    let prod = p.e_bin(BinOp::Mul, a, b, loc(1));
    let x = p.e_ident("x", loc(1));
    p.s_assign(p.root_block, x, prod, loc(1));

    bind(&mut p).expect("folds cleanly");
    assert_eq!(int_value(&p, prod), BigInt::from(42));
}

#[test]
fn overflow_with_trapping_is_a_compile_error() {
    let mut p = Program::new();
    let a = p.e_int_typed(200, 8, false, loc(3));
    let b = p.e_int_typed(100, 8, false, loc(3));
    let sum = p.e_bin(BinOp::Add, a, b, loc(3));
    let x = p.e_ident("x", loc(3));
    p.s_assign(p.root_block, x, sum, loc(3));

    let err = bind(&mut p).expect_err("200u8 + 100u8 overflows");
    assert_eq!(err.kind, ErrorKind::OverflowWouldOccur);
    assert_eq!(err.loc, loc(3));
}

#[test]
fn trunc_variant_wraps_instead_of_trapping() {
    let mut p = Program::new();
    let a = p.e_int_typed(200, 8, false, loc(1));
    let b = p.e_int_typed(100, 8, false, loc(1));
    let sum = p.e_bin_trunc(BinOp::Add, a, b, loc(1));
    let x = p.e_ident("x", loc(1));
    p.s_assign(p.root_block, x, sum, loc(1));

    bind(&mut p).expect("trunc arithmetic wraps");
    assert_eq!(int_value(&p, sum), BigInt::from(44));
}

#[test]
fn unsafe_mode_disables_the_trap() {
    let mut p = Program::new();
    p.unsafe_mode = true;
    let a = p.e_int_typed(200, 8, false, loc(1));
    let b = p.e_int_typed(100, 8, false, loc(1));
    let sum = p.e_bin(BinOp::Add, a, b, loc(1));
    let x = p.e_ident("x", loc(1));
    p.s_assign(p.root_block, x, sum, loc(1));

    bind(&mut p).expect("unsafe mode elides the trap");
    assert_eq!(int_value(&p, sum), BigInt::from(44));
}

#[test]
fn division_by_zero_is_a_compile_error() {
    let mut p = Program::new();
    let a = p.e_int_typed(1, 32, false, loc(2));
    let b = p.e_int_typed(0, 32, false, loc(2));
    let quot = p.e_bin(BinOp::Div, a, b, loc(2));
    let x = p.e_ident("x", loc(2));
    p.s_assign(p.root_block, x, quot, loc(2));

    let err = bind(&mut p).expect_err("1 / 0");
    assert_eq!(err.kind, ErrorKind::OverflowWouldOccur);
}

#[test]
fn const_variables_propagate_into_reads() {
    let mut p = Program::new();
    p.declare_var(p.root_block, "k", true, loc(1));
    let k = p.e_ident("k", loc(1));
    let ten = p.e_int_typed(10, 32, false, loc(1));
    p.s_assign(p.root_block, k, ten, loc(1));

    let k_read = p.e_ident("k", loc(2));
    let five = p.e_int(5, loc(2));
    let sum = p.e_bin(BinOp::Add, k_read, five, loc(2));
    let y = p.e_ident("y", loc(2));
    p.s_assign(p.root_block, y, sum, loc(2));

    bind(&mut p).expect("const propagation");
    assert_eq!(int_value(&p, sum), BigInt::from(15));
}

#[test]
fn widthof_folds_to_a_u32_literal() {
    let mut p = Program::new();
    let v = p.e_int_typed(7, 64, false, loc(1));
    let x = p.e_ident("x", loc(1));
    p.s_assign(p.root_block, x, v, loc(1));
    let x_read = p.e_ident("x", loc(2));
    let w = p.e_widthof(x_read, loc(2));
    let y = p.e_ident("y", loc(2));
    p.s_assign(p.root_block, y, w, loc(2));

    bind(&mut p).expect("widthof folds");
    assert_eq!(int_value(&p, w), BigInt::from(64));
}

#[test]
fn modular_expressions_fold_under_a_constant_modulus() {
    let mut p = Program::new();
    let three = p.e_int_typed(3, 32, false, loc(1));
    let four = p.e_int_typed(4, 32, false, loc(1));
    let sum = p.e_bin(BinOp::Add, three, four, loc(1));
    let m = p.e_int_typed(5, 32, false, loc(1));
    let modular = p.e_modular(sum, m, loc(1));
    let x = p.e_ident("x", loc(1));
    p.s_assign(p.root_block, x, modular, loc(1));

    bind(&mut p).expect("modular folding");
    assert_eq!(int_value(&p, modular), BigInt::from(2));
}

#[test]
fn modular_negation_stays_in_range() {
    // (-3) mod 5 = 2
    let mut p = Program::new();
    let three = p.e_int_typed(3, 32, false, loc(1));
    let neg = p.e_un(UnOp::Neg, three, loc(1));
    let m = p.e_int_typed(5, 32, false, loc(1));
    let modular = p.e_modular(neg, m, loc(1));
    let x = p.e_ident("x", loc(1));
    p.s_assign(p.root_block, x, modular, loc(1));

    bind(&mut p).expect("modular negation folds");
    assert_eq!(int_value(&p, modular), BigInt::from(2));
}

#[test]
fn modulus_of_zero_is_a_compile_error() {
    let mut p = Program::new();
    let v = p.e_int_typed(3, 32, false, loc(4));
    let m = p.e_int_typed(0, 32, false, loc(4));
    let modular = p.e_modular(v, m, loc(4));
    let x = p.e_ident("x", loc(4));
    p.s_assign(p.root_block, x, modular, loc(4));

    let err = bind(&mut p).expect_err("mod 0");
    assert_eq!(err.kind, ErrorKind::OverflowWouldOccur);
}

#[test]
fn random_integers_never_fold() {
    let mut p = Program::new();
    let r = p.e_rand(32, loc(1));
    let one = p.e_int_typed(1, 32, false, loc(1));
    let sum = p.e_bin(BinOp::Add, r, one, loc(1));
    let x = p.e_ident("x", loc(1));
    p.s_assign(p.root_block, x, sum, loc(1));

    bind(&mut p).expect("random arithmetic binds");
    assert!(
        matches!(p.exprs.get(sum).kind, ExprKind::Binary { .. }),
        "the sum must not fold"
    );
}

#[test]
fn string_concatenation_folds() {
    let mut p = Program::new();
    let a = p.e_str("con", loc(1));
    let b = p.e_str("cat", loc(1));
    let joined = p.e_bin(BinOp::Add, a, b, loc(1));
    let s = p.e_ident("s", loc(1));
    p.s_assign(p.root_block, s, joined, loc(1));

    bind(&mut p).expect("string concat folds");
    match &p.exprs.get(joined).kind {
        ExprKind::StrLit { value } => assert_eq!(value, "concat"),
        other => panic!("expected a folded string, got {other:?}"),
    }
}

#[test]
fn comparisons_and_logicals_fold_to_bools() {
    let mut p = Program::new();
    let a = p.e_int_typed(3, 32, false, loc(1));
    let b = p.e_int_typed(4, 32, false, loc(1));
    let lt = p.e_cmp(sable_tree::CmpOp::Lt, a, b, loc(1));
    let not = p.e_un(UnOp::Not, lt, loc(1));
    let x = p.e_ident("x", loc(1));
    p.s_assign(p.root_block, x, not, loc(1));

    bind(&mut p).expect("comparison folds");
    assert!(matches!(
        p.exprs.get(not).kind,
        ExprKind::BoolLit { value: false }
    ));
}
