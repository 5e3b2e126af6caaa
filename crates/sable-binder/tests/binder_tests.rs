//! Core binding scenarios: auto-casting, secrecy, scope resolution,
//! overloads, print formats, and error reporting.

use sable_binder::bind;
use sable_common::{ErrorKind, Loc};
use sable_tree::{BinOp, CmpOp, FuncKind, IdentTarget, OverloadOp, Program, StmtKind};
use sable_types::{TypeId, TypeKey};

fn loc(line: u32) -> Loc {
    Loc::new(line)
}

fn var_type(p: &Program, name: &str) -> TypeId {
    let atom = p.strings.get(name).expect("name interned");
    let Some(IdentTarget::Var(v)) = p.lookup(p.root_block, atom) else {
        panic!("'{name}' is not a variable in the root scope");
    };
    p.vars.get(v).ty.expect("variable bound")
}

#[test]
fn autocast_adopts_constraint_width() {
    // a: u32 = 1 + 2
    let mut p = Program::new();
    let one = p.e_int(1, loc(1));
    let two = p.e_int(2, loc(1));
    let sum = p.e_bin(BinOp::Add, one, two, loc(1));
    let a = p.e_ident("a", loc(1));
    let u32_ty = p.e_type(TypeId::U32, loc(1));
    p.s_assign_typed(p.root_block, a, sum, u32_ty, loc(1));

    bind(&mut p).expect("binds cleanly");
    assert_eq!(var_type(&p, "a"), TypeId::U32);
    // Both literals adopted u32.
    assert_eq!(p.exprs.get(one).ty, Some(TypeId::U32));
    assert_eq!(p.exprs.get(two).ty, Some(TypeId::U32));
    assert_eq!(p.exprs.get(sum).ty, Some(TypeId::U32));
}

#[test]
fn autocast_cannot_bridge_declared_signedness() {
    // a: u32 = 1 + 2i32
    let mut p = Program::new();
    let one = p.e_int(1, loc(1));
    let two = p.e_int_typed(2, 32, true, loc(1));
    let sum = p.e_bin(BinOp::Add, one, two, loc(1));
    let a = p.e_ident("a", loc(1));
    let u32_ty = p.e_type(TypeId::U32, loc(1));
    p.s_assign_typed(p.root_block, a, sum, u32_ty, loc(1));

    let err = bind(&mut p).expect_err("i32 does not fit a u32 slot");
    assert_eq!(err.kind, ErrorKind::TypeMismatch);
}

#[test]
fn secrecy_propagates_through_arithmetic() {
    // s = secret(5u32); t = s + 1
    let mut p = Program::new();
    let five = p.e_int_typed(5, 32, false, loc(1));
    let secret = p.e_secret(five, loc(1));
    let s = p.e_ident("s", loc(1));
    p.s_assign(p.root_block, s, secret, loc(1));
    let s_read = p.e_ident("s", loc(2));
    let one = p.e_int(1, loc(2));
    let sum = p.e_bin(BinOp::Add, s_read, one, loc(2));
    let t = p.e_ident("t", loc(2));
    p.s_assign(p.root_block, t, sum, loc(2));

    bind(&mut p).expect("binds cleanly");
    let t_ty = var_type(&p, "t");
    assert!(p.types.is_secret(t_ty));
    assert_eq!(p.types.with_secret(t_ty, false), TypeId::U32);
}

#[test]
fn branching_on_secret_is_rejected() {
    // x = 1u32; if secret(x == 0) { }
    let mut p = Program::new();
    let one = p.e_int_typed(1, 32, false, loc(1));
    let x = p.e_ident("x", loc(1));
    p.s_assign(p.root_block, x, one, loc(1));
    let x_read = p.e_ident("x", loc(2));
    let zero = p.e_int(0, loc(2));
    let cmp = p.e_cmp(CmpOp::Eq, x_read, zero, loc(2));
    let cond = p.e_secret(cmp, loc(2));
    p.s_if(p.root_block, cond, loc(2));

    let err = bind(&mut p).expect_err("secret branch");
    assert_eq!(err.kind, ErrorKind::SecretViolation);
}

#[test]
fn marking_an_object_reference_secret_is_rejected() {
    let mut p = Program::new();
    let point = p.declare_tclass(p.root_block, "Point", 32, false, loc(1));
    let _ = point;
    let ctor = p.e_ident("Point", loc(2));
    let call = p.e_call(ctor, vec![], loc(2));
    let obj = p.e_ident("obj", loc(2));
    p.s_assign(p.root_block, obj, call, loc(2));
    let obj_read = p.e_ident("obj", loc(3));
    let secret = p.e_secret(obj_read, loc(3));
    let s = p.e_ident("s", loc(3));
    p.s_assign(p.root_block, s, secret, loc(3));

    let err = bind(&mut p).expect_err("references are unsecretable");
    assert_eq!(err.kind, ErrorKind::SecretViolation);
}

#[test]
fn undefined_identifier_is_reported_after_the_fixed_point() {
    let mut p = Program::new();
    let y = p.e_ident("y", loc(3));
    let x = p.e_ident("x", loc(3));
    p.s_assign(p.root_block, x, y, loc(3));

    let err = bind(&mut p).expect_err("y is never defined");
    assert_eq!(err.kind, ErrorKind::UndefinedIdentifier);
    assert_eq!(err.loc, loc(3));
    assert!(err.message.contains('y'), "{}", err.message);
}

#[test]
fn forward_references_resolve_through_events() {
    // x = y * 2; y = 21u64  (module-level forward reference)
    let mut p = Program::new();
    let y_read = p.e_ident("y", loc(1));
    let two = p.e_int(2, loc(1));
    let prod = p.e_bin(BinOp::Mul, y_read, two, loc(1));
    let x = p.e_ident("x", loc(1));
    p.s_assign(p.root_block, x, prod, loc(1));
    let y = p.e_ident("y", loc(2));
    let vy = p.e_int_typed(21, 64, false, loc(2));
    p.s_assign(p.root_block, y, vy, loc(2));

    bind(&mut p).expect("the parked task re-runs once y exists");
    assert_eq!(var_type(&p, "x"), TypeId::U64);
}

#[test]
fn const_reassignment_is_rejected() {
    let mut p = Program::new();
    p.declare_var(p.root_block, "k", true, loc(1));
    let k1 = p.e_ident("k", loc(1));
    let v1 = p.e_int_typed(1, 32, false, loc(1));
    p.s_assign(p.root_block, k1, v1, loc(1));
    let k2 = p.e_ident("k", loc(2));
    let v2 = p.e_int_typed(2, 32, false, loc(2));
    p.s_assign(p.root_block, k2, v2, loc(2));

    let err = bind(&mut p).expect_err("constant reassignment");
    assert_eq!(err.kind, ErrorKind::TypeMismatch);
    assert_eq!(err.loc, loc(2));
}

#[test]
fn ambiguous_operator_overload_is_an_error() {
    let mut p = Program::new();
    let point = p.declare_tclass(p.root_block, "Point", 32, false, loc(1));
    let _ = point;

    // Two operator+ overloads, both unconstrained: any class operands
    // satisfy both.
    for name in ["plus_a", "plus_b"] {
        let f = p.declare_operator(p.root_block, name, OverloadOp::Add, loc(1));
        p.add_param(f, "a", None, None, loc(1));
        p.add_param(f, "b", None, None, loc(1));
        let body = p.funcs.get(f).body;
        let one = p.e_int_typed(1, 32, false, loc(1));
        p.s_return(body, Some(one), loc(1));
    }

    let ctor_a = p.e_ident("Point", loc(2));
    let a_call = p.e_call(ctor_a, vec![], loc(2));
    let a = p.e_ident("a", loc(2));
    p.s_assign(p.root_block, a, a_call, loc(2));
    let ctor_b = p.e_ident("Point", loc(3));
    let b_call = p.e_call(ctor_b, vec![], loc(3));
    let b = p.e_ident("b", loc(3));
    p.s_assign(p.root_block, b, b_call, loc(3));

    let a_read = p.e_ident("a", loc(4));
    let b_read = p.e_ident("b", loc(4));
    let sum = p.e_bin(BinOp::Add, a_read, b_read, loc(4));
    let x = p.e_ident("x", loc(4));
    p.s_assign(p.root_block, x, sum, loc(4));

    let err = bind(&mut p).expect_err("two candidates accept (Point, Point)");
    assert_eq!(err.kind, ErrorKind::AmbiguousOverload);
}

#[test]
fn single_operator_overload_resolves() {
    let mut p = Program::new();
    p.declare_tclass(p.root_block, "Point", 32, false, loc(1));
    let f = p.declare_operator(p.root_block, "plus", OverloadOp::Add, loc(1));
    p.add_param(f, "a", None, None, loc(1));
    p.add_param(f, "b", None, None, loc(1));
    let body = p.funcs.get(f).body;
    let one = p.e_int_typed(1, 32, false, loc(1));
    p.s_return(body, Some(one), loc(1));

    let ctor_a = p.e_ident("Point", loc(2));
    let a_call = p.e_call(ctor_a, vec![], loc(2));
    let a = p.e_ident("a", loc(2));
    p.s_assign(p.root_block, a, a_call, loc(2));
    let a_read = p.e_ident("a", loc(3));
    let a_read2 = p.e_ident("a", loc(3));
    let sum = p.e_bin(BinOp::Add, a_read, a_read2, loc(3));
    let x = p.e_ident("x", loc(3));
    p.s_assign(p.root_block, x, sum, loc(3));

    bind(&mut p).expect("one candidate wins");
    assert_eq!(var_type(&p, "x"), TypeId::U32);
    assert!(p.exprs.get(sum).sig.is_some(), "overload recorded on the node");
}

#[test]
fn print_format_widths_are_embedded() {
    let mut p = Program::new();
    let x = p.e_ident("x", loc(1));
    let v = p.e_int_typed(7, 32, false, loc(1));
    p.s_assign(p.root_block, x, v, loc(1));
    let fmt = p.e_str("x=%u\n", loc(2));
    let x_read = p.e_ident("x", loc(2));
    let print = p.s_print(p.root_block, vec![fmt, x_read], loc(2));

    bind(&mut p).expect("format checks out");
    let StmtKind::Print { rewritten, .. } = &p.stmts.get(print).kind else {
        panic!("print statement");
    };
    assert_eq!(rewritten.as_deref(), Some("x=%u32\n"));
}

#[test]
fn printing_a_secret_is_rejected() {
    let mut p = Program::new();
    let v = p.e_int_typed(7, 32, false, loc(1));
    let sec = p.e_secret(v, loc(1));
    let x = p.e_ident("x", loc(1));
    p.s_assign(p.root_block, x, sec, loc(1));
    let fmt = p.e_str("%u\n", loc(2));
    let x_read = p.e_ident("x", loc(2));
    p.s_print(p.root_block, vec![fmt, x_read], loc(2));

    let err = bind(&mut p).expect_err("secret print");
    assert_eq!(err.kind, ErrorKind::SecretViolation);
}

#[test]
fn format_width_mismatch_is_rejected() {
    let mut p = Program::new();
    let x = p.e_ident("x", loc(1));
    let v = p.e_int_typed(7, 32, false, loc(1));
    p.s_assign(p.root_block, x, v, loc(1));
    let fmt = p.e_str("%u16\n", loc(2));
    let x_read = p.e_ident("x", loc(2));
    p.s_print(p.root_block, vec![fmt, x_read], loc(2));

    let err = bind(&mut p).expect_err("declared width 16 vs u32");
    assert_eq!(err.kind, ErrorKind::TypeMismatch);
}

#[test]
fn casts_follow_the_legal_families() {
    let mut p = Program::new();
    // ok: widening u32 -> u64
    let v = p.e_int_typed(7, 32, false, loc(1));
    let u64_ty = p.e_type(TypeId::U64, loc(1));
    let widened = p.e_cast(u64_ty, v, false, loc(1));
    let a = p.e_ident("a", loc(1));
    p.s_assign(p.root_block, a, widened, loc(1));
    bind(&mut p).expect("widening casts are legal");
    assert_eq!(var_type(&p, "a"), TypeId::U64);

    // not ok: narrowing without :trunc
    let mut p = Program::new();
    let v = p.e_int_typed(7, 64, false, loc(1));
    let u8_ty = p.e_type(TypeId::U8, loc(1));
    let narrowed = p.e_cast(u8_ty, v, false, loc(1));
    let b = p.e_ident("b", loc(1));
    p.s_assign(p.root_block, b, narrowed, loc(1));
    let err = bind(&mut p).expect_err("narrowing needs :trunc");
    assert_eq!(err.kind, ErrorKind::InvalidCast);

    // ok with :trunc
    let mut p = Program::new();
    let v = p.e_int_typed(7, 64, false, loc(1));
    let u8_ty = p.e_type(TypeId::U8, loc(1));
    let truncated = p.e_cast(u8_ty, v, true, loc(1));
    let c = p.e_ident("c", loc(1));
    p.s_assign(p.root_block, c, truncated, loc(1));
    bind(&mut p).expect("trunc casts narrow");
    assert_eq!(var_type(&p, "c"), TypeId::U8);
}

#[test]
fn string_and_byte_array_casts() {
    let mut p = Program::new();
    let s = p.e_str("abc", loc(1));
    let bytes_ty = p.types.array(TypeId::U8);
    let ty_expr = p.e_type(bytes_ty, loc(1));
    let cast = p.e_cast(ty_expr, s, false, loc(1));
    let b = p.e_ident("b", loc(1));
    p.s_assign(p.root_block, b, cast, loc(1));

    bind(&mut p).expect("string <-> [u8] casts are legal");
    assert_eq!(var_type(&p, "b"), bytes_ty);
}

#[test]
fn shift_by_secret_distance_is_rejected() {
    let mut p = Program::new();
    let d = p.e_int_typed(3, 32, false, loc(1));
    let secret_d = p.e_secret(d, loc(1));
    let sd = p.e_ident("d", loc(1));
    p.s_assign(p.root_block, sd, secret_d, loc(1));
    let v = p.e_int_typed(8, 32, false, loc(2));
    let d_read = p.e_ident("d", loc(2));
    let shifted = p.e_bin(BinOp::Shl, v, d_read, loc(2));
    let x = p.e_ident("x", loc(2));
    p.s_assign(p.root_block, x, shifted, loc(2));

    let err = bind(&mut p).expect_err("secret shift distance");
    assert_eq!(err.kind, ErrorKind::SecretViolation);
}

#[test]
fn enum_entries_bind_through_dot_access() {
    let mut p = Program::new();
    let color = p.declare_enum(p.root_block, "Color", &["red", "green"], loc(1));
    let base = p.e_ident("Color", loc(2));
    let red = p.e_dot(base, "red", loc(2));
    let x = p.e_ident("x", loc(2));
    p.s_assign(p.root_block, x, red, loc(2));

    bind(&mut p).expect("enum access binds");
    assert_eq!(var_type(&p, "x"), p.types.enum_value(color));
}

#[test]
fn modular_expressions_take_the_modulus_width() {
    // x = (a + b) mod 97u32
    let mut p = Program::new();
    for (name, v) in [("a", 40u32), ("b", 80u32)] {
        let lit = p.e_int_typed(v, 32, false, loc(1));
        let target = p.e_ident(name, loc(1));
        p.s_assign(p.root_block, target, lit, loc(1));
    }
    let a = p.e_ident("a", loc(2));
    let b = p.e_ident("b", loc(2));
    let sum = p.e_bin(BinOp::Add, a, b, loc(2));
    let m = p.e_int_typed(97, 32, false, loc(2));
    let modular = p.e_modular(sum, m, loc(2));
    let x = p.e_ident("x", loc(2));
    p.s_assign(p.root_block, x, modular, loc(2));

    bind(&mut p).expect("modular expression binds");
    assert_eq!(var_type(&p, "x"), TypeId::U32);
    // The inner arithmetic is typed as the modular sub-expression.
    assert!(matches!(
        p.types.key(p.exprs.get(sum).ty.unwrap()),
        TypeKey::Modint { .. }
    ));
}

#[test]
fn illegal_operator_inside_modular_expression() {
    let mut p = Program::new();
    let a = p.e_int_typed(4, 32, false, loc(1));
    let b = p.e_int_typed(1, 32, false, loc(1));
    let shifted = p.e_bin(BinOp::Shl, a, b, loc(1));
    let m = p.e_int_typed(97, 32, false, loc(1));
    let modular = p.e_modular(shifted, m, loc(1));
    let x = p.e_ident("x", loc(1));
    p.s_assign(p.root_block, x, modular, loc(1));

    let err = bind(&mut p).expect_err("shift inside mod");
    assert_eq!(err.kind, ErrorKind::InvalidModularExpression);
}

#[test]
fn value_returning_function_must_return_on_every_path() {
    let mut p = Program::new();
    let f = p.declare_function(p.root_block, "pick", FuncKind::Plain, loc(1));
    p.add_param(f, "flag", None, None, loc(1));
    let body = p.funcs.get(f).body;
    let flag = p.e_ident("flag", loc(2));
    let (_, then_block) = p.s_if(body, flag, loc(2));
    let one = p.e_int_typed(1, 32, false, loc(3));
    p.s_return(then_block, Some(one), loc(3));
    // No return on the fall-through path.

    let t = p.e_bool(true, loc(5));
    let callee = p.e_ident("pick", loc(5));
    let call = p.e_call(callee, vec![t], loc(5));
    let x = p.e_ident("x", loc(5));
    p.s_assign(p.root_block, x, call, loc(5));

    let err = bind(&mut p).expect_err("missing return on a path");
    assert_eq!(err.kind, ErrorKind::Reachability);
}

#[test]
fn unreachable_statement_is_reported() {
    let mut p = Program::new();
    let f = p.declare_function(p.root_block, "noisy", FuncKind::Plain, loc(1));
    let body = p.funcs.get(f).body;
    let one = p.e_int_typed(1, 32, false, loc(2));
    p.s_return(body, Some(one), loc(2));
    let two = p.e_int_typed(2, 32, false, loc(3));
    let x = p.e_ident("x", loc(3));
    p.s_assign(body, x, two, loc(3));

    let callee = p.e_ident("noisy", loc(5));
    let call = p.e_call(callee, vec![], loc(5));
    let y = p.e_ident("y", loc(5));
    p.s_assign(p.root_block, y, call, loc(5));

    let err = bind(&mut p).expect_err("statement after return");
    assert_eq!(err.kind, ErrorKind::Reachability);
    assert_eq!(err.loc, loc(3));
}

#[test]
fn yield_outside_iterator_is_rejected() {
    let mut p = Program::new();
    let f = p.declare_function(p.root_block, "notiter", FuncKind::Plain, loc(1));
    let body = p.funcs.get(f).body;
    let one = p.e_int_typed(1, 32, false, loc(2));
    p.s_yield(body, one, loc(2));

    let callee = p.e_ident("notiter", loc(4));
    let call = p.e_call(callee, vec![], loc(4));
    p.s_call(p.root_block, call, loc(4));

    let err = bind(&mut p).expect_err("yield in a plain function");
    assert_eq!(err.kind, ErrorKind::Reachability);
}

#[test]
fn default_and_named_arguments_canonicalize() {
    let mut p = Program::new();
    let f = p.declare_function(p.root_block, "scale", FuncKind::Plain, loc(1));
    p.add_param(f, "v", None, None, loc(1));
    let two = p.e_int_typed(2, 32, false, loc(1));
    p.add_param(f, "by", None, Some(two), loc(1));
    let body = p.funcs.get(f).body;
    let v = p.e_ident("v", loc(2));
    let by = p.e_ident("by", loc(2));
    let prod = p.e_bin(BinOp::Mul, v, by, loc(2));
    p.s_return(body, Some(prod), loc(2));

    // scale(10u32) uses the default for `by`.
    let ten = p.e_int_typed(10, 32, false, loc(4));
    let callee = p.e_ident("scale", loc(4));
    let call = p.e_call(callee, vec![ten], loc(4));
    let x = p.e_ident("x", loc(4));
    p.s_assign(p.root_block, x, call, loc(4));

    // scale(by=3u32, v=4u32) matches by name.
    let three = p.e_int_typed(3, 32, false, loc(5));
    let four = p.e_int_typed(4, 32, false, loc(5));
    let by_named = p.e_named("by", three, loc(5));
    let v_named = p.e_named("v", four, loc(5));
    let callee2 = p.e_ident("scale", loc(5));
    let call2 = p.e_call(callee2, vec![by_named, v_named], loc(5));
    let y = p.e_ident("y", loc(5));
    p.s_assign(p.root_block, y, call2, loc(5));

    bind(&mut p).expect("defaults and named arguments fill slots");
    assert_eq!(var_type(&p, "x"), TypeId::U32);
    assert_eq!(var_type(&p, "y"), TypeId::U32);
    // Both calls share the one (u32, u32) signature.
    assert_eq!(p.exprs.get(call).sig, p.exprs.get(call2).sig);
}

#[test]
fn missing_argument_without_default_is_rejected() {
    let mut p = Program::new();
    let f = p.declare_function(p.root_block, "needs", FuncKind::Plain, loc(1));
    p.add_param(f, "v", None, None, loc(1));
    let body = p.funcs.get(f).body;
    let v = p.e_ident("v", loc(2));
    p.s_return(body, Some(v), loc(2));

    let callee = p.e_ident("needs", loc(4));
    let call = p.e_call(callee, vec![], loc(4));
    let x = p.e_ident("x", loc(4));
    p.s_assign(p.root_block, x, call, loc(4));

    let err = bind(&mut p).expect_err("no default for v");
    assert_eq!(err.kind, ErrorKind::MissingDefault);
}

#[test]
fn funcaddr_marks_every_parameter_instantiated() {
    let mut p = Program::new();
    let f = p.declare_function(p.root_block, "add", FuncKind::Plain, loc(1));
    p.add_param(f, "a", None, None, loc(1));
    p.add_param(f, "b", None, None, loc(1));
    let body = p.funcs.get(f).body;
    let a = p.e_ident("a", loc(2));
    let b = p.e_ident("b", loc(2));
    let sum = p.e_bin(BinOp::Add, a, b, loc(2));
    p.s_return(body, Some(sum), loc(2));

    let callee = p.e_ident("add", loc(4));
    let t1 = p.e_type(TypeId::U32, loc(4));
    let t2 = p.e_type(TypeId::U32, loc(4));
    let call_form = p.e_call(callee, vec![t1, t2], loc(4));
    let addr = p.e_funcaddr(call_form, loc(4));
    let fp = p.e_ident("fp", loc(4));
    p.s_assign(p.root_block, fp, addr, loc(4));

    bind(&mut p).expect("function address binds");
    let fp_ty = var_type(&p, "fp");
    let TypeKey::Funcptr { ret, params } = p.types.key(fp_ty) else {
        panic!("expected a funcptr type, got {}", p.render_type(fp_ty));
    };
    assert_eq!(ret, TypeId::U32);
    assert_eq!(params, vec![TypeId::U32, TypeId::U32]);

    let sig = p.exprs.get(call_form).sig.expect("signature chosen");
    let s = p.sigs.get(sig);
    assert!(s.called_by_funcptr);
    assert!(s.params.iter().all(|param| param.instantiated));
}

#[test]
fn extern_functions_take_their_return_from_the_constraint() {
    let mut p = Program::new();
    let ret = p.e_type(TypeId::U64, loc(1));
    p.declare_extern(p.root_block, "now", Some(ret), loc(1));
    let callee = p.e_ident("now", loc(2));
    let call = p.e_call(callee, vec![], loc(2));
    let x = p.e_ident("x", loc(2));
    p.s_assign(p.root_block, x, call, loc(2));

    bind(&mut p).expect("extern call binds");
    assert_eq!(var_type(&p, "x"), TypeId::U64);
}

#[test]
fn array_length_is_a_builtin_method() {
    let mut p = Program::new();
    let e1 = p.e_int_typed(1, 32, false, loc(1));
    let e2 = p.e_int_typed(2, 32, false, loc(1));
    let arr = p.e_array(vec![e1, e2], loc(1));
    let a = p.e_ident("a", loc(1));
    p.s_assign(p.root_block, a, arr, loc(1));
    let a_read = p.e_ident("a", loc(2));
    let len_dot = p.e_dot(a_read, "length", loc(2));
    let len = p.e_call(len_dot, vec![], loc(2));
    let n = p.e_ident("n", loc(2));
    p.s_assign(p.root_block, n, len, loc(2));

    bind(&mut p).expect("length() binds");
    assert_eq!(var_type(&p, "n"), TypeId::U64);
}

#[test]
fn typeswitch_selects_exactly_one_case() {
    // v = 9u32; typeswitch typeof(v) { case u32: x = 1u8  case u64: x = 2u8 }
    let mut p = Program::new();
    let nine = p.e_int_typed(9, 32, false, loc(1));
    let v = p.e_ident("v", loc(1));
    p.s_assign(p.root_block, v, nine, loc(1));

    let v_read = p.e_ident("v", loc(2));
    let scrutinee = p.e_typeof(v_read, loc(2));
    let (_, sub) = p.s_typeswitch(p.root_block, scrutinee, loc(2));
    let pat32 = p.e_type(TypeId::U32, loc(3));
    let (case32, case32_body) = p.s_case(sub, pat32, loc(3));
    let one = p.e_int_typed(1, 8, false, loc(3));
    let x1 = p.e_ident("x", loc(3));
    p.s_assign(case32_body, x1, one, loc(3));
    let pat64 = p.e_type(TypeId::U64, loc(4));
    let (case64, case64_body) = p.s_case(sub, pat64, loc(4));
    let two = p.e_int_typed(2, 8, false, loc(4));
    let x2 = p.e_ident("x", loc(4));
    p.s_assign(case64_body, x2, two, loc(4));

    bind(&mut p).expect("typeswitch binds");
    assert!(p.stmts.get(case32).is_instantiated());
    assert!(!p.stmts.get(case64).is_instantiated());
    // Only the selected arm was bound.
    assert_eq!(p.exprs.get(one).ty, Some(TypeId::U8));
    assert_eq!(p.exprs.get(two).ty, None);
}

#[test]
fn switch_cases_unify_with_the_scrutinee() {
    let mut p = Program::new();
    let x = p.e_ident("x", loc(1));
    let v = p.e_int_typed(2, 32, false, loc(1));
    p.s_assign(p.root_block, x, v, loc(1));
    let x_read = p.e_ident("x", loc(2));
    let (switch_stmt, sub) = p.s_switch(p.root_block, x_read, loc(2));
    let one = p.e_int(1, loc(3));
    let (_, one_body) = p.s_case(sub, one, loc(3));
    let y1 = p.e_ident("y", loc(3));
    let v1 = p.e_int_typed(10, 32, false, loc(3));
    p.s_assign(one_body, y1, v1, loc(3));

    bind(&mut p).expect("switch binds");
    // The autocast case literal adopted the scrutinee width.
    assert_eq!(p.exprs.get(one).ty, Some(TypeId::U32));
    // A default arm was synthesized to throw.
    let sub = p.stmts.get(switch_stmt).block.unwrap();
    let has_default = p
        .blocks
        .get(sub)
        .stmts
        .iter()
        .any(|&s| matches!(p.stmts.get(s).kind, StmtKind::Default));
    assert!(has_default, "missing default is synthesized");
}

#[test]
fn ref_unref_need_a_ref_counted_class() {
    let mut p = Program::new();
    p.declare_tclass(p.root_block, "Node", 32, true, loc(1));
    let ctor = p.e_ident("Node", loc(2));
    let call = p.e_call(ctor, vec![], loc(2));
    let n = p.e_ident("n", loc(2));
    p.s_assign(p.root_block, n, call, loc(2));
    let n_read = p.e_ident("n", loc(3));
    p.s_ref(p.root_block, n_read, loc(3));
    bind(&mut p).expect("ref on a ref-counted class");

    let mut p = Program::new();
    p.declare_tclass(p.root_block, "Plain", 32, false, loc(1));
    let ctor = p.e_ident("Plain", loc(2));
    let call = p.e_call(ctor, vec![], loc(2));
    let v = p.e_ident("v", loc(2));
    p.s_assign(p.root_block, v, call, loc(2));
    let v_read = p.e_ident("v", loc(3));
    p.s_unref(p.root_block, v_read, loc(3));
    let err = bind(&mut p).expect_err("not ref-counted");
    assert_eq!(err.kind, ErrorKind::TypeMismatch);
}

#[test]
fn empty_program_synthesizes_the_root_return() {
    let mut p = Program::new();
    bind(&mut p).expect("empty program binds");
    let root = p.root_block;
    let last = *p.blocks.get(root).stmts.last().expect("synthesized return");
    assert!(matches!(p.stmts.get(last).kind, StmtKind::Return));
    assert!(p.stmts.get(last).expr.is_some(), "root returns 0");
}
