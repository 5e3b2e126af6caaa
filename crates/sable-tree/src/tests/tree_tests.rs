use super::*;
use pretty_assertions::assert_eq;
use sable_common::Loc;
use sable_types::TypeId;

#[test]
fn scope_chain_lookup_walks_outward() {
    let mut p = Program::new();
    let loc = Loc::new(1);
    let func = p.declare_function(p.root_block, "helper", FuncKind::Plain, loc);
    let x = p.add_param(func, "x", None, None, loc);

    let body = p.funcs.get(func).body;
    let name_x = p.atom("x");
    let name_helper = p.atom("helper");
    let name_missing = p.atom("missing");

    assert_eq!(p.lookup(body, name_x), Some(IdentTarget::Var(x)));
    // Walks out to the root scope.
    assert_eq!(p.lookup(body, name_helper), Some(IdentTarget::Func(func)));
    assert_eq!(p.lookup(body, name_missing), None);
    // The root scope does not see function locals.
    assert_eq!(p.lookup(p.root_block, name_x), None);
}

#[test]
fn tclass_declares_constructor_and_self() {
    let mut p = Program::new();
    let loc = Loc::new(2);
    let point = p.declare_tclass(p.root_block, "Point", 32, false, loc);

    let ctor = p.tclasses.get(point).constructor;
    assert_eq!(p.funcs.get(ctor).kind, FuncKind::Constructor);
    assert_eq!(p.funcs.get(ctor).tclass, Some(point));
    let self_var = p.funcs.get(ctor).self_var.expect("constructor has self");
    assert_eq!(p.strings.resolve(p.vars.get(self_var).name), "self");

    // A method picks up the implicit self receiver as params[0].
    let method = p.declare_method(point, "norm", FuncKind::Plain, loc);
    let params = &p.funcs.get(method).params;
    assert_eq!(params.len(), 1);
    assert_eq!(p.strings.resolve(p.vars.get(params[0]).name), "self");
    assert!(p.funcs.get(method).is_method);

    // Declaring `values` registers the default iterator slot.
    let values = p.declare_method(point, "values", FuncKind::Iterator, loc);
    assert_eq!(p.tclasses.get(point).values_iter, Some(values));
}

#[test]
fn enum_entries_are_const_and_typed() {
    let mut p = Program::new();
    let loc = Loc::new(3);
    let color = p.declare_enum(p.root_block, "Color", &["red", "green", "blue"], loc);

    assert_eq!(p.funcs.get(color).enum_width, 8);
    let body = p.funcs.get(color).body;
    let red = p.atom("red");
    let Some(IdentTarget::Var(red_var)) = p.lookup(body, red) else {
        panic!("red not defined in enum body");
    };
    let var = p.vars.get(red_var);
    assert!(var.is_const);
    assert_eq!(var.ty, Some(p.types.enum_value(color)));
}

#[test]
fn compound_statement_builders_nest_blocks() {
    let mut p = Program::new();
    let loc = Loc::new(4);
    let cond = p.e_bool(true, loc);
    let (stmt, body) = p.s_if(p.root_block, cond, loc);

    assert_eq!(p.stmts.get(stmt).block, Some(body));
    assert_eq!(p.blocks.get(body).parent, Some(p.root_block));
    assert_eq!(p.blocks.get(body).owner, BlockOwner::Stmt(stmt));
    assert_eq!(p.blocks.get(p.root_block).stmts, vec![stmt]);
}

#[test]
fn render_type_reads_like_source() {
    let mut p = Program::new();
    let secret_u64 = p.types.with_secret(TypeId::U64, true);
    let arr = p.types.array(TypeId::U8);
    let tup = p.types.tuple(vec![TypeId::U32, TypeId::BOOL]);
    let point = p.declare_tclass(p.root_block, "Point", 32, false, Loc::new(1));

    assert_eq!(p.render_type(TypeId::U32), "u32");
    assert_eq!(p.render_type(secret_u64), "secret u64");
    assert_eq!(p.render_type(arr), "[u8]");
    assert_eq!(p.render_type(tup), "(u32, bool)");
    assert_eq!(p.render_type(p.types.null_class(point)), "null(Point)");
    assert_eq!(p.render_type(p.types.tclass(point)), "Point");
}
