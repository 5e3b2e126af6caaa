//! Iterator inlining: the bound form of `for v in iter() { body }` must
//! produce the same sequence of loop-variable values as the iterator would
//! yield. A tiny tree-walking evaluator over the bound program observes
//! the sequence through print statements.

use pretty_assertions::assert_eq;
use sable_binder::bind;
use sable_common::{BlockId, ExprId, Loc, StmtId, VarId};
use sable_tree::{
    BinOp, CmpOp, ExprKind, FuncKind, IdentTarget, Program, StmtKind,
};
use std::collections::HashMap;

fn loc(line: u32) -> Loc {
    Loc::new(line)
}

/// Minimal evaluator for the bound, inlined tree: integers, assignment,
/// while loops, if chains, and print-as-trace.
struct Eval<'a> {
    p: &'a Program,
    env: HashMap<VarId, i64>,
    trace: Vec<i64>,
}

impl<'a> Eval<'a> {
    fn new(p: &'a Program) -> Self {
        Eval {
            p,
            env: HashMap::new(),
            trace: Vec::new(),
        }
    }

    fn expr(&mut self, e: ExprId) -> i64 {
        let node = self.p.exprs.get(e);
        match &node.kind {
            ExprKind::IntLit { value, .. } => {
                i64::try_from(value.clone()).expect("test values fit i64")
            }
            ExprKind::BoolLit { value } => i64::from(*value),
            ExprKind::Ident { .. } => {
                let Some(IdentTarget::Var(v)) = node.target else {
                    panic!("unbound identifier in bound tree");
                };
                *self.env.get(&v).expect("variable assigned before use")
            }
            ExprKind::Binary { op, .. } => {
                let a = self.expr(node.children[0]);
                let b = self.expr(node.children[1]);
                match op {
                    BinOp::Add => a + b,
                    BinOp::Sub => a - b,
                    BinOp::Mul => a * b,
                    BinOp::Div => a / b,
                    BinOp::Mod => a % b,
                    _ => panic!("operator not supported by the test evaluator"),
                }
            }
            ExprKind::Compare { op } => {
                let a = self.expr(node.children[0]);
                let b = self.expr(node.children[1]);
                let r = match op {
                    CmpOp::Eq => a == b,
                    CmpOp::Ne => a != b,
                    CmpOp::Lt => a < b,
                    CmpOp::Le => a <= b,
                    CmpOp::Gt => a > b,
                    CmpOp::Ge => a >= b,
                };
                i64::from(r)
            }
            other => panic!("expression kind {other:?} not supported by the test evaluator"),
        }
    }

    fn assign(&mut self, assign: ExprId) {
        let node = self.p.exprs.get(assign);
        let target = self.p.exprs.get(node.children[0]);
        let Some(IdentTarget::Var(v)) = target.target else {
            panic!("assignment target is not a variable");
        };
        let value = self.expr(node.children[1]);
        self.env.insert(v, value);
    }

    fn block(&mut self, block: BlockId) {
        let stmts: Vec<StmtId> = self.p.blocks.get(block).stmts.clone();
        let mut index = 0;
        while index < stmts.len() {
            let stmt = stmts[index];
            let s = self.p.stmts.get(stmt);
            match &s.kind {
                StmtKind::Assign => self.assign(s.expr.unwrap()),
                StmtKind::Block => {
                    if let Some(sub) = s.block {
                        self.block(sub);
                    }
                }
                StmtKind::While => {
                    let cond = s.expr.unwrap();
                    let body = s.block.unwrap();
                    while self.expr(cond) != 0 {
                        self.block(body);
                    }
                }
                StmtKind::If => {
                    // Evaluate the chain, executing the first hit.
                    let mut taken = self.expr(s.expr.unwrap()) != 0;
                    if taken {
                        self.block(s.block.unwrap());
                    }
                    while index + 1 < stmts.len() {
                        let sibling = self.p.stmts.get(stmts[index + 1]);
                        match &sibling.kind {
                            StmtKind::ElseIf => {
                                if !taken && self.expr(sibling.expr.unwrap()) != 0 {
                                    taken = true;
                                    self.block(sibling.block.unwrap());
                                }
                                index += 1;
                            }
                            StmtKind::Else => {
                                if !taken {
                                    self.block(sibling.block.unwrap());
                                }
                                index += 1;
                                break;
                            }
                            _ => break,
                        }
                    }
                }
                StmtKind::Print { args, .. } => {
                    let value = self.expr(args[1]);
                    self.trace.push(value);
                }
                StmtKind::Return => return,
                _ => {}
            }
            index += 1;
        }
    }
}

/// iterator range(lo, hi) { i = lo; while i < hi { yield i; i = i + 1 } }
fn declare_range(p: &mut Program) {
    let range = p.declare_function(p.root_block, "range", FuncKind::Iterator, loc(1));
    p.add_param(range, "lo", None, None, loc(1));
    p.add_param(range, "hi", None, None, loc(1));
    let body = p.funcs.get(range).body;

    let i = p.e_ident("i", loc(2));
    let lo = p.e_ident("lo", loc(2));
    p.s_assign(body, i, lo, loc(2));

    let i_read = p.e_ident("i", loc(3));
    let hi = p.e_ident("hi", loc(3));
    let cond = p.e_cmp(CmpOp::Lt, i_read, hi, loc(3));
    let (_, wbody) = p.s_while(body, cond, loc(3));

    let i_yield = p.e_ident("i", loc(4));
    p.s_yield(wbody, i_yield, loc(4));

    let i_next = p.e_ident("i", loc(5));
    let one = p.e_int(1, loc(5));
    let bump = p.e_bin(BinOp::Add, i_next, one, loc(5));
    let i_target = p.e_ident("i", loc(5));
    p.s_assign(wbody, i_target, bump, loc(5));
}

#[test]
fn range_loop_inlines_and_yields_in_order() {
    // for v in range(0, 3) { print v }
    let mut p = Program::new();
    declare_range(&mut p);
    let zero = p.e_int(0, loc(7));
    let three = p.e_int(3, loc(7));
    let callee = p.e_ident("range", loc(7));
    let call = p.e_call(callee, vec![zero, three], loc(7));
    let (foreach, fbody) = p.s_foreach(p.root_block, "v", call, loc(7));
    let fmt = p.e_str("%u\n", loc(8));
    let v = p.e_ident("v", loc(8));
    p.s_print(fbody, vec![fmt, v], loc(8));

    bind(&mut p).expect("iterator loop binds and inlines");

    // The foreach statement was replaced by straight-line statements.
    assert!(matches!(p.stmts.get(foreach).kind, StmtKind::Block));

    // Executing the bound form observes the iterator's sequence.
    let mut eval = Eval::new(&p);
    eval.block(p.root_block);
    assert_eq!(eval.trace, vec![0, 1, 2]);
}

#[test]
fn inlined_loop_body_runs_per_yield() {
    // total = 0; for v in range(1, 5) { total = total + v }; print total
    let mut p = Program::new();
    declare_range(&mut p);
    let zero = p.e_int(0, loc(7));
    let total = p.e_ident("total", loc(7));
    p.s_assign(p.root_block, total, zero, loc(7));

    let one = p.e_int(1, loc(8));
    let five = p.e_int(5, loc(8));
    let callee = p.e_ident("range", loc(8));
    let call = p.e_call(callee, vec![one, five], loc(8));
    let (_, fbody) = p.s_foreach(p.root_block, "v", call, loc(8));
    let total_read = p.e_ident("total", loc(9));
    let v = p.e_ident("v", loc(9));
    let sum = p.e_bin(BinOp::Add, total_read, v, loc(9));
    let total_target = p.e_ident("total", loc(9));
    p.s_assign(fbody, total_target, sum, loc(9));

    let fmt = p.e_str("%u\n", loc(10));
    let total_print = p.e_ident("total", loc(10));
    p.s_print(p.root_block, vec![fmt, total_print], loc(10));

    bind(&mut p).expect("accumulating loop binds");
    let mut eval = Eval::new(&p);
    eval.block(p.root_block);
    assert_eq!(eval.trace, vec![10]);
}

#[test]
fn two_call_sites_inline_independently() {
    let mut p = Program::new();
    declare_range(&mut p);
    for line in [7, 9] {
        let zero = p.e_int(0, loc(line));
        let two = p.e_int(2, loc(line));
        let callee = p.e_ident("range", loc(line));
        let call = p.e_call(callee, vec![zero, two], loc(line));
        let (_, fbody) = p.s_foreach(p.root_block, "v", call, loc(line));
        let fmt = p.e_str("%u\n", loc(line + 1));
        let v = p.e_ident("v", loc(line + 1));
        p.s_print(fbody, vec![fmt, v], loc(line + 1));
    }

    bind(&mut p).expect("both loops inline");
    let mut eval = Eval::new(&p);
    eval.block(p.root_block);
    assert_eq!(eval.trace, vec![0, 1, 0, 1]);
}

#[test]
fn type_dispatched_iterator_collapses_to_selected_branch() {
    // iterator pick(v) { typeswitch typeof(v) { case u32: yield v
    //                                           case u64: yield v } }
    let mut p = Program::new();
    let pick = p.declare_function(p.root_block, "pick", FuncKind::Iterator, loc(1));
    p.add_param(pick, "v", None, None, loc(1));
    let body = p.funcs.get(pick).body;
    let v = p.e_ident("v", loc(2));
    let scrutinee = p.e_typeof(v, loc(2));
    let (_, sub) = p.s_typeswitch(body, scrutinee, loc(2));
    let pat32 = p.e_type(sable_types::TypeId::U32, loc(3));
    let (_, arm32) = p.s_case(sub, pat32, loc(3));
    let v32 = p.e_ident("v", loc(3));
    p.s_yield(arm32, v32, loc(3));
    let pat64 = p.e_type(sable_types::TypeId::U64, loc(4));
    let (_, arm64) = p.s_case(sub, pat64, loc(4));
    let v64 = p.e_ident("v", loc(4));
    p.s_yield(arm64, v64, loc(4));

    let five = p.e_int_typed(5, 32, false, loc(6));
    let callee = p.e_ident("pick", loc(6));
    let call = p.e_call(callee, vec![five], loc(6));
    let (_, fbody) = p.s_foreach(p.root_block, "x", call, loc(6));
    let fmt = p.e_str("%u\n", loc(7));
    let x = p.e_ident("x", loc(7));
    p.s_print(fbody, vec![fmt, x], loc(7));

    bind(&mut p).expect("type-dispatched iterator inlines");
    let mut eval = Eval::new(&p);
    eval.block(p.root_block);
    assert_eq!(eval.trace, vec![5]);
}

#[test]
fn foreach_over_a_class_value_uses_values() {
    // A class with no user values() gets a synthesized default one.
    let mut p = Program::new();
    let boxt = p.declare_tclass(p.root_block, "Box", 32, false, loc(1));
    let ctor = p.e_ident("Box", loc(2));
    let call = p.e_call(ctor, vec![], loc(2));
    let b = p.e_ident("b", loc(2));
    p.s_assign(p.root_block, b, call, loc(2));
    let b_read = p.e_ident("b", loc(3));
    let (foreach, _) = p.s_foreach(p.root_block, "item", b_read, loc(3));

    bind(&mut p).expect("foreach over a class binds");
    assert!(
        p.tclasses.get(boxt).values_iter.is_some(),
        "a default values() was synthesized"
    );
    assert!(matches!(p.stmts.get(foreach).kind, StmtKind::Block));
}
