//! The program root.
//!
//! `Program` owns every interner, arena, table, and pool; all components
//! receive it explicitly. The construction methods are the surface the
//! parser (and the test suite, standing in for it) uses to build the tree
//! the binder consumes: no datatype fields are populated at construction
//! time except for literals' own types.

use num_bigint::BigInt;
use rustc_hash::FxHashMap;
use sable_common::{Atom, BlockId, ExprId, FuncId, Loc, StmtId, StringTable, TclassId, VarId};
use sable_types::{CastEnv, TypeId, TypeInterner};
use smallvec::{SmallVec, smallvec};

use crate::block::{Block, BlockArena, BlockOwner};
use crate::expr::{BinOp, CmpOp, Expr, ExprArena, ExprKind, IdentTarget, LogOp, UnOp};
use crate::func::{FuncArena, FuncKind, Function, OverloadOp};
use crate::sig::SigArena;
use crate::stmt::{RelationKind, Stmt, StmtArena, StmtKind};
use crate::tclass::{ClassArena, Tclass, TclassArena};
use crate::var::{VarArena, VarKind, Variable};

/// The root program graph handed from the parser to the binder.
pub struct Program {
    pub strings: StringTable,
    pub types: TypeInterner,
    pub exprs: ExprArena,
    pub stmts: StmtArena,
    pub blocks: BlockArena,
    pub vars: VarArena,
    pub funcs: FuncArena,
    pub tclasses: TclassArena,
    pub classes: ClassArena,
    pub sigs: SigArena,
    /// Operator overloads in declaration order, per operator.
    pub operators: FxHashMap<OverloadOp, Vec<FuncId>>,
    /// Relation statements, applied to classes as their constructors bind.
    pub relations: Vec<StmtId>,
    pub root_block: BlockId,
    pub root_func: FuncId,
    /// Disables overflow trapping and bounds checking in binding semantics.
    pub unsafe_mode: bool,
}

impl Program {
    #[must_use]
    pub fn new() -> Self {
        let mut strings = StringTable::new();
        let mut blocks = BlockArena::new();
        let mut funcs = FuncArena::new();

        let root_block = blocks.alloc(Block::new(None, BlockOwner::Root));
        let name = strings.intern("module");
        let root_func = funcs.alloc(Function::new(
            name,
            FuncKind::Module,
            root_block,
            Loc::synthetic(),
        ));
        blocks.get_mut(root_block).owner = BlockOwner::Func(root_func);

        Program {
            strings,
            types: TypeInterner::new(),
            exprs: ExprArena::new(),
            stmts: StmtArena::new(),
            blocks,
            vars: VarArena::new(),
            funcs,
            tclasses: TclassArena::new(),
            classes: ClassArena::new(),
            sigs: SigArena::new(),
            operators: FxHashMap::default(),
            relations: Vec::new(),
            root_block,
            root_func,
            unsafe_mode: false,
        }
    }

    pub fn atom(&mut self, text: &str) -> Atom {
        self.strings.intern(text)
    }

    /// Walk the static scope chain outward from `from` looking for `name`.
    #[must_use]
    pub fn lookup(&self, from: BlockId, name: Atom) -> Option<IdentTarget> {
        let mut cursor = Some(from);
        while let Some(id) = cursor {
            let block = self.blocks.get(id);
            if let Some(target) = block.lookup(name) {
                return Some(target);
            }
            cursor = block.parent;
        }
        None
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    pub fn expr(&mut self, kind: ExprKind, children: SmallVec<[ExprId; 2]>, loc: Loc) -> ExprId {
        self.exprs.alloc(Expr::new(kind, children, loc))
    }

    /// Integer literal with no explicit width (autocast-eligible).
    pub fn e_int(&mut self, value: impl Into<BigInt>, loc: Loc) -> ExprId {
        self.expr(
            ExprKind::IntLit {
                value: value.into(),
                width: None,
                signed: false,
            },
            smallvec![],
            loc,
        )
    }

    /// Integer literal with an explicit width suffix, e.g. `2u32` / `2i32`.
    pub fn e_int_typed(
        &mut self,
        value: impl Into<BigInt>,
        width: u32,
        signed: bool,
        loc: Loc,
    ) -> ExprId {
        self.expr(
            ExprKind::IntLit {
                value: value.into(),
                width: Some(width),
                signed,
            },
            smallvec![],
            loc,
        )
    }

    pub fn e_float(&mut self, value: f64, width: u32, loc: Loc) -> ExprId {
        self.expr(ExprKind::FloatLit { value, width }, smallvec![], loc)
    }

    pub fn e_bool(&mut self, value: bool, loc: Loc) -> ExprId {
        self.expr(ExprKind::BoolLit { value }, smallvec![], loc)
    }

    pub fn e_str(&mut self, value: &str, loc: Loc) -> ExprId {
        self.expr(
            ExprKind::StrLit {
                value: value.to_string(),
            },
            smallvec![],
            loc,
        )
    }

    pub fn e_rand(&mut self, width: u32, loc: Loc) -> ExprId {
        self.expr(ExprKind::RandUint { width }, smallvec![], loc)
    }

    pub fn e_ident(&mut self, name: &str, loc: Loc) -> ExprId {
        let name = self.atom(name);
        self.expr(ExprKind::Ident { name }, smallvec![], loc)
    }

    pub fn e_type(&mut self, ty: TypeId, loc: Loc) -> ExprId {
        self.expr(ExprKind::TypeLit { ty }, smallvec![], loc)
    }

    pub fn e_array(&mut self, elems: Vec<ExprId>, loc: Loc) -> ExprId {
        self.expr(ExprKind::ArrayLit, elems.into_iter().collect(), loc)
    }

    pub fn e_tuple(&mut self, elems: Vec<ExprId>, loc: Loc) -> ExprId {
        self.expr(ExprKind::TupleLit, elems.into_iter().collect(), loc)
    }

    pub fn e_dot(&mut self, base: ExprId, name: &str, loc: Loc) -> ExprId {
        let name = self.atom(name);
        self.expr(ExprKind::Dot { name }, smallvec![base], loc)
    }

    pub fn e_index(&mut self, base: ExprId, index: ExprId, loc: Loc) -> ExprId {
        self.expr(ExprKind::Index, smallvec![base, index], loc)
    }

    pub fn e_slice(&mut self, base: ExprId, lo: ExprId, hi: ExprId, loc: Loc) -> ExprId {
        self.expr(ExprKind::Slice, smallvec![base, lo, hi], loc)
    }

    pub fn e_call(&mut self, callee: ExprId, args: Vec<ExprId>, loc: Loc) -> ExprId {
        let mut children: SmallVec<[ExprId; 2]> = smallvec![callee];
        children.extend(args);
        self.expr(ExprKind::Call, children, loc)
    }

    pub fn e_bin(&mut self, op: BinOp, left: ExprId, right: ExprId, loc: Loc) -> ExprId {
        self.expr(ExprKind::Binary { op, trunc: false }, smallvec![left, right], loc)
    }

    pub fn e_bin_trunc(&mut self, op: BinOp, left: ExprId, right: ExprId, loc: Loc) -> ExprId {
        self.expr(ExprKind::Binary { op, trunc: true }, smallvec![left, right], loc)
    }

    pub fn e_un(&mut self, op: UnOp, operand: ExprId, loc: Loc) -> ExprId {
        self.expr(ExprKind::Unary { op, trunc: false }, smallvec![operand], loc)
    }

    pub fn e_log(&mut self, op: LogOp, left: ExprId, right: ExprId, loc: Loc) -> ExprId {
        self.expr(ExprKind::Logical { op }, smallvec![left, right], loc)
    }

    pub fn e_cmp(&mut self, op: CmpOp, left: ExprId, right: ExprId, loc: Loc) -> ExprId {
        self.expr(ExprKind::Compare { op }, smallvec![left, right], loc)
    }

    pub fn e_cast(&mut self, ty_expr: ExprId, value: ExprId, trunc: bool, loc: Loc) -> ExprId {
        self.expr(ExprKind::Cast { trunc }, smallvec![ty_expr, value], loc)
    }

    pub fn e_select(&mut self, cond: ExprId, a: ExprId, b: ExprId, loc: Loc) -> ExprId {
        self.expr(ExprKind::Select, smallvec![cond, a, b], loc)
    }

    pub fn e_secret(&mut self, operand: ExprId, loc: Loc) -> ExprId {
        self.expr(ExprKind::Secret, smallvec![operand], loc)
    }

    pub fn e_reveal(&mut self, operand: ExprId, loc: Loc) -> ExprId {
        self.expr(ExprKind::Reveal, smallvec![operand], loc)
    }

    pub fn e_signed(&mut self, operand: ExprId, loc: Loc) -> ExprId {
        self.expr(ExprKind::Signed, smallvec![operand], loc)
    }

    pub fn e_unsigned(&mut self, operand: ExprId, loc: Loc) -> ExprId {
        self.expr(ExprKind::Unsigned, smallvec![operand], loc)
    }

    pub fn e_typeof(&mut self, operand: ExprId, loc: Loc) -> ExprId {
        self.expr(ExprKind::Typeof, smallvec![operand], loc)
    }

    pub fn e_arrayof(&mut self, operand: ExprId, loc: Loc) -> ExprId {
        self.expr(ExprKind::Arrayof, smallvec![operand], loc)
    }

    pub fn e_widthof(&mut self, operand: ExprId, loc: Loc) -> ExprId {
        self.expr(ExprKind::Widthof, smallvec![operand], loc)
    }

    pub fn e_isnull(&mut self, operand: ExprId, loc: Loc) -> ExprId {
        self.expr(ExprKind::Isnull, smallvec![operand], loc)
    }

    pub fn e_funcaddr(&mut self, call_form: ExprId, loc: Loc) -> ExprId {
        self.expr(ExprKind::Funcaddr, smallvec![call_form], loc)
    }

    pub fn e_null(&mut self, ty_expr: ExprId, loc: Loc) -> ExprId {
        self.expr(ExprKind::NullOf, smallvec![ty_expr], loc)
    }

    pub fn e_modular(&mut self, value: ExprId, modulus: ExprId, loc: Loc) -> ExprId {
        self.expr(ExprKind::Modular, smallvec![value, modulus], loc)
    }

    pub fn e_assign(&mut self, target: ExprId, value: ExprId, loc: Loc) -> ExprId {
        self.expr(ExprKind::Assign { op: None }, smallvec![target, value], loc)
    }

    /// Assignment with a declared type constraint: `target: T = value`.
    pub fn e_assign_typed(
        &mut self,
        target: ExprId,
        value: ExprId,
        constraint: ExprId,
        loc: Loc,
    ) -> ExprId {
        self.expr(
            ExprKind::Assign { op: None },
            smallvec![target, value, constraint],
            loc,
        )
    }

    pub fn e_assign_op(&mut self, op: BinOp, target: ExprId, value: ExprId, loc: Loc) -> ExprId {
        self.expr(
            ExprKind::Assign { op: Some(op) },
            smallvec![target, value],
            loc,
        )
    }

    pub fn e_named(&mut self, name: &str, value: ExprId, loc: Loc) -> ExprId {
        let name = self.atom(name);
        self.expr(ExprKind::NamedParam { name }, smallvec![value], loc)
    }

    pub fn e_range(&mut self, lo: ExprId, hi: ExprId, loc: Loc) -> ExprId {
        self.expr(ExprKind::Range, smallvec![lo, hi], loc)
    }

    pub fn e_in(&mut self, item: ExprId, container: ExprId, loc: Loc) -> ExprId {
        self.expr(ExprKind::In, smallvec![item, container], loc)
    }

    // =========================================================================
    // Statements
    // =========================================================================

    /// Allocate a statement and append it to a block.
    pub fn stmt_in(
        &mut self,
        block: BlockId,
        kind: StmtKind,
        expr: Option<ExprId>,
        loc: Loc,
    ) -> StmtId {
        let id = self.stmts.alloc(Stmt::new(kind, expr, None, loc));
        self.blocks.get_mut(block).stmts.push(id);
        id
    }

    /// Allocate a statement owned by another statement (for-loop init and
    /// update clauses).
    pub fn stmt_detached(&mut self, kind: StmtKind, expr: Option<ExprId>, loc: Loc) -> StmtId {
        self.stmts.alloc(Stmt::new(kind, expr, None, loc))
    }

    /// Attach a fresh sub-block to a compound statement.
    pub fn sub_block(&mut self, parent: BlockId, stmt: StmtId) -> BlockId {
        let block = self
            .blocks
            .alloc(Block::new(Some(parent), BlockOwner::Stmt(stmt)));
        self.stmts.get_mut(stmt).block = Some(block);
        block
    }

    pub fn s_assign(&mut self, block: BlockId, target: ExprId, value: ExprId, loc: Loc) -> StmtId {
        let assign = self.e_assign(target, value, loc);
        self.stmt_in(block, StmtKind::Assign, Some(assign), loc)
    }

    pub fn s_assign_typed(
        &mut self,
        block: BlockId,
        target: ExprId,
        value: ExprId,
        constraint: ExprId,
        loc: Loc,
    ) -> StmtId {
        let assign = self.e_assign_typed(target, value, constraint, loc);
        self.stmt_in(block, StmtKind::Assign, Some(assign), loc)
    }

    pub fn s_call(&mut self, block: BlockId, call: ExprId, loc: Loc) -> StmtId {
        self.stmt_in(block, StmtKind::Call, Some(call), loc)
    }

    pub fn s_if(&mut self, block: BlockId, cond: ExprId, loc: Loc) -> (StmtId, BlockId) {
        let stmt = self.stmt_in(block, StmtKind::If, Some(cond), loc);
        let body = self.sub_block(block, stmt);
        (stmt, body)
    }

    pub fn s_elseif(&mut self, block: BlockId, cond: ExprId, loc: Loc) -> (StmtId, BlockId) {
        let stmt = self.stmt_in(block, StmtKind::ElseIf, Some(cond), loc);
        let body = self.sub_block(block, stmt);
        (stmt, body)
    }

    pub fn s_else(&mut self, block: BlockId, loc: Loc) -> (StmtId, BlockId) {
        let stmt = self.stmt_in(block, StmtKind::Else, None, loc);
        let body = self.sub_block(block, stmt);
        (stmt, body)
    }

    pub fn s_while(&mut self, block: BlockId, cond: ExprId, loc: Loc) -> (StmtId, BlockId) {
        let stmt = self.stmt_in(block, StmtKind::While, Some(cond), loc);
        let body = self.sub_block(block, stmt);
        (stmt, body)
    }

    pub fn s_dowhile(&mut self, block: BlockId, cond: ExprId, loc: Loc) -> (StmtId, BlockId) {
        let stmt = self.stmt_in(block, StmtKind::DoWhile, Some(cond), loc);
        let body = self.sub_block(block, stmt);
        (stmt, body)
    }

    pub fn s_for(
        &mut self,
        block: BlockId,
        init: StmtId,
        cond: ExprId,
        update: StmtId,
        loc: Loc,
    ) -> (StmtId, BlockId) {
        let stmt = self.stmt_in(block, StmtKind::For { init, update }, Some(cond), loc);
        let body = self.sub_block(block, stmt);
        (stmt, body)
    }

    pub fn s_foreach(
        &mut self,
        block: BlockId,
        loop_var: &str,
        iter: ExprId,
        loc: Loc,
    ) -> (StmtId, BlockId) {
        let loop_var = self.atom(loop_var);
        let stmt = self.stmt_in(block, StmtKind::Foreach { loop_var }, Some(iter), loc);
        let body = self.sub_block(block, stmt);
        (stmt, body)
    }

    pub fn s_return(&mut self, block: BlockId, expr: Option<ExprId>, loc: Loc) -> StmtId {
        self.stmt_in(block, StmtKind::Return, expr, loc)
    }

    pub fn s_yield(&mut self, block: BlockId, expr: ExprId, loc: Loc) -> StmtId {
        self.stmt_in(block, StmtKind::Yield, Some(expr), loc)
    }

    pub fn s_throw(&mut self, block: BlockId, expr: ExprId, loc: Loc) -> StmtId {
        self.stmt_in(block, StmtKind::Throw, Some(expr), loc)
    }

    pub fn s_print(&mut self, block: BlockId, args: Vec<ExprId>, loc: Loc) -> StmtId {
        self.stmt_in(
            block,
            StmtKind::Print {
                args,
                rewritten: None,
            },
            None,
            loc,
        )
    }

    pub fn s_ref(&mut self, block: BlockId, expr: ExprId, loc: Loc) -> StmtId {
        self.stmt_in(block, StmtKind::Ref, Some(expr), loc)
    }

    pub fn s_unref(&mut self, block: BlockId, expr: ExprId, loc: Loc) -> StmtId {
        self.stmt_in(block, StmtKind::Unref, Some(expr), loc)
    }

    pub fn s_relation(
        &mut self,
        kind: RelationKind,
        parent: ExprId,
        child: ExprId,
        cascade: bool,
        loc: Loc,
    ) -> StmtId {
        let stmt = self.stmt_in(
            self.root_block,
            StmtKind::Relation {
                kind,
                parent,
                child,
                cascade,
            },
            None,
            loc,
        );
        self.relations.push(stmt);
        stmt
    }

    pub fn s_import(&mut self, block: BlockId, path: &str, loc: Loc) -> StmtId {
        let path = self.atom(path);
        self.stmt_in(block, StmtKind::Import { path }, None, loc)
    }

    pub fn s_switch(&mut self, block: BlockId, scrutinee: ExprId, loc: Loc) -> (StmtId, BlockId) {
        let stmt = self.stmt_in(block, StmtKind::Switch, Some(scrutinee), loc);
        let body = self.sub_block(block, stmt);
        (stmt, body)
    }

    pub fn s_typeswitch(
        &mut self,
        block: BlockId,
        ty_expr: ExprId,
        loc: Loc,
    ) -> (StmtId, BlockId) {
        let stmt = self.stmt_in(block, StmtKind::Typeswitch, Some(ty_expr), loc);
        let body = self.sub_block(block, stmt);
        (stmt, body)
    }

    pub fn s_case(&mut self, switch_block: BlockId, expr: ExprId, loc: Loc) -> (StmtId, BlockId) {
        let stmt = self.stmt_in(switch_block, StmtKind::Case, Some(expr), loc);
        let body = self.sub_block(switch_block, stmt);
        (stmt, body)
    }

    pub fn s_default(&mut self, switch_block: BlockId, loc: Loc) -> (StmtId, BlockId) {
        let stmt = self.stmt_in(switch_block, StmtKind::Default, None, loc);
        let body = self.sub_block(switch_block, stmt);
        (stmt, body)
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    /// Declare a function in a scope; its body block becomes a child of
    /// that scope.
    pub fn declare_function(
        &mut self,
        scope: BlockId,
        name: &str,
        kind: FuncKind,
        loc: Loc,
    ) -> FuncId {
        let name = self.atom(name);
        // Owner is patched once the function id exists.
        let body = self.blocks.alloc(Block::new(Some(scope), BlockOwner::Root));
        let func = self.funcs.alloc(Function::new(name, kind, body, loc));
        self.blocks.get_mut(body).owner = BlockOwner::Func(func);
        self.blocks.get_mut(scope).define(name, IdentTarget::Func(func));
        func
    }

    /// Declare an `extern C` function: no body to bind, return type taken
    /// from the declared constraint.
    pub fn declare_extern(
        &mut self,
        scope: BlockId,
        name: &str,
        ret_constraint: Option<ExprId>,
        loc: Loc,
    ) -> FuncId {
        let func = self.declare_function(scope, name, FuncKind::Plain, loc);
        let f = self.funcs.get_mut(func);
        f.extern_c = true;
        f.ret_constraint = ret_constraint;
        f.linkage_name = Some(f.name);
        func
    }

    /// Add a parameter to a function, defining it in the body scope.
    pub fn add_param(
        &mut self,
        func: FuncId,
        name: &str,
        constraint: Option<ExprId>,
        default: Option<ExprId>,
        loc: Loc,
    ) -> VarId {
        let name = self.atom(name);
        let body = self.funcs.get(func).body;
        let mut var = Variable::new(name, VarKind::Parameter, loc);
        var.constraint = constraint;
        var.default = default;
        let id = self.vars.alloc(var);
        self.blocks.get_mut(body).define(name, IdentTarget::Var(id));
        self.funcs.get_mut(func).params.push(id);
        id
    }

    pub fn set_ret_constraint(&mut self, func: FuncId, constraint: ExprId) {
        self.funcs.get_mut(func).ret_constraint = Some(constraint);
    }

    /// Mark a function `exported`: its linkage name is preserved.
    pub fn set_exported(&mut self, func: FuncId) {
        let f = self.funcs.get_mut(func);
        f.exported = true;
        f.linkage_name = Some(f.name);
    }

    /// Declare a generic class template: its constructor function plus the
    /// implicit `self` variable the constructor body writes through.
    pub fn declare_tclass(
        &mut self,
        scope: BlockId,
        name: &str,
        ref_width: u32,
        ref_counted: bool,
        loc: Loc,
    ) -> TclassId {
        let ctor = self.declare_function(scope, name, FuncKind::Constructor, loc);
        let name = self.funcs.get(ctor).name;
        let tclass = self.tclasses.alloc(Tclass::new(name, ctor, ref_width, ref_counted));

        let self_name = self.atom("self");
        let self_var = self
            .vars
            .alloc(Variable::new(self_name, VarKind::Parameter, loc));
        let body = self.funcs.get(ctor).body;
        self.blocks
            .get_mut(body)
            .define(self_name, IdentTarget::Var(self_var));

        let f = self.funcs.get_mut(ctor);
        f.tclass = Some(tclass);
        f.self_var = Some(self_var);
        tclass
    }

    /// Declare a method (or iterator) inside a tclass body. The implicit
    /// `self` receiver becomes the first parameter.
    pub fn declare_method(
        &mut self,
        tclass: TclassId,
        name: &str,
        kind: FuncKind,
        loc: Loc,
    ) -> FuncId {
        let ctor_body = self.funcs.get(self.tclasses.get(tclass).constructor).body;
        let func = self.declare_function(ctor_body, name, kind, loc);
        self.funcs.get_mut(func).is_method = true;
        self.funcs.get_mut(func).tclass = Some(tclass);
        self.add_param(func, "self", None, None, loc);
        if self.funcs.get(func).name == self.strings.intern("values") {
            self.tclasses.get_mut(tclass).values_iter = Some(func);
        }
        func
    }

    /// Declare an operator overload and register it in declaration order.
    pub fn declare_operator(
        &mut self,
        scope: BlockId,
        name: &str,
        op: OverloadOp,
        loc: Loc,
    ) -> FuncId {
        let func = self.declare_function(scope, name, FuncKind::Operator, loc);
        self.funcs.get_mut(func).op = Some(op);
        self.operators.entry(op).or_default().push(func);
        func
    }

    /// Declare an enum: each entry becomes a const variable of the enum's
    /// value type, defined in the enum body block.
    pub fn declare_enum(&mut self, scope: BlockId, name: &str, entries: &[&str], loc: Loc) -> FuncId {
        let func = self.declare_function(scope, name, FuncKind::Enum, loc);
        self.funcs.get_mut(func).enum_width = enum_repr_width(entries.len());
        let value_ty = self.types.enum_value(func);
        let body = self.funcs.get(func).body;
        for (ordinal, entry) in entries.iter().enumerate() {
            let entry = self.atom(entry);
            let init = self.e_int(ordinal as i64, loc);
            let mut var = Variable::new(entry, VarKind::Local, loc);
            var.is_const = true;
            var.default = Some(init);
            var.ty = Some(value_ty);
            var.instantiated = true;
            let id = self.vars.alloc(var);
            self.blocks.get_mut(body).define(entry, IdentTarget::Var(id));
        }
        func
    }

    /// Pre-declare a variable in a block (used for `const` declarations;
    /// ordinary locals are created by the binder at first assignment).
    pub fn declare_var(&mut self, block: BlockId, name: &str, is_const: bool, loc: Loc) -> VarId {
        let name = self.atom(name);
        let mut var = Variable::new(name, VarKind::Local, loc);
        var.is_const = is_const;
        let id = self.vars.alloc(var);
        self.blocks.get_mut(block).define(name, IdentTarget::Var(id));
        id
    }

    /// Declare a struct: the fields are the parameters of the struct
    /// function, and calling it builds a struct value.
    pub fn declare_struct(
        &mut self,
        scope: BlockId,
        name: &str,
        fields: &[(&str, Option<ExprId>)],
        loc: Loc,
    ) -> FuncId {
        let func = self.declare_function(scope, name, FuncKind::Struct, loc);
        for &(field, constraint) in fields {
            self.add_param(func, field, constraint, None, loc);
        }
        func
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

impl CastEnv for Program {
    fn class_ref_width(&self, tclass: TclassId) -> u32 {
        self.tclasses.get(tclass).ref_width
    }

    fn enum_width(&self, func: FuncId) -> u32 {
        self.funcs.get(func).enum_width
    }
}

/// Smallest power-of-two byte width that holds `n` enum entries.
fn enum_repr_width(n: usize) -> u32 {
    if n <= 1 << 8 {
        8
    } else if n <= 1 << 16 {
        16
    } else {
        32
    }
}
