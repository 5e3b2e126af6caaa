//! Expression binding: assign a datatype to every expression node.
//!
//! Sub-expression binding is pre-order over the expression tree: children
//! bind before their parent. Re-binding an expression recomputes its
//! annotations from scratch, so a statement task can safely run once per
//! wake-up.

use num_bigint::BigInt;
use num_traits::Signed as _;
use sable_common::{BlockId, ErrorKind, ExprId, SigId, StmtId};
use sable_tree::{
    BinOp, CmpOp, ExprFlags, ExprKind, FuncKind, IdentTarget, StmtFlags, UnOp, VarKind, Variable,
};
use sable_types::{TypeId, TypeKey, check_cast, unify};

use crate::resolve::MemberScope;
use crate::state::{BindFailure, BindResult, Binder, Event};

impl Binder<'_> {
    /// Bind one expression and return its datatype.
    pub(crate) fn bind_expr(
        &mut self,
        sig: SigId,
        block: BlockId,
        expr: ExprId,
    ) -> BindResult<TypeId> {
        // Re-binding recomputes annotations from scratch.
        {
            let e = self.prog.exprs.get_mut(expr);
            e.flags = ExprFlags::NONE;
            e.ty = None;
        }
        let (kind, children, loc) = {
            let e = self.prog.exprs.get(expr);
            (e.kind.clone(), e.children.clone(), e.loc)
        };

        let ty = match kind {
            ExprKind::IntLit {
                ref value,
                width,
                signed,
            } => {
                let ty = match width {
                    Some(w) => {
                        if signed {
                            self.prog.types.int(w)
                        } else {
                            self.prog.types.uint(w)
                        }
                    }
                    None => {
                        self.set_flag(expr, ExprFlags::AUTOCAST);
                        TypeId::U64
                    }
                };
                if !literal_fits(value, width.unwrap_or(64), signed) {
                    return Err(self.error(
                        ErrorKind::OverflowWouldOccur,
                        loc,
                        format!("integer literal {value} does not fit its type"),
                    ));
                }
                ty
            }
            ExprKind::FloatLit { width, .. } => self.prog.types.float(width),
            ExprKind::BoolLit { .. } => TypeId::BOOL,
            ExprKind::StrLit { .. } => TypeId::STRING,
            ExprKind::RandUint { width } => self.prog.types.uint(width),
            ExprKind::TypeLit { ty } => {
                self.set_flag(expr, ExprFlags::IS_TYPE);
                ty
            }
            ExprKind::Ident { name } => self.bind_ident(sig, block, expr, name)?,
            ExprKind::ArrayLit => self.bind_array_lit(sig, block, expr, &children)?,
            ExprKind::TupleLit => {
                let mut elems = Vec::with_capacity(children.len());
                let mut all_types = !children.is_empty();
                for &child in &children {
                    elems.push(self.bind_expr(sig, block, child)?);
                    all_types &= self.prog.exprs.get(child).is_type();
                }
                if all_types {
                    self.set_flag(expr, ExprFlags::IS_TYPE);
                }
                self.prog.types.tuple(elems)
            }
            ExprKind::Dot { name } => self.bind_dot(sig, block, expr, name)?,
            ExprKind::Index => self.bind_index(sig, block, expr, &children)?,
            ExprKind::Slice => {
                let base_ty = self.bind_expr(sig, block, children[0])?;
                if !matches!(
                    self.prog.types.key(base_ty),
                    TypeKey::Array { .. } | TypeKey::Str { .. }
                ) {
                    return Err(self.error(
                        ErrorKind::TypeMismatch,
                        loc,
                        "only arrays and strings can be sliced",
                    ));
                }
                for &bound in &children[1..] {
                    self.bind_index_value(sig, block, bound)?;
                }
                base_ty
            }
            ExprKind::Call => self.bind_call(sig, block, expr)?,
            ExprKind::Binary { op, trunc } => {
                self.bind_binary(sig, block, expr, op, trunc, &children)?
            }
            ExprKind::Unary { op, .. } => self.bind_unary(sig, block, expr, op, &children)?,
            ExprKind::Logical { .. } => {
                let lt = self.bind_expr(sig, block, children[0])?;
                let rt = self.bind_expr(sig, block, children[1])?;
                for (&t, &c) in [lt, rt].iter().zip(&children) {
                    if !matches!(self.prog.types.key(t), TypeKey::Bool { .. }) {
                        let loc = self.prog.exprs.get(c).loc;
                        return Err(self.error(
                            ErrorKind::TypeMismatch,
                            loc,
                            "logical operators need bool operands",
                        ));
                    }
                }
                let secret = self.prog.types.is_secret(lt) || self.prog.types.is_secret(rt);
                self.prog.types.with_secret(TypeId::BOOL, secret)
            }
            ExprKind::Compare { op } => self.bind_compare(sig, block, expr, op, &children)?,
            ExprKind::Cast { trunc } => self.bind_cast(sig, block, expr, trunc, &children)?,
            ExprKind::Select => {
                let cond_ty = self.bind_expr(sig, block, children[0])?;
                if !matches!(self.prog.types.key(cond_ty), TypeKey::Bool { .. }) {
                    return Err(self.error(
                        ErrorKind::TypeMismatch,
                        loc,
                        "select condition must be bool",
                    ));
                }
                let merged = self.unify_exprs(children[1], children[2], loc)?;
                if self.both_autocast(children[1], children[2]) {
                    self.set_flag(expr, ExprFlags::AUTOCAST);
                }
                let secret = self.prog.types.is_secret(cond_ty);
                if secret && !self.prog.types.secretable(merged) {
                    return Err(self.error(
                        ErrorKind::SecretViolation,
                        loc,
                        "cannot select object references by a secret condition",
                    ));
                }
                if secret {
                    self.prog.types.with_secret(merged, true)
                } else {
                    merged
                }
            }
            ExprKind::Secret => {
                let inner = self.bind_expr(sig, block, children[0])?;
                if !self.prog.types.secretable(inner) {
                    return Err(self.error(
                        ErrorKind::SecretViolation,
                        loc,
                        "object references cannot be marked secret",
                    ));
                }
                self.prog.types.with_secret(inner, true)
            }
            ExprKind::Reveal => {
                let inner = self.bind_expr(sig, block, children[0])?;
                if !self.prog.types.secretable(inner) {
                    return Err(self.error(
                        ErrorKind::SecretViolation,
                        loc,
                        "only secret-capable values can be revealed",
                    ));
                }
                self.prog.types.with_secret(inner, false)
            }
            ExprKind::Signed | ExprKind::Unsigned => {
                let inner = self.bind_expr(sig, block, children[0])?;
                if !self.prog.types.is_integer(inner) {
                    return Err(self.error(
                        ErrorKind::TypeMismatch,
                        loc,
                        "sign conversion needs an integer operand",
                    ));
                }
                let signed = matches!(kind, ExprKind::Signed);
                self.prog.types.with_signed(inner, signed)
            }
            ExprKind::Typeof => {
                let inner = self.bind_type_operand(sig, block, children[0])?;
                self.set_flag(expr, ExprFlags::IS_TYPE);
                inner
            }
            ExprKind::Arrayof => {
                let inner = self.bind_type_operand(sig, block, children[0])?;
                self.set_flag(expr, ExprFlags::IS_TYPE);
                self.prog.types.array(inner)
            }
            ExprKind::Widthof => {
                let inner = self.bind_type_operand(sig, block, children[0])?;
                if self.prog.types.width(inner).is_none() {
                    return Err(self.error(
                        ErrorKind::TypeMismatch,
                        loc,
                        "widthof needs a sized numeric operand",
                    ));
                }
                TypeId::U32
            }
            ExprKind::Isnull => {
                let inner = self.bind_expr(sig, block, children[0])?;
                if !matches!(
                    self.prog.types.key(inner),
                    TypeKey::Class { .. } | TypeKey::NullClass { .. }
                ) {
                    return Err(self.error(
                        ErrorKind::TypeMismatch,
                        loc,
                        "isnull needs a class operand",
                    ));
                }
                TypeId::BOOL
            }
            ExprKind::Funcaddr => self.bind_funcaddr(sig, block, expr, children[0])?,
            ExprKind::NullOf => {
                let inner = self.bind_type_operand(sig, block, children[0])?;
                match self.prog.types.key(inner) {
                    TypeKey::Tclass { tclass } => self.prog.types.null_class(tclass),
                    TypeKey::Class { .. } => self.prog.types.with_nullable(inner, true),
                    _ => {
                        return Err(self.error(
                            ErrorKind::TypeMismatch,
                            loc,
                            "null(…) needs a class type",
                        ));
                    }
                }
            }
            ExprKind::Modular => self.bind_modular(sig, block, expr, &children)?,
            ExprKind::Assign { .. } => self.bind_assign_expr(sig, block, None, expr)?,
            ExprKind::NamedParam { .. } => self.bind_expr(sig, block, children[0])?,
            ExprKind::Range => {
                let merged = self.unify_exprs(children[0], children[1], loc)?;
                self.prog.types.tuple(vec![merged, merged])
            }
            ExprKind::In => {
                self.bind_expr(sig, block, children[0])?;
                self.bind_expr(sig, block, children[1])?;
                self.resolve_overload(
                    sable_tree::OverloadOp::In,
                    &[children[0], children[1]],
                    expr,
                    loc,
                )?
            }
        };
        self.prog.exprs.get_mut(expr).ty = Some(ty);
        Ok(ty)
    }

    // =========================================================================
    // Identifiers and member access
    // =========================================================================

    fn bind_ident(
        &mut self,
        sig: SigId,
        block: BlockId,
        expr: ExprId,
        name: sable_common::Atom,
    ) -> BindResult<TypeId> {
        match self.prog.lookup(block, name) {
            Some(IdentTarget::Var(v)) => {
                self.prog.exprs.get_mut(expr).target = Some(IdentTarget::Var(v));
                self.read_var(sig, expr, v)
            }
            Some(IdentTarget::Func(f)) => {
                self.prog.exprs.get_mut(expr).target = Some(IdentTarget::Func(f));
                let kind = self.prog.funcs.get(f).kind;
                match kind {
                    FuncKind::Constructor => {
                        let tclass = self
                            .prog
                            .funcs
                            .get(f)
                            .tclass
                            .expect("constructor has tclass");
                        self.set_flag(expr, ExprFlags::IS_TYPE);
                        Ok(self.prog.types.tclass(tclass))
                    }
                    FuncKind::Enum => {
                        self.set_flag(expr, ExprFlags::IS_TYPE);
                        Ok(self.prog.types.enum_class(f))
                    }
                    _ => Ok(self.prog.types.function(f)),
                }
            }
            None => Err(BindFailure::Blocked(Event::Ident(name))),
        }
    }

    /// Type an expression that reads a variable, recording instantiation
    /// intent and subscribing to the variable's refinement when its type is
    /// still a null type.
    pub(crate) fn read_var(
        &mut self,
        sig: SigId,
        expr: ExprId,
        var: sable_common::VarId,
    ) -> BindResult<TypeId> {
        let Some(ty) = self.prog.vars.get(var).ty else {
            return Err(BindFailure::Blocked(Event::Var(var)));
        };
        let is_type = self.prog.vars.get(var).is_type;
        if is_type {
            self.set_flag(expr, ExprFlags::IS_TYPE);
        } else if !self.type_context {
            self.prog.vars.get_mut(var).instantiated = true;
            self.note_param_use(sig, var);
        }
        if self.prog.vars.get(var).is_const {
            self.set_flag(expr, ExprFlags::CONST);
        }
        if self.prog.types.is_null_class(ty) {
            self.subscribe(Event::Var(var));
        }
        Ok(ty)
    }

    fn bind_dot(
        &mut self,
        sig: SigId,
        block: BlockId,
        expr: ExprId,
        name: sable_common::Atom,
    ) -> BindResult<TypeId> {
        let base = self.prog.exprs.get(expr).children[0];
        let base_ty = self.bind_expr(sig, block, base)?;
        let loc = self.prog.exprs.get(expr).loc;

        let scope = match self.member_scope(base_ty) {
            Some(scope) => scope,
            None => {
                if self.prog.types.is_null_class(base_ty) {
                    return match self.refine_event_for(base) {
                        Some(event) => Err(BindFailure::Blocked(event)),
                        None => Err(self.error(
                            ErrorKind::TypeMismatch,
                            loc,
                            "cannot access a member of an unresolved null value",
                        )),
                    };
                }
                return Err(self.error(
                    ErrorKind::TypeMismatch,
                    loc,
                    format!("type {} has no members", self.prog.render_type(base_ty)),
                ));
            }
        };
        match scope {
            MemberScope::Class(class) => {
                let members = self.prog.classes.get(class).members;
                if let Some(IdentTarget::Var(v)) = self.prog.blocks.get(members).lookup(name) {
                    self.prog.exprs.get_mut(expr).target = Some(IdentTarget::Var(v));
                    return self.read_var(sig, expr, v);
                }
                // Methods live on the tclass constructor body.
                let tclass = self.prog.classes.get(class).tclass;
                let ctor_body = self.prog.funcs.get(self.prog.tclasses.get(tclass).constructor).body;
                if let Some(IdentTarget::Func(f)) = self.prog.blocks.get(ctor_body).lookup(name) {
                    self.prog.exprs.get_mut(expr).target = Some(IdentTarget::Func(f));
                    return Ok(self.prog.types.function(f));
                }
                if self.prog.classes.get(class).bound {
                    Err(self.error(
                        ErrorKind::UndefinedIdentifier,
                        loc,
                        format!(
                            "no member '{}' on {}",
                            self.prog.strings.resolve(name),
                            self.prog.render_type(base_ty)
                        ),
                    ))
                } else {
                    // The constructor may still discover this member.
                    Err(BindFailure::Blocked(Event::Ident(name)))
                }
            }
            MemberScope::FuncBody(f) => {
                let body = self.prog.funcs.get(f).body;
                match self.prog.blocks.get(body).lookup(name) {
                    Some(IdentTarget::Var(v)) => {
                        self.prog.exprs.get_mut(expr).target = Some(IdentTarget::Var(v));
                        self.read_var(sig, expr, v)
                    }
                    Some(IdentTarget::Func(inner)) => {
                        self.prog.exprs.get_mut(expr).target = Some(IdentTarget::Func(inner));
                        Ok(self.prog.types.function(inner))
                    }
                    None => Err(BindFailure::Blocked(Event::Ident(name))),
                }
            }
            MemberScope::EnumBody(f) => {
                let body = self.prog.funcs.get(f).body;
                match self.prog.blocks.get(body).lookup(name) {
                    Some(IdentTarget::Var(v)) => {
                        self.prog.exprs.get_mut(expr).target = Some(IdentTarget::Var(v));
                        self.set_flag(expr, ExprFlags::CONST);
                        Ok(self.prog.types.enum_value(f))
                    }
                    _ => Err(self.error(
                        ErrorKind::UndefinedIdentifier,
                        loc,
                        format!("no enum entry '{}'", self.prog.strings.resolve(name)),
                    )),
                }
            }
            MemberScope::Builtin => {
                let func = self.builtin_method(base_ty, name, loc)?;
                self.prog.exprs.get_mut(expr).target = Some(IdentTarget::Func(func));
                Ok(self.prog.types.function(func))
            }
        }
    }

    fn bind_array_lit(
        &mut self,
        sig: SigId,
        block: BlockId,
        expr: ExprId,
        children: &[ExprId],
    ) -> BindResult<TypeId> {
        let loc = self.prog.exprs.get(expr).loc;
        if children.is_empty() {
            return Err(self.error(
                ErrorKind::TypeMismatch,
                loc,
                "cannot infer the element type of an empty array",
            ));
        }
        let first = self.bind_expr(sig, block, children[0])?;
        if children.len() == 1 && self.prog.exprs.get(children[0]).is_type() {
            self.set_flag(expr, ExprFlags::IS_TYPE);
            return Ok(self.prog.types.array(first));
        }
        let mut merged = children[0];
        for &child in &children[1..] {
            self.bind_expr(sig, block, child)?;
            self.unify_exprs(merged, child, loc)?;
            merged = child;
        }
        // A second sweep settles every element on the final unified type.
        let final_ty = self.expr_ty(merged);
        for &child in children {
            self.autocast_apply(child, final_ty)?;
        }
        Ok(self.prog.types.array(final_ty))
    }

    fn bind_index(
        &mut self,
        sig: SigId,
        block: BlockId,
        expr: ExprId,
        children: &[ExprId],
    ) -> BindResult<TypeId> {
        let loc = self.prog.exprs.get(expr).loc;
        let base_ty = self.bind_expr(sig, block, children[0])?;
        match self.prog.types.key(base_ty) {
            TypeKey::Array { elem } => {
                self.bind_index_value(sig, block, children[1])?;
                Ok(elem)
            }
            TypeKey::Str { secret } => {
                self.bind_index_value(sig, block, children[1])?;
                Ok(self.prog.types.with_secret(TypeId::U8, secret))
            }
            TypeKey::Tuple { elems } => {
                self.bind_expr(sig, block, children[1])?;
                let ExprKind::IntLit { ref value, .. } = self.prog.exprs.get(children[1]).kind
                else {
                    return Err(self.error(
                        ErrorKind::TypeMismatch,
                        loc,
                        "tuple index must be a constant integer",
                    ));
                };
                let index = usize::try_from(value.clone()).ok().filter(|&i| i < elems.len());
                match index {
                    Some(i) => Ok(elems[i]),
                    None => Err(self.error(
                        ErrorKind::TypeMismatch,
                        loc,
                        "tuple index out of range",
                    )),
                }
            }
            _ => {
                self.bind_expr(sig, block, children[1])?;
                self.resolve_overload(
                    sable_tree::OverloadOp::Index,
                    &[children[0], children[1]],
                    expr,
                    loc,
                )
            }
        }
    }

    /// Array and slice indices are non-secret unsigned integers.
    fn bind_index_value(&mut self, sig: SigId, block: BlockId, index: ExprId) -> BindResult<TypeId> {
        let ty = self.bind_expr(sig, block, index)?;
        let loc = self.prog.exprs.get(index).loc;
        if !self.prog.types.is_integer(ty) {
            return Err(self.error(ErrorKind::TypeMismatch, loc, "index must be an integer"));
        }
        if self.prog.types.is_secret(ty) {
            return Err(self.error(
                ErrorKind::SecretViolation,
                loc,
                "cannot index by a secret value",
            ));
        }
        Ok(ty)
    }

    // =========================================================================
    // Operators
    // =========================================================================

    fn bind_binary(
        &mut self,
        sig: SigId,
        block: BlockId,
        expr: ExprId,
        op: BinOp,
        _trunc: bool,
        children: &[ExprId],
    ) -> BindResult<TypeId> {
        let loc = self.prog.exprs.get(expr).loc;
        let lt = self.bind_expr(sig, block, children[0])?;
        let rt = self.bind_expr(sig, block, children[1])?;

        if self.wants_overload(lt) || self.wants_overload(rt) {
            return self.resolve_overload(op.into(), &[children[0], children[1]], expr, loc);
        }

        if op.is_shift() {
            if !self.prog.types.is_integer(lt) {
                return Err(self.error(
                    ErrorKind::TypeMismatch,
                    loc,
                    "shift needs an integer operand",
                ));
            }
            if !self.prog.types.is_uint(rt) {
                return Err(self.error(
                    ErrorKind::TypeMismatch,
                    loc,
                    "shift distance must be unsigned",
                ));
            }
            if self.prog.types.is_secret(rt) {
                return Err(self.error(
                    ErrorKind::SecretViolation,
                    loc,
                    "shift distance must not be secret",
                ));
            }
            // A constant distance >= the operand width is already wrong.
            if let ExprKind::IntLit { ref value, .. } = self.prog.exprs.get(children[1]).kind {
                let width = self.prog.types.width(lt).unwrap_or(64);
                if *value >= BigInt::from(width) {
                    return Err(self.error(
                        ErrorKind::TypeMismatch,
                        loc,
                        format!("shift distance {value} exceeds the operand width {width}"),
                    ));
                }
            }
            if self.prog.exprs.get(children[0]).is_autocast() {
                self.set_flag(expr, ExprFlags::AUTOCAST);
            }
            return Ok(lt);
        }

        let string_like = |k: &TypeKey| matches!(k, TypeKey::Str { .. } | TypeKey::Array { .. });
        let lk = self.prog.types.key(lt);
        let rk = self.prog.types.key(rt);
        let legal = match op {
            // Plus concatenates strings and arrays; xor on strings is
            // bytewise.
            BinOp::Add => {
                self.prog.types.is_numeric(lt) && self.prog.types.is_numeric(rt)
                    || (string_like(&lk) && string_like(&rk))
            }
            BinOp::BitXor => {
                (self.prog.types.is_integer(lt) && self.prog.types.is_integer(rt))
                    || (matches!(lk, TypeKey::Str { .. }) && matches!(rk, TypeKey::Str { .. }))
            }
            BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => {
                self.prog.types.is_numeric(lt) && self.prog.types.is_numeric(rt)
            }
            BinOp::BitAnd | BinOp::BitOr => {
                self.prog.types.is_integer(lt) && self.prog.types.is_integer(rt)
            }
            BinOp::Shl | BinOp::Shr | BinOp::Rotl | BinOp::Rotr => unreachable!(),
        };
        if !legal {
            return Err(BindFailure::Error(
                sable_common::BindError::new(
                    ErrorKind::TypeMismatch,
                    loc,
                    "operands do not support this operator",
                )
                .with_datatypes(self.prog.render_type(lt), self.prog.render_type(rt)),
            ));
        }
        let merged = self.unify_exprs(children[0], children[1], loc)?;
        if self.both_autocast(children[0], children[1]) {
            self.set_flag(expr, ExprFlags::AUTOCAST);
        }
        Ok(merged)
    }

    fn bind_unary(
        &mut self,
        sig: SigId,
        block: BlockId,
        expr: ExprId,
        op: UnOp,
        children: &[ExprId],
    ) -> BindResult<TypeId> {
        let loc = self.prog.exprs.get(expr).loc;
        let ty = self.bind_expr(sig, block, children[0])?;
        if self.wants_overload(ty) {
            return self.resolve_overload(op.into(), &[children[0]], expr, loc);
        }
        let ok = match op {
            UnOp::Neg => self.prog.types.is_numeric(ty),
            UnOp::BitNot => self.prog.types.is_integer(ty),
            UnOp::Not => matches!(self.prog.types.key(ty), TypeKey::Bool { .. }),
        };
        if !ok {
            return Err(self.error(
                ErrorKind::TypeMismatch,
                loc,
                format!("operand type {} does not support this operator", self.prog.render_type(ty)),
            ));
        }
        if self.prog.exprs.get(children[0]).is_autocast() {
            self.set_flag(expr, ExprFlags::AUTOCAST);
        }
        Ok(ty)
    }

    fn bind_compare(
        &mut self,
        sig: SigId,
        block: BlockId,
        expr: ExprId,
        op: CmpOp,
        children: &[ExprId],
    ) -> BindResult<TypeId> {
        let loc = self.prog.exprs.get(expr).loc;
        let lt = self.bind_expr(sig, block, children[0])?;
        let rt = self.bind_expr(sig, block, children[1])?;

        let class_like = |t: TypeId| {
            matches!(
                self.prog.types.key(t),
                TypeKey::Class { .. } | TypeKey::NullClass { .. }
            )
        };
        if op.is_equality() && (class_like(lt) || class_like(rt)) {
            // Equality on classes compares references.
            if unify(&self.prog.types, lt, rt, false, false).is_none() {
                return Err(BindFailure::Error(
                    sable_common::BindError::new(
                        ErrorKind::TypeMismatch,
                        loc,
                        "cannot compare unrelated classes",
                    )
                    .with_datatypes(self.prog.render_type(lt), self.prog.render_type(rt)),
                ));
            }
            return Ok(TypeId::BOOL);
        }
        // Equal types always support equality (enums, tuples, structs).
        if op.is_equality() && lt == rt {
            let secret = self.prog.types.is_secret(lt);
            return Ok(self.prog.types.with_secret(TypeId::BOOL, secret));
        }
        if self.wants_overload(lt) || self.wants_overload(rt) {
            return self.resolve_overload(op.into(), &[children[0], children[1]], expr, loc);
        }
        let merged = self.unify_exprs(children[0], children[1], loc)?;
        if !op.is_equality() {
            let ordered = self.prog.types.is_numeric(merged)
                || matches!(self.prog.types.key(merged), TypeKey::Str { .. });
            if !ordered {
                return Err(self.error(
                    ErrorKind::TypeMismatch,
                    loc,
                    format!("type {} has no ordering", self.prog.render_type(merged)),
                ));
            }
        }
        let secret = self.prog.types.is_secret(merged);
        Ok(self.prog.types.with_secret(TypeId::BOOL, secret))
    }

    fn bind_cast(
        &mut self,
        sig: SigId,
        block: BlockId,
        expr: ExprId,
        trunc: bool,
        children: &[ExprId],
    ) -> BindResult<TypeId> {
        let loc = self.prog.exprs.get(expr).loc;
        let target = self.bind_type_operand(sig, block, children[0])?;
        let value_ty = self.bind_expr(sig, block, children[1])?;
        if !check_cast(&self.prog.types, value_ty, target, trunc, self.prog) {
            return Err(BindFailure::Error(
                sable_common::BindError::new(ErrorKind::InvalidCast, loc, "illegal cast")
                    .with_datatypes(self.prog.render_type(value_ty), self.prog.render_type(target)),
            ));
        }
        // Secrecy of the result equals secrecy of the operand.
        let secret = self.prog.types.is_secret(value_ty);
        if self.prog.types.secretable(target) {
            Ok(self.prog.types.with_secret(target, secret))
        } else {
            Ok(target)
        }
    }

    /// Bind an operand whose binding path needs no runtime value (typeof,
    /// widthof, arrayof, cast targets): variables read here do not get
    /// marked instantiated.
    pub(crate) fn bind_type_operand(
        &mut self,
        sig: SigId,
        block: BlockId,
        expr: ExprId,
    ) -> BindResult<TypeId> {
        let saved = self.type_context;
        self.type_context = true;
        let result = self.bind_expr(sig, block, expr);
        self.type_context = saved;
        result
    }

    /// Operand types that route binary/unary/comparison operators through
    /// the operator-overload table.
    fn wants_overload(&self, ty: TypeId) -> bool {
        matches!(
            self.prog.types.key(ty),
            TypeKey::Class { .. }
                | TypeKey::NullClass { .. }
                | TypeKey::Struct { .. }
                | TypeKey::Tuple { .. }
                | TypeKey::Enum { .. }
                | TypeKey::EnumClass { .. }
        )
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    pub(crate) fn expr_ty(&self, expr: ExprId) -> TypeId {
        self.prog
            .exprs
            .get(expr)
            .ty
            .expect("expression bound before use")
    }

    pub(crate) fn set_flag(&mut self, expr: ExprId, flag: ExprFlags) {
        self.prog.exprs.get_mut(expr).flags.set(flag);
    }

    fn both_autocast(&self, a: ExprId, b: ExprId) -> bool {
        self.prog.exprs.get(a).is_autocast() && self.prog.exprs.get(b).is_autocast()
    }

    /// Unify the datatypes of two bound sibling expressions, letting an
    /// autocast side adopt the other's width, and push the unified type
    /// back down into the autocast subtrees.
    pub(crate) fn unify_exprs(
        &mut self,
        left: ExprId,
        right: ExprId,
        loc: sable_common::Loc,
    ) -> BindResult<TypeId> {
        let lt = self.expr_ty(left);
        let rt = self.expr_ty(right);
        let la = self.prog.exprs.get(left).is_autocast();
        let ra = self.prog.exprs.get(right).is_autocast();
        let Some(merged) = unify(&self.prog.types, lt, rt, la, ra) else {
            return Err(BindFailure::Error(
                sable_common::BindError::new(ErrorKind::TypeMismatch, loc, "cannot unify operands")
                    .with_datatypes(self.prog.render_type(lt), self.prog.render_type(rt)),
            ));
        };
        self.autocast_apply(left, merged)?;
        self.autocast_apply(right, merged)?;
        Ok(merged)
    }

    /// Unify a value expression against an expected datatype (declared
    /// constraint, prior variable type, parameter constraint).
    pub(crate) fn unify_with(
        &mut self,
        expected: TypeId,
        value: ExprId,
        loc: sable_common::Loc,
    ) -> BindResult<TypeId> {
        let vt = self.expr_ty(value);
        let auto = self.prog.exprs.get(value).is_autocast();
        let Some(merged) = unify(&self.prog.types, expected, vt, false, auto) else {
            return Err(BindFailure::Error(
                sable_common::BindError::new(ErrorKind::TypeMismatch, loc, "cannot unify value with expected type")
                    .with_datatypes(self.prog.render_type(expected), self.prog.render_type(vt)),
            ));
        };
        self.autocast_apply(value, merged)?;
        Ok(merged)
    }

    /// Retype an autocast subtree after its width was adopted from the
    /// other operand.
    pub(crate) fn autocast_apply(&mut self, expr: ExprId, ty: TypeId) -> BindResult<()> {
        if !self.prog.exprs.get(expr).is_autocast() || !self.prog.types.is_integer(ty) {
            return Ok(());
        }
        let (kind, children, loc) = {
            let e = self.prog.exprs.get(expr);
            (e.kind.clone(), e.children.clone(), e.loc)
        };
        if let ExprKind::IntLit { ref value, .. } = kind {
            let (width, signed) = match self.prog.types.key(ty) {
                TypeKey::Uint { width, .. } => (width, false),
                TypeKey::Int { width, .. } => (width, true),
                _ => return Ok(()),
            };
            if !literal_fits(value, width, signed) {
                return Err(self.error(
                    ErrorKind::OverflowWouldOccur,
                    loc,
                    format!("literal {value} does not fit {}", self.prog.render_type(ty)),
                ));
            }
        }
        self.prog.exprs.get_mut(expr).ty = Some(ty);
        for child in children {
            self.autocast_apply(child, ty)?;
        }
        Ok(())
    }

    // =========================================================================
    // Assignment
    // =========================================================================

    /// Bind an assignment. `stmt` is the owning statement when the
    /// assignment appears in statement position; first assignments to a
    /// fresh name create a local variable there.
    pub(crate) fn bind_assign_expr(
        &mut self,
        sig: SigId,
        block: BlockId,
        stmt: Option<StmtId>,
        expr: ExprId,
    ) -> BindResult<TypeId> {
        let (children, loc, op) = {
            let e = self.prog.exprs.get(expr);
            let ExprKind::Assign { op } = e.kind else {
                unreachable!("assignment statement without assign expression");
            };
            (e.children.clone(), e.loc, op)
        };
        let target = children[0];
        let value = children[1];

        let mut value_ty = self.bind_expr(sig, block, value)?;
        if let Some(&constraint) = children.get(2) {
            let expected = self.eval_type_expr(block, constraint, None)?;
            value_ty = self.unify_with(expected, value, loc)?;
        }
        // Operator-assign forms read the target first; the target must
        // already exist and unify like the corresponding binary operator.
        let is_op_assign = op.is_some();

        let (target_kind, target_children) = {
            let e = self.prog.exprs.get(target);
            (e.kind.clone(), e.children.clone())
        };
        // Shift-assign keeps the target's type; the value is a distance.
        let shift_assign = matches!(op, Some(op) if op.is_shift());

        let final_ty = match target_kind {
            ExprKind::Ident { name } => match self.prog.lookup(block, name) {
                Some(IdentTarget::Var(v)) => {
                    self.prog.exprs.get_mut(target).target = Some(IdentTarget::Var(v));
                    let ty = if shift_assign {
                        let Some(cur) = self.prog.vars.get(v).ty else {
                            return Err(BindFailure::Blocked(Event::Var(v)));
                        };
                        if !self.prog.types.is_uint(value_ty) {
                            return Err(self.error(
                                ErrorKind::TypeMismatch,
                                loc,
                                "shift distance must be unsigned",
                            ));
                        }
                        if self.prog.types.is_secret(value_ty) {
                            return Err(self.error(
                                ErrorKind::SecretViolation,
                                loc,
                                "shift distance must not be secret",
                            ));
                        }
                        cur
                    } else {
                        self.assign_var(sig, v, value, value_ty, stmt, loc)?
                    };
                    self.prog.exprs.get_mut(target).ty = Some(ty);
                    ty
                }
                Some(IdentTarget::Func(_)) => {
                    return Err(self.error(
                        ErrorKind::TypeMismatch,
                        loc,
                        "cannot assign to a function",
                    ));
                }
                None => {
                    if is_op_assign {
                        // Read-modify-write of a name that does not exist
                        // yet: wait for its definition.
                        return Err(BindFailure::Blocked(Event::Ident(name)));
                    }
                    let is_type = self.prog.exprs.get(value).is_type();
                    let mut var = Variable::new(name, VarKind::Local, loc);
                    var.ty = Some(value_ty);
                    var.is_type = is_type;
                    let v = self.prog.vars.alloc(var);
                    self.define_name(block, name, IdentTarget::Var(v));
                    if let Some(stmt) = stmt {
                        self.prog
                            .stmts
                            .get_mut(stmt)
                            .flags
                            .set(StmtFlags::FIRST_ASSIGNMENT);
                    }
                    self.prog.exprs.get_mut(target).target = Some(IdentTarget::Var(v));
                    self.prog.exprs.get_mut(target).ty = Some(value_ty);
                    value_ty
                }
            },
            ExprKind::Dot { name } => {
                self.assign_member(sig, block, stmt, target, &target_children, name, value, value_ty, loc)?
            }
            ExprKind::Index => {
                let elem_ty = self.bind_expr(sig, block, target)?;
                self.unify_with(elem_ty, value, loc)?
            }
            _ => {
                return Err(self.error(
                    ErrorKind::TypeMismatch,
                    loc,
                    "invalid assignment target",
                ));
            }
        };
        self.prog.exprs.get_mut(expr).ty = Some(final_ty);
        Ok(final_ty)
    }

    /// Unify an assignment into a variable, refining Null toward Class and
    /// waking every task that saw the less-refined type.
    fn assign_var(
        &mut self,
        _sig: SigId,
        var: sable_common::VarId,
        value: ExprId,
        value_ty: TypeId,
        stmt: Option<StmtId>,
        loc: sable_common::Loc,
    ) -> BindResult<TypeId> {
        let first_here = stmt
            .map(|s| self.prog.stmts.get(s).flags.has(StmtFlags::FIRST_ASSIGNMENT))
            .unwrap_or(false);
        let (old, is_const) = {
            let v = self.prog.vars.get(var);
            (v.ty, v.is_const)
        };
        match old {
            None => {
                let is_type = self.prog.exprs.get(value).is_type();
                {
                    let v = self.prog.vars.get_mut(var);
                    v.ty = Some(value_ty);
                    v.is_type = is_type;
                }
                if let Some(stmt) = stmt {
                    self.prog
                        .stmts
                        .get_mut(stmt)
                        .flags
                        .set(StmtFlags::FIRST_ASSIGNMENT);
                }
                self.fire(Event::Var(var));
                Ok(value_ty)
            }
            Some(old) => {
                if is_const && !first_here {
                    return Err(self.error(
                        ErrorKind::TypeMismatch,
                        loc,
                        format!(
                            "cannot reassign constant '{}'",
                            self.prog
                                .strings
                                .resolve(self.prog.vars.get(var).name)
                        ),
                    ));
                }
                let auto = self.prog.exprs.get(value).is_autocast();
                let Some(merged) = unify(&self.prog.types, old, value_ty, false, auto) else {
                    return Err(BindFailure::Error(
                        sable_common::BindError::new(
                            ErrorKind::TypeMismatch,
                            loc,
                            "assignment does not match the variable's type",
                        )
                        .with_datatypes(self.prog.render_type(old), self.prog.render_type(value_ty)),
                    ));
                };
                self.autocast_apply(value, merged)?;
                if merged != old {
                    self.prog.vars.get_mut(var).ty = Some(merged);
                    self.fire(Event::Var(var));
                }
                Ok(merged)
            }
        }
    }

    /// Member assignment. `self.x = …` inside a constructor discovers new
    /// member variables on the class under construction.
    #[allow(clippy::too_many_arguments)]
    fn assign_member(
        &mut self,
        sig: SigId,
        block: BlockId,
        stmt: Option<StmtId>,
        target: ExprId,
        target_children: &[ExprId],
        name: sable_common::Atom,
        value: ExprId,
        value_ty: TypeId,
        loc: sable_common::Loc,
    ) -> BindResult<TypeId> {
        let base = target_children[0];
        let base_ty = self.bind_expr(sig, block, base)?;

        let class = match self.member_scope(base_ty) {
            Some(MemberScope::Class(class)) => class,
            _ => {
                if self.prog.types.is_null_class(base_ty) {
                    if let Some(event) = self.refine_event_for(base) {
                        return Err(BindFailure::Blocked(event));
                    }
                }
                return Err(self.error(
                    ErrorKind::TypeMismatch,
                    loc,
                    format!("type {} has no members", self.prog.render_type(base_ty)),
                ));
            }
        };
        let members = self.prog.classes.get(class).members;
        if let Some(IdentTarget::Var(v)) = self.prog.blocks.get(members).lookup(name) {
            self.prog.exprs.get_mut(target).target = Some(IdentTarget::Var(v));
            let ty = self.assign_var(sig, v, value, value_ty, stmt, loc)?;
            self.prog.exprs.get_mut(target).ty = Some(ty);
            return Ok(ty);
        }

        // Discovery: only the constructor of this very class may introduce
        // members through its `self`.
        let is_ctor_self = {
            let s = self.prog.sigs.get(sig);
            s.class == Some(class)
                && s.self_var.is_some()
                && self.prog.exprs.get(base).target
                    == s.self_var.map(IdentTarget::Var)
        };
        if !is_ctor_self {
            return Err(self.error(
                ErrorKind::UndefinedIdentifier,
                loc,
                format!(
                    "no member '{}' on {}",
                    self.prog.strings.resolve(name),
                    self.prog.render_type(base_ty)
                ),
            ));
        }
        let mut var = Variable::new(name, VarKind::Member, loc);
        var.ty = Some(value_ty);
        var.is_type = self.prog.exprs.get(value).is_type();
        var.instantiated = true;
        let v = self.prog.vars.alloc(var);
        self.define_name(members, name, IdentTarget::Var(v));
        if let Some(stmt) = stmt {
            self.prog
                .stmts
                .get_mut(stmt)
                .flags
                .set(StmtFlags::FIRST_ASSIGNMENT);
        }
        self.prog.exprs.get_mut(target).target = Some(IdentTarget::Var(v));
        self.prog.exprs.get_mut(target).ty = Some(value_ty);
        Ok(value_ty)
    }

    // =========================================================================
    // Modular arithmetic
    // =========================================================================

    /// `e mod m`: the modulus is a non-secret uint; the sub-expression is
    /// bound in modular mode, where only arithmetic, negation, equality,
    /// identifiers, casts, and calls are legal.
    fn bind_modular(
        &mut self,
        sig: SigId,
        block: BlockId,
        expr: ExprId,
        children: &[ExprId],
    ) -> BindResult<TypeId> {
        let loc = self.prog.exprs.get(expr).loc;
        let modulus = children[1];
        let m_ty = self.bind_expr(sig, block, modulus)?;
        if !self.prog.types.is_uint(m_ty) {
            return Err(self.error(
                ErrorKind::InvalidModularExpression,
                loc,
                "modulus must be an unsigned integer",
            ));
        }
        if self.prog.types.is_secret(m_ty) {
            return Err(self.error(
                ErrorKind::SecretViolation,
                loc,
                "modulus must not be secret",
            ));
        }
        let modint = self.prog.types.modint(modulus);
        let secret = self.bind_mod_operand(sig, block, children[0], modint)?;
        let width = self.prog.types.width(m_ty).expect("uint has width");
        let result = self.prog.types.uint(width);
        Ok(self.prog.types.with_secret(result, secret))
    }

    /// Returns whether any leaf of the modular operand is secret.
    fn bind_mod_operand(
        &mut self,
        sig: SigId,
        block: BlockId,
        expr: ExprId,
        modint: TypeId,
    ) -> BindResult<bool> {
        let (kind, children, loc) = {
            let e = self.prog.exprs.get(expr);
            (e.kind.clone(), e.children.clone(), e.loc)
        };
        match kind {
            ExprKind::Binary {
                op: BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div,
                ..
            } => {
                let ls = self.bind_mod_operand(sig, block, children[0], modint)?;
                let rs = self.bind_mod_operand(sig, block, children[1], modint)?;
                self.prog.exprs.get_mut(expr).ty = Some(modint);
                Ok(ls || rs)
            }
            ExprKind::Unary { op: UnOp::Neg, .. } => {
                let secret = self.bind_mod_operand(sig, block, children[0], modint)?;
                self.prog.exprs.get_mut(expr).ty = Some(modint);
                Ok(secret)
            }
            ExprKind::Compare { op } if op.is_equality() => {
                let ls = self.bind_mod_operand(sig, block, children[0], modint)?;
                let rs = self.bind_mod_operand(sig, block, children[1], modint)?;
                self.prog.exprs.get_mut(expr).ty =
                    Some(self.prog.types.with_secret(TypeId::BOOL, ls || rs));
                Ok(ls || rs)
            }
            ExprKind::IntLit { .. }
            | ExprKind::Ident { .. }
            | ExprKind::Cast { .. }
            | ExprKind::Call
            | ExprKind::Dot { .. } => {
                let ty = self.bind_expr(sig, block, expr)?;
                if !self.prog.types.is_integer(ty) {
                    return Err(self.error(
                        ErrorKind::InvalidModularExpression,
                        loc,
                        "modular operands must be integers",
                    ));
                }
                Ok(self.prog.types.is_secret(ty))
            }
            _ => Err(self.error(
                ErrorKind::InvalidModularExpression,
                loc,
                "operator not allowed inside a modular expression",
            )),
        }
    }
}

/// Does a literal fit in `width` bits (two's complement when signed)?
pub(crate) fn literal_fits(value: &BigInt, width: u32, signed: bool) -> bool {
    if signed {
        let bound = BigInt::from(1u8) << (width - 1);
        value < &bound && value >= &(-bound.clone())
    } else {
        !value.is_negative() && value.bits() <= u64::from(width)
    }
}
