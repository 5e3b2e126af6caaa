//! Call binding: canonicalization of argument lists, signature selection,
//! operator-overload resolution, and function-address expressions.

use rustc_hash::FxHashMap;
use sable_common::{Atom, BindError, BlockId, ErrorKind, ExprId, FuncId, Loc, SigId};
use sable_tree::{Block, BlockOwner, ExprKind, FuncKind, Function, OverloadOp};
use sable_types::{TypeId, TypeKey, unify};
use tracing::debug;

use crate::copy::CopyMap;
use crate::state::{BindFailure, BindResult, Binder, Event};

impl Binder<'_> {
    pub(crate) fn bind_call(
        &mut self,
        sig: SigId,
        block: BlockId,
        expr: ExprId,
    ) -> BindResult<TypeId> {
        let (children, loc) = {
            let e = self.prog.exprs.get(expr);
            (e.children.clone(), e.loc)
        };
        let callee = children[0];
        let args: Vec<ExprId> = children[1..].to_vec();
        let callee_ty = self.bind_expr(sig, block, callee)?;

        // Indirect call through a function pointer: arity and types are
        // fixed by the pointer, no signature machinery involved.
        if let TypeKey::Funcptr { ret, params } = self.prog.types.key(callee_ty) {
            if args.len() != params.len() {
                return Err(self.error(
                    ErrorKind::WrongArity,
                    loc,
                    format!("expected {} arguments, got {}", params.len(), args.len()),
                ));
            }
            for (&arg, &pty) in args.iter().zip(&params) {
                self.bind_expr(sig, block, arg)?;
                self.unify_with(pty, arg, loc)?;
            }
            return Ok(ret);
        }

        let func = match self.prog.types.key(callee_ty) {
            TypeKey::Function { func } => func,
            TypeKey::Tclass { tclass } => self.prog.tclasses.get(tclass).constructor,
            _ => {
                return Err(self.error(
                    ErrorKind::TypeMismatch,
                    loc,
                    format!("type {} is not callable", self.prog.render_type(callee_ty)),
                ));
            }
        };

        // Method calls pass the dotted base as the implicit self argument.
        let receiver = if self.prog.funcs.get(func).is_method {
            match self.prog.exprs.get(callee).kind {
                ExprKind::Dot { .. } => Some(self.prog.exprs.get(callee).children[0]),
                _ => None,
            }
        } else {
            None
        };
        if let Some(receiver) = receiver {
            let rt = self.expr_ty(receiver);
            if self.prog.types.is_null_class(rt) {
                // The method body cannot bind against an unchosen class.
                return match self.refine_event_for(receiver) {
                    Some(event) => Err(BindFailure::Blocked(event)),
                    None => Err(self.error(
                        ErrorKind::TypeMismatch,
                        loc,
                        "cannot call a method on an unresolved null value",
                    )),
                };
            }
        }

        // A previous run may already have canonicalized the receiver into
        // the argument list; do not pass it twice.
        let mut args = args;
        if let Some(receiver) = receiver {
            if args.first() == Some(&receiver) {
                args.remove(0);
            }
        }

        let vector = self.canonicalize_call(sig, block, expr, func, &args, receiver, loc)?;

        let prev = self.prog.exprs.get(expr).sig;
        let new_sig = self.get_or_create_sig(func, vector, loc)?;
        if let Some(prev) = prev {
            if prev != new_sig && self.prog.sigs.get(prev).partial {
                // The partial signature has been superseded by the
                // canonical one.
                self.destroy_partial_sig(prev);
            }
        }
        self.prog.sigs.get_mut(new_sig).instantiated = true;
        self.prog.exprs.get_mut(expr).sig = Some(new_sig);

        // Null-typed arguments will refine; re-run this call when they do.
        let canonical_args: Vec<ExprId> = self.prog.exprs.get(expr).children[1..].to_vec();
        for arg in canonical_args {
            let ty = self.expr_ty(arg);
            if self.prog.types.is_null_class(ty) {
                if let Some(event) = self.refine_event_for(arg) {
                    self.subscribe(event);
                }
            }
        }

        self.call_result(new_sig)
    }

    /// The result type of a call through a resolved signature; parks until
    /// the callee's return type is known, and subscribes to its refinement
    /// while it is still a null type.
    fn call_result(&mut self, sig: SigId) -> BindResult<TypeId> {
        // A partial constructor signature only names the pending class; its
        // callers see the null type, which refines once the null slot
        // becomes concrete and the canonical signature replaces it.
        if self.prog.sigs.get(sig).partial {
            let func = self.prog.sigs.get(sig).func;
            let tclass = self
                .prog
                .funcs
                .get(func)
                .tclass
                .expect("partial signatures are constructors");
            return Ok(self.prog.types.null_class(tclass));
        }
        match self.prog.sigs.get(sig).ret {
            Some(ret) => {
                if self.prog.types.is_null_class(ret) {
                    self.subscribe(Event::Sig(sig));
                }
                Ok(ret)
            }
            None => Err(BindFailure::Blocked(Event::Sig(sig))),
        }
    }

    /// Canonicalize a call's argument list into declaration order:
    /// positional slots fill left to right, named arguments match by
    /// parameter name, defaults are copied into the caller's scope, and
    /// parameter constraints are applied. The call's children are rewritten
    /// to the canonical order for the code generator.
    fn canonicalize_call(
        &mut self,
        sig: SigId,
        block: BlockId,
        call: ExprId,
        func: FuncId,
        args: &[ExprId],
        receiver: Option<ExprId>,
        loc: Loc,
    ) -> BindResult<Vec<TypeId>> {
        let params = self.prog.funcs.get(func).params.clone();
        let mut slots: Vec<Option<ExprId>> = vec![None; params.len()];
        let mut pos = 0usize;
        if let Some(receiver) = receiver {
            if slots.is_empty() {
                return Err(self.error(
                    ErrorKind::WrongArity,
                    loc,
                    "method has no self parameter",
                ));
            }
            slots[0] = Some(receiver);
            pos = 1;
        }
        for &arg in args {
            if let ExprKind::NamedParam { name } = self.prog.exprs.get(arg).kind {
                let index = params
                    .iter()
                    .position(|&p| self.prog.vars.get(p).name == name);
                let Some(index) = index else {
                    return Err(self.error(
                        ErrorKind::WrongArity,
                        loc,
                        format!("no parameter named '{}'", self.prog.strings.resolve(name)),
                    ));
                };
                if slots[index].is_some() {
                    return Err(self.error(
                        ErrorKind::WrongArity,
                        loc,
                        format!(
                            "parameter '{}' passed twice",
                            self.prog.strings.resolve(name)
                        ),
                    ));
                }
                slots[index] = Some(arg);
            } else {
                while pos < slots.len() && slots[pos].is_some() {
                    pos += 1;
                }
                if pos >= slots.len() {
                    return Err(self.error(ErrorKind::WrongArity, loc, "too many arguments"));
                }
                slots[pos] = Some(arg);
                pos += 1;
            }
        }
        // Remaining unfilled slots take their declared default, evaluated
        // in the caller's scope on a private copy.
        for (index, slot) in slots.iter_mut().enumerate() {
            if slot.is_none() {
                let default = self.prog.vars.get(params[index]).default;
                let Some(default) = default else {
                    let name = self.prog.vars.get(params[index]).name;
                    return Err(BindFailure::Error(BindError::new(
                        ErrorKind::MissingDefault,
                        loc,
                        format!(
                            "parameter '{}' is not passed and has no default",
                            self.prog.strings.resolve(name)
                        ),
                    )));
                };
                let mut map = CopyMap::new(false);
                *slot = Some(self.copy_expr(default, &mut map));
            }
        }

        // Bind every slot and apply the parameter constraints.
        let decl_scope = self.prog.funcs.get(func).body;
        let mut env: FxHashMap<Atom, TypeId> = FxHashMap::default();
        let mut vector = Vec::with_capacity(slots.len());
        for (index, slot) in slots.iter().enumerate() {
            let arg = slot.expect("all slots filled");
            let mut ty = self.bind_expr(sig, block, arg)?;
            let (name, constraint) = {
                let v = self.prog.vars.get(params[index]);
                (v.name, v.constraint)
            };
            if let Some(constraint) = constraint {
                let expected = self.eval_type_expr(decl_scope, constraint, Some(&env))?;
                ty = self.apply_constraint(expected, arg, loc)?;
            }
            env.insert(name, ty);
            vector.push(ty);
        }

        // Rewrite the call to the canonical argument order.
        let mut children = smallvec::SmallVec::new();
        children.push(self.prog.exprs.get(call).children[0]);
        children.extend(slots.iter().map(|s| s.expect("all slots filled")));
        self.prog.exprs.get_mut(call).children = children;
        Ok(vector)
    }

    /// Check a value against a parameter constraint. A bare tclass
    /// constraint accepts every concrete class of that template; anything
    /// else must unify.
    fn apply_constraint(
        &mut self,
        expected: TypeId,
        value: ExprId,
        loc: Loc,
    ) -> BindResult<TypeId> {
        let vt = self.expr_ty(value);
        if let TypeKey::Tclass { tclass } = self.prog.types.key(expected) {
            if self.prog.types.tclass_of(vt) == Some(tclass) {
                return Ok(vt);
            }
            return Err(BindFailure::Error(
                BindError::new(ErrorKind::TypeMismatch, loc, "argument does not satisfy parameter constraint")
                    .with_datatypes(self.prog.render_type(expected), self.prog.render_type(vt)),
            ));
        }
        self.unify_with(expected, value, loc)
    }

    fn constraint_accepts(&self, expected: TypeId, actual: TypeId) -> bool {
        if let TypeKey::Tclass { tclass } = self.prog.types.key(expected) {
            return self.prog.types.tclass_of(actual) == Some(tclass);
        }
        unify(&self.prog.types, expected, actual, false, false).is_some()
    }

    // =========================================================================
    // Operator overloads
    // =========================================================================

    /// Probe the overloads registered for an operator in declaration
    /// order: a candidate matches when all of its parameter constraints
    /// accept the argument datatypes. Exactly one match is required.
    pub(crate) fn resolve_overload(
        &mut self,
        op: OverloadOp,
        args: &[ExprId],
        expr: ExprId,
        loc: Loc,
    ) -> BindResult<TypeId> {
        let candidates = self.prog.operators.get(&op).cloned().unwrap_or_default();
        let arg_tys: Vec<TypeId> = args.iter().map(|&a| self.expr_ty(a)).collect();
        let mut matches: Vec<FuncId> = Vec::new();
        'candidates: for func in candidates {
            let params = self.prog.funcs.get(func).params.clone();
            if params.len() != args.len() {
                continue;
            }
            let decl_scope = self.prog.funcs.get(func).body;
            let mut env: FxHashMap<Atom, TypeId> = FxHashMap::default();
            for (&param, &aty) in params.iter().zip(&arg_tys) {
                let (name, constraint) = {
                    let v = self.prog.vars.get(param);
                    (v.name, v.constraint)
                };
                if let Some(constraint) = constraint {
                    let expected = self.eval_type_expr(decl_scope, constraint, Some(&env))?;
                    if !self.constraint_accepts(expected, aty) {
                        continue 'candidates;
                    }
                }
                env.insert(name, aty);
            }
            matches.push(func);
        }
        match matches.as_slice() {
            [] => {
                let rendered: Vec<String> =
                    arg_tys.iter().map(|&t| self.prog.render_type(t)).collect();
                Err(self.error(
                    ErrorKind::TypeMismatch,
                    loc,
                    format!("no operator overload accepts ({})", rendered.join(", ")),
                ))
            }
            [func] => {
                debug!(?func, ?op, "operator overload selected");
                let chosen = self.get_or_create_sig(*func, arg_tys, loc)?;
                self.prog.sigs.get_mut(chosen).instantiated = true;
                self.prog.exprs.get_mut(expr).sig = Some(chosen);
                self.call_result(chosen)
            }
            _ => Err(self.error(
                ErrorKind::AmbiguousOverload,
                loc,
                "more than one operator overload accepts these operands",
            )),
        }
    }

    // =========================================================================
    // Function addresses
    // =========================================================================

    /// `&f(T1,…,Tn)`: select the signature named by the parenthesized call
    /// form. Function pointers cannot drop arguments, so every parameter of
    /// the chosen signature is forced instantiated.
    pub(crate) fn bind_funcaddr(
        &mut self,
        sig: SigId,
        block: BlockId,
        expr: ExprId,
        call_form: ExprId,
    ) -> BindResult<TypeId> {
        let _ = expr;
        let (children, loc) = {
            let e = self.prog.exprs.get(call_form);
            (e.children.clone(), e.loc)
        };
        let callee_ty = self.bind_expr(sig, block, children[0])?;
        let func = match self.prog.types.key(callee_ty) {
            TypeKey::Function { func } => func,
            TypeKey::Tclass { tclass } => self.prog.tclasses.get(tclass).constructor,
            _ => {
                return Err(self.error(
                    ErrorKind::TypeMismatch,
                    loc,
                    "can only take the address of a function",
                ));
            }
        };
        let mut vector = Vec::with_capacity(children.len() - 1);
        for &arg in &children[1..] {
            let ty = self.bind_type_operand(sig, block, arg)?;
            if !self.prog.exprs.get(arg).is_type() {
                return Err(self.error(
                    ErrorKind::TypeMismatch,
                    loc,
                    "function-address arguments must be types",
                ));
            }
            vector.push(ty);
        }
        let chosen = self.get_or_create_sig(func, vector.clone(), loc)?;
        {
            let s = self.prog.sigs.get_mut(chosen);
            s.called_by_funcptr = true;
            s.instantiated = true;
            for p in &mut s.params {
                p.instantiated = true;
            }
        }
        self.prog.exprs.get_mut(call_form).sig = Some(chosen);
        match self.prog.sigs.get(chosen).ret {
            Some(ret) => Ok(self.prog.types.funcptr(ret, vector)),
            None => Err(BindFailure::Blocked(Event::Sig(chosen))),
        }
    }

    // =========================================================================
    // Builtin methods
    // =========================================================================

    /// The builtin method table of arrays and strings.
    pub(crate) fn builtin_method(
        &mut self,
        base_ty: TypeId,
        name: Atom,
        loc: Loc,
    ) -> BindResult<FuncId> {
        let length = self.prog.strings.intern("length");
        if name != length {
            return Err(self.error(
                ErrorKind::UndefinedIdentifier,
                loc,
                format!(
                    "type {} has no method '{}'",
                    self.prog.render_type(base_ty),
                    self.prog.strings.resolve(name)
                ),
            ));
        }
        if let Some(func) = self.builtin_length {
            return Ok(func);
        }
        let ret = self.prog.e_type(TypeId::U64, Loc::synthetic());
        let body = self.prog.blocks.alloc(Block::new(None, BlockOwner::Root));
        let mut f = Function::new(length, FuncKind::Plain, body, Loc::synthetic());
        f.extern_c = true;
        f.ret_constraint = Some(ret);
        let func = self.prog.funcs.alloc(f);
        self.prog.blocks.get_mut(body).owner = BlockOwner::Func(func);
        self.builtin_length = Some(func);
        Ok(func)
    }
}
