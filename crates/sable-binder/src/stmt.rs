//! Statement binding.
//!
//! One task binds one statement: its expressions get datatypes, conditions
//! are checked for non-secret bool, switches unify their cases, foreach
//! loops resolve their iterator, and return/yield refine the enclosing
//! signature's return type.

use sable_common::{BlockId, ErrorKind, Loc, SigId, StmtId};
use sable_tree::{ExprKind, FuncKind, IdentTarget, StmtFlags, StmtKind, VarKind, Variable};
use sable_types::{TypeId, TypeKey};
use tracing::trace;

use crate::state::{BindFailure, BindResult, Binder, Event};

impl Binder<'_> {
    pub(crate) fn bind_stmt(&mut self, sig: SigId, stmt: StmtId, block: BlockId) -> BindResult<()> {
        let (kind, expr, sub, loc) = {
            let s = self.prog.stmts.get(stmt);
            (s.kind.clone(), s.expr, s.block, s.loc)
        };
        trace!(?stmt, ?kind, "bind statement");
        match kind {
            StmtKind::Assign => {
                let expr = expr.expect("assign statement has expression");
                self.bind_assign_expr(sig, block, Some(stmt), expr)?;
            }
            StmtKind::Call => {
                let expr = expr.expect("call statement has expression");
                self.bind_expr(sig, block, expr)?;
            }
            StmtKind::If | StmtKind::ElseIf | StmtKind::While | StmtKind::DoWhile => {
                let cond = expr.expect("condition");
                self.check_condition(sig, block, cond)?;
            }
            StmtKind::Else | StmtKind::Block | StmtKind::Generate => {}
            StmtKind::For { init, update } => {
                let body = sub.expect("for loop has a body");
                self.bind_clause(sig, body, init)?;
                let cond = expr.expect("for loop has a test");
                self.check_condition(sig, body, cond)?;
                self.bind_clause(sig, body, update)?;
            }
            StmtKind::Foreach { loop_var } => self.bind_foreach(sig, stmt, block, loop_var)?,
            StmtKind::Switch => self.bind_switch(sig, stmt, block)?,
            StmtKind::Typeswitch => self.bind_typeswitch(sig, stmt, block)?,
            StmtKind::Case | StmtKind::Default => {}
            StmtKind::Return => {
                let func_kind = self.prog.funcs.get(self.prog.sigs.get(sig).func).kind;
                let (ty, auto) = match expr {
                    Some(e) => {
                        if func_kind == FuncKind::Iterator {
                            return Err(self.error(
                                ErrorKind::Reachability,
                                loc,
                                "an iterator cannot return a value",
                            ));
                        }
                        let ty = self.bind_expr(sig, block, e)?;
                        (ty, self.prog.exprs.get(e).is_autocast())
                    }
                    None => (TypeId::NONE, false),
                };
                if func_kind != FuncKind::Iterator {
                    self.refine_sig_ret(sig, ty, auto, loc)?;
                }
            }
            StmtKind::Yield => {
                let func_kind = self.prog.funcs.get(self.prog.sigs.get(sig).func).kind;
                if func_kind != FuncKind::Iterator {
                    return Err(self.error(
                        ErrorKind::Reachability,
                        loc,
                        "yield outside an iterator",
                    ));
                }
                let e = expr.expect("yield has a value");
                let ty = self.bind_expr(sig, block, e)?;
                let auto = self.prog.exprs.get(e).is_autocast();
                self.refine_sig_ret(sig, ty, auto, loc)?;
            }
            StmtKind::Throw => {
                let e = expr.expect("throw has a value");
                self.bind_expr(sig, block, e)?;
            }
            StmtKind::Print { .. } => self.bind_print(sig, stmt, block)?,
            StmtKind::Ref | StmtKind::Unref => {
                let e = expr.expect("ref/unref has an operand");
                let ty = self.bind_expr(sig, block, e)?;
                let ref_counted = self
                    .prog
                    .types
                    .tclass_of(ty)
                    .map(|t| self.prog.tclasses.get(t).ref_counted)
                    .unwrap_or(false);
                if !self.prog.types.is_class(ty) || !ref_counted {
                    return Err(self.error(
                        ErrorKind::TypeMismatch,
                        loc,
                        "ref/unref needs an instance of a ref-counted class",
                    ));
                }
            }
            StmtKind::Relation { parent, child, .. } => {
                self.check_relation_target(block, parent)?;
                self.check_relation_target(block, child)?;
            }
            StmtKind::Import { path } => match self.prog.lookup(self.prog.root_block, path) {
                Some(target @ IdentTarget::Func(f))
                    if matches!(
                        self.prog.funcs.get(f).kind,
                        FuncKind::Module | FuncKind::Package
                    ) =>
                {
                    self.define_name(block, path, target);
                }
                Some(_) => {
                    return Err(self.error(
                        ErrorKind::TypeMismatch,
                        loc,
                        format!("'{}' is not a module", self.prog.strings.resolve(path)),
                    ));
                }
                None => return Err(BindFailure::Blocked(Event::Ident(path))),
            },
        }
        Ok(())
    }

    /// For-loop init/update clauses are assignment statements owned by the
    /// loop; they bind in the loop body's scope.
    fn bind_clause(&mut self, sig: SigId, block: BlockId, clause: StmtId) -> BindResult<()> {
        let expr = self
            .prog
            .stmts
            .get(clause)
            .expr
            .expect("loop clause has an expression");
        self.bind_assign_expr(sig, block, Some(clause), expr)?;
        Ok(())
    }

    /// Conditions must be non-secret bool: branching on a secret value
    /// leaks it through timing.
    fn check_condition(
        &mut self,
        sig: SigId,
        block: BlockId,
        cond: sable_common::ExprId,
    ) -> BindResult<()> {
        let ty = self.bind_expr(sig, block, cond)?;
        let loc = self.prog.exprs.get(cond).loc;
        if !matches!(self.prog.types.key(ty), TypeKey::Bool { .. }) {
            return Err(BindFailure::Error(
                sable_common::BindError::new(
                    ErrorKind::TypeMismatch,
                    loc,
                    "condition must be bool",
                )
                .with_datatypes("bool", self.prog.render_type(ty)),
            ));
        }
        if self.prog.types.is_secret(ty) {
            return Err(self.error(
                ErrorKind::SecretViolation,
                loc,
                "cannot branch on a secret value",
            ));
        }
        Ok(())
    }

    fn check_relation_target(
        &mut self,
        block: BlockId,
        expr: sable_common::ExprId,
    ) -> BindResult<()> {
        let (kind, loc) = {
            let e = self.prog.exprs.get(expr);
            (e.kind.clone(), e.loc)
        };
        let ExprKind::Ident { name } = kind else {
            return Err(self.error(
                ErrorKind::TypeMismatch,
                loc,
                "relation endpoints must name tclasses",
            ));
        };
        match self.prog.lookup(block, name) {
            Some(IdentTarget::Func(f)) if self.prog.funcs.get(f).tclass.is_some() => Ok(()),
            Some(_) => Err(self.error(
                ErrorKind::TypeMismatch,
                loc,
                format!("'{}' is not a tclass", self.prog.strings.resolve(name)),
            )),
            None => Err(BindFailure::Blocked(Event::Ident(name))),
        }
    }

    // =========================================================================
    // Loops over iterators
    // =========================================================================

    /// `for v in call { body }`. A callee that is not an iterator is
    /// rewritten as `for v in callee.values()`, synthesizing a default
    /// `values()` when the class has none. The loop variable takes the
    /// iterator's yield type.
    fn bind_foreach(
        &mut self,
        sig: SigId,
        stmt: StmtId,
        block: BlockId,
        loop_var: sable_common::Atom,
    ) -> BindResult<()> {
        let iter = self.prog.stmts.get(stmt).expr.expect("foreach has iterator");
        let body = self.prog.stmts.get(stmt).block.expect("foreach has body");
        let loc = self.prog.stmts.get(stmt).loc;

        let iter_ty = self.bind_expr(sig, block, iter)?;
        let iter_sig = match self.iterator_sig_of(iter) {
            Some(s) => s,
            None => {
                // Rewrite as a `values()` method call on the class value.
                let Some(tclass) = self.prog.types.tclass_of(iter_ty) else {
                    return Err(self.error(
                        ErrorKind::TypeMismatch,
                        loc,
                        format!("cannot iterate over {}", self.prog.render_type(iter_ty)),
                    ));
                };
                if self.prog.types.is_null_class(iter_ty) {
                    return match self.refine_event_for(iter) {
                        Some(event) => Err(BindFailure::Blocked(event)),
                        None => Err(self.error(
                            ErrorKind::TypeMismatch,
                            loc,
                            "cannot iterate an unresolved null value",
                        )),
                    };
                }
                if self.prog.tclasses.get(tclass).values_iter.is_none() {
                    self.synthesize_values_iter(tclass);
                }
                let call = {
                    let dot = self.prog.e_dot(iter, "values", loc);
                    self.prog.e_call(dot, Vec::new(), loc)
                };
                self.prog.stmts.get_mut(stmt).expr = Some(call);
                self.bind_expr(sig, block, call)?;
                self.iterator_sig_of(call)
                    .expect("values() resolves to an iterator")
            }
        };
        let yield_ty = match self.prog.sigs.get(iter_sig).ret {
            Some(ty) => ty,
            None => return Err(BindFailure::Blocked(Event::Sig(iter_sig))),
        };

        // Define (or refine) the loop variable in the body scope.
        match self.prog.blocks.get(body).lookup(loop_var) {
            Some(IdentTarget::Var(v)) => {
                let old = self.prog.vars.get(v).ty;
                if old != Some(yield_ty) {
                    self.prog.vars.get_mut(v).ty = Some(yield_ty);
                    self.fire(Event::Var(v));
                }
            }
            _ => {
                let mut var = Variable::new(loop_var, VarKind::Local, loc);
                var.ty = Some(yield_ty);
                var.instantiated = true;
                let v = self.prog.vars.alloc(var);
                self.define_name(body, loop_var, IdentTarget::Var(v));
            }
        }
        Ok(())
    }

    /// The signature of an iterator call expression, if that is what the
    /// expression is.
    pub(crate) fn iterator_sig_of(&self, expr: sable_common::ExprId) -> Option<SigId> {
        let e = self.prog.exprs.get(expr);
        if !matches!(e.kind, ExprKind::Call) {
            return None;
        }
        let s = e.sig?;
        let func = self.prog.sigs.get(s).func;
        (self.prog.funcs.get(func).kind == FuncKind::Iterator).then_some(s)
    }

    /// Default `values()`: yields the object itself once. Relations may
    /// replace this with a real child-walking iterator in their generated
    /// code; the binder only needs the shape.
    fn synthesize_values_iter(&mut self, tclass: sable_common::TclassId) {
        let func =
            self.prog
                .declare_method(tclass, "values", FuncKind::Iterator, Loc::synthetic());
        let body = self.prog.funcs.get(func).body;
        let self_ident = self.prog.e_ident("self", Loc::synthetic());
        self.prog.s_yield(body, self_ident, Loc::synthetic());
    }

    // =========================================================================
    // Switches
    // =========================================================================

    /// Runtime switch: the scrutinee unifies with every case expression.
    /// A missing default is synthesized to throw at run time.
    fn bind_switch(&mut self, sig: SigId, stmt: StmtId, block: BlockId) -> BindResult<()> {
        let scrutinee = self.prog.stmts.get(stmt).expr.expect("switch scrutinee");
        let sub = self.prog.stmts.get(stmt).block.expect("switch block");
        let loc = self.prog.stmts.get(stmt).loc;
        self.bind_expr(sig, block, scrutinee)?;

        let arms = self.prog.blocks.get(sub).stmts.clone();
        let mut has_default = false;
        for arm in arms {
            let (kind, case_expr) = {
                let s = self.prog.stmts.get(arm);
                (s.kind.clone(), s.expr)
            };
            match kind {
                StmtKind::Case => {
                    let case_expr = case_expr.expect("case has an expression");
                    self.bind_expr(sig, block, case_expr)?;
                    self.unify_exprs(scrutinee, case_expr, loc)?;
                }
                StmtKind::Default => has_default = true,
                _ => {}
            }
        }
        if !has_default {
            // Unmatched values throw at run time.
            let (_, body) = self.prog.s_default(sub, loc);
            let msg = self.prog.e_str("unmatched switch value", loc);
            let throw = self.prog.s_throw(body, msg, loc);
            self.bind_stmt(sig, throw, body)?;
        }
        Ok(())
    }

    /// Compile-time type switch: exactly the first case whose type pattern
    /// matches is selected and bound; the rest are dropped.
    fn bind_typeswitch(&mut self, sig: SigId, stmt: StmtId, block: BlockId) -> BindResult<()> {
        let scrutinee = self.prog.stmts.get(stmt).expr.expect("typeswitch scrutinee");
        let sub = self.prog.stmts.get(stmt).block.expect("typeswitch block");
        let loc = self.prog.stmts.get(stmt).loc;
        let ty = self.bind_type_operand(sig, block, scrutinee)?;

        let arms = self.prog.blocks.get(sub).stmts.clone();
        let mut selected = None;
        for arm in arms {
            let (kind, pattern) = {
                let s = self.prog.stmts.get(arm);
                (s.kind.clone(), s.expr)
            };
            let matches = match kind {
                StmtKind::Case => {
                    let pattern = pattern.expect("case has a type pattern");
                    let expected = self.eval_type_expr(block, pattern, None)?;
                    selected.is_none() && self.type_pattern_matches(expected, ty)
                }
                StmtKind::Default => selected.is_none(),
                _ => continue,
            };
            if matches {
                selected = Some(arm);
            } else if selected != Some(arm) {
                self.prog
                    .stmts
                    .get_mut(arm)
                    .flags
                    .clear(StmtFlags::INSTANTIATED);
            }
        }
        let Some(selected) = selected else {
            return Err(BindFailure::Error(
                sable_common::BindError::new(
                    ErrorKind::TypeMismatch,
                    loc,
                    "no typeswitch case matches",
                )
                .with_datatypes(self.prog.render_type(ty), "<no case>"),
            ));
        };
        let already = self
            .prog
            .stmts
            .get(selected)
            .flags
            .has(StmtFlags::INSTANTIATED);
        self.prog
            .stmts
            .get_mut(selected)
            .flags
            .set(StmtFlags::INSTANTIATED);
        if !already {
            if let Some(arm_body) = self.prog.stmts.get(selected).block {
                self.enqueue_block(sig, arm_body);
            }
        }
        Ok(())
    }

    fn type_pattern_matches(&self, pattern: TypeId, ty: TypeId) -> bool {
        if pattern == ty {
            return true;
        }
        if let Some(tclass) = self.prog.types.tclass_of(pattern) {
            return self.prog.types.tclass_of(ty) == Some(tclass);
        }
        sable_types::unify(&self.prog.types, pattern, ty, false, false).is_some()
    }
}
