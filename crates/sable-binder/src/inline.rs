//! Iterator inlining.
//!
//! Iterators are not coroutines at run time: after the main binding pass,
//! every `for v in iterator_call { body }` is rewritten into straight-line
//! statements inside the caller's block. The iterator's bound body is
//! copied with fresh variables, its parameters become local assignments,
//! the unique reachable yield becomes `v = <yielded>` with the original
//! loop body spliced immediately after it, and compile-time typeswitches in
//! the copy collapse to their selected case. The iterator template is never
//! mutated, so it stays reusable for other call sites.

use sable_common::{BindError, BlockId, ErrorKind, ExprId, SigId, StmtId, VarId};
use sable_tree::{
    Block, BlockOwner, Expr, ExprKind, IdentTarget, Stmt, StmtFlags, StmtKind, VarKind,
};
use smallvec::smallvec;
use tracing::debug;

use crate::copy::CopyMap;
use crate::state::Binder;

/// Bounds nested inlining; mutually recursive iterators never converge.
const MAX_INLINE_DEPTH: usize = 64;

impl Binder<'_> {
    pub(crate) fn inline_iterators(&mut self) -> Result<(), BindError> {
        for index in 0..self.prog.sigs.len() {
            let sig = SigId(index as u32);
            let (instantiated, partial, body, func) = {
                let s = self.prog.sigs.get(sig);
                (s.instantiated, s.partial, s.body, s.func)
            };
            if !instantiated || partial {
                continue;
            }
            // Iterator bodies inline at their use sites, not in place.
            if self.prog.funcs.get(func).kind == sable_tree::FuncKind::Iterator {
                continue;
            }
            if let Some(body) = body {
                self.inline_block(body, 0)?;
            }
        }
        Ok(())
    }

    fn inline_block(&mut self, block: BlockId, depth: usize) -> Result<(), BindError> {
        if depth > MAX_INLINE_DEPTH {
            let loc = self
                .prog
                .blocks
                .get(block)
                .stmts
                .first()
                .map(|&s| self.prog.stmts.get(s).loc)
                .unwrap_or_default();
            return Err(BindError::new(
                ErrorKind::Reachability,
                loc,
                "iterator inlining did not converge (recursive iterator?)",
            ));
        }
        let stmts = self.prog.blocks.get(block).stmts.clone();
        for stmt in stmts {
            let (kind, sub, reachable) = {
                let s = self.prog.stmts.get(stmt);
                (
                    s.kind.clone(),
                    s.block,
                    s.flags.has(StmtFlags::INSTANTIATED),
                )
            };
            if let StmtKind::Foreach { loop_var } = kind {
                if reachable {
                    let holder = self.inline_one(stmt, block, loop_var)?;
                    self.inline_block(holder, depth + 1)?;
                    continue;
                }
            }
            if let Some(sub) = sub {
                self.inline_block(sub, depth)?;
            }
        }
        Ok(())
    }

    /// Rewrite one foreach statement into a holder block: parameter
    /// assignments, then the copied iterator body with the yield turned
    /// into a loop-variable assignment followed by the original loop body.
    fn inline_one(
        &mut self,
        stmt: StmtId,
        enclosing: BlockId,
        loop_var: sable_common::Atom,
    ) -> Result<BlockId, BindError> {
        let (iter_call, for_body, loc) = {
            let s = self.prog.stmts.get(stmt);
            (
                s.expr.expect("foreach has iterator"),
                s.block.expect("foreach has body"),
                s.loc,
            )
        };
        let iter_sig = self
            .iterator_sig_of(iter_call)
            .expect("foreach iterator resolved during binding");
        debug!(?stmt, ?iter_sig, "inline iterator");

        let holder = self
            .prog
            .blocks
            .alloc(Block::new(Some(enclosing), BlockOwner::Stmt(stmt)));

        // Parameter assignments (including self) come first; the copied
        // body reads the fresh locals instead of the iterator parameters.
        let mut map = CopyMap::new(true);
        let param_vars = self.prog.sigs.get(iter_sig).param_vars.clone();
        let args: Vec<ExprId> = self.prog.exprs.get(iter_call).children[1..].to_vec();
        for (&param, &arg) in param_vars.iter().zip(&args) {
            let local = self.alloc_inline_local(param, holder, &mut map);
            let assign = self.make_assign(local, arg, loc);
            self.prog.blocks.get_mut(holder).stmts.push(assign);
        }

        let block_stmt = self
            .prog
            .stmts
            .alloc(Stmt::new(StmtKind::Block, None, None, loc));
        self.prog
            .stmts
            .get_mut(block_stmt)
            .flags
            .set(StmtFlags::INSTANTIATED);
        let template = self
            .prog
            .sigs
            .get(iter_sig)
            .body
            .expect("iterator signature has a bound body");
        let body_copy = self.copy_block(
            template,
            Some(holder),
            BlockOwner::Stmt(block_stmt),
            &mut map,
        );
        self.prog.stmts.get_mut(block_stmt).block = Some(body_copy);
        self.prog.blocks.get_mut(holder).stmts.push(block_stmt);

        // Only the reachable yield is inlined; type-dispatched iterators
        // collapse to the selected branch below.
        self.flatten_typeswitches(body_copy);
        let mut yields = Vec::new();
        self.collect_yields(body_copy, &mut yields);
        let (container, at, yield_stmt) = match yields.as_slice() {
            [one] => *one,
            [] => {
                return Err(BindError::new(
                    ErrorKind::Reachability,
                    loc,
                    "iterator body never executes a yield",
                ));
            }
            _ => {
                return Err(BindError::new(
                    ErrorKind::Reachability,
                    loc,
                    "iterator has more than one reachable yield",
                ));
            }
        };

        // yield e  ==>  v = e; <original loop body>
        let Some(IdentTarget::Var(loop_vid)) = self.prog.blocks.get(for_body).lookup(loop_var)
        else {
            unreachable!("loop variable defined during binding");
        };
        let yielded = self
            .prog
            .stmts
            .get(yield_stmt)
            .expr
            .expect("yield has a value");
        let assign = self.make_assign_expr(loop_vid, yielded, loc);
        {
            let s = self.prog.stmts.get_mut(yield_stmt);
            s.kind = StmtKind::Assign;
            s.expr = Some(assign);
        }
        let splice = self
            .prog
            .stmts
            .alloc(Stmt::new(StmtKind::Block, None, Some(for_body), loc));
        self.prog
            .stmts
            .get_mut(splice)
            .flags
            .set(StmtFlags::INSTANTIATED);
        {
            let b = self.prog.blocks.get_mut(for_body);
            b.parent = Some(container);
            b.owner = BlockOwner::Stmt(splice);
        }
        self.prog
            .blocks
            .get_mut(container)
            .stmts
            .insert(at + 1, splice);

        // The foreach statement becomes the holder block.
        {
            let s = self.prog.stmts.get_mut(stmt);
            s.kind = StmtKind::Block;
            s.expr = None;
            s.block = Some(holder);
        }
        Ok(holder)
    }

    /// A fresh local standing in for an iterator parameter, registered in
    /// the remap table so the copied body reads it.
    fn alloc_inline_local(&mut self, param: VarId, holder: BlockId, map: &mut CopyMap) -> VarId {
        let mut var = self.prog.vars.get(param).clone();
        var.kind = VarKind::Local;
        var.instantiated = true;
        let name = var.name;
        let local = self.prog.vars.alloc(var);
        map.vars.insert(param, local);
        self.prog
            .blocks
            .get_mut(holder)
            .define(name, IdentTarget::Var(local));
        local
    }

    /// `var = value` with annotations in place; nothing here needs
    /// re-binding.
    fn make_assign_expr(&mut self, var: VarId, value: ExprId, loc: sable_common::Loc) -> ExprId {
        let (name, ty) = {
            let v = self.prog.vars.get(var);
            (v.name, v.ty)
        };
        let target = {
            let mut e = Expr::new(ExprKind::Ident { name }, smallvec![], loc);
            e.ty = ty;
            e.target = Some(IdentTarget::Var(var));
            self.prog.exprs.alloc(e)
        };
        let mut e = Expr::new(ExprKind::Assign { op: None }, smallvec![target, value], loc);
        e.ty = ty;
        self.prog.exprs.alloc(e)
    }

    fn make_assign(&mut self, var: VarId, value: ExprId, loc: sable_common::Loc) -> StmtId {
        let assign = self.make_assign_expr(var, value, loc);
        let stmt = self
            .prog
            .stmts
            .alloc(Stmt::new(StmtKind::Assign, Some(assign), None, loc));
        let s = self.prog.stmts.get_mut(stmt);
        s.flags.set(StmtFlags::INSTANTIATED);
        s.flags.set(StmtFlags::FIRST_ASSIGNMENT);
        stmt
    }

    /// Collapse compile-time typeswitches in a copied body to their
    /// selected case.
    fn flatten_typeswitches(&mut self, block: BlockId) {
        let stmts = self.prog.blocks.get(block).stmts.clone();
        for stmt in stmts {
            let (kind, sub) = {
                let s = self.prog.stmts.get(stmt);
                (s.kind.clone(), s.block)
            };
            if matches!(kind, StmtKind::Typeswitch) {
                let sub = sub.expect("typeswitch block");
                let arms = self.prog.blocks.get(sub).stmts.clone();
                let selected = arms.iter().copied().find(|&arm| {
                    self.prog.stmts.get(arm).flags.has(StmtFlags::INSTANTIATED)
                });
                let selected_body = selected.and_then(|arm| self.prog.stmts.get(arm).block);
                let s = self.prog.stmts.get_mut(stmt);
                s.kind = StmtKind::Block;
                s.expr = None;
                s.block = selected_body;
                if let Some(body) = selected_body {
                    self.flatten_typeswitches(body);
                }
            } else if let Some(sub) = sub {
                self.flatten_typeswitches(sub);
            }
        }
    }

    /// Reachable yields, with their containing block and index so the loop
    /// body can splice in right after.
    fn collect_yields(&self, block: BlockId, out: &mut Vec<(BlockId, usize, StmtId)>) {
        let stmts = &self.prog.blocks.get(block).stmts;
        for (index, &stmt) in stmts.iter().enumerate() {
            let s = self.prog.stmts.get(stmt);
            if !s.flags.has(StmtFlags::INSTANTIATED) {
                continue;
            }
            if matches!(s.kind, StmtKind::Yield) {
                out.push((block, index, stmt));
            }
            if let Some(sub) = s.block {
                self.collect_yields(sub, out);
            }
        }
    }
}
