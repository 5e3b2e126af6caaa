//! Deep copies of template bodies.
//!
//! Two consumers: the signature engine instantiates a private copy of a
//! function's template body per signature (so rebinding under a new
//! signature never invalidates older bound signatures), and the iterator
//! inliner splices a copy of a bound iterator body into the caller. The
//! fresh-variable remap table is what keeps inlining hygienic: the template
//! is never mutated, so it stays reusable.

use rustc_hash::FxHashMap;
use sable_common::{Atom, BlockId, ExprId, StmtId, VarId};
use sable_tree::{Block, BlockOwner, Expr, ExprFlags, IdentTarget, Stmt, StmtKind};

use crate::state::Binder;

pub(crate) struct CopyMap {
    pub vars: FxHashMap<VarId, VarId>,
    pub blocks: FxHashMap<BlockId, BlockId>,
    /// Keep datatypes, flags, targets, and signatures on the copy. True
    /// when copying an already-bound body for inlining; false when
    /// instantiating an unbound template for a new signature.
    pub keep_annotations: bool,
}

impl CopyMap {
    pub(crate) fn new(keep_annotations: bool) -> Self {
        CopyMap {
            vars: FxHashMap::default(),
            blocks: FxHashMap::default(),
            keep_annotations,
        }
    }
}

impl Binder<'_> {
    pub(crate) fn copy_block(
        &mut self,
        src: BlockId,
        parent: Option<BlockId>,
        owner: BlockOwner,
        map: &mut CopyMap,
    ) -> BlockId {
        let dst = self.prog.blocks.alloc(Block::new(parent, owner));
        map.blocks.insert(src, dst);

        let idents: Vec<(Atom, IdentTarget)> = self
            .prog
            .blocks
            .get(src)
            .idents
            .iter()
            .map(|(&name, &target)| (name, target))
            .collect();
        for (name, target) in idents {
            let target = match target {
                IdentTarget::Var(v) => IdentTarget::Var(self.copy_var(v, map)),
                IdentTarget::Func(f) => IdentTarget::Func(f),
            };
            self.prog.blocks.get_mut(dst).define(name, target);
        }

        let stmts = self.prog.blocks.get(src).stmts.clone();
        for stmt in stmts {
            let copy = self.copy_stmt(stmt, dst, map);
            self.prog.blocks.get_mut(dst).stmts.push(copy);
        }

        if map.keep_annotations {
            let (can_continue, can_return) = {
                let b = self.prog.blocks.get(src);
                (b.can_continue, b.can_return)
            };
            let b = self.prog.blocks.get_mut(dst);
            b.can_continue = can_continue;
            b.can_return = can_return;
        }
        dst
    }

    pub(crate) fn copy_var(&mut self, var: VarId, map: &mut CopyMap) -> VarId {
        if let Some(&copy) = map.vars.get(&var) {
            return copy;
        }
        let mut v = self.prog.vars.get(var).clone();
        if !map.keep_annotations {
            v.ty = None;
            v.instantiated = false;
        }
        let copy = self.prog.vars.alloc(v);
        map.vars.insert(var, copy);
        copy
    }

    pub(crate) fn copy_stmt(&mut self, stmt: StmtId, dst_block: BlockId, map: &mut CopyMap) -> StmtId {
        let src = self.prog.stmts.get(stmt).clone();
        let kind = match src.kind.clone() {
            StmtKind::For { init, update } => StmtKind::For {
                init: self.copy_stmt(init, dst_block, map),
                update: self.copy_stmt(update, dst_block, map),
            },
            StmtKind::Print { args, rewritten } => StmtKind::Print {
                args: args.iter().map(|&a| self.copy_expr(a, map)).collect(),
                rewritten,
            },
            StmtKind::Relation {
                kind,
                parent,
                child,
                cascade,
            } => StmtKind::Relation {
                kind,
                cascade,
                parent: self.copy_expr(parent, map),
                child: self.copy_expr(child, map),
            },
            other => other,
        };
        let expr = src.expr.map(|e| self.copy_expr(e, map));
        let mut copy = Stmt::new(kind, expr, None, src.loc);
        if map.keep_annotations {
            copy.flags = src.flags;
        }
        let id = self.prog.stmts.alloc(copy);
        if let Some(sub) = src.block {
            let sub_copy = self.copy_block(sub, Some(dst_block), BlockOwner::Stmt(id), map);
            self.prog.stmts.get_mut(id).block = Some(sub_copy);
        }
        id
    }

    pub(crate) fn copy_expr(&mut self, expr: ExprId, map: &mut CopyMap) -> ExprId {
        let src = self.prog.exprs.get(expr).clone();
        let children = src
            .children
            .iter()
            .map(|&c| self.copy_expr(c, map))
            .collect();
        let mut copy = Expr::new(src.kind.clone(), children, src.loc);
        if map.keep_annotations {
            copy.ty = src.ty;
            copy.flags = src.flags;
            copy.sig = src.sig;
            // Variables outside the map belong to the enclosing scope and
            // are referenced as-is.
            copy.target = src.target.map(|t| match t {
                IdentTarget::Var(v) => IdentTarget::Var(*map.vars.get(&v).unwrap_or(&v)),
                func => func,
            });
        } else {
            copy.flags = ExprFlags::NONE;
        }
        self.prog.exprs.alloc(copy)
    }
}
