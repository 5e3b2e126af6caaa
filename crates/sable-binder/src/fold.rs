//! Constant propagation.
//!
//! Runs per block after binding and inlining. Literal-only sub-expressions
//! are replaced by their evaluated value, const-variable reads are replaced
//! by the recorded literal, modular expressions evaluate under their
//! constant modulus, and everything else only propagates into its children.
//! Folding errors - overflow with trapping enabled, division or modulus by
//! zero - are compile-time errors. Random-int expressions are never
//! constant.

use num_bigint::BigInt;
use num_traits::{One, ToPrimitive, Zero};
use rustc_hash::FxHashMap;
use sable_common::{BindError, BlockId, ErrorKind, ExprId, Loc, SigId, VarId};
use sable_tree::{BinOp, CmpOp, ExprFlags, ExprKind, IdentTarget, LogOp, StmtFlags, StmtKind, UnOp};
use sable_types::TypeKey;

use crate::expr::literal_fits;
use crate::state::Binder;

impl Binder<'_> {
    pub(crate) fn propagate_constants(&mut self) -> Result<(), BindError> {
        for index in 0..self.prog.sigs.len() {
            let sig = SigId(index as u32);
            let (instantiated, partial, body) = {
                let s = self.prog.sigs.get(sig);
                (s.instantiated, s.partial, s.body)
            };
            if !instantiated || partial {
                continue;
            }
            if let Some(body) = body {
                let mut consts: FxHashMap<VarId, ExprKind> = FxHashMap::default();
                self.fold_block(body, &mut consts)?;
            }
        }
        Ok(())
    }

    fn fold_block(
        &mut self,
        block: BlockId,
        consts: &mut FxHashMap<VarId, ExprKind>,
    ) -> Result<(), BindError> {
        let stmts = self.prog.blocks.get(block).stmts.clone();
        for stmt in stmts {
            // Unreachable statements (dropped typeswitch arms) were never
            // bound; there is nothing to fold in them.
            if !self.prog.stmts.get(stmt).flags.has(StmtFlags::INSTANTIATED) {
                continue;
            }
            let (kind, expr, sub) = {
                let s = self.prog.stmts.get(stmt);
                (s.kind.clone(), s.expr, s.block)
            };
            match kind {
                StmtKind::For { init, update } => {
                    for clause in [init, update] {
                        if let Some(e) = self.prog.stmts.get(clause).expr {
                            self.fold_expr(e, consts)?;
                        }
                    }
                    if let Some(e) = expr {
                        self.fold_expr(e, consts)?;
                    }
                }
                StmtKind::Print { ref args, .. } => {
                    for &arg in args {
                        self.fold_expr(arg, consts)?;
                    }
                }
                StmtKind::Relation { .. } => {}
                _ => {
                    if let Some(e) = expr {
                        self.fold_expr(e, consts)?;
                    }
                }
            }
            // Record const-variable values so later reads fold.
            if matches!(kind, StmtKind::Assign) {
                if let Some(e) = expr {
                    self.record_const(e, consts);
                }
            }
            if let Some(sub) = sub {
                self.fold_block(sub, consts)?;
            }
        }
        Ok(())
    }

    fn record_const(&self, assign: ExprId, consts: &mut FxHashMap<VarId, ExprKind>) {
        let e = self.prog.exprs.get(assign);
        if !matches!(e.kind, ExprKind::Assign { op: None }) {
            return;
        }
        let target = self.prog.exprs.get(e.children[0]);
        let Some(IdentTarget::Var(var)) = target.target else {
            return;
        };
        if !self.prog.vars.get(var).is_const {
            return;
        }
        let value = self.prog.exprs.get(e.children[1]);
        if is_literal(&value.kind) {
            consts.insert(var, value.kind.clone());
        }
    }

    /// Fold one expression bottom-up. Returns true when the node is now a
    /// literal.
    fn fold_expr(
        &mut self,
        expr: ExprId,
        consts: &FxHashMap<VarId, ExprKind>,
    ) -> Result<bool, BindError> {
        let (kind, children, loc) = {
            let e = self.prog.exprs.get(expr);
            (e.kind.clone(), e.children.clone(), e.loc)
        };
        match kind {
            ExprKind::IntLit { .. }
            | ExprKind::FloatLit { .. }
            | ExprKind::BoolLit { .. }
            | ExprKind::StrLit { .. } => Ok(true),
            ExprKind::RandUint { .. } => Ok(false),
            ExprKind::TypeLit { .. }
            | ExprKind::Typeof
            | ExprKind::Arrayof
            | ExprKind::NullOf
            | ExprKind::Funcaddr => Ok(false),
            ExprKind::Ident { .. } => {
                let target = self.prog.exprs.get(expr).target;
                if let Some(IdentTarget::Var(var)) = target {
                    if let Some(lit) = consts.get(&var) {
                        let e = self.prog.exprs.get_mut(expr);
                        e.kind = lit.clone();
                        e.flags.set(ExprFlags::CONST);
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            ExprKind::Widthof => {
                let ty = self.prog.exprs.get(children[0]).ty.expect("bound operand");
                let width = self.prog.types.width(ty).expect("checked during binding");
                let e = self.prog.exprs.get_mut(expr);
                e.kind = ExprKind::IntLit {
                    value: BigInt::from(width),
                    width: Some(32),
                    signed: false,
                };
                e.children.clear();
                Ok(true)
            }
            ExprKind::Assign { .. } => {
                // Only the value side folds; the target stays a location.
                self.fold_expr(children[1], consts)?;
                Ok(false)
            }
            ExprKind::Binary { op, trunc } => {
                let lk = self.fold_expr(children[0], consts)?;
                let rk = self.fold_expr(children[1], consts)?;
                if lk && rk {
                    self.fold_binary(expr, op, trunc, &children, loc)
                } else {
                    Ok(false)
                }
            }
            ExprKind::Unary { op, trunc } => {
                if self.fold_expr(children[0], consts)? {
                    self.fold_unary(expr, op, trunc, children[0], loc)
                } else {
                    Ok(false)
                }
            }
            ExprKind::Compare { op } => {
                let lk = self.fold_expr(children[0], consts)?;
                let rk = self.fold_expr(children[1], consts)?;
                if lk && rk {
                    self.fold_compare(expr, op, &children)
                } else {
                    Ok(false)
                }
            }
            ExprKind::Logical { op } => {
                self.fold_expr(children[0], consts)?;
                self.fold_expr(children[1], consts)?;
                let (Some(a), Some(b)) = (
                    self.bool_value(children[0]),
                    self.bool_value(children[1]),
                ) else {
                    return Ok(false);
                };
                let value = match op {
                    LogOp::And => a && b,
                    LogOp::Or => a || b,
                    LogOp::Xor => a != b,
                };
                let e = self.prog.exprs.get_mut(expr);
                e.kind = ExprKind::BoolLit { value };
                e.children.clear();
                Ok(true)
            }
            ExprKind::Cast { trunc } => {
                if !self.fold_expr(children[1], consts)? {
                    return Ok(false);
                }
                self.fold_cast(expr, trunc, children[1], loc)
            }
            ExprKind::Modular => self.fold_modular(expr, &children, consts, loc),
            _ => {
                for child in children {
                    self.fold_expr(child, consts)?;
                }
                Ok(false)
            }
        }
    }

    fn fold_binary(
        &mut self,
        expr: ExprId,
        op: BinOp,
        trunc: bool,
        children: &[ExprId],
        loc: Loc,
    ) -> Result<bool, BindError> {
        // String concatenation folds; the remaining string forms do not.
        if let (
            ExprKind::StrLit { value: a },
            ExprKind::StrLit { value: b },
        ) = (
            &self.prog.exprs.get(children[0]).kind,
            &self.prog.exprs.get(children[1]).kind,
        ) {
            if op == BinOp::Add {
                let joined = format!("{a}{b}");
                let e = self.prog.exprs.get_mut(expr);
                e.kind = ExprKind::StrLit { value: joined };
                e.children.clear();
                return Ok(true);
            }
            return Ok(false);
        }
        if let (Some(a), Some(b)) = (
            self.float_value(children[0]),
            self.float_value(children[1]),
        ) {
            let value = match op {
                BinOp::Add => a + b,
                BinOp::Sub => a - b,
                BinOp::Mul => a * b,
                BinOp::Div => a / b,
                _ => return Ok(false),
            };
            let width = self
                .prog
                .types
                .width(self.expr_ty(expr))
                .unwrap_or(64);
            let e = self.prog.exprs.get_mut(expr);
            e.kind = ExprKind::FloatLit { value, width };
            e.children.clear();
            return Ok(true);
        }

        let (Some(a), Some(b)) = (self.int_value(children[0]), self.int_value(children[1]))
        else {
            return Ok(false);
        };
        let ty = self.expr_ty(expr);
        let (width, signed) = int_shape(&self.prog.types.key(ty));
        let value = match op {
            BinOp::Add => a + b,
            BinOp::Sub => a - b,
            BinOp::Mul => a * b,
            BinOp::Div => {
                if b.is_zero() {
                    return Err(BindError::new(
                        ErrorKind::OverflowWouldOccur,
                        loc,
                        "division by zero",
                    ));
                }
                a / b
            }
            BinOp::Mod => {
                if b.is_zero() {
                    return Err(BindError::new(
                        ErrorKind::OverflowWouldOccur,
                        loc,
                        "modulus by zero",
                    ));
                }
                a % b
            }
            BinOp::BitAnd => a & b,
            BinOp::BitOr => a | b,
            BinOp::BitXor => a ^ b,
            BinOp::Shl | BinOp::Shr | BinOp::Rotl | BinOp::Rotr => {
                let Some(distance) = b.to_u32() else {
                    return Err(BindError::new(
                        ErrorKind::OverflowWouldOccur,
                        loc,
                        "shift distance out of range",
                    ));
                };
                if distance >= width {
                    return Err(BindError::new(
                        ErrorKind::OverflowWouldOccur,
                        loc,
                        format!("shift distance {distance} exceeds width {width}"),
                    ));
                }
                match op {
                    BinOp::Shl => a << distance,
                    BinOp::Shr => a >> distance,
                    _ => {
                        // Rotations work on the unsigned bit pattern.
                        let mask = (BigInt::one() << width) - 1u8;
                        let bits = wrap_to_width(&a, width, false);
                        let rotated = match op {
                            BinOp::Rotl => {
                                ((&bits << distance) | (&bits >> (width - distance))) & &mask
                            }
                            _ => ((&bits >> distance) | (&bits << (width - distance))) & &mask,
                        };
                        rotated
                    }
                }
            }
        };
        let value = if literal_fits(&value, width, signed) {
            value
        } else if trunc || self.prog.unsafe_mode || !op.can_overflow() && !matches!(op, BinOp::Shl)
        {
            wrap_to_width(&value, width, signed)
        } else {
            return Err(BindError::new(
                ErrorKind::OverflowWouldOccur,
                loc,
                format!("constant expression overflows {}", self.prog.render_type(ty)),
            ));
        };
        let e = self.prog.exprs.get_mut(expr);
        e.kind = ExprKind::IntLit {
            value,
            width: Some(width),
            signed,
        };
        e.children.clear();
        Ok(true)
    }

    fn fold_unary(
        &mut self,
        expr: ExprId,
        op: UnOp,
        trunc: bool,
        operand: ExprId,
        loc: Loc,
    ) -> Result<bool, BindError> {
        if op == UnOp::Not {
            let Some(value) = self.bool_value(operand) else {
                return Ok(false);
            };
            let e = self.prog.exprs.get_mut(expr);
            e.kind = ExprKind::BoolLit { value: !value };
            e.children.clear();
            return Ok(true);
        }
        let Some(v) = self.int_value(operand) else {
            return Ok(false);
        };
        let ty = self.expr_ty(expr);
        let (width, signed) = int_shape(&self.prog.types.key(ty));
        let value = match op {
            UnOp::Neg => -v,
            UnOp::BitNot => !v,
            UnOp::Not => unreachable!(),
        };
        let value = if literal_fits(&value, width, signed) {
            value
        } else if trunc || self.prog.unsafe_mode || op == UnOp::BitNot {
            wrap_to_width(&value, width, signed)
        } else {
            return Err(BindError::new(
                ErrorKind::OverflowWouldOccur,
                loc,
                format!("constant negation overflows {}", self.prog.render_type(ty)),
            ));
        };
        let e = self.prog.exprs.get_mut(expr);
        e.kind = ExprKind::IntLit {
            value,
            width: Some(width),
            signed,
        };
        e.children.clear();
        Ok(true)
    }

    fn fold_compare(
        &mut self,
        expr: ExprId,
        op: CmpOp,
        children: &[ExprId],
    ) -> Result<bool, BindError> {
        let ordering = if let (Some(a), Some(b)) =
            (self.int_value(children[0]), self.int_value(children[1]))
        {
            a.cmp(&b)
        } else if let (
            ExprKind::StrLit { value: a },
            ExprKind::StrLit { value: b },
        ) = (
            &self.prog.exprs.get(children[0]).kind,
            &self.prog.exprs.get(children[1]).kind,
        ) {
            a.cmp(b)
        } else if let (Some(a), Some(b)) =
            (self.bool_value(children[0]), self.bool_value(children[1]))
        {
            a.cmp(&b)
        } else {
            return Ok(false);
        };
        let value = match op {
            CmpOp::Eq => ordering.is_eq(),
            CmpOp::Ne => ordering.is_ne(),
            CmpOp::Lt => ordering.is_lt(),
            CmpOp::Le => ordering.is_le(),
            CmpOp::Gt => ordering.is_gt(),
            CmpOp::Ge => ordering.is_ge(),
        };
        let e = self.prog.exprs.get_mut(expr);
        e.kind = ExprKind::BoolLit { value };
        e.children.clear();
        Ok(true)
    }

    fn fold_cast(
        &mut self,
        expr: ExprId,
        trunc: bool,
        value: ExprId,
        loc: Loc,
    ) -> Result<bool, BindError> {
        let Some(v) = self.int_value(value) else {
            return Ok(false);
        };
        let ty = self.expr_ty(expr);
        if !self.prog.types.is_integer(ty) {
            return Ok(false);
        }
        let (width, signed) = int_shape(&self.prog.types.key(ty));
        let v = if literal_fits(&v, width, signed) {
            v
        } else if trunc || self.prog.unsafe_mode {
            wrap_to_width(&v, width, signed)
        } else {
            return Err(BindError::new(
                ErrorKind::OverflowWouldOccur,
                loc,
                format!("constant does not fit {}", self.prog.render_type(ty)),
            ));
        };
        let e = self.prog.exprs.get_mut(expr);
        e.kind = ExprKind::IntLit {
            value: v,
            width: Some(width),
            signed,
        };
        e.children.clear();
        Ok(true)
    }

    /// A modular expression folds as a whole once its modulus and every
    /// leaf are constant.
    fn fold_modular(
        &mut self,
        expr: ExprId,
        children: &[ExprId],
        consts: &FxHashMap<VarId, ExprKind>,
        loc: Loc,
    ) -> Result<bool, BindError> {
        if !self.fold_expr(children[1], consts)? {
            return Ok(false);
        }
        let Some(modulus) = self.int_value(children[1]) else {
            return Ok(false);
        };
        if modulus.is_zero() {
            return Err(BindError::new(
                ErrorKind::OverflowWouldOccur,
                loc,
                "modulus is zero",
            ));
        }
        self.fold_mod_leaves(children[0], consts)?;
        let Some(value) = self.eval_modular(children[0], &modulus) else {
            return Ok(false);
        };
        let ty = self.expr_ty(expr);
        let (width, signed) = int_shape(&self.prog.types.key(ty));
        let e = self.prog.exprs.get_mut(expr);
        e.kind = ExprKind::IntLit {
            value,
            width: Some(width),
            signed,
        };
        e.children.clear();
        Ok(true)
    }

    /// Fold the non-modular leaves (identifiers, casts, calls) inside a
    /// modular subtree.
    fn fold_mod_leaves(
        &mut self,
        expr: ExprId,
        consts: &FxHashMap<VarId, ExprKind>,
    ) -> Result<(), BindError> {
        let (kind, children) = {
            let e = self.prog.exprs.get(expr);
            (e.kind.clone(), e.children.clone())
        };
        match kind {
            ExprKind::Binary { .. } | ExprKind::Unary { .. } | ExprKind::Compare { .. } => {
                for child in children {
                    self.fold_mod_leaves(child, consts)?;
                }
            }
            _ => {
                self.fold_expr(expr, consts)?;
            }
        }
        Ok(())
    }

    fn eval_modular(&self, expr: ExprId, modulus: &BigInt) -> Option<BigInt> {
        let e = self.prog.exprs.get(expr);
        let reduce = |v: BigInt| ((v % modulus) + modulus) % modulus;
        match &e.kind {
            ExprKind::IntLit { value, .. } => Some(reduce(value.clone())),
            ExprKind::Binary { op, .. } => {
                let a = self.eval_modular(e.children[0], modulus)?;
                let b = self.eval_modular(e.children[1], modulus)?;
                let v = match op {
                    BinOp::Add => a + b,
                    BinOp::Sub => a - b,
                    BinOp::Mul => a * b,
                    // Modular division needs an inverse; leave it to the
                    // runtime.
                    _ => return None,
                };
                Some(reduce(v))
            }
            ExprKind::Unary { op: UnOp::Neg, .. } => {
                let v = self.eval_modular(e.children[0], modulus)?;
                Some(reduce(-v))
            }
            _ => None,
        }
    }

    fn int_value(&self, expr: ExprId) -> Option<BigInt> {
        match &self.prog.exprs.get(expr).kind {
            ExprKind::IntLit { value, .. } => Some(value.clone()),
            _ => None,
        }
    }

    fn bool_value(&self, expr: ExprId) -> Option<bool> {
        match self.prog.exprs.get(expr).kind {
            ExprKind::BoolLit { value } => Some(value),
            _ => None,
        }
    }

    fn float_value(&self, expr: ExprId) -> Option<f64> {
        match self.prog.exprs.get(expr).kind {
            ExprKind::FloatLit { value, .. } => Some(value),
            _ => None,
        }
    }
}

fn is_literal(kind: &ExprKind) -> bool {
    matches!(
        kind,
        ExprKind::IntLit { .. }
            | ExprKind::FloatLit { .. }
            | ExprKind::BoolLit { .. }
            | ExprKind::StrLit { .. }
    )
}

fn int_shape(key: &TypeKey) -> (u32, bool) {
    match key {
        TypeKey::Uint { width, .. } => (*width, false),
        TypeKey::Int { width, .. } => (*width, true),
        _ => (64, false),
    }
}

/// Two's-complement wrap of a value into `width` bits.
fn wrap_to_width(value: &BigInt, width: u32, signed: bool) -> BigInt {
    let modulus = BigInt::one() << width;
    let mut wrapped = ((value % &modulus) + &modulus) % &modulus;
    if signed && wrapped >= (BigInt::one() << (width - 1)) {
        wrapped -= &modulus;
    }
    wrapped
}
