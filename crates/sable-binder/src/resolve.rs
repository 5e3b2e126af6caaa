//! Identifier and scope resolution.
//!
//! Plain identifiers are looked up along the static scope chain. Dotted
//! access binds the base first and then looks the member up in the scope
//! derived from the base's datatype: class values expose their member block
//! and methods, tclasses and functions expose their body block, enum
//! classes expose their entry block, and the builtin types expose a small
//! method table. Unresolved identifiers park the task on the name's event;
//! defining the name anywhere requeues the parked tasks.

use rustc_hash::FxHashMap;
use sable_common::{Atom, BindError, BlockId, ClassId, ErrorKind, ExprId, FuncId};
use sable_tree::{ExprKind, FuncKind, IdentTarget};
use sable_types::{TypeId, TypeKey};
use tracing::trace;

use crate::state::{BindFailure, BindResult, Binder, Event};

/// The scope a dotted member lookup searches, derived from the base
/// expression's datatype.
pub(crate) enum MemberScope {
    Class(ClassId),
    FuncBody(FuncId),
    EnumBody(FuncId),
    /// Arrays and strings: the builtin method table.
    Builtin,
}

impl Binder<'_> {
    pub(crate) fn error(
        &self,
        kind: ErrorKind,
        loc: sable_common::Loc,
        message: impl Into<String>,
    ) -> BindFailure {
        BindFailure::Error(BindError::new(kind, loc, message))
    }

    /// Define a name in a block and wake everything waiting for it.
    pub(crate) fn define_name(&mut self, block: BlockId, name: Atom, target: IdentTarget) {
        trace!(?block, name = self.prog.strings.resolve(name), "define");
        self.prog.blocks.get_mut(block).define(name, target);
        self.fire(Event::Ident(name));
    }

    /// Derive the member-lookup scope from a datatype.
    pub(crate) fn member_scope(&self, ty: TypeId) -> Option<MemberScope> {
        match self.prog.types.key(ty) {
            TypeKey::Class { sig, .. } => {
                self.prog.sigs.get(sig).class.map(MemberScope::Class)
            }
            TypeKey::Tclass { tclass } => Some(MemberScope::FuncBody(
                self.prog.tclasses.get(tclass).constructor,
            )),
            TypeKey::Function { func } => Some(MemberScope::FuncBody(func)),
            TypeKey::EnumClass { func } => Some(MemberScope::EnumBody(func)),
            TypeKey::Str { .. } | TypeKey::Array { .. } => Some(MemberScope::Builtin),
            _ => None,
        }
    }

    /// The refinement event behind an expression whose datatype is still a
    /// null type, if one can be identified.
    pub(crate) fn refine_event_for(&self, expr: ExprId) -> Option<Event> {
        let e = self.prog.exprs.get(expr);
        match e.kind {
            ExprKind::Ident { .. } | ExprKind::Dot { .. } => match e.target {
                Some(IdentTarget::Var(v)) => Some(Event::Var(v)),
                _ => None,
            },
            ExprKind::Call => e.sig.map(Event::Sig),
            _ => None,
        }
    }

    /// Evaluate a type expression without annotating nodes. `env` supplies
    /// parameter bindings during constraint checking (a parameter
    /// constraint may name an earlier parameter).
    pub(crate) fn eval_type_expr(
        &mut self,
        block: BlockId,
        expr: ExprId,
        env: Option<&FxHashMap<Atom, TypeId>>,
    ) -> BindResult<TypeId> {
        let (kind, children, loc) = {
            let e = self.prog.exprs.get(expr);
            (e.kind.clone(), e.children.clone(), e.loc)
        };
        match kind {
            ExprKind::TypeLit { ty } => Ok(ty),
            ExprKind::Ident { name } => {
                if let Some(env) = env {
                    if let Some(&ty) = env.get(&name) {
                        return Ok(ty);
                    }
                }
                match self.prog.lookup(block, name) {
                    Some(IdentTarget::Var(v)) => {
                        let var = self.prog.vars.get(v);
                        match (var.is_type, var.ty) {
                            (true, Some(ty)) => Ok(ty),
                            (_, None) => Err(BindFailure::Blocked(Event::Var(v))),
                            (false, Some(_)) => Err(self.error(
                                ErrorKind::TypeMismatch,
                                loc,
                                format!(
                                    "'{}' is not a type",
                                    self.prog.strings.resolve(name)
                                ),
                            )),
                        }
                    }
                    Some(IdentTarget::Func(f)) => self.func_as_type(f, loc),
                    None => Err(BindFailure::Blocked(Event::Ident(name))),
                }
            }
            ExprKind::ArrayLit if children.len() == 1 => {
                let elem = self.eval_type_expr(block, children[0], env)?;
                Ok(self.prog.types.array(elem))
            }
            ExprKind::TupleLit => {
                let elems = children
                    .iter()
                    .map(|&c| self.eval_type_expr(block, c, env))
                    .collect::<BindResult<Vec<_>>>()?;
                Ok(self.prog.types.tuple(elems))
            }
            ExprKind::Secret => {
                let inner = self.eval_type_expr(block, children[0], env)?;
                if !self.prog.types.secretable(inner) {
                    return Err(self.error(
                        ErrorKind::SecretViolation,
                        loc,
                        "object references cannot be secret",
                    ));
                }
                Ok(self.prog.types.with_secret(inner, true))
            }
            ExprKind::NullOf => {
                let inner = self.eval_type_expr(block, children[0], env)?;
                match self.prog.types.key(inner) {
                    TypeKey::Tclass { tclass } => Ok(self.prog.types.null_class(tclass)),
                    TypeKey::Class { .. } => Ok(self.prog.types.with_nullable(inner, true)),
                    _ => Err(self.error(
                        ErrorKind::TypeMismatch,
                        loc,
                        "null(…) needs a class type",
                    )),
                }
            }
            _ => Err(self.error(
                ErrorKind::TypeMismatch,
                loc,
                "expected a type expression",
            )),
        }
    }

    /// The datatype a function name denotes in type position.
    fn func_as_type(&mut self, func: FuncId, loc: sable_common::Loc) -> BindResult<TypeId> {
        let kind = self.prog.funcs.get(func).kind;
        match kind {
            FuncKind::Constructor => {
                let tclass = self
                    .prog
                    .funcs
                    .get(func)
                    .tclass
                    .expect("constructor has tclass");
                Ok(self.prog.types.tclass(tclass))
            }
            FuncKind::Enum => Ok(self.prog.types.enum_value(func)),
            FuncKind::Struct => {
                let params = self.prog.funcs.get(func).params.clone();
                let scope = self.prog.funcs.get(func).body;
                let mut fields = Vec::with_capacity(params.len());
                for param in params {
                    let (name, constraint, ploc) = {
                        let v = self.prog.vars.get(param);
                        (v.name, v.constraint, v.loc)
                    };
                    let Some(constraint) = constraint else {
                        return Err(self.error(
                            ErrorKind::TypeMismatch,
                            ploc,
                            "struct field needs a type constraint to be used as a type",
                        ));
                    };
                    let ty = self.eval_type_expr(scope, constraint, None)?;
                    fields.push((name, ty));
                }
                Ok(self.prog.types.struct_type(fields))
            }
            _ => Err(self.error(
                ErrorKind::TypeMismatch,
                loc,
                format!(
                    "'{}' is not a type",
                    self.prog
                        .strings
                        .resolve(self.prog.funcs.get(func).name)
                ),
            )),
        }
    }
}
