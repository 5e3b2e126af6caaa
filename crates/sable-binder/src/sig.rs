//! Signature and class instantiation engine.
//!
//! Every call site is turned into a concrete signature, interned on the
//! owning function keyed by the canonical parameter-datatype vector.
//! Constructor signatures additionally determine a Class, hash-consed on
//! the tclass plus the parameter vector after null-type resolution.
//! Creating a signature instantiates a private copy of the function's
//! template body and enqueues its statements for binding.

use sable_common::{Atom, BindError, ClassId, ErrorKind, FuncId, Loc, SigId, TclassId, VarId};
use sable_tree::{
    Block, BlockOwner, Class, FuncKind, IdentTarget, Paramspec, RelationKind, Signature, StmtKind,
    VarKind, Variable,
};
use sable_types::{TypeId, unify};
use tracing::debug;

use crate::copy::CopyMap;
use crate::state::{BindFailure, BindResult, Binder, Event};

impl Binder<'_> {
    /// The root signature binds the module root block in place: it is the
    /// one function with a single, parameterless instantiation.
    pub(crate) fn create_root_sig(&mut self) -> SigId {
        let func = self.prog.root_func;
        let root_block = self.prog.root_block;
        let sig = self
            .prog
            .sigs
            .alloc(Signature::new(func, Vec::new(), Loc::synthetic()));
        let s = self.prog.sigs.get_mut(sig);
        s.body = Some(root_block);
        s.instantiated = true;
        self.prog.funcs.get_mut(func).sigs.insert(Vec::new(), sig);
        sig
    }

    /// Look up or create the signature of `func` for a canonical parameter
    /// vector.
    pub(crate) fn get_or_create_sig(
        &mut self,
        func: FuncId,
        arg_types: Vec<TypeId>,
        loc: Loc,
    ) -> BindResult<SigId> {
        if let Some(sig) = self.prog.funcs.get(func).find_sig(&arg_types) {
            return Ok(sig);
        }
        self.create_sig(func, arg_types, loc)
    }

    fn create_sig(&mut self, func: FuncId, arg_types: Vec<TypeId>, loc: Loc) -> BindResult<SigId> {
        let params: Vec<Paramspec> = arg_types.iter().map(|&t| Paramspec::new(t)).collect();
        let sig = self.prog.sigs.alloc(Signature::new(func, params, loc));
        self.prog
            .funcs
            .get_mut(func)
            .sigs
            .insert(arg_types.clone(), sig);
        debug!(?func, ?sig, "create signature");

        let kind = self.prog.funcs.get(func).kind;
        match kind {
            FuncKind::Struct => {
                // Calling a struct function builds a struct value; there is
                // no body to bind.
                let fields = self.struct_fields(func, &arg_types);
                let s = self.prog.sigs.get_mut(sig);
                s.ret = Some(fields);
                s.bound = true;
            }
            FuncKind::Constructor => {
                self.create_ctor_sig(func, sig, &arg_types, loc)?;
            }
            _ if self.prog.funcs.get(func).extern_c => {
                // Return type comes from the declared constraint; nothing
                // to bind.
                let ret = match self.prog.funcs.get(func).ret_constraint {
                    Some(constraint) => {
                        let scope = self.prog.blocks.get(self.prog.funcs.get(func).body).parent;
                        self.eval_type_expr(scope.unwrap_or(self.prog.root_block), constraint, None)?
                    }
                    None => TypeId::NONE,
                };
                let s = self.prog.sigs.get_mut(sig);
                s.ret = Some(ret);
                s.bound = true;
            }
            _ => {
                if let Some(constraint) = self.prog.funcs.get(func).ret_constraint {
                    let scope = self.prog.funcs.get(func).body;
                    let ret = self.eval_type_expr(scope, constraint, None)?;
                    self.prog.sigs.get_mut(sig).ret = Some(ret);
                }
                self.instantiate_sig_body(sig);
                self.enqueue_sig_body(sig);
            }
        }
        Ok(sig)
    }

    /// Constructor signatures determine a Class. A call with a null-typed
    /// argument slot creates a partial signature: it names the pending
    /// class, but its body is not bound until the slot becomes concrete and
    /// the temporary is replaced by the canonical signature.
    fn create_ctor_sig(
        &mut self,
        func: FuncId,
        sig: SigId,
        arg_types: &[TypeId],
        loc: Loc,
    ) -> BindResult<()> {
        let tclass = self
            .prog
            .funcs
            .get(func)
            .tclass
            .expect("constructor has tclass");

        let class = match self.prog.tclasses.get(tclass).find_class(arg_types) {
            Some(class) => class,
            None => {
                let members = self
                    .prog
                    .blocks
                    .alloc(Block::new(None, BlockOwner::Root));
                let class = self.prog.classes.alloc(Class {
                    tclass,
                    sig,
                    members,
                    bound: false,
                });
                self.prog.blocks.get_mut(members).owner = BlockOwner::Class(class);
                self.prog
                    .tclasses
                    .get_mut(tclass)
                    .classes
                    .insert(arg_types.to_vec(), class);
                class
            }
        };
        let ret = self.prog.types.class(tclass, sig, false);
        {
            let s = self.prog.sigs.get_mut(sig);
            s.class = Some(class);
            s.ret = Some(ret);
        }
        if arg_types.is_empty() {
            self.prog.tclasses.get_mut(tclass).default_class = Some(class);
        }

        let has_null_slot = arg_types
            .iter()
            .any(|&t| self.prog.types.is_null_class(t));
        if has_null_slot {
            self.prog.sigs.get_mut(sig).partial = true;
            return Ok(());
        }

        // A constructor calling a constructor of its own tclass defers the
        // inner class's binding until the outer constructor finishes; the
        // per-tclass queue drains at that point.
        if self.current_ctor_tclass() == Some(tclass) {
            self.lazy_ctors.entry(tclass).or_default().push(sig);
            return Ok(());
        }
        self.instantiate_sig_body(sig);
        self.enqueue_sig_body(sig);
        Ok(())
    }

    /// The tclass whose constructor the currently-running task binds, if
    /// any.
    fn current_ctor_tclass(&self) -> Option<TclassId> {
        let task = self.tasks.get(self.current)?;
        let func = self.prog.sigs.get(task.sig).func;
        let f = self.prog.funcs.get(func);
        if f.kind == FuncKind::Constructor {
            f.tclass
        } else {
            None
        }
    }

    /// Drop a resolved partial signature and its temporary class from the
    /// lookup tables.
    pub(crate) fn destroy_partial_sig(&mut self, sig: SigId) {
        let (func, key) = {
            let s = self.prog.sigs.get(sig);
            (s.func, s.param_types())
        };
        self.prog.funcs.get_mut(func).sigs.shift_remove(&key);
        if let Some(tclass) = self.prog.funcs.get(func).tclass {
            self.prog.tclasses.get_mut(tclass).classes.shift_remove(&key);
        }
        debug!(?sig, "destroy partial signature");
    }

    /// Instantiate a private copy of the function template body for a
    /// signature and type its parameter variables.
    pub(crate) fn instantiate_sig_body(&mut self, sig: SigId) {
        let func = self.prog.sigs.get(sig).func;
        let (template, params, self_var) = {
            let f = self.prog.funcs.get(func);
            (f.body, f.params.clone(), f.self_var)
        };
        let parent = self.prog.blocks.get(template).parent;
        let mut map = CopyMap::new(false);
        let body = self.copy_block(template, parent, BlockOwner::Func(func), &mut map);

        let param_vars: Vec<VarId> = params.iter().map(|p| map.vars[p]).collect();
        for (index, &var) in param_vars.iter().enumerate() {
            let ty = self.prog.sigs.get(sig).params[index].ty;
            self.prog.vars.get_mut(var).ty = Some(ty);
        }
        let self_copy = self_var.map(|v| map.vars[&v]);
        if let Some(var) = self_copy {
            // The constructor's `self` is the object under construction.
            let ret = self.prog.sigs.get(sig).ret;
            let v = self.prog.vars.get_mut(var);
            v.ty = ret;
            v.instantiated = true;
        }

        let s = self.prog.sigs.get_mut(sig);
        s.body = Some(body);
        s.param_vars = param_vars;
        s.self_var = self_copy;
    }

    // =========================================================================
    // Signature completion
    // =========================================================================

    pub(crate) fn maybe_finish_sig(&mut self, sig: SigId) {
        if self.pending.get(&sig).copied().unwrap_or(0) == 0 {
            self.finish_sig(sig);
        }
    }

    /// Every statement of the signature's body has been bound.
    pub(crate) fn finish_sig(&mut self, sig: SigId) {
        if self.prog.sigs.get(sig).bound {
            return;
        }
        if self.prog.sigs.get(sig).ret.is_none() {
            self.prog.sigs.get_mut(sig).ret = Some(TypeId::NONE);
        }
        self.prog.sigs.get_mut(sig).bound = true;
        if self.prog.sigs.get(sig).called_by_funcptr {
            for p in &mut self.prog.sigs.get_mut(sig).params {
                p.instantiated = true;
            }
        }
        debug!(?sig, "signature bound");
        self.fire(Event::Sig(sig));

        let func = self.prog.sigs.get(sig).func;
        if self.prog.funcs.get(func).kind == FuncKind::Constructor {
            if let Some(class) = self.prog.sigs.get(sig).class {
                self.apply_relations(class);
                self.prog.classes.get_mut(class).bound = true;
            }
            let tclass = self
                .prog
                .funcs
                .get(func)
                .tclass
                .expect("constructor has tclass");
            if let Some(deferred) = self.lazy_ctors.remove(&tclass) {
                for lazy in deferred {
                    self.instantiate_sig_body(lazy);
                    self.enqueue_sig_body(lazy);
                }
            }
        }
    }

    /// Refine a signature's return type from a `return`/`yield` statement
    /// or a declared constraint. Monotone: refiring the event wakes every
    /// caller that saw the less-refined type.
    pub(crate) fn refine_sig_ret(
        &mut self,
        sig: SigId,
        ty: TypeId,
        value_autocast: bool,
        loc: Loc,
    ) -> BindResult<()> {
        let old = self.prog.sigs.get(sig).ret;
        let merged = match old {
            None => ty,
            // An inferred empty return refines to the first real value.
            Some(TypeId::NONE) if ty != TypeId::NONE => ty,
            Some(old) => {
                match unify(&self.prog.types, old, ty, false, value_autocast) {
                    Some(merged) => merged,
                    None => {
                        return Err(BindFailure::Error(
                            BindError::new(
                                ErrorKind::TypeMismatch,
                                loc,
                                "return value does not match earlier returns",
                            )
                            .with_datatypes(
                                self.prog.render_type(old),
                                self.prog.render_type(ty),
                            ),
                        ));
                    }
                }
            }
        };
        if old != Some(merged) {
            self.prog.sigs.get_mut(sig).ret = Some(merged);
            self.fire(Event::Sig(sig));
        }
        Ok(())
    }

    /// Mark the paramspec behind a parameter variable as instantiated: its
    /// binding path required a runtime value.
    pub(crate) fn note_param_use(&mut self, sig: SigId, var: VarId) {
        let index = {
            let s = self.prog.sigs.get(sig);
            s.param_vars.iter().position(|&p| p == var)
        };
        if let Some(index) = index {
            self.prog.sigs.get_mut(sig).params[index].instantiated = true;
        }
    }

    /// The struct type a struct function call builds, named by its fields.
    fn struct_fields(&mut self, func: FuncId, arg_types: &[TypeId]) -> TypeId {
        let names: Vec<Atom> = self
            .prog
            .funcs
            .get(func)
            .params
            .iter()
            .map(|&p| self.prog.vars.get(p).name)
            .collect();
        let fields = names
            .into_iter()
            .zip(arg_types.iter().copied())
            .collect();
        self.prog.types.struct_type(fields)
    }

    // =========================================================================
    // Relations
    // =========================================================================

    /// Expand every relation statement that names this class's tclass into
    /// member fields on the class. Peer classes are referenced through
    /// their null types, which later unification refines; handles, never
    /// owning pointers, so parent/child graphs may be cyclic.
    fn apply_relations(&mut self, class: ClassId) {
        let tclass = self.prog.classes.get(class).tclass;
        let relations = self.prog.relations.clone();
        for stmt in relations {
            let StmtKind::Relation {
                kind,
                parent,
                child,
                ..
            } = self.prog.stmts.get(stmt).kind.clone()
            else {
                continue;
            };
            let loc = self.prog.stmts.get(stmt).loc;
            let (Some(parent_tc), Some(child_tc)) =
                (self.relation_tclass(parent), self.relation_tclass(child))
            else {
                continue;
            };
            if tclass == parent_tc {
                let child_name = self.prog.tclasses.get(child_tc).name;
                let member = self.relation_member_name(child_name, kind == RelationKind::ArrayList);
                let elem = self.prog.types.null_class(child_tc);
                let ty = match kind {
                    RelationKind::ArrayList => self.prog.types.array(elem),
                    RelationKind::OneToOne => elem,
                };
                self.add_relation_member(class, member, ty, loc);
            }
            if tclass == child_tc {
                let parent_name = self.prog.tclasses.get(parent_tc).name;
                let member = self.relation_member_name(parent_name, false);
                let ty = self.prog.types.null_class(parent_tc);
                self.add_relation_member(class, member, ty, loc);
            }
        }
    }

    fn relation_tclass(&self, expr: sable_common::ExprId) -> Option<TclassId> {
        let sable_tree::ExprKind::Ident { name } = self.prog.exprs.get(expr).kind else {
            return None;
        };
        match self.prog.lookup(self.prog.root_block, name) {
            Some(IdentTarget::Func(f)) => self.prog.funcs.get(f).tclass,
            _ => None,
        }
    }

    fn relation_member_name(&mut self, tclass_name: Atom, plural: bool) -> Atom {
        let base = self.prog.strings.resolve(tclass_name).to_lowercase();
        let name = if plural { format!("{base}s") } else { base };
        self.prog.strings.intern(&name)
    }

    fn add_relation_member(&mut self, class: ClassId, name: Atom, ty: TypeId, loc: Loc) {
        let members = self.prog.classes.get(class).members;
        if self.prog.blocks.get(members).lookup(name).is_some() {
            return;
        }
        let mut var = Variable::new(name, VarKind::Member, loc);
        var.ty = Some(ty);
        var.instantiated = true;
        let id = self.prog.vars.alloc(var);
        self.prog
            .blocks
            .get_mut(members)
            .define(name, IdentTarget::Var(id));
    }
}
