//! Variables: parameters, locals, and class members.

use sable_common::{Atom, ExprId, Loc, VarId};
use sable_types::TypeId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VarKind {
    Parameter,
    Local,
    Member,
}

/// One variable. Created at parse time or during member discovery in a
/// constructor body; mutated only by the binder.
#[derive(Clone, Debug)]
pub struct Variable {
    pub name: Atom,
    pub kind: VarKind,
    pub is_const: bool,
    /// Declared type-constraint expression, if any.
    pub constraint: Option<ExprId>,
    /// Initializer expression; for parameters this is the default value.
    pub default: Option<ExprId>,
    /// Current datatype; evolves via unification.
    pub ty: Option<TypeId>,
    /// The variable is assigned a type value and never instantiated at
    /// run time.
    pub is_type: bool,
    /// The variable carries a runtime value reachable from program
    /// execution.
    pub instantiated: bool,
    pub loc: Loc,
}

impl Variable {
    #[must_use]
    pub fn new(name: Atom, kind: VarKind, loc: Loc) -> Self {
        Variable {
            name,
            kind,
            is_const: false,
            constraint: None,
            default: None,
            ty: None,
            is_type: false,
            instantiated: false,
            loc,
        }
    }
}

/// Arena of variables.
#[derive(Debug, Default)]
pub struct VarArena {
    nodes: Vec<Variable>,
}

impl VarArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, var: Variable) -> VarId {
        let id = VarId::new(self.nodes.len());
        self.nodes.push(var);
        id
    }

    #[must_use]
    pub fn get(&self, id: VarId) -> &Variable {
        &self.nodes[id.index()]
    }

    pub fn get_mut(&mut self, id: VarId) -> &mut Variable {
        &mut self.nodes[id.index()]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
