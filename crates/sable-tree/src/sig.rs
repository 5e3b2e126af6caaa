//! Function signatures: one per unique instantiation.

use sable_common::{BlockId, ClassId, FuncId, Loc, SigId, VarId};
use sable_types::TypeId;

/// One parameter slot of a signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Paramspec {
    pub ty: TypeId,
    /// The parameter carries a runtime value; uninstantiated parameters
    /// (used only in type position) may be elided by the code generator.
    pub instantiated: bool,
}

impl Paramspec {
    #[must_use]
    pub const fn new(ty: TypeId) -> Self {
        Paramspec {
            ty,
            instantiated: false,
        }
    }
}

/// A concrete `(function, parameter-datatype-vector) → return-datatype`
/// instantiation. Created lazily on first matching call; interned in the
/// owning function's signature table.
#[derive(Debug)]
pub struct Signature {
    pub func: FuncId,
    /// Parameter slots in canonical (declaration) order.
    pub params: Vec<Paramspec>,
    /// Return type: unknown until the body's first return binds (or the
    /// declared constraint seeds it), then monotonically refined.
    pub ret: Option<TypeId>,
    /// For constructors: the class this signature constructs.
    pub class: Option<ClassId>,
    /// The signature's own bound copy of the function template body.
    /// `None` for extern functions, which have no body to bind.
    pub body: Option<BlockId>,
    /// Copied parameter variables, same order as `params`.
    pub param_vars: Vec<VarId>,
    /// For constructors: the copied `self` variable.
    pub self_var: Option<VarId>,
    /// Reachable at run time from some caller.
    pub instantiated: bool,
    /// Taken by address; the indirect call ABI forces every parameter to
    /// be instantiated.
    pub called_by_funcptr: bool,
    /// Every statement of the body copy has been bound.
    pub bound: bool,
    /// Pre-resolved constructor signature whose self-type slot is still a
    /// null type; replaced by the canonical signature once the self type
    /// becomes concrete.
    pub partial: bool,
    pub loc: Loc,
}

impl Signature {
    #[must_use]
    pub fn new(func: FuncId, params: Vec<Paramspec>, loc: Loc) -> Self {
        Signature {
            func,
            params,
            ret: None,
            class: None,
            body: None,
            param_vars: Vec::new(),
            self_var: None,
            instantiated: false,
            called_by_funcptr: false,
            bound: false,
            partial: false,
            loc,
        }
    }

    /// The canonical parameter-type vector this signature is keyed by.
    #[must_use]
    pub fn param_types(&self) -> Vec<TypeId> {
        self.params.iter().map(|p| p.ty).collect()
    }
}

/// Arena of signatures.
#[derive(Debug, Default)]
pub struct SigArena {
    nodes: Vec<Signature>,
}

impl SigArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, sig: Signature) -> SigId {
        let id = SigId::new(self.nodes.len());
        self.nodes.push(sig);
        id
    }

    #[must_use]
    pub fn get(&self, id: SigId) -> &Signature {
        &self.nodes[id.index()]
    }

    pub fn get_mut(&mut self, id: SigId) -> &mut Signature {
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
