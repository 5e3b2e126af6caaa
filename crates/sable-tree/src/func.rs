//! Functions and the operator-overload registry key.

use indexmap::IndexMap;
use sable_common::{Atom, BlockId, ExprId, FuncId, Loc, SigId, TclassId, VarId};
use sable_types::TypeId;

use crate::expr::{BinOp, CmpOp, UnOp};

/// What a function is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FuncKind {
    Plain,
    Constructor,
    Destructor,
    Iterator,
    Operator,
    Module,
    Package,
    Enum,
    Struct,
    Finalizer,
    Unittest,
    Generator,
}

/// Key of the operator-overload table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OverloadOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Rotl,
    Rotr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Neg,
    Not,
    Index,
    In,
}

impl From<BinOp> for OverloadOp {
    fn from(op: BinOp) -> Self {
        match op {
            BinOp::Add => OverloadOp::Add,
            BinOp::Sub => OverloadOp::Sub,
            BinOp::Mul => OverloadOp::Mul,
            BinOp::Div => OverloadOp::Div,
            BinOp::Mod => OverloadOp::Mod,
            BinOp::BitAnd => OverloadOp::BitAnd,
            BinOp::BitOr => OverloadOp::BitOr,
            BinOp::BitXor => OverloadOp::BitXor,
            BinOp::Shl => OverloadOp::Shl,
            BinOp::Shr => OverloadOp::Shr,
            BinOp::Rotl => OverloadOp::Rotl,
            BinOp::Rotr => OverloadOp::Rotr,
        }
    }
}

impl From<CmpOp> for OverloadOp {
    fn from(op: CmpOp) -> Self {
        match op {
            CmpOp::Eq => OverloadOp::Eq,
            CmpOp::Ne => OverloadOp::Ne,
            CmpOp::Lt => OverloadOp::Lt,
            CmpOp::Le => OverloadOp::Le,
            CmpOp::Gt => OverloadOp::Gt,
            CmpOp::Ge => OverloadOp::Ge,
        }
    }
}

impl From<UnOp> for OverloadOp {
    fn from(op: UnOp) -> Self {
        match op {
            UnOp::Neg => OverloadOp::Neg,
            UnOp::BitNot | UnOp::Not => OverloadOp::Not,
        }
    }
}

/// One function (or constructor, iterator, operator, module, …).
#[derive(Debug)]
pub struct Function {
    pub name: Atom,
    pub kind: FuncKind,
    /// Parameter variables in declaration order. For methods, `params[0]`
    /// is the implicit `self`.
    pub params: Vec<VarId>,
    /// The template body. Never bound directly: each signature binds its
    /// own copy.
    pub body: BlockId,
    /// Declared return-type constraint expression, if any.
    pub ret_constraint: Option<ExprId>,
    /// Signatures bound for this function, keyed by the canonical
    /// parameter-datatype vector.
    pub sigs: IndexMap<Vec<TypeId>, SigId>,
    /// For operator functions: which operator they overload.
    pub op: Option<OverloadOp>,
    /// For constructors: the owning tclass.
    pub tclass: Option<TclassId>,
    /// For constructors: the variable `self.x = …` assignments write
    /// through inside the template body.
    pub self_var: Option<VarId>,
    /// Declared inside a tclass body with an implicit `self` receiver.
    pub is_method: bool,
    /// For enums: bit width of the runtime representation.
    pub enum_width: u32,
    pub extern_c: bool,
    pub exported: bool,
    /// Linkage name preserved for exported/extern functions.
    pub linkage_name: Option<Atom>,
    pub loc: Loc,
}

impl Function {
    #[must_use]
    pub fn new(name: Atom, kind: FuncKind, body: BlockId, loc: Loc) -> Self {
        Function {
            name,
            kind,
            params: Vec::new(),
            body,
            ret_constraint: None,
            sigs: IndexMap::new(),
            op: None,
            tclass: None,
            self_var: None,
            is_method: false,
            enum_width: 0,
            extern_c: false,
            exported: false,
            linkage_name: None,
            loc,
        }
    }

    /// Find an existing signature for a canonical parameter vector.
    #[must_use]
    pub fn find_sig(&self, params: &[TypeId]) -> Option<SigId> {
        self.sigs.get(params).copied()
    }
}

/// Arena of functions.
#[derive(Debug, Default)]
pub struct FuncArena {
    nodes: Vec<Function>,
}

impl FuncArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, func: Function) -> FuncId {
        let id = FuncId::new(self.nodes.len());
        self.nodes.push(func);
        id
    }

    #[must_use]
    pub fn get(&self, id: FuncId) -> &Function {
        &self.nodes[id.index()]
    }

    pub fn get_mut(&mut self, id: FuncId) -> &mut Function {
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
