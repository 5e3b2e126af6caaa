//! Expression nodes.
//!
//! An expression is an operator node with child expressions, a source
//! location, and the annotations the binder attaches: resolved datatype,
//! type/autocast/const flags, resolved signature for calls and operator
//! overloads, and the linked referent for identifier nodes.
//!
//! Expressions are immutable in shape during binding except for the
//! annotations and constant-propagation rewrites.

use num_bigint::BigInt;
use sable_common::{Atom, ExprId, FuncId, Loc, SigId, VarId};
use sable_types::TypeId;
use smallvec::SmallVec;

/// Binary arithmetic, bitwise, and shift operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinOp {
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
}

impl BinOp {
    /// Operators whose overflow is trapped unless the `…trunc` sibling or
    /// unsafe mode elides the check.
    #[must_use]
    pub const fn can_overflow(self) -> bool {
        matches!(self, BinOp::Add | BinOp::Sub | BinOp::Mul)
    }

    #[must_use]
    pub const fn is_shift(self) -> bool {
        matches!(self, BinOp::Shl | BinOp::Shr | BinOp::Rotl | BinOp::Rotr)
    }

    #[must_use]
    pub const fn is_arith(self) -> bool {
        matches!(
            self,
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod
        )
    }
}

/// Unary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnOp {
    Neg,
    BitNot,
    Not,
}

/// Short-circuit logical operators. Logical not is `UnOp::Not`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LogOp {
    And,
    Or,
    Xor,
}

/// Relational and equality operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    #[must_use]
    pub const fn is_equality(self) -> bool {
        matches!(self, CmpOp::Eq | CmpOp::Ne)
    }
}

/// What an identifier resolved to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdentTarget {
    Var(VarId),
    Func(FuncId),
}

/// The operator of an expression node. Operand expressions live in
/// `Expr::children`; only non-expression operands are inline here.
#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    /// Integer literal. `width: None` means the literal carried no explicit
    /// width suffix and is eligible for auto-casting.
    IntLit {
        value: BigInt,
        width: Option<u32>,
        signed: bool,
    },
    FloatLit {
        value: f64,
        width: u32,
    },
    BoolLit {
        value: bool,
    },
    StrLit {
        value: String,
    },
    /// Uniformly random unsigned integer of the given width. Never constant.
    RandUint {
        width: u32,
    },
    Ident {
        name: Atom,
    },
    /// A datatype keyword (`u32`, `bool`, `string`, …) used as a type
    /// expression.
    TypeLit {
        ty: TypeId,
    },
    /// children: elements
    ArrayLit,
    /// children: elements
    TupleLit,
    /// Member access `base.name`. children: `[base]`
    Dot {
        name: Atom,
    },
    /// children: `[base, index]`
    Index,
    /// children: `[base, lo, hi]`
    Slice,
    /// children: `[callee, args…]`
    Call,
    /// children: `[left, right]`
    Binary {
        op: BinOp,
        trunc: bool,
    },
    /// children: `[operand]`
    Unary {
        op: UnOp,
        trunc: bool,
    },
    /// children: `[left, right]`
    Logical {
        op: LogOp,
    },
    /// children: `[left, right]`
    Compare {
        op: CmpOp,
    },
    /// `<T>e` / `<T:trunc>e`. children: `[type-expr, value]`
    Cast {
        trunc: bool,
    },
    /// `cond ? a : b`. children: `[cond, a, b]`
    Select,
    /// children: `[operand]`
    Secret,
    /// children: `[operand]`
    Reveal,
    /// children: `[operand]`
    Signed,
    /// children: `[operand]`
    Unsigned,
    /// children: `[operand]`
    Typeof,
    /// children: `[operand]`
    Arrayof,
    /// children: `[operand]`
    Widthof,
    /// children: `[operand]`
    Isnull,
    /// `&f(T1,…,Tn)`. children: `[call-form]`
    Funcaddr,
    /// `null(T)`. children: `[type-expr]`
    NullOf,
    /// `e mod m`. children: `[e, m]`
    Modular,
    /// `target = value`, or an operator-assign form. children:
    /// `[target, value]`, or `[target, value, type-constraint]` when the
    /// assignment carries a declared type constraint (`x: u32 = …`).
    Assign {
        op: Option<BinOp>,
    },
    /// `name = expr` in an argument list. children: `[value]`
    NamedParam {
        name: Atom,
    },
    /// `a … b`. children: `[lo, hi]`
    Range,
    /// `a in b`, always resolved through an operator overload. children:
    /// `[item, container]`
    In,
}

/// Post-binding expression flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExprFlags(u8);

impl ExprFlags {
    pub const NONE: Self = Self(0);
    /// The expression denotes a type, not a runtime value.
    pub const IS_TYPE: Self = Self(1 << 0);
    /// Integer literal with no explicit width; adopts the width of the
    /// other operand during unification.
    pub const AUTOCAST: Self = Self(1 << 1);
    /// The expression reads from a const variable or is itself constant.
    pub const CONST: Self = Self(1 << 2);

    #[inline]
    #[must_use]
    pub const fn has(self, flag: Self) -> bool {
        (self.0 & flag.0) != 0
    }

    #[inline]
    pub const fn set(&mut self, flag: Self) {
        self.0 |= flag.0;
    }

    #[inline]
    pub const fn clear(&mut self, flag: Self) {
        self.0 &= !flag.0;
    }
}

/// One expression node.
#[derive(Clone, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub children: SmallVec<[ExprId; 2]>,
    pub loc: Loc,
    /// Resolved datatype, attached by the binder.
    pub ty: Option<TypeId>,
    pub flags: ExprFlags,
    /// Resolved signature for calls and operator overloads.
    pub sig: Option<SigId>,
    /// Linked referent for identifier nodes.
    pub target: Option<IdentTarget>,
}

impl Expr {
    #[must_use]
    pub fn new(kind: ExprKind, children: SmallVec<[ExprId; 2]>, loc: Loc) -> Self {
        Expr {
            kind,
            children,
            loc,
            ty: None,
            flags: ExprFlags::NONE,
            sig: None,
            target: None,
        }
    }

    #[must_use]
    pub fn is_type(&self) -> bool {
        self.flags.has(ExprFlags::IS_TYPE)
    }

    #[must_use]
    pub fn is_autocast(&self) -> bool {
        self.flags.has(ExprFlags::AUTOCAST)
    }

    #[must_use]
    pub fn is_const(&self) -> bool {
        self.flags.has(ExprFlags::CONST)
    }
}

/// Arena of expression nodes.
#[derive(Debug, Default)]
pub struct ExprArena {
    nodes: Vec<Expr>,
}

impl ExprArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, expr: Expr) -> ExprId {
        let id = ExprId::new(self.nodes.len());
        self.nodes.push(expr);
        id
    }

    #[must_use]
    pub fn get(&self, id: ExprId) -> &Expr {
        &self.nodes[id.index()]
    }

    pub fn get_mut(&mut self, id: ExprId) -> &mut Expr {
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
