//! Statement nodes.

use sable_common::{Atom, BlockId, ExprId, Loc, StmtId};

/// The relation families the binder expands into cross-class member fields
/// during constructor binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelationKind {
    /// Parent holds a growable array of children; each child holds a back
    /// reference to its parent.
    ArrayList,
    /// Parent holds exactly one child.
    OneToOne,
}

/// Statement operator.
#[derive(Clone, Debug, PartialEq)]
pub enum StmtKind {
    /// `expr` is an `Assign` expression.
    Assign,
    /// `expr` is a `Call` expression evaluated for effect.
    Call,
    /// `expr` is the condition, `block` the body. Followed by zero or more
    /// `ElseIf` siblings and at most one `Else`.
    If,
    ElseIf,
    Else,
    /// Runtime switch: `expr` is the scrutinee, `block` holds `Case` and
    /// `Default` statements.
    Switch,
    /// Compile-time type switch: `expr` is a type expression; exactly one
    /// case is selected and bound.
    Typeswitch,
    /// `expr` is the case expression (or type pattern), `block` the body.
    Case,
    Default,
    While,
    DoWhile,
    /// `for init; test; update { body }`: `init` and `update` are
    /// statements owned by this node, `expr` is the test, `block` the body.
    For { init: StmtId, update: StmtId },
    /// `for loop_var in expr { body }`.
    Foreach { loop_var: Atom },
    Return,
    Yield,
    Throw,
    /// `args[0]` is the format string. After binding, `rewritten` holds the
    /// format string with inferred widths embedded for the code generator.
    Print {
        args: Vec<ExprId>,
        rewritten: Option<String>,
    },
    /// Increment the reference count of a class instance.
    Ref,
    /// Decrement the reference count of a class instance.
    Unref,
    /// Static relation between two tclasses; expanded into member fields on
    /// the participating classes when their constructors bind.
    Relation {
        kind: RelationKind,
        parent: ExprId,
        child: ExprId,
        cascade: bool,
    },
    /// Make the named module's identifiers visible in the current scope.
    Import { path: Atom },
    /// Expand relation-supplied code in a tclass body.
    Generate,
    /// A plain nested scope. Also what the iterator inliner leaves behind.
    Block,
}

/// Statement flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StmtFlags(u8);

impl StmtFlags {
    pub const NONE: Self = Self(0);
    /// The statement is reachable at run time.
    pub const INSTANTIATED: Self = Self(1 << 0);
    /// The assignment that created its target variable.
    pub const FIRST_ASSIGNMENT: Self = Self(1 << 1);

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

/// One statement.
#[derive(Clone, Debug)]
pub struct Stmt {
    pub kind: StmtKind,
    pub expr: Option<ExprId>,
    pub block: Option<BlockId>,
    pub loc: Loc,
    pub flags: StmtFlags,
}

impl Stmt {
    #[must_use]
    pub fn new(kind: StmtKind, expr: Option<ExprId>, block: Option<BlockId>, loc: Loc) -> Self {
        Stmt {
            kind,
            expr,
            block,
            loc,
            flags: StmtFlags::NONE,
        }
    }

    #[must_use]
    pub fn is_instantiated(&self) -> bool {
        self.flags.has(StmtFlags::INSTANTIATED)
    }
}

/// Arena of statements.
#[derive(Debug, Default)]
pub struct StmtArena {
    nodes: Vec<Stmt>,
}

impl StmtArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, stmt: Stmt) -> StmtId {
        let id = StmtId::new(self.nodes.len());
        self.nodes.push(stmt);
        id
    }

    #[must_use]
    pub fn get(&self, id: StmtId) -> &Stmt {
        &self.nodes[id.index()]
    }

    pub fn get_mut(&mut self, id: StmtId) -> &mut Stmt {
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
