//! Lexical blocks and their symbol tables.
//!
//! A block is an ordered list of statements plus a symbol table of
//! identifiers. Scope resolution walks `parent` links outward to the root.
//! Symbol tables preserve declaration order (member layout and parameter
//! canonicalization depend on it).

use crate::expr::IdentTarget;
use indexmap::IndexMap;
use sable_common::{Atom, BlockId, ClassId, FuncId, StmtId};

/// What a block belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockOwner {
    Root,
    Func(FuncId),
    Stmt(StmtId),
    /// A class member block; holds the members discovered from `self.x = …`
    /// assignments in the constructor body.
    Class(ClassId),
}

/// One lexical scope.
#[derive(Debug)]
pub struct Block {
    pub stmts: Vec<StmtId>,
    pub idents: IndexMap<Atom, IdentTarget>,
    pub parent: Option<BlockId>,
    pub owner: BlockOwner,
    /// Reachability: control can fall out of the end of this block.
    pub can_continue: bool,
    /// Reachability: some path through this block executes a return.
    pub can_return: bool,
}

impl Block {
    #[must_use]
    pub fn new(parent: Option<BlockId>, owner: BlockOwner) -> Self {
        Block {
            stmts: Vec::new(),
            idents: IndexMap::new(),
            parent,
            owner,
            can_continue: true,
            can_return: false,
        }
    }

    /// Define a name in this block, replacing any prior referent.
    pub fn define(&mut self, name: Atom, target: IdentTarget) {
        self.idents.insert(name, target);
    }

    #[must_use]
    pub fn lookup(&self, name: Atom) -> Option<IdentTarget> {
        self.idents.get(&name).copied()
    }
}

/// Arena of blocks.
#[derive(Debug, Default)]
pub struct BlockArena {
    nodes: Vec<Block>,
}

impl BlockArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, block: Block) -> BlockId {
        let id = BlockId::new(self.nodes.len());
        self.nodes.push(block);
        id
    }

    #[must_use]
    pub fn get(&self, id: BlockId) -> &Block {
        &self.nodes[id.index()]
    }

    pub fn get_mut(&mut self, id: BlockId) -> &mut Block {
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
