//! Generic class templates and their concrete instantiations.
//!
//! A tclass is a reusable constructor template, parametric over the types of
//! its non-self parameters. A Class is one concrete instantiation; classes
//! are hash-consed on the tclass plus the constructor parameter datatype
//! vector, so two constructor calls with identical parameter types yield the
//! same Class. Classes live in a central pool and reference each other
//! through stable handles, which is what lets parent/child relation graphs
//! be cyclic.

use indexmap::IndexMap;
use sable_common::{Atom, BlockId, ClassId, FuncId, SigId, TclassId};
use sable_types::TypeId;

/// A generic class template.
#[derive(Debug)]
pub struct Tclass {
    pub name: Atom,
    pub constructor: FuncId,
    /// Bit width of this template's object references.
    pub ref_width: u32,
    pub ref_counted: bool,
    /// The class produced by a zero-argument constructor call, if the
    /// template is instantiable with no arguments.
    pub default_class: Option<ClassId>,
    /// Concrete instantiations, keyed by the constructor parameter
    /// datatype vector after null-type resolution.
    pub classes: IndexMap<Vec<TypeId>, ClassId>,
    /// The `values()` iterator used by `for x in obj`: user-defined, or
    /// synthesized on demand.
    pub values_iter: Option<FuncId>,
}

impl Tclass {
    #[must_use]
    pub fn new(name: Atom, constructor: FuncId, ref_width: u32, ref_counted: bool) -> Self {
        Tclass {
            name,
            constructor,
            ref_width,
            ref_counted,
            default_class: None,
            classes: IndexMap::new(),
            values_iter: None,
        }
    }

    #[must_use]
    pub fn find_class(&self, params: &[TypeId]) -> Option<ClassId> {
        self.classes.get(params).copied()
    }
}

/// A concrete instantiation of a tclass for one constructor signature.
#[derive(Debug)]
pub struct Class {
    pub tclass: TclassId,
    /// The constructor signature that determines this class.
    pub sig: SigId,
    /// Member block: variables discovered from `self.x = …` assignments in
    /// the constructor body, plus relation-generated fields.
    pub members: BlockId,
    pub bound: bool,
}

/// Arena of tclasses.
#[derive(Debug, Default)]
pub struct TclassArena {
    nodes: Vec<Tclass>,
}

impl TclassArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, tclass: Tclass) -> TclassId {
        let id = TclassId::new(self.nodes.len());
        self.nodes.push(tclass);
        id
    }

    #[must_use]
    pub fn get(&self, id: TclassId) -> &Tclass {
        &self.nodes[id.index()]
    }

    pub fn get_mut(&mut self, id: TclassId) -> &mut Tclass {
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

/// Central pool of concrete classes.
#[derive(Debug, Default)]
pub struct ClassArena {
    nodes: Vec<Class>,
}

impl ClassArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, class: Class) -> ClassId {
        let id = ClassId::new(self.nodes.len());
        self.nodes.push(class);
        id
    }

    #[must_use]
    pub fn get(&self, id: ClassId) -> &Class {
        &self.nodes[id.index()]
    }

    pub fn get_mut(&mut self, id: ClassId) -> &mut Class {
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
