//! Hash-consing datatype interner.
//!
//! Construction goes through the factory methods, which fold the variant
//! tag, widths, secrecy, nullability, and component identities into one
//! canonical `TypeId` per structure. Factory methods take `&self`: the
//! interner is the one table that must be reachable while tree arenas are
//! mutably borrowed, so it keeps its own sharded interior mutability.

use dashmap::DashMap;
use rustc_hash::FxBuildHasher;
use sable_common::{Atom, ExprId, FuncId, SigId, TclassId};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// Handle of an interned datatype. Identity implies structural equality.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeId(pub u32);

impl TypeId {
    /// The empty datatype: functions with no return value, statements.
    pub const NONE: TypeId = TypeId(0);
    pub const BOOL: TypeId = TypeId(1);
    pub const STRING: TypeId = TypeId(2);
    pub const U8: TypeId = TypeId(3);
    pub const U16: TypeId = TypeId(4);
    pub const U32: TypeId = TypeId(5);
    pub const U64: TypeId = TypeId(6);
    pub const I8: TypeId = TypeId(7);
    pub const I16: TypeId = TypeId(8);
    pub const I32: TypeId = TypeId(9);
    pub const I64: TypeId = TypeId(10);
    pub const F32: TypeId = TypeId(11);
    pub const F64: TypeId = TypeId(12);

    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// The structural key of a datatype.
///
/// Widths are always > 0 for Uint/Int/Float. Nullability is a flag on Class
/// only. Modint appears only inside modular sub-expressions and carries the
/// expression handle of its modulus.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKey {
    None,
    Bool { secret: bool },
    Uint { width: u32, secret: bool },
    Int { width: u32, secret: bool },
    Float { width: u32 },
    Str { secret: bool },
    Array { elem: TypeId },
    Tuple { elems: Vec<TypeId> },
    Struct { fields: Vec<(Atom, TypeId)> },
    Class { tclass: TclassId, sig: SigId, nullable: bool },
    /// "Some class of this template, not yet chosen." The bottom of the
    /// class sub-lattice, refined upward by any concrete Class of the same
    /// tclass.
    NullClass { tclass: TclassId },
    /// A bare template used as a type expression.
    Tclass { tclass: TclassId },
    Function { func: FuncId },
    Funcptr { ret: TypeId, params: Vec<TypeId> },
    Enum { func: FuncId },
    EnumClass { func: FuncId },
    Modint { modulus: ExprId },
}

type KeyMap = DashMap<TypeKey, TypeId, FxBuildHasher>;

/// Hash-consing interner for datatypes.
///
/// The intrinsic scalar types are pre-registered at fixed `TypeId`s so they
/// can be named as constants before any user type exists.
#[derive(Debug)]
pub struct TypeInterner {
    lookup: KeyMap,
    keys: RwLock<Vec<TypeKey>>,
}

impl Default for TypeInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeInterner {
    #[must_use]
    pub fn new() -> Self {
        let interner = TypeInterner {
            lookup: KeyMap::default(),
            keys: RwLock::new(Vec::new()),
        };
        // Registration order must match the TypeId constants.
        let intrinsics = [
            TypeKey::None,
            TypeKey::Bool { secret: false },
            TypeKey::Str { secret: false },
            TypeKey::Uint {
                width: 8,
                secret: false,
            },
            TypeKey::Uint {
                width: 16,
                secret: false,
            },
            TypeKey::Uint {
                width: 32,
                secret: false,
            },
            TypeKey::Uint {
                width: 64,
                secret: false,
            },
            TypeKey::Int {
                width: 8,
                secret: false,
            },
            TypeKey::Int {
                width: 16,
                secret: false,
            },
            TypeKey::Int {
                width: 32,
                secret: false,
            },
            TypeKey::Int {
                width: 64,
                secret: false,
            },
            TypeKey::Float { width: 32 },
            TypeKey::Float { width: 64 },
        ];
        for key in intrinsics {
            interner.intern(key);
        }
        interner
    }

    /// Intern a structural key, returning its canonical id.
    pub fn intern(&self, key: TypeKey) -> TypeId {
        if let Some(id) = self.lookup.get(&key) {
            return *id;
        }
        let mut keys = self.keys.write().unwrap();
        // Racing writers are impossible (single-writer binder), but the
        // entry API keeps the map and vector consistent regardless.
        *self.lookup.entry(key.clone()).or_insert_with(|| {
            let id = TypeId(keys.len() as u32);
            keys.push(key);
            id
        })
    }

    /// Resolve an id back to its structural key.
    #[must_use]
    pub fn lookup(&self, id: TypeId) -> Option<TypeKey> {
        self.keys.read().unwrap().get(id.index()).cloned()
    }

    /// Structural key of an id that is known to be valid.
    ///
    /// # Panics
    ///
    /// Panics if the id was not produced by this interner.
    #[must_use]
    pub fn key(&self, id: TypeId) -> TypeKey {
        self.lookup(id).expect("datatype id not interned")
    }

    /// Snapshot of every interned key, in id order. This is the interner
    /// state handed to the code generator.
    #[must_use]
    pub fn snapshot(&self) -> Vec<TypeKey> {
        self.keys.read().unwrap().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.read().unwrap().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // =========================================================================
    // Factory methods
    // =========================================================================

    pub fn uint(&self, width: u32) -> TypeId {
        debug_assert!(width > 0);
        self.intern(TypeKey::Uint {
            width,
            secret: false,
        })
    }

    pub fn int(&self, width: u32) -> TypeId {
        debug_assert!(width > 0);
        self.intern(TypeKey::Int {
            width,
            secret: false,
        })
    }

    pub fn float(&self, width: u32) -> TypeId {
        debug_assert!(width == 32 || width == 64);
        self.intern(TypeKey::Float { width })
    }

    pub fn array(&self, elem: TypeId) -> TypeId {
        self.intern(TypeKey::Array { elem })
    }

    pub fn tuple(&self, elems: Vec<TypeId>) -> TypeId {
        self.intern(TypeKey::Tuple { elems })
    }

    pub fn struct_type(&self, fields: Vec<(Atom, TypeId)>) -> TypeId {
        self.intern(TypeKey::Struct { fields })
    }

    pub fn class(&self, tclass: TclassId, sig: SigId, nullable: bool) -> TypeId {
        self.intern(TypeKey::Class {
            tclass,
            sig,
            nullable,
        })
    }

    pub fn null_class(&self, tclass: TclassId) -> TypeId {
        self.intern(TypeKey::NullClass { tclass })
    }

    pub fn tclass(&self, tclass: TclassId) -> TypeId {
        self.intern(TypeKey::Tclass { tclass })
    }

    pub fn function(&self, func: FuncId) -> TypeId {
        self.intern(TypeKey::Function { func })
    }

    pub fn funcptr(&self, ret: TypeId, params: Vec<TypeId>) -> TypeId {
        self.intern(TypeKey::Funcptr { ret, params })
    }

    pub fn enum_value(&self, func: FuncId) -> TypeId {
        self.intern(TypeKey::Enum { func })
    }

    pub fn enum_class(&self, func: FuncId) -> TypeId {
        self.intern(TypeKey::EnumClass { func })
    }

    pub fn modint(&self, modulus: ExprId) -> TypeId {
        self.intern(TypeKey::Modint { modulus })
    }

    // =========================================================================
    // Rewriters - produce a new interned value with one attribute changed
    // =========================================================================

    /// Set or clear the secret flag, recursing through arrays and tuples so
    /// the flag lands on the numeric leaves. Types that cannot carry secrecy
    /// are returned unchanged; `secretable` is the guard callers use first.
    pub fn with_secret(&self, id: TypeId, secret: bool) -> TypeId {
        match self.key(id) {
            TypeKey::Bool { .. } => self.intern(TypeKey::Bool { secret }),
            TypeKey::Uint { width, .. } => self.intern(TypeKey::Uint { width, secret }),
            TypeKey::Int { width, .. } => self.intern(TypeKey::Int { width, secret }),
            TypeKey::Str { .. } => self.intern(TypeKey::Str { secret }),
            TypeKey::Array { elem } => {
                let elem = self.with_secret(elem, secret);
                self.array(elem)
            }
            TypeKey::Tuple { elems } => {
                let elems = elems
                    .into_iter()
                    .map(|e| self.with_secret(e, secret))
                    .collect();
                self.tuple(elems)
            }
            TypeKey::Struct { fields } => {
                let fields = fields
                    .into_iter()
                    .map(|(name, ty)| (name, self.with_secret(ty, secret)))
                    .collect();
                self.struct_type(fields)
            }
            _ => id,
        }
    }

    /// Resize an integer type, keeping sign and secrecy.
    pub fn with_width(&self, id: TypeId, width: u32) -> TypeId {
        debug_assert!(width > 0);
        match self.key(id) {
            TypeKey::Uint { secret, .. } => self.intern(TypeKey::Uint { width, secret }),
            TypeKey::Int { secret, .. } => self.intern(TypeKey::Int { width, secret }),
            TypeKey::Float { .. } => self.intern(TypeKey::Float { width }),
            _ => id,
        }
    }

    /// Flip an integer type to signed or unsigned, keeping width and secrecy.
    pub fn with_signed(&self, id: TypeId, signed: bool) -> TypeId {
        match self.key(id) {
            TypeKey::Uint { width, secret } if signed => {
                self.intern(TypeKey::Int { width, secret })
            }
            TypeKey::Int { width, secret } if !signed => {
                self.intern(TypeKey::Uint { width, secret })
            }
            _ => id,
        }
    }

    /// Set or clear the nullable flag of a class type.
    pub fn with_nullable(&self, id: TypeId, nullable: bool) -> TypeId {
        match self.key(id) {
            TypeKey::Class { tclass, sig, .. } => self.class(tclass, sig, nullable),
            _ => id,
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Is any leaf of this datatype secret?
    #[must_use]
    pub fn is_secret(&self, id: TypeId) -> bool {
        match self.key(id) {
            TypeKey::Bool { secret }
            | TypeKey::Uint { secret, .. }
            | TypeKey::Int { secret, .. }
            | TypeKey::Str { secret } => secret,
            TypeKey::Array { elem } => self.is_secret(elem),
            TypeKey::Tuple { elems } => elems.iter().any(|&e| self.is_secret(e)),
            TypeKey::Struct { fields } => fields.iter().any(|&(_, ty)| self.is_secret(ty)),
            _ => false,
        }
    }

    /// Can `secret(…)` be applied to a value of this datatype? Object
    /// references are never markable, and neither is any aggregate that
    /// contains one.
    #[must_use]
    pub fn secretable(&self, id: TypeId) -> bool {
        match self.key(id) {
            TypeKey::Bool { .. }
            | TypeKey::Uint { .. }
            | TypeKey::Int { .. }
            | TypeKey::Str { .. } => true,
            TypeKey::Array { elem } => self.secretable(elem),
            TypeKey::Tuple { elems } => elems.iter().all(|&e| self.secretable(e)),
            TypeKey::Struct { fields } => fields.iter().all(|&(_, ty)| self.secretable(ty)),
            _ => false,
        }
    }

    /// Bit width of a scalar numeric type.
    #[must_use]
    pub fn width(&self, id: TypeId) -> Option<u32> {
        match self.key(id) {
            TypeKey::Uint { width, .. }
            | TypeKey::Int { width, .. }
            | TypeKey::Float { width } => Some(width),
            TypeKey::Bool { .. } => Some(1),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_integer(&self, id: TypeId) -> bool {
        matches!(self.key(id), TypeKey::Uint { .. } | TypeKey::Int { .. })
    }

    #[must_use]
    pub fn is_uint(&self, id: TypeId) -> bool {
        matches!(self.key(id), TypeKey::Uint { .. })
    }

    #[must_use]
    pub fn is_numeric(&self, id: TypeId) -> bool {
        matches!(
            self.key(id),
            TypeKey::Uint { .. } | TypeKey::Int { .. } | TypeKey::Float { .. }
        )
    }

    #[must_use]
    pub fn is_class(&self, id: TypeId) -> bool {
        matches!(self.key(id), TypeKey::Class { .. })
    }

    #[must_use]
    pub fn is_null_class(&self, id: TypeId) -> bool {
        matches!(self.key(id), TypeKey::NullClass { .. })
    }

    /// The tclass behind a Class, NullClass, or bare Tclass type.
    #[must_use]
    pub fn tclass_of(&self, id: TypeId) -> Option<TclassId> {
        match self.key(id) {
            TypeKey::Class { tclass, .. }
            | TypeKey::NullClass { tclass }
            | TypeKey::Tclass { tclass } => Some(tclass),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "tests/intern_tests.rs"]
mod tests;
