//! Interned identifier names.
//!
//! Identifiers are compared and hashed constantly during scope resolution,
//! so names are interned once into a `StringTable` and passed around as
//! 4-byte `Atom` handles. Equal atoms imply equal strings.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// An interned string handle. Identity comparison implies string equality
/// within the owning `StringTable`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Atom(pub u32);

impl Atom {
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Append-only string interner.
#[derive(Debug, Default)]
pub struct StringTable {
    strings: Vec<String>,
    lookup: FxHashMap<String, Atom>,
}

impl StringTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string, returning the canonical atom for it.
    pub fn intern(&mut self, text: &str) -> Atom {
        if let Some(&atom) = self.lookup.get(text) {
            return atom;
        }
        let atom = Atom(self.strings.len() as u32);
        self.strings.push(text.to_string());
        self.lookup.insert(text.to_string(), atom);
        atom
    }

    /// Resolve an atom back to its string.
    ///
    /// # Panics
    ///
    /// Panics if the atom was not produced by this table.
    #[must_use]
    pub fn resolve(&self, atom: Atom) -> &str {
        &self.strings[atom.index()]
    }

    /// Look up an already-interned string without interning it.
    #[must_use]
    pub fn get(&self, text: &str) -> Option<Atom> {
        self.lookup.get(text).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
#[path = "tests/atom.rs"]
mod tests;
