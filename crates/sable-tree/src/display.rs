//! Program-aware datatype rendering for diagnostics.

use crate::program::Program;
use sable_types::{TypeId, TypeKey};

impl Program {
    /// Render a datatype the way it reads in source: `u32`, `secret u64`,
    /// `[u8]`, `(u32, bool)`, `Point(u32, u32)`, `null(Point)`.
    #[must_use]
    pub fn render_type(&self, id: TypeId) -> String {
        match self.types.key(id) {
            TypeKey::None => "none".to_string(),
            TypeKey::Bool { secret } => prefixed(secret, "bool"),
            TypeKey::Uint { width, secret } => prefixed(secret, &format!("u{width}")),
            TypeKey::Int { width, secret } => prefixed(secret, &format!("i{width}")),
            TypeKey::Float { width } => format!("f{width}"),
            TypeKey::Str { secret } => prefixed(secret, "string"),
            TypeKey::Array { elem } => format!("[{}]", self.render_type(elem)),
            TypeKey::Tuple { elems } => {
                let inner: Vec<String> = elems.iter().map(|&e| self.render_type(e)).collect();
                format!("({})", inner.join(", "))
            }
            TypeKey::Struct { fields } => {
                let inner: Vec<String> = fields
                    .iter()
                    .map(|&(name, ty)| {
                        format!("{}: {}", self.strings.resolve(name), self.render_type(ty))
                    })
                    .collect();
                format!("struct({})", inner.join(", "))
            }
            TypeKey::Class {
                tclass,
                sig,
                nullable,
            } => {
                let name = self.strings.resolve(self.tclasses.get(tclass).name);
                let params: Vec<String> = self
                    .sigs
                    .get(sig)
                    .params
                    .iter()
                    .map(|p| self.render_type(p.ty))
                    .collect();
                let suffix = if nullable { "?" } else { "" };
                format!("{name}({}){suffix}", params.join(", "))
            }
            TypeKey::NullClass { tclass } => {
                format!("null({})", self.strings.resolve(self.tclasses.get(tclass).name))
            }
            TypeKey::Tclass { tclass } => self
                .strings
                .resolve(self.tclasses.get(tclass).name)
                .to_string(),
            TypeKey::Function { func } => {
                format!("func {}", self.strings.resolve(self.funcs.get(func).name))
            }
            TypeKey::Funcptr { ret, params } => {
                let inner: Vec<String> = params.iter().map(|&p| self.render_type(p)).collect();
                format!("&({}) -> {}", inner.join(", "), self.render_type(ret))
            }
            TypeKey::Enum { func } | TypeKey::EnumClass { func } => {
                format!("enum {}", self.strings.resolve(self.funcs.get(func).name))
            }
            TypeKey::Modint { modulus } => format!("modint#{}", modulus.0),
        }
    }
}

fn prefixed(secret: bool, base: &str) -> String {
    if secret {
        format!("secret {base}")
    } else {
        base.to_string()
    }
}
