//! Print-format checking and rewriting.
//!
//! `%` conversions: `b` (bool), `s` (string), `i<width>` (signed integer),
//! `u<width>` (unsigned), `x<width>` (hex), `f` (float); a declared width
//! must equal the argument's width. Compound: `[…]` for arrays and
//! `(…,…)` for tuples, recursively. The binder rewrites the format string
//! to embed inferred widths for the code generator, and rejects secret
//! values outright.

use sable_common::{BindError, ErrorKind, Loc, SigId, StmtId};
use sable_tree::{ExprKind, StmtKind};
use sable_types::{TypeId, TypeKey};
use std::iter::Peekable;
use std::str::Chars;

use crate::state::{BindFailure, BindResult, Binder};

impl Binder<'_> {
    pub(crate) fn bind_print(
        &mut self,
        sig: SigId,
        stmt: StmtId,
        block: sable_common::BlockId,
    ) -> BindResult<()> {
        let (args, loc) = {
            let s = self.prog.stmts.get(stmt);
            let StmtKind::Print { ref args, .. } = s.kind else {
                unreachable!("print statement");
            };
            (args.clone(), s.loc)
        };
        let Some((&fmt_expr, rest)) = args.split_first() else {
            return Err(self.error(
                ErrorKind::TypeMismatch,
                loc,
                "print needs a format string",
            ));
        };
        self.bind_expr(sig, block, fmt_expr)?;
        let ExprKind::StrLit { value: fmt } = self.prog.exprs.get(fmt_expr).kind.clone() else {
            return Err(self.error(
                ErrorKind::TypeMismatch,
                loc,
                "the print format must be a constant string",
            ));
        };
        let mut arg_tys = Vec::with_capacity(rest.len());
        for &arg in rest {
            let ty = self.bind_expr(sig, block, arg)?;
            if self.prog.types.is_secret(ty) {
                let loc = self.prog.exprs.get(arg).loc;
                return Err(self.error(
                    ErrorKind::SecretViolation,
                    loc,
                    "cannot print a secret value",
                ));
            }
            arg_tys.push(ty);
        }
        let rewritten = self.check_format(&fmt, &arg_tys, loc)?;
        if let StmtKind::Print { rewritten: slot, .. } = &mut self.prog.stmts.get_mut(stmt).kind {
            *slot = Some(rewritten);
        }
        Ok(())
    }

    /// Validate the conversions against successive argument datatypes and
    /// return the format with inferred widths embedded.
    fn check_format(&self, fmt: &str, args: &[TypeId], loc: Loc) -> BindResult<String> {
        let mut out = String::with_capacity(fmt.len());
        let mut chars = fmt.chars().peekable();
        let mut next = 0usize;
        while let Some(c) = chars.next() {
            out.push(c);
            if c != '%' {
                continue;
            }
            if chars.peek() == Some(&'%') {
                chars.next();
                out.push('%');
                continue;
            }
            if next >= args.len() {
                return Err(self.error(
                    ErrorKind::WrongArity,
                    loc,
                    "format string has more conversions than arguments",
                ));
            }
            self.check_conversion(&mut chars, &mut out, args[next], loc)?;
            next += 1;
        }
        if next != args.len() {
            return Err(self.error(
                ErrorKind::WrongArity,
                loc,
                "format string has fewer conversions than arguments",
            ));
        }
        Ok(out)
    }

    fn check_conversion(
        &self,
        chars: &mut Peekable<Chars<'_>>,
        out: &mut String,
        ty: TypeId,
        loc: Loc,
    ) -> BindResult<()> {
        let Some(c) = chars.next() else {
            return Err(self.error(ErrorKind::TypeMismatch, loc, "dangling % in format string"));
        };
        match c {
            'b' => {
                out.push(c);
                self.expect_format_type(
                    matches!(self.prog.types.key(ty), TypeKey::Bool { .. }),
                    "b",
                    ty,
                    loc,
                )
            }
            's' => {
                out.push(c);
                self.expect_format_type(
                    matches!(self.prog.types.key(ty), TypeKey::Str { .. }),
                    "s",
                    ty,
                    loc,
                )
            }
            'f' => {
                out.push(c);
                self.expect_format_type(
                    matches!(self.prog.types.key(ty), TypeKey::Float { .. }),
                    "f",
                    ty,
                    loc,
                )
            }
            'i' | 'u' | 'x' => {
                out.push(c);
                let declared = take_digits(chars);
                let matches_sign = match c {
                    'i' => matches!(self.prog.types.key(ty), TypeKey::Int { .. }),
                    _ => matches!(self.prog.types.key(ty), TypeKey::Uint { .. }),
                };
                self.expect_format_type(matches_sign, &c.to_string(), ty, loc)?;
                let width = self.prog.types.width(ty).expect("integer has width");
                match declared {
                    Some(declared) if declared != width => Err(self.error(
                        ErrorKind::TypeMismatch,
                        loc,
                        format!(
                            "format width {declared} does not match argument width {width}"
                        ),
                    )),
                    _ => {
                        // The rewrite embeds the inferred width.
                        out.push_str(&width.to_string());
                        Ok(())
                    }
                }
            }
            '[' => {
                out.push(c);
                let TypeKey::Array { elem } = self.prog.types.key(ty) else {
                    return Err(self.format_mismatch("[", ty, loc));
                };
                self.check_conversion(chars, out, elem, loc)?;
                match chars.next() {
                    Some(']') => {
                        out.push(']');
                        Ok(())
                    }
                    _ => Err(self.error(
                        ErrorKind::TypeMismatch,
                        loc,
                        "unterminated array conversion in format string",
                    )),
                }
            }
            '(' => {
                out.push(c);
                let TypeKey::Tuple { elems } = self.prog.types.key(ty) else {
                    return Err(self.format_mismatch("(", ty, loc));
                };
                for (index, &elem) in elems.iter().enumerate() {
                    if index > 0 {
                        match chars.next() {
                            Some(',') => out.push(','),
                            _ => {
                                return Err(self.error(
                                    ErrorKind::TypeMismatch,
                                    loc,
                                    "tuple conversion arity does not match the tuple",
                                ));
                            }
                        }
                    }
                    self.check_conversion(chars, out, elem, loc)?;
                }
                match chars.next() {
                    Some(')') => {
                        out.push(')');
                        Ok(())
                    }
                    _ => Err(self.error(
                        ErrorKind::TypeMismatch,
                        loc,
                        "unterminated tuple conversion in format string",
                    )),
                }
            }
            other => Err(self.error(
                ErrorKind::TypeMismatch,
                loc,
                format!("unknown format conversion %{other}"),
            )),
        }
    }

    fn expect_format_type(
        &self,
        ok: bool,
        conversion: &str,
        ty: TypeId,
        loc: Loc,
    ) -> BindResult<()> {
        if ok {
            Ok(())
        } else {
            Err(self.format_mismatch(conversion, ty, loc))
        }
    }

    fn format_mismatch(&self, conversion: &str, ty: TypeId, loc: Loc) -> BindFailure {
        BindFailure::Error(BindError::new(
            ErrorKind::TypeMismatch,
            loc,
            format!(
                "format conversion %{conversion} does not accept {}",
                self.prog.render_type(ty)
            ),
        ))
    }
}

fn take_digits(chars: &mut Peekable<Chars<'_>>) -> Option<u32> {
    let mut digits = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() {
            digits.push(c);
            chars.next();
        } else {
            break;
        }
    }
    digits.parse().ok()
}
