//! Structured diagnostics produced by the binder.
//!
//! The binder fails fast: the first fatal semantic error aborts the pass and
//! is reported with the source line of the statement task that triggered it.
//! Unification failures additionally carry both datatypes rendered as text.

use crate::loc::Loc;
use serde::{Deserialize, Serialize};

/// The kind of a fatal binding error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// An identifier was never defined anywhere on the scope chain.
    UndefinedIdentifier,
    /// Two datatypes failed to unify.
    TypeMismatch,
    /// A cast between datatypes outside the legal cast families.
    InvalidCast,
    /// A call supplied too many positional arguments, or a named argument
    /// matched no parameter.
    WrongArity,
    /// A parameter was left unfilled and has no default initializer.
    MissingDefault,
    /// Printing or branching on a secret, marking an object reference
    /// secret, or shifting by a secret distance.
    SecretViolation,
    /// Constant folding would trap at run time.
    OverflowWouldOccur,
    /// Unreachable statement, missing return on a value-returning path, or
    /// yield outside an iterator.
    Reachability,
    /// More than one operator overload accepted the argument datatypes.
    AmbiguousOverload,
    /// The event engine made no progress while tasks remained parked.
    CyclicDependency,
    /// An operator that is not legal inside a modular expression.
    InvalidModularExpression,
}

impl ErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorKind::UndefinedIdentifier => "undefined-identifier",
            ErrorKind::TypeMismatch => "type-mismatch",
            ErrorKind::InvalidCast => "invalid-cast",
            ErrorKind::WrongArity => "wrong-arity",
            ErrorKind::MissingDefault => "missing-default",
            ErrorKind::SecretViolation => "secret-violation",
            ErrorKind::OverflowWouldOccur => "overflow-would-occur",
            ErrorKind::Reachability => "reachability",
            ErrorKind::AmbiguousOverload => "ambiguous-overload",
            ErrorKind::CyclicDependency => "cyclic-dependency",
            ErrorKind::InvalidModularExpression => "invalid-modular-expression",
        }
    }
}

/// A fatal binding error.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindError {
    pub kind: ErrorKind,
    pub message: String,
    pub loc: Loc,
    /// For unification failures: the two datatypes rendered as text,
    /// (prior, new).
    pub datatypes: Option<(String, String)>,
}

impl BindError {
    pub fn new(kind: ErrorKind, loc: Loc, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            loc,
            datatypes: None,
        }
    }

    /// Attach the rendered prior/new datatype pair of a unification failure.
    #[must_use]
    pub fn with_datatypes(mut self, prior: impl Into<String>, new: impl Into<String>) -> Self {
        self.datatypes = Some((prior.into(), new.into()));
        self
    }
}

impl std::fmt::Display for BindError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}: {}", self.loc, self.kind.as_str(), self.message)?;
        if let Some((prior, new)) = &self.datatypes {
            write!(f, " ({prior} vs {new})")?;
        }
        Ok(())
    }
}

impl std::error::Error for BindError {}

#[cfg(test)]
#[path = "tests/diagnostics.rs"]
mod tests;
