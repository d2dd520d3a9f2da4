use std::fmt;

use crate::Span;

/// Failures surfaced by the compilation passes in this crate.
///
/// Parse and resolution errors inside the front end are reported by
/// `neoparse` with full source excerpts; by the time an AST reaches these
/// passes, the remaining failures are either unimplemented lowerings,
/// unsupported instruction selections, or internal invariant breaks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// A required symbol is missing or of the wrong kind.
    Resolve(String),
    /// The AST shape has no IR lowering.
    Lower(String, Span),
    /// The IR instruction has no assembly selection.
    Codegen(String),
    /// An internal invariant was broken. Not reachable from well-formed input.
    Bug(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Resolve(msg) => write!(f, "{}", msg),
            Error::Lower(msg, span) => {
                write!(f, "at line {}, col {}: {}", span.line, span.col, msg)
            }
            Error::Codegen(msg) => write!(f, "{}", msg),
            Error::Bug(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}
