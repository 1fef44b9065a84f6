//! Codegen error types.

use thiserror::Error;

/// Errors that can occur while emitting source for one backend.
///
/// The compiler only hands fully bound programs to the emitter, so these
/// indicate an inconsistent program or catalog rather than an authoring
/// mistake.
#[derive(Debug, Error)]
pub enum CodegenError {
    /// A catalog symbol has no implementation for the requested backend.
    #[error("unresolved symbol: {0}")]
    UnresolvedSymbol(String),

    /// An object list was referenced outside of any event that picks it.
    #[error("object '{0}' is not picked in this event")]
    UnknownObject(String),

    /// An internal consistency check failed.
    #[error("internal codegen error: {0}")]
    Internal(String),
}

/// Codegen result type alias.
pub type CodegenResult<T> = Result<T, CodegenError>;
