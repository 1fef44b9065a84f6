//! Shared types for the evgen compiler.
//!
//! This crate defines the event tree model consumed by the compiler, the
//! expression AST, the backend-agnostic resolved IR handed to the code
//! emitters and the evaluator, source locations, and diagnostics.

mod backend;
mod diagnostic;
mod location;
mod variable;
pub mod event;
pub mod expr;
pub mod ir;

pub use backend::{Backend, BackendSymbols, UnknownBackend};
pub use diagnostic::{
    Diagnostic, DiagnosticCategory, DiagnosticKind, Diagnostics, ErrorCode, Severity,
};
pub use location::{EventPath, Location, Site, Span};
pub use variable::{format_number, NamedVariable, Variable, VariablesContainer};

/// Result type used by fallible helpers that report a single diagnostic.
pub type Result<T> = std::result::Result<T, Diagnostic>;
