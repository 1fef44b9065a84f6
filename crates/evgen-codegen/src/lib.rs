//! evgen code emitter: turns a resolved [`evgen_types::ir::Program`] into
//! source code for one backend.
//!
//! # Architecture
//!
//! One generic emitter ([`emitter`]) walks the program and writes through a
//! [`Dialect`]. Each dialect knows only its host language and runtime access
//! idioms; instruction symbols come from the per-backend table attached to
//! every call in the program. Adding a backend means adding a dialect.
//!
//! ## Runtime model
//!
//! - Every object has a *picked list* of instances. A root event starts from
//!   all instances in the scene; a sub-event starts from a copy of its
//!   parent's lists.
//! - An object condition filters the lists of the object (or of every group
//!   member) and holds when any instance remains.
//! - An object action runs once per picked instance.
//! - Local variables and loop indices become event-scoped variables.
//!
//! Output for a given program and backend is byte-stable; [`GeneratedCode`]
//! carries a SHA-256 of the source.

mod emitter;
mod writer;

pub mod dialect;
pub mod error;
pub mod output;
pub mod source_map;

pub use dialect::{Dialect, JsDialect, NativeDialect};
pub use error::{CodegenError, CodegenResult};
pub use output::{dialect_for, emit, sha256_hex, EmitOptions, GeneratedCode};
pub use source_map::{SourceMap, SourceMapEntry};
