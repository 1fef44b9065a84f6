//! Emission entry point and its result.

use evgen_types::ir::Program;
use evgen_types::Backend;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::dialect::{Dialect, JsDialect, NativeDialect};
use crate::emitter::Emitter;
use crate::error::CodegenResult;
use crate::source_map::SourceMap;

/// Per-call emission settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmitOptions {
    /// Name of the generated entry function. Defaults to the dialect's.
    #[serde(default)]
    pub entry_point: Option<String>,
}

/// Source generated for one backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedCode {
    pub backend: Backend,
    pub source: String,
    pub source_map: SourceMap,
    /// SHA-256 of `source`, lowercase hex.
    pub hash: String,
}

/// The dialect emitting for `backend`.
pub fn dialect_for(backend: Backend) -> &'static dyn Dialect {
    match backend {
        Backend::Native => &NativeDialect,
        Backend::Js => &JsDialect,
    }
}

/// Emit `program` for `backend`.
///
/// Fails only if the program references a symbol the backend lacks, which
/// the compiler reports as a diagnostic before emission.
pub fn emit(
    program: &Program,
    backend: Backend,
    options: &EmitOptions,
) -> CodegenResult<GeneratedCode> {
    let dialect = dialect_for(backend);
    let entry_point = options
        .entry_point
        .as_deref()
        .unwrap_or_else(|| dialect.default_entry_point());
    let (source, source_map) = Emitter::new(program, dialect).run(entry_point)?;
    let hash = sha256_hex(&source);
    debug!(
        target: "codegen",
        backend = backend.name(),
        bytes = source.len(),
        events = source_map.entries.len(),
        hash = %hash,
        "emitted program"
    );
    Ok(GeneratedCode {
        backend,
        source,
        source_map,
        hash,
    })
}

pub fn sha256_hex(text: &str) -> String {
    Sha256::digest(text.as_bytes())
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}
