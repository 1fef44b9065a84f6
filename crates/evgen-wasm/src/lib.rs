//! evgen compiler as a WASM module for the browser-hosted editor.
//!
//! This crate exposes the compilation pipeline via `wasm-bindgen`, suitable
//! for running in a Web Worker next to the event sheet.
//!
//! # Usage (JavaScript)
//!
//! ```js
//! import init, { compile, check } from 'evgen-wasm';
//!
//! await init();
//!
//! const result = JSON.parse(compile(JSON.stringify({
//!   events: [...],
//!   objects: { objects: { Hero: { type: "Sprite" } } },
//!   globals: [{ name: "Score", type: "number", value: 0 }],
//!   options: { backends: ["js"] },
//! })));
//! // { success: true, outputs: [{ backend: "js", source: "...", hash: "..." }], diagnostics: { ... } }
//! ```

use evgen_compiler::{Catalog, CompileError, CompileRequest, EVGEN_VERSION};
use evgen_types::Diagnostics;
use serde::Serialize;
use serde_json::json;
use wasm_bindgen::prelude::*;

/// Compile a JSON `CompileRequest` to code for every requested backend.
///
/// Returns a JSON string containing a `CompileResult`:
/// ```json
/// {
///   "success": true,
///   "outputs": [{ "backend": "js", "source": "...", "source_map": { ... }, "hash": "..." }],
///   "diagnostics": { "entries": [], "total_errors": 0, "total_warnings": 0 },
///   "event_count": 3
/// }
/// ```
///
/// A request that cannot be read yields `success: false`, no outputs and an
/// `error` field describing the problem.
#[wasm_bindgen]
pub fn compile(request_json: &str) -> String {
    match evgen_compiler::compile_json(request_json) {
        Ok(result) => to_json(&result),
        Err(e) => json!({
            "success": false,
            "outputs": [],
            "diagnostics": Diagnostics::empty(),
            "event_count": 0,
            "error": e.to_string(),
        })
        .to_string(),
    }
}

/// Check a JSON `CompileRequest` without generating code.
///
/// Returns the `Diagnostics` report as JSON. Faster than [`compile`] when
/// only diagnostics are needed (e.g. while the user edits a parameter).
#[wasm_bindgen]
pub fn check(request_json: &str) -> String {
    match evgen_compiler::check_json(request_json) {
        Ok(diagnostics) => to_json(&diagnostics),
        Err(e) => json!({
            "entries": [],
            "total_errors": 0,
            "total_warnings": 0,
            "error": e.to_string(),
        })
        .to_string(),
    }
}

/// Compile a request passed as a JavaScript object, returning the
/// `CompileResult` as a JavaScript object.
///
/// Avoids the JSON round-trip when the editor already holds the tree as
/// plain objects. Unreadable requests and emitter failures reject with a
/// message string.
#[wasm_bindgen]
pub fn compile_value(request: JsValue) -> Result<JsValue, JsValue> {
    let request: CompileRequest = serde_wasm_bindgen::from_value(request)?;
    let result = request.compile().map_err(error_value)?;
    Ok(serde_wasm_bindgen::to_value(&result)?)
}

/// Return the compiler version string.
#[wasm_bindgen]
pub fn version() -> String {
    EVGEN_VERSION.to_string()
}

/// Return a structured JSON table of the built-in catalog for tooling and
/// documentation.
///
/// Contains every condition, action and expression with its signature,
/// description and supported backends.
#[wasm_bindgen]
pub fn catalog_table() -> String {
    evgen_compiler::generate_catalog_table(&Catalog::builtin())
}

/// Return the compact text reference of the built-in catalog, for editor
/// help panels.
#[wasm_bindgen]
pub fn reference() -> String {
    evgen_compiler::generate_reference(&Catalog::builtin())
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        json!({
            "success": false,
            "error": format!("serialization error: {e}"),
        })
        .to_string()
    })
}

fn error_value(error: CompileError) -> JsValue {
    JsValue::from_str(&error.to_string())
}
