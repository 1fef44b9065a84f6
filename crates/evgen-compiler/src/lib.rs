//! evgen compiler: orchestrates the full compilation pipeline.
//!
//! ```text
//! EventList ─ Walker ─┬─ Resolver (instructions) ─┐
//!                     ├─ Checker (expressions)    ├─ Program ─ Emitter × backends ─ GeneratedCode
//!                     └─ ScopeStack (variables)  ─┘
//! ```
//!
//! Compilation is best-effort: every problem becomes a [`Diagnostic`], the
//! offending instruction is left out, and the rest of the tree still
//! compiles. Only exceeding the maximum depth and cancellation stop a run;
//! neither produces code.

pub mod catalog;
mod checker;
pub mod options;
pub mod reference;
pub mod registry;
mod resolver;
pub mod scope;
mod walker;

use evgen_codegen::{CodegenError, EmitOptions};
use evgen_types::event::EventList;
use evgen_types::ir::Program;
use evgen_types::{Diagnostic, Diagnostics, ErrorCode, EventPath, Location, VariablesContainer};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

pub use catalog::{
    Catalog, CodegenStyle, ExpressionMetadata, ExpressionOwner, InstructionMetadata,
    ParameterKind, ParameterMetadata,
};
pub use evgen_codegen::{GeneratedCode, SourceMap, SourceMapEntry};
pub use options::{CancellationToken, CompileOptions};
pub use reference::{generate_catalog_table, generate_reference};
pub use registry::{AutomatismDecl, ObjectDecl, ObjectRegistry};

use walker::{Abort, Walker};

/// Version of the compiler, reported in the catalog table and by the
/// browser bridge.
pub const EVGEN_VERSION: &str = env!("CARGO_PKG_VERSION");

// ══════════════════════════════════════════════════════════════════════════════
// Results
// ══════════════════════════════════════════════════════════════════════════════

/// Why a run stopped without producing code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    Cancelled,
    MaxDepthExceeded,
}

/// The resolved program and the diagnostics of binding it.
#[derive(Debug, Clone, PartialEq)]
pub struct Lowered {
    /// `None` when the run was aborted.
    pub program: Option<Program>,
    pub diagnostics: Diagnostics,
    pub aborted: Option<AbortReason>,
}

/// Structured compilation result, serialized for the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompileResult {
    /// No error diagnostics and the run was not aborted.
    pub success: bool,
    /// One entry per requested backend; empty when aborted.
    pub outputs: Vec<GeneratedCode>,
    pub diagnostics: Diagnostics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aborted: Option<AbortReason>,
    /// Number of events that made it into the program.
    pub event_count: usize,
}

impl CompileResult {
    pub fn output(&self, backend: evgen_types::Backend) -> Option<&GeneratedCode> {
        self.outputs.iter().find(|o| o.backend == backend)
    }
}

/// Failures that are not authoring problems.
#[derive(Debug, Error)]
pub enum CompileError {
    /// The request could not be read.
    #[error("invalid compile request: {0}")]
    Input(#[from] serde_json::Error),

    /// The emitter rejected a resolved program.
    #[error(transparent)]
    Codegen(#[from] CodegenError),
}

// ══════════════════════════════════════════════════════════════════════════════
// Compiler
// ══════════════════════════════════════════════════════════════════════════════

/// A compiler session over one catalog and one object registry.
///
/// ```ignore
/// let catalog = Catalog::builtin();
/// let registry = ObjectRegistry::new().with_object("Hero", "Sprite");
/// let result = Compiler::new(&catalog, &registry).compile(&events)?;
/// ```
pub struct Compiler<'a> {
    catalog: &'a Catalog,
    registry: &'a ObjectRegistry,
    globals: VariablesContainer,
    options: CompileOptions,
    cancellation: Option<CancellationToken>,
}

impl<'a> Compiler<'a> {
    pub fn new(catalog: &'a Catalog, registry: &'a ObjectRegistry) -> Self {
        Self {
            catalog,
            registry,
            globals: VariablesContainer::default(),
            options: CompileOptions::default(),
            cancellation: None,
        }
    }

    /// Scene variables visible to every event.
    pub fn with_globals(mut self, globals: VariablesContainer) -> Self {
        self.globals = globals;
        self
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Bind the whole tree without emitting code.
    pub fn lower(&self, events: &EventList) -> Lowered {
        let scope = scope::ScopeStack::new(&self.globals);
        let outcome = Walker::new(
            self.catalog,
            self.registry,
            &self.options,
            scope,
            self.cancellation.as_ref(),
        )
        .walk(events);

        let mut diagnostics = outcome.diagnostics;
        let aborted = match outcome.aborted {
            None => None,
            Some(Abort::Cancelled) => {
                diagnostics.push(Diagnostic::new(
                    ErrorCode::CANCELLED,
                    "compilation cancelled; no code was generated",
                    Location::event(EventPath::root()),
                ));
                Some(AbortReason::Cancelled)
            }
            Some(Abort::MaxDepth) => Some(AbortReason::MaxDepthExceeded),
        };
        Lowered {
            program: aborted.is_none().then_some(outcome.program),
            diagnostics,
            aborted,
        }
    }

    /// Diagnostics only.
    pub fn check(&self, events: &EventList) -> Diagnostics {
        self.lower(events).diagnostics
    }

    /// Lower the tree and emit code for every configured backend.
    ///
    /// Code is emitted even when the tree has errors: the broken
    /// instructions are simply absent from it.
    pub fn compile(&self, events: &EventList) -> Result<CompileResult, CompileError> {
        let lowered = self.lower(events);
        let event_count = lowered.program.as_ref().map_or(0, Program::event_count);

        let mut outputs = Vec::new();
        if let Some(program) = &lowered.program {
            let emit_options = EmitOptions {
                entry_point: self.options.entry_point.clone(),
            };
            for backend in &self.options.backends {
                outputs.push(evgen_codegen::emit(program, *backend, &emit_options)?);
            }
        }

        let diagnostics = lowered.diagnostics;
        info!(
            target: "compiler",
            events = event_count,
            outputs = outputs.len(),
            errors = diagnostics.total_errors,
            warnings = diagnostics.total_warnings,
            aborted = ?lowered.aborted,
            "compilation finished"
        );
        Ok(CompileResult {
            success: !diagnostics.has_errors() && lowered.aborted.is_none(),
            outputs,
            diagnostics,
            aborted: lowered.aborted,
            event_count,
        })
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Request API
// ══════════════════════════════════════════════════════════════════════════════

/// Everything one compilation needs, in the editor's JSON shape.
///
/// Without a `catalog` the built-in one is used.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileRequest {
    pub events: EventList,
    pub objects: ObjectRegistry,
    pub globals: VariablesContainer,
    pub options: CompileOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<Catalog>,
}

impl CompileRequest {
    pub fn from_json(json: &str) -> Result<Self, CompileError> {
        Ok(serde_json::from_str(json)?)
    }

    fn run<T>(&self, f: impl FnOnce(&Compiler<'_>) -> T) -> T {
        let builtin;
        let catalog = match &self.catalog {
            Some(catalog) => catalog,
            None => {
                builtin = Catalog::builtin();
                &builtin
            }
        };
        let compiler = Compiler::new(catalog, &self.objects)
            .with_globals(self.globals.clone())
            .with_options(self.options.clone());
        f(&compiler)
    }

    pub fn compile(&self) -> Result<CompileResult, CompileError> {
        self.run(|compiler| compiler.compile(&self.events))
    }

    pub fn check(&self) -> Diagnostics {
        self.run(|compiler| compiler.check(&self.events))
    }
}

/// Compile a JSON [`CompileRequest`].
pub fn compile_json(request: &str) -> Result<CompileResult, CompileError> {
    CompileRequest::from_json(request)?.compile()
}

/// Check a JSON [`CompileRequest`] without emitting code.
pub fn check_json(request: &str) -> Result<Diagnostics, CompileError> {
    Ok(CompileRequest::from_json(request)?.check())
}
