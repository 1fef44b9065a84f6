//! Compilation options and cancellation.

use evgen_types::Backend;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Default cap on event nesting.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Default iteration guard for while events with the infinite-loop warning.
pub const DEFAULT_WHILE_ITERATION_LIMIT: u32 = 100_000;

/// Tunables for one compilation. Every field has a default, so a partial
/// JSON object deserializes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Backends to emit code for, in order.
    pub backends: Vec<Backend>,
    /// Deepest event nesting accepted; deeper trees abort the run.
    pub max_depth: usize,
    pub while_iteration_limit: u32,
    /// Name of the emitted entry function.
    pub entry_point: Option<String>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            backends: Backend::ALL.to_vec(),
            max_depth: DEFAULT_MAX_DEPTH,
            while_iteration_limit: DEFAULT_WHILE_ITERATION_LIMIT,
            entry_point: None,
        }
    }
}

impl CompileOptions {
    pub fn with_backends(mut self, backends: impl Into<Vec<Backend>>) -> Self {
        self.backends = backends.into();
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_entry_point(mut self, name: impl Into<String>) -> Self {
        self.entry_point = Some(name.into());
        self
    }
}

/// Shared flag a host flips to stop a running compilation.
///
/// The walker checks it when entering each event.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
