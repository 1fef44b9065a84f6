use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A code-generation target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Statically compiled C++ runtime.
    Native,
    /// Dynamically loaded JavaScript runtime.
    Js,
}

impl Backend {
    /// Every supported backend, in emission order.
    pub const ALL: [Backend; 2] = [Backend::Native, Backend::Js];

    pub fn name(self) -> &'static str {
        match self {
            Backend::Native => "native",
            Backend::Js => "js",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when parsing a backend name fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown backend '{0}' (expected 'native' or 'js')")]
pub struct UnknownBackend(pub String);

impl FromStr for Backend {
    type Err = UnknownBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "native" | "cpp" => Ok(Backend::Native),
            "js" | "javascript" => Ok(Backend::Js),
            other => Err(UnknownBackend(other.to_string())),
        }
    }
}

/// Per-backend runtime symbol names of one catalog entry.
///
/// The emitter looks the symbol up by backend identifier instead of
/// dispatching on the instruction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackendSymbols(BTreeMap<Backend, String>);

impl BackendSymbols {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Same symbol on every backend.
    pub fn uniform(symbol: impl Into<String>) -> Self {
        let symbol = symbol.into();
        Self(
            Backend::ALL
                .iter()
                .map(|b| (*b, symbol.clone()))
                .collect(),
        )
    }

    /// Builder: add or replace the symbol for `backend`.
    pub fn with(mut self, backend: Backend, symbol: impl Into<String>) -> Self {
        self.0.insert(backend, symbol.into());
        self
    }

    pub fn get(&self, backend: Backend) -> Option<&str> {
        self.0.get(&backend).map(String::as_str)
    }

    pub fn supports(&self, backend: Backend) -> bool {
        self.0.contains_key(&backend)
    }

    /// The backend-neutral name used by the evaluator: the native symbol,
    /// falling back to any other backend's.
    pub fn preferred(&self) -> Option<&str> {
        self.get(Backend::Native)
            .or_else(|| self.0.values().next().map(String::as_str))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Backend, &str)> {
        self.0.iter().map(|(b, s)| (*b, s.as_str()))
    }
}
