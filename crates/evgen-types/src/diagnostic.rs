use crate::Location;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The offending instruction, expression or event was omitted.
    Error,
    Warning,
    Info,
}

/// Diagnostic category, determined by error code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticCategory {
    Syntax,
    Symbol,
    Type,
    Scope,
    Structure,
}

/// The error taxonomy reported to the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticKind {
    SyntaxError,
    UnknownSymbolError,
    UnknownInstructionError,
    TypeMismatchError,
    ArityError,
    MissingAutomatismError,
    InvalidOperatorTokenError,
    InvalidContextError,
    MaxDepthExceededError,
    ShadowedLoopIndex,
    LoopIndexAssignment,
    Cancelled,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Numeric diagnostic code (E100–E599).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    // ── Syntax (E100–E199) ──
    pub const UNEXPECTED_TOKEN: Self = Self(100);
    pub const UNTERMINATED_STRING: Self = Self(101);
    pub const UNEXPECTED_CHARACTER: Self = Self(102);
    pub const EMPTY_EXPRESSION: Self = Self(103);

    // ── Symbols (E200–E299) ──
    pub const UNKNOWN_SYMBOL: Self = Self(200);
    pub const UNKNOWN_INSTRUCTION: Self = Self(201);
    pub const MISSING_AUTOMATISM: Self = Self(202);
    pub const MISSING_BACKEND_SYMBOL: Self = Self(203);

    // ── Types (E300–E399) ──
    pub const TYPE_MISMATCH: Self = Self(300);
    pub const WRONG_ARG_COUNT: Self = Self(301);
    pub const INVALID_OPERATOR: Self = Self(302);

    // ── Scope (E400–E499) ──
    pub const LOOP_INDEX_SHADOWED: Self = Self(400);
    pub const LOOP_INDEX_ASSIGNED: Self = Self(401);
    pub const STOP_OUTSIDE_LOOP: Self = Self(402);

    // ── Structure (E500–E599) ──
    pub const MAX_DEPTH_EXCEEDED: Self = Self(500);
    pub const CANCELLED: Self = Self(501);

    /// Get the category for this code.
    pub fn category(self) -> DiagnosticCategory {
        match self.0 {
            100..=199 => DiagnosticCategory::Syntax,
            200..=299 => DiagnosticCategory::Symbol,
            300..=399 => DiagnosticCategory::Type,
            400..=499 => DiagnosticCategory::Scope,
            _ => DiagnosticCategory::Structure,
        }
    }

    /// Get the taxonomy kind for this code.
    pub fn kind(self) -> DiagnosticKind {
        match self {
            Self::UNEXPECTED_TOKEN
            | Self::UNTERMINATED_STRING
            | Self::UNEXPECTED_CHARACTER
            | Self::EMPTY_EXPRESSION => DiagnosticKind::SyntaxError,
            Self::UNKNOWN_SYMBOL => DiagnosticKind::UnknownSymbolError,
            Self::UNKNOWN_INSTRUCTION | Self::MISSING_BACKEND_SYMBOL => {
                DiagnosticKind::UnknownInstructionError
            }
            Self::MISSING_AUTOMATISM => DiagnosticKind::MissingAutomatismError,
            Self::TYPE_MISMATCH => DiagnosticKind::TypeMismatchError,
            Self::WRONG_ARG_COUNT => DiagnosticKind::ArityError,
            Self::INVALID_OPERATOR => DiagnosticKind::InvalidOperatorTokenError,
            Self::LOOP_INDEX_SHADOWED => DiagnosticKind::ShadowedLoopIndex,
            Self::LOOP_INDEX_ASSIGNED => DiagnosticKind::LoopIndexAssignment,
            Self::STOP_OUTSIDE_LOOP => DiagnosticKind::InvalidContextError,
            Self::MAX_DEPTH_EXCEEDED => DiagnosticKind::MaxDepthExceededError,
            Self::CANCELLED => DiagnosticKind::Cancelled,
            _ => DiagnosticKind::SyntaxError,
        }
    }

    /// Severity a diagnostic with this code is reported at.
    pub fn default_severity(self) -> Severity {
        match self.kind() {
            DiagnosticKind::ShadowedLoopIndex | DiagnosticKind::LoopIndexAssignment => {
                Severity::Warning
            }
            DiagnosticKind::Cancelled => Severity::Info,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

impl fmt::Display for DiagnosticCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax => write!(f, "syntax"),
            Self::Symbol => write!(f, "symbol"),
            Self::Type => write!(f, "type"),
            Self::Scope => write!(f, "scope"),
            Self::Structure => write!(f, "structure"),
        }
    }
}

/// A structured compiler diagnostic.
///
/// The editor renders these; it must not parse free-form strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{location}: {code} [{kind}] {message}")]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub category: DiagnosticCategory,
    pub message: String,
    pub location: Location,
    /// Optional fix suggestion.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub suggestion: Option<String>,
}

impl Diagnostic {
    pub fn new(code: ErrorCode, message: impl Into<String>, location: Location) -> Self {
        Self {
            code,
            kind: code.kind(),
            severity: code.default_severity(),
            category: code.category(),
            message: message.into(),
            location,
            suggestion: None,
        }
    }

    /// Attach a fix suggestion.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}


/// Ordered collection of every diagnostic reported during a run.
///
/// Nothing is capped or deduplicated: the report is complete.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub entries: Vec<Diagnostic>,
    pub total_errors: usize,
    pub total_warnings: usize,
}

impl Diagnostics {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => self.total_errors += 1,
            Severity::Warning => self.total_warnings += 1,
            Severity::Info => {}
        }
        self.entries.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        for diagnostic in other.entries {
            self.push(diagnostic);
        }
    }

    pub fn has_errors(&self) -> bool {
        self.total_errors > 0
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|d| d.severity == Severity::Warning)
    }

    /// Number of diagnostics of a given kind.
    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }
}
