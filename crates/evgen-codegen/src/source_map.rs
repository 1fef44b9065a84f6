//! Source mapping: generated line range → event path.
//!
//! Each lowered event gets one entry covering every generated line it (and
//! its sub-events) produced. Editors use it to jump from a runtime error in
//! generated code back to the authored event.

use evgen_types::EventPath;
use serde::{Deserialize, Serialize};

/// A complete source map for one generated output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMap {
    pub entries: Vec<SourceMapEntry>,
}

/// One event → one inclusive range of generated lines (1-based).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMapEntry {
    pub event_id: u32,
    pub path: EventPath,
    pub start_line: u32,
    pub end_line: u32,
}

impl SourceMap {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, event_id: u32, path: EventPath, start_line: u32, end_line: u32) {
        self.entries.push(SourceMapEntry {
            event_id,
            path,
            start_line,
            end_line,
        });
    }

    /// The innermost event whose range contains `line`.
    pub fn find_by_line(&self, line: u32) -> Option<&SourceMapEntry> {
        self.entries
            .iter()
            .filter(|e| e.start_line <= line && line <= e.end_line)
            .min_by_key(|e| e.end_line - e.start_line)
    }

    pub fn find_by_event(&self, event_id: u32) -> Option<&SourceMapEntry> {
        self.entries.iter().find(|e| e.event_id == event_id)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn from_json(data: &str) -> Option<Self> {
        serde_json::from_str(data).ok()
    }
}
