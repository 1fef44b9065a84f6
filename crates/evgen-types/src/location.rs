use serde::{Deserialize, Serialize};
use std::fmt;

/// Column range inside a single expression string.
///
/// Columns are 1-based and the end is inclusive, for human-readable
/// messages. Expressions are single-line, so no line number is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    #[serde(rename = "column")]
    pub start_col: u32,
    #[serde(rename = "end_column")]
    pub end_col: u32,
}

impl Span {
    pub fn new(start_col: u32, end_col: u32) -> Self {
        Self { start_col, end_col }
    }

    /// Create a zero-width span at a single column.
    pub fn point(col: u32) -> Self {
        Self::new(col, col)
    }

    /// Merge two spans into one that covers both.
    pub fn merge(self, other: Span) -> Span {
        Span::new(
            self.start_col.min(other.start_col),
            self.end_col.max(other.end_col),
        )
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start_col == self.end_col {
            write!(f, "col {}", self.start_col)
        } else {
            write!(f, "col {}-{}", self.start_col, self.end_col)
        }
    }
}

/// Position of an event in the tree: the sibling index at every level,
/// outermost first.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventPath(Vec<u32>);

impl EventPath {
    /// The (empty) path of the root event list.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Path of the `index`-th sub-event of this event.
    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index as u32);
        Self(indices)
    }

    /// Nesting depth: 1 for top-level events.
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn indices(&self) -> &[u32] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u32>> for EventPath {
    fn from(indices: Vec<u32>) -> Self {
        Self(indices)
    }
}

impl fmt::Display for EventPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("events");
        }
        for (i, index) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "events[{index}]")?;
        }
        Ok(())
    }
}

/// Which part of an event a location points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "site", rename_all = "snake_case")]
pub enum Site {
    Event,
    Condition { index: u32 },
    Action { index: u32 },
    WhileCondition { index: u32 },
    RepeatCount,
    ForEachObject,
    Variable { name: String },
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Site::Event => Ok(()),
            Site::Condition { index } => write!(f, " condition {index}"),
            Site::Action { index } => write!(f, " action {index}"),
            Site::WhileCondition { index } => write!(f, " while-condition {index}"),
            Site::RepeatCount => f.write_str(" repeat count"),
            Site::ForEachObject => f.write_str(" for-each object"),
            Site::Variable { name } => write!(f, " variable '{name}'"),
        }
    }
}

/// Where in the tree a diagnostic applies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub path: EventPath,
    #[serde(flatten)]
    pub site: Site,
    /// Index of the authored parameter, when the problem is inside one.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub parameter: Option<u32>,
    /// Columns inside the expression text, when known.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub span: Option<Span>,
}

impl Location {
    pub fn new(path: EventPath, site: Site) -> Self {
        Self {
            path,
            site,
            parameter: None,
            span: None,
        }
    }

    pub fn event(path: EventPath) -> Self {
        Self::new(path, Site::Event)
    }

    pub fn condition(path: EventPath, index: usize) -> Self {
        Self::new(path, Site::Condition { index: index as u32 })
    }

    pub fn action(path: EventPath, index: usize) -> Self {
        Self::new(path, Site::Action { index: index as u32 })
    }

    pub fn with_parameter(mut self, parameter: usize) -> Self {
        self.parameter = Some(parameter as u32);
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.path, self.site)?;
        if let Some(parameter) = self.parameter {
            write!(f, " parameter {parameter}")?;
        }
        if let Some(span) = self.span {
            write!(f, " ({span})")?;
        }
        Ok(())
    }
}
