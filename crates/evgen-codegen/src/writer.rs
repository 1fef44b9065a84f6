//! Indented line accumulator shared by every dialect.

const INDENT: &str = "  ";

#[derive(Debug, Default)]
pub struct CodeWriter {
    lines: Vec<String>,
    depth: usize,
}

impl CodeWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one line at the current indentation.
    pub fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if text.is_empty() {
            self.lines.push(String::new());
        } else {
            self.lines.push(format!("{}{}", INDENT.repeat(self.depth), text));
        }
    }

    /// Append a block header (ending in `{`) and indent.
    pub fn open(&mut self, header: impl AsRef<str>) {
        self.line(header);
        self.depth += 1;
    }

    /// Dedent and close the block.
    pub fn close(&mut self) {
        self.close_with("}");
    }

    pub fn close_with(&mut self, closer: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.line(closer);
    }

    /// Number of lines written so far; the next line is `line_count() + 1`.
    pub fn line_count(&self) -> u32 {
        self.lines.len() as u32
    }

    pub fn finish(self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }
}
