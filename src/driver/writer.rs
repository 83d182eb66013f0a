//! Line-oriented source writer with indentation tracking
//!
//! Generated drivers are small and fully controlled, so they are assembled as
//! text rather than through a syntax tree.

/// Two spaces per level.
const INDENT: &str = "  ";
/// Indentation never grows past this depth.
pub const MAX_INDENT: usize = 10;

/// Builds source text one line at a time.
#[derive(Debug, Default)]
pub struct CodeWriter {
    output: String,
    indent_level: usize,
}

impl CodeWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the written source
    pub fn finish(self) -> String {
        self.output
    }

    pub fn indent_level(&self) -> usize {
        self.indent_level
    }

    /// Increase indentation level (clamped at `MAX_INDENT`)
    pub fn indent(&mut self) {
        self.indent_level = (self.indent_level + 1).min(MAX_INDENT);
    }

    /// Decrease indentation level
    pub fn dedent(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }

    /// Write one line at the current indentation. Empty lines carry no indentation.
    pub fn line(&mut self, text: &str) {
        if !text.is_empty() {
            for _ in 0..self.indent_level {
                self.output.push_str(INDENT);
            }
            self.output.push_str(text);
        }
        self.output.push('\n');
    }

    pub fn blank_line(&mut self) {
        self.line("");
    }

    pub fn comment(&mut self, text: &str) {
        self.line(&format!("// {text}"));
    }

    /// `header {`, the indented body, then `}`.
    pub fn block(&mut self, header: &str, body: impl FnOnce(&mut Self)) {
        self.line(&format!("{header} {{"));
        self.indent();
        body(self);
        self.dedent();
        self.line("}");
    }

    /// Lines continuing the previous statement, indented two levels deeper.
    pub fn continuation(&mut self, lines: &[&str]) {
        self.indent();
        self.indent();
        for line in lines {
            self.line(line);
        }
        self.dedent();
        self.dedent();
    }
}
