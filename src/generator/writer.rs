//! Indented source text builder.

const INDENT: &str = "    ";

#[derive(Default, Debug)]
pub struct CodeWriter {
    buf: String,
    depth: usize,
}

impl CodeWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_line(&mut self, line: &str) {
        for _ in 0..self.depth {
            self.buf.push_str(INDENT);
        }
        self.buf.push_str(line);
        self.buf.push('\n');
    }

    pub fn blank_line(&mut self) {
        self.buf.push('\n');
    }

    /// Write `header` followed by an opening brace and indent everything after it.
    pub fn push_block(&mut self, header: &str) {
        self.write_line(header);
        self.write_line("{");
        self.depth += 1;
    }

    /// Close the innermost block with `closer` (`}` or `};`).
    pub fn pop_block(&mut self, closer: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.write_line(closer);
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn into_string(self) -> String {
        self.buf
    }
}
