//! Width-bounded line buffer for live rendering of streamed text.
//!
//! Wrapping is purely length based: fragments are never split and word
//! boundaries are ignored. A fragment that would push the in-progress line
//! past the width starts a new line instead.

/// Completed display lines plus one in-progress line.
#[derive(Debug, Clone)]
pub struct LineAccumulator {
    width: usize,
    lines: Vec<String>,
    current: String,
    /// Length of `current` in chars, cached to keep `append` O(fragment).
    current_len: usize,
}

impl LineAccumulator {
    /// Create an empty buffer. A width of zero is treated as one.
    pub fn new(width: usize) -> Self {
        Self {
            width: width.max(1),
            lines: Vec::new(),
            current: String::new(),
            current_len: 0,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Add a streamed fragment.
    ///
    /// An empty in-progress line is never sealed, so an oversized fragment
    /// lands on its own line untruncated rather than after a blank one.
    pub fn append(&mut self, fragment: &str) {
        let len = fragment.chars().count();
        if self.current_len + len > self.width && !self.current.is_empty() {
            self.lines.push(std::mem::take(&mut self.current));
            self.current_len = 0;
        }
        self.current.push_str(fragment);
        self.current_len += len;
    }

    /// Completed lines joined with `\n`, followed by the in-progress line.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(
            self.lines.iter().map(|l| l.len() + 1).sum::<usize>() + self.current.len(),
        );
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(&self.current);
        out
    }

    /// Sealed lines, oldest first.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn current_line(&self) -> &str {
        &self.current
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.current.is_empty()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
