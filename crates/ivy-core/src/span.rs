//! Source location tracking for error reporting.
//!
//! Provides [`Span`] to track where tokens, AST nodes and errors occur in
//! contract source text.

use std::fmt;

/// A span of source code, represented by its starting position.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed, byte-based).
    pub col: u32,
    /// Length in bytes.
    pub len: u32,
}

impl Span {
    /// Create a new span from a line, column, and length.
    #[inline]
    pub fn new(line: u32, col: u32, len: u32) -> Self {
        Self { line, col, len }
    }

    /// Create a zero-length span at a position.
    #[inline]
    pub fn point(line: u32, col: u32) -> Self {
        Self { line, col, len: 0 }
    }

    /// Whether this span is empty (zero length).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Merge two spans into one starting at `self` and covering `other`.
    ///
    /// Spans on different lines keep the first position and add lengths.
    #[inline]
    pub fn merge(self, other: Span) -> Span {
        if self.line == other.line {
            let start_col = self.col.min(other.col);
            let end_col = (other.col + other.len).max(self.col + self.len);
            Span {
                line: self.line,
                col: start_col,
                len: end_col - start_col,
            }
        } else {
            Span {
                line: self.line,
                col: self.col,
                len: self.len + other.len,
            }
        }
    }

    /// Human-readable location, as embedded in compiler error messages.
    pub fn describe(&self) -> String {
        format!("line {}, column {}", self.line, self.col)
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_display() {
        let span = Span::new(3, 15, 5);
        assert_eq!(format!("{}", span), "3:15");
        assert_eq!(span.describe(), "line 3, column 15");
    }

    #[test]
    fn span_merge_same_line() {
        let merged = Span::new(1, 5, 3).merge(Span::new(1, 10, 3));
        assert_eq!(merged.col, 5);
        assert_eq!(merged.len, 8);
    }

    #[test]
    fn span_merge_different_lines() {
        let merged = Span::new(1, 5, 3).merge(Span::new(2, 1, 4));
        assert_eq!(merged.line, 1);
        assert_eq!(merged.len, 7);
    }

    #[test]
    fn point_is_empty() {
        assert!(Span::point(4, 2).is_empty());
        assert!(!Span::new(4, 2, 1).is_empty());
    }
}
