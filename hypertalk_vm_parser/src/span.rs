//! Span information for source locations
//!
//! Provides precise source location tracking for error reporting.

use serde::{Deserialize, Serialize};

/// Represents a span in the source code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    /// Byte offset start (0-indexed)
    pub start: usize,
    /// Byte offset end (exclusive)
    pub end: usize,
    /// Line number (1-indexed)
    pub line: usize,
    /// Column (1-indexed, in bytes)
    pub column: usize,
}

impl Span {
    /// Create a new span
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    /// Get the length of the span in bytes
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Check if the span is empty
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// Helper struct that maps byte offsets to line/column positions
#[derive(Debug, Clone)]
pub struct SourceMap {
    /// Byte offset just past each `\n`, i.e. where lines 2.. begin.
    /// Line 1 implicitly begins at offset 0.
    line_breaks: Vec<usize>,
}

impl SourceMap {
    /// Create a new source map from source code
    pub fn new(source: &str) -> Self {
        let line_breaks = source
            .bytes()
            .enumerate()
            .filter(|&(_, byte)| byte == b'\n')
            .map(|(offset, _)| offset + 1)
            .collect();
        Self { line_breaks }
    }

    /// Get line and column for a byte offset (both 1-indexed)
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let breaks_before = self
            .line_breaks
            .partition_point(|&line_start| line_start <= offset);
        let line_start = match breaks_before {
            0 => 0,
            n => self.line_breaks[n - 1],
        };
        (breaks_before + 1, offset - line_start + 1)
    }

    /// Create a span with line/column information
    pub fn span(&self, start: usize, end: usize) -> Span {
        let (line, column) = self.line_col(start);
        Span {
            start,
            end,
            line,
            column,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_map() {
        let source = "put x\ninto y\n";
        let map = SourceMap::new(source);

        assert_eq!(map.line_col(0), (1, 1)); // 'p'
        assert_eq!(map.line_col(4), (1, 5)); // 'x'
        assert_eq!(map.line_col(6), (2, 1)); // 'i'
        assert_eq!(map.line_col(11), (2, 6)); // 'y'
    }

    #[test]
    fn test_span_len() {
        let span = Span::new(3, 8, 1, 4);
        assert_eq!(span.len(), 5);
        assert!(!span.is_empty());
        assert!(Span::new(4, 4, 1, 5).is_empty());
    }
}
