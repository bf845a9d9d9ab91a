//! Parse error types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where in which source a token (or the end of input) sits.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceLocation {
    /// File name as given to `Tokenizer::add_tokens`
    pub file: String,
    /// Byte offset (0-indexed)
    pub offset: usize,
    /// Line number (1-indexed)
    pub line: usize,
    /// Column (1-indexed, in bytes)
    pub column: usize,
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Parse error type
///
/// Each variant carries the offending token's description and location so
/// the host can point at the exact source position.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("expected identifier '{expected}', found {found} at {location}")]
    ExpectedIdentifier {
        expected: String,
        found: String,
        location: SourceLocation,
    },

    #[error("expected operator '{symbol}', found {found} at {location}")]
    ExpectedOperator {
        symbol: String,
        found: String,
        location: SourceLocation,
    },

    #[error("expected operand after operator '{symbol}' at {location}")]
    ExpectedOperandAfterOperator {
        symbol: String,
        location: SourceLocation,
    },

    #[error("expected integer, found {found} at {location}")]
    ExpectedInteger {
        found: String,
        location: SourceLocation,
    },

    #[error("expected number, found {found} at {location}")]
    ExpectedNumber {
        found: String,
        location: SourceLocation,
    },

    #[error("expected string, found {found} at {location}")]
    ExpectedString {
        found: String,
        location: SourceLocation,
    },

    #[error("expected a value, found {found} at {location}")]
    ExpectedValue {
        found: String,
        location: SourceLocation,
    },

    #[error("expected an expression, found {found} at {location}")]
    ExpectedExpression {
        found: String,
        location: SourceLocation,
    },

    #[error("expected end of line, found {found} at {location}")]
    ExpectedEndOfLine {
        found: String,
        location: SourceLocation,
    },

    #[error("expected a handler name, found {found} at {location}")]
    ExpectedFunctionName {
        found: String,
        location: SourceLocation,
    },

    #[error("unterminated string literal starting at {location}")]
    UnterminatedString { location: SourceLocation },

    #[error("unrecognized token '{text}' at {location}")]
    UnrecognizedToken {
        text: String,
        location: SourceLocation,
    },

    #[error("number literal '{text}' out of range at {location}")]
    InvalidNumber {
        text: String,
        location: SourceLocation,
    },
}

impl ParseError {
    /// Get the location of the error
    pub fn location(&self) -> &SourceLocation {
        match self {
            ParseError::ExpectedIdentifier { location, .. } => location,
            ParseError::ExpectedOperator { location, .. } => location,
            ParseError::ExpectedOperandAfterOperator { location, .. } => location,
            ParseError::ExpectedInteger { location, .. } => location,
            ParseError::ExpectedNumber { location, .. } => location,
            ParseError::ExpectedString { location, .. } => location,
            ParseError::ExpectedValue { location, .. } => location,
            ParseError::ExpectedExpression { location, .. } => location,
            ParseError::ExpectedEndOfLine { location, .. } => location,
            ParseError::ExpectedFunctionName { location, .. } => location,
            ParseError::UnterminatedString { location } => location,
            ParseError::UnrecognizedToken { location, .. } => location,
            ParseError::InvalidNumber { location, .. } => location,
        }
    }

    /// Format error with source context
    ///
    /// Returns a string showing the source line with an error marker.
    pub fn format_with_context(&self, source: &str) -> String {
        let location = self.location();
        let lines: Vec<&str> = source.lines().collect();
        let line_idx = location.line.saturating_sub(1);

        if line_idx >= lines.len() {
            return String::new();
        }

        let line = lines[line_idx];
        let col = location.column.saturating_sub(1).min(line.len());
        let spaces = " ".repeat(col);

        format!(
            "  {} | {}\n  {} | {}^",
            location.line,
            line,
            " ".repeat(location.line.to_string().len()),
            spaces
        )
    }
}

/// Result type for parsing operations
pub type ParseResult<T> = Result<T, ParseError>;
