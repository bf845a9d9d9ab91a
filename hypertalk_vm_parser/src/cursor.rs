//! Backtracking cursor over the token buffer
//!
//! The cursor is a single integer index; backtracking is always "save the
//! index, restore the index". The `has_*` family returns `Option` and only
//! advances on opt-in success; the `expect_*` family advances or fails with
//! a precise [`ParseError`] carrying the offending token.

use crate::error::{ParseError, ParseResult, SourceLocation};
use crate::token::{Token, TokenKind};
use crate::tokenizer::Tokenizer;

/// Cursor over a [`Tokenizer`]'s buffer.
#[derive(Debug, Clone)]
pub struct TokenCursor<'t> {
    tokenizer: &'t Tokenizer,
    index: usize,
}

impl<'t> TokenCursor<'t> {
    pub fn new(tokenizer: &'t Tokenizer) -> Self {
        Self {
            tokenizer,
            index: 0,
        }
    }

    /// True once every token has been consumed
    pub fn is_at_end(&self) -> bool {
        self.index >= self.tokenizer.len()
    }

    /// Peek at the current token without consuming it
    pub fn current(&self) -> Option<&'t Token> {
        self.tokenizer.tokens().get(self.index)
    }

    /// Save the cursor position for later backtracking
    pub fn save(&self) -> usize {
        self.index
    }

    /// Restore a previously saved position
    pub fn restore(&mut self, index: usize) {
        self.index = index;
    }

    /// Consume one token
    pub fn advance(&mut self) {
        if self.index < self.tokenizer.len() {
            self.index += 1;
        }
    }

    /// Location of the current token, or just past the last one at EOF
    pub fn location(&self) -> SourceLocation {
        match self.current() {
            Some(token) => self.tokenizer.location(token),
            None => self.tokenizer.end_location(),
        }
    }

    /// Description of the current token for error messages
    pub fn describe_current(&self) -> String {
        match self.current() {
            Some(token) => token.kind.describe(),
            None => "end of input".to_string(),
        }
    }

    // ==================== has_* primitives ====================

    /// Match the given identifier word (case-insensitive), returning its
    /// source spelling. Advances only when `advance` is set and the match
    /// succeeded.
    pub fn has_identifier(&mut self, word: &str, advance: bool) -> Option<String> {
        match self.current() {
            Some(token) if token.kind.is_identifier(word) => {
                let text = match &token.kind {
                    TokenKind::UnquotedString(s) => s.clone(),
                    _ => unreachable!("is_identifier only matches unquoted strings"),
                };
                if advance {
                    self.advance();
                }
                Some(text)
            }
            _ => None,
        }
    }

    /// Match any identifier token, returning its text
    pub fn has_any_identifier(&mut self, advance: bool) -> Option<String> {
        match self.current() {
            Some(Token {
                kind: TokenKind::UnquotedString(s),
                ..
            }) => {
                let text = s.clone();
                if advance {
                    self.advance();
                }
                Some(text)
            }
            _ => None,
        }
    }

    /// Match a sequence of consecutive identifier words atomically.
    /// On failure the cursor is left untouched even when `advance` is set.
    pub fn has_identifiers(&mut self, words: &[&str], advance: bool) -> bool {
        let save = self.save();
        for word in words {
            if self.has_identifier(word, true).is_none() {
                self.restore(save);
                return false;
            }
        }
        if !advance {
            self.restore(save);
        }
        true
    }

    /// Match a quoted string token
    pub fn has_string(&mut self, advance: bool) -> Option<String> {
        match self.current() {
            Some(Token {
                kind: TokenKind::QuotedString(s),
                ..
            }) => {
                let text = s.clone();
                if advance {
                    self.advance();
                }
                Some(text)
            }
            _ => None,
        }
    }

    /// Match an integer literal token
    pub fn has_integer(&mut self, advance: bool) -> Option<i64> {
        match self.current() {
            Some(Token {
                kind: TokenKind::Integer(i),
                ..
            }) => {
                let value = *i;
                if advance {
                    self.advance();
                }
                Some(value)
            }
            _ => None,
        }
    }

    /// Match a floating-point literal token
    pub fn has_double(&mut self, advance: bool) -> Option<f64> {
        match self.current() {
            Some(Token {
                kind: TokenKind::Double(d),
                ..
            }) => {
                let value = *d;
                if advance {
                    self.advance();
                }
                Some(value)
            }
            _ => None,
        }
    }

    /// Match the given symbol exactly
    pub fn has_symbol(&mut self, symbol: &str, advance: bool) -> Option<String> {
        match self.current() {
            Some(Token {
                kind: TokenKind::Symbol(s),
                ..
            }) if s == symbol => {
                let text = s.clone();
                if advance {
                    self.advance();
                }
                Some(text)
            }
            _ => None,
        }
    }

    /// Match any symbol token (including the newline symbol)
    pub fn has_any_symbol(&mut self, advance: bool) -> Option<String> {
        match self.current() {
            Some(Token {
                kind: TokenKind::Symbol(s),
                ..
            }) => {
                let text = s.clone();
                if advance {
                    self.advance();
                }
                Some(text)
            }
            _ => None,
        }
    }

    /// True when the current token is a line break (or the buffer is done)
    pub fn at_end_of_line(&self) -> bool {
        match self.current() {
            Some(token) => token.kind.is_newline(),
            None => true,
        }
    }

    // ==================== expect_* primitives ====================

    /// Consume any identifier, or fail
    pub fn expect_identifier(&mut self) -> ParseResult<String> {
        self.has_any_identifier(true)
            .ok_or_else(|| ParseError::ExpectedIdentifier {
                expected: "any identifier".to_string(),
                found: self.describe_current(),
                location: self.location(),
            })
    }

    /// Consume the given identifier word, or fail
    pub fn expect_the_identifier(&mut self, word: &str) -> ParseResult<String> {
        self.has_identifier(word, true)
            .ok_or_else(|| ParseError::ExpectedIdentifier {
                expected: word.to_string(),
                found: self.describe_current(),
                location: self.location(),
            })
    }

    /// Consume a sequence of identifier words atomically, or fail
    pub fn expect_identifiers(&mut self, words: &[&str]) -> ParseResult<()> {
        if self.has_identifiers(words, true) {
            Ok(())
        } else {
            Err(ParseError::ExpectedIdentifier {
                expected: words.join(" "),
                found: self.describe_current(),
                location: self.location(),
            })
        }
    }

    /// Consume a quoted string, or fail
    pub fn expect_string(&mut self) -> ParseResult<String> {
        self.has_string(true).ok_or_else(|| ParseError::ExpectedString {
            found: self.describe_current(),
            location: self.location(),
        })
    }

    /// Consume an integer literal, or fail
    pub fn expect_integer(&mut self) -> ParseResult<i64> {
        self.has_integer(true)
            .ok_or_else(|| ParseError::ExpectedInteger {
                found: self.describe_current(),
                location: self.location(),
            })
    }

    /// Consume a number literal (integer or double), or fail
    pub fn expect_number(&mut self) -> ParseResult<f64> {
        if let Some(d) = self.has_double(true) {
            return Ok(d);
        }
        if let Some(i) = self.has_integer(true) {
            return Ok(i as f64);
        }
        Err(ParseError::ExpectedNumber {
            found: self.describe_current(),
            location: self.location(),
        })
    }

    /// Consume the given symbol, or fail
    pub fn expect_symbol(&mut self, symbol: &str) -> ParseResult<()> {
        self.has_symbol(symbol, true)
            .map(|_| ())
            .ok_or_else(|| ParseError::ExpectedOperator {
                symbol: symbol.to_string(),
                found: self.describe_current(),
                location: self.location(),
            })
    }

    /// Consume a line break. The end of the buffer counts as one, so
    /// sources without a trailing newline still parse.
    pub fn expect_end_of_line(&mut self) -> ParseResult<()> {
        if self.is_at_end() {
            return Ok(());
        }
        if self.at_end_of_line() {
            self.advance();
            return Ok(());
        }
        Err(ParseError::ExpectedEndOfLine {
            found: self.describe_current(),
            location: self.location(),
        })
    }

    // ==================== skipping ====================

    /// Skip any run of line breaks
    pub fn skip_newlines(&mut self) {
        while self.current().is_some_and(|t| t.kind.is_newline()) {
            self.advance();
        }
    }

    /// Skip to just past the next line break
    pub fn skip_line(&mut self) {
        while let Some(token) = self.current() {
            let newline = token.kind.is_newline();
            self.advance();
            if newline {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenizer_for(source: &str) -> Tokenizer {
        let mut tokenizer = Tokenizer::new();
        tokenizer.add_tokens(source, "test.ht").unwrap();
        tokenizer
    }

    #[test]
    fn test_has_does_not_advance_unless_asked() {
        let tokenizer = tokenizer_for("put 5");
        let mut cursor = TokenCursor::new(&tokenizer);

        assert_eq!(cursor.has_identifier("put", false), Some("put".to_string()));
        assert_eq!(cursor.has_identifier("put", true), Some("put".to_string()));
        assert_eq!(cursor.has_identifier("put", true), None);
        assert_eq!(cursor.has_integer(true), Some(5));
        assert!(cursor.is_at_end());
    }

    #[test]
    fn test_save_restore() {
        let tokenizer = tokenizer_for("add 1 to x");
        let mut cursor = TokenCursor::new(&tokenizer);

        let save = cursor.save();
        cursor.expect_identifier().unwrap();
        cursor.expect_integer().unwrap();
        cursor.restore(save);
        assert_eq!(cursor.has_identifier("add", false), Some("add".to_string()));
    }

    #[test]
    fn test_has_identifiers_is_atomic() {
        let tokenizer = tokenizer_for("end repeat");
        let mut cursor = TokenCursor::new(&tokenizer);

        assert!(!cursor.has_identifiers(&["end", "if"], true));
        assert_eq!(cursor.save(), 0);
        assert!(cursor.has_identifiers(&["end", "repeat"], true));
        assert!(cursor.is_at_end());
    }

    #[test]
    fn test_expect_failure_reports_found_token() {
        let tokenizer = tokenizer_for("7");
        let mut cursor = TokenCursor::new(&tokenizer);

        let err = cursor.expect_identifier().unwrap_err();
        assert!(err.to_string().contains("integer 7"));
    }

    #[test]
    fn test_end_of_buffer_counts_as_end_of_line() {
        let tokenizer = tokenizer_for("x");
        let mut cursor = TokenCursor::new(&tokenizer);

        cursor.expect_identifier().unwrap();
        cursor.expect_end_of_line().unwrap();
    }

    #[test]
    fn test_skip_line() {
        let tokenizer = tokenizer_for("a b c\nd\n");
        let mut cursor = TokenCursor::new(&tokenizer);

        cursor.skip_line();
        assert_eq!(cursor.has_identifier("d", false), Some("d".to_string()));
    }
}
