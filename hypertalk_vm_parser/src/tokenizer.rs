//! Tokenizer for HyperTalk-style source code
//!
//! Wraps the logos-generated lexer and accumulates a random-access token
//! buffer. The parser walks the buffer through a [`TokenCursor`], saving and
//! restoring its integer index to backtrack.
//!
//! [`TokenCursor`]: crate::cursor::TokenCursor

use logos::Logos;

use crate::error::{ParseError, ParseResult, SourceLocation};
use crate::span::SourceMap;
use crate::token::{RawToken, Token, TokenKind};

/// Accumulates tokens from one or more sources into a single buffer.
#[derive(Debug, Default)]
pub struct Tokenizer {
    tokens: Vec<Token>,
    files: Vec<String>,
}

impl Tokenizer {
    /// Create an empty tokenizer
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokenize `source` and append its tokens to the buffer.
    ///
    /// May be called repeatedly; every token remembers which file it came
    /// from. The first lexical error aborts the scan.
    pub fn add_tokens(&mut self, source: &str, file_name: &str) -> ParseResult<()> {
        let file = self.files.len() as u32;
        self.files.push(file_name.to_string());

        let source_map = SourceMap::new(source);
        let mut lexer = RawToken::lexer(source);

        while let Some(result) = lexer.next() {
            let range = lexer.span();
            let text = lexer.slice();
            let span = source_map.span(range.start, range.end);
            let location = || SourceLocation {
                file: file_name.to_string(),
                offset: range.start,
                line: span.line,
                column: span.column,
            };

            let kind = match result {
                Ok(RawToken::LineComment) => continue,
                Ok(RawToken::Newline) => TokenKind::Symbol("\n".to_string()),
                Ok(RawToken::QuotedString) => {
                    TokenKind::QuotedString(text[1..text.len() - 1].to_string())
                }
                Ok(RawToken::IntegerLiteral) => match text.parse::<i64>() {
                    Ok(value) => TokenKind::Integer(value),
                    Err(_) => {
                        return Err(ParseError::InvalidNumber {
                            text: text.to_string(),
                            location: location(),
                        })
                    }
                },
                Ok(RawToken::DoubleLiteral) => match text.parse::<f64>() {
                    Ok(value) => TokenKind::Double(value),
                    Err(_) => {
                        return Err(ParseError::InvalidNumber {
                            text: text.to_string(),
                            location: location(),
                        })
                    }
                },
                Ok(RawToken::Identifier) => TokenKind::UnquotedString(text.to_string()),
                Ok(RawToken::AmpAmp) | Ok(RawToken::LessEqual) | Ok(RawToken::GreaterEqual) => {
                    TokenKind::Symbol(text.to_string())
                }
                Ok(RawToken::Symbol) => TokenKind::Symbol(text.to_string()),
                Err(()) => {
                    // The only raw pattern that can fail mid-token is an
                    // unclosed quote; everything else falls through to the
                    // single-symbol class.
                    if text.starts_with('"') {
                        return Err(ParseError::UnterminatedString {
                            location: location(),
                        });
                    }
                    return Err(ParseError::UnrecognizedToken {
                        text: text.to_string(),
                        location: location(),
                    });
                }
            };

            self.tokens.push(Token { kind, span, file });
        }

        Ok(())
    }

    /// The accumulated token buffer
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Number of accumulated tokens
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// True when no tokens have been accumulated
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// File name a token came from
    pub fn file_name(&self, token: &Token) -> &str {
        self.files
            .get(token.file as usize)
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Build a reportable location for a token
    pub fn location(&self, token: &Token) -> SourceLocation {
        SourceLocation {
            file: self.file_name(token).to_string(),
            offset: token.span.start,
            line: token.span.line,
            column: token.span.column,
        }
    }

    /// Location just past the last token, used for end-of-input errors
    pub fn end_location(&self) -> SourceLocation {
        match self.tokens.last() {
            Some(token) => SourceLocation {
                file: self.file_name(token).to_string(),
                offset: token.span.end,
                line: token.span.line,
                column: token.span.column + token.span.len(),
            },
            None => SourceLocation {
                file: self.files.last().cloned().unwrap_or_default(),
                ..SourceLocation::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let mut tokenizer = Tokenizer::new();
        tokenizer.add_tokens(source, "test.ht").unwrap();
        tokenizer.tokens().iter().map(|t| t.kind.clone()).collect()
    }

    #[test]
    fn test_quoted_string_contents() {
        assert_eq!(
            kinds("\"hello world\""),
            vec![TokenKind::QuotedString("hello world".to_string())]
        );
    }

    #[test]
    fn test_newline_is_a_symbol() {
        assert_eq!(
            kinds("a\nb"),
            vec![
                TokenKind::UnquotedString("a".to_string()),
                TokenKind::Symbol("\n".to_string()),
                TokenKind::UnquotedString("b".to_string()),
            ]
        );
    }

    #[test]
    fn test_comments_are_dropped() {
        assert_eq!(
            kinds("x -- the rest is noise + 1\n"),
            vec![
                TokenKind::UnquotedString("x".to_string()),
                TokenKind::Symbol("\n".to_string()),
            ]
        );
    }

    #[test]
    fn test_numbers_and_symbols() {
        assert_eq!(
            kinds("1 + 2.5"),
            vec![
                TokenKind::Integer(1),
                TokenKind::Symbol("+".to_string()),
                TokenKind::Double(2.5),
            ]
        );
        assert_eq!(kinds("7."), vec![TokenKind::Double(7.0)]);
    }

    #[test]
    fn test_unterminated_string() {
        let mut tokenizer = Tokenizer::new();
        let err = tokenizer.add_tokens("put \"oops\n", "test.ht").unwrap_err();
        assert!(matches!(err, ParseError::UnterminatedString { .. }));
    }

    #[test]
    fn test_tokens_remember_their_file() {
        let mut tokenizer = Tokenizer::new();
        tokenizer.add_tokens("a\n", "first.ht").unwrap();
        tokenizer.add_tokens("b\n", "second.ht").unwrap();

        let tokens = tokenizer.tokens();
        assert_eq!(tokenizer.file_name(&tokens[0]), "first.ht");
        assert_eq!(tokenizer.file_name(&tokens[2]), "second.ht");
    }

    #[test]
    fn test_spans() {
        let mut tokenizer = Tokenizer::new();
        tokenizer.add_tokens("foo + bar", "test.ht").unwrap();
        let tokens = tokenizer.tokens();

        assert_eq!(tokens[0].span.start, 0);
        assert_eq!(tokens[0].span.end, 3);
        assert_eq!(tokens[1].span.start, 4);
        assert_eq!(tokens[2].span.start, 6);
        assert_eq!(tokens[2].span.line, 1);
        assert_eq!(tokens[2].span.column, 7);
    }
}
