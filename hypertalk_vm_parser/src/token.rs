//! Token definitions for the HyperTalk-style lexer
//!
//! A logos-generated raw layer feeds the public [`Token`] buffer built by
//! the tokenizer. The surface language distinguishes only five token kinds;
//! keywords are ordinary identifiers matched case-insensitively by the
//! parser.

use logos::Logos;
use serde::{Deserialize, Serialize};

use crate::span::Span;

/// Raw lexer tokens.
///
/// Multi-character operators are listed explicitly so that longest-match
/// tokenization splits symbol runs the way the language expects
/// (`<=` before `<`, `&&` before `&`).
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\f\r]+")]
pub enum RawToken {
    /// `--` comment, discarded while building the token buffer
    #[regex(r"--[^\n]*")]
    LineComment,

    #[token("\n")]
    Newline,

    /// Double-quoted string. No escape processing: the scan simply runs to
    /// the next `"`.
    #[regex(r#""[^"]*""#)]
    QuotedString,

    /// Digits with a decimal point; the fraction digits may be absent, so
    /// `7.` is a number, not an integer followed by a symbol.
    #[regex(r"[0-9]+\.[0-9]*")]
    DoubleLiteral,

    #[regex(r"[0-9]+")]
    IntegerLiteral,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Identifier,

    #[token("&&")]
    AmpAmp,

    #[token("<=")]
    LessEqual,

    #[token(">=")]
    GreaterEqual,

    /// Any other single punctuation character
    #[regex(r#"[^\s0-9A-Za-z_"]"#)]
    Symbol,
}

/// The kind of a tokenized lexeme, carrying its decoded payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TokenKind {
    /// Contents of a double-quoted string, quotes stripped
    QuotedString(String),
    /// An identifier word; comparison is ASCII case-insensitive
    UnquotedString(String),
    Integer(i64),
    Double(f64),
    /// A single punctuation character or one of `&&`, `<=`, `>=`.
    /// A line break is the symbol `"\n"`.
    Symbol(String),
}

impl TokenKind {
    /// True for the distinguished newline symbol.
    pub fn is_newline(&self) -> bool {
        matches!(self, TokenKind::Symbol(s) if s == "\n")
    }

    /// Case-insensitive identifier match.
    pub fn is_identifier(&self, word: &str) -> bool {
        matches!(self, TokenKind::UnquotedString(s) if s.eq_ignore_ascii_case(word))
    }

    /// Short description used in parse error messages.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::QuotedString(s) => format!("string \"{}\"", s),
            TokenKind::UnquotedString(s) => format!("identifier '{}'", s),
            TokenKind::Integer(i) => format!("integer {}", i),
            TokenKind::Double(d) => format!("number {}", d),
            TokenKind::Symbol(s) if s == "\n" => "end of line".to_string(),
            TokenKind::Symbol(s) => format!("symbol '{}'", s),
        }
    }
}

/// A token with its source span and the index of the file it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// Index into the tokenizer's file table
    pub file: u32,
}
