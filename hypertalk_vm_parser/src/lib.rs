//! hypertalk_vm_parser
//!
//! Tokenizer and bytecode-generating parser for a HyperTalk-style scripting
//! language: English-shaped commands, case-insensitive identifiers, and
//! "everything is a string" value semantics.
//!
//! The parser emits stack-machine instructions directly while it reads the
//! token buffer; the compiled [`Script`] is executed by the companion
//! `hypertalk_vm` crate.
//!
//! # Example
//!
//! ```
//! use hypertalk_vm_parser::{Parser, Tokenizer};
//!
//! let mut tokenizer = Tokenizer::new();
//! tokenizer
//!     .add_tokens("on main\nput 5 into x\nend main\n", "example.ht")
//!     .expect("tokenize failed");
//!
//! let mut parser = Parser::new();
//! parser.parse(&tokenizer).expect("parse failed");
//!
//! assert!(parser.script.handler("main", true).is_some());
//! ```

pub mod cursor;
pub mod error;
pub mod instr;
pub mod parser;
pub mod script;
pub mod span;
pub mod syntax;
pub mod token;
pub mod tokenizer;

// Re-exports
pub use cursor::TokenCursor;
pub use error::{ParseError, ParseResult, SourceLocation};
pub use instr::Instruction;
pub use parser::Parser;
pub use script::{FrameDescriptor, Script, VariableBinding, Variables};
pub use span::{SourceMap, Span};
pub use syntax::{standard_syntaxes, Syntax, SyntaxElement, SyntaxValueKind};
pub use token::{Token, TokenKind};
pub use tokenizer::Tokenizer;
