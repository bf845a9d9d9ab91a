//! Rust API for compiling and running scripts.
//!
//! This module provides ergonomic one-shot functions for programmatic use;
//! hosts that need custom builtins or syntax templates drive the
//! [`Tokenizer`]/[`Parser`]/[`RunContext`] pieces directly.

use std::rc::Rc;

use hypertalk_vm_parser::{ParseError, Parser, Script, Tokenizer};

use crate::builtins::install_standard_builtins;
use crate::value::Value;
use crate::vm::{RunContext, RuntimeError};

/// Error variants produced by the compile-and-run pipeline.
#[derive(Debug)]
pub enum InterpreterError {
    /// Source code failed to tokenize or parse
    Parse(ParseError),
    /// Execution failed
    Runtime(RuntimeError),
}

impl std::fmt::Display for InterpreterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InterpreterError::Parse(e) => write!(f, "parse error: {}", e),
            InterpreterError::Runtime(e) => write!(f, "runtime error: {}", e),
        }
    }
}

impl std::error::Error for InterpreterError {}

impl From<ParseError> for InterpreterError {
    fn from(e: ParseError) -> Self {
        InterpreterError::Parse(e)
    }
}

impl From<RuntimeError> for InterpreterError {
    fn from(e: RuntimeError) -> Self {
        InterpreterError::Runtime(e)
    }
}

/// What a one-shot run produced: the handler's value plus everything the
/// `output` builtin captured.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub value: Value,
    pub output: String,
}

/// Parse source text into a compiled script.
pub fn parse_source(source: &str, file_name: &str) -> Result<Script, ParseError> {
    let mut tokenizer = Tokenizer::new();
    tokenizer.add_tokens(source, file_name)?;
    let mut parser = Parser::new();
    parser.parse(&tokenizer)?;
    Ok(parser.into_script())
}

/// Compile source text and dump the script as JSON, for tooling.
pub fn compile_to_json(source: &str, file_name: &str) -> Option<String> {
    let script = parse_source(source, file_name).ok()?;
    serde_json::to_string_pretty(&script).ok()
}

/// Parse `source`, install the standard builtins, and run the named
/// command handler.
pub fn run_command(
    source: &str,
    handler: &str,
    arguments: &[Value],
) -> Result<RunOutcome, InterpreterError> {
    run_handler(source, handler, true, arguments)
}

/// Parse `source`, install the standard builtins, and run the named
/// function handler.
pub fn run_function(
    source: &str,
    handler: &str,
    arguments: &[Value],
) -> Result<RunOutcome, InterpreterError> {
    run_handler(source, handler, false, arguments)
}

fn run_handler(
    source: &str,
    handler: &str,
    is_command: bool,
    arguments: &[Value],
) -> Result<RunOutcome, InterpreterError> {
    let script = Rc::new(parse_source(source, "<script>")?);
    let mut context = RunContext::new(script);
    install_standard_builtins(&mut context);
    let value = context.run(handler, is_command, arguments)?;
    Ok(RunOutcome {
        value,
        output: context.take_output(),
    })
}
