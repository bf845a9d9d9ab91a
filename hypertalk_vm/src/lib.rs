//! hypertalk_vm
//!
//! Stack-machine runtime for a HyperTalk-style scripting language. The
//! companion `hypertalk_vm_parser` crate compiles source text into a
//! [`Script`]; this crate executes it with a calling convention that
//! treats script-defined handlers and host builtins uniformly, in two
//! separate namespaces for commands and functions.
//!
//! # Example
//!
//! ```
//! use hypertalk_vm::api::run_command;
//!
//! let outcome = run_command(
//!     "on main\noutput \"hello\" && \"world\"\nend main\n",
//!     "main",
//!     &[],
//! )
//! .expect("run failed");
//!
//! assert_eq!(outcome.output, "hello world\n");
//! ```

// Core modules
pub mod builtins;
pub mod value;
pub mod vm;

// Bytecode file format
pub mod bytecode;

// Rust API for programmatic use
pub mod api;
pub use api::{compile_to_json, parse_source, run_command, run_function, InterpreterError};

// Re-exports
pub use hypertalk_vm_parser::{
    Instruction, ParseError, Parser, Script, Syntax, SyntaxElement, SyntaxValueKind, Tokenizer,
};
pub use builtins::install_standard_builtins;
pub use value::{NativeObject, NativeObjectRef, Value, WeakNativeObjectRef};
pub use vm::{BuiltinFn, RunContext, RuntimeError};
