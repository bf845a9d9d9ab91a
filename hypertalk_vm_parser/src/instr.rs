//! The instruction set emitted by the parser and executed by the runtime.

use serde::{Deserialize, Serialize};

/// One bytecode instruction.
///
/// Jump offsets are relative to the *current* instruction; the jump opcodes
/// do not pre-increment the program counter before applying them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    /// Push the distinguishable "no value" cell
    PushUnset,
    PushString(String),
    PushInteger(i64),
    PushDouble(f64),
    /// Record how many arguments the caller pushed
    PushParameterCount(usize),
    /// Push n Unset cells (a handler's local-variable frame)
    Reserve(usize),
    /// Push a reference to the stack cell at base pointer + offset
    StackValueBpRelative(isize),
    /// Push a reference to caller argument i (1-based), or Unset when the
    /// caller supplied fewer than i arguments
    Parameter(usize),
    /// Invoke a handler or builtin; `is_command` selects the namespace
    Call { name: String, is_command: bool },
    /// Unwind the current frame and hand the popped value back
    Return { is_command: bool },
    /// Unconditional relative jump
    JumpBy(isize),
    /// Pop a boolean; jump when false, fall through otherwise
    JumpByIfFalse(isize),
    /// Pop a boolean; jump when true, fall through otherwise
    JumpByIfTrue(isize),
    /// Pop a target value and push the named property of it
    PushProperty(String),
}
