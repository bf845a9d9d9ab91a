//! The stack-machine runtime.
//!
//! A [`RunContext`] executes one compiled [`Script`]. The stack holds
//! [`Value`] cells for user data and frame bookkeeping alike; `bp` marks
//! the current frame and `pc` the next instruction, both signed so that −1
//! can serve as the entry sentinel. The fetch-dispatch loop runs until the
//! program counter goes negative, which only the outermost `Return` does.

pub mod error;

use std::collections::HashMap;
use std::rc::Rc;

use hypertalk_vm_parser::{Instruction, Script};

pub use error::RuntimeError;

use crate::value::Value;

/// Host-provided builtin. Arguments arrive first-written-first; a
/// function-namespace builtin pushes exactly one result value, a
/// command-namespace builtin usually writes through a reference argument
/// and pushes nothing.
pub type BuiltinFn = Rc<dyn Fn(&[Value], &mut RunContext) -> Result<(), RuntimeError>>;

/// Default cap on stack growth, bounding runaway recursion.
const DEFAULT_MAX_STACK_DEPTH: usize = 64 * 1024;

/// Execution state for one script.
///
/// The script itself is immutable and may be shared between any number of
/// independent contexts.
pub struct RunContext {
    script: Rc<Script>,
    pub stack: Vec<Value>,
    /// Program counter; −1 once the outermost handler has returned
    pub pc: isize,
    /// Base pointer: index of the current frame's saved-pc cell
    pub bp: isize,
    pub builtin_commands: HashMap<String, BuiltinFn>,
    pub builtin_functions: HashMap<String, BuiltinFn>,
    /// Buffer the `output` builtin appends to
    pub output: String,
    max_stack_depth: usize,
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("pc", &self.pc)
            .field("bp", &self.bp)
            .field("stack", &self.stack)
            .field("builtin_commands", &self.builtin_commands.keys())
            .field("builtin_functions", &self.builtin_functions.keys())
            .finish_non_exhaustive()
    }
}

impl RunContext {
    pub fn new(script: Rc<Script>) -> Self {
        Self {
            script,
            stack: Vec::with_capacity(256),
            pc: -1,
            bp: -1,
            builtin_commands: HashMap::new(),
            builtin_functions: HashMap::new(),
            output: String::new(),
            max_stack_depth: DEFAULT_MAX_STACK_DEPTH,
        }
    }

    /// Replace the stack depth cap
    pub fn with_max_stack_depth(mut self, depth: usize) -> Self {
        self.max_stack_depth = depth;
        self
    }

    pub fn script(&self) -> &Script {
        &self.script
    }

    /// Register a command-namespace builtin. Names are case-insensitive.
    pub fn register_command<F>(&mut self, name: &str, builtin: F)
    where
        F: Fn(&[Value], &mut RunContext) -> Result<(), RuntimeError> + 'static,
    {
        self.builtin_commands
            .insert(name.to_ascii_lowercase(), Rc::new(builtin));
    }

    /// Register a function-namespace builtin. Names are case-insensitive.
    pub fn register_function<F>(&mut self, name: &str, builtin: F)
    where
        F: Fn(&[Value], &mut RunContext) -> Result<(), RuntimeError> + 'static,
    {
        self.builtin_functions
            .insert(name.to_ascii_lowercase(), Rc::new(builtin));
    }

    /// Take everything the `output` builtin has produced so far
    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }

    /// Run the named handler with the given arguments.
    ///
    /// The returned value is also left on top of the stack, where the
    /// calling convention places it.
    pub fn run(
        &mut self,
        name: &str,
        is_command: bool,
        arguments: &[Value],
    ) -> Result<Value, RuntimeError> {
        let base = self.stack.len();

        for argument in arguments.iter().rev() {
            self.push(argument.clone())?;
        }
        self.push(Value::ParameterCount(arguments.len()))?;

        let first_instruction = self
            .script
            .handler(name, is_command)
            .map(|handler| handler.first_instruction)
            .ok_or_else(|| RuntimeError::UnknownMessage {
                name: name.to_string(),
                is_command,
            })?;

        self.bp = self.stack.len() as isize;
        self.push(Value::InstructionIndex(-1))?;
        self.push(Value::StackIndex(-1))?;
        self.pc = first_instruction as isize;

        let script = Rc::clone(&self.script);
        while self.pc >= 0 {
            let instruction = script
                .instructions
                .get(self.pc as usize)
                .ok_or(RuntimeError::UnknownInstruction)?;

            #[cfg(debug_assertions)]
            if std::env::var("TRACE_INSTRS").is_ok() {
                eprintln!("vm: pc={} bp={} {:?}", self.pc, self.bp, instruction);
            }

            self.dispatch(instruction)?;
        }

        match self.stack.len().checked_sub(base + 1) {
            Some(0) => {}
            Some(excess) => {
                return Err(RuntimeError::StackNotCleanedUpAtEndOfCall { excess });
            }
            None => return Err(RuntimeError::TooFewOperands),
        }
        self.stack
            .last()
            .cloned()
            .ok_or(RuntimeError::TooFewOperands)
    }

    // ==================== Stack primitives ====================

    pub fn push(&mut self, value: Value) -> Result<(), RuntimeError> {
        if self.stack.len() >= self.max_stack_depth {
            return Err(RuntimeError::StackOverflow);
        }
        self.stack.push(value);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.stack.pop().ok_or(RuntimeError::TooFewOperands)
    }

    fn stack_value(&self, index: isize) -> Result<&Value, RuntimeError> {
        if index < 0 {
            return Err(RuntimeError::StackIndexOutOfRange);
        }
        self.stack
            .get(index as usize)
            .ok_or(RuntimeError::StackIndexOutOfRange)
    }

    // ==================== Dispatch ====================

    /// Execute one instruction. Every opcode advances `pc` itself: most
    /// step by one, calls and returns set it outright, jumps add their
    /// offset without pre-incrementing.
    fn dispatch(&mut self, instruction: &Instruction) -> Result<(), RuntimeError> {
        match instruction {
            Instruction::PushUnset => {
                self.push(Value::Unset)?;
                self.pc += 1;
            }
            Instruction::PushString(text) => {
                self.push(Value::string(text.clone()))?;
                self.pc += 1;
            }
            Instruction::PushInteger(value) => {
                self.push(Value::Integer(*value))?;
                self.pc += 1;
            }
            Instruction::PushDouble(value) => {
                self.push(Value::Double(*value))?;
                self.pc += 1;
            }
            Instruction::PushParameterCount(count) => {
                self.push(Value::ParameterCount(*count))?;
                self.pc += 1;
            }
            Instruction::Reserve(count) => {
                for _ in 0..*count {
                    self.push(Value::Unset)?;
                }
                self.pc += 1;
            }
            Instruction::StackValueBpRelative(offset) => {
                let index = self.bp + offset;
                self.stack_value(index)?;
                self.push(Value::Reference(index as usize))?;
                self.pc += 1;
            }
            Instruction::Parameter(number) => {
                let count = self.stack_value(self.bp - 1)?.as_parameter_count()?;
                if count >= *number {
                    let index = self.bp - 1 - *number as isize;
                    self.stack_value(index)?;
                    self.push(Value::Reference(index as usize))?;
                } else {
                    self.push(Value::Unset)?;
                }
                self.pc += 1;
            }
            Instruction::Call { name, is_command } => self.call(name, *is_command)?,
            Instruction::Return { is_command } => self.return_from(*is_command)?,
            Instruction::JumpBy(offset) => {
                self.pc += offset;
            }
            Instruction::JumpByIfFalse(offset) => {
                let value = self.pop()?;
                if !value.as_boolean(&self.stack)? {
                    self.pc += offset;
                } else {
                    self.pc += 1;
                }
            }
            Instruction::JumpByIfTrue(offset) => {
                let value = self.pop()?;
                if value.as_boolean(&self.stack)? {
                    self.pc += offset;
                } else {
                    self.pc += 1;
                }
            }
            Instruction::PushProperty(name) => {
                let target = self.pop()?;
                let value = target.property_value(name, &self.stack)?;
                self.push(value)?;
                self.pc += 1;
            }
        }
        Ok(())
    }

    /// User handlers win over builtins of the same name; the two
    /// namespaces never cross.
    fn call(&mut self, name: &str, is_command: bool) -> Result<(), RuntimeError> {
        if let Some(first_instruction) = self
            .script
            .handler(name, is_command)
            .map(|handler| handler.first_instruction)
        {
            let new_bp = self.stack.len() as isize;
            self.push(Value::InstructionIndex(self.pc + 1))?;
            self.push(Value::StackIndex(self.bp))?;
            self.bp = new_bp;
            self.pc = first_instruction as isize;
            return Ok(());
        }

        let namespace = if is_command {
            &self.builtin_commands
        } else {
            &self.builtin_functions
        };
        let Some(builtin) = namespace.get(name).cloned() else {
            return Err(RuntimeError::UnknownMessage {
                name: name.to_string(),
                is_command,
            });
        };

        // Arguments were pushed in reverse, so popping yields them in
        // written order.
        let count = self.pop()?.as_parameter_count()?;
        let mut arguments = Vec::with_capacity(count);
        for _ in 0..count {
            arguments.push(self.pop()?);
        }
        builtin(&arguments, self)?;
        self.pc += 1;
        Ok(())
    }

    /// Tear down the current frame. Command returns write into the
    /// caller's `result` local; function returns (and the outermost
    /// return, which has no caller) push the value instead.
    fn return_from(&mut self, is_command: bool) -> Result<(), RuntimeError> {
        // Resolve now: a reference into this frame is about to die.
        let value = self.pop()?.resolved(&self.stack)?;

        if self.bp < 0 || (self.bp + 2) as usize > self.stack.len() {
            return Err(RuntimeError::StackIndexOutOfRange);
        }
        self.stack.truncate((self.bp + 2) as usize);

        let saved_bp = self.pop()?.as_stack_index()?;
        let saved_pc = self.pop()?.as_instruction_index()?;
        let count = self.pop()?.as_parameter_count()?;
        for _ in 0..count {
            self.pop()?;
        }
        self.bp = saved_bp;
        self.pc = saved_pc;

        if is_command && saved_bp >= 0 {
            let result_index = (saved_bp + 2) as usize;
            *self
                .stack
                .get_mut(result_index)
                .ok_or(RuntimeError::StackIndexOutOfRange)? = value;
        } else {
            self.push(value)?;
        }
        Ok(())
    }
}
