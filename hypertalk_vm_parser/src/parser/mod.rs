//! Syntax-directed bytecode generator
//!
//! The parser walks the token buffer once and emits instructions straight
//! into a [`Script`]; there is no intermediate syntax tree apart from the
//! operator-precedence tree built per expression. Backtracking (for the
//! English command templates and the unquoted-string fallback) is cursor
//! save/restore only.

mod expressions;
mod statements;

use crate::cursor::TokenCursor;
use crate::error::{ParseError, ParseResult};
use crate::instr::Instruction;
use crate::script::{FrameDescriptor, Script, Variables};
use crate::syntax::{standard_syntaxes, Syntax};
use crate::tokenizer::Tokenizer;

/// HyperTalk-style parser.
///
/// Construct one, optionally register extra [`Syntax`] templates, then feed
/// it a tokenizer; the compiled result accumulates in [`Parser::script`].
#[derive(Debug)]
pub struct Parser {
    /// The compiled output
    pub script: Script,
    syntaxes: Vec<Syntax>,
}

impl Parser {
    /// Create a parser preloaded with the standard command templates
    pub fn new() -> Self {
        Self {
            script: Script::new(),
            syntaxes: standard_syntaxes(),
        }
    }

    /// Register an additional English command template. Templates are tried
    /// in registration order, built-ins first.
    pub fn add_syntax(&mut self, syntax: Syntax) {
        self.syntaxes.push(syntax);
    }

    /// Parse every handler in the tokenizer's buffer into `self.script`.
    pub fn parse(&mut self, tokenizer: &Tokenizer) -> ParseResult<()> {
        let mut codegen = Codegen {
            cursor: TokenCursor::new(tokenizer),
            script: &mut self.script,
            syntaxes: &self.syntaxes,
            variables: Variables::default(),
            in_command: true,
            synthetic_counter: 0,
        };
        codegen.parse_top_level()
    }

    /// Consume the parser, yielding the compiled script
    pub fn into_script(self) -> Script {
        self.script
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

/// One parse run: the cursor plus the state of the handler currently being
/// compiled.
pub(crate) struct Codegen<'a, 't> {
    pub(crate) cursor: TokenCursor<'t>,
    pub(crate) script: &'a mut Script,
    pub(crate) syntaxes: &'a [Syntax],
    /// Frame of the handler being compiled
    pub(crate) variables: Variables,
    /// Whether that handler is a command (`on`) or a function
    pub(crate) in_command: bool,
    /// Source of unique names for synthesized loop counters
    pub(crate) synthetic_counter: usize,
}

impl Codegen<'_, '_> {
    /// Top-level loop: handlers, with anything unrecognized skipped line by
    /// line.
    fn parse_top_level(&mut self) -> ParseResult<()> {
        loop {
            self.cursor.skip_newlines();
            if self.cursor.is_at_end() {
                return Ok(());
            }
            if self.cursor.has_identifier("on", true).is_some() {
                self.parse_handler(true)?;
            } else if self.cursor.has_identifier("function", true).is_some() {
                self.parse_handler(false)?;
            } else {
                self.cursor.skip_line();
            }
        }
    }

    /// Parse one `on NAME ... end NAME` or `function NAME ... end NAME`
    /// block and register its frame descriptor.
    fn parse_handler(&mut self, is_command: bool) -> ParseResult<()> {
        let found = self.cursor.describe_current();
        let location = self.cursor.location();
        let Some(name) = self.cursor.has_any_identifier(true) else {
            return Err(ParseError::ExpectedFunctionName { found, location });
        };

        self.variables = Variables::default();
        self.in_command = is_command;

        // Placeholder; patched below once the local count is known.
        let reserve = self.emit(Instruction::Reserve(0));

        // `result` is always the first local. Command returns write into
        // the caller's copy of it.
        self.variables.add_local("result");

        if !self.cursor.at_end_of_line() {
            loop {
                let parameter = self.cursor.expect_identifier()?;
                self.variables.add_parameter(&parameter);
                if self.cursor.has_symbol(",", true).is_none() {
                    break;
                }
            }
        }
        self.cursor.expect_end_of_line()?;

        loop {
            self.cursor.skip_newlines();
            if self.cursor.is_at_end() || self.cursor.has_identifier("end", false).is_some() {
                break;
            }
            self.parse_statement()?;
            self.cursor.expect_end_of_line()?;
        }

        // Implicit return value for handlers that fall off the end.
        self.emit(Instruction::PushUnset);
        self.emit(Instruction::Return { is_command });

        self.cursor.expect_identifiers(&["end", name.as_str()])?;

        self.script.instructions[reserve] = Instruction::Reserve(self.variables.num_locals);
        let descriptor = FrameDescriptor {
            first_instruction: reserve,
            variables: std::mem::take(&mut self.variables),
        };
        let namespace = if is_command {
            &mut self.script.commands
        } else {
            &mut self.script.functions
        };
        namespace.insert(name.to_ascii_lowercase(), descriptor);
        Ok(())
    }

    // ==================== Emission helpers ====================

    /// Index the next emitted instruction will land at
    pub(crate) fn here(&self) -> usize {
        self.script.instructions.len()
    }

    /// Append one instruction, returning its index
    pub(crate) fn emit(&mut self, instruction: Instruction) -> usize {
        let index = self.here();
        self.script.instructions.push(instruction);
        index
    }

    /// Append a pre-built instruction sequence
    pub(crate) fn emit_all(&mut self, instructions: Vec<Instruction>) {
        self.script.instructions.extend(instructions);
    }

    /// Point the jump at `at` to the next instruction to be emitted.
    /// Offsets are relative to the jump itself.
    pub(crate) fn patch_jump(&mut self, at: usize) {
        let offset = self.here() as isize - at as isize;
        match &mut self.script.instructions[at] {
            Instruction::JumpBy(n)
            | Instruction::JumpByIfFalse(n)
            | Instruction::JumpByIfTrue(n) => *n = offset,
            other => unreachable!("patching a non-jump instruction {:?}", other),
        }
    }

    pub(crate) fn next_synthetic(&mut self) -> usize {
        let n = self.synthetic_counter;
        self.synthetic_counter += 1;
        n
    }
}
