//! Statement parsing: control flow, English command templates, and the
//! generic call fallback.

use crate::error::{ParseError, ParseResult};
use crate::instr::Instruction;
use crate::syntax::SyntaxValueKind;

use super::expressions::emit_call_into;
use super::Codegen;

impl Codegen<'_, '_> {
    /// Parse one statement, emitting its instructions. The trailing line
    /// break is left for the caller.
    pub(crate) fn parse_statement(&mut self) -> ParseResult<()> {
        if self.cursor.has_identifier("repeat", true).is_some() {
            return self.parse_repeat();
        }
        if self.cursor.has_identifier("if", true).is_some() {
            return self.parse_if();
        }
        if self.parse_english_call()? {
            return Ok(());
        }
        if self.cursor.has_identifier("local", true).is_some() {
            // Writable-mode parsing registers the identifier as a local;
            // the compiled instructions themselves are discarded.
            let mut scratch = Vec::new();
            if !self.parse_value(&mut scratch, true)? {
                return Err(ParseError::ExpectedValue {
                    found: self.cursor.describe_current(),
                    location: self.cursor.location(),
                });
            }
            return Ok(());
        }
        if self.cursor.has_identifier("return", true).is_some() {
            let mut instructions = Vec::new();
            if self.cursor.at_end_of_line() {
                instructions.push(Instruction::PushUnset);
            } else if !self.parse_expression(&mut instructions, &[], false)? {
                return Err(ParseError::ExpectedExpression {
                    found: self.cursor.describe_current(),
                    location: self.cursor.location(),
                });
            }
            self.emit_all(instructions);
            self.emit(Instruction::Return {
                is_command: self.in_command,
            });
            return Ok(());
        }
        self.parse_generic_call()
    }

    // ==================== English command templates ====================

    /// Try every registered template in order; the cursor is restored after
    /// each failed attempt. Returns false when none matched.
    fn parse_english_call(&mut self) -> ParseResult<bool> {
        let syntaxes = self.syntaxes;
        'templates: for syntax in syntaxes {
            let save = self.cursor.save();
            let words: Vec<&str> = syntax.words.iter().map(String::as_str).collect();
            if !self.cursor.has_identifiers(&words, true) {
                continue;
            }

            let mut params: Vec<Vec<Instruction>> = Vec::new();
            for element in &syntax.elements {
                let element_save = self.cursor.save();
                if !element.prefix.is_empty() {
                    let prefix: Vec<&str> = element.prefix.iter().map(String::as_str).collect();
                    if !self.cursor.has_identifiers(&prefix, true) {
                        if element.required {
                            self.cursor.restore(save);
                            continue 'templates;
                        }
                        continue;
                    }
                }

                let matched = match &element.kind {
                    SyntaxValueKind::Expression => {
                        let mut instructions = Vec::new();
                        if self.parse_expression(&mut instructions, &[], false)? {
                            params.push(instructions);
                            true
                        } else {
                            false
                        }
                    }
                    SyntaxValueKind::Container => {
                        let mut instructions = Vec::new();
                        if self.parse_expression(&mut instructions, &[], true)? {
                            params.push(instructions);
                            true
                        } else {
                            false
                        }
                    }
                    SyntaxValueKind::Identifier(expected) => {
                        let mut hit = false;
                        for word in expected {
                            if self.cursor.has_identifier(word, true).is_some() {
                                params.push(vec![Instruction::PushString(
                                    word.to_ascii_lowercase(),
                                )]);
                                hit = true;
                                break;
                            }
                        }
                        hit
                    }
                    SyntaxValueKind::AnyIdentifier => {
                        if let Some(text) = self.cursor.has_any_identifier(true) {
                            params.push(vec![Instruction::PushString(text)]);
                            true
                        } else {
                            false
                        }
                    }
                    SyntaxValueKind::None => true,
                };

                if !matched {
                    if element.required {
                        self.cursor.restore(save);
                        continue 'templates;
                    }
                    self.cursor.restore(element_save);
                }
            }

            let mut out = Vec::new();
            emit_call_into(&mut out, &syntax.name(), true, params);
            self.emit_all(out);
            return Ok(true);
        }
        Ok(false)
    }

    // ==================== Generic calls ====================

    /// `name arg1, arg2, ...` — the fallback for command-position
    /// statements that match no template.
    fn parse_generic_call(&mut self) -> ParseResult<()> {
        let found = self.cursor.describe_current();
        let location = self.cursor.location();
        let Some(name) = self.cursor.has_any_identifier(true) else {
            return Err(ParseError::ExpectedIdentifier {
                expected: "a handler name".to_string(),
                found,
                location,
            });
        };
        let params = self.parse_argument_list()?;
        let mut out = Vec::new();
        emit_call_into(&mut out, &name.to_ascii_lowercase(), true, params);
        self.emit_all(out);
        Ok(())
    }

    // ==================== Conditionals ====================

    fn parse_if(&mut self) -> ParseResult<()> {
        let mut condition = Vec::new();
        if !self.parse_expression(&mut condition, &[], false)? {
            return Err(ParseError::ExpectedExpression {
                found: self.cursor.describe_current(),
                location: self.cursor.location(),
            });
        }
        self.emit_all(condition);
        self.cursor.skip_newlines();
        self.cursor.expect_the_identifier("then")?;

        let jump_false = self.emit(Instruction::JumpByIfFalse(0));

        if !self.cursor.at_end_of_line() {
            // Single-line true branch.
            self.parse_statement()?;

            let save = self.cursor.save();
            self.cursor.skip_newlines();
            if self.cursor.has_identifier("else", true).is_some() {
                let jump_end = self.emit(Instruction::JumpBy(0));
                self.patch_jump(jump_false);
                if !self.cursor.at_end_of_line() {
                    self.parse_statement()?;
                } else {
                    self.parse_else_block()?;
                }
                self.patch_jump(jump_end);
            } else {
                self.cursor.restore(save);
                self.patch_jump(jump_false);
            }
            return Ok(());
        }

        // Multi-line: statements until `else` or `end if`.
        loop {
            self.cursor.skip_newlines();
            if self.cursor.has_identifiers(&["end", "if"], true) {
                self.patch_jump(jump_false);
                return Ok(());
            }
            if self.cursor.has_identifier("else", true).is_some() {
                let jump_end = self.emit(Instruction::JumpBy(0));
                self.patch_jump(jump_false);
                self.parse_else_block()?;
                self.patch_jump(jump_end);
                return Ok(());
            }
            if self.cursor.is_at_end() {
                return Err(ParseError::ExpectedIdentifier {
                    expected: "end if".to_string(),
                    found: self.cursor.describe_current(),
                    location: self.cursor.location(),
                });
            }
            self.parse_statement()?;
            self.cursor.expect_end_of_line()?;
        }
    }

    /// False branch of a multi-line conditional, through `end if`. Also
    /// accepts a statement on the `else` line itself.
    fn parse_else_block(&mut self) -> ParseResult<()> {
        loop {
            self.cursor.skip_newlines();
            if self.cursor.has_identifiers(&["end", "if"], true) {
                return Ok(());
            }
            if self.cursor.is_at_end() {
                return Err(ParseError::ExpectedIdentifier {
                    expected: "end if".to_string(),
                    found: self.cursor.describe_current(),
                    location: self.cursor.location(),
                });
            }
            self.parse_statement()?;
            self.cursor.expect_end_of_line()?;
        }
    }

    // ==================== Loops ====================

    fn parse_repeat(&mut self) -> ParseResult<()> {
        if self.cursor.has_identifier("while", true).is_some() {
            return self.parse_repeat_while();
        }
        if self.cursor.has_identifier("with", true).is_some() {
            return self.parse_repeat_with();
        }
        self.parse_repeat_times()
    }

    /// `repeat while <expr> ... end repeat`
    fn parse_repeat_while(&mut self) -> ParseResult<()> {
        let condition_start = self.here();
        let mut condition = Vec::new();
        if !self.parse_expression(&mut condition, &[], false)? {
            return Err(ParseError::ExpectedExpression {
                found: self.cursor.describe_current(),
                location: self.cursor.location(),
            });
        }
        self.emit_all(condition);
        let jump_out = self.emit(Instruction::JumpByIfFalse(0));
        self.cursor.expect_end_of_line()?;

        self.parse_repeat_body()?;

        let jump_back = self.here();
        self.emit(Instruction::JumpBy(
            condition_start as isize - jump_back as isize,
        ));
        self.patch_jump(jump_out);
        Ok(())
    }

    /// `repeat with <name> from <start> [down] to <end> ... end repeat`
    ///
    /// Compiles to `put start into name` followed by a while loop that
    /// checks `name <= end` and adds the step each time around. The
    /// comparison is `<=` regardless of direction, so a `down to` loop over
    /// a genuinely descending range never enters its body.
    fn parse_repeat_with(&mut self) -> ParseResult<()> {
        let name = self.cursor.expect_identifier()?;
        let binding = match self.variables.lookup(&name) {
            Some(binding) => binding,
            None => self.variables.add_local(&name),
        };
        self.cursor.expect_the_identifier("from")?;

        let mut start = Vec::new();
        if !self.parse_expression(&mut start, &[], false)? {
            return Err(ParseError::ExpectedExpression {
                found: self.cursor.describe_current(),
                location: self.cursor.location(),
            });
        }
        let descending = self.cursor.has_identifier("down", true).is_some();
        self.cursor.expect_the_identifier("to")?;
        let mut end = Vec::new();
        if !self.parse_expression(&mut end, &[], false)? {
            return Err(ParseError::ExpectedExpression {
                found: self.cursor.describe_current(),
                location: self.cursor.location(),
            });
        }
        self.cursor.expect_end_of_line()?;

        // put <start> into <name>
        self.emit(binding.instruction());
        self.emit_all(start);
        self.emit(Instruction::PushParameterCount(2));
        self.emit(Instruction::Call {
            name: "put".to_string(),
            is_command: true,
        });

        // while <name> <= <end>
        let condition_start = self.here();
        self.emit_all(end);
        self.emit(binding.instruction());
        self.emit(Instruction::PushParameterCount(2));
        self.emit(Instruction::Call {
            name: "<=".to_string(),
            is_command: false,
        });
        let jump_out = self.emit(Instruction::JumpByIfFalse(0));

        self.parse_repeat_body()?;

        // add <step> to <name>
        self.emit(binding.instruction());
        self.emit(Instruction::PushInteger(if descending { -1 } else { 1 }));
        self.emit(Instruction::PushParameterCount(2));
        self.emit(Instruction::Call {
            name: "add".to_string(),
            is_command: true,
        });

        let jump_back = self.here();
        self.emit(Instruction::JumpBy(
            condition_start as isize - jump_back as isize,
        ));
        self.patch_jump(jump_out);
        Ok(())
    }

    /// `repeat [for] <count> [times] ... end repeat`
    ///
    /// The synthesized counter runs *down* to zero with a `>` check, so the
    /// body executes max(0, count) times and a negative count skips the
    /// loop entirely.
    fn parse_repeat_times(&mut self) -> ParseResult<()> {
        let _ = self.cursor.has_identifier("for", true);
        let mut count = Vec::new();
        if !self.parse_expression(&mut count, &[], false)? {
            return Err(ParseError::ExpectedExpression {
                found: self.cursor.describe_current(),
                location: self.cursor.location(),
            });
        }
        let _ = self.cursor.has_identifier("times", true);
        self.cursor.expect_end_of_line()?;

        // The ':' keeps the synthesized name out of the identifier space.
        let counter = format!("repeat:{}", self.next_synthetic());
        let binding = self.variables.add_local(&counter);

        // put <count> into <counter>
        self.emit(binding.instruction());
        self.emit_all(count);
        self.emit(Instruction::PushParameterCount(2));
        self.emit(Instruction::Call {
            name: "put".to_string(),
            is_command: true,
        });

        // while <counter> > 0
        let condition_start = self.here();
        self.emit(Instruction::PushInteger(0));
        self.emit(binding.instruction());
        self.emit(Instruction::PushParameterCount(2));
        self.emit(Instruction::Call {
            name: ">".to_string(),
            is_command: false,
        });
        let jump_out = self.emit(Instruction::JumpByIfFalse(0));

        self.parse_repeat_body()?;

        // subtract 1 from <counter>
        self.emit(binding.instruction());
        self.emit(Instruction::PushInteger(1));
        self.emit(Instruction::PushParameterCount(2));
        self.emit(Instruction::Call {
            name: "subtract".to_string(),
            is_command: true,
        });

        let jump_back = self.here();
        self.emit(Instruction::JumpBy(
            condition_start as isize - jump_back as isize,
        ));
        self.patch_jump(jump_out);
        Ok(())
    }

    /// Loop body statements through `end repeat`
    fn parse_repeat_body(&mut self) -> ParseResult<()> {
        loop {
            self.cursor.skip_newlines();
            if self.cursor.has_identifiers(&["end", "repeat"], true) {
                return Ok(());
            }
            if self.cursor.is_at_end() {
                return Err(ParseError::ExpectedIdentifier {
                    expected: "end repeat".to_string(),
                    found: self.cursor.describe_current(),
                    location: self.cursor.location(),
                });
            }
            self.parse_statement()?;
            self.cursor.expect_end_of_line()?;
        }
    }
}
