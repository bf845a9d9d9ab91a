//! Value and expression parsing
//!
//! Expressions compile through a small operator-precedence tree: operands
//! are pre-compiled instruction runs, and each operator splices into the
//! tree's right spine according to the precedence table. Linearization
//! pushes the right side first so the first written argument ends up on top
//! of the stack, where the calling convention expects it.

use crate::error::{ParseError, ParseResult};
use crate::instr::Instruction;

use super::Codegen;

/// Binding strength of an infix operator; smaller binds tighter. Symbols
/// outside the table (the comparison operators among them) parse as the
/// loosest combinators.
fn precedence(op: &str) -> usize {
    match op {
        "*" => 0,
        "/" => 1,
        "-" => 2,
        "+" => 3,
        "&" => 4,
        "&&" => 5,
        _ => usize::MAX,
    }
}

/// Expression positions stop at brackets; only argument lists use them.
fn is_bracket(symbol: &str) -> bool {
    matches!(symbol, "(" | ")" | "[" | "]" | "{" | "}")
}

/// The per-expression operator tree.
enum ExprNode {
    Operand(Vec<Instruction>),
    Operation {
        op: String,
        lhs: Box<ExprNode>,
        rhs: Box<ExprNode>,
    },
}

/// Splice a new operator and operand into the tree. Descends the right
/// spine while the existing operation binds more loosely (strictly larger
/// precedence number), replacing that node's right side; otherwise the new
/// operation becomes the root with the old tree as its left side.
fn attach(tree: ExprNode, op: String, operand: Vec<Instruction>) -> ExprNode {
    match tree {
        ExprNode::Operation {
            op: top,
            lhs,
            rhs,
        } if precedence(&top) > precedence(&op) => ExprNode::Operation {
            op: top,
            lhs,
            rhs: Box::new(attach(*rhs, op, operand)),
        },
        other => ExprNode::Operation {
            op,
            lhs: Box::new(other),
            rhs: Box::new(ExprNode::Operand(operand)),
        },
    }
}

/// Post-order linearization: right side first, then left, then the
/// two-argument call of the operator's function-namespace builtin.
fn linearize(node: ExprNode, out: &mut Vec<Instruction>) {
    match node {
        ExprNode::Operand(instructions) => out.extend(instructions),
        ExprNode::Operation { op, lhs, rhs } => {
            linearize(*rhs, out);
            linearize(*lhs, out);
            out.push(Instruction::PushParameterCount(2));
            out.push(Instruction::Call {
                name: op,
                is_command: false,
            });
        }
    }
}

/// The instruction a named constant compiles to, if the identifier is one.
fn constant_instruction(name: &str) -> Option<Instruction> {
    match name.to_ascii_lowercase().as_str() {
        "quote" => Some(Instruction::PushString("\"".to_string())),
        "return" => Some(Instruction::PushString("\r".to_string())),
        "linefeed" | "newline" => Some(Instruction::PushString("\n".to_string())),
        "tab" => Some(Instruction::PushString("\t".to_string())),
        "pi" => Some(Instruction::PushDouble(std::f64::consts::PI)),
        _ => None,
    }
}

/// Append `params` as a call: arguments in reverse push order, then the
/// argument count, then the call itself.
pub(super) fn emit_call_into(
    out: &mut Vec<Instruction>,
    name: &str,
    is_command: bool,
    params: Vec<Vec<Instruction>>,
) {
    let count = params.len();
    for param in params.into_iter().rev() {
        out.extend(param);
    }
    out.push(Instruction::PushParameterCount(count));
    out.push(Instruction::Call {
        name: name.to_string(),
        is_command,
    });
}

impl Codegen<'_, '_> {
    /// Parse one value into `out`. Returns false, leaving the cursor
    /// untouched, when the current token cannot start a value.
    ///
    /// In writable mode an unknown identifier allocates a new local in the
    /// current frame instead of falling back to a string literal; this is
    /// what makes `put 5 into myNewVar` work.
    pub(crate) fn parse_value(
        &mut self,
        out: &mut Vec<Instruction>,
        writable: bool,
    ) -> ParseResult<bool> {
        if let Some(text) = self.cursor.has_string(true) {
            out.push(Instruction::PushString(text));
            return Ok(true);
        }
        if let Some(value) = self.cursor.has_integer(true) {
            out.push(Instruction::PushInteger(value));
            return Ok(true);
        }
        if let Some(value) = self.cursor.has_double(true) {
            out.push(Instruction::PushDouble(value));
            return Ok(true);
        }

        let Some(identifier) = self.cursor.has_any_identifier(true) else {
            return Ok(false);
        };

        if let Some(instruction) = constant_instruction(&identifier) {
            out.push(instruction);
            return Ok(true);
        }

        // foo(...) is a function call
        if self.cursor.has_symbol("(", true).is_some() {
            let params = self.parse_argument_list()?;
            self.cursor.expect_symbol(")")?;
            emit_call_into(out, &identifier.to_ascii_lowercase(), false, params);
            return Ok(true);
        }

        // `length of target` pushes the target, then fetches the property
        if self.cursor.has_identifier("of", true).is_some() {
            let mut target = Vec::new();
            if !self.parse_value(&mut target, false)? {
                return Err(ParseError::ExpectedValue {
                    found: self.cursor.describe_current(),
                    location: self.cursor.location(),
                });
            }
            out.extend(target);
            out.push(Instruction::PushProperty(identifier.to_ascii_lowercase()));
            return Ok(true);
        }

        if let Some(binding) = self.variables.lookup(&identifier) {
            out.push(binding.instruction());
            return Ok(true);
        }

        if writable {
            let binding = self.variables.add_local(&identifier);
            out.push(binding.instruction());
            return Ok(true);
        }

        // Unquoted-string fallback: a bare word is its own text.
        out.push(Instruction::PushString(identifier));
        Ok(true)
    }

    /// Parse an infix expression into `out`. Returns false, cursor
    /// untouched, when no leading value is present.
    ///
    /// The expression ends at a newline, a bracket, any symbol listed in
    /// `forbidden`, or an operator with nothing parseable after it (the
    /// operator is un-consumed in that case).
    pub(crate) fn parse_expression(
        &mut self,
        out: &mut Vec<Instruction>,
        forbidden: &[&str],
        writable: bool,
    ) -> ParseResult<bool> {
        let mut lead = Vec::new();
        if !self.parse_value(&mut lead, writable)? {
            return Ok(false);
        }
        let mut tree = ExprNode::Operand(lead);

        loop {
            let save = self.cursor.save();
            let Some(symbol) = self.cursor.has_any_symbol(false) else {
                break;
            };
            if symbol == "\n" || is_bracket(&symbol) || forbidden.contains(&symbol.as_str()) {
                break;
            }
            self.cursor.advance();

            let mut operand = Vec::new();
            if !self.parse_value(&mut operand, false)? {
                self.cursor.restore(save);
                break;
            }
            tree = attach(tree, symbol, operand);
        }

        linearize(tree, out);
        Ok(true)
    }

    /// Comma-separated argument expressions, as used by `name(...)` calls
    /// and generic command calls.
    pub(crate) fn parse_argument_list(&mut self) -> ParseResult<Vec<Vec<Instruction>>> {
        let mut params = Vec::new();
        let mut first = Vec::new();
        if self.parse_expression(&mut first, &[",", ")"], false)? {
            params.push(first);
            while self.cursor.has_symbol(",", true).is_some() {
                let mut next = Vec::new();
                if !self.parse_expression(&mut next, &[",", ")"], false)? {
                    return Err(ParseError::ExpectedExpression {
                        found: self.cursor.describe_current(),
                        location: self.cursor.location(),
                    });
                }
                params.push(next);
            }
        }
        Ok(params)
    }
}
