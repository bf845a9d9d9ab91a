//! Parser tests
//!
//! Structural checks on the instructions and frame descriptors the parser
//! emits for handlers, statements, and templates.

use pretty_assertions::assert_eq;

use hypertalk_vm_parser::{
    Instruction, ParseError, Parser, Script, Syntax, SyntaxElement, SyntaxValueKind, Tokenizer,
    VariableBinding,
};

fn parse(source: &str) -> Script {
    let mut tokenizer = Tokenizer::new();
    tokenizer.add_tokens(source, "test.ht").expect("tokenize failed");
    let mut parser = Parser::new();
    parser.parse(&tokenizer).expect("parse failed");
    parser.into_script()
}

fn parse_error(source: &str) -> ParseError {
    let mut tokenizer = Tokenizer::new();
    match tokenizer.add_tokens(source, "test.ht") {
        Err(error) => return error,
        Ok(()) => {}
    }
    let mut parser = Parser::new();
    parser.parse(&tokenizer).expect_err("expected a parse error")
}

fn call(name: &str, is_command: bool) -> Instruction {
    Instruction::Call {
        name: name.to_string(),
        is_command,
    }
}

// ==================== Handlers ====================

#[test]
fn test_empty_command_handler() {
    let script = parse("on main\nend main\n");

    assert_eq!(
        script.instructions,
        vec![
            Instruction::Reserve(1),
            Instruction::PushUnset,
            Instruction::Return { is_command: true },
        ]
    );

    let main = script.handler("main", true).expect("main not registered");
    assert_eq!(main.first_instruction, 0);
    assert_eq!(main.variables.num_locals, 1);
    assert_eq!(
        main.variables.lookup("result"),
        Some(VariableBinding::Local(2))
    );
    assert!(script.handler("main", false).is_none());
}

#[test]
fn test_function_handler_lands_in_function_namespace() {
    let script = parse("function twice x\nreturn x + x\nend twice\n");

    let twice = script.handler("twice", false).expect("twice not registered");
    assert_eq!(
        twice.variables.lookup("x"),
        Some(VariableBinding::Parameter(1))
    );
    assert!(script.handler("twice", true).is_none());
    assert_eq!(
        script.instructions.last(),
        Some(&Instruction::Return { is_command: false })
    );
}

#[test]
fn test_parameters_bind_one_based() {
    let script = parse("on greet name, greeting\nend greet\n");

    let greet = script.handler("greet", true).unwrap();
    assert_eq!(
        greet.variables.lookup("name"),
        Some(VariableBinding::Parameter(1))
    );
    assert_eq!(
        greet.variables.lookup("greeting"),
        Some(VariableBinding::Parameter(2))
    );
    assert_eq!(greet.variables.num_parameters, 2);
}

#[test]
fn test_handler_names_are_case_insensitive() {
    let script = parse("on MakeNoise\nend makenoise\n");
    assert!(script.handler("makenoise", true).is_some());
    assert!(script.handler("MAKENOISE", true).is_some());
}

#[test]
fn test_same_name_in_both_namespaces() {
    let script = parse(
        "on quoted\nend quoted\nfunction quoted\nend quoted\n",
    );

    let command = script.handler("quoted", true).unwrap();
    let function = script.handler("quoted", false).unwrap();
    assert_ne!(command.first_instruction, function.first_instruction);
}

#[test]
fn test_top_level_skips_unrecognized_lines() {
    let script = parse("this line is noise\n\non main\nend main\nmore noise\n");
    assert!(script.handler("main", true).is_some());
    assert_eq!(script.commands.len(), 1);
    assert!(script.functions.is_empty());
}

// ==================== Reserve / locals invariants ====================

#[test]
fn test_put_into_new_name_allocates_local() {
    let script = parse("on main\nput \"foo\" into myFoo\nend main\n");

    assert_eq!(
        script.instructions,
        vec![
            Instruction::Reserve(2),
            Instruction::StackValueBpRelative(3),
            Instruction::PushString("foo".to_string()),
            Instruction::PushParameterCount(2),
            call("put", true),
            Instruction::PushUnset,
            Instruction::Return { is_command: true },
        ]
    );

    let main = script.handler("main", true).unwrap();
    assert_eq!(main.variables.num_locals, 2);
    assert_eq!(
        main.variables.lookup("myfoo"),
        Some(VariableBinding::Local(3))
    );
}

#[test]
fn test_local_statement_registers_without_emitting() {
    let with_local = parse("on main\nlocal thing\nend main\n");
    let without = parse("on main\nend main\n");

    assert_eq!(with_local.instructions.len(), without.instructions.len());
    let main = with_local.handler("main", true).unwrap();
    assert_eq!(
        main.variables.lookup("thing"),
        Some(VariableBinding::Local(3))
    );
    assert_eq!(
        with_local.instructions[main.first_instruction],
        Instruction::Reserve(2)
    );
}

#[test]
fn test_every_handler_reserves_its_local_count() {
    let script = parse(
        "on first\nput 1 into a\nput 2 into b\nend first\n\
         function second x\nreturn x\nend second\n",
    );

    for descriptor in script.commands.values().chain(script.functions.values()) {
        let reserve = &script.instructions[descriptor.first_instruction];
        assert_eq!(
            reserve,
            &Instruction::Reserve(descriptor.variables.num_locals)
        );
        for binding in descriptor.variables.bindings.values() {
            match binding {
                VariableBinding::Local(offset) => {
                    assert!(*offset >= 2);
                    assert!((*offset as usize) < 2 + descriptor.variables.num_locals);
                }
                VariableBinding::Parameter(index) => {
                    assert!(*index >= 1);
                    assert!(*index <= descriptor.variables.num_parameters);
                }
            }
        }
    }
}

#[test]
fn test_reparsing_produces_equal_scripts() {
    let source = "on main\nput 5 into x\nrepeat while x > 0\nsubtract 1 from x\nend repeat\nend main\n";
    assert_eq!(parse(source), parse(source));
}

// ==================== Expressions ====================

#[test]
fn test_operator_precedence_tree() {
    let script = parse("on main\nreturn 1 + 2 * 3 - 4 * 5\nend main\n");

    // 1 + (2*3 - 4*5): right side of each operation is pushed first.
    assert_eq!(
        script.instructions,
        vec![
            Instruction::Reserve(1),
            Instruction::PushInteger(5),
            Instruction::PushInteger(4),
            Instruction::PushParameterCount(2),
            call("*", false),
            Instruction::PushInteger(3),
            Instruction::PushInteger(2),
            Instruction::PushParameterCount(2),
            call("*", false),
            Instruction::PushParameterCount(2),
            call("-", false),
            Instruction::PushInteger(1),
            Instruction::PushParameterCount(2),
            call("+", false),
            Instruction::Return { is_command: true },
            Instruction::PushUnset,
            Instruction::Return { is_command: true },
        ]
    );
}

#[test]
fn test_comparisons_are_outermost() {
    let script = parse("on main\nreturn 1 + 2 < 4\nend main\n");

    assert_eq!(
        script.instructions,
        vec![
            Instruction::Reserve(1),
            Instruction::PushInteger(4),
            Instruction::PushInteger(2),
            Instruction::PushInteger(1),
            Instruction::PushParameterCount(2),
            call("+", false),
            Instruction::PushParameterCount(2),
            call("<", false),
            Instruction::Return { is_command: true },
            Instruction::PushUnset,
            Instruction::Return { is_command: true },
        ]
    );
}

#[test]
fn test_unquoted_string_fallback() {
    let script = parse("on main\nput button into myVar\nend main\n");
    assert!(script
        .instructions
        .contains(&Instruction::PushString("button".to_string())));
}

#[test]
fn test_named_constants() {
    let script = parse("on main\nreturn quote & tab & newline\nend main\n");
    assert!(script
        .instructions
        .contains(&Instruction::PushString("\"".to_string())));
    assert!(script
        .instructions
        .contains(&Instruction::PushString("\t".to_string())));
    assert!(script
        .instructions
        .contains(&Instruction::PushString("\n".to_string())));
}

#[test]
fn test_function_call_in_expression_position() {
    let script = parse("on main\noutput quoted(\"yay!\")\nend main\n");
    assert!(script.instructions.contains(&call("quoted", false)));
    assert!(script.instructions.contains(&call("output", true)));
}

#[test]
fn test_function_call_with_several_arguments() {
    let script = parse("on main\nreturn clamp(1, 2 + 3, 9)\nend main\n");

    // Arguments push in reverse: last argument's instructions come first.
    assert_eq!(
        script.instructions,
        vec![
            Instruction::Reserve(1),
            Instruction::PushInteger(9),
            Instruction::PushInteger(3),
            Instruction::PushInteger(2),
            Instruction::PushParameterCount(2),
            call("+", false),
            Instruction::PushInteger(1),
            Instruction::PushParameterCount(3),
            call("clamp", false),
            Instruction::Return { is_command: true },
            Instruction::PushUnset,
            Instruction::Return { is_command: true },
        ]
    );
}

#[test]
fn test_property_access() {
    let script = parse("on main\nreturn length of \"Four\"\nend main\n");
    assert_eq!(
        script.instructions[1..3],
        [
            Instruction::PushString("Four".to_string()),
            Instruction::PushProperty("length".to_string()),
        ]
    );
}

#[test]
fn test_variable_reads_compile_to_bindings() {
    let script = parse("on main x\nput x into y\nreturn y\nend main\n");
    // x is parameter 1, y the second local
    assert!(script.instructions.contains(&Instruction::Parameter(1)));
    assert!(script
        .instructions
        .contains(&Instruction::StackValueBpRelative(3)));
}

// ==================== Conditionals ====================

#[test]
fn test_single_line_if_else_offsets() {
    let script = parse(
        "on main\nif false then output \"true\" else output \"false\"\nend main\n",
    );

    assert_eq!(
        script.instructions,
        vec![
            Instruction::Reserve(1),
            Instruction::PushString("false".to_string()),
            Instruction::JumpByIfFalse(5),
            Instruction::PushString("true".to_string()),
            Instruction::PushParameterCount(1),
            call("output", true),
            Instruction::JumpBy(4),
            Instruction::PushString("false".to_string()),
            Instruction::PushParameterCount(1),
            call("output", true),
            Instruction::PushUnset,
            Instruction::Return { is_command: true },
        ]
    );
}

#[test]
fn test_multi_line_if_without_else() {
    let script = parse("on main\nif true then\noutput \"yes\"\nend if\nend main\n");

    assert_eq!(
        script.instructions,
        vec![
            Instruction::Reserve(1),
            Instruction::PushString("true".to_string()),
            Instruction::JumpByIfFalse(4),
            Instruction::PushString("yes".to_string()),
            Instruction::PushParameterCount(1),
            call("output", true),
            Instruction::PushUnset,
            Instruction::Return { is_command: true },
        ]
    );
}

#[test]
fn test_multi_line_if_with_else_block() {
    let script = parse(
        "on main\nif true then\noutput \"a\"\nelse\noutput \"b\"\nend if\nend main\n",
    );

    assert_eq!(
        script.instructions,
        vec![
            Instruction::Reserve(1),
            Instruction::PushString("true".to_string()),
            Instruction::JumpByIfFalse(5),
            Instruction::PushString("a".to_string()),
            Instruction::PushParameterCount(1),
            call("output", true),
            Instruction::JumpBy(4),
            Instruction::PushString("b".to_string()),
            Instruction::PushParameterCount(1),
            call("output", true),
            Instruction::PushUnset,
            Instruction::Return { is_command: true },
        ]
    );
}

// ==================== Loops ====================

#[test]
fn test_repeat_while_jumps_back_to_condition() {
    let script = parse(
        "on main\nput 2 into x\nrepeat while x > 0\nsubtract 1 from x\nend repeat\nend main\n",
    );

    // Find the backward jump and check it lands on the condition start.
    let (index, offset) = script
        .instructions
        .iter()
        .enumerate()
        .find_map(|(i, instr)| match instr {
            Instruction::JumpBy(n) if *n < 0 => Some((i, *n)),
            _ => None,
        })
        .expect("no backward jump emitted");
    let condition_start = (index as isize + offset) as usize;
    assert_eq!(
        script.instructions[condition_start],
        Instruction::PushInteger(0)
    );

    // The conditional exit lands just past the backward jump.
    let (exit_index, exit_offset) = script
        .instructions
        .iter()
        .enumerate()
        .find_map(|(i, instr)| match instr {
            Instruction::JumpByIfFalse(n) => Some((i, *n)),
            _ => None,
        })
        .expect("no conditional exit emitted");
    assert_eq!(exit_index as isize + exit_offset, index as isize + 1);
}

#[test]
fn test_repeat_with_synthesizes_counting_loop() {
    let script = parse(
        "on main\nrepeat with x from 1 to 10\noutput x\nend repeat\nend main\n",
    );

    let main = script.handler("main", true).unwrap();
    assert_eq!(main.variables.lookup("x"), Some(VariableBinding::Local(3)));
    assert!(script.instructions.contains(&call("put", true)));
    assert!(script.instructions.contains(&call("<=", false)));
    assert!(script.instructions.contains(&call("add", true)));
}

#[test]
fn test_repeat_with_down_to_steps_negative() {
    let script = parse(
        "on main\nrepeat with x from 10 down to 1\noutput x\nend repeat\nend main\n",
    );
    assert!(script.instructions.contains(&Instruction::PushInteger(-1)));
    // Still a <= comparison, even for the descending form.
    assert!(script.instructions.contains(&call("<=", false)));
}

#[test]
fn test_repeat_times_counts_down() {
    let script = parse("on main\nrepeat for 3 times\noutput \"hi\"\nend repeat\nend main\n");

    let main = script.handler("main", true).unwrap();
    // result plus the synthesized counter
    assert_eq!(main.variables.num_locals, 2);
    assert!(script.instructions.contains(&call(">", false)));
    assert!(script.instructions.contains(&call("subtract", true)));
}

#[test]
fn test_repeat_times_words_are_optional() {
    let bare = parse("on main\nrepeat 3\noutput \"hi\"\nend repeat\nend main\n");
    let full = parse("on main\nrepeat for 3 times\noutput \"hi\"\nend repeat\nend main\n");
    assert_eq!(bare.instructions, full.instructions);
}

#[test]
fn test_nested_repeat_counters_do_not_collide() {
    let script = parse(
        "on main\nrepeat 2\nrepeat 3\noutput \"x\"\nend repeat\nend repeat\nend main\n",
    );
    let main = script.handler("main", true).unwrap();
    // result plus two synthesized counters
    assert_eq!(main.variables.num_locals, 3);
}

// ==================== English templates ====================

#[test]
fn test_add_template() {
    let script = parse("on main\nadd 1 to x\nend main\n");
    assert_eq!(
        script.instructions[1..5],
        [
            Instruction::StackValueBpRelative(3),
            Instruction::PushInteger(1),
            Instruction::PushParameterCount(2),
            call("add", true),
        ]
    );
}

#[test]
fn test_subtract_template() {
    let script = parse("on main\nsubtract 2 from x\nend main\n");
    assert!(script.instructions.contains(&call("subtract", true)));
}

#[test]
fn test_create_template_with_optional_expression() {
    let with_name = parse("on main\ncreate button \"OK\"\nend main\n");
    assert_eq!(
        with_name.instructions[1..5],
        [
            Instruction::PushString("OK".to_string()),
            Instruction::PushString("button".to_string()),
            Instruction::PushParameterCount(2),
            call("create", true),
        ]
    );

    let without = parse("on main\ncreate field\nend main\n");
    assert_eq!(
        without.instructions[1..4],
        [
            Instruction::PushString("field".to_string()),
            Instruction::PushParameterCount(1),
            call("create", true),
        ]
    );
}

#[test]
fn test_unmatched_template_falls_back_to_generic_call() {
    // `put` without `into` is not the template; it becomes a plain call.
    let script = parse("on main\nput 5\nend main\n");
    assert_eq!(
        script.instructions[1..4],
        [
            Instruction::PushInteger(5),
            Instruction::PushParameterCount(1),
            call("put", true),
        ]
    );
}

#[test]
fn test_host_registered_template() {
    let mut tokenizer = Tokenizer::new();
    tokenizer
        .add_tokens("on main\nturn widget left\nend main\n", "test.ht")
        .unwrap();

    let mut parser = Parser::new();
    parser.add_syntax(Syntax::new(
        &["turn"],
        vec![
            SyntaxElement::expression(),
            SyntaxElement {
                prefix: Vec::new(),
                kind: SyntaxValueKind::Identifier(vec![
                    "left".to_string(),
                    "right".to_string(),
                ]),
                required: true,
            },
        ],
    ));
    parser.parse(&tokenizer).unwrap();

    assert_eq!(
        parser.script.instructions[1..5],
        [
            Instruction::PushString("left".to_string()),
            Instruction::PushString("widget".to_string()),
            Instruction::PushParameterCount(2),
            call("turn", true),
        ]
    );
}

// ==================== Errors ====================

#[test]
fn test_missing_end_is_an_error() {
    let error = parse_error("on main\noutput \"hi\"\n");
    assert!(matches!(error, ParseError::ExpectedIdentifier { .. }));
}

#[test]
fn test_mismatched_end_name_is_an_error() {
    let error = parse_error("on main\nend other\n");
    assert!(matches!(error, ParseError::ExpectedIdentifier { .. }));
}

#[test]
fn test_missing_handler_name_is_an_error() {
    let error = parse_error("on\nend\n");
    assert!(matches!(error, ParseError::ExpectedFunctionName { .. }));
}

#[test]
fn test_unterminated_string_is_an_error() {
    let error = parse_error("on main\nput \"oops\nend main\n");
    assert!(matches!(error, ParseError::UnterminatedString { .. }));
}

#[test]
fn test_statement_must_start_with_identifier() {
    let error = parse_error("on main\n5\nend main\n");
    assert!(matches!(error, ParseError::ExpectedIdentifier { .. }));
}

#[test]
fn test_error_location_points_at_the_token() {
    let error = parse_error("on main\nput \"x\" 7\nend main\n");
    let location = error.location();
    assert_eq!(location.file, "test.ht");
    assert_eq!(location.line, 2);
}
