// Evaluator semantics tests: each one runs a small program through the full
// pipeline with the reference built-ins installed and checks the resulting
// value or the classified error.

use silt::builtins;
use silt::error::{ErrorKind, SiltError};
use silt::evaluator::Evaluator;
use silt::lexer::Lexer;
use silt::parser::Parser;
use silt::value::Value;

fn eval_source(input: &str) -> Result<Value, SiltError> {
    let mut lexer = Lexer::new(input.to_string());
    let tokens = lexer.scan_tokens()?;
    let mut parser = Parser::new(tokens);
    let program = parser.parse()?;
    let mut evaluator = Evaluator::new();
    builtins::install(&mut evaluator);
    evaluator.evaluate(&program)
}

fn eval_ok(input: &str) -> Value {
    match eval_source(input) {
        Ok(value) => value,
        Err(error) => panic!(
            "expected '{}' to evaluate, got error: {}",
            input, error.message
        ),
    }
}

fn assert_value(input: &str, expected: Value) {
    let actual = eval_ok(input);
    assert_eq!(actual, expected, "wrong result for '{}'", input);
}

fn assert_error(input: &str, kind: ErrorKind) {
    match eval_source(input) {
        Ok(value) => panic!("expected '{}' to fail, got value {}", input, value),
        Err(error) => assert_eq!(error.kind, kind, "wrong error kind for '{}'", input),
    }
}

fn numbers(values: &[f64]) -> Value {
    Value::list(values.iter().map(|n| Value::Number(*n)).collect())
}

#[test]
fn arithmetic() {
    assert_value("1 + 2 * 3", Value::Number(7.0));
    assert_value("(1 + 2) * 3", Value::Number(9.0));
    assert_value("10 / 4", Value::Number(2.5));
    assert_value("7 % 3", Value::Number(1.0));
    assert_value("-5 + 2", Value::Number(-3.0));
}

#[test]
fn division_by_zero_is_infinite() {
    match eval_ok("1 / 0") {
        Value::Number(n) => assert!(n.is_infinite() && n > 0.0),
        other => panic!("expected a number, got {}", other),
    }
}

#[test]
fn program_value_is_last_expression() {
    assert_value("1; 2; 3", Value::Number(3.0));
    assert_value("", Value::Undefined);
}

#[test]
fn for_loop_accumulates_body_values() {
    assert_value("for (x in [1, 2, 3]) x * 2", numbers(&[2.0, 4.0, 6.0]));
}

#[test]
fn while_loop_accumulates_and_mutates() {
    let result = eval_ok("i = 1; r = while (i <= 3) { i = i + 1 }; [r, i]");
    assert_eq!(
        result,
        Value::list(vec![numbers(&[2.0, 3.0, 4.0]), Value::Number(4.0)])
    );
}

#[test]
fn loops_skip_undefined_iteration_values() {
    assert_value(
        "for (x in [1, 2, 3, 4]) if (x % 2 == 0) x",
        numbers(&[2.0, 4.0]),
    );
}

#[test]
fn indexing_is_one_based() {
    assert_value("a = [10, 20, 30]; a[1]", Value::Number(10.0));
    assert_value("a = [10, 20, 30]; a[3]", Value::Number(30.0));
    assert_value("a = [10, 20, 30]; a[4]", Value::Undefined);
    assert_value("a = [10, 20, 30]; a[0]", Value::Undefined);
}

#[test]
fn indexed_assignment_mutates_in_place() {
    assert_value(
        "a = [10, 20, 30]; a[1] = 99; a",
        numbers(&[99.0, 20.0, 30.0]),
    );
    // The same list seen through another variable shows the mutation
    assert_value("a = [10, 20, 30]; b = a; a[1] = 99; b[1]", Value::Number(99.0));
}

#[test]
fn writing_past_the_end_pads_with_undefined() {
    assert_value(
        "a = [1]; a[3] = 9; a",
        Value::list(vec![Value::Number(1.0), Value::Undefined, Value::Number(9.0)]),
    );
}

#[test]
fn invalid_index_targets_are_type_errors() {
    assert_error("a = [1]; a[0] = 5", ErrorKind::Type);
    assert_error("a = [1]; a[\"x\"]", ErrorKind::Type);
    assert_error("5[1]", ErrorKind::Type);
}

#[test]
fn objects_store_and_update_entries() {
    assert_value("o = {a: 1, b: 2}; o.a + o.b", Value::Number(3.0));
    assert_value("o = {a: 1}; o[\"a\"]", Value::Number(1.0));
    assert_value("o = {a: 1}; o.missing", Value::Undefined);
    assert_value("o = {}; o.x = 5; o.x", Value::Number(5.0));
    assert_value("o = {ab: 5}; k = \"a\" + \"b\"; o[k]", Value::Number(5.0));
}

#[test]
fn member_access_binds_this() {
    assert_value(
        "o = {v: 42, get: function() this.v}; o.get()",
        Value::Number(42.0),
    );
    assert_value(
        "o = {v: 1, bump: function() this.v = this.v + 1}; o.bump(); o.bump(); o.v",
        Value::Number(3.0),
    );
}

#[test]
fn closures_capture_lexically() {
    // The captured n wins over the caller's n
    assert_value(
        "adder = function(n) function(x) x + n; add2 = adder(2); n = 100; add2(5)",
        Value::Number(7.0),
    );
}

#[test]
fn captured_environment_is_live() {
    // Names added to the captured chain after definition are visible
    assert_value("f = function() x; x = 1; f()", Value::Number(1.0));
}

#[test]
fn closure_state_persists_across_calls() {
    assert_value(
        "make = function() { count = 0; function() count = count + 1 }; \
         c = make(); c(); c(); c()",
        Value::Number(3.0),
    );
}

#[test]
fn missing_arguments_bind_undefined() {
    assert_value("f = function(a, b) b; f(1)", Value::Undefined);
}

#[test]
fn block_creates_local_bindings() {
    // First assignment in a nested block is block-local
    assert_error("{ q = 5 }; q", ErrorKind::UndefinedVariable);
    // Assignment to an outer name mutates the outer binding
    assert_value("x = 1; { x = 2 }; x", Value::Number(2.0));
}

#[test]
fn loop_variable_is_iteration_scoped() {
    assert_error("for (x in [1, 2]) x; x", ErrorKind::UndefinedVariable);
}

#[test]
fn subset_relations_on_lists() {
    assert_value("[1, 2] < [1, 2, 3]", Value::Bool(true));
    assert_value("[1, 2] <= [1, 2]", Value::Bool(true));
    assert_value("[1, 2] < [1, 2]", Value::Bool(false));
    assert_value("[1, 2, 3] > [2]", Value::Bool(true));
    assert_value("[3] >= [3]", Value::Bool(true));
    assert_value("[4] <= [1, 2]", Value::Bool(false));
}

#[test]
fn subset_relations_on_objects() {
    assert_value("{a: 1} <= {b: 2, a: 1}", Value::Bool(true));
    assert_value("{a: 1} < {b: 2, a: 1}", Value::Bool(true));
    assert_value("{a: 1} < {a: 1}", Value::Bool(false));
    assert_value("{a: 1} <= {a: 2}", Value::Bool(false));
}

#[test]
fn string_operators() {
    assert_value("\"foo\" + \"bar\"", Value::String("foobar".to_string()));
    // Subtraction removes the first occurrence only
    assert_value("\"abcabc\" - \"b\"", Value::String("acabc".to_string()));
    assert_value("\"ab\" * 3", Value::String("ababab".to_string()));
    assert_value("3 * \"ab\"", Value::String("ababab".to_string()));
    assert_value("\"b\" < \"abc\"", Value::Bool(true));
    assert_value("\"abc\" <= \"abc\"", Value::Bool(true));
    assert_value("\"abc\" < \"abc\"", Value::Bool(false));
    assert_value("\"abc\" >= \"bc\"", Value::Bool(true));
}

#[test]
fn list_operators() {
    assert_value("[1, 2] + [3]", numbers(&[1.0, 2.0, 3.0]));
    // Set difference removes every matching element
    assert_value("[1, 2, 1, 3] - [1]", numbers(&[2.0, 3.0]));
    assert_value("[1, 2] * 2", numbers(&[1.0, 2.0, 1.0, 2.0]));
}

#[test]
fn object_operators() {
    // Union: the right side wins on conflicting keys
    assert_value(
        "o = {a: 1} + {a: 2, b: 3}; [o.a, o.b]",
        numbers(&[2.0, 3.0]),
    );
    // Subtraction drops keys whose values deep-equal the right side's
    assert_value(
        "o = {a: 1, b: 2} - {a: 1, b: 9}; [o.a, o.b]",
        Value::list(vec![Value::Undefined, Value::Number(2.0)]),
    );
}

#[test]
fn deep_equality() {
    assert_value("[1, [2, 3]] == [1, [2, 3]]", Value::Bool(true));
    assert_value("{a: [1]} == {a: [1]}", Value::Bool(true));
    assert_value("[1] != [2]", Value::Bool(true));
    assert_value("1 == \"1\"", Value::Bool(false));
}

#[test]
fn logical_operators_short_circuit() {
    assert_value("x = 0; false & (x = 1); x", Value::Number(0.0));
    assert_value("x = 0; true | (x = 1); x", Value::Number(0.0));
    // The deciding operand is the result
    assert_value("0 | 5", Value::Number(5.0));
    assert_value("2 & 3", Value::Number(3.0));
    assert_value("1 & 0", Value::Number(0.0));
}

#[test]
fn unary_operators() {
    assert_value("!0", Value::Bool(true));
    assert_value("!\"a\"", Value::Bool(false));
    assert_value("--5", Value::Number(5.0));
    assert_error("-\"a\"", ErrorKind::Type);
}

#[test]
fn truthiness() {
    assert_value("if (\"\") 1 else 2", Value::Number(2.0));
    // Empty collections are truthy
    assert_value("if ([]) 1 else 2", Value::Number(1.0));
    assert_value("if ({}) 1 else 2", Value::Number(1.0));
    assert_value("if (false) 1", Value::Undefined);
}

#[test]
fn return_unwinds_past_loops() {
    assert_value(
        "f = function() { for (x in [1, 2, 3]) { if (x == 2) return x * 10 }; 99 }; f()",
        Value::Number(20.0),
    );
}

#[test]
fn break_and_continue_carry_values() {
    assert_value(
        "for (x in [1, 2, 3, 4]) { if (x == 3) break x * 100; x }",
        numbers(&[1.0, 2.0, 300.0]),
    );
    assert_value(
        "for (x in [1, 2, 3]) { if (x == 2) continue 99; x }",
        numbers(&[1.0, 99.0, 3.0]),
    );
}

#[test]
fn break_unwinds_through_calls_to_the_callers_loop() {
    assert_value(
        "f = function() break 7; for (x in [1, 2, 3]) f()",
        numbers(&[7.0]),
    );
}

#[test]
fn control_flow_outside_handlers_is_fatal() {
    assert_error("break", ErrorKind::UncaughtControlFlow);
    assert_error("continue 1", ErrorKind::UncaughtControlFlow);
    assert_error("return 5", ErrorKind::UncaughtControlFlow);
    assert_error("f = function() break; f()", ErrorKind::UncaughtControlFlow);
}

#[test]
fn undefined_variables_are_classified() {
    assert_error("missing_name", ErrorKind::UndefinedVariable);
}

#[test]
fn unmatched_operand_pairs_are_type_errors() {
    assert_error("1 + \"a\"", ErrorKind::Type);
    assert_error("true - false", ErrorKind::Type);
    assert_error("{a: 1} * {b: 2}", ErrorKind::Type);
    assert_error("[1] < 5", ErrorKind::Type);
    assert_error("5()", ErrorKind::Type);
    assert_error("for (x in 5) x", ErrorKind::Type);
}

#[test]
fn postfix_chains_evaluate() {
    assert_value("fs = [function(x) x + 1]; fs[1](4)", Value::Number(5.0));
}

#[test]
fn conditional_value() {
    assert_value("if (1 < 2) 10 else 20", Value::Number(10.0));
    assert_value("x = if (false) 1 else 2; x", Value::Number(2.0));
}

#[test]
fn assignment_is_an_expression() {
    assert_value("x = (y = 2) + 1; [x, y]", numbers(&[3.0, 2.0]));
}

#[test]
fn comments_are_ignored() {
    assert_value("1 + # twos # 2", Value::Number(3.0));
}

#[test]
fn reference_builtins() {
    assert_value("len(\"abc\")", Value::Number(3.0));
    assert_value("len([1, 2])", Value::Number(2.0));
    assert_value("len({a: 1})", Value::Number(1.0));
    assert_value("range(3)", numbers(&[1.0, 2.0, 3.0]));
    assert_value("range(2, 4)", numbers(&[2.0, 3.0, 4.0]));
    assert_value("number(\"42\") + 1", Value::Number(43.0));
    assert_value("string(12) + \"!\"", Value::String("12!".to_string()));
    assert_value("type([])", Value::String("list".to_string()));
    assert_value("type({})", Value::String("object".to_string()));
    assert_value("print(1, \"two\")", Value::Undefined);
    assert_error("number(\"nope\")", ErrorKind::Type);
    assert_error("len(5)", ErrorKind::Type);
}
