// Parser and lexer robustness tests: these drive the public lex/parse API
// over valid and malformed input and check the reported errors.

use silt::ast::Program;
use silt::error::SiltError;
use silt::lexer::{Lexer, TokenType};
use silt::parser::Parser;

fn parse_source(input: &str) -> Result<Program, SiltError> {
    let mut lexer = Lexer::new(input.to_string());
    let tokens = lexer.scan_tokens()?;
    let mut parser = Parser::new(tokens);
    parser.parse()
}

fn assert_parses(input: &str) {
    if let Err(error) = parse_source(input) {
        panic!(
            "expected '{}' to parse, got error: {}",
            input, error.message
        );
    }
}

fn assert_parse_fails(input: &str, expected: &str) {
    match parse_source(input) {
        Ok(_) => panic!("expected '{}' to fail parsing", input),
        Err(error) => assert!(
            error.message.contains(expected),
            "error message '{}' does not contain '{}'",
            error.message,
            expected
        ),
    }
}

#[test]
fn empty_and_trivial_input() {
    assert_parses("");
    assert_parses("   \n\t  ");
    assert_parses("# just a comment #");
    assert_parses(";;;");
}

#[test]
fn literal_expressions() {
    assert_parses("42");
    assert_parses("\"hello\"");
    assert_parses("true");
    assert_parses("false");
    assert_parses("[1, 2, 3]");
    assert_parses("[]");
}

#[test]
fn numbers_are_integer_runs() {
    // There is no decimal point in the number grammar, so '3.14' scans as
    // a number, a dot, and another number, and the dot then needs a name
    assert_parse_fails("3.14", "Expected property name after '.'");
}

#[test]
fn unterminated_string_is_not_a_lex_error() {
    // String content runs to the closing quote or end of input
    assert_parses("\"hello");
}

#[test]
fn unrecognized_character() {
    assert_parse_fails("1 @ 2", "Unexpected character: '@'");
}

#[test]
fn unbalanced_parentheses() {
    assert_parse_fails("(1 + 2", "Expected ')' after expression");
    assert_parse_fails("((1 + 2)", "Expected ')' after expression");
    assert_parse_fails("1 + 2)", "Expected expression, found ')'");
    assert_parse_fails("()", "Empty parentheses are not allowed");
}

#[test]
fn unbalanced_brackets_and_braces() {
    assert_parse_fails("[1, 2", "Expected ']' after list elements");
    assert_parse_fails("{ x = 1", "Expected '}' after block");
    assert_parse_fails("x = 1 }", "Expected expression, found '}'");
}

#[test]
fn arithmetic_and_unary() {
    assert_parses("1 + 2 * 3");
    assert_parses("(1 + 2) * 3");
    assert_parses("10 % 3 / 2");
    assert_parses("1 -- 2");
    assert_parses("1 +- 2");
    assert_parses("!-1");
    assert_parse_fails("1 ++ 2", "Expected expression");
    assert_parse_fails("+ 1", "Expected expression");
    assert_parse_fails("1 +", "Expected expression");
}

#[test]
fn relational_operators_do_not_chain() {
    assert_parses("1 < 2");
    assert_parses("1 == 2");
    assert_parses("(1 < 2) == true");
    // Equality and relational share one non-associative level
    assert_parse_fails("1 < 2 < 3", "Expected expression, found '<'");
    assert_parse_fails("1 == 2 == 3", "Expected expression, found '=='");
}

#[test]
fn logical_operators() {
    assert_parses("a & b | c");
    assert_parses("!a & !b");
}

#[test]
fn assignments() {
    assert_parses("x = 1");
    assert_parses("x = y = 2");
    assert_parses("a[1] = 2");
    assert_parses("a.b = 2");
    assert_parses("a[1].b[2] = 3");
    assert_parse_fails("1 = x", "Invalid assignment target");
    assert_parse_fails("f() = 1", "Invalid assignment target");
    assert_parse_fails("x =", "Unexpected end of input");
}

#[test]
fn control_forms() {
    assert_parses("if (true) 1");
    assert_parses("if (true) 1 else 2");
    assert_parses("x = if (c) 1 else 2");
    assert_parses("while (x) x");
    assert_parses("for (x in [1, 2]) x");
    assert_parse_fails("if true 1", "Expected '(' after 'if'");
    assert_parse_fails("if (true)", "Unexpected end of input");
    assert_parse_fails("while { x }", "Expected '(' after 'while'");
    assert_parse_fails("for (1 in [1]) 1", "Expected loop variable");
    assert_parse_fails("for (x of [1]) 1", "Expected 'in' after loop variable");
}

#[test]
fn function_literals() {
    assert_parses("function() 1");
    assert_parses("function(a, b) a + b");
    assert_parses("f = function(x) { x * x }");
    assert_parse_fails("function(1) 1", "Expected parameter name");
    assert_parse_fails("function(a", "Expected ')' after parameters");
}

#[test]
fn call_arguments() {
    assert_parses("f()");
    assert_parses("f(1, 2, 3)");
    assert_parses("f(g(1), [2], {a: 3})");
    assert_parse_fails("f(1, 2", "Expected ')' after arguments");
    assert_parse_fails("f(1,)", "Expected expression, found ')'");
}

#[test]
fn postfix_chains() {
    assert_parses("a(b)[c](d)");
    assert_parses("a.b.c(1)[2]");
    assert_parses("[function(x) x][1](5)");
}

#[test]
fn exit_expressions_take_optional_values() {
    assert_parses("function() return");
    assert_parses("function() return 1 + 2");
    assert_parses("{ break }");
    assert_parses("{ break 5; }");
    assert_parses("{ continue }");
    assert_parses("while (x) { if (x) break else continue }");
    assert_parses("f(break, 1)");
}

#[test]
fn object_and_block_disambiguation() {
    // An immediate ':' at the top level means object, ';' or '}' means block
    assert_parses("{}");
    assert_parses("{ a: 1, \"b\": 2 }");
    assert_parses("{ 1; 2 }");
    assert_parses("{ x = 1; y = 2 }");
    assert_parses("{ nested: { a: 1 } }");
    assert_parse_fails("{ 1: 2 }", "Expected object key");
    assert_parse_fails("{ a: }", "Expected expression");
}

#[test]
fn comments_are_skipped() {
    assert_parses("1 + # twos # 2");
    assert_parses("# leading # x = 1 # trailing");
}

#[test]
fn deeply_nested_parentheses() {
    let source = "(".repeat(100) + "1" + &")".repeat(100);
    assert_parses(&source);
}

// Re-lexing the source forms of a token stream must reproduce the stream.
#[test]
fn token_stream_round_trip() {
    let source = "f = function(a) { if (a <= 3) a * 2 else a - 1 }; f(\"x\") # done #";

    let mut lexer = Lexer::new(source.to_string());
    let tokens = lexer.scan_tokens().unwrap();

    let rendered: Vec<String> = tokens
        .iter()
        .filter(|t| t.token_type != TokenType::Eof)
        .map(|t| match t.token_type {
            TokenType::String => format!("\"{}\"", t.lexeme),
            _ => t.lexeme.clone(),
        })
        .collect();
    let reconstructed = rendered.join(" ");

    let mut relexer = Lexer::new(reconstructed);
    let retokens = relexer.scan_tokens().unwrap();

    assert_eq!(tokens.len(), retokens.len());
    for (a, b) in tokens.iter().zip(retokens.iter()) {
        assert_eq!(a.token_type, b.token_type);
        assert_eq!(a.lexeme, b.lexeme);
    }
}
