use crate::builtins;
use crate::evaluator::Evaluator;
use crate::lexer::Lexer;
use crate::parser::Parser;
use std::io::{self, Write};

pub fn start() {
    println!("Silt Interpreter v0.1.0");
    println!("Type 'exit' or press Ctrl+C to quit");
    println!();

    // One evaluator lives for the whole session so bindings persist
    let mut evaluator = Evaluator::new();
    builtins::install(&mut evaluator);

    loop {
        print!("> ");
        io::stdout().flush().unwrap();

        let mut line = String::new();
        match io::stdin().read_line(&mut line) {
            Ok(0) => {
                // EOF reached (Ctrl+D or piped input ended)
                println!();
                break;
            }
            Ok(_) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line == "exit" || line == "quit" {
                    println!("Goodbye!");
                    break;
                }

                run_repl_line(line, &mut evaluator);
            }
            Err(error) => {
                eprintln!("Error reading input: {}", error);
                break;
            }
        }
    }
}

fn run_repl_line(source: &str, evaluator: &mut Evaluator) {
    let mut lexer = Lexer::new(source.to_string());
    let tokens = match lexer.scan_tokens() {
        Ok(tokens) => tokens,
        Err(error) => {
            error.report(source, None);
            return;
        }
    };

    let mut parser = Parser::new(tokens);
    let program = match parser.parse() {
        Ok(program) => program,
        Err(error) => {
            error.report(source, None);
            return;
        }
    };

    // Everything is an expression, so the line's value is whatever the last
    // expression produced; undefined results stay quiet
    match evaluator.evaluate(&program) {
        Ok(value) => {
            if !value.is_undefined() {
                println!("{}", value);
            }
        }
        Err(error) => {
            error.report(source, None);
        }
    }
}
