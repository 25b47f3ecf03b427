use crate::builtins;
use crate::evaluator::Evaluator;
use crate::lexer::Lexer;
use crate::parser::Parser;
use std::fs;
use std::path::PathBuf;

/// Destinations for the driver's intermediate pipeline dumps.
#[derive(Debug, Default)]
pub struct DumpOptions {
    pub tokens: Option<PathBuf>,
    pub ast: Option<PathBuf>,
}

pub fn run(source: &str, filename: Option<&str>, dumps: &DumpOptions) {
    // Lexical analysis
    let mut lexer = Lexer::new(source.to_string());
    let tokens = match lexer.scan_tokens() {
        Ok(tokens) => tokens,
        Err(error) => {
            error.report(source, filename);
            return;
        }
    };

    if let Some(path) = &dumps.tokens {
        if let Err(error) = fs::write(path, format!("{:#?}\n", tokens)) {
            eprintln!("Error writing token dump to '{}': {}", path.display(), error);
        }
    }

    // Parsing
    let mut parser = Parser::new(tokens);
    let program = match parser.parse() {
        Ok(program) => program,
        Err(error) => {
            error.report(source, filename);
            return;
        }
    };

    if let Some(path) = &dumps.ast {
        if let Err(error) = fs::write(path, format!("{:#?}\n", program)) {
            eprintln!("Error writing AST dump to '{}': {}", path.display(), error);
        }
    }

    // Evaluation
    let mut evaluator = Evaluator::new();
    builtins::install(&mut evaluator);
    if let Err(error) = evaluator.evaluate(&program) {
        error.report(source, filename);
    }
}
