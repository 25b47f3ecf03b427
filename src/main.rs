mod ast;
mod builtins;
mod error;
mod evaluator;
mod lexer;
mod parser;
mod repl;
mod runner;
mod value;

use clap::{Arg, Command};
use runner::DumpOptions;
use std::fs;
use std::path::{Path, PathBuf};

fn main() {
    let matches = Command::new("silt")
        .about("A small expression-oriented scripting language")
        .arg(
            Arg::new("file")
                .help("The script file to execute")
                .value_name("FILE")
                .index(1),
        )
        .arg(
            Arg::new("interactive")
                .short('i')
                .long("interactive")
                .help("Start in interactive REPL mode")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("dump-tokens")
                .long("dump-tokens")
                .help("Write the token stream to this file before parsing")
                .value_name("OUT"),
        )
        .arg(
            Arg::new("dump-ast")
                .long("dump-ast")
                .help("Write the parsed AST to this file before evaluation")
                .value_name("OUT"),
        )
        .get_matches();

    let dumps = DumpOptions {
        tokens: matches.get_one::<String>("dump-tokens").map(PathBuf::from),
        ast: matches.get_one::<String>("dump-ast").map(PathBuf::from),
    };

    if let Some(file_path) = matches.get_one::<String>("file") {
        run_file(file_path, &dumps);
    } else if matches.get_flag("interactive") || matches.get_one::<String>("file").is_none() {
        repl::start();
    }
}

fn run_file(path: &str, dumps: &DumpOptions) {
    let path = Path::new(path);

    if !path.exists() {
        eprintln!("Error: File '{}' not found", path.display());
        std::process::exit(1);
    }

    match fs::read_to_string(path) {
        Ok(source) => {
            runner::run(&source, path.to_str(), dumps);
        }
        Err(e) => {
            eprintln!("Error reading file '{}': {}", path.display(), e);
            std::process::exit(1);
        }
    }
}
