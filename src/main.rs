//! Language runtime CLI.
//!
//! Behavior summary:
//! - With no args, start an interactive REPL.
//! - With `-h`/`--help`, print usage.
//! - With `-v`/`--version`, print the version.
//! - With a source file path, read and run it.
//! - `--vm` selects the bytecode compiler + VM path instead of the default
//!   tree-walking evaluator (applies to both the REPL and file execution).

use std::env;
use std::fs;

mod ast;
mod code;
mod compiler;
mod environment;
mod error;
mod evaluator;
mod lexer;
mod object;
mod parser;
mod repl;
mod token;
mod vm;

use compiler::Compiler;
use environment::Environment;
use evaluator::eval_program;
use object::Object;
use repl::Mode;
use vm::Vm;

const VERSION: &str = "0.1.0";

fn usage() -> String {
    format!(
        r#"Monkey Language Runtime v{VERSION}

Usage:
    monkey [--vm] [script]

Arguments:
    [script]
        Path to a source file to execute. With no script, starts a REPL.

Options:
    --vm
        Execute via the bytecode compiler and virtual machine instead of
        the tree-walking evaluator.
    -h, --help
        Show this help message and exit.
    -v, --version
        Show runtime version."#
    )
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    let rest: Vec<&String> = args[1..].iter().collect();

    let use_vm = rest.iter().any(|a| a.as_str() == "--vm");
    let positional: Vec<&&String> = rest.iter().filter(|a| a.as_str() != "--vm").collect();

    if let Some(flag) = positional.first() {
        if flag.as_str() == "-h" || flag.as_str() == "--help" {
            println!("{}", usage());
            return;
        }
        if flag.as_str() == "-v" || flag.as_str() == "--version" {
            println!(
                "monkey-runtime-build-{}-{}: v{}",
                env::consts::OS,
                env::consts::ARCH,
                VERSION
            );
            return;
        }
    }

    match positional.first() {
        None => repl::run(if use_vm { Mode::Vm } else { Mode::Eval }),
        Some(path) => {
            let source = match fs::read_to_string(path.as_str()) {
                Ok(s) => s,
                Err(err) => {
                    eprintln!("failed to read {path}: {err}");
                    std::process::exit(1);
                }
            };
            if let Err(msg) = run_source(&source, use_vm) {
                eprintln!("{msg}");
                std::process::exit(1);
            }
        }
    }
}

fn run_source(source: &str, use_vm: bool) -> Result<(), String> {
    let (program, errors) = parser::parse(source);
    if !errors.is_empty() {
        let mut msg = String::from("parser errors:\n");
        for err in &errors {
            msg.push_str(&format!("\t{err}\n"));
        }
        return Err(msg);
    }

    if use_vm {
        let mut compiler = Compiler::new();
        compiler
            .compile_program(&program)
            .map_err(|e| e.to_string())?;
        let mut vm = Vm::new(compiler.bytecode());
        vm.run().map_err(|e| e.to_string())?;
        if let Some(top) = vm.last_popped() {
            println!("{}", top.inspect());
        }
    } else {
        let env = Environment::new();
        let result = eval_program(&program, &env);
        if let Object::Error(msg) = result.as_ref() {
            return Err(format!("ERROR: {msg}"));
        }
    }

    Ok(())
}
