//! Interactive Read-Eval-Print Loop.
//!
//! Tracks brace depth (ignoring braces inside string literals) so a
//! multi-line `fn`/`if`/block can be typed across several lines before it is
//! lexed, parsed, and run. Execution happens in-process against a
//! persistent `Environment`, not by spawning a subprocess against a
//! compiled script file.

use std::io::{self, Write};

use tracing::warn;

use crate::compiler::Compiler;
use crate::environment::Environment;
use crate::evaluator::eval_program;
use crate::parser::Parser;
use crate::vm::Vm;

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Eval,
    Vm,
}

pub fn run(mode: Mode) {
    println!("Monkey Language Interpreter - REPL");
    println!("Type `exit` or `quit` to leave.");

    let env = Environment::new();
    let mut buffer: Vec<String> = Vec::new();
    let mut brace_depth: i32 = 0;

    loop {
        let prompt = if buffer.is_empty() { ">> " } else { ".. " };
        print!("{prompt}");
        io::stdout().flush().ok();

        let mut line = String::new();
        if io::stdin().read_line(&mut line).unwrap_or(0) == 0 {
            println!();
            break;
        }

        let trimmed = line.trim();
        if buffer.is_empty() && (trimmed == "exit" || trimmed == "quit") {
            break;
        }

        track_braces(&line, &mut brace_depth);
        buffer.push(line);

        if brace_depth > 0 {
            continue;
        }

        let source = buffer.join("");
        buffer.clear();
        brace_depth = 0;

        let lexer = crate::lexer::Lexer::new(&source);
        let mut parser = Parser::new(lexer);
        let program = parser.parse_program();

        if !parser.errors().is_empty() {
            println!("parser errors:");
            for err in parser.errors() {
                println!("\t{err}");
            }
            continue;
        }

        match mode {
            Mode::Eval => {
                let result = eval_program(&program, &env);
                println!("{}", result.inspect());
            }
            Mode::Vm => {
                let mut compiler = Compiler::new();
                if let Err(err) = compiler.compile_program(&program) {
                    println!("compile error: {err}");
                    continue;
                }
                let mut vm = Vm::new(compiler.bytecode());
                if let Err(err) = vm.run() {
                    warn!(%err, "vm execution failed");
                    println!("vm error: {err}");
                    continue;
                }
                if let Some(top) = vm.last_popped() {
                    println!("{}", top.inspect());
                }
            }
        }
    }
}

fn track_braces(line: &str, brace_depth: &mut i32) {
    let mut string_char: Option<char> = None;
    let mut escape = false;

    for ch in line.chars() {
        if escape {
            escape = false;
            continue;
        }
        match ch {
            '\\' => escape = true,
            '"' => {
                if string_char == Some(ch) {
                    string_char = None;
                } else if string_char.is_none() {
                    string_char = Some(ch);
                }
            }
            '{' if string_char.is_none() => *brace_depth += 1,
            '}' if string_char.is_none() => *brace_depth -= 1,
            _ => {}
        }
    }
}
