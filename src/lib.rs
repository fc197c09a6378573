//! zai: a small, dynamically typed scripting language with closures,
//! classes, arrays, and a filesystem-backed module system.

pub mod ast;
pub mod env;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod token;
pub mod value;

use error::ZaiResult;
use interpreter::Evaluator;
use parser::Parser;

/// Tokenize, parse, and evaluate a complete source string against a
/// fresh interpreter. Used by the file-argument and `-e` CLI entry points,
/// where there is no state to carry between runs.
pub fn run_source(source: &str) -> ZaiResult<()> {
    run_source_with(&Evaluator::new(), source)
}

/// Tokenize, parse, and evaluate a source string against an existing
/// interpreter, so bindings survive across calls. Used by the REPL.
pub fn run_source_with(evaluator: &Evaluator, source: &str) -> ZaiResult<()> {
    let tokens = lexer::tokenize(source)?;
    let program = Parser::new(tokens).parse_program()?;
    evaluator.run(&program)
}
