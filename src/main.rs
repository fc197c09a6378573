//! zai: run a script file, evaluate an inline string, or drop into the REPL.

use std::fs;
use std::process::ExitCode;

use clap::Parser as ClapParser;

mod repl;

#[derive(ClapParser)]
#[command(name = "zai", about = "Interpreter for the zai scripting language")]
struct Cli {
    /// Path to a .zai source file to run. If omitted (and -e is not
    /// given), starts the REPL.
    file: Option<String>,

    /// Evaluate a single string of source and exit, ignoring `file`.
    #[arg(short = 'e', long = "eval-string")]
    eval_string: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(src) = cli.eval_string {
        if let Err(e) = zai::run_source(&src) {
            println!("{}", e);
        }
        return ExitCode::SUCCESS;
    }

    if let Some(path) = cli.file {
        let source = match fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("zai: cannot read '{}': {}", path, e);
                return ExitCode::FAILURE;
            }
        };
        return run_and_report(&source);
    }

    repl::run();
    ExitCode::SUCCESS
}

fn run_and_report(source: &str) -> ExitCode {
    match zai::run_source(source) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
