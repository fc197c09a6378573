//! Read-Eval-Print Loop
//!
//! A persistent interpreter fed one line at a time through `rustyline`,
//! with history saved to `~/.zai_history`. Loading or saving history is
//! best effort: a missing home directory or unwritable file never aborts
//! the session.

use rustyline::config::Configurer;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use zai::interpreter::Evaluator;
use zai::run_source_with;

const PROMPT: &str = ">> ";
const HISTORY_LIMIT: usize = 2000;

fn history_path() -> Option<std::path::PathBuf> {
    dirs::home_dir().map(|home| home.join(".zai_history"))
}

pub fn run() {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("zai: failed to start line editor: {}", e);
            return;
        }
    };
    let _ = editor.set_max_history_size(HISTORY_LIMIT);

    let history_file = history_path();
    if let Some(path) = &history_file {
        let _ = editor.load_history(path);
    }

    let evaluator = Evaluator::new();

    loop {
        match editor.readline(PROMPT) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line.as_str());
                if let Err(e) = run_source_with(&evaluator, &line) {
                    eprintln!("{}", e);
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("zai: {}", e);
                break;
            }
        }
    }

    if let Some(path) = &history_file {
        let _ = editor.save_history(path);
    }
}
