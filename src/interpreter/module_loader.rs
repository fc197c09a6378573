//! Module Path Resolution
//!
//! A module named `foo` resolves to `foo.zai`, searched for first in the
//! current working directory, then in each `:`-separated entry of
//! `ZAI_PATH`, in order. Empty `ZAI_PATH` entries are skipped rather than
//! treated as the current directory.

use std::path::PathBuf;

pub fn resolve(name: &str) -> Option<PathBuf> {
    let filename = format!("{}.zai", name);

    let cwd_candidate = PathBuf::from(&filename);
    if cwd_candidate.is_file() {
        return Some(cwd_candidate);
    }

    let path_var = std::env::var("ZAI_PATH").ok()?;
    for dir in path_var.split(':') {
        if dir.is_empty() {
            continue;
        }
        let candidate = PathBuf::from(dir).join(&filename);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn resolves_a_module_on_the_zai_path() {
        let dir = std::env::temp_dir().join(format!("zai_module_loader_test_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let file_path = dir.join("greet.zai");
        let mut f = std::fs::File::create(&file_path).unwrap();
        writeln!(f, "print \"hi\";").unwrap();

        std::env::set_var("ZAI_PATH", dir.to_str().unwrap());
        assert_eq!(resolve("greet"), Some(file_path.clone()));
        std::env::remove_var("ZAI_PATH");

        let _ = std::fs::remove_file(&file_path);
        let _ = std::fs::remove_dir(&dir);
    }

    #[test]
    fn empty_zai_path_entries_are_skipped_without_erroring() {
        std::env::set_var("ZAI_PATH", "::/definitely/not/a/real/path");
        assert!(resolve("definitely_not_a_real_module_xyz").is_none());
        std::env::remove_var("ZAI_PATH");
    }
}
