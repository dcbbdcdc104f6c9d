//! Fix applicator: replace exactly one source line, preserving indentation.
//!
//! The analyzer may attach a [`FixAction`] to its analysis - a structured
//! instruction to replace one line of one file. This module is the sole
//! consumer of that descriptor. It is a line-granular text patcher, not a
//! refactoring engine: it never inserts, deletes, or renumbers lines, and
//! the replaced line always keeps its original leading whitespace.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{FathomError, Result};
use crate::session::FixAction;

/// Apply a single-line fix beneath `root`.
///
/// Returns `Ok(true)` when the line was replaced and the file rewritten,
/// `Ok(false)` for operational failures that must leave the file untouched:
/// an unreadable or unwritable target, or a line number outside the file.
/// Out-of-bounds is operational rather than a bug because the target file
/// may have changed since the analysis ran.
///
/// # Errors
///
/// Returns [`FathomError::InvalidFixAction`] when the descriptor itself is
/// malformed (empty path, zero line number, blank code). That is a
/// caller-contract violation and is checked before any file is touched.
pub fn apply_fix(action: &FixAction, root: &Path) -> Result<bool> {
    if action.file_path.trim().is_empty() {
        return Err(FathomError::invalid_fix("filePath is missing"));
    }
    if action.line_number == 0 {
        return Err(FathomError::invalid_fix("lineNumber is missing"));
    }
    if action.code.trim().is_empty() {
        return Err(FathomError::invalid_fix("code is missing"));
    }

    let referenced = Path::new(&action.file_path);
    let resolved: PathBuf = if referenced.is_absolute() {
        referenced.to_path_buf()
    } else {
        root.join(referenced)
    };

    let content = match fs::read_to_string(&resolved) {
        Ok(content) => content,
        Err(e) => {
            warn!("cannot read {}: {}", resolved.display(), e);
            return Ok(false);
        }
    };

    // split('\n') keeps a trailing empty element for files ending in a
    // newline, so join restores the original byte layout exactly.
    let mut lines: Vec<&str> = content.split('\n').collect();
    let target_index = (action.line_number - 1) as usize;

    if target_index >= lines.len() {
        warn!(
            "line {} is out of bounds for {} ({} lines)",
            action.line_number,
            resolved.display(),
            lines.len()
        );
        return Ok(false);
    }

    let indentation: String = lines[target_index]
        .chars()
        .take_while(|c| c.is_whitespace())
        .collect();
    let replacement = format!("{indentation}{}", action.code.trim());

    lines[target_index] = &replacement;
    let patched = lines.join("\n");

    if let Err(e) = fs::write(&resolved, patched) {
        warn!("cannot write {}: {}", resolved.display(), e);
        return Ok(false);
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SOURCE: &str = "function test() {\n    let x = 1;\n    console.log(x;\n}\n";

    fn fix(file_path: &str, line_number: u32, code: &str) -> FixAction {
        FixAction {
            file_path: file_path.to_string(),
            line_number,
            code: code.to_string(),
            description: "test fix".to_string(),
        }
    }

    #[test]
    fn test_replaces_exactly_one_line_preserving_indentation() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("app.js"), SOURCE).unwrap();

        let applied = apply_fix(&fix("app.js", 3, "console.log(x);"), temp.path()).unwrap();
        assert!(applied);

        let patched = fs::read_to_string(temp.path().join("app.js")).unwrap();
        assert_eq!(
            patched,
            "function test() {\n    let x = 1;\n    console.log(x);\n}\n"
        );
    }

    #[test]
    fn test_indentation_comes_from_target_not_fix_code() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("app.js"), SOURCE).unwrap();

        // The fix code arrives with its own (wrong) indentation; the
        // original line's four spaces must win.
        let applied =
            apply_fix(&fix("app.js", 3, "        console.log(x);   "), temp.path()).unwrap();
        assert!(applied);

        let patched = fs::read_to_string(temp.path().join("app.js")).unwrap();
        let lines: Vec<&str> = patched.split('\n').collect();
        assert_eq!(lines[2], "    console.log(x);");
    }

    #[test]
    fn test_tab_indentation_preserved() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("app.py"), "def f():\n\treturn 1\n").unwrap();

        let applied = apply_fix(&fix("app.py", 2, "return 2"), temp.path()).unwrap();
        assert!(applied);

        let patched = fs::read_to_string(temp.path().join("app.py")).unwrap();
        assert_eq!(patched, "def f():\n\treturn 2\n");
    }

    #[test]
    fn test_out_of_bounds_reports_failure_and_leaves_file_alone() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("app.js"), SOURCE).unwrap();

        let applied = apply_fix(&fix("app.js", 99, "whatever();"), temp.path()).unwrap();
        assert!(!applied);

        let content = fs::read_to_string(temp.path().join("app.js")).unwrap();
        assert_eq!(content, SOURCE);
    }

    #[test]
    fn test_missing_file_reports_failure() {
        let temp = TempDir::new().unwrap();
        let applied = apply_fix(&fix("gone.js", 1, "x();"), temp.path()).unwrap();
        assert!(!applied);
    }

    #[test]
    fn test_missing_code_raises_before_touching_file() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("app.js"), SOURCE).unwrap();

        let err = apply_fix(&fix("app.js", 3, "   "), temp.path()).unwrap_err();
        assert!(err.is_contract_violation());

        let content = fs::read_to_string(temp.path().join("app.js")).unwrap();
        assert_eq!(content, SOURCE);
    }

    #[test]
    fn test_missing_path_raises() {
        let temp = TempDir::new().unwrap();
        let err = apply_fix(&fix("", 3, "x();"), temp.path()).unwrap_err();
        assert!(err.is_contract_violation());
    }

    #[test]
    fn test_zero_line_number_raises() {
        let temp = TempDir::new().unwrap();
        let err = apply_fix(&fix("app.js", 0, "x();"), temp.path()).unwrap_err();
        assert!(err.is_contract_violation());
    }

    #[test]
    fn test_last_line_without_trailing_newline() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("one.js"), "let a = 1").unwrap();

        let applied = apply_fix(&fix("one.js", 1, "let a = 2;"), temp.path()).unwrap();
        assert!(applied);
        assert_eq!(
            fs::read_to_string(temp.path().join("one.js")).unwrap(),
            "let a = 2;"
        );
    }

    #[test]
    fn test_absolute_path_resolves_outside_root() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("deep.js");
        fs::write(&target, "old();\n").unwrap();

        let unrelated = TempDir::new().unwrap();
        let action = fix(&target.display().to_string(), 1, "new();");
        let applied = apply_fix(&action, unrelated.path()).unwrap();
        assert!(applied);
        assert_eq!(fs::read_to_string(&target).unwrap(), "new();\n");
    }
}
