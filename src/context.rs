//! Context extractor: read a bounded code window around a traced line.
//!
//! Given raw failure output, this module locates the first `file:line`
//! reference via [`crate::trace`], reads the referenced file, and renders a
//! small annotated snippet around the offending line. The snippet is handed
//! to the analyzer to ground its explanation in the actual source.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::trace::locate_trace;

/// Lines of leading context included before the target line.
pub const CONTEXT_LINES_BEFORE: usize = 5;

/// Lines of trailing context included after the target line.
pub const CONTEXT_LINES_AFTER: usize = 5;

/// A rendered code window around an error line.
///
/// Transient value: produced here, passed into the analysis call, and
/// discarded after. Never persisted on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeContext {
    /// File path as it appeared in the trace (relative or absolute).
    pub file_path: String,
    /// 1-based line number of the error line.
    pub line_number: u32,
    /// Pre-formatted snippet with a line-number gutter and a `>` marker
    /// on the error line.
    pub code_snippet: String,
}

/// Extract a code window for the first trace reference in `stderr`.
///
/// Relative paths are resolved against `root`; absolute paths pass through
/// unchanged. Returns `None` when no trace is found, or when the referenced
/// file does not exist or cannot be read as text - a trace often points into
/// a dependency that is not present locally, which is an expected outcome,
/// not an error. This function never panics.
#[must_use]
pub fn extract_error_context(stderr: &str, root: &Path) -> Option<CodeContext> {
    let location = locate_trace(stderr)?;

    let referenced = Path::new(&location.file);
    let resolved: PathBuf = if referenced.is_absolute() {
        referenced.to_path_buf()
    } else {
        root.join(referenced)
    };

    let content = match std::fs::read_to_string(&resolved) {
        Ok(content) => content,
        Err(e) => {
            debug!(
                "trace references {} but it is not readable: {}",
                resolved.display(),
                e
            );
            return None;
        }
    };

    let lines: Vec<&str> = content.lines().collect();
    let target = location.line as usize;

    // 0-based window over the line list, clamped to the file boundaries.
    // A target beyond the end of the file yields an empty snippet.
    let start = target
        .saturating_sub(CONTEXT_LINES_BEFORE + 1)
        .min(lines.len());
    let end = lines.len().min(target + CONTEXT_LINES_AFTER).max(start);

    let code_snippet = lines[start..end]
        .iter()
        .enumerate()
        .map(|(offset, line)| {
            let line_number = start + offset + 1;
            let marker = if line_number == target { '>' } else { ' ' };
            format!("{marker} {line_number}: {line}")
        })
        .collect::<Vec<_>>()
        .join("\n");

    Some(CodeContext {
        file_path: location.file,
        line_number: location.line,
        code_snippet,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_numbered_file(dir: &Path, name: &str, line_count: usize) -> PathBuf {
        let content: String = (1..=line_count)
            .map(|n| format!("line {n}\n"))
            .collect();
        let path = dir.join(name);
        fs::write(&path, content).expect("write fixture");
        path
    }

    #[test]
    fn test_window_covers_five_lines_each_side() {
        let temp = TempDir::new().unwrap();
        write_numbered_file(temp.path(), "app.js", 20);

        let stderr = "    at main (app.js:10:1)";
        let context = extract_error_context(stderr, temp.path()).unwrap();

        assert_eq!(context.file_path, "app.js");
        assert_eq!(context.line_number, 10);

        let snippet_lines: Vec<&str> = context.code_snippet.lines().collect();
        assert_eq!(snippet_lines.len(), 11);
        assert_eq!(snippet_lines[0], "  5: line 5");
        assert_eq!(snippet_lines[5], "> 10: line 10");
        assert_eq!(snippet_lines[10], "  15: line 15");
    }

    #[test]
    fn test_marker_only_on_target_line() {
        let temp = TempDir::new().unwrap();
        write_numbered_file(temp.path(), "app.js", 20);

        let context = extract_error_context("    at main (app.js:10:1)", temp.path()).unwrap();
        let marked: Vec<&str> = context
            .code_snippet
            .lines()
            .filter(|l| l.starts_with('>'))
            .collect();
        assert_eq!(marked, vec!["> 10: line 10"]);
    }

    #[test]
    fn test_window_clamped_at_file_start() {
        let temp = TempDir::new().unwrap();
        write_numbered_file(temp.path(), "app.js", 20);

        let context = extract_error_context("    at main (app.js:2:1)", temp.path()).unwrap();
        let snippet_lines: Vec<&str> = context.code_snippet.lines().collect();

        assert_eq!(snippet_lines[0], "  1: line 1");
        assert_eq!(snippet_lines[1], "> 2: line 2");
        assert_eq!(snippet_lines.len(), 7);
    }

    #[test]
    fn test_window_clamped_at_file_end() {
        let temp = TempDir::new().unwrap();
        write_numbered_file(temp.path(), "app.js", 20);

        let context = extract_error_context("    at main (app.js:19:1)", temp.path()).unwrap();
        let snippet_lines: Vec<&str> = context.code_snippet.lines().collect();

        assert_eq!(snippet_lines.len(), 7);
        assert_eq!(snippet_lines.last().unwrap(), &"  20: line 20");
    }

    #[test]
    fn test_target_beyond_file_length_yields_empty_snippet() {
        let temp = TempDir::new().unwrap();
        write_numbered_file(temp.path(), "app.js", 3);

        let context = extract_error_context("    at main (app.js:50:1)", temp.path()).unwrap();
        assert!(context.code_snippet.is_empty());
        assert_eq!(context.line_number, 50);
    }

    #[test]
    fn test_empty_file_yields_empty_snippet() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("empty.py"), "").unwrap();

        let context =
            extract_error_context("  File \"empty.py\", line 1", temp.path()).unwrap();
        assert!(context.code_snippet.is_empty());
    }

    #[test]
    fn test_missing_file_returns_none() {
        let temp = TempDir::new().unwrap();
        assert!(extract_error_context("    at main (gone.js:3:1)", temp.path()).is_none());
    }

    #[test]
    fn test_non_utf8_file_returns_none() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("blob.js"), [0xff, 0xfe, 0x00, 0x80]).unwrap();
        assert!(extract_error_context("    at main (blob.js:1:1)", temp.path()).is_none());
    }

    #[test]
    fn test_no_trace_returns_none() {
        let temp = TempDir::new().unwrap();
        assert!(extract_error_context("nothing to see here", temp.path()).is_none());
    }

    #[test]
    fn test_absolute_path_passes_through() {
        let temp = TempDir::new().unwrap();
        let absolute = write_numbered_file(temp.path(), "app.js", 12);

        let stderr = format!("    at main ({}:6:1)", absolute.display());
        // Resolution root is unrelated; the absolute path must win.
        let unrelated = TempDir::new().unwrap();
        let context = extract_error_context(&stderr, unrelated.path()).unwrap();
        assert_eq!(context.file_path, absolute.display().to_string());
        assert!(context.code_snippet.contains("> 6: line 6"));
    }
}
