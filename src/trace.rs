//! Trace locator: find a `file:line` reference in raw failure output.
//!
//! Failure text is heterogeneous - a single stderr capture can mix log noise
//! with stack frames from several runtimes. Rather than one dialect-aware
//! parser, this module keeps a small ordered list of independent pattern
//! matchers, each a pure function from a text line to an optional location.
//! Adding a new ecosystem's trace format means adding one matcher, not
//! branching existing logic.
//!
//! # Example
//!
//! ```
//! use fathom::trace::locate_trace;
//!
//! let stderr = "TypeError: x is not a function\n    at main (src/app.js:14:9)";
//! let loc = locate_trace(stderr).unwrap();
//! assert_eq!(loc.file, "src/app.js");
//! assert_eq!(loc.line, 14);
//! ```

use regex::Regex;
use std::sync::OnceLock;

/// A source location referenced by a stack trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceLocation {
    /// File path exactly as it appeared in the trace (relative or absolute).
    pub file: String,
    /// 1-based line number.
    pub line: u32,
}

/// One trace dialect: a named pattern that may recognize a line.
struct TraceDialect {
    name: &'static str,
    regex: Regex,
}

impl TraceDialect {
    /// Try to match a single line against this dialect.
    ///
    /// A capture that fails integer parsing, or parses to line 0, is a
    /// no-match for this line rather than an error.
    fn try_match(&self, line: &str) -> Option<TraceLocation> {
        let captures = self.regex.captures(line)?;
        let file = captures.name("file")?.as_str();
        let line_number: u32 = captures.name("line")?.as_str().parse().ok()?;
        if file.is_empty() || line_number == 0 {
            return None;
        }
        Some(TraceLocation {
            file: file.to_string(),
            line: line_number,
        })
    }
}

/// Dialect patterns in priority order.
const DIALECT_PATTERNS: &[(&str, &str)] = &[
    // Node/V8 frame: "at fn (file:///path/app.js:14:9)" or "(src/app.js:14:9)"
    (
        "node-frame",
        r"\(\s*(?:file://)?(?P<file>[^():]+):(?P<line>\d+):\d+\)",
    ),
    // Python traceback: `File "app.py", line 3, in <module>`
    (
        "python-file",
        r#"File "(?P<file>[^"]+)", line (?P<line>\d+)"#,
    ),
    // rustc diagnostic: " --> src/main.rs:7:20"
    ("rustc-arrow", r"-->\s+(?P<file>[^\s:]+):(?P<line>\d+):\d+"),
    // Rust panic: "thread 'main' panicked at src/main.rs:7:20:"
    (
        "rust-panic",
        r"panicked at\s+(?P<file>[^\s:]+):(?P<line>\d+):\d+",
    ),
];

/// Compiled dialect list. Priority order is fixed: every dialect is tried
/// against a line before the scan advances to the next line.
fn dialects() -> &'static [TraceDialect] {
    static DIALECTS: OnceLock<Vec<TraceDialect>> = OnceLock::new();
    DIALECTS.get_or_init(|| {
        DIALECT_PATTERNS
            .iter()
            .filter_map(|&(name, pattern)| {
                Regex::new(pattern)
                    .ok()
                    .map(|regex| TraceDialect { name, regex })
            })
            .collect()
    })
}

/// Scan failure text for the first recognizable `file:line` reference.
///
/// Lines are scanned top to bottom; for each line every dialect is tried in
/// priority order before moving on. The first match wins, which gives
/// deterministic single-pass behavior without any grammar awareness of the
/// individual trace formats. No match across the whole text returns `None`;
/// this function never fails.
#[must_use]
pub fn locate_trace(text: &str) -> Option<TraceLocation> {
    for line in text.lines() {
        for dialect in dialects() {
            if let Some(location) = dialect.try_match(line) {
                tracing::debug!(
                    "trace dialect '{}' matched {}:{}",
                    dialect.name,
                    location.file,
                    location.line
                );
                return Some(location);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_node_frame() {
        let stderr = "TypeError: x is not a function\n    at main (src/app.js:14:9)\n    at Module._compile (node:internal/modules/cjs/loader:1105:14)";
        let loc = locate_trace(stderr).unwrap();
        assert_eq!(loc.file, "src/app.js");
        assert_eq!(loc.line, 14);
    }

    #[test]
    fn test_locate_node_file_scheme() {
        let stderr = "    at run (file:///home/dev/app/index.mjs:42:3)";
        let loc = locate_trace(stderr).unwrap();
        assert_eq!(loc.file, "/home/dev/app/index.mjs");
        assert_eq!(loc.line, 42);
    }

    #[test]
    fn test_locate_python_traceback() {
        let stderr = "Traceback (most recent call last):\n  File \"scripts/train.py\", line 37, in <module>\n    run()\nValueError: bad shape";
        let loc = locate_trace(stderr).unwrap();
        assert_eq!(loc.file, "scripts/train.py");
        assert_eq!(loc.line, 37);
    }

    #[test]
    fn test_locate_rustc_diagnostic() {
        let stderr = "error[E0308]: mismatched types\n --> src/main.rs:7:20\n  |";
        let loc = locate_trace(stderr).unwrap();
        assert_eq!(loc.file, "src/main.rs");
        assert_eq!(loc.line, 7);
    }

    #[test]
    fn test_locate_rust_panic() {
        let stderr = "thread 'main' panicked at src/lib.rs:101:13:\nindex out of bounds";
        let loc = locate_trace(stderr).unwrap();
        assert_eq!(loc.file, "src/lib.rs");
        assert_eq!(loc.line, 101);
    }

    #[test]
    fn test_first_match_wins_across_lines() {
        // Python frame appears on an earlier line than the node frame,
        // so it wins even though the node dialect has higher priority.
        let stderr = "  File \"early.py\", line 5\n    at later (late.js:9:1)";
        let loc = locate_trace(stderr).unwrap();
        assert_eq!(loc.file, "early.py");
        assert_eq!(loc.line, 5);
    }

    #[test]
    fn test_dialect_priority_within_one_line() {
        // Both dialects match the same line; the node pattern is tried first.
        let line = "boom (src/a.js:3:1) File \"b.py\", line 8";
        let loc = locate_trace(line).unwrap();
        assert_eq!(loc.file, "src/a.js");
        assert_eq!(loc.line, 3);
    }

    #[test]
    fn test_no_match_returns_none() {
        assert!(locate_trace("plain log output, nothing useful").is_none());
        assert!(locate_trace("").is_none());
    }

    #[test]
    fn test_zero_line_is_rejected() {
        assert!(locate_trace("    at main (src/app.js:0:9)").is_none());
    }

    #[test]
    fn test_overflowing_line_number_is_rejected() {
        let stderr = "    at main (src/app.js:99999999999999999999:9)";
        assert!(locate_trace(stderr).is_none());
    }

    #[test]
    fn test_line_parsed_base_10() {
        let loc = locate_trace("    at main (src/app.js:0010:9)").unwrap();
        assert_eq!(loc.line, 10);
    }

    #[test]
    fn test_every_dialect_pattern_compiles() {
        assert_eq!(dialects().len(), DIALECT_PATTERNS.len());
    }
}
