//! Session state, progressive disclosure, and on-disk persistence.
//!
//! A session is the single most-recent captured failure together with its
//! analysis and disclosure progress. Every CLI invocation is a fresh
//! process, so the disclosure state machine has no in-memory state at all:
//! its state is exactly the serializable record in this module, replaced
//! wholesale on every transition.
//!
//! One record exists per working directory (`.fathom-state.json`); a new
//! `run` overwrites the previous session. There is no local history - the
//! remote log backend owns history.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;

/// Name of the state file, relative to the invocation directory.
pub const STATE_FILE: &str = ".fathom-state.json";

/// Temporary file suffix for atomic writes.
const TMP_SUFFIX: &str = ".tmp";

// =============================================================================
// Analysis Types
// =============================================================================

/// A structured single-line fix descriptor.
///
/// Produced by the analyzer, consumed exclusively by [`crate::fix::apply_fix`].
/// Describes exactly one line replacement; multi-line edits, insertions, and
/// deletions are not expressible.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FixAction {
    /// Target file, relative to the invocation directory or absolute.
    pub file_path: String,
    /// 1-based line to replace.
    pub line_number: u32,
    /// Replacement code. Indentation is inherited from the replaced line,
    /// never from this field.
    pub code: String,
    /// Human-readable description of what the fix does.
    pub description: String,
}

/// Structured analysis of a failure, as returned by the analyzer.
///
/// All fields except `fix_action` are free-form natural language. The
/// container is deserialized with defaults so a partially-shaped analyzer
/// response still parses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Analysis {
    /// Error classification, e.g. "TypeError".
    pub error_type: String,
    /// Brief explanation of why the failure happened.
    pub likely_cause: String,
    /// "Low", "Medium", or "High".
    pub confidence: String,
    /// Ordered hints, vaguest first.
    pub hints: Vec<String>,
    /// Full explanation shown once all hints are exhausted.
    pub final_explanation: String,
    /// Optional single-line fix suggestion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix_action: Option<FixAction>,
}

// =============================================================================
// Disclosure State Machine
// =============================================================================

/// What the user should be shown for the current disclosure step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disclosure {
    /// An indexed hint (0-based index into the hint list).
    Hint { index: usize, text: String },
    /// The final explanation; terminal and repeatable.
    Final { text: String },
}

/// The single persisted session record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    /// The originally executed command line.
    pub command: String,
    /// Raw captured failure text.
    pub error: String,
    /// Structured analysis of the failure.
    pub analysis: Analysis,
    /// 0-based cursor into `analysis.hints`. `step == hints.len()` means
    /// all hints are spent and the final explanation is shown.
    pub step: usize,
    /// Creation time of this session.
    pub timestamp: DateTime<Utc>,
    /// Backend record id, present only after a successful sync and removed
    /// when the session is marked solved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_id: Option<String>,
}

impl SessionState {
    /// Create a fresh session at disclosure step 0.
    #[must_use]
    pub fn new(
        command: impl Into<String>,
        error: impl Into<String>,
        analysis: Analysis,
    ) -> Self {
        Self {
            command: command.into(),
            error: error.into(),
            analysis,
            step: 0,
            timestamp: Utc::now(),
            log_id: None,
        }
    }

    /// Number of hints in this session.
    #[must_use]
    pub fn hint_count(&self) -> usize {
        self.analysis.hints.len()
    }

    /// Whether all hints have been disclosed.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.step >= self.hint_count()
    }

    /// The disclosure for the current step.
    ///
    /// A `step` at or beyond the hint count yields the final explanation,
    /// so a stale state file with an out-of-range cursor still produces a
    /// defined response.
    #[must_use]
    pub fn current_disclosure(&self) -> Disclosure {
        match self.analysis.hints.get(self.step) {
            Some(text) => Disclosure::Hint {
                index: self.step,
                text: text.clone(),
            },
            None => Disclosure::Final {
                text: self.analysis.final_explanation.clone(),
            },
        }
    }

    /// Advance the disclosure cursor one step, clamped at the terminal
    /// state. Advancing past the end keeps returning the final explanation.
    pub fn advance(&mut self) {
        self.step = (self.step + 1).min(self.hint_count());
    }
}

// =============================================================================
// State Store
// =============================================================================

/// File-backed store for the session record.
///
/// One flat file, one record, last-write-wins. Saves go through a temp file
/// and rename so an interrupted write never leaves a truncated record, but
/// there is deliberately no cross-process locking: the tool is invoked
/// serially by a human, and racing invocations in one directory are an
/// accepted limitation.
#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    /// Create a store rooted at the given invocation directory.
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Path of the state file.
    #[must_use]
    pub fn state_file_path(&self) -> PathBuf {
        self.dir.join(STATE_FILE)
    }

    fn tmp_file_path(&self) -> PathBuf {
        self.dir.join(format!("{STATE_FILE}{TMP_SUFFIX}"))
    }

    /// Serialize the full record, overwriting any prior content.
    pub fn save(&self, state: &SessionState) -> Result<()> {
        let json = serde_json::to_string_pretty(state)?;
        let tmp_path = self.tmp_file_path();
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, self.state_file_path())?;
        Ok(())
    }

    /// Load the record, or `None` when there is no usable state.
    ///
    /// Absent, unreadable, and unparsable files all yield `None`; this is
    /// never an error to the caller.
    #[must_use]
    pub fn load(&self) -> Option<SessionState> {
        let path = self.state_file_path();
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) => {
                debug!("no session state at {}: {}", path.display(), e);
                return None;
            }
        };
        match serde_json::from_str(&contents) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!("ignoring corrupt session state at {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Remove the state file if present.
    pub fn clear(&self) -> Result<()> {
        let path = self.state_file_path();
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }

    /// Whether a state file exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.state_file_path().exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn analysis_with_hints(hints: &[&str]) -> Analysis {
        Analysis {
            error_type: "TypeError".to_string(),
            likely_cause: "called a non-function".to_string(),
            confidence: "High".to_string(),
            hints: hints.iter().map(|h| h.to_string()).collect(),
            final_explanation: "the full story".to_string(),
            fix_action: None,
        }
    }

    #[test]
    fn test_new_session_starts_at_step_zero() {
        let state = SessionState::new("npm start", "boom", analysis_with_hints(&["a"]));
        assert_eq!(state.step, 0);
        assert!(state.log_id.is_none());
    }

    #[test]
    fn test_disclosure_sequence_then_terminal() {
        let mut state =
            SessionState::new("npm start", "boom", analysis_with_hints(&["a", "b", "c"]));

        assert_eq!(
            state.current_disclosure(),
            Disclosure::Hint {
                index: 0,
                text: "a".to_string()
            }
        );

        state.advance();
        assert_eq!(
            state.current_disclosure(),
            Disclosure::Hint {
                index: 1,
                text: "b".to_string()
            }
        );

        state.advance();
        assert_eq!(
            state.current_disclosure(),
            Disclosure::Hint {
                index: 2,
                text: "c".to_string()
            }
        );

        state.advance();
        assert!(state.is_terminal());
        assert_eq!(
            state.current_disclosure(),
            Disclosure::Final {
                text: "the full story".to_string()
            }
        );

        // Further advances stay at the final explanation.
        state.advance();
        state.advance();
        assert_eq!(state.step, 3);
        assert_eq!(
            state.current_disclosure(),
            Disclosure::Final {
                text: "the full story".to_string()
            }
        );
    }

    #[test]
    fn test_empty_hint_list_is_immediately_terminal() {
        let state = SessionState::new("npm start", "boom", analysis_with_hints(&[]));
        assert!(state.is_terminal());
        assert!(matches!(
            state.current_disclosure(),
            Disclosure::Final { .. }
        ));
    }

    #[test]
    fn test_out_of_range_step_degrades_to_final() {
        let mut state = SessionState::new("npm start", "boom", analysis_with_hints(&["a"]));
        state.step = 42;
        assert!(matches!(
            state.current_disclosure(),
            Disclosure::Final { .. }
        ));
    }

    #[test]
    fn test_store_roundtrip_deep_equal() {
        let temp = TempDir::new().unwrap();
        let store = StateStore::new(temp.path());

        let mut analysis = analysis_with_hints(&["a", "b"]);
        analysis.fix_action = Some(FixAction {
            file_path: "src/app.js".to_string(),
            line_number: 3,
            code: "console.log(x);".to_string(),
            description: "add missing paren".to_string(),
        });
        let mut state = SessionState::new("npm start", "boom", analysis);
        state.step = 1;
        state.log_id = Some("abc123".to_string());

        store.save(&state).expect("save should succeed");
        let loaded = store.load().expect("state should load");
        assert_eq!(loaded, state);
    }

    #[test]
    fn test_store_load_missing_returns_none() {
        let temp = TempDir::new().unwrap();
        let store = StateStore::new(temp.path());
        assert!(store.load().is_none());
        assert!(!store.exists());
    }

    #[test]
    fn test_store_load_corrupt_returns_none() {
        let temp = TempDir::new().unwrap();
        let store = StateStore::new(temp.path());
        std::fs::write(store.state_file_path(), "not valid json {{{").unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn test_store_overwrites_wholesale() {
        let temp = TempDir::new().unwrap();
        let store = StateStore::new(temp.path());

        let mut first = SessionState::new("one", "err1", analysis_with_hints(&["a"]));
        first.log_id = Some("id1".to_string());
        store.save(&first).unwrap();

        let second = SessionState::new("two", "err2", analysis_with_hints(&["x", "y"]));
        store.save(&second).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.command, "two");
        assert_eq!(loaded.log_id, None);
        assert_eq!(loaded.hint_count(), 2);
    }

    #[test]
    fn test_store_no_tmp_file_left_behind() {
        let temp = TempDir::new().unwrap();
        let store = StateStore::new(temp.path());
        store
            .save(&SessionState::new("c", "e", analysis_with_hints(&["a"])))
            .unwrap();
        assert!(!store.tmp_file_path().exists());
        assert!(store.exists());
    }

    #[test]
    fn test_store_clear() {
        let temp = TempDir::new().unwrap();
        let store = StateStore::new(temp.path());
        store
            .save(&SessionState::new("c", "e", analysis_with_hints(&[])))
            .unwrap();
        store.clear().expect("clear should succeed");
        assert!(!store.exists());
        // Clearing again is a no-op.
        store.clear().expect("clear should stay quiet");
    }

    #[test]
    fn test_state_file_uses_camel_case_keys() {
        let temp = TempDir::new().unwrap();
        let store = StateStore::new(temp.path());
        let mut state = SessionState::new("c", "e", analysis_with_hints(&["a"]));
        state.log_id = Some("id".to_string());
        store.save(&state).unwrap();

        let raw = std::fs::read_to_string(store.state_file_path()).unwrap();
        assert!(raw.contains("\"finalExplanation\""));
        assert!(raw.contains("\"errorType\""));
        assert!(raw.contains("\"logId\""));
        assert!(raw.contains("\"likelyCause\""));
    }

    #[test]
    fn test_analysis_tolerates_partial_json() {
        let analysis: Analysis =
            serde_json::from_str(r#"{"hints": ["only hints"]}"#).expect("partial parse");
        assert_eq!(analysis.hints, vec!["only hints".to_string()]);
        assert!(analysis.error_type.is_empty());
        assert!(analysis.fix_action.is_none());
    }
}
