//! Fathom - run a command, capture its failure, explain it one hint at a time.
//!
//! Fathom wraps arbitrary shell commands, captures their failure output, and
//! produces a progressively-disclosed, optionally-translated explanation of
//! the failure, with optional single-line fix application and cloud logging.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`trace`] - Locate a `file:line` reference across trace dialects
//! - [`context`] - Extract a bounded code window around a traced line
//! - [`session`] - Session state, disclosure state machine, persistence
//! - [`fix`] - Single-line fix application with indentation preservation
//! - [`runner`] - Subprocess execution with live stderr capture
//! - [`llm`] - Analyzer abstraction and the Groq provider
//! - [`translate`] - Best-effort localization of analyses
//! - [`backend`] - Cloud log backend client
//! - [`config`] - Configuration loading and env overrides
//! - [`error`] - Custom error types and handling
//!
//! # Example
//!
//! ```rust,ignore
//! use fathom::context::extract_error_context;
//! use fathom::session::{SessionState, StateStore};
//!
//! // Locate the failing line and build a snippet for the analyzer.
//! let context = extract_error_context(&stderr, project_dir);
//!
//! // Persist a fresh session and show the first hint.
//! let state = SessionState::new(command_line, stderr, analysis);
//! StateStore::new(project_dir).save(&state)?;
//! println!("{:?}", state.current_disclosure());
//! ```

pub mod backend;
pub mod config;
pub mod context;
pub mod error;
pub mod fix;
mod http;
pub mod llm;
pub mod runner;
pub mod session;
pub mod trace;
pub mod translate;

// Re-export commonly used types
pub use error::{FathomError, Result};

pub use backend::{LogBackend, LogRecord, MockBackend, UrBackend};
pub use config::Config;
pub use context::{extract_error_context, CodeContext};
pub use fix::apply_fix;
pub use llm::{ErrorAnalyzer, GroqProvider, MockAnalyzer};
pub use runner::{run_command, CommandCapture};
pub use session::{Analysis, Disclosure, FixAction, SessionState, StateStore};
pub use trace::{locate_trace, TraceLocation};
pub use translate::{localize_best_effort, LingoProvider, MockTranslator, Translator};
