//! Analyzer abstraction for turning failure output into a structured analysis.
//!
//! The core components never call a model API directly; they consume an
//! [`ErrorAnalyzer`] injected by the orchestrator. This keeps the trace
//! locator, context extractor, disclosure machine, and fix applicator
//! testable with deterministic fakes.
//!
//! # Architecture
//!
//! The [`ErrorAnalyzer`] trait is:
//!
//! - **Object-safe**: supports dynamic dispatch via `Box<dyn ErrorAnalyzer>`
//! - **Thread-safe**: `Send + Sync` bounds for async contexts
//! - **Async-first**: the analysis call is a network round trip
//!
//! # Example
//!
//! ```rust,ignore
//! use fathom::llm::{ErrorAnalyzer, GroqProvider};
//!
//! let analyzer: Box<dyn ErrorAnalyzer> = Box::new(GroqProvider::new());
//! let analysis = analyzer.analyze(stderr, "npm start", context.as_ref()).await?;
//! println!("{}", analysis.final_explanation);
//! ```

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use crate::context::CodeContext;
use crate::error::{FathomError, Result};
use crate::session::Analysis;

pub mod groq;

pub use groq::GroqProvider;

/// Abstraction over the external analysis call.
///
/// Implementations take the raw failure text, the command line that produced
/// it, and an optional code context, and return a structured [`Analysis`].
/// Absence of code context must be tolerated - the trace may not have
/// referenced any locally readable file.
#[async_trait]
pub trait ErrorAnalyzer: Send + Sync {
    /// Analyze captured failure output.
    ///
    /// # Errors
    ///
    /// Returns an error if no credential is configured, the API is
    /// unreachable, or the response cannot be parsed into an [`Analysis`].
    async fn analyze(
        &self,
        error_output: &str,
        command: &str,
        context: Option<&CodeContext>,
    ) -> Result<Analysis>;

    /// Human-readable identifier of the model in use.
    fn model_name(&self) -> &str;
}

/// Mock analyzer for testing.
///
/// Provides controllable behavior for unit tests without network calls.
///
/// # Example
///
/// ```rust,ignore
/// let analyzer = MockAnalyzer::new().with_analysis(analysis);
/// let result = analyzer.analyze("boom", "npm start", None).await?;
/// assert_eq!(analyzer.call_count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MockAnalyzer {
    /// Analysis to return from `analyze`.
    analysis: Analysis,
    /// Error to return instead (if set).
    error: Option<String>,
    /// Count of analyze calls.
    call_count: AtomicU32,
}

impl MockAnalyzer {
    /// Create a new mock with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the analysis to return.
    #[must_use]
    pub fn with_analysis(mut self, analysis: Analysis) -> Self {
        self.analysis = analysis;
        self
    }

    /// Configure the mock to fail with the given message.
    #[must_use]
    pub fn with_error(mut self, error: &str) -> Self {
        self.error = Some(error.to_string());
        self
    }

    /// Number of times `analyze` has been called.
    #[must_use]
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ErrorAnalyzer for MockAnalyzer {
    async fn analyze(
        &self,
        _error_output: &str,
        _command: &str,
        _context: Option<&CodeContext>,
    ) -> Result<Analysis> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        match &self.error {
            Some(message) => Err(FathomError::analysis(message.clone())),
            None => Ok(self.analysis.clone()),
        }
    }

    fn model_name(&self) -> &str {
        "mock-analyzer"
    }
}
