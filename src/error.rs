//! Custom error types for Fathom.
//!
//! This module provides structured error types that enable better
//! error handling, reporting, and recovery throughout the application.

use thiserror::Error;

/// Main error type for Fathom operations
#[derive(Error, Debug)]
pub enum FathomError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Failed to load or parse configuration
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A required API credential is not set in the environment
    #[error("Missing credential: set {env_var} in the environment")]
    MissingCredential { env_var: String },

    // =========================================================================
    // Subprocess Errors
    // =========================================================================
    /// The wrapped command could not be spawned at all
    #[error("Failed to run '{program}': {message}")]
    Spawn { program: String, message: String },

    // =========================================================================
    // Fix Errors
    // =========================================================================
    /// Malformed fix descriptor (caller-contract violation, not operational)
    #[error("Invalid fix action: {reason}")]
    InvalidFixAction { reason: String },

    // =========================================================================
    // External Collaborator Errors
    // =========================================================================
    /// Error analysis call failed
    #[error("Analysis error: {message}")]
    Analysis { message: String },

    /// Translation call failed
    #[error("Translation error: {message}")]
    Translation { message: String },

    /// Log backend call failed
    #[error("Backend error: {message}")]
    Backend { message: String },

    /// Transport-level HTTP failure
    #[error("HTTP error: {message}")]
    Http { message: String },

    // =========================================================================
    // Wrapped Errors
    // =========================================================================
    /// IO error wrapper
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON error wrapper
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FathomError {
    // =========================================================================
    // Constructor helpers
    // =========================================================================

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing-credential error
    pub fn missing_credential(env_var: impl Into<String>) -> Self {
        Self::MissingCredential {
            env_var: env_var.into(),
        }
    }

    /// Create a spawn error
    pub fn spawn(program: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Spawn {
            program: program.into(),
            message: message.into(),
        }
    }

    /// Create an invalid-fix-action error
    pub fn invalid_fix(reason: impl Into<String>) -> Self {
        Self::InvalidFixAction {
            reason: reason.into(),
        }
    }

    /// Create an analysis error
    pub fn analysis(message: impl Into<String>) -> Self {
        Self::Analysis {
            message: message.into(),
        }
    }

    /// Create a translation error
    pub fn translation(message: impl Into<String>) -> Self {
        Self::Translation {
            message: message.into(),
        }
    }

    /// Create a backend error
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Create an HTTP transport error
    pub fn http(message: impl Into<String>) -> Self {
        Self::Http {
            message: message.into(),
        }
    }

    // =========================================================================
    // Classification helpers
    // =========================================================================

    /// Check if this error is a caller-contract violation (no retry, no fallback)
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::InvalidFixAction { .. })
    }

    /// Check if this error stems from a missing credential
    pub fn is_credential(&self) -> bool {
        matches!(self, Self::MissingCredential { .. })
    }

    /// Check if this error belongs to a best-effort side feature whose
    /// failure must never block the primary disclosure flow
    pub fn is_best_effort(&self) -> bool {
        matches!(self, Self::Translation { .. })
    }

    /// Get error code for exit status
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::MissingCredential { .. } => 2,
            Self::Backend { .. } | Self::Http { .. } => 3,
            Self::InvalidFixAction { .. } => 4,
            Self::Spawn { .. } => 6,
            Self::Config { .. } => 7,
            _ => 1,
        }
    }
}

/// Type alias for Fathom results
pub type Result<T> = std::result::Result<T, FathomError>;
