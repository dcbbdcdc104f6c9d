//! Translation of analyses into the user's locale.
//!
//! Translation is a best-effort side feature: a failed or misconfigured
//! translator must never block the disclosure flow, so orchestration goes
//! through [`localize_best_effort`], which falls back to the untranslated
//! analysis. Only human-readable string fields are translated; the
//! structured `fixAction` is detached before the call and re-attached
//! unchanged afterwards - a fix must apply byte-for-byte regardless of the
//! display language.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::{FathomError, Result};
use crate::http;
use crate::session::Analysis;

/// Abstraction over the external localization call.
///
/// `localize` structurally mirrors its input: the returned analysis has the
/// same shape with human-readable fields translated from `source` to
/// `target` locale.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate an analysis between locales.
    ///
    /// # Errors
    ///
    /// Returns an error if no credential is configured or the call fails.
    /// Callers must treat this as non-fatal and fall back to the input.
    async fn localize(&self, analysis: &Analysis, source: &str, target: &str)
        -> Result<Analysis>;
}

/// Localize an analysis, falling back to the original on any failure.
///
/// Detaches `fix_action` before the call and re-attaches it unchanged, per
/// the translator contract. The returned flag reports whether translation
/// actually happened, so the caller can tell the user about the fallback.
pub async fn localize_best_effort(
    translator: &dyn Translator,
    analysis: Analysis,
    source: &str,
    target: &str,
) -> (Analysis, bool) {
    let fix_action = analysis.fix_action.clone();
    let mut detached = analysis.clone();
    detached.fix_action = None;

    match translator.localize(&detached, source, target).await {
        Ok(mut translated) => {
            translated.fix_action = fix_action;
            (translated, true)
        }
        Err(e) => {
            debug!("translation to {target} failed: {e}");
            (analysis, false)
        }
    }
}

// =============================================================================
// Lingo Provider
// =============================================================================

/// Response envelope from the object-localization endpoint.
#[derive(Debug, Deserialize)]
struct LocalizeResponse {
    data: Analysis,
}

/// Translator backed by the Lingo.dev object-localization API.
///
/// # Example
///
/// ```rust,ignore
/// use fathom::translate::{LingoProvider, Translator};
///
/// let translator = LingoProvider::new();
/// let spanish = translator.localize(&analysis, "en", "es").await?;
/// ```
#[derive(Debug, Clone)]
pub struct LingoProvider {
    /// Environment variable name for the API key.
    api_key_env: String,
    /// Request timeout in seconds.
    timeout_secs: u64,
    /// API base URL.
    api_base: String,
}

impl LingoProvider {
    /// Default API key environment variable.
    pub const DEFAULT_API_KEY_ENV: &'static str = "LINGO_API_KEY";

    /// Default API base URL.
    pub const DEFAULT_API_BASE: &'static str = "https://engine.lingo.dev";

    /// Default timeout for requests.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

    /// Create a provider with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            api_key_env: Self::DEFAULT_API_KEY_ENV.to_string(),
            timeout_secs: Self::DEFAULT_TIMEOUT_SECS,
            api_base: Self::DEFAULT_API_BASE.to_string(),
        }
    }

    /// Set the environment variable name for the API key.
    #[must_use]
    pub fn with_api_key_env(mut self, env_var: &str) -> Self {
        self.api_key_env = env_var.to_string();
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Set a custom API base URL.
    #[must_use]
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.to_string();
        self
    }

    fn api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env)
            .map_err(|_| FathomError::missing_credential(self.api_key_env.clone()))
    }
}

impl Default for LingoProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Translator for LingoProvider {
    async fn localize(
        &self,
        analysis: &Analysis,
        source: &str,
        target: &str,
    ) -> Result<Analysis> {
        let api_key = self.api_key()?;

        let body = serde_json::to_string(&serde_json::json!({
            "data": analysis,
            "locale": { "source": source, "target": target },
        }))?;

        let url = format!("{}/i18n", self.api_base);
        let response = http::send(
            "POST",
            &url,
            &[
                ("Authorization", format!("Bearer {api_key}")),
                ("Content-Type", "application/json".to_string()),
            ],
            Some(&body),
            self.timeout_secs,
        )
        .await?;

        if !response.is_success() {
            return Err(FathomError::translation(format!(
                "API returned {}: {}",
                response.status,
                response.body.trim()
            )));
        }

        let envelope: LocalizeResponse = serde_json::from_str(&response.body).map_err(|e| {
            FathomError::translation(format!("unexpected API response shape: {e}"))
        })?;
        Ok(envelope.data)
    }
}

/// Mock translator for testing.
#[derive(Debug, Default)]
pub struct MockTranslator {
    /// Analysis to return (if set); otherwise the input is echoed with a
    /// marker suffix on the final explanation.
    translated: Option<Analysis>,
    /// Error to return instead (if set).
    error: Option<String>,
    /// Count of localize calls.
    call_count: AtomicU32,
}

impl MockTranslator {
    /// Create a new mock that echoes its input with a `[target]` marker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the analysis to return.
    #[must_use]
    pub fn with_translation(mut self, analysis: Analysis) -> Self {
        self.translated = Some(analysis);
        self
    }

    /// Configure the mock to fail with the given message.
    #[must_use]
    pub fn with_error(mut self, error: &str) -> Self {
        self.error = Some(error.to_string());
        self
    }

    /// Number of times `localize` has been called.
    #[must_use]
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Translator for MockTranslator {
    async fn localize(
        &self,
        analysis: &Analysis,
        _source: &str,
        target: &str,
    ) -> Result<Analysis> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.error {
            return Err(FathomError::translation(message.clone()));
        }
        Ok(self.translated.clone().unwrap_or_else(|| {
            let mut echoed = analysis.clone();
            echoed.final_explanation = format!("[{target}] {}", analysis.final_explanation);
            echoed
        }))
    }
}
