//! Groq analyzer provider.
//!
//! Calls Groq's OpenAI-compatible chat completions endpoint with
//! `response_format: json_object` and parses the reply into an
//! [`Analysis`]. The request is shaped so the model answers with exactly
//! the fields the session record stores, camelCase keys included.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::CodeContext;
use crate::error::{FathomError, Result};
use crate::http;
use crate::llm::ErrorAnalyzer;
use crate::session::Analysis;

// =============================================================================
// Groq API Request/Response Types
// =============================================================================

/// Message in a chat completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Forces the model to emit a single JSON object.
#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

/// Request body for the chat completions API.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Choice in an API response.
#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

/// Response from the chat completions API.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

// =============================================================================
// Groq Provider
// =============================================================================

/// Analyzer backed by Groq's chat completions API.
///
/// # Example
///
/// ```rust,ignore
/// use fathom::llm::{ErrorAnalyzer, GroqProvider};
///
/// let analyzer = GroqProvider::new().with_model("llama-3.3-70b-versatile");
/// let analysis = analyzer.analyze(stderr, "npm start", None).await?;
/// ```
#[derive(Debug, Clone)]
pub struct GroqProvider {
    /// Model identifier sent to the API.
    model: String,
    /// Environment variable name for the API key.
    api_key_env: String,
    /// Request timeout in seconds.
    timeout_secs: u64,
    /// API base URL.
    api_base: String,
}

impl GroqProvider {
    /// Default model.
    pub const DEFAULT_MODEL: &'static str = "openai/gpt-oss-120b";

    /// Default API key environment variable.
    pub const DEFAULT_API_KEY_ENV: &'static str = "GROQ_API_KEY";

    /// Default API base URL.
    pub const DEFAULT_API_BASE: &'static str = "https://api.groq.com/openai/v1";

    /// Default timeout for requests.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

    /// Create a provider with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            model: Self::DEFAULT_MODEL.to_string(),
            api_key_env: Self::DEFAULT_API_KEY_ENV.to_string(),
            timeout_secs: Self::DEFAULT_TIMEOUT_SECS,
            api_base: Self::DEFAULT_API_BASE.to_string(),
        }
    }

    /// Set the model identifier.
    #[must_use]
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
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

    /// Set a custom API base URL (for proxies).
    #[must_use]
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.to_string();
        self
    }

    /// Get the API key from the environment.
    fn api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env)
            .map_err(|_| FathomError::missing_credential(self.api_key_env.clone()))
    }
}

impl Default for GroqProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ErrorAnalyzer for GroqProvider {
    async fn analyze(
        &self,
        error_output: &str,
        command: &str,
        context: Option<&CodeContext>,
    ) -> Result<Analysis> {
        let api_key = self.api_key()?;
        let prompt = build_analysis_prompt(error_output, command, context);

        debug!(
            "analyzing with {} ({} chars prompt)",
            self.model,
            prompt.len()
        );

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: "You are a helpful assistant that outputs JSON.".to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt,
                },
            ],
            response_format: ResponseFormat {
                format_type: "json_object".to_string(),
            },
            temperature: Some(0.2),
        };

        let url = format!("{}/chat/completions", self.api_base);
        let body = serde_json::to_string(&request)?;
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
            return Err(FathomError::analysis(format!(
                "API returned {}: {}",
                response.status,
                response.body.trim()
            )));
        }

        let completion: ChatCompletionResponse =
            serde_json::from_str(&response.body).map_err(|e| {
                FathomError::analysis(format!("unexpected API response shape: {e}"))
            })?;
        let content = completion
            .choices
            .first()
            .map(|choice| choice.message.content.as_str())
            .unwrap_or_default();

        let cleaned = strip_code_fences(content);
        serde_json::from_str(cleaned).map_err(|e| {
            FathomError::analysis(format!("model did not return a valid analysis: {e}"))
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Build the analysis prompt for one failure.
///
/// Mirrors the persisted analysis shape exactly so the reply deserializes
/// without remapping. The code context is appended when available.
fn build_analysis_prompt(
    error_output: &str,
    command: &str,
    context: Option<&CodeContext>,
) -> String {
    let mut prompt = format!(
        r#"You are an expert developer assistant.
Analyze the following error output from the command "{command}".

Provide your response in strict JSON format with the following structure:
{{
    "errorType": "The type of error (e.g., TypeError, SyntaxError)",
    "likelyCause": "A brief explanation of why this happened",
    "confidence": "Low, Medium, or High",
    "hints": [
        "Hint 1: A brief, high-level pointer (e.g., check assumptions).",
        "Hint 2: A more specific pointer (e.g., check async/await).",
        "Hint 3: A very specific clue about the code logic."
    ],
    "finalExplanation": "A detailed explanation of the error and how to fix it.",
    "fixAction": {{
        "filePath": "path of the file to fix",
        "lineNumber": 1,
        "code": "the corrected single line of code",
        "description": "what the fix changes"
    }}
}}

The fixAction field is optional: include it only when the fix is a single-line
replacement in a file you can identify from the error; otherwise set it to null.

Error Output:
{error_output}
"#
    );

    if let Some(context) = context {
        prompt.push_str(&format!(
            "\nCode context ({} around line {}):\n{}\n",
            context.file_path, context.line_number, context.code_snippet
        ));
    }

    prompt
}

/// Strip markdown code fences that some models wrap around JSON replies.
fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}
