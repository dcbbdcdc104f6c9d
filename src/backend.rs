//! Cloud log backend: push, list, and update session records.
//!
//! Syncing is a best-effort side feature; the backend owns history, the
//! local state file only remembers the id of the record it last pushed.
//! Schema provisioning is idempotent and attempted lazily: only when a
//! write fails because the backend reports the collection missing, and a
//! provisioning failure downgrades to a warning - the write is still
//! attempted.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{FathomError, Result};
use crate::http;
use crate::session::SessionState;

/// Collection name on the backend.
pub const COLLECTION: &str = "error_logs";

/// Status value written when a session is marked solved.
pub const STATUS_SOLVED: &str = "SOLVED";

/// One synced failure record, as stored by the backend.
///
/// `hints` is a JSON-encoded string rather than an array: the backend
/// schema stores flat string columns, so the hint list is serialized
/// before upload and decoded on display. String fields default so sparse
/// listings from the backend still parse; only `timestamp` is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    /// Backend-assigned identifier.
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// The originally executed command line.
    #[serde(default)]
    pub command: String,
    /// Raw captured failure text.
    #[serde(default)]
    pub error: String,
    /// Error classification from the analysis.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// JSON-encoded hint list.
    #[serde(default)]
    pub hints: String,
    /// Full explanation from the analysis.
    #[serde(default)]
    pub final_explanation: String,
    /// Creation time of the session.
    pub timestamp: DateTime<Utc>,
    /// Lifecycle status, e.g. "SOLVED".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Resolution note attached when marked solved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
}

impl LogRecord {
    /// Build an uploadable record from the current session.
    #[must_use]
    pub fn from_state(state: &SessionState) -> Self {
        Self {
            id: None,
            command: state.command.clone(),
            error: state.error.clone(),
            error_type: Some(state.analysis.error_type.clone())
                .filter(|error_type| !error_type.is_empty()),
            hints: serde_json::to_string(&state.analysis.hints)
                .unwrap_or_else(|_| "[]".to_string()),
            final_explanation: state.analysis.final_explanation.clone(),
            timestamp: state.timestamp,
            status: None,
            solution: None,
        }
    }

    /// Decode the JSON-encoded hint list.
    #[must_use]
    pub fn decoded_hints(&self) -> Vec<String> {
        serde_json::from_str(&self.hints).unwrap_or_default()
    }
}

/// Abstraction over the remote log store.
#[async_trait]
pub trait LogBackend: Send + Sync {
    /// Store a record, returning its backend id.
    async fn create(&self, record: &LogRecord) -> Result<String>;

    /// Fetch all records.
    async fn list(&self) -> Result<Vec<LogRecord>>;

    /// Apply a partial update to the record with the given id.
    async fn update(&self, id: &str, patch: &Value) -> Result<()>;
}

// =============================================================================
// UrBackend Client
// =============================================================================

/// Client for the urbackend data API.
///
/// # Example
///
/// ```rust,ignore
/// use fathom::backend::{LogBackend, LogRecord, UrBackend};
///
/// let backend = UrBackend::new();
/// let id = backend.create(&record).await?;
/// backend.update(&id, &serde_json::json!({"status": "SOLVED"})).await?;
/// ```
#[derive(Debug, Clone)]
pub struct UrBackend {
    /// Environment variable name for the API key.
    api_key_env: String,
    /// Request timeout in seconds.
    timeout_secs: u64,
    /// API base URL.
    api_base: String,
}

impl UrBackend {
    /// Default API key environment variable.
    pub const DEFAULT_API_KEY_ENV: &'static str = "URBACKEND_API_KEY";

    /// Default API base URL.
    pub const DEFAULT_API_BASE: &'static str = "https://api.urbackend.bitbros.in";

    /// Default timeout for requests.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Create a client with default settings.
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

    fn data_url(&self) -> String {
        format!("{}/api/data/{COLLECTION}", self.api_base)
    }

    fn headers(&self, api_key: &str) -> Vec<(&'static str, String)> {
        vec![
            ("x-api-key", api_key.to_string()),
            ("Content-Type", "application/json".to_string()),
        ]
    }

    /// Whether a failed response looks like "collection does not exist".
    fn is_missing_collection(response: &http::HttpResponse) -> bool {
        if response.status != 404 {
            return false;
        }
        let body = response.body.to_lowercase();
        body.contains("collection") && (body.contains("not found") || body.contains("missing"))
    }

    /// Attempt idempotent schema provisioning for the collection.
    ///
    /// Failure here is a warning, never fatal: the caller retries the
    /// original write regardless.
    async fn provision_schema(&self, api_key: &str) {
        let schema = serde_json::json!({
            "collection": COLLECTION,
            "fields": {
                "command": "string",
                "error": "string",
                "errorType": "string",
                "hints": "string",
                "finalExplanation": "string",
                "timestamp": "string",
                "status": "string",
                "solution": "string",
            },
        });
        let url = format!("{}/api/schema", self.api_base);
        match http::send(
            "POST",
            &url,
            &self.headers(api_key),
            Some(&schema.to_string()),
            self.timeout_secs,
        )
        .await
        {
            Ok(response) if response.is_success() => {
                debug!("provisioned backend schema for {COLLECTION}");
            }
            Ok(response) => {
                warn!(
                    "schema provisioning returned {}: {}",
                    response.status,
                    response.body.trim()
                );
            }
            Err(e) => warn!("schema provisioning failed: {e}"),
        }
    }

    async fn post_record(&self, api_key: &str, body: &str) -> Result<http::HttpResponse> {
        http::send(
            "POST",
            &self.data_url(),
            &self.headers(api_key),
            Some(body),
            self.timeout_secs,
        )
        .await
    }
}

impl Default for UrBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LogBackend for UrBackend {
    async fn create(&self, record: &LogRecord) -> Result<String> {
        let api_key = self.api_key()?;
        let body = serde_json::to_string(record)?;

        let mut response = self.post_record(&api_key, &body).await?;
        if Self::is_missing_collection(&response) {
            warn!("backend reports {COLLECTION} missing; provisioning schema");
            self.provision_schema(&api_key).await;
            response = self.post_record(&api_key, &body).await?;
        }

        if !response.is_success() {
            return Err(FathomError::backend(format!(
                "API returned {}: {}",
                response.status,
                response.body.trim()
            )));
        }

        let created: Value = serde_json::from_str(&response.body)
            .map_err(|e| FathomError::backend(format!("unexpected API response shape: {e}")))?;
        created
            .get("_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| FathomError::backend("create response carried no _id"))
    }

    async fn list(&self) -> Result<Vec<LogRecord>> {
        let api_key = self.api_key()?;
        let response = http::send(
            "GET",
            &self.data_url(),
            &self.headers(&api_key),
            None,
            self.timeout_secs,
        )
        .await?;

        if !response.is_success() {
            return Err(FathomError::backend(format!(
                "API returned {}: {}",
                response.status,
                response.body.trim()
            )));
        }

        serde_json::from_str(&response.body)
            .map_err(|e| FathomError::backend(format!("unexpected API response format: {e}")))
    }

    async fn update(&self, id: &str, patch: &Value) -> Result<()> {
        let api_key = self.api_key()?;
        let url = format!("{}/{id}", self.data_url());
        let response = http::send(
            "PUT",
            &url,
            &self.headers(&api_key),
            Some(&patch.to_string()),
            self.timeout_secs,
        )
        .await?;

        if !response.is_success() {
            return Err(FathomError::backend(format!(
                "API returned {}: {}",
                response.status,
                response.body.trim()
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Mock Backend
// =============================================================================

/// In-memory backend for testing.
#[derive(Debug, Default)]
pub struct MockBackend {
    /// Stored records, in insertion order.
    records: Mutex<Vec<LogRecord>>,
    /// Error to return from every call (if set).
    error: Option<String>,
    /// Count of create calls.
    create_count: AtomicU32,
}

impl MockBackend {
    /// Create an empty mock backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate the mock with records.
    #[must_use]
    pub fn with_records(self, records: Vec<LogRecord>) -> Self {
        *self.records.lock().expect("mock lock") = records;
        self
    }

    /// Configure the mock to fail with the given message.
    #[must_use]
    pub fn with_error(mut self, error: &str) -> Self {
        self.error = Some(error.to_string());
        self
    }

    /// Number of times `create` has been called.
    #[must_use]
    pub fn create_count(&self) -> u32 {
        self.create_count.load(Ordering::SeqCst)
    }

    /// Snapshot of the stored records.
    #[must_use]
    pub fn stored(&self) -> Vec<LogRecord> {
        self.records.lock().expect("mock lock").clone()
    }

    fn fail_if_configured(&self) -> Result<()> {
        match &self.error {
            Some(message) => Err(FathomError::backend(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl LogBackend for MockBackend {
    async fn create(&self, record: &LogRecord) -> Result<String> {
        self.create_count.fetch_add(1, Ordering::SeqCst);
        self.fail_if_configured()?;
        let mut records = self.records.lock().expect("mock lock");
        let id = format!("mock-{}", records.len() + 1);
        let mut stored = record.clone();
        stored.id = Some(id.clone());
        records.push(stored);
        Ok(id)
    }

    async fn list(&self) -> Result<Vec<LogRecord>> {
        self.fail_if_configured()?;
        Ok(self.stored())
    }

    async fn update(&self, id: &str, patch: &Value) -> Result<()> {
        self.fail_if_configured()?;
        let mut records = self.records.lock().expect("mock lock");
        let record = records
            .iter_mut()
            .find(|record| record.id.as_deref() == Some(id))
            .ok_or_else(|| FathomError::backend(format!("no record with id {id}")))?;
        if let Some(status) = patch.get("status").and_then(Value::as_str) {
            record.status = Some(status.to_string());
        }
        if let Some(solution) = patch.get("solution").and_then(Value::as_str) {
            record.solution = Some(solution.to_string());
        }
        Ok(())
    }
}
