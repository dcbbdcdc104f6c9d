//! Minimal HTTPS transport shared by the external collaborators.
//!
//! Requests are shelled out to curl rather than pulling in a full HTTP
//! client stack; the status code is appended to the captured body with
//! `-w` so callers can distinguish transport success from API errors.

use tokio::process::Command as AsyncCommand;

use crate::error::{FathomError, Result};

/// A completed HTTP exchange.
#[derive(Debug, Clone)]
pub(crate) struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    /// Whether the status code is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Perform a single HTTP request via curl.
///
/// `headers` are `(name, value)` pairs; `body` is sent verbatim when
/// present. Transport failures (curl missing, connection refused, timeout)
/// surface as [`FathomError::Http`]; non-2xx statuses do not - callers
/// decide what an API-level failure means.
pub(crate) async fn send(
    method: &str,
    url: &str,
    headers: &[(&str, String)],
    body: Option<&str>,
    timeout_secs: u64,
) -> Result<HttpResponse> {
    let timeout = timeout_secs.to_string();
    let mut command = AsyncCommand::new("curl");
    command.args([
        "-s",
        "-X",
        method,
        url,
        "-w",
        "\n%{http_code}",
        "--max-time",
        &timeout,
    ]);
    for (name, value) in headers {
        command.args(["-H", &format!("{name}: {value}")]);
    }
    if let Some(payload) = body {
        command.args(["-d", payload]);
    }

    let output = command
        .output()
        .await
        .map_err(|e| FathomError::http(format!("failed to execute curl: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        if output.status.code() == Some(28) || stderr.contains("timed out") {
            return Err(FathomError::http(format!(
                "request timed out after {timeout_secs}s"
            )));
        }
        return Err(FathomError::http(format!(
            "curl exited with {}: {}",
            output.status.code().unwrap_or(-1),
            stderr.trim()
        )));
    }

    parse_curl_output(&String::from_utf8_lossy(&output.stdout))
}

/// Split curl's `-w "\n%{http_code}"` trailer off the response body.
fn parse_curl_output(stdout: &str) -> Result<HttpResponse> {
    let (body, status_line) = stdout
        .rsplit_once('\n')
        .ok_or_else(|| FathomError::http("curl produced no status trailer"))?;
    let status: u16 = status_line.trim().parse().map_err(|_| {
        FathomError::http(format!("malformed curl status trailer: {status_line:?}"))
    })?;
    Ok(HttpResponse {
        status,
        body: body.to_string(),
    })
}
