//! Subprocess execution with live stderr capture.
//!
//! The wrapped command owns the terminal: stdin and stdout are inherited so
//! interactive programs behave normally. Stderr is piped through this
//! process, forwarded chunk-by-chunk as it arrives, and simultaneously
//! accumulated in memory for post-hoc analysis. That bounds the design to
//! failure outputs of reasonable size, which is the intended use.

use std::process::Stdio;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command as AsyncCommand;
use tracing::debug;

use crate::error::{FathomError, Result};

/// Outcome of a wrapped command run.
#[derive(Debug, Clone)]
pub struct CommandCapture {
    /// The child's exit code (1 for signal-terminated children).
    pub exit_code: i32,
    /// Everything the child wrote to stderr.
    pub stderr: String,
}

impl CommandCapture {
    /// Whether this run should trigger failure analysis: a non-zero exit
    /// code, or any non-blank stderr even on success.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.exit_code != 0 || !self.stderr.trim().is_empty()
    }
}

/// Run a command, teeing its stderr to the terminal while capturing it.
///
/// # Errors
///
/// Returns [`FathomError::Spawn`] only when the child cannot be started at
/// all; a child that starts and fails is a normal [`CommandCapture`].
pub async fn run_command(program: &str, args: &[String]) -> Result<CommandCapture> {
    let mut child = AsyncCommand::new(program)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| spawn_error(program, &e))?;

    let mut stderr_pipe = child
        .stderr
        .take()
        .ok_or_else(|| FathomError::spawn(program, "stderr pipe was not created"))?;

    let mut captured: Vec<u8> = Vec::new();
    let mut terminal = tokio::io::stderr();
    let mut buffer = [0u8; 8192];

    loop {
        let read = stderr_pipe.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        terminal.write_all(&buffer[..read]).await?;
        terminal.flush().await?;
        captured.extend_from_slice(&buffer[..read]);
    }

    let status = child.wait().await?;
    let exit_code = status.code().unwrap_or(1);
    debug!("'{program}' exited with {exit_code}");

    Ok(CommandCapture {
        exit_code,
        stderr: String::from_utf8_lossy(&captured).to_string(),
    })
}

/// Shape a spawn failure into a useful diagnostic, distinguishing
/// "not installed" from other OS errors.
fn spawn_error(program: &str, error: &std::io::Error) -> FathomError {
    if which::which(program).is_err() {
        FathomError::spawn(program, "command not found in PATH")
    } else {
        FathomError::spawn(program, error.to_string())
    }
}
