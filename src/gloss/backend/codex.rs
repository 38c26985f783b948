//! Codex backend implementation.
//!
//! Invokes the Codex CLI with `exec --sandbox read-only`. The gloss text
//! arrives as plain stdout with no envelope to unwrap.

use super::{
    parse_rate_limit_info, wait_with_timeout, BackendError, BackendResult, GlossBackend,
};
use std::process::{Command, Stdio};
use std::time::Duration;

/// Backend for Codex CLI.
///
/// Uses `codex exec --sandbox read-only` for non-interactive generation.
/// The sandbox flag prevents tool execution.
#[derive(Debug, Clone, Default)]
pub struct CodexBackend {
    /// Extra CLI arguments to pass to the codex command.
    extra_args: Vec<String>,
}

impl CodexBackend {
    /// Create a new Codex backend with no extra arguments.
    pub fn new() -> Self {
        Self {
            extra_args: Vec::new(),
        }
    }

    /// Create a new Codex backend with extra CLI arguments.
    pub fn with_extra_args(extra_args: Vec<String>) -> Self {
        Self { extra_args }
    }

    /// Get the CLI command name.
    fn command() -> &'static str {
        "codex"
    }
}

impl GlossBackend for CodexBackend {
    fn name(&self) -> &'static str {
        "Codex"
    }

    fn is_available(&self) -> bool {
        super::command_exists(Self::command())
    }

    fn generate(&self, prompt: &str, timeout: Duration) -> BackendResult<String> {
        if !self.is_available() {
            return Err(BackendError::NotAvailable(
                "codex CLI not found in PATH".to_string(),
            ));
        }

        // Run in /tmp to avoid loading project skills/context.
        // --skip-git-repo-check prevents git repo discovery errors.
        // When stdout is piped, codex writes the response to stdout and
        // status/thinking to stderr.
        let mut cmd = Command::new(Self::command());
        cmd.args(["exec", "--cd", "/tmp", "--skip-git-repo-check"]);

        // Append extra args from per-agent config BEFORE safety flags
        for arg in &self.extra_args {
            cmd.arg(arg);
        }

        // Safety-critical: sandbox must come last to prevent override by extra_args
        cmd.args(["--sandbox", "read-only"]);

        // Pass prompt via stdin to avoid ARG_MAX limits
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd.spawn()?;

        // Write prompt to stdin and close it
        if let Some(mut stdin) = child.stdin.take() {
            use std::io::Write;
            stdin.write_all(prompt.as_bytes())?;
            // stdin is dropped here, closing the pipe
        }

        let result = wait_with_timeout(&mut child, timeout.as_secs());

        match result {
            Ok(output) => {
                let stdout = String::from_utf8_lossy(&output.stdout).to_string();

                if output.status.success() || !stdout.trim().is_empty() {
                    if stdout.trim().is_empty() {
                        return Err(BackendError::EmptyResponse);
                    }
                    Ok(stdout.trim().to_string())
                } else {
                    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

                    // Check for rate limiting
                    if let Some(info) = parse_rate_limit_info(&stderr) {
                        return Err(BackendError::RateLimited(info));
                    }

                    Err(BackendError::ExitCode {
                        code: output.status.code().unwrap_or(-1),
                        stderr,
                    })
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                Err(BackendError::Timeout(timeout))
            }
            Err(e) => Err(BackendError::Io(e)),
        }
    }
}
