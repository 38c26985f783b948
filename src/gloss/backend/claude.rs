//! Claude backend implementation.
//!
//! Invokes the Claude CLI with `--print --output-format json --tools ""`
//! and unwraps the JSON result envelope into plain gloss text.

use super::{
    parse_rate_limit_info, wait_with_timeout, BackendError, BackendResult, GlossBackend,
};
use serde::Deserialize;
use std::process::{Command, Stdio};
use std::time::Duration;

/// Backend for Claude CLI.
///
/// Uses `claude --print --output-format json --tools ""` for
/// non-interactive generation. The gloss text arrives inside a JSON
/// result envelope.
#[derive(Debug, Clone, Default)]
pub struct ClaudeBackend {
    /// Extra CLI arguments to pass before the stdin passthrough args.
    extra_args: Vec<String>,
}

impl ClaudeBackend {
    /// Create a new Claude backend with no extra arguments.
    pub fn new() -> Self {
        Self {
            extra_args: Vec::new(),
        }
    }

    /// Create a new Claude backend with extra CLI arguments.
    pub fn with_extra_args(extra_args: Vec<String>) -> Self {
        Self { extra_args }
    }

    /// Get the CLI command name.
    fn command() -> &'static str {
        "claude"
    }
}

impl GlossBackend for ClaudeBackend {
    fn name(&self) -> &'static str {
        "Claude"
    }

    fn is_available(&self) -> bool {
        super::command_exists(Self::command())
    }

    fn generate(&self, prompt: &str, timeout: Duration) -> BackendResult<String> {
        if !self.is_available() {
            return Err(BackendError::NotAvailable(
                "claude CLI not found in PATH".to_string(),
            ));
        }

        let mut cmd = Command::new(Self::command());
        cmd.args(["--print", "--output-format", "json"]);

        // Append extra args from per-agent config BEFORE the stdin passthrough
        for arg in &self.extra_args {
            cmd.arg(arg);
        }

        // Disable tools for generation-only use
        // Use "-p -" to read prompt from stdin (avoids ARG_MAX limits)
        cmd.args(["--tools", "", "-p", "-"]);
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
                let stderr = String::from_utf8_lossy(&output.stderr).to_string();

                if output.status.success() {
                    unwrap_claude_response(&stdout)
                } else {
                    // Check for rate limiting in stderr
                    if let Some(info) = parse_rate_limit_info(&stderr) {
                        return Err(BackendError::RateLimited(info));
                    }

                    // Claude CLI may return exit code 1 but put error info in stdout
                    let error_msg = extract_error_from_claude_response(&stdout).unwrap_or(stderr);

                    Err(BackendError::ExitCode {
                        code: output.status.code().unwrap_or(-1),
                        stderr: error_msg,
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

/// Claude CLI wrapper format when using `--output-format json`.
///
/// The actual response sits in a metadata envelope:
/// `{"type":"result","result":"...","is_error":false,...}`
#[derive(Debug, Deserialize)]
struct ClaudeWrapper {
    is_error: Option<bool>,
    result: Option<String>,
}

/// Unwrap the gloss text from Claude's JSON envelope.
///
/// Falls back to the raw stdout when the output is not the envelope,
/// which covers older CLI versions that print the text directly.
fn unwrap_claude_response(stdout: &str) -> BackendResult<String> {
    let trimmed = stdout.trim();

    if let Ok(wrapper) = serde_json::from_str::<ClaudeWrapper>(trimmed) {
        if wrapper.is_error == Some(true) {
            return Err(BackendError::ExitCode {
                code: 1,
                stderr: wrapper
                    .result
                    .unwrap_or_else(|| "Claude returned an error".to_string()),
            });
        }
        if let Some(text) = wrapper.result {
            if text.trim().is_empty() {
                return Err(BackendError::EmptyResponse);
            }
            return Ok(text);
        }
    }

    if trimmed.is_empty() {
        return Err(BackendError::EmptyResponse);
    }
    Ok(trimmed.to_string())
}

/// Extract error message from Claude's JSON response wrapper.
fn extract_error_from_claude_response(stdout: &str) -> Option<String> {
    let wrapper: ClaudeWrapper = serde_json::from_str(stdout.trim()).ok()?;

    if wrapper.is_error == Some(true) {
        wrapper
            .result
            .or_else(|| Some("Claude returned an error".to_string()))
    } else {
        wrapper.result.filter(|r| !r.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claude_backend_name() {
        let backend = ClaudeBackend::new();
        assert_eq!(backend.name(), "Claude");
    }

    #[test]
    fn unwrap_envelope_result() {
        let stdout = r#"{"type":"result","is_error":false,"result":"**Line 1:** A gloss."}"#;
        let text = unwrap_claude_response(stdout).unwrap();
        assert_eq!(text, "**Line 1:** A gloss.");
    }

    #[test]
    fn unwrap_envelope_error() {
        let stdout = r#"{"type":"result","is_error":true,"result":"prompt too long"}"#;
        let result = unwrap_claude_response(stdout);
        match result {
            Err(BackendError::ExitCode { stderr, .. }) => {
                assert!(stderr.contains("prompt too long"));
            }
            other => panic!("Expected ExitCode, got {:?}", other),
        }
    }

    #[test]
    fn unwrap_envelope_empty_result() {
        let stdout = r#"{"type":"result","is_error":false,"result":"  "}"#;
        let result = unwrap_claude_response(stdout);
        assert!(matches!(result, Err(BackendError::EmptyResponse)));
    }

    #[test]
    fn unwrap_plain_text_passthrough() {
        let text = unwrap_claude_response("Plain gloss text without envelope.").unwrap();
        assert_eq!(text, "Plain gloss text without envelope.");
    }

    #[test]
    fn unwrap_empty_stdout() {
        let result = unwrap_claude_response("");
        assert!(matches!(result, Err(BackendError::EmptyResponse)));
    }

    #[test]
    fn extract_error_from_error_wrapper() {
        let stdout = r#"{"is_error":true,"result":"context overflow"}"#;
        let msg = extract_error_from_claude_response(stdout).unwrap();
        assert_eq!(msg, "context overflow");
    }

    #[test]
    fn extract_error_from_non_json() {
        assert!(extract_error_from_claude_response("not json").is_none());
    }
}
