//! Agent backend implementations for gloss generation.
//!
//! This module provides the Strategy pattern for different AI agent backends.
//! Each backend knows how to invoke its CLI and extract the response text.
//!
//! # Supported Agents
//!
//! - **Claude**: `claude --print --output-format json --tools ""`
//! - **Codex**: `codex exec` (plain text output)
//!
//! # Design
//!
//! The `GlossBackend` trait defines the interface for all backends.
//! Backends are stateless and can be shared between threads.

mod claude;
mod codex;

pub use claude::ClaudeBackend;
pub use codex::CodexBackend;

use std::time::Duration;
use thiserror::Error;

/// Wait for child process with timeout.
///
/// Uses a simple polling approach since std::process doesn't have
/// native timeout support. Includes proper process reaping to prevent zombies.
pub(crate) fn wait_with_timeout(
    child: &mut std::process::Child,
    timeout_secs: u64,
) -> std::io::Result<std::process::Output> {
    use std::io::Read;
    use std::thread;
    use std::time::Instant;

    let start = Instant::now();
    let poll_interval = Duration::from_millis(100);

    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                // Process finished - collect output
                let stdout = child
                    .stdout
                    .take()
                    .map(|mut s| {
                        let mut buf = Vec::new();
                        s.read_to_end(&mut buf).ok();
                        buf
                    })
                    .unwrap_or_default();

                let stderr = child
                    .stderr
                    .take()
                    .map(|mut s| {
                        let mut buf = Vec::new();
                        s.read_to_end(&mut buf).ok();
                        buf
                    })
                    .unwrap_or_default();

                return Ok(std::process::Output {
                    status,
                    stdout,
                    stderr,
                });
            }
            Ok(None) => {
                // Still running - check timeout
                if start.elapsed().as_secs() >= timeout_secs {
                    // Kill and reap to prevent zombie process
                    let _ = child.kill();
                    let _ = child.wait(); // Reap the zombie
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        "Process timed out",
                    ));
                }
                thread::sleep(poll_interval);
            }
            Err(e) => return Err(e),
        }
    }
}

/// Result type for agent backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Trait for AI agent backends (Strategy pattern).
///
/// Implementors must be thread-safe as a service may hand the backend
/// to a worker thread.
pub trait GlossBackend: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &'static str;

    /// Check if the agent CLI is available on the system.
    fn is_available(&self) -> bool;

    /// Send a prompt and return the agent's text response.
    ///
    /// The response is the gloss body as plain markdown; any CLI-specific
    /// envelope (Claude's JSON wrapper) is already unwrapped.
    fn generate(&self, prompt: &str, timeout: Duration) -> BackendResult<String>;
}

/// Agent types supported for gloss generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Claude,
    Codex,
}

impl BackendKind {
    /// Create the appropriate backend for this agent type.
    pub fn create_backend(&self) -> Box<dyn GlossBackend> {
        match self {
            BackendKind::Claude => Box::new(ClaudeBackend::new()),
            BackendKind::Codex => Box::new(CodexBackend::new()),
        }
    }

    /// Get the CLI command name for this agent.
    pub fn command_name(&self) -> &'static str {
        match self {
            BackendKind::Claude => "claude",
            BackendKind::Codex => "codex",
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "claude" => Ok(BackendKind::Claude),
            "codex" => Ok(BackendKind::Codex),
            other => Err(format!(
                "unknown backend '{}' (expected 'claude' or 'codex')",
                other
            )),
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Claude => write!(f, "Claude"),
            BackendKind::Codex => write!(f, "Codex"),
        }
    }
}

/// Errors from agent backends.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Agent CLI not found: {0}")]
    NotAvailable(String),

    #[error("Agent timed out after {0:?}")]
    Timeout(Duration),

    #[error("Exit code {code}: {}", truncate_stderr(stderr))]
    ExitCode { code: i32, stderr: String },

    #[error("Rate limited: {0}")]
    RateLimited(RateLimitInfo),

    #[error("Failed to parse agent envelope as JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Agent returned an empty response")]
    EmptyResponse,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rate limit information extracted from agent response.
#[derive(Debug, Clone)]
pub struct RateLimitInfo {
    /// When the rate limit resets (if provided by agent)
    pub retry_after: Option<Duration>,
    /// Human-readable message
    pub message: String,
}

impl std::fmt::Display for RateLimitInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(retry_after) = self.retry_after {
            write!(f, "{} (retry after {:?})", self.message, retry_after)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl BackendError {
    /// Extract wait duration for retry logic.
    ///
    /// Uses agent-provided retry_after if available, otherwise falls back
    /// to the provided default duration.
    pub fn wait_duration(&self, fallback: Duration) -> Duration {
        match self {
            BackendError::RateLimited(info) => info.retry_after.unwrap_or(fallback),
            _ => fallback,
        }
    }

    /// True for failures that a later attempt could succeed on.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            BackendError::Timeout(_)
                | BackendError::RateLimited(_)
                | BackendError::ExitCode { .. }
                | BackendError::EmptyResponse
                | BackendError::Io(_)
        )
    }
}

/// Parse rate limit info from agent CLI stderr.
///
/// Each agent signals rate limiting differently. This function
/// attempts to extract retry-after timing from various formats.
pub fn parse_rate_limit_info(stderr: &str) -> Option<RateLimitInfo> {
    let stderr_lower = stderr.to_lowercase();

    // Check for rate limit indicators
    let is_rate_limited = stderr_lower.contains("rate limit")
        || stderr_lower.contains("throttled")
        || stderr_lower.contains("resource_exhausted")
        || stderr_lower.contains("429")
        || stderr_lower.contains("too many requests")
        || stderr_lower.contains("quota exceeded");

    if !is_rate_limited {
        return None;
    }

    let retry_after = extract_retry_seconds(&stderr_lower).map(Duration::from_secs);

    Some(RateLimitInfo {
        retry_after,
        message: stderr.lines().next().unwrap_or("Rate limited").to_string(),
    })
}

/// Extract retry delay from various formats.
///
/// Parses common rate-limit retry timing patterns without regex dependency.
fn extract_retry_seconds(stderr: &str) -> Option<u64> {
    // Helper to extract number after a keyword
    let extract_after = |text: &str, keyword: &str| -> Option<u64> {
        text.find(keyword).and_then(|pos| {
            let after = &text[pos + keyword.len()..];
            extract_first_number(after)
        })
    };

    // "retry after 45 seconds" or "retry after 45"
    if let Some(secs) = extract_after(stderr, "retry after ") {
        return Some(secs);
    }

    // "retry_after_seconds: 45" or "retry_after: 45"
    if let Some(secs) = extract_after(stderr, "retry_after") {
        return Some(secs);
    }

    // "retry in 30s" or "retry in 30"
    if let Some(secs) = extract_after(stderr, "retry in ") {
        return Some(secs);
    }

    // "wait 30 seconds"
    if let Some(secs) = extract_after(stderr, "wait ") {
        return Some(secs);
    }

    // "45 seconds remaining"
    if stderr.contains("seconds") {
        return extract_first_number(stderr);
    }

    None
}

/// Extract the first number from a string.
fn extract_first_number(s: &str) -> Option<u64> {
    let mut num_str = String::new();
    let mut found_digit = false;

    for c in s.chars() {
        if c.is_ascii_digit() {
            num_str.push(c);
            found_digit = true;
        } else if found_digit {
            // Stop at first non-digit after finding digits
            break;
        } else if !c.is_whitespace() && c != ':' {
            // Skip whitespace and colons, but stop at other chars before digits
            if !num_str.is_empty() {
                break;
            }
        }
    }

    num_str.parse().ok()
}

/// Truncate stderr for error display.
///
/// Takes the first line and limits to 200 characters for readability.
fn truncate_stderr(stderr: &str) -> String {
    let first_line = stderr.lines().next().unwrap_or("").trim();
    if first_line.len() <= 200 {
        first_line.to_string()
    } else {
        format!("{}...", &first_line[..200])
    }
}

/// Check if a command is available in PATH.
///
/// Uses platform-specific command lookup:
/// - Unix: `which` command
/// - Windows: `where` command
pub fn command_exists(command: &str) -> bool {
    #[cfg(windows)]
    let lookup_cmd = "where";
    #[cfg(not(windows))]
    let lookup_cmd = "which";

    std::process::Command::new(lookup_cmd)
        .arg(command)
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    // ============================================
    // Rate Limit Parsing Tests
    // ============================================

    #[test]
    fn parse_rate_limit_claude_format() {
        let stderr = "Error: Rate limited. Retry after 45 seconds";
        let info = parse_rate_limit_info(stderr).unwrap();
        assert_eq!(info.retry_after, Some(Duration::from_secs(45)));
    }

    #[test]
    fn parse_rate_limit_codex_format() {
        let stderr = "Request throttled, retry in 30s";
        let info = parse_rate_limit_info(stderr).unwrap();
        assert_eq!(info.retry_after, Some(Duration::from_secs(30)));
    }

    #[test]
    fn parse_rate_limit_429_status() {
        let stderr = "HTTP 429: Too many requests";
        let info = parse_rate_limit_info(stderr).unwrap();
        assert!(info.retry_after.is_none());
    }

    #[test]
    fn parse_rate_limit_quota_exceeded() {
        let stderr = "Quota exceeded, wait 120 seconds before retrying";
        let info = parse_rate_limit_info(stderr).unwrap();
        assert_eq!(info.retry_after, Some(Duration::from_secs(120)));
    }

    #[test]
    fn parse_rate_limit_not_rate_limited() {
        let stderr = "Error: Connection failed";
        let info = parse_rate_limit_info(stderr);
        assert!(info.is_none());
    }

    #[test]
    fn rate_limit_message_is_first_line() {
        let stderr = "Rate limit reached for model\nmore details\neven more";
        let info = parse_rate_limit_info(stderr).unwrap();
        assert_eq!(info.message, "Rate limit reached for model");
    }

    // ============================================
    // BackendError Tests
    // ============================================

    #[test]
    fn backend_error_wait_duration_rate_limited() {
        let err = BackendError::RateLimited(RateLimitInfo {
            retry_after: Some(Duration::from_secs(30)),
            message: "Rate limited".to_string(),
        });
        assert_eq!(
            err.wait_duration(Duration::from_secs(5)),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn backend_error_wait_duration_fallback() {
        let err = BackendError::Timeout(Duration::from_secs(60));
        assert_eq!(
            err.wait_duration(Duration::from_secs(5)),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn backend_error_wait_duration_rate_limited_no_retry_after() {
        let err = BackendError::RateLimited(RateLimitInfo {
            retry_after: None,
            message: "Rate limited".to_string(),
        });
        assert_eq!(
            err.wait_duration(Duration::from_secs(10)),
            Duration::from_secs(10)
        );
    }

    #[test]
    fn backend_error_exit_code_displays_stderr() {
        let err = BackendError::ExitCode {
            code: 1,
            stderr: "error: prompt too large for context window".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Exit code 1"));
        assert!(msg.contains("prompt too large"));
    }

    #[test]
    fn backend_error_exit_code_truncates_long_stderr() {
        let long_stderr = "x".repeat(300);
        let err = BackendError::ExitCode {
            code: 1,
            stderr: long_stderr,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Exit code 1"));
        assert!(msg.contains("..."));
        assert!(msg.len() < 250);
    }

    #[test]
    fn backend_error_exit_code_uses_first_line() {
        let err = BackendError::ExitCode {
            code: 1,
            stderr: "first line error\nsecond line details\nthird line".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("first line error"));
        assert!(!msg.contains("second line"));
    }

    #[test]
    fn retriable_variants() {
        assert!(BackendError::Timeout(Duration::from_secs(1)).is_retriable());
        assert!(BackendError::EmptyResponse.is_retriable());
        assert!(BackendError::ExitCode {
            code: 1,
            stderr: String::new()
        }
        .is_retriable());
        assert!(!BackendError::NotAvailable("claude".to_string()).is_retriable());
    }

    #[test]
    fn truncate_stderr_short_message() {
        let result = truncate_stderr("short error");
        assert_eq!(result, "short error");
    }

    #[test]
    fn truncate_stderr_long_message() {
        let long = "x".repeat(250);
        let result = truncate_stderr(&long);
        assert!(result.len() <= 203); // 200 + "..."
        assert!(result.ends_with("..."));
    }

    #[test]
    fn truncate_stderr_multiline() {
        let result = truncate_stderr("first line\nsecond line\nthird");
        assert_eq!(result, "first line");
    }

    // ============================================
    // BackendKind Tests
    // ============================================

    #[test]
    fn backend_kind_command_name() {
        assert_eq!(BackendKind::Claude.command_name(), "claude");
        assert_eq!(BackendKind::Codex.command_name(), "codex");
    }

    #[test]
    fn backend_kind_display() {
        assert_eq!(format!("{}", BackendKind::Claude), "Claude");
        assert_eq!(format!("{}", BackendKind::Codex), "Codex");
    }

    #[test]
    fn backend_kind_from_str() {
        assert_eq!(BackendKind::from_str("claude").unwrap(), BackendKind::Claude);
        assert_eq!(BackendKind::from_str("CODEX").unwrap(), BackendKind::Codex);
        assert!(BackendKind::from_str("gemini").is_err());
    }

    #[test]
    fn backend_kind_create_backend() {
        // Just verify it creates without panic
        let _ = BackendKind::Claude.create_backend();
        let _ = BackendKind::Codex.create_backend();
    }
}
