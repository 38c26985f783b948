//! User-friendly error handling for gloss operations.
//!
//! This module provides:
//! - `GlossError` - enum with all failure modes and Display trait
//! - Clear, user-friendly error messages (no stack traces)
//!
//! # Error Categories
//!
//! - Agent availability errors (CLI not found)
//! - Chunk-level failures and exhausted retries
//! - Rate limiting
//! - Cache/store write failures
//! - Parse errors from the structural layer

use crate::gloss::backend::{BackendError, BackendKind};
use crate::parser::ParseError;
use std::fmt;
use std::time::Duration;

/// Error type for gloss operations.
///
/// All variants include user-friendly messages suitable for CLI output.
#[derive(Debug)]
pub enum GlossError {
    /// Agent CLI is not available on the system.
    BackendNotAvailable {
        /// The backend that was requested
        kind: BackendKind,
    },

    /// A chunk failed after every retry was spent.
    ChunkExhausted {
        /// First 8 hex digits of the chunk hash
        hash_prefix: String,
        /// Speaker summary for the chunk
        speakers: String,
        /// Attempts made, including the first
        attempts: u32,
        /// Human-readable reason from the final attempt
        reason: String,
    },

    /// Rate limited by the agent.
    RateLimited {
        /// Suggested retry delay (if provided)
        retry_after: Option<Duration>,
        /// Human-readable message
        message: String,
    },

    /// Failed to write a generated gloss to the cache.
    ///
    /// Fatal: continuing would regenerate and re-bill the same chunk on
    /// the next run.
    CacheWrite {
        /// The underlying store error message
        message: String,
    },

    /// The located unit contains no speeches with dialogue.
    NoSpeeches {
        /// The unit, described in both numbering systems
        unit: String,
    },

    /// Structural parsing failed.
    Parse(ParseError),

    /// IO error reading/writing files.
    IoError {
        /// Description of what operation failed
        operation: String,
        /// The underlying error message
        message: String,
    },

    /// The run was interrupted between chunks.
    Interrupted {
        /// Chunks fully persisted before the interrupt
        completed: usize,
        /// Total chunks in the run
        total: usize,
    },
}

impl fmt::Display for GlossError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GlossError::BackendNotAvailable { kind } => {
                write!(
                    f,
                    "Backend '{}' is not available. Please install the {} CLI and ensure it's in your PATH.",
                    kind,
                    kind.command_name()
                )
            }
            GlossError::ChunkExhausted {
                hash_prefix,
                speakers,
                attempts,
                reason,
            } => {
                write!(
                    f,
                    "Chunk {} ({}) failed after {} attempts: {}",
                    hash_prefix, speakers, attempts, reason
                )
            }
            GlossError::RateLimited {
                retry_after,
                message,
            } => {
                if let Some(duration) = retry_after {
                    write!(
                        f,
                        "Rate limited: {}. Retry after {} seconds.",
                        message,
                        duration.as_secs()
                    )
                } else {
                    write!(f, "Rate limited: {}. Please wait before retrying.", message)
                }
            }
            GlossError::CacheWrite { message } => {
                write!(
                    f,
                    "Failed to store a generated gloss: {}. Stopping so the work is not lost twice.",
                    message
                )
            }
            GlossError::NoSpeeches { unit } => {
                write!(
                    f,
                    "{} contains no speeches with dialogue. Nothing to gloss.",
                    unit
                )
            }
            GlossError::Parse(e) => write!(f, "{}", e),
            GlossError::IoError { operation, message } => {
                write!(f, "IO error during {}: {}", operation, message)
            }
            GlossError::Interrupted { completed, total } => {
                write!(
                    f,
                    "Interrupted after {} of {} chunks. Completed glosses are cached; rerun to resume.",
                    completed, total
                )
            }
        }
    }
}

impl std::error::Error for GlossError {}

impl From<ParseError> for GlossError {
    fn from(e: ParseError) -> Self {
        GlossError::Parse(e)
    }
}

impl GlossError {
    /// Create from a BackendError with chunk context after retries ran out.
    pub fn from_backend_error(
        hash_prefix: &str,
        speakers: &str,
        attempts: u32,
        error: &BackendError,
    ) -> Self {
        match error {
            BackendError::NotAvailable(cmd) => {
                // Parse backend kind from the command name
                let kind = match cmd.as_str() {
                    s if s.contains("codex") => BackendKind::Codex,
                    _ => BackendKind::Claude,
                };
                GlossError::BackendNotAvailable { kind }
            }
            BackendError::RateLimited(info) => GlossError::RateLimited {
                retry_after: info.retry_after,
                message: info.message.clone(),
            },
            other => GlossError::ChunkExhausted {
                hash_prefix: hash_prefix.to_string(),
                speakers: speakers.to_string(),
                attempts,
                reason: truncate_response(&other.to_string(), 200),
            },
        }
    }

    /// Check if this error indicates rate limiting.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, GlossError::RateLimited { .. })
    }

    /// Get suggested retry delay for rate limiting.
    pub fn retry_after(&self) -> Option<Duration> {
        if let GlossError::RateLimited { retry_after, .. } = self {
            *retry_after
        } else {
            None
        }
    }
}

/// Truncate a response string for display.
fn truncate_response(response: &str, max_len: usize) -> String {
    let trimmed = response.trim();
    if trimmed.len() <= max_len {
        trimmed.to_string()
    } else {
        format!("{}...", &trimmed[..max_len])
    }
}
