//! Retry with exponential backoff for backend calls.
//!
//! A chunk that fails on a retriable error is reattempted up to the
//! configured count, doubling the delay each attempt. Rate-limited
//! failures wait at least a minute regardless of how early in the
//! schedule they occur, and honor the agent's own retry-after hint
//! when it asks for longer.

use std::time::Duration;

use tracing::trace;

use super::backend::{BackendError, BackendResult};

/// Minimum wait after a rate-limited failure.
const RATE_LIMIT_FLOOR: Duration = Duration::from_secs(60);

/// Retry schedule: attempt count and base delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Zero means one attempt total.
    pub max_retries: u32,
    /// Delay before the first retry; doubles each retry after that.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        RetryPolicy {
            max_retries,
            base_delay,
        }
    }

    /// Total attempts this policy allows.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Delay before retrying after `error` on 0-indexed attempt `attempt`.
    pub fn delay_for(&self, attempt: u32, error: &BackendError) -> Duration {
        let backoff = self.base_delay * 2u32.saturating_pow(attempt);
        if let BackendError::RateLimited(info) = error {
            let floored = backoff.max(RATE_LIMIT_FLOOR);
            match info.retry_after {
                Some(hint) if hint > floored => hint,
                _ => floored,
            }
        } else {
            backoff
        }
    }
}

/// Outcome of an exhausted retry loop.
#[derive(Debug)]
pub struct RetryExhausted {
    /// Attempts made, including the first.
    pub attempts: u32,
    /// The error from the final attempt.
    pub last_error: BackendError,
}

/// Run `operation` under the policy, sleeping between attempts.
///
/// `sleep` is injected so tests can record delays instead of waiting.
/// Non-retriable errors abort immediately without consuming the schedule.
pub fn with_retry<T, F, S>(
    policy: RetryPolicy,
    mut operation: F,
    mut sleep: S,
) -> Result<T, RetryExhausted>
where
    F: FnMut() -> BackendResult<T>,
    S: FnMut(Duration),
{
    let mut attempt = 0u32;
    loop {
        match operation() {
            Ok(value) => return Ok(value),
            Err(error) => {
                let attempts_made = attempt + 1;
                if !error.is_retriable() || attempts_made >= policy.max_attempts() {
                    return Err(RetryExhausted {
                        attempts: attempts_made,
                        last_error: error,
                    });
                }
                let delay = policy.delay_for(attempt, &error);
                trace!(attempt = attempts_made, delay_secs = delay.as_secs(), "retrying after failure");
                sleep(delay);
                attempt += 1;
            }
        }
    }
}
