//! Retry policy and attempt classification.

use reqwest::Method;
use std::time::Duration;

use crate::error::TransportError;
use crate::response::FetchResponse;

/// Statuses for which another attempt cannot change the outcome.
pub const NON_RETRYABLE_STATUS_CODES: [u16; 4] = [400, 401, 403, 404];

/// Methods that are safe to send more than once.
pub const IDEMPOTENT_METHODS: [Method; 5] = [
    Method::GET,
    Method::HEAD,
    Method::OPTIONS,
    Method::PUT,
    Method::DELETE,
];

/// Whether `method` may be retried. Method names compare case-insensitively.
pub fn is_idempotent(method: &Method) -> bool {
    IDEMPOTENT_METHODS
        .iter()
        .any(|m| m.as_str().eq_ignore_ascii_case(method.as_str()))
}

/// Whether `status` is in the non-retryable set.
pub fn is_non_retryable(status: u16) -> bool {
    NON_RETRYABLE_STATUS_CODES.contains(&status)
}

/// Retry budget of one logical call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of transport invocations, at least 1.
    pub attempts: u32,
    /// Pause between a failed attempt and the next one.
    pub retry_delay: Duration,
    /// Per-attempt deadline; `None` means no cap.
    pub timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 1,
            retry_delay: Duration::ZERO,
            timeout: None,
        }
    }
}

impl RetryPolicy {
    /// Resolve the policy for a call using `method`.
    ///
    /// Non-idempotent methods get a single attempt whatever was requested, and an
    /// attempt count of zero is treated as one. A zero timeout means no deadline.
    pub fn resolve(
        method: &Method,
        attempts: Option<u32>,
        retry_delay: Option<Duration>,
        timeout: Option<Duration>,
    ) -> Self {
        let attempts = if is_idempotent(method) {
            attempts.unwrap_or(1).max(1)
        } else {
            1
        };

        Self {
            attempts,
            retry_delay: retry_delay.unwrap_or(Duration::ZERO),
            timeout: timeout.filter(|t| !t.is_zero()),
        }
    }

    /// Whether the loop ends after `attempt_count` attempts, the last one
    /// settling with `status`.
    pub fn should_stop(&self, status: u16, attempt_count: u32) -> bool {
        (200..300).contains(&status) || is_non_retryable(status) || attempt_count >= self.attempts
    }
}

/// How a single attempt settled.
#[derive(Debug)]
pub enum AttemptOutcome {
    /// 2xx response.
    Success(FetchResponse),
    /// Any other response.
    Failure(FetchResponse),
    /// The attempt's deadline elapsed first.
    TimedOut,
    /// The caller's token fired first.
    Aborted,
    /// The transport failed without a response.
    TransportError(TransportError),
}

impl From<Result<FetchResponse, TransportError>> for AttemptOutcome {
    fn from(result: Result<FetchResponse, TransportError>) -> Self {
        match result {
            Ok(response) if response.ok() => AttemptOutcome::Success(response),
            Ok(response) => AttemptOutcome::Failure(response),
            Err(error) => AttemptOutcome::TransportError(error),
        }
    }
}
