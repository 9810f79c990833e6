//! Attempt loop driving one logical call.

use std::future::pending;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::FetchError;
use crate::request::FetchRequest;
use crate::response::FetchResponse;
use crate::retry::{AttemptOutcome, RetryPolicy};
use crate::transport::Transport;

/// Run attempts until one succeeds, hits a non-retryable status or the budget
/// is spent.
///
/// Returns the last settled response whatever its status; deciding whether a
/// non-2xx response is an error is left to the caller.
pub(crate) async fn execute(
    transport: &dyn Transport,
    request: &FetchRequest,
    policy: &RetryPolicy,
    caller: Option<&CancellationToken>,
) -> Result<FetchResponse, FetchError> {
    let mut attempt_count = 0u32;

    loop {
        tracing::debug!(attempt = attempt_count + 1, max = policy.attempts, "starting attempt");
        let outcome = attempt(transport, request, policy.timeout, caller).await;
        attempt_count += 1;

        let response = match outcome {
            AttemptOutcome::Success(response) => {
                tracing::debug!(status = response.status(), attempt = attempt_count, "attempt succeeded");
                return Ok(response);
            }
            AttemptOutcome::Failure(response) => response,
            AttemptOutcome::TimedOut => {
                tracing::warn!(attempt = attempt_count, timeout = ?policy.timeout, "attempt timed out");
                FetchResponse::timeout().with_url(&request.url)
            }
            AttemptOutcome::Aborted => {
                tracing::debug!(attempt = attempt_count, "request aborted by caller");
                return Err(aborted(request));
            }
            AttemptOutcome::TransportError(source) => {
                tracing::debug!(attempt = attempt_count, error = %source, "transport failed");
                return Err(FetchError::Transport {
                    url: request.url.clone(),
                    source,
                });
            }
        };

        let status = response.status();
        if policy.should_stop(status, attempt_count) {
            tracing::debug!(status, attempt = attempt_count, "giving up");
            return Ok(response);
        }

        tracing::warn!(
            status,
            attempt = attempt_count,
            remaining = policy.attempts - attempt_count,
            delay_ms = policy.retry_delay.as_millis() as u64,
            "retrying request"
        );
        drop(response);
        if !pause(policy.retry_delay, caller).await {
            return Err(aborted(request));
        }
    }
}

/// One transport invocation raced against the deadline and the caller token.
async fn attempt(
    transport: &dyn Transport,
    request: &FetchRequest,
    timeout: Option<Duration>,
    caller: Option<&CancellationToken>,
) -> AttemptOutcome {
    let token = caller.map(CancellationToken::child_token).unwrap_or_default();

    let deadline = async {
        match timeout {
            Some(timeout) => tokio::time::sleep(timeout).await,
            None => pending::<()>().await,
        }
    };

    tokio::select! {
        biased;
        _ = caller_cancelled(caller) => AttemptOutcome::Aborted,
        result = transport.send(request, &token) => AttemptOutcome::from(result),
        _ = deadline => {
            token.cancel();
            AttemptOutcome::TimedOut
        }
    }
}

/// Sleep for `delay`. Returns `false` if the caller cancelled first.
async fn pause(delay: Duration, caller: Option<&CancellationToken>) -> bool {
    tokio::select! {
        biased;
        _ = caller_cancelled(caller) => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

async fn caller_cancelled(caller: Option<&CancellationToken>) {
    match caller {
        Some(token) => token.cancelled().await,
        None => pending::<()>().await,
    }
}

fn aborted(request: &FetchRequest) -> FetchError {
    FetchError::Aborted {
        url: request.url.clone(),
    }
}
