//! Scripted transport for deterministic tests.

use async_trait::async_trait;
use bytes::Bytes;
use fetch_component::{FetchRequest, FetchResponse, StatusCode, Transport, TransportError};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// One scripted transport reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Respond after an optional delay.
    Respond {
        status: u16,
        status_text: Option<String>,
        headers: Vec<(String, String)>,
        body: Bytes,
        delay: Option<Duration>,
    },
    /// Fail as if the connection could not be made.
    NetworkError(String),
    /// Never respond; only cancellation ends the call.
    Hang,
}

impl MockReply {
    /// Respond with `status` and a text body.
    pub fn status(status: u16, body: impl Into<Bytes>) -> Self {
        MockReply::Respond {
            status,
            status_text: None,
            headers: Vec::new(),
            body: body.into(),
            delay: None,
        }
    }

    /// Respond with `status` and `value` serialized as JSON.
    pub fn json<T: Serialize>(status: u16, value: &T) -> Self {
        let body = serde_json::to_vec(value).unwrap_or_default();
        Self::status(status, body).with_header("content-type", "application/json")
    }

    pub fn network_error(message: impl Into<String>) -> Self {
        MockReply::NetworkError(message.into())
    }

    pub fn hang() -> Self {
        MockReply::Hang
    }

    pub fn with_status_text(mut self, text: impl Into<String>) -> Self {
        if let MockReply::Respond { status_text, .. } = &mut self {
            *status_text = Some(text.into());
        }
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let MockReply::Respond { headers, .. } = &mut self {
            headers.push((name.into(), value.into()));
        }
        self
    }

    /// Delay the response; cancellation during the delay wins.
    pub fn with_delay(mut self, latency: Duration) -> Self {
        if let MockReply::Respond { delay, .. } = &mut self {
            *delay = Some(latency);
        }
        self
    }
}

#[derive(Default)]
struct State {
    queue: VecDeque<MockReply>,
    fallback: Option<MockReply>,
    requests: Vec<FetchRequest>,
    tokens: Vec<CancellationToken>,
    cancelled: usize,
}

/// Transport that replays scripted replies and records every call.
///
/// Queued replies are used first, in order; after that the fallback set with
/// [`MockTransport::always`] is repeated. Clones share state, so a clone can be
/// handed to the component while the test keeps one for assertions.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<State>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `reply` for the next unanswered call.
    pub fn then(self, reply: MockReply) -> Self {
        self.state.lock().queue.push_back(reply);
        self
    }

    /// Use `reply` once the queue is empty.
    pub fn always(self, reply: MockReply) -> Self {
        self.state.lock().fallback = Some(reply);
        self
    }

    /// Number of transport invocations so far.
    pub fn call_count(&self) -> usize {
        self.state.lock().requests.len()
    }

    /// Requests received, in order.
    pub fn requests(&self) -> Vec<FetchRequest> {
        self.state.lock().requests.clone()
    }

    /// Cancellation tokens handed to each invocation, in order.
    pub fn tokens(&self) -> Vec<CancellationToken> {
        self.state.lock().tokens.clone()
    }

    /// Number of invocations that observed their token firing.
    pub fn cancelled_count(&self) -> usize {
        self.state.lock().cancelled
    }

    fn next_reply(&self, request: &FetchRequest, cancel: &CancellationToken) -> Option<MockReply> {
        let mut state = self.state.lock();
        state.requests.push(request.clone());
        state.tokens.push(cancel.clone());
        state.queue.pop_front().or_else(|| state.fallback.clone())
    }

    fn mark_cancelled(&self) -> TransportError {
        self.state.lock().cancelled += 1;
        TransportError::Cancelled
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(
        &self,
        request: &FetchRequest,
        cancel: &CancellationToken,
    ) -> Result<FetchResponse, TransportError> {
        let reply = self.next_reply(request, cancel).ok_or_else(|| {
            TransportError::Connection(format!("no scripted reply for {}", request.url))
        })?;

        match reply {
            MockReply::Respond {
                status,
                status_text,
                headers,
                body,
                delay,
            } => {
                if let Some(delay) = delay {
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(self.mark_cancelled()),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }

                let status = StatusCode::from_u16(status)
                    .map_err(|e| TransportError::Connection(e.to_string()))?;
                let mut response = FetchResponse::new(status, body).with_url(&request.url);
                if let Some(text) = status_text {
                    response = response.with_status_text(text);
                }
                for (name, value) in headers {
                    response = response.with_header(name, value);
                }
                Ok(response)
            }
            MockReply::NetworkError(message) => Err(TransportError::Connection(message)),
            MockReply::Hang => {
                cancel.cancelled().await;
                Err(self.mark_cancelled())
            }
        }
    }
}
