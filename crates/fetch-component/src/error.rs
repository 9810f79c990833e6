//! Error types.

/// Errors raised by a logical fetch call.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The final response was not successful and `prevent_throwing` was not set.
    #[error("failed to fetch {url}: got status {status}, response was '{body}'")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    /// The caller cancelled the call before an attempt settled.
    #[error("request to {url} was aborted")]
    Aborted { url: String },

    /// The transport failed without producing a response. Never retried.
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: TransportError,
    },

    #[error("failed to serialize request body: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

impl FetchError {
    /// Final HTTP status, if the error came from a settled response.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the call was aborted by the caller.
    pub fn is_aborted(&self) -> bool {
        matches!(self, FetchError::Aborted { .. })
    }
}

/// Errors produced at the transport boundary.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("transport timed out")]
    Timeout,

    #[error("request cancelled")]
    Cancelled,

    #[error("connection failed: {0}")]
    Connection(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Request(e)
        }
    }
}
