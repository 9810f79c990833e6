//! HTTP response types.

use bytes::{Bytes, BytesMut};
use futures_util::stream::{self, BoxStream, StreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::fmt;

use crate::error::TransportError;

/// Body of a [`FetchResponse`].
///
/// The transport picks the representation when it builds the response; both forms
/// can be materialized through [`FetchResponse::bytes`].
pub enum ResponseBody {
    /// Body already held in memory.
    Buffered(Bytes),
    /// Body still being read from the connection.
    Streaming(BoxStream<'static, Result<Bytes, TransportError>>),
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseBody::Buffered(bytes) => f.debug_tuple("Buffered").field(&bytes.len()).finish(),
            ResponseBody::Streaming(_) => f.write_str("Streaming"),
        }
    }
}

/// A settled HTTP response.
#[derive(Debug)]
pub struct FetchResponse {
    status: StatusCode,
    status_text: String,
    headers: HeaderMap,
    url: String,
    body: ResponseBody,
}

impl FetchResponse {
    /// Create a response with a buffered body.
    ///
    /// The status text defaults to the canonical reason phrase.
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers: HeaderMap::new(),
            url: String::new(),
            body: ResponseBody::Buffered(body.into()),
        }
    }

    /// Create a response whose body is read lazily from `stream`.
    pub fn streaming(
        status: StatusCode,
        headers: HeaderMap,
        stream: BoxStream<'static, Result<Bytes, TransportError>>,
    ) -> Self {
        Self {
            status,
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            url: String::new(),
            body: ResponseBody::Streaming(stream),
        }
    }

    /// The response synthesized when an attempt's deadline elapses.
    pub fn timeout() -> Self {
        Self::new(StatusCode::REQUEST_TIMEOUT, "timeout").with_status_text("Request Timeout")
    }

    /// Override the status text.
    pub fn with_status_text(mut self, text: impl Into<String>) -> Self {
        self.status_text = text.into();
        self
    }

    /// Add a header. Invalid names or values are ignored.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name.as_ref()),
            HeaderValue::try_from(value.as_ref()),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Set the URL the response was served from.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn status(&self) -> u16 {
        self.status.as_u16()
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    /// Whether the status is in the 2xx range.
    pub fn ok(&self) -> bool {
        self.status.is_success()
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Whether the body is already held in memory.
    pub fn is_buffered(&self) -> bool {
        matches!(self.body, ResponseBody::Buffered(_))
    }

    /// Materialize the whole body.
    pub async fn bytes(self) -> Result<Bytes, TransportError> {
        match self.body {
            ResponseBody::Buffered(bytes) => Ok(bytes),
            ResponseBody::Streaming(mut stream) => {
                let mut buffer = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    buffer.extend_from_slice(&chunk?);
                }
                Ok(buffer.freeze())
            }
        }
    }

    /// Read the body as text, replacing invalid UTF-8.
    pub async fn text(self) -> Result<String, TransportError> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Parse the body as JSON.
    pub async fn json<T: DeserializeOwned>(self) -> Result<T, ResponseError> {
        let status = self.status();
        let bytes = self.bytes().await.map_err(ResponseError::Read)?;

        serde_json::from_slice(&bytes).map_err(|e| ResponseError::Parse {
            status,
            body: String::from_utf8_lossy(&bytes).to_string(),
            source: e,
        })
    }

    /// Raw byte stream of the body.
    pub fn bytes_stream(self) -> BoxStream<'static, Result<Bytes, TransportError>> {
        match self.body {
            ResponseBody::Buffered(bytes) => stream::once(async move { Ok(bytes) }).boxed(),
            ResponseBody::Streaming(stream) => stream,
        }
    }

    pub(crate) fn from_reqwest(response: reqwest::Response) -> Self {
        let status = response.status();
        let headers = response.headers().clone();
        let url = response.url().to_string();
        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(TransportError::from))
            .boxed();

        Self::streaming(status, headers, stream).with_url(url)
    }
}

/// Response parsing errors.
#[derive(Debug, thiserror::Error)]
pub enum ResponseError {
    #[error("failed to read response body: {0}")]
    Read(#[source] TransportError),

    #[error("failed to parse JSON (status {status}): {source}")]
    Parse {
        status: u16,
        body: String,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Mock {
        mock: String,
    }

    #[test]
    fn test_timeout_response() {
        let response = FetchResponse::timeout();
        assert_eq!(response.status(), 408);
        assert_eq!(response.status_text(), "Request Timeout");
        assert!(!response.ok());
        assert!(response.is_buffered());
    }

    #[test]
    fn test_default_status_text() {
        let response = FetchResponse::new(StatusCode::SERVICE_UNAVAILABLE, "");
        assert_eq!(response.status_text(), "Service Unavailable");
    }

    #[tokio::test]
    async fn test_timeout_body_text() {
        let text = FetchResponse::timeout().text().await.unwrap();
        assert_eq!(text, "timeout");
    }

    #[tokio::test]
    async fn test_json_body() {
        let response = FetchResponse::new(StatusCode::OK, r#"{"mock":"successful"}"#);
        let parsed: Mock = response.json().await.unwrap();
        assert_eq!(parsed, Mock { mock: "successful".to_string() });
    }

    #[tokio::test]
    async fn test_json_parse_error() {
        let response = FetchResponse::new(StatusCode::BAD_GATEWAY, "not json");
        let error = response.json::<Mock>().await.unwrap_err();

        let message = error.to_string();
        assert!(message.contains("failed to parse JSON"));
        assert!(message.contains("status 502"));
    }

    #[tokio::test]
    async fn test_streaming_body_is_buffered_on_demand() {
        let chunks = vec![Ok(Bytes::from_static(b"hello ")), Ok(Bytes::from_static(b"world"))];
        let response = FetchResponse::streaming(
            StatusCode::OK,
            HeaderMap::new(),
            stream::iter(chunks).boxed(),
        );

        assert!(!response.is_buffered());
        assert_eq!(response.bytes().await.unwrap(), Bytes::from_static(b"hello world"));
    }

    #[tokio::test]
    async fn test_streaming_body_error() {
        let chunks = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(TransportError::Connection("reset by peer".to_string())),
        ];
        let response = FetchResponse::streaming(
            StatusCode::OK,
            HeaderMap::new(),
            stream::iter(chunks).boxed(),
        );

        assert!(response.text().await.is_err());
    }

    #[tokio::test]
    async fn test_bytes_stream_from_buffered() {
        let response = FetchResponse::new(StatusCode::OK, "abc");
        let chunks: Vec<_> = response.bytes_stream().collect().await;
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_ref().unwrap(), &Bytes::from_static(b"abc"));
    }

    #[test]
    fn test_with_header_ignores_invalid() {
        let response = FetchResponse::new(StatusCode::OK, "")
            .with_header("Content-Type", "application/json")
            .with_header("bad header", "value");

        assert_eq!(response.headers().len(), 1);
        assert_eq!(response.headers()["content-type"], "application/json");
    }
}
