//! reqwest-backed transport and its client configuration.

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::{FetchError, TransportError};
use crate::request::FetchRequest;
use crate::response::FetchResponse;
use crate::transport::Transport;

/// HTTP client configuration.
///
/// No overall request timeout is set on the client; deadlines are applied per
/// attempt by [`crate::FetchComponent`].
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// User agent string.
    pub user_agent: String,
    /// Maximum idle connections per host.
    pub pool_max_idle_per_host: usize,
    /// Enable gzip decompression.
    pub gzip: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("fetch-component/{}", env!("CARGO_PKG_VERSION")),
            pool_max_idle_per_host: 10,
            gzip: true,
        }
    }
}

/// Build a configured HTTP client.
pub fn build_client(config: &HttpConfig) -> Result<Client, FetchError> {
    let mut builder = ClientBuilder::new()
        .connect_timeout(config.connect_timeout)
        .user_agent(&config.user_agent)
        .pool_max_idle_per_host(config.pool_max_idle_per_host);

    if config.gzip {
        builder = builder.gzip(true);
    }

    builder.build().map_err(FetchError::ClientBuild)
}

/// [`Transport`] over a shared [`reqwest::Client`].
///
/// Response bodies are left on the connection and streamed on demand.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    inner: Client,
}

impl ReqwestTransport {
    /// Create a transport with a freshly built client.
    pub fn new(config: &HttpConfig) -> Result<Self, FetchError> {
        Ok(Self {
            inner: build_client(config)?,
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(
        &self,
        request: &FetchRequest,
        cancel: &CancellationToken,
    ) -> Result<FetchResponse, TransportError> {
        let mut builder = self
            .inner
            .request(request.method.clone(), &request.url)
            .headers(request.headers.clone());

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(version) = request.version {
            builder = builder.version(version);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        tracing::debug!(method = %request.method, url = %request.url, "sending request");

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TransportError::Cancelled),
            result = builder.send() => result.map_err(TransportError::from)?,
        };

        tracing::debug!(status = response.status().as_u16(), url = %request.url, "received response");
        Ok(FetchResponse::from_reqwest(response))
    }
}
