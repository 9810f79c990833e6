//! The fetch component: option resolution and post-loop handling.

use reqwest::header::HeaderMap;
use reqwest::Method;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::client::{HttpConfig, ReqwestTransport};
use crate::error::FetchError;
use crate::orchestrator;
use crate::request::{merge_headers, FetchRequest, RequestOptions};
use crate::response::FetchResponse;
use crate::retry::RetryPolicy;
use crate::transport::Transport;

/// Component-level defaults, fixed at construction.
#[derive(Debug, Clone, Default)]
pub struct ComponentOptions {
    /// Headers sent with every call.
    pub default_headers: HeaderMap,
    /// Options every call starts from. Their headers override `default_headers`.
    pub default_fetcher_options: RequestOptions,
    /// Return failed terminal responses instead of raising, unless a call says otherwise.
    pub prevent_throwing: bool,
    /// Client settings for the default reqwest transport.
    pub http: HttpConfig,
}

impl ComponentOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers = headers;
        self
    }

    pub fn default_fetcher_options(mut self, options: RequestOptions) -> Self {
        self.default_fetcher_options = options;
        self
    }

    pub fn prevent_throwing(mut self, prevent: bool) -> Self {
        self.prevent_throwing = prevent;
        self
    }

    pub fn http(mut self, http: HttpConfig) -> Self {
        self.http = http;
        self
    }
}

#[derive(Debug)]
struct Defaults {
    options: RequestOptions,
    prevent_throwing: bool,
}

/// Everything one logical call needs, derived fresh from the defaults.
struct ResolvedCall {
    request: FetchRequest,
    policy: RetryPolicy,
    prevent_throwing: bool,
    cancellation: Option<CancellationToken>,
}

/// Issues logical HTTP calls with retries and per-attempt timeouts.
///
/// Cloning is cheap; clones share the same read-only defaults and transport.
#[derive(Clone)]
pub struct FetchComponent {
    defaults: Arc<Defaults>,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for FetchComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchComponent")
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

impl FetchComponent {
    /// Create a component backed by a [`ReqwestTransport`].
    pub fn new(options: ComponentOptions) -> Result<Self, FetchError> {
        let transport = ReqwestTransport::new(&options.http)?;
        Ok(Self::with_transport(options, transport))
    }

    /// Create a component backed by `transport`.
    pub fn with_transport(options: ComponentOptions, transport: impl Transport + 'static) -> Self {
        let ComponentOptions {
            default_headers,
            mut default_fetcher_options,
            prevent_throwing,
            http: _,
        } = options;

        default_fetcher_options.headers =
            merge_headers(&default_headers, &default_fetcher_options.headers);

        Self {
            defaults: Arc::new(Defaults {
                options: default_fetcher_options,
                prevent_throwing,
            }),
            transport: Arc::new(transport),
        }
    }

    /// Headers sent with every call before call-site overrides.
    pub fn default_headers(&self) -> &HeaderMap {
        &self.defaults.options.headers
    }

    /// Issue one logical call to `url`.
    ///
    /// Resolves to the final response when it is 2xx or when `prevent_throwing`
    /// applies; otherwise to [`FetchError::Status`] carrying the last status and
    /// body text.
    pub async fn fetch(
        &self,
        url: impl Into<String>,
        options: RequestOptions,
    ) -> Result<FetchResponse, FetchError> {
        let call = self.resolve(url.into(), options);
        let span = tracing::info_span!(
            "fetch",
            url = %call.request.url,
            method = %call.request.method,
            attempts = call.policy.attempts,
        );

        self.run(call).instrument(span).await
    }

    /// GET `url` with the default options.
    pub async fn get(&self, url: impl Into<String>) -> Result<FetchResponse, FetchError> {
        self.fetch(url, RequestOptions::new()).await
    }

    /// POST `body` as JSON to `url`. Never retried.
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: impl Into<String>,
        body: &T,
    ) -> Result<FetchResponse, FetchError> {
        let options = RequestOptions::new().method(Method::POST).json(body)?;
        self.fetch(url, options).await
    }

    fn resolve(&self, url: String, options: RequestOptions) -> ResolvedCall {
        let defaults = &self.defaults;
        let options = options.merged_over(&defaults.options);
        let method = options.method.unwrap_or(Method::GET);
        let policy = RetryPolicy::resolve(&method, options.attempts, options.retry_delay, options.timeout);

        ResolvedCall {
            request: FetchRequest {
                url,
                method,
                headers: options.headers,
                body: options.body,
                query: options.query,
                version: options.version,
            },
            policy,
            prevent_throwing: options.prevent_throwing.unwrap_or(defaults.prevent_throwing),
            cancellation: options.cancellation_token,
        }
    }

    async fn run(&self, call: ResolvedCall) -> Result<FetchResponse, FetchError> {
        let ResolvedCall {
            request,
            policy,
            prevent_throwing,
            cancellation,
        } = call;

        let response = orchestrator::execute(
            self.transport.as_ref(),
            &request,
            &policy,
            cancellation.as_ref(),
        )
        .await?;

        if response.ok() || prevent_throwing {
            return Ok(response);
        }

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(error) => {
                tracing::warn!(status, error = %error, "failed to read body of failed response");
                String::new()
            }
        };
        tracing::debug!(status, "request failed");

        Err(FetchError::Status {
            url: request.url,
            status,
            body,
        })
    }
}

/// Create a fetch component, with default options when `options` is `None`.
pub fn create_fetch_component(options: Option<ComponentOptions>) -> Result<FetchComponent, FetchError> {
    FetchComponent::new(options.unwrap_or_default())
}
