//! HTTP fetch component.
//!
//! A [`FetchComponent`] issues one logical HTTP call per [`FetchComponent::fetch`]
//! invocation and drives it through up to `attempts` physical attempts against a
//! [`Transport`]. Each attempt may be capped by a deadline, the caller may abort the
//! whole call through a [`CancellationToken`], and non-2xx terminal responses are either
//! raised as [`FetchError::Status`] or handed back when `prevent_throwing` is set.
//!
//! ```no_run
//! use fetch_component::{create_fetch_component, RequestOptions};
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), fetch_component::FetchError> {
//! let fetcher = create_fetch_component(None)?;
//! let response = fetcher
//!     .fetch(
//!         "https://example.com/health",
//!         RequestOptions::new()
//!             .attempts(3)
//!             .retry_delay(Duration::from_millis(100))
//!             .timeout(Duration::from_secs(2)),
//!     )
//!     .await?;
//! println!("{}", response.status());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod component;
pub mod config;
pub mod error;
pub mod request;
pub mod response;
pub mod retry;
pub mod transport;

mod orchestrator;

pub use client::{build_client, HttpConfig, ReqwestTransport};
pub use component::{create_fetch_component, ComponentOptions, FetchComponent};
pub use config::{ConfigError, FetchConfig};
pub use error::{FetchError, TransportError};
pub use request::{headers, merge_headers, FetchRequest, RequestOptions};
pub use response::{FetchResponse, ResponseBody, ResponseError};
pub use retry::{AttemptOutcome, RetryPolicy, IDEMPOTENT_METHODS, NON_RETRYABLE_STATUS_CODES};
pub use transport::Transport;

pub use reqwest::{header::HeaderMap, Method, StatusCode, Version};
pub use tokio_util::sync::CancellationToken;
