//! HTTP request types and per-call options.

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, Version};
use serde::Serialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Common HTTP headers.
pub mod headers {
    pub const CONTENT_TYPE_JSON: &str = "application/json";
}

/// A fully resolved request handed to the transport.
///
/// Built once per logical call and shared by all of its attempts.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    /// Query pairs appended to the URL by the transport.
    pub query: Vec<(String, String)>,
    /// HTTP version requested from the transport.
    pub version: Option<Version>,
}

impl FetchRequest {
    /// A GET request with no headers or body.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::GET,
            headers: HeaderMap::new(),
            body: None,
            query: Vec::new(),
            version: None,
        }
    }
}

/// Options for a single fetch call.
///
/// Every field left unset falls back to the component's default fetcher options.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// HTTP method (GET when unset everywhere).
    pub method: Option<Method>,
    /// Headers; a name set here replaces every default value for that name.
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    /// Deadline applied to each attempt independently.
    pub timeout: Option<Duration>,
    /// Maximum number of attempts, forced to 1 for non-idempotent methods.
    pub attempts: Option<u32>,
    /// Pause between attempts.
    pub retry_delay: Option<Duration>,
    /// Return failed terminal responses instead of raising.
    pub prevent_throwing: Option<bool>,
    /// Caller-owned token that aborts the whole call.
    pub cancellation_token: Option<CancellationToken>,
    pub query: Vec<(String, String)>,
    pub version: Option<Version>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Add a header. Invalid names or values are ignored.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name.as_ref()),
            HeaderValue::try_from(value.as_ref()),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Replace all headers.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `value` as the JSON body and set the content type.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self, serde_json::Error> {
        self.body = Some(Bytes::from(serde_json::to_vec(value)?));
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(headers::CONTENT_TYPE_JSON));
        Ok(self)
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn attempts(mut self, attempts: u32) -> Self {
        self.attempts = Some(attempts);
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }

    pub fn prevent_throwing(mut self, prevent: bool) -> Self {
        self.prevent_throwing = Some(prevent);
        self
    }

    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }

    /// Overlay these options on `defaults`: fields set here win, unset fields
    /// are taken from `defaults`, headers are merged by name.
    pub fn merged_over(self, defaults: &RequestOptions) -> RequestOptions {
        RequestOptions {
            method: self.method.or_else(|| defaults.method.clone()),
            headers: merge_headers(&defaults.headers, &self.headers),
            body: self.body.or_else(|| defaults.body.clone()),
            timeout: self.timeout.or(defaults.timeout),
            attempts: self.attempts.or(defaults.attempts),
            retry_delay: self.retry_delay.or(defaults.retry_delay),
            prevent_throwing: self.prevent_throwing.or(defaults.prevent_throwing),
            cancellation_token: self
                .cancellation_token
                .or_else(|| defaults.cancellation_token.clone()),
            query: if self.query.is_empty() {
                defaults.query.clone()
            } else {
                self.query
            },
            version: self.version.or(defaults.version),
        }
    }
}

/// Merge `overrides` over `base` into a fresh map.
///
/// A name present in `overrides` replaces all of its values in `base`; other
/// entries of `base` are kept. Neither input is modified.
pub fn merge_headers(base: &HeaderMap, overrides: &HeaderMap) -> HeaderMap {
    let mut merged = base.clone();
    for name in overrides.keys() {
        merged.remove(name);
    }
    for (name, value) in overrides {
        merged.append(name.clone(), value.clone());
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct TestData {
        message: String,
        value: i32,
    }

    fn header_map(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_static(*value));
        }
        map
    }

    #[test]
    fn test_merge_headers_override_wins() {
        let base = header_map(&[("x-custom", "default"), ("x-keep", "kept")]);
        let overrides = header_map(&[("x-custom", "override")]);

        let merged = merge_headers(&base, &overrides);

        assert_eq!(merged["x-custom"], "override");
        assert_eq!(merged["x-keep"], "kept");
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_merge_headers_replaces_multi_valued() {
        let base = header_map(&[("accept", "text/plain"), ("accept", "text/html")]);
        let overrides = header_map(&[("accept", "application/json")]);

        let merged = merge_headers(&base, &overrides);
        let values: Vec<_> = merged.get_all("accept").iter().collect();

        assert_eq!(values, vec!["application/json"]);
    }

    #[test]
    fn test_merge_headers_leaves_inputs_untouched() {
        let base = header_map(&[("x-custom", "default")]);
        let overrides = header_map(&[("x-custom", "first")]);

        let _ = merge_headers(&base, &overrides);
        let second = merge_headers(&base, &header_map(&[("x-other", "second")]));

        assert_eq!(base["x-custom"], "default");
        assert_eq!(second["x-custom"], "default");
        assert_eq!(second["x-other"], "second");
    }

    #[test]
    fn test_merged_over_call_site_wins() {
        let defaults = RequestOptions::new()
            .attempts(5)
            .timeout(Duration::from_secs(1))
            .retry_delay(Duration::from_millis(50))
            .header("x-default", "yes");
        let call = RequestOptions::new().attempts(2).header("x-call", "yes");

        let merged = call.merged_over(&defaults);

        assert_eq!(merged.attempts, Some(2));
        assert_eq!(merged.timeout, Some(Duration::from_secs(1)));
        assert_eq!(merged.retry_delay, Some(Duration::from_millis(50)));
        assert!(merged.headers.contains_key("x-default"));
        assert!(merged.headers.contains_key("x-call"));
    }

    #[test]
    fn test_merged_over_query_not_mixed() {
        let defaults = RequestOptions::new().query("page", "1");
        let merged = RequestOptions::new().query("q", "rust").merged_over(&defaults);
        assert_eq!(merged.query, vec![("q".to_string(), "rust".to_string())]);

        let merged = RequestOptions::new().merged_over(&defaults);
        assert_eq!(merged.query, vec![("page".to_string(), "1".to_string())]);
    }

    #[test]
    fn test_json_body() {
        let options = RequestOptions::new()
            .json(&TestData {
                message: "hello".to_string(),
                value: 42,
            })
            .unwrap();

        let body = options.body.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["message"], "hello");
        assert_eq!(parsed["value"], 42);
        assert_eq!(options.headers[CONTENT_TYPE], headers::CONTENT_TYPE_JSON);
    }

    #[test]
    fn test_invalid_header_ignored() {
        let options = RequestOptions::new().header("bad header", "value");
        assert!(options.headers.is_empty());
    }

    #[test]
    fn test_fetch_request_get() {
        let request = FetchRequest::get("https://example.com");
        assert_eq!(request.method, Method::GET);
        assert!(request.body.is_none());
        assert!(request.headers.is_empty());
    }
}
