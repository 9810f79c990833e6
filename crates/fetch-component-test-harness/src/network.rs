//! HTTP mocking utilities using wiremock.

use serde::Serialize;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// HTTP mock server wrapper with convenience methods
pub struct TestHttpServer {
    server: MockServer,
}

impl TestHttpServer {
    /// Start a new mock server
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Get URL for a specific path
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.server.uri(), path)
    }

    /// Register a GET endpoint that returns JSON
    pub async fn get_json<T: Serialize>(&self, endpoint: &str, response: &T) {
        Mock::given(method("GET"))
            .and(path(endpoint))
            .respond_with(ResponseTemplate::new(200).set_body_json(response))
            .mount(&self.server)
            .await;
    }

    /// Register an endpoint that always answers `status` with a text body
    pub async fn respond(&self, endpoint: &str, status: u16, body: &str) {
        Mock::given(path(endpoint))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&self.server)
            .await;
    }

    /// Register an endpoint with simulated latency
    pub async fn with_latency(&self, endpoint: &str, status: u16, body: &str, latency: Duration) {
        Mock::given(path(endpoint))
            .respond_with(
                ResponseTemplate::new(status)
                    .set_body_string(body)
                    .set_delay(latency),
            )
            .mount(&self.server)
            .await;
    }

    /// Register a sequence of responses, each served once, in order
    pub async fn sequence(&self, endpoint: &str, responses: Vec<ResponseTemplate>) {
        for (i, response) in responses.into_iter().enumerate() {
            Mock::given(path(endpoint))
                .respond_with(response)
                .up_to_n_times(1)
                .with_priority(1 + i as u8)
                .mount(&self.server)
                .await;
        }
    }

    /// Verify that a request was received
    pub async fn verify_received(&self, endpoint: &str, times: u64) {
        let count = self.received_count(endpoint).await;
        assert_eq!(
            count, times,
            "Expected {} requests to {}, got {}",
            times, endpoint, count
        );
    }

    /// Number of requests received for `endpoint`
    pub async fn received_count(&self, endpoint: &str) -> u64 {
        self.received_requests()
            .await
            .iter()
            .filter(|r| r.url.path() == endpoint)
            .count() as u64
    }

    /// Get all received requests
    pub async fn received_requests(&self) -> Vec<Request> {
        self.server.received_requests().await.unwrap_or_default()
    }
}
