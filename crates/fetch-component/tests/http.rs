use fetch_component::{
    create_fetch_component, ComponentOptions, FetchComponent, FetchConfig, HeaderMap, Method,
    RequestOptions,
};
use fetch_component_test_harness::{init, TestHttpServer};
use std::time::Duration;
use wiremock::ResponseTemplate;

fn fetcher() -> FetchComponent {
    init();
    create_fetch_component(None).expect("Failed to create component")
}

#[tokio::test]
async fn test_get_json_over_http() {
    let server = TestHttpServer::start().await;
    server
        .get_json("/mock", &serde_json::json!({ "mock": "successful" }))
        .await;

    let response = fetcher().get(server.url_for("/mock")).await.unwrap();

    assert_eq!(response.status(), 200);
    assert!(!response.is_buffered());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["mock"], "successful");
    server.verify_received("/mock", 1).await;
}

#[tokio::test]
async fn test_retries_until_success_over_http() {
    let server = TestHttpServer::start().await;
    server
        .sequence(
            "/flaky",
            vec![
                ResponseTemplate::new(503).set_body_string("unavailable"),
                ResponseTemplate::new(503).set_body_string("unavailable"),
                ResponseTemplate::new(200).set_body_string("recovered"),
            ],
        )
        .await;

    let response = fetcher()
        .fetch(
            server.url_for("/flaky"),
            RequestOptions::new()
                .attempts(3)
                .retry_delay(Duration::from_millis(10)),
        )
        .await
        .unwrap();

    assert_eq!(response.text().await.unwrap(), "recovered");
    server.verify_received("/flaky", 3).await;
}

#[tokio::test]
async fn test_not_found_not_retried_over_http() {
    let server = TestHttpServer::start().await;
    server.respond("/missing", 404, "no such thing").await;

    let error = fetcher()
        .fetch(server.url_for("/missing"), RequestOptions::new().attempts(3))
        .await
        .unwrap_err();

    let message = error.to_string();
    assert!(message.contains("404"));
    assert!(message.contains("no such thing"));
    assert!(message.contains("/missing"));
    server.verify_received("/missing", 1).await;
}

#[tokio::test]
async fn test_timeout_over_http() {
    let server = TestHttpServer::start().await;
    server
        .with_latency("/slow", 200, "late", Duration::from_secs(2))
        .await;

    let error = fetcher()
        .fetch(
            server.url_for("/slow"),
            RequestOptions::new().timeout(Duration::from_millis(200)),
        )
        .await
        .unwrap_err();

    assert_eq!(error.status(), Some(408));
    assert!(error.to_string().contains("response was 'timeout'"));
}

#[tokio::test]
async fn test_post_body_not_retried_over_http() {
    let server = TestHttpServer::start().await;
    server.respond("/submit", 503, "try later").await;

    let error = fetcher()
        .fetch(
            server.url_for("/submit"),
            RequestOptions::new()
                .method(Method::POST)
                .attempts(3)
                .json(&serde_json::json!({ "name": "test" }))
                .unwrap(),
        )
        .await
        .unwrap_err();

    assert_eq!(error.status(), Some(503));
    let requests = server.received_requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method.as_str(), "POST");
    let sent: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(sent["name"], "test");
}

#[tokio::test]
async fn test_default_headers_and_query_over_http() {
    init();
    let server = TestHttpServer::start().await;
    server.respond("/headers", 200, "ok").await;

    let mut headers = HeaderMap::new();
    headers.insert("x-custom", "Test".parse().unwrap());
    headers.insert("x-override", "default".parse().unwrap());
    let sut = FetchComponent::new(ComponentOptions::new().default_headers(headers)).unwrap();

    sut.fetch(
        server.url_for("/headers"),
        RequestOptions::new()
            .header("x-override", "call")
            .query("page", "2"),
    )
    .await
    .unwrap();

    let requests = server.received_requests().await;
    let request = &requests[0];
    assert_eq!(request.headers.get("x-custom").unwrap(), "Test");
    assert_eq!(request.headers.get("x-override").unwrap(), "call");
    assert_eq!(request.url.query(), Some("page=2"));
}

#[tokio::test]
async fn test_buffer_response_over_http() {
    let server = TestHttpServer::start().await;
    server.respond("/bytes", 200, "raw payload").await;

    let bytes = fetcher()
        .get(server.url_for("/bytes"))
        .await
        .unwrap()
        .bytes()
        .await
        .unwrap();

    assert_eq!(&bytes[..], b"raw payload");
}

#[tokio::test]
async fn test_component_from_config_over_http() {
    init();
    let server = TestHttpServer::start().await;
    server.respond("/configured", 500, "broken").await;

    let config = FetchConfig::from_yaml_str(
        "attempts: 2\nretry_delay_ms: 5\nprevent_throwing: true\ndefault_headers:\n  x-source: yaml\n",
    )
    .unwrap();
    let sut = FetchComponent::new(config.into_component_options().unwrap()).unwrap();

    let response = sut.get(server.url_for("/configured")).await.unwrap();

    assert_eq!(response.status(), 500);
    server.verify_received("/configured", 2).await;
    let requests = server.received_requests().await;
    assert_eq!(requests[0].headers.get("x-source").unwrap(), "yaml");
}

#[tokio::test]
async fn test_connection_refused_surfaces_transport_error() {
    // Port 9 (discard) is not expected to accept connections on test hosts.
    let error = fetcher()
        .fetch("http://127.0.0.1:9/", RequestOptions::new().attempts(3))
        .await
        .unwrap_err();

    assert!(matches!(error, fetch_component::FetchError::Transport { .. }));
}
