//! Integration tests for the HTTP surface: ping and fallbacks

mod common;

use common::spawn_app;
use serde_json::Value;

#[tokio::test]
async fn ping_works() {
    let app = spawn_app();

    let response = app
        .client
        .get(app.url("/ping"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(200, response.status().as_u16());
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(Some(0), response.content_length());
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let app = spawn_app();

    let response = app
        .client
        .get(app.url("/nowhere"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(404, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "resource not found");
}

#[tokio::test]
async fn unsupported_method_returns_405() {
    let app = spawn_app();

    for path in ["/users", "/tokens", "/checks"] {
        let response = app
            .client
            .request(reqwest::Method::OPTIONS, app.url(path))
            .send()
            .await
            .expect("Failed to execute request");

        assert_eq!(405, response.status().as_u16(), "path {}", path);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["message"], "Method not allowed");
    }
}

#[tokio::test]
async fn malformed_json_body_returns_400() {
    let app = spawn_app();

    let response = app
        .client
        .post(app.url("/users"))
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(400, response.status().as_u16());
}
