mod common;

use chrono::Duration;
use common::{auth_settings, error_code, spawn_app, spawn_app_with, PASSWORD};
use serde_json::{json, Value};

#[tokio::test]
async fn login_returns_bearer_token() {
    let app = spawn_app();
    app.create_user("5551234567").await;

    let response = app.login("5551234567", PASSWORD).await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 3600);
    assert_eq!(body["token"].as_str().unwrap().split('.').count(), 3);
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let app = spawn_app();
    app.create_user("5551234567").await;

    let wrong_password = app.login("5551234567", "WrongPass999").await;
    let unknown_phone = app.login("5559999999", PASSWORD).await;

    assert_eq!(400, wrong_password.status().as_u16());
    assert_eq!(400, unknown_phone.status().as_u16());
    assert_eq!("INVALID_CREDENTIALS", error_code(wrong_password).await);
    assert_eq!("INVALID_CREDENTIALS", error_code(unknown_phone).await);
}

#[tokio::test]
async fn revoked_token_is_rejected() {
    let app = spawn_app();
    let token = app.signed_in("5551234567").await;

    let response = app
        .client
        .delete(app.url("/tokens"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(200, response.status().as_u16());

    let response = app.get_with("/users", &token).await;
    assert_eq!(401, response.status().as_u16());
    assert_eq!("TOKEN_REVOKED", error_code(response).await);

    // Revoking again is not an error
    let response = app
        .client
        .delete(app.url("/tokens"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn new_login_after_revocation_works() {
    let app = spawn_app();
    let token = app.signed_in("5551234567").await;

    app.client
        .delete(app.url("/tokens"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request");

    let body: Value = app.login("5551234567", PASSWORD).await.json().await.unwrap();
    let fresh = body["token"].as_str().unwrap();

    assert_ne!(fresh, token);
    assert_eq!(200, app.get_with("/users", fresh).await.status().as_u16());
}

#[tokio::test]
async fn revoke_requires_decodable_bearer_token() {
    let app = spawn_app();

    let response = app
        .client
        .delete(app.url("/tokens"))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(401, response.status().as_u16());
    assert_eq!("MISSING_TOKEN", error_code(response).await);

    let response = app
        .client
        .delete(app.url("/tokens"))
        .bearer_auth("garbage")
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(401, response.status().as_u16());
    assert_eq!("TOKEN_MALFORMED", error_code(response).await);
}

#[tokio::test]
async fn swapped_signature_is_rejected() {
    let app = spawn_app();
    let first = app.signed_in("5551234567").await;
    let body: Value = app.login("5551234567", PASSWORD).await.json().await.unwrap();
    let second = body["token"].as_str().unwrap();

    let (signing_input, _) = first.rsplit_once('.').unwrap();
    let (_, other_signature) = second.rsplit_once('.').unwrap();
    let forged = format!("{}.{}", signing_input, other_signature);

    let response = app.get_with("/users", &forged).await;
    assert_eq!(401, response.status().as_u16());
    assert_eq!("TOKEN_INVALID", error_code(response).await);
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let app = spawn_app();
    let token = app.signed_in("5551234567").await;

    app.clock.advance(Duration::seconds(3599));
    assert_eq!(200, app.get_with("/users", &token).await.status().as_u16());

    app.clock.advance(Duration::seconds(1));
    let response = app.get_with("/users", &token).await;
    assert_eq!(401, response.status().as_u16());
    assert_eq!("TOKEN_EXPIRED", error_code(response).await);
}

#[tokio::test]
async fn extend_issues_new_token_and_keeps_old_one() {
    let app = spawn_app();
    let token = app.signed_in("5551234567").await;

    let response = app
        .client
        .put(app.url("/tokens"))
        .json(&json!({ "token": token, "extend": true }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    let refreshed = body["token"].as_str().unwrap();
    assert_ne!(refreshed, token);

    assert_eq!(200, app.get_with("/users", refreshed).await.status().as_u16());
    assert_eq!(200, app.get_with("/users", &token).await.status().as_u16());
}

#[tokio::test]
async fn extend_revokes_source_when_configured() {
    let mut settings = auth_settings();
    settings.refresh_revokes_source = true;
    let app = spawn_app_with(settings);
    let token = app.signed_in("5551234567").await;

    let body: Value = app
        .client
        .put(app.url("/tokens"))
        .json(&json!({ "token": token, "extend": true }))
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .unwrap();
    let refreshed = body["token"].as_str().unwrap();

    assert_eq!(200, app.get_with("/users", refreshed).await.status().as_u16());
    let response = app.get_with("/users", &token).await;
    assert_eq!("TOKEN_REVOKED", error_code(response).await);
}

#[tokio::test]
async fn extend_rejects_bad_requests() {
    let app = spawn_app();
    let token = app.signed_in("5551234567").await;

    let response = app
        .client
        .put(app.url("/tokens"))
        .json(&json!({ "token": token, "extend": false }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(400, response.status().as_u16());

    let response = app
        .client
        .put(app.url("/tokens"))
        .json(&json!({ "token": token }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(400, response.status().as_u16());

    let response = app
        .client
        .put(app.url("/tokens"))
        .json(&json!({ "token": "a.b.c", "extend": true }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(401, response.status().as_u16());

    app.clock.advance(Duration::hours(2));
    let response = app
        .client
        .put(app.url("/tokens"))
        .json(&json!({ "token": token, "extend": true }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(401, response.status().as_u16());
    assert_eq!("TOKEN_EXPIRED", error_code(response).await);
}
