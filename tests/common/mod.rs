//! Shared harness: an in-memory server on a random port with a manual clock.

#![allow(dead_code)]

use chrono::Utc;
use serde_json::{json, Value};
use std::net::TcpListener;
use std::sync::Arc;

use uptime_monitor::auth::{
    Algorithm, CredentialHasher, ManualClock, StorageFailurePolicy, TokenAuthority,
};
use uptime_monitor::configuration::{AuthSettings, DEVELOPMENT_HASHING_SECRET};
use uptime_monitor::startup::run;
use uptime_monitor::store::{DocumentStore, MemoryStore};

pub const PASSWORD: &str = "SecurePass123";

pub struct TestApp {
    pub address: String,
    pub clock: Arc<ManualClock>,
    pub store: Arc<MemoryStore>,
    pub client: reqwest::Client,
}

pub fn auth_settings() -> AuthSettings {
    AuthSettings {
        hashing_secret: DEVELOPMENT_HASHING_SECRET.to_string(),
        token_ttl_seconds: 3600,
        algorithm: Algorithm::HS256,
        refresh_revokes_source: false,
        revocation_check_failure: StorageFailurePolicy::FailClosed,
        revocation_purge_interval_seconds: 600,
    }
}

pub fn spawn_app() -> TestApp {
    spawn_app_with(auth_settings())
}

pub fn spawn_app_with(settings: AuthSettings) -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let hasher = CredentialHasher::new(&settings.hashing_secret);
    let shared: Arc<dyn DocumentStore> = store.clone();
    let authority = TokenAuthority::new(settings, shared.clone(), clock.clone());

    let server = run(listener, shared, authority, hasher).expect("Failed to create server");
    let _ = tokio::spawn(server);

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        clock,
        store,
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn create_user(&self, phone: &str) -> reqwest::Response {
        self.client
            .post(self.url("/users"))
            .json(&json!({
                "firstName": "Ada",
                "lastName": "Lovelace",
                "phone": phone,
                "password": PASSWORD,
                "tosAgreement": true
            }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn login(&self, phone: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/tokens"))
            .json(&json!({ "phone": phone, "password": password }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Register a user and return a token for them.
    pub async fn signed_in(&self, phone: &str) -> String {
        assert_eq!(self.create_user(phone).await.status().as_u16(), 201);
        let body: Value = self.login(phone, PASSWORD).await.json().await.unwrap();
        body["token"].as_str().expect("token in login response").to_string()
    }

    pub async fn get_with(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request")
    }
}

/// The `code` field of an error body.
pub async fn error_code(response: reqwest::Response) -> String {
    let body: Value = response.json().await.expect("Failed to parse error body");
    body["code"].as_str().unwrap_or_default().to_string()
}
