//! Common test utilities for integration tests
//!
//! This module provides shared infrastructure for integration tests:
//! - A router over an in-memory store (no database needed)
//! - A mailer that records instead of sending
//! - Request helpers and user/session setup

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower::Service as _;
use webring_api::app::{build_router, AppState};
use webring_api::config::{ApiConfig, AuthConfig, Config, MailConfig};
use webring_shared::db::pool::DatabaseConfig;
use webring_shared::mail::{MailError, Mailer};
use webring_shared::models::user::User;
use webring_shared::store::MemoryStore;

pub const PASSWORD: &str = "Str0ngPass!";

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<String>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_registration_email(&self, user: &User) -> Result<(), MailError> {
        self.sent.lock().await.push(user.email.clone());
        Ok(())
    }
}

/// Test context containing all necessary resources
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
    pub app: axum::Router,
    pub config: Config,
}

/// A registered user with an open session
pub struct TestUser {
    pub id: String,
    pub username: String,
    pub token: String,
}

impl TestUser {
    /// Returns authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl TestContext {
    pub fn new() -> Self {
        let config = Config {
            api: ApiConfig::default(),
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            mail: MailConfig::default(),
        };

        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(RecordingMailer::default());
        let state = AppState::new(store.clone(), mailer.clone(), config.clone());
        let app = build_router(state);

        Self {
            store,
            mailer,
            app,
            config,
        }
    }

    /// Sends a request and returns the status and raw body
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        auth: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(auth) = auth {
            builder = builder.header("authorization", auth);
        }

        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().call(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        (status, body.to_vec())
    }

    /// Like `send`, parsing the body as JSON (`Null` when empty)
    pub async fn send_json(
        &self,
        method: &str,
        uri: &str,
        auth: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let (status, bytes) = self.send(method, uri, auth, body).await;
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                panic!("invalid JSON body ({}): {}", e, String::from_utf8_lossy(&bytes))
            })
        };
        (status, json)
    }

    /// Registers `username` with `{username}@example.com` and logs in
    pub async fn user(&self, username: &str) -> TestUser {
        let (status, user) = self
            .send_json(
                "POST",
                "/v1/auth/register",
                None,
                Some(serde_json::json!({
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "password": PASSWORD,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {user}");

        let (status, login) = self
            .send_json(
                "POST",
                "/v1/auth/login",
                None,
                Some(serde_json::json!({ "identifier": username, "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {login}");

        TestUser {
            id: user["id"].as_str().unwrap().to_string(),
            username: user["username"].as_str().unwrap().to_string(),
            token: login["token"].as_str().unwrap().to_string(),
        }
    }

    /// Creates a webring owned by `owner`
    pub async fn webring(&self, owner: &TestUser, url: &str, name: &str) -> Value {
        let (status, webring) = self
            .send_json(
                "POST",
                "/v1/webrings",
                Some(&owner.auth_header()),
                Some(serde_json::json!({ "url": url, "name": name })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create webring failed: {webring}");
        webring
    }
}

/// Helper to wait for condition with timeout
pub async fn wait_for<F, Fut>(condition: F, timeout_secs: u64) -> anyhow::Result<()>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let start = std::time::Instant::now();
    let timeout = std::time::Duration::from_secs(timeout_secs);

    loop {
        if condition().await {
            return Ok(());
        }

        if start.elapsed() > timeout {
            anyhow::bail!("Condition not met within {} seconds", timeout_secs);
        }

        tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
    }
}
