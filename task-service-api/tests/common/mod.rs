//! Common test utilities for integration tests
//!
//! Builds the real router on top of an in-memory store, so the HTTP tests
//! run without a database. Password hashing uses minimal Argon2 costs.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use serde_json::Value;
use task_service_api::app::{build_router, AppState};
use task_service_api::config::{Config, RateLimitConfig};
use task_service_shared::repository::MemoryStore;
use tower::ServiceExt;

/// Test context containing the router and its store
pub struct TestContext {
    pub app: axum::Router,
    pub store: Arc<MemoryStore>,
}

impl TestContext {
    /// Context with rate limiting disabled
    pub fn new() -> Self {
        Self::with_rate_limit(RateLimitConfig {
            enabled: false,
            ..Default::default()
        })
    }

    pub fn with_rate_limit(rate_limit: RateLimitConfig) -> Self {
        let mut config = test_config();
        config.rate_limit = rate_limit;

        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store.clone(), config).expect("valid test config");

        Self {
            app: build_router(state),
            store,
        }
    }

    /// Sends a request through the router
    pub async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> Response {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        self.app.clone().oneshot(request).await.unwrap()
    }

    /// Sends a request and decodes the JSON response
    pub async fn json(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let response = self.send(method, uri, body).await;
        let status = response.status();
        (status, body_json(response).await)
    }

    /// Creates a user holding `roles`, asserting success
    pub async fn create_user(&self, username: &str, roles: &[&str]) -> Value {
        let (status, body) = self
            .json(
                "POST",
                "/api/v1/user",
                Some(serde_json::json!({
                    "username": username,
                    "email": format!("{}@example.com", username),
                    "password": "correct horse battery",
                    "roles": roles,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create user failed: {}", body);
        body
    }

    /// Creates a task owned by `owner`, asserting success
    pub async fn create_task(&self, title: &str, owner: &str) -> Value {
        let (status, body) = self
            .json(
                "POST",
                "/api/v1/task",
                Some(serde_json::json!({
                    "title": title,
                    "description": "created by test",
                    "completed": false,
                    "userUsername": owner,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "create task failed: {}", body);
        body
    }
}

/// Configuration suitable for tests: cheap hashing, placeholder database URL
pub fn test_config() -> Config {
    let mut config = Config::from_sources(
        config::Environment::with_prefix("APP").source(Some(HashMap::new())),
        Some("postgresql://unused/test".to_string()),
    )
    .expect("test config");

    config.password.memory_kib = 64;
    config.password.iterations = 1;
    config.password.parallelism = 1;
    config
}

pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    }
}

/// Unique username for tests that share nothing but want distinct names
pub fn unique_name(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().simple().to_string()[..8])
}
