/// Integration tests for the `/api/v1` rate limiter

mod common;

use axum::http::StatusCode;
use common::{body_json, TestContext};
use task_service_api::config::RateLimitConfig;

fn tight_limit() -> TestContext {
    TestContext::with_rate_limit(RateLimitConfig {
        enabled: true,
        capacity: 2,
        refill_per_second: 0.01,
    })
}

#[tokio::test]
async fn test_allowed_requests_carry_limit_headers() {
    let ctx = tight_limit();

    let response = ctx.send("GET", "/api/v1/tasks", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-ratelimit-limit"], "2");
    assert_eq!(response.headers()["x-ratelimit-remaining"], "1");
}

#[tokio::test]
async fn test_over_limit_gets_429_with_retry_after() {
    let ctx = tight_limit();

    ctx.send("GET", "/api/v1/tasks", None).await;
    ctx.send("GET", "/api/v1/users", None).await;

    let response = ctx.send("GET", "/api/v1/tasks?page=0", None).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let retry_after: u64 = response.headers()["retry-after"]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after >= 1);

    let body = body_json(response).await;
    assert_eq!(body["status"], 429);
    assert_eq!(body["error"], "Too Many Requests");
    assert_eq!(body["path"], "/api/v1/tasks");
    assert_eq!(body["retryAfter"], retry_after);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_health_is_not_rate_limited() {
    let ctx = tight_limit();

    for _ in 0..5 {
        let response = ctx.send("GET", "/health", None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
