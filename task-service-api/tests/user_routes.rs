/// Integration tests for the user and role endpoints

mod common;

use axum::http::StatusCode;
use common::{unique_name, TestContext};
use serde_json::json;

#[tokio::test]
async fn test_create_user_returns_created_without_password() {
    let ctx = TestContext::new();

    let user = ctx.create_user("alice", &["ROLE_ADMIN"]).await;

    assert_eq!(user["username"], "alice");
    assert_eq!(user["email"], "alice@example.com");
    assert_eq!(user["active"], true);
    assert_eq!(user["roles"], json!(["ROLE_ADMIN"]));
    assert!(user.get("password").is_none());
    assert!(user.get("passwordHash").is_none());
}

#[tokio::test]
async fn test_create_user_with_unknown_role_is_bad_request() {
    let ctx = TestContext::new();

    let (status, body) = ctx
        .json(
            "POST",
            "/api/v1/user",
            Some(json!({
                "username": "alice",
                "email": "alice@example.com",
                "password": "pw",
                "roles": ["ROLE_GHOST"]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Role ROLE_GHOST not found");

    let (_, found) = ctx.json("GET", "/api/v1/users/alice", None).await;
    assert_eq!(found, json!([]));
}

#[tokio::test]
async fn test_create_user_without_roles_is_bad_request() {
    let ctx = TestContext::new();

    let (status, _) = ctx
        .json(
            "POST",
            "/api/v1/user",
            Some(json!({"username": "alice", "email": "alice@example.com", "password": "pw", "roles": []})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_user_invalid_email_is_bad_request() {
    let ctx = TestContext::new();

    let (status, body) = ctx
        .json(
            "POST",
            "/api/v1/user",
            Some(json!({"username": "alice", "email": "nope", "password": "pw", "roles": ["ROLE_USER"]})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "email");
}

#[tokio::test]
async fn test_duplicate_username_is_conflict() {
    let ctx = TestContext::new();
    ctx.create_user("alice", &["ROLE_USER"]).await;

    let (status, body) = ctx
        .json(
            "POST",
            "/api/v1/user",
            Some(json!({
                "username": "alice",
                "email": "other@example.com",
                "password": "pw",
                "roles": ["ROLE_USER"]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn test_find_by_username_returns_list() {
    let ctx = TestContext::new();
    ctx.create_user("alice", &["ROLE_USER"]).await;

    let (status, found) = ctx.json("GET", "/api/v1/users/alice", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found.as_array().unwrap().len(), 1);
    assert_eq!(found[0]["username"], "alice");

    let (status, missing) = ctx.json("GET", "/api/v1/users/nobody", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(missing, json!([]));
}

#[tokio::test]
async fn test_assign_roles_replaces_set() {
    let ctx = TestContext::new();
    ctx.create_user("alice", &["ROLE_USER"]).await;

    let (status, both) = ctx
        .json("POST", "/api/v1/alice/roles", Some(json!(["ROLE_USER", "ROLE_ADMIN"])))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(both["roles"], json!(["ROLE_ADMIN", "ROLE_USER"]));

    let (status, narrowed) = ctx
        .json("POST", "/api/v1/alice/roles", Some(json!(["ROLE_ADMIN"])))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(narrowed["roles"], json!(["ROLE_ADMIN"]));
}

#[tokio::test]
async fn test_assign_roles_for_names_sharing_static_prefixes() {
    let ctx = TestContext::new();

    for name in ["tasker", "ursula", "userbase"] {
        ctx.create_user(name, &["ROLE_USER"]).await;

        let (status, body) = ctx
            .json("POST", &format!("/api/v1/{}/roles", name), Some(json!(["ROLE_ADMIN"])))
            .await;
        assert_eq!(status, StatusCode::OK, "{}", name);
        assert_eq!(body["roles"], json!(["ROLE_ADMIN"]));
    }

    let response = ctx
        .send("POST", "/api/v1/task/roles", Some(json!(["ROLE_ADMIN"])))
        .await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_assign_roles_unknown_role_changes_nothing() {
    let ctx = TestContext::new();
    ctx.create_user("alice", &["ROLE_USER"]).await;

    let (status, body) = ctx
        .json("POST", "/api/v1/alice/roles", Some(json!(["ROLE_ADMIN", "ROLE_GHOST"])))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Role not found: ROLE_GHOST");

    let (_, found) = ctx.json("GET", "/api/v1/users/alice", None).await;
    assert_eq!(found[0]["roles"], json!(["ROLE_USER"]));
}

#[tokio::test]
async fn test_assign_roles_unknown_user_is_not_found() {
    let ctx = TestContext::new();

    let (status, _) = ctx
        .json("POST", "/api/v1/nobody/roles", Some(json!(["ROLE_USER"])))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_soft_deleted_user_excluded_from_listing() {
    let ctx = TestContext::new();
    let alice = ctx.create_user("alice", &["ROLE_USER"]).await;
    ctx.create_user("bob", &["ROLE_USER"]).await;

    let response = ctx
        .send("DELETE", &format!("/api/v1/users/{}", alice["id"]), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let (_, page) = ctx.json("GET", "/api/v1/users", None).await;
    assert_eq!(page["totalElements"], 1);
    assert_eq!(page["content"][0]["username"], "bob");
    assert!(page["content"][0].get("password").is_none());

    let (_, found) = ctx.json("GET", "/api/v1/users/alice", None).await;
    assert_eq!(found, json!([]));

    let (status, _) = ctx.json("DELETE", "/api/v1/users/9999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_user_listing_sorted_by_username() {
    let ctx = TestContext::new();
    let names = [unique_name("carol"), unique_name("alice"), unique_name("bob")];
    for name in &names {
        ctx.create_user(name, &["ROLE_USER"]).await;
    }

    let (status, page) = ctx.json("GET", "/api/v1/users?sort=username,asc&size=2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["totalPages"], 2);

    let listed: Vec<&str> = page["content"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap())
        .collect();
    assert_eq!(listed, vec![names[1].as_str(), names[2].as_str()]);
}

#[tokio::test]
async fn test_task_owner_flow() {
    let ctx = TestContext::new();
    ctx.create_user("alice", &["ROLE_ADMIN"]).await;

    let task = ctx.create_task("Quarterly review", "alice").await;
    assert_eq!(task["userUsername"], "alice");

    ctx.send("DELETE", &format!("/api/v1/task/{}", task["id"]), None).await;

    let (status, _) = ctx.json("GET", &format!("/api/v1/tasks/{}", task["id"]), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, owned) = ctx.json("GET", "/api/v1/user/alice", None).await;
    assert!(owned
        .as_array()
        .unwrap()
        .iter()
        .any(|t| t["id"] == task["id"]));
}
