//! Integration tests for the HTTP surface.
//!
//! Drives the full router, middleware included, against the in-memory repositories.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use taskdeck::auth::{AuthConfig, SessionManager};
use taskdeck::db::memory::{InMemoryAccounts, InMemoryLedger, InMemoryTasks};
use taskdeck::tasks::TaskManager;
use td_server::api::{AppState, create_router, request_id::REQUEST_ID_HEADER};
use tower::ServiceExt; // For `oneshot` method

const SECRET: &str = "server-integration-secret-0123456789";

/// Helper to create a router backed by fresh in-memory repositories
fn create_test_server() -> Router {
    let sessions = SessionManager::new(
        AuthConfig::new(SECRET).with_argon2_params(8, 1, 1),
        Arc::new(InMemoryAccounts::new()),
        Arc::new(InMemoryLedger::new()),
    )
    .expect("Failed to build session manager");

    let state = AppState {
        sessions: Arc::new(sessions),
        tasks: Arc::new(TaskManager::new(Arc::new(InMemoryTasks::new()))),
        database: None,
    };

    create_router(state, Duration::from_secs(30))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    bearer: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn signup_body(email: &str) -> Value {
    json!({
        "email": email,
        "password": "Secretpass1!",
        "name": "Test User",
    })
}

async fn signup(app: &Router, email: &str) -> Value {
    let (status, body) = send(app, "POST", "/auth/signup", Some(signup_body(email)), None).await;
    assert_eq!(status, StatusCode::CREATED, "signup failed: {body}");
    body
}

fn str_field<'a>(body: &'a Value, field: &str) -> &'a str {
    body[field].as_str().unwrap_or_else(|| panic!("missing {field} in {body}"))
}

// ============================================================================
// Health Check Tests
// ============================================================================

#[tokio::test]
async fn test_health_check_endpoint() {
    let app = create_test_server();

    let (status, body) = send(&app, "GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "taskdeck");
    assert_eq!(body["database"], "not_configured");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = create_test_server();

    let request = Request::builder()
        .uri("/health")
        .header(REQUEST_ID_HEADER, "trace-me-42")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.headers()[REQUEST_ID_HEADER], "trace-me-42");
}

// ============================================================================
// Authentication Endpoint Tests
// ============================================================================

#[tokio::test]
async fn test_full_credential_lifecycle() {
    let app = create_test_server();

    // Signup
    let signup = signup(&app, "user@example.com").await;
    assert_eq!(signup["token_type"], "Bearer");
    assert_eq!(signup["expires_in"], 900);
    assert_eq!(signup["user"]["email"], "user@example.com");
    assert_eq!(signup["user"]["name"], "Test User");
    assert!(signup["user"].get("password_hash").is_none());

    // Login yields a different pair
    let (status, login) = send(
        &app,
        "POST",
        "/auth/login",
        Some(json!({"email": "user@example.com", "password": "Secretpass1!"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(login["access_token"], signup["access_token"]);
    assert_ne!(login["refresh_token"], signup["refresh_token"]);

    // Verify
    let access = str_field(&login, "access_token");
    let (status, verified) = send(&app, "GET", "/auth/verify", None, Some(access)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verified["valid"], true);
    assert_eq!(verified["email"], "user@example.com");
    assert_eq!(verified["user_id"], signup["user"]["id"]);

    // Refresh rotates, the old token is dead afterwards
    let old_refresh = str_field(&login, "refresh_token").to_string();
    let (status, rotated) = send(
        &app,
        "POST",
        "/auth/refresh",
        Some(json!({"refresh_token": old_refresh})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rotated["token_type"], "Bearer");
    assert_ne!(str_field(&rotated, "refresh_token"), old_refresh);

    let (status, body) = send(
        &app,
        "POST",
        "/auth/refresh",
        Some(json!({"refresh_token": old_refresh})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid or expired refresh token");

    // Logout once
    let new_refresh = str_field(&rotated, "refresh_token").to_string();
    let (status, body) = send(
        &app,
        "POST",
        "/auth/logout",
        Some(json!({"refresh_token": new_refresh})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Logged out successfully");

    let (status, body) = send(
        &app,
        "POST",
        "/auth/logout",
        Some(json!({"refresh_token": new_refresh})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Already logged out");
}

#[tokio::test]
async fn test_signup_conflict_and_validation() {
    let app = create_test_server();
    signup(&app, "a@b.com").await;

    let (status, body) = send(&app, "POST", "/auth/signup", Some(signup_body("A@B.com")), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "User with this email already exists");

    let (status, body) = send(
        &app,
        "POST",
        "/auth/signup",
        Some(json!({"email": "x@y.com", "password": "Secretpass1!"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Email, password, and name are required");

    let (status, _) = send(&app, "POST", "/auth/signup", Some(signup_body("not-an-email")), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_login_returns_error() {
    let app = create_test_server();
    signup(&app, "user@example.com").await;

    for body in [
        json!({"email": "user@example.com", "password": "Wrongpass1!"}),
        json!({"email": "nobody@example.com", "password": "Secretpass1!"}),
    ] {
        let (status, body) = send(&app, "POST", "/auth/login", Some(body), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid email or password");
    }

    let (status, body) = send(&app, "POST", "/auth/login", Some(json!({"email": "user@example.com"})), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Email and password are required");
}

#[tokio::test]
async fn test_missing_refresh_token_is_bad_request() {
    let app = create_test_server();

    for uri in ["/auth/refresh", "/auth/logout"] {
        let (status, body) = send(&app, "POST", uri, Some(json!({})), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Refresh token is required");
    }
}

#[tokio::test]
async fn test_malformed_json_is_rejected() {
    let app = create_test_server();

    let request = Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "Invalid request payload");
}

#[tokio::test]
async fn test_verify_rejects_bad_headers() {
    let app = create_test_server();
    let session = signup(&app, "user@example.com").await;

    let (status, body) = send(&app, "GET", "/auth/verify", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authorization header required");

    let request = Request::builder()
        .uri("/auth/verify")
        .header(header::AUTHORIZATION, str_field(&session, "access_token"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, "GET", "/auth/verify", None, Some("garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid token");

    // Refresh tokens are not accepted as bearer tokens
    let refresh = str_field(&session, "refresh_token");
    let (status, _) = send(&app, "GET", "/auth/verify", None, Some(refresh)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Task Endpoint Tests
// ============================================================================

#[tokio::test]
async fn test_tasks_require_authentication() {
    let app = create_test_server();

    let (status, body) = send(&app, "GET", "/tasks", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authorization header required");
}

#[tokio::test]
async fn test_task_lifecycle() {
    let app = create_test_server();
    let session = signup(&app, "user@example.com").await;
    let token = str_field(&session, "access_token");

    let (status, list) = send(&app, "GET", "/tasks", None, Some(token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list, json!([]));

    let (status, created) = send(
        &app,
        "POST",
        "/tasks",
        Some(json!({"title": "Write report", "priority": "urgent", "status": "bogus"})),
        Some(token),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "todo");
    assert_eq!(created["priority"], "medium");
    assert_eq!(created["user_id"], session["user"]["id"]);
    let id = str_field(&created, "id").to_string();

    let (status, updated) = send(
        &app,
        "PUT",
        &format!("/tasks/{id}"),
        Some(json!({"status": "in-progress", "description": "Quarterly numbers"})),
        Some(token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "in-progress");
    assert_eq!(updated["title"], "Write report");
    assert_eq!(updated["description"], "Quarterly numbers");

    let (status, completed) = send(
        &app,
        "PATCH",
        &format!("/tasks/{id}/complete"),
        None,
        Some(token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completed["status"], "done");
    assert!(completed["completed_at"].is_string());

    let (status, fetched) = send(&app, "GET", &format!("/tasks/{id}"), None, Some(token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], created["id"]);

    let (status, body) = send(&app, "DELETE", &format!("/tasks/{id}"), None, Some(token)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, body) = send(&app, "GET", &format!("/tasks/{id}"), None, Some(token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Task not found");
}

#[tokio::test]
async fn test_task_validation_and_ids() {
    let app = create_test_server();
    let session = signup(&app, "user@example.com").await;
    let token = str_field(&session, "access_token");

    let (status, body) = send(&app, "POST", "/tasks", Some(json!({"title": "  "})), Some(token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "title field is required");

    let (status, body) = send(
        &app,
        "POST",
        "/tasks",
        Some(json!({"title": "Late", "due_date": "2000-01-01T00:00:00Z"})),
        Some(token),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "due date cannot be in the past");

    let (status, body) = send(&app, "GET", "/tasks/not-a-uuid", None, Some(token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid task ID");
}

#[tokio::test]
async fn test_tasks_are_isolated_between_accounts() {
    let app = create_test_server();
    let alice = signup(&app, "alice@example.com").await;
    let bob = signup(&app, "bob@example.com").await;
    let alice_token = str_field(&alice, "access_token");
    let bob_token = str_field(&bob, "access_token");

    let (_, created) = send(
        &app,
        "POST",
        "/tasks",
        Some(json!({"title": "Private"})),
        Some(alice_token),
    )
    .await;
    let id = str_field(&created, "id").to_string();

    let (status, _) = send(&app, "GET", &format!("/tasks/{id}"), None, Some(bob_token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "DELETE", &format!("/tasks/{id}"), None, Some(bob_token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, bob_list) = send(&app, "GET", "/tasks", None, Some(bob_token)).await;
    assert_eq!(bob_list, json!([]));

    let (_, alice_list) = send(&app, "GET", "/tasks", None, Some(alice_token)).await;
    assert_eq!(alice_list.as_array().map(Vec::len), Some(1));
}
