//! HTTP API for the credential service and task resource.
//!
//! # Endpoints Overview
//!
//! ## Authentication (No Auth Required)
//! - `POST /auth/signup` - Create an account, returns the first token pair (201)
//! - `POST /auth/login` - Login with email and password
//! - `POST /auth/refresh` - Rotate a refresh token into a new pair
//! - `POST /auth/logout` - Revoke a refresh token
//! - `GET /auth/verify` - Check the bearer access token
//!
//! ## Tasks (Bearer Token Required)
//! - `GET /tasks`, `POST /tasks`
//! - `GET /tasks/{id}`, `PUT /tasks/{id}`, `DELETE /tasks/{id}`
//! - `PATCH /tasks/{id}/complete`
//!
//! ## Health Check
//! - `GET /health` - Server and database status
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use taskdeck::auth::{AuthConfig, SessionManager};
//! use taskdeck::db::memory::{InMemoryAccounts, InMemoryLedger, InMemoryTasks};
//! use taskdeck::tasks::TaskManager;
//! use td_server::api::{AppState, create_router};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let sessions = SessionManager::new(
//!     AuthConfig::new("jwt_secret_of_at_least_thirty_two_chars"),
//!     Arc::new(InMemoryAccounts::new()),
//!     Arc::new(InMemoryLedger::new()),
//! )?;
//! let state = AppState {
//!     sessions: Arc::new(sessions),
//!     tasks: Arc::new(TaskManager::new(Arc::new(InMemoryTasks::new()))),
//!     database: None,
//! };
//!
//! let app = create_router(state, Duration::from_secs(30));
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively. In production, configure appropriate origins,
//! methods, and headers.

pub mod auth;
pub mod error;
pub mod middleware;
pub mod request_id;
pub mod tasks;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, patch, post},
};
use serde_json::json;
use taskdeck::{SessionManager, TaskManager, db::Database};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer};

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request; every field is a cheap handle.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub tasks: Arc<TaskManager>,
    /// Connection pool probed by `/health`; absent when running on in-memory repositories
    pub database: Option<Database>,
}

/// Create the complete API router with all endpoints and middleware.
///
/// ```text
/// GET    /health                 - Health check (public)
/// POST   /auth/signup            - Create account (public)
/// POST   /auth/login             - Login (public)
/// POST   /auth/refresh           - Rotate refresh token (public)
/// POST   /auth/logout            - Revoke refresh token (public)
/// GET    /auth/verify            - Verify bearer token (public, checks header itself)
/// GET    /tasks                  - List tasks (auth required)
/// POST   /tasks                  - Create task (auth required)
/// GET    /tasks/{id}             - Get task (auth required)
/// PUT    /tasks/{id}             - Update task (auth required)
/// DELETE /tasks/{id}             - Delete task (auth required)
/// PATCH  /tasks/{id}/complete    - Complete task (auth required)
/// ```
pub fn create_router(state: AppState, request_timeout: Duration) -> Router {
    let auth_routes = Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/verify", get(auth::verify));

    let task_routes = Router::new()
        .route("/", get(tasks::list_tasks).post(tasks::create_task))
        .route(
            "/{id}",
            get(tasks::get_task)
                .put(tasks::update_task)
                .delete(tasks::delete_task),
        )
        .route("/{id}/complete", patch(tasks::complete_task))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .nest("/auth", auth_routes)
        .nest("/tasks", task_routes)
        .layer(axum::middleware::from_fn(middleware::track_requests))
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` unless the configured database fails its probe, in which case
/// `503 Service Unavailable`.
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"healthy","service":"taskdeck","database":"connected",...}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = match &state.database {
        Some(db) => match db.health_check().await {
            Ok(()) => "connected",
            Err(e) => {
                tracing::warn!(error = %e, "Database health check failed");
                "disconnected"
            }
        },
        None => "not_configured",
    };

    let healthy = database != "disconnected";
    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if healthy { "healthy" } else { "unhealthy" },
        "service": "taskdeck",
        "database": database,
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
