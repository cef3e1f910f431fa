//! Middleware for protected endpoints and request accounting.
//!
//! [`auth_middleware`] validates the bearer access token and injects the
//! [`AuthenticatedUser`] into request extensions for downstream handlers:
//!
//! ```rust,no_run
//! use axum::extract::Extension;
//! use taskdeck::auth::AuthenticatedUser;
//!
//! async fn protected_handler(Extension(user): Extension<AuthenticatedUser>) -> String {
//!     format!("Authenticated as {}", user.email)
//! }
//! # let _ = protected_handler;
//! ```
//!
//! [`track_requests`] records request counters and latency for every route.

use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use taskdeck::auth::AuthenticatedUser;

use super::AppState;
use super::error::auth_error;
use crate::{logging, metrics};

/// Raw `Authorization` header value. A value that is not visible ASCII counts as
/// present but malformed.
pub fn authorization_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .map(|value| value.to_str().unwrap_or("invalid"))
}

/// Authentication middleware that validates access tokens and injects the caller.
///
/// # Behavior
///
/// - **Success**: token valid, `AuthenticatedUser` inserted into request extensions
/// - **Missing header**: `401` with `{"error": "Authorization header required"}`
/// - **Invalid format**: `401` with `{"error": "Invalid authorization header format"}`
/// - **Invalid/expired token**: `401` with `{"error": "Invalid token"}`
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let verified = state
        .sessions
        .verify_bearer_header(authorization_header(request.headers()));

    match verified {
        Ok(user) => {
            request.extensions_mut().insert(user.clone());
            let mut response = next.run(request).await;
            // Read back by the request tracker
            response.extensions_mut().insert(user);
            response
        }
        Err(e) => auth_error(&e).into_response(),
    }
}

/// Record request counters, latency and a summary log line.
pub async fn track_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());

    let response = next.run(request).await;

    let elapsed = start.elapsed();
    let status = response.status().as_u16();
    let user_id = response
        .extensions()
        .get::<AuthenticatedUser>()
        .map(|u| u.user_id);

    metrics::http_requests_total(&method, &path, status);
    metrics::http_request_duration_ms(&method, &path, elapsed.as_secs_f64() * 1000.0);
    logging::log_api_request(
        &method,
        &path,
        status,
        u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        user_id,
    );

    response
}
