//! Authentication API handlers.
//!
//! HTTP endpoints for the credential lifecycle:
//! - Signup with email, password and display name
//! - Login with email and password
//! - Refresh-token rotation
//! - Logout to revoke a refresh token
//! - Bearer access-token verification
//!
//! # Examples
//!
//! Sign up:
//! ```bash
//! curl -X POST http://localhost:8080/auth/signup \
//!   -H "Content-Type: application/json" \
//!   -d '{"email": "user@example.com", "password": "Secretpass1!", "name": "Test User"}'
//! ```
//!
//! Rotate a refresh token:
//! ```bash
//! curl -X POST http://localhost:8080/auth/refresh \
//!   -H "Content-Type: application/json" \
//!   -d '{"refresh_token": "eyJhbGciOiJIUzI1NiIs..."}'
//! ```

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use serde::{Deserialize, Serialize};
use taskdeck::auth::{
    AuthError, AuthSession, LoginRequest, RefreshRequest, SessionTokens, SignupRequest, UserId,
};

use super::AppState;
use super::error::{ApiError, ApiJson, auth_error};
use super::middleware::authorization_header;
use super::request_id::RequestId;
use crate::logging::log_security_event;
use crate::metrics::{self, AuthFlow};

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub valid: bool,
    pub user_id: UserId,
    pub email: String,
}

/// Create an account and return its first token pair.
///
/// # Response
///
/// `201 Created` with the token pair and the account (never its password hash).
///
/// # Errors
///
/// - `400 Bad Request`: missing fields, malformed email, or name too long
/// - `409 Conflict`: email already registered
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<SignupRequest>,
) -> Result<(StatusCode, Json<AuthSession>), ApiError> {
    let result = state.sessions.signup(payload).await;
    metrics::auth_attempt(AuthFlow::Signup, result.is_ok());

    match result {
        Ok(session) => {
            metrics::token_pair_issued(AuthFlow::Signup);
            tracing::info!(user_id = %session.account.id, "Account created");
            Ok((StatusCode::CREATED, Json(session)))
        }
        Err(e) => Err(auth_error(&e)),
    }
}

/// Authenticate with email and password.
///
/// # Errors
///
/// - `400 Bad Request`: missing email or password
/// - `401 Unauthorized`: unknown email or wrong password, reported identically
pub async fn login(
    State(state): State<AppState>,
    request_id: RequestId,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<AuthSession>, ApiError> {
    let result = state.sessions.login(payload).await;
    metrics::auth_attempt(AuthFlow::Login, result.is_ok());

    match result {
        Ok(session) => {
            metrics::token_pair_issued(AuthFlow::Login);
            Ok(Json(session))
        }
        Err(e) => {
            if matches!(e, AuthError::InvalidCredentials) {
                log_security_event(
                    "failed_login",
                    None,
                    Some(request_id.as_str()),
                    "Invalid email or password",
                );
            }
            Err(auth_error(&e))
        }
    }
}

/// Exchange a refresh token for a new pair. The presented token is revoked.
///
/// # Errors
///
/// - `400 Bad Request`: missing refresh token
/// - `401 Unauthorized`: unknown, expired or already revoked refresh token
pub async fn refresh(
    State(state): State<AppState>,
    request_id: RequestId,
    ApiJson(payload): ApiJson<RefreshRequest>,
) -> Result<Json<SessionTokens>, ApiError> {
    let result = state.sessions.refresh(&payload.refresh_token).await;
    metrics::auth_attempt(AuthFlow::Refresh, result.is_ok());

    match result {
        Ok(tokens) => {
            metrics::token_pair_issued(AuthFlow::Refresh);
            Ok(Json(tokens))
        }
        Err(e) => {
            if matches!(e, AuthError::AlreadyRevoked) {
                metrics::refresh_reuse_detected();
                let owner = state
                    .sessions
                    .refresh_token_owner(&payload.refresh_token)
                    .await
                    .unwrap_or_else(|lookup_err| {
                        tracing::warn!(error = %lookup_err, "Could not resolve reused token owner");
                        None
                    });
                log_security_event(
                    "refresh_token_reuse",
                    owner,
                    Some(request_id.as_str()),
                    "Revoked refresh token presented",
                );
            }
            Err(auth_error(&e))
        }
    }
}

/// Revoke a refresh token. Access tokens stay valid until they expire.
///
/// # Errors
///
/// - `400 Bad Request`: missing refresh token
/// - `401 Unauthorized`: unknown token or already logged out
pub async fn logout(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RefreshRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let result = state.sessions.logout(&payload.refresh_token).await;
    metrics::auth_attempt(AuthFlow::Logout, result.is_ok());

    result.map_err(|e| auth_error(&e))?;
    Ok(Json(MessageResponse {
        message: "Logged out successfully".to_string(),
    }))
}

/// Check the bearer access token in the `Authorization` header.
///
/// # Errors
///
/// - `401 Unauthorized`: header missing, not `Bearer <token>`, or token invalid
pub async fn verify(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<VerifyResponse>, ApiError> {
    let result = state
        .sessions
        .verify_bearer_header(authorization_header(&headers));
    metrics::auth_attempt(AuthFlow::Verify, result.is_ok());

    let user = result.map_err(|e| auth_error(&e))?;
    Ok(Json(VerifyResponse {
        valid: true,
        user_id: user.user_id,
        email: user.email,
    }))
}
