//! Mapping of domain errors onto HTTP responses.
//!
//! Every error body has the shape `{"error": "<message>"}` and carries only the
//! client-safe message of the underlying error.

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use taskdeck::{AuthError, TaskError, auth::AuthErrorKind};

/// JSON error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error half of every handler result
pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Build an error response with an explicit status.
pub fn error_response(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Map an authentication error to its HTTP status and client-safe message.
pub fn auth_error(err: &AuthError) -> ApiError {
    let status = match err.kind() {
        AuthErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        AuthErrorKind::Conflict => StatusCode::CONFLICT,
        AuthErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        AuthErrorKind::ConfigFailure
        | AuthErrorKind::PersistenceFailure
        | AuthErrorKind::HashingFailure => {
            tracing::error!(error = %err, "Authentication request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    error_response(status, err.client_message())
}

/// Map a task error to its HTTP status and client-safe message.
pub fn task_error(err: &TaskError) -> ApiError {
    let status = match err {
        TaskError::Validation(_) => StatusCode::BAD_REQUEST,
        TaskError::NotFound => StatusCode::NOT_FOUND,
        TaskError::Database(_) | TaskError::Timeout(_) | TaskError::Persistence(_) => {
            tracing::error!(error = %err, "Task request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    error_response(status, err.client_message())
}

/// JSON body extractor whose rejection is a 400 with the standard error body.
///
/// Covers missing content type, syntax errors and type mismatches alike.
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> ApiError {
    tracing::debug!(rejection = %rejection, "Rejected request body");
    error_response(StatusCode::BAD_REQUEST, "Invalid request payload")
}
