//! Authentication error types.

use std::time::Duration;
use thiserror::Error;

use super::{email::EmailError, token::TokenError};
use crate::db::timeouts::TimeoutError;

/// Coarse error classes that transports map onto their own status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    /// Malformed or missing request fields
    InvalidInput,
    /// Email already registered
    Conflict,
    /// Bad credentials or an invalid, expired or revoked token
    Unauthorized,
    /// Signing secret or other startup configuration is unusable
    ConfigFailure,
    /// Storage unavailable or timed out
    PersistenceFailure,
    /// Password hashing could not complete
    HashingFailure,
}

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Persistence call exceeded its deadline
    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),

    /// Storage failure reported by a non-SQL backend
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Password hashing failed
    #[error("Password hashing failed")]
    HashingFailed,

    /// Missing or malformed request field
    #[error("{0}")]
    InvalidInput(String),

    /// Email failed the format check
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Email already exists
    #[error("User with this email already exists")]
    EmailTaken,

    /// Unknown email or wrong password. The two cases are deliberately indistinguishable.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// No ledger record matches the presented refresh token
    #[error("Refresh token not found")]
    RefreshTokenNotFound,

    /// Ledger record is past its expiry
    #[error("Refresh token expired")]
    RefreshTokenExpired,

    /// Ledger record was already revoked (logout, rotation, or a concurrent revoker)
    #[error("Refresh token already revoked")]
    AlreadyRevoked,

    /// Logout presented a refresh token that is no longer active
    #[error("Already logged out")]
    AlreadyLoggedOut,

    /// No `Authorization` header on the request
    #[error("Authorization header required")]
    MissingAuthorizationHeader,

    /// `Authorization` header is not `Bearer <token>`
    #[error("Invalid authorization header format")]
    InvalidAuthorizationHeader,

    /// Access token failed verification
    #[error("Invalid token: {0}")]
    InvalidAccessToken(TokenError),

    /// Token could not be signed
    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AuthError {
    /// Classify the error for transport-level status mapping.
    pub fn kind(&self) -> AuthErrorKind {
        match self {
            AuthError::Database(_) | AuthError::Timeout(_) | AuthError::Persistence(_) => {
                AuthErrorKind::PersistenceFailure
            }
            AuthError::HashingFailed => AuthErrorKind::HashingFailure,
            AuthError::InvalidInput(_) | AuthError::InvalidEmail(_) => AuthErrorKind::InvalidInput,
            AuthError::EmailTaken => AuthErrorKind::Conflict,
            AuthError::InvalidCredentials
            | AuthError::RefreshTokenNotFound
            | AuthError::RefreshTokenExpired
            | AuthError::AlreadyRevoked
            | AuthError::AlreadyLoggedOut
            | AuthError::MissingAuthorizationHeader
            | AuthError::InvalidAuthorizationHeader
            | AuthError::InvalidAccessToken(_) => AuthErrorKind::Unauthorized,
            AuthError::Token(TokenError::NilOwner | TokenError::InvalidEmail(_)) => {
                AuthErrorKind::InvalidInput
            }
            AuthError::Token(_) | AuthError::Config(_) => AuthErrorKind::ConfigFailure,
        }
    }

    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Storage, hashing and configuration failures collapse into a generic message, and
    /// every refresh-token failure reads the same so callers cannot probe the ledger.
    pub fn client_message(&self) -> String {
        match self.kind() {
            AuthErrorKind::PersistenceFailure
            | AuthErrorKind::HashingFailure
            | AuthErrorKind::ConfigFailure => "Internal server error".to_string(),
            _ => match self {
                AuthError::RefreshTokenNotFound
                | AuthError::RefreshTokenExpired
                | AuthError::AlreadyRevoked => "Invalid or expired refresh token".to_string(),
                AuthError::InvalidAccessToken(_) => "Invalid token".to_string(),
                _ => self.to_string(),
            },
        }
    }
}

impl From<TimeoutError> for AuthError {
    fn from(err: TimeoutError) -> Self {
        match err {
            TimeoutError::Timeout(duration) => AuthError::Timeout(duration),
            TimeoutError::Database(e) => AuthError::Database(e),
        }
    }
}

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;
