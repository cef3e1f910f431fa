//! Authentication module providing signup, login and refresh-token rotation.
//!
//! This module implements the credential lifecycle with:
//! - Argon2id password hashing with an optional server-side pepper
//! - HS256 access tokens (15-minute expiry by default)
//! - Single-use rotating refresh tokens (7-day expiry by default)
//! - SHA-256 fingerprints so raw refresh tokens are never persisted
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use taskdeck::auth::{AuthConfig, LoginRequest, SessionManager};
//! use taskdeck::db::{Database, DatabaseConfig, PgAccountRepository, PgRefreshTokenLedger};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&DatabaseConfig::default()).await?;
//!     let sessions = SessionManager::new(
//!         AuthConfig::new("jwt_secret_of_at_least_thirty_two_chars"),
//!         Arc::new(PgAccountRepository::new(db.pool().clone())),
//!         Arc::new(PgRefreshTokenLedger::new(db.pool().clone())),
//!     )?;
//!
//!     let session = sessions
//!         .login(LoginRequest {
//!             email: "user@example.com".to_string(),
//!             password: "Secretpass1!".to_string(),
//!         })
//!         .await?;
//!     println!("Logged in as {}", session.account.email);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod email;
pub mod errors;
pub mod fingerprint;
pub mod manager;
pub mod models;
pub mod password;
pub mod token;

pub use config::{AuthConfig, MAX_TOKEN_TTL, parse_duration, parse_duration_or};
pub use email::{EmailError, validate_email};
pub use errors::{AuthError, AuthErrorKind, AuthResult};
pub use fingerprint::fingerprint;
pub use manager::SessionManager;
pub use models::{
    Account, AccessClaims, AuthSession, AuthenticatedUser, LoginRequest, NewAccount,
    RefreshRequest, RefreshTokenRecord, SessionTokens, SignupRequest, TokenKind, UserId,
};
pub use password::PasswordHasher;
pub use token::{IssuedToken, TOKEN_ISSUER, TokenCodec, TokenError};
