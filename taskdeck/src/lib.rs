//! # Taskdeck
//!
//! Credential lifecycle and per-user task ownership for a multi-service application.
//!
//! The library issues short-lived access tokens and rotating refresh tokens, keeps a
//! server-side ledger of refresh-token fingerprints so sessions can be revoked, and scopes
//! every task operation to the account that owns it.
//!
//! ## Core Modules
//!
//! - [`auth`]: Password hashing, token codec, refresh-token fingerprints and the
//!   [`SessionManager`](auth::SessionManager) that drives signup, login, refresh and logout
//! - [`db`]: PostgreSQL pool, repository traits, PostgreSQL and in-memory implementations
//! - [`tasks`]: Task records, validation and the owner-scoped [`TaskManager`]
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use taskdeck::auth::{AuthConfig, SessionManager, SignupRequest};
//! use taskdeck::db::memory::{InMemoryAccounts, InMemoryLedger};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AuthConfig::new("an-example-signing-secret-of-32-bytes")
//!     .with_argon2_params(8, 1, 1);
//! let sessions = SessionManager::new(
//!     config,
//!     Arc::new(InMemoryAccounts::new()),
//!     Arc::new(InMemoryLedger::new()),
//! )?;
//!
//! let session = sessions
//!     .signup(SignupRequest {
//!         email: "user@example.com".to_string(),
//!         password: "Secretpass1!".to_string(),
//!         name: "User".to_string(),
//!     })
//!     .await?;
//!
//! let user = sessions.verify_access_token(&session.tokens.access_token)?;
//! assert_eq!(user.email, "user@example.com");
//! # Ok(())
//! # }
//! ```

/// Credential primitives and session management.
pub mod auth;

/// Persistence layer.
pub mod db;

/// Owner-scoped task resource.
pub mod tasks;

pub use auth::{AuthError, AuthResult, SessionManager};
pub use tasks::{TaskError, TaskManager, TaskResult};
