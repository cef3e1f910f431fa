//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use std::net::SocketAddr;
use std::time::Duration;

use taskdeck::auth::{
    AuthConfig, MAX_TOKEN_TTL, parse_duration_or,
    config::{
        DEFAULT_ACCESS_TOKEN_TTL, DEFAULT_ARGON2_ITERATIONS, DEFAULT_ARGON2_MEMORY_KIB,
        DEFAULT_ARGON2_PARALLELISM, DEFAULT_REFRESH_TOKEN_TTL,
    },
};
use taskdeck::db::DatabaseConfig;

/// Default HTTP bind address
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Default per-request deadline in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Minimum accepted length of the signing secret
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Credential lifecycle configuration
    pub auth: AuthConfig,
    /// Deadline applied to every HTTP request
    pub request_timeout: Duration,
    /// Prometheus scrape listener, disabled when unset
    pub metrics_bind: Option<SocketAddr>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or invalid
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::from_lookup(|key| std::env::var(key).ok())?;

        if let Some(bind) = bind_override {
            config.bind = bind;
        }
        if let Some(url) = database_url_override {
            config.database.database_url = url;
        }

        Ok(config)
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind = match lookup("SERVER_BIND") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                var: "SERVER_BIND".to_string(),
                reason: format!("'{raw}' is not an IP:PORT address"),
            })?,
            None => default_bind(),
        };

        let metrics_bind = match lookup("METRICS_BIND").filter(|v| !v.trim().is_empty()) {
            Some(raw) => Some(raw.trim().parse().map_err(|_| ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: format!("'{raw}' is not an IP:PORT address"),
            })?),
            None => None,
        };

        let database = DatabaseConfig::from_lookup(&lookup);

        // Security configuration (REQUIRED)
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::MissingRequired {
                var: "JWT_SECRET".to_string(),
                hint: "Generate with: openssl rand -hex 32".to_string(),
            })?;

        if jwt_secret.chars().count() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::Invalid {
                var: "JWT_SECRET".to_string(),
                reason: format!("Must be at least {MIN_JWT_SECRET_LEN} characters"),
            });
        }

        let access_token_ttl = parse_duration_or(
            lookup("ACCESS_TOKEN_EXPIRY").as_deref(),
            DEFAULT_ACCESS_TOKEN_TTL,
        );
        let refresh_token_ttl = parse_duration_or(
            lookup("REFRESH_TOKEN_EXPIRY").as_deref(),
            DEFAULT_REFRESH_TOKEN_TTL,
        );

        let mut auth = AuthConfig::new(jwt_secret)
            .with_token_ttls(access_token_ttl, refresh_token_ttl)
            .with_argon2_params(
                parse_or(&lookup, "ARGON2_MEMORY_KIB", DEFAULT_ARGON2_MEMORY_KIB),
                parse_or(&lookup, "ARGON2_ITERATIONS", DEFAULT_ARGON2_ITERATIONS),
                parse_or(&lookup, "ARGON2_PARALLELISM", DEFAULT_ARGON2_PARALLELISM),
            )
            .with_reuse_revocation(parse_or(&lookup, "REVOKE_SESSIONS_ON_REUSE", false));

        if let Some(pepper) = lookup("PASSWORD_PEPPER").filter(|p| !p.is_empty()) {
            auth = auth.with_pepper(pepper);
        }

        let request_timeout = Duration::from_secs(parse_or(
            &lookup,
            "REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        ));

        Ok(ServerConfig {
            bind,
            database,
            auth,
            request_timeout,
            metrics_bind,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (var, ttl) in [
            ("ACCESS_TOKEN_EXPIRY", self.auth.access_token_ttl),
            ("REFRESH_TOKEN_EXPIRY", self.auth.refresh_token_ttl),
        ] {
            if ttl > MAX_TOKEN_TTL {
                return Err(ConfigError::Invalid {
                    var: var.to_string(),
                    reason: format!("Must not exceed {}d", MAX_TOKEN_TTL.as_secs() / 86_400),
                });
            }
        }

        if self.auth.access_token_ttl >= self.auth.refresh_token_ttl {
            return Err(ConfigError::Invalid {
                var: "ACCESS_TOKEN_EXPIRY".to_string(),
                reason: format!(
                    "Must be shorter than the refresh token lifetime ({:?})",
                    self.auth.refresh_token_ttl
                ),
            });
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid {
                var: "DB_MIN_CONNECTIONS".to_string(),
                reason: format!(
                    "Cannot exceed DB_MAX_CONNECTIONS ({})",
                    self.database.max_connections
                ),
            });
        }

        if self.request_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                var: "REQUEST_TIMEOUT_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

/// Helper to parse a looked-up variable with default fallback
fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
