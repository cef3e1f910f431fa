//! Prometheus metrics for monitoring the credential service.
//!
//! Metrics are exposed in Prometheus text format on a dedicated listener when
//! `METRICS_BIND` is configured. Without an installed recorder every call below is a no-op.
//!
//! # Metrics Categories
//!
//! - **HTTP Metrics**: Request counts, duration, status codes
//! - **Auth Metrics**: Attempts per flow and outcome, tokens issued, refresh-token reuse
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use td_server::metrics;
//! use std::net::SocketAddr;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let addr: SocketAddr = "127.0.0.1:9090".parse()?;
//! metrics::init_metrics(addr)?;
//!
//! metrics::http_requests_total("POST", "/auth/login", 200);
//! metrics::auth_attempt(metrics::AuthFlow::Login, true);
//! # Ok(())
//! # }
//! ```

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;

/// Install the Prometheus exporter with an HTTP listener on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Auth Metrics
// ============================================================================

/// Credential flows tracked by the auth counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFlow {
    Signup,
    Login,
    Refresh,
    Logout,
    Verify,
}

impl AuthFlow {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthFlow::Signup => "signup",
            AuthFlow::Login => "login",
            AuthFlow::Refresh => "refresh",
            AuthFlow::Logout => "logout",
            AuthFlow::Verify => "verify",
        }
    }
}

/// Increment auth attempts counter.
pub fn auth_attempt(flow: AuthFlow, success: bool) {
    metrics::counter!("auth_attempts_total",
        "flow" => flow.as_str(),
        "outcome" => if success { "success" } else { "failure" }
    )
    .increment(1);
}

/// Increment issued token pairs counter.
pub fn token_pair_issued(flow: AuthFlow) {
    metrics::counter!("token_pairs_issued_total",
        "flow" => flow.as_str()
    )
    .increment(1);
}

/// Increment the counter of revoked refresh tokens presented again.
pub fn refresh_reuse_detected() {
    metrics::counter!("refresh_token_reuse_total").increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_labels() {
        assert_eq!(AuthFlow::Signup.as_str(), "signup");
        assert_eq!(AuthFlow::Refresh.as_str(), "refresh");
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        http_requests_total("GET", "/health", 200);
        http_request_duration_ms("GET", "/health", 1.5);
        auth_attempt(AuthFlow::Login, false);
        token_pair_issued(AuthFlow::Signup);
        refresh_reuse_detected();
    }
}
