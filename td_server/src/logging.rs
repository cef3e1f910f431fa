//! Structured logging configuration.
//!
//! Sets up the tracing subscriber for the server and provides helpers for security events
//! and request summaries. Records emitted by the library crate through the `log` facade are
//! bridged into the same subscriber.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Filter used when `RUST_LOG` is unset or invalid
pub const DEFAULT_FILTER: &str = "info,sqlx=warn,hyper=warn";

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var.
///
/// # Example
///
/// ```no_run
/// use td_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log security event with structured data
///
/// # Arguments
///
/// * `event_type` - Type of security event (`failed_login`, `refresh_token_reuse`, ...)
/// * `user_id` - Optional account id
/// * `request_id` - Optional correlation id of the request that triggered the event
/// * `message` - Event message
///
/// # Example
///
/// ```
/// use td_server::logging::log_security_event;
///
/// log_security_event("failed_login", None, Some("req-42"), "Invalid credentials");
/// ```
pub fn log_security_event(
    event_type: &str,
    user_id: Option<Uuid>,
    request_id: Option<&str>,
    message: &str,
) {
    tracing::warn!(
        event_type = event_type,
        user_id = ?user_id,
        request_id = request_id,
        "SECURITY: {}",
        message
    );
}

/// Log API request/response
///
/// Requests slower than one second are reported at warn level.
pub fn log_api_request(
    method: &str,
    path: &str,
    status_code: u16,
    duration_ms: u64,
    user_id: Option<Uuid>,
) {
    if duration_ms > 1000 {
        tracing::warn!(
            http_method = method,
            http_path = path,
            http_status = status_code,
            duration_ms = duration_ms,
            user_id = ?user_id,
            "Slow API request"
        );
    } else {
        tracing::info!(
            http_method = method,
            http_path = path,
            http_status = status_code,
            duration_ms = duration_ms,
            user_id = ?user_id,
            "API request completed"
        );
    }
}
