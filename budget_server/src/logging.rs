//! Structured logging configuration.
//!
//! `budget_auth` logs through the `log` facade; the subscriber installed here
//! picks those records up alongside the server's own `tracing` events.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var.
///
/// # Example
///
/// ```no_run
/// use budget_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,hyper=warn,redis=warn"));

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
/// Never pass passwords, codes or tokens in `message`.
///
/// # Example
///
/// ```
/// use budget_server::logging::log_security_event;
///
/// log_security_event(
///     "login_locked",
///     None,
///     Some("192.168.1.1"),
///     "Too many failed login attempts",
/// );
/// ```
pub fn log_security_event(
    event_type: &str,
    user_id: Option<Uuid>,
    ip_address: Option<&str>,
    message: &str,
) {
    let user_id = user_id.map(|id| id.to_string());
    tracing::warn!(
        event_type = event_type,
        user_id = user_id.as_deref(),
        ip_address = ip_address,
        "SECURITY: {}",
        message
    );
}

/// Log API request outcome
pub fn log_api_request(method: &str, path: &str, status_code: u16, duration_ms: u64) {
    if status_code >= 500 {
        tracing::error!(
            http_method = method,
            http_path = path,
            http_status = status_code,
            duration_ms = duration_ms,
            "API request failed"
        );
    } else {
        tracing::info!(
            http_method = method,
            http_path = path,
            http_status = status_code,
            duration_ms = duration_ms,
            "API request completed"
        );
    }
}
