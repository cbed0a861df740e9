//! Structured logging infrastructure for Stakeline.
//!
//! This module provides centralized logging initialization with support
//! for structured JSON output and environment-based configuration.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initialize the logging system with human-readable output.
///
/// Log level can be configured via the `RUST_LOG` environment variable.
/// If not set, defaults to `info` level.
///
/// # Example
/// ```no_run
/// use stakeline_core::logging;
///
/// logging::init();
/// tracing::info!("Reconciler started");
/// ```
pub fn init() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_target(true))
        .init();
}

/// Initialize the logging system with JSON output for production environments.
///
/// Every phase log line carries `phase` and, where relevant, `mission_id`
/// fields, which makes this format suitable for log aggregation.
///
/// # Example
/// ```no_run
/// use stakeline_core::logging;
///
/// logging::init_json();
/// tracing::info!(phase = "pending", "Pass started");
/// ```
pub fn init_json() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().json().with_target(true))
        .init();
}

/// Initialize logging in the format selected by configuration.
pub fn init_with(json: bool) {
    if json {
        init_json();
    } else {
        init();
    }
}
