//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Pick the filter: `RUST_LOG`, else `--log`, else `info`
//!
//! Events go to stderr; stdout carries command output only.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_LEVEL: &str = "info";

/// Build the filter from `RUST_LOG`, falling back to `level`.
pub fn filter(level: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = level.unwrap_or(DEFAULT_LEVEL);
        EnvFilter::try_new(format!("dev_server={level},tower_http={level}"))
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL))
    })
}

pub fn init(level: Option<&str>) {
    let result = tracing_subscriber::registry()
        .with(filter(level))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
    if result.is_err() {
        tracing::debug!("Logging already initialized");
    }
}
