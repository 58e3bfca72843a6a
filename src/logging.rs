// src/logging.rs
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Maps `LOG_LEVEL` (DEBUG/INFO/WARN/ERROR, case-insensitive) to a filter directive.
/// Anything else means WARN.
pub fn level_directive(level: &str) -> &'static str {
    match level.trim().to_ascii_uppercase().as_str() {
        "DEBUG" => "debug",
        "INFO" => "info",
        "WARN" => "warn",
        "ERROR" => "error",
        _ => "warn",
    }
}

/// JSON logs on stderr so stdout stays reserved for the printed report.
/// `RUST_LOG` overrides `level` when set.
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_directive(level)));

    // A second init (e.g. from tests) is harmless.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().with_writer(std::io::stderr))
        .try_init();
}
