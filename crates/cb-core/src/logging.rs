//! Logging setup for hosts and tests

use tracing_subscriber::{fmt, EnvFilter};

/// Install a fmt subscriber.
///
/// `filter` takes precedence over `RUST_LOG`; without either the level is
/// `info`. Returns false when a global subscriber was already installed.
pub fn init_logging(filter: Option<&str>) -> bool {
    let filter = match filter {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
