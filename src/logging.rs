//! Logging configuration for query-gate.
//!
//! Everything goes to stderr so `query` output on stdout stays clean JSON.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset. sqlx logs every statement at info,
/// which would repeat each user query.
pub const DEFAULT_FILTER: &str = "info,sqlx=warn";

/// Initializes logging to stderr, honouring `RUST_LOG`.
pub fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}
