//! Diagnostic logging setup using `tracing-subscriber`.
//!
//! Status lines for the operator go to stdout; tracing output goes to stderr
//! and is quiet unless `RUST_LOG` asks for more.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "warn";

/// Build the filter from `RUST_LOG`, falling back to [`DEFAULT_FILTER`].
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initialise console logging on stderr.
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init_cli() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
