//! Tracing/logging initialization.

use tracing_subscriber::fmt::time::SystemTime;
use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "info";

/// Initialize tracing/logging for the process.
///
/// Emits one JSON object per line so the log shipper can ingest records
/// without a parse step. Safe to call multiple times (subsequent calls are
/// no-ops), which keeps test binaries that race on the global subscriber
/// from panicking.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    // Targets stay in the output: the audit sink publishes on the `audit`
    // target and the downstream consumer filters on it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(SystemTime)
        .with_target(true)
        .try_init();
}
