//! Tracing subscriber setup for widerow binaries and tests.
//!
//! Libraries in this workspace only emit `tracing` events; installing a
//! subscriber is left to the process entry point:
//! - `init_cli_subscriber()` - stderr logging filtered by `RUST_LOG`
//! - `init_test_subscriber()` - captured output for `cargo test`
//!
//! # Usage
//!
//! ```no_run
//! use widerow_core::telemetry;
//!
//! fn main() {
//!     telemetry::init_cli_subscriber("warn");
//!     tracing::info!("starting");
//! }
//! ```

use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

/// Environment variable consulted for filter directives.
pub const FILTER_ENV: &str = "RUST_LOG";

/// Build the filter from `RUST_LOG`, falling back to `default_directive`
/// when the variable is unset or unparsable.
pub fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_env(FILTER_ENV).unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// Initialize a stderr subscriber for command-line use.
///
/// Output goes to stderr so that stdout stays clean for command results.
/// Includes target, file and line number.
///
/// # Panics
/// Panics if a global subscriber has already been set.
pub fn init_cli_subscriber(default_directive: &str) {
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(env_filter(default_directive))
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

/// Initialize a subscriber whose output is captured by the test harness.
///
/// Safe to call from every test: only the first call installs the
/// subscriber, later calls are no-ops.
pub fn init_test_subscriber() {
    let _ = fmt::Subscriber::builder()
        .with_env_filter(env_filter("debug"))
        .with_test_writer()
        .with_target(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_falls_back_to_default() {
        let filter = env_filter("widerow_db=trace");
        assert!(!filter.to_string().is_empty());
    }

    #[test]
    fn test_init_test_subscriber_is_idempotent() {
        init_test_subscriber();
        init_test_subscriber();
        tracing::debug!("subscriber installed");
    }
}
