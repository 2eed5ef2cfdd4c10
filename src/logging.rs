//! Diagnostic logging with tracing.
//!
//! Report output goes through [`crate::logger::Logger`]; this is only for
//! diagnostics (join misses, corridor breaches, files written) on stderr.

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins when set, e.g. `RUST_LOG=tvsplit=debug`.
/// Otherwise the level is `warn` when `quiet`, `info` by default.
pub fn init(quiet: bool) {
    let default_level = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Subscriber for tests, output captured by the test harness
#[cfg(test)]
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
