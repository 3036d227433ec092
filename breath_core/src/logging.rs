//! Tracing setup for the `breathe` binary.
//!
//! Logs go to stderr so stdout carries only the plan and countdown.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default filter for a `-v` count: info, then debug, then trace
pub fn level_for_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Initialize logging with a specific default level
///
/// RUST_LOG still wins when set. Calling this twice is harmless.
pub fn init_with_level(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_target(false).with_writer(std::io::stderr))
        .try_init();
}

/// Initialize logging for testing (captures logs for test output)
#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("debug"))
        .try_init();
}
