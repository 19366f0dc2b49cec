//! Logging utilities
//!
//! Tracing subscriber setup for binaries embedding the writer.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Build the filter from `RUST_LOG`, falling back to `log_level`
pub fn env_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level))
}

/// Initialize a JSON console subscriber.
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(log_level: &str) -> Result<(), tracing_subscriber::util::TryInitError> {
    let console_layer = fmt::layer()
        .json()
        .with_target(true)
        .with_filter(env_filter(log_level));

    tracing_subscriber::registry().with(console_layer).try_init()
}
