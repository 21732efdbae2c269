//! Logging initialization and configuration.

use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

/// Filter used when nothing else is configured.
pub const DEFAULT_FILTER: &str = "bridgectl=info";

/// Install the subscriber using `RUST_LOG`, falling back to
/// [`DEFAULT_FILTER`].
///
/// Returns `Err` if a global subscriber is already set.
pub fn try_init() -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| filter_for(""));
    install(filter)
}

/// Install the subscriber with an explicit level or filter directive.
///
/// A bare level such as `debug` applies to this crate only; anything
/// containing `=` or `,` is used as a full directive.
pub fn init_with_filter(level: &str) -> Result<(), TryInitError> {
    install(filter_for(level))
}

// stdout carries JSON responses, so log lines go to stderr.
fn install(filter: EnvFilter) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .try_init()
}

/// Build the filter for a configured level.
pub fn filter_for(level: &str) -> EnvFilter {
    let level = level.trim();
    let directive = if level.is_empty() {
        DEFAULT_FILTER.to_string()
    } else if level.contains('=') || level.contains(',') {
        level.to_string()
    } else {
        format!("bridgectl={}", level)
    };
    EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}
