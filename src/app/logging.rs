//! Tracing subscriber setup.
//!
//! Logs go to stderr so stdout carries only the reports. `RUST_LOG` overrides
//! the default `info` filter.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. A second call is a no-op.
pub fn init_tracing(json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let result = if json { builder.json().try_init() } else { builder.try_init() };
    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
