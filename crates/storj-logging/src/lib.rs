//! Centralized logging setup shared by every storj binary.
//!
//! Every process (satellite, storage node, uplink CLI) calls [`init`] exactly
//! once at start-up rather than constructing its own `tracing` subscriber, so
//! that filter syntax and color handling stay identical across the fleet.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

/// Environment variable consulted for the log filter, falling back to `info`.
pub const LOG_ENV_VAR: &str = "STORJ_LOG";

/// Initialize the global `tracing` subscriber.
///
/// Safe to call multiple times in tests; subsequent calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("info"));
    let ansi = supports_color::on(supports_color::Stream::Stderr).is_some();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(ansi)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .try_init();
}
