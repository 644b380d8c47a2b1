//! ---
//! edc_section: "04-logging"
//! edc_subsection: "module"
//! edc_type: "source"
//! edc_scope: "code"
//! edc_description: "Structured logging bootstrap."
//! edc_version: "v0.0.0-prealpha"
//! edc_owner: "tbd"
//! ---
#![warn(missing_docs)]

use tracing::Level;
use tracing_subscriber::{fmt as subscriber_fmt, prelude::*, EnvFilter, Registry};

/// Initialize a baseline tracing subscriber at INFO, honoring `RUST_LOG`.
///
/// Safe to call repeatedly; later calls are no-ops.
pub fn init() {
    init_with_level(Level::INFO);
}

/// Initialize the subscriber with an explicit default level.
pub fn init_with_level(level: Level) {
    let _ = Registry::default()
        .with(EnvFilter::from_default_env().add_directive(level.into()))
        .with(subscriber_fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
