//! Logging initialization.
//!
//! One subscriber for the whole process: an env-filter layered with either
//! the human-readable formatter or line-JSON (`LOG_FORMAT=json`), so the
//! same `tracing` calls serve development and log shippers. Access lines
//! are ordinary events on the `access` target.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. Call once, before anything logs.
pub fn init(filter: &str, json: bool) {
    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
