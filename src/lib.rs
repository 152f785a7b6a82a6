// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod aggregate;
pub mod api;
pub mod config;
pub mod ingest;
pub mod metrics;
pub mod report;
pub mod sentiment;
pub mod target;

// ---- Re-exports for stable public API ----
pub use crate::aggregate::{AggregateError, AggregateRecord, Aggregator, ProviderResult};
pub use crate::api::router;
pub use crate::config::OsintConfig;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber. `LOG_FORMAT=json` switches to JSON lines.
///
/// Returns quietly when a subscriber is already set (the shuttle runtime
/// installs its own).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("osint_aggregator=info,warn"));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    let res = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
