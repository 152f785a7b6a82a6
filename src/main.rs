//! OSINT aggregation service: binary entrypoint
//! Boots the Axum HTTP server with the aggregator built from config.

use osint_aggregator::{api, config::OsintConfig, init_tracing, metrics::Metrics, Aggregator};
use shuttle_axum::ShuttleAxum;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    // This makes SHODAN_API_KEY / REDDIT_* visible to the "ENV" credentials.
    let _ = dotenvy::dotenv();

    init_tracing();

    let cfg = OsintConfig::load_default()?;
    let aggregator = Aggregator::from_config(&cfg)?;
    tracing::info!(
        sources = ?aggregator.sources().collect::<Vec<_>>(),
        feeds = cfg.rss_feeds.len(),
        "aggregator ready"
    );

    let mut router = api::router(api::AppState::new(aggregator));
    match Metrics::init() {
        Ok(metrics) => router = router.merge(metrics.router()),
        Err(e) => tracing::warn!(error = %e, "metrics disabled"),
    }

    Ok(router.into())
}
