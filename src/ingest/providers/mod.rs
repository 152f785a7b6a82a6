// src/ingest/providers/mod.rs
//! Built-in adapters, one per `SourceId`.

pub mod geo_ipapi;
pub mod google_news;
pub mod reddit;
pub mod rss_feeds;
pub mod shodan;
pub mod whois_rdap;

use std::sync::Arc;

use anyhow::Result;

use crate::config::OsintConfig;
use crate::ingest::http::build_client;
use crate::ingest::types::Provider;

pub use geo_ipapi::GeoIpApiProvider;
pub use google_news::GoogleNewsProvider;
pub use reddit::RedditProvider;
pub use rss_feeds::RssFeedsProvider;
pub use shodan::ShodanProvider;
pub use whois_rdap::WhoisRdapProvider;

/// Build every adapter from config. One HTTP client is shared by the adapters
/// of this set; credentials are copied into each adapter here and never read again.
pub fn build_all(cfg: &OsintConfig) -> Result<Vec<Arc<dyn Provider>>> {
    let client = build_client(&cfg.user_agent)?;
    let providers: Vec<Arc<dyn Provider>> = vec![
        Arc::new(WhoisRdapProvider::from_config(cfg, client.clone())),
        Arc::new(GeoIpApiProvider::from_config(cfg, client.clone())),
        Arc::new(ShodanProvider::from_config(cfg, client.clone())),
        Arc::new(RedditProvider::from_config(cfg, client.clone())),
        Arc::new(GoogleNewsProvider::from_config(cfg, client.clone())),
        Arc::new(RssFeedsProvider::from_config(cfg, client)),
    ];
    Ok(providers)
}
