// src/ingest/providers/google_news.rs
use std::time::Duration;

use async_trait::async_trait;

use crate::config::OsintConfig;
use crate::ingest::error::FetchError;
use crate::ingest::http::read_text;
use crate::ingest::rss::parse_feed;
use crate::ingest::types::{
    FeedDigest, Provider, ProviderInput, ProviderOutput, ProviderPayload, SourceId,
};

/// Items on one Google News result page.
pub const NEWS_PAGE_SIZE: usize = 10;

/// Keyword search over the Google News RSS endpoint.
pub struct GoogleNewsProvider {
    client: reqwest::Client,
    base: String,
    limit: usize,
    timeout: Duration,
}

impl GoogleNewsProvider {
    pub fn from_config(cfg: &OsintConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            base: cfg.endpoints.google_news_base.clone(),
            limit: cfg.limits.news_limit,
            timeout: cfg.timeouts.for_source(SourceId::News),
        }
    }
}

/// Parse a search result feed, keeping at most `limit` entries.
pub fn parse_news(xml: &str, limit: usize) -> Result<ProviderOutput, FetchError> {
    let (entries, text_items): (Vec<_>, Vec<_>) = parse_feed(xml)?
        .into_iter()
        .take(limit)
        .map(|e| e.into_parts(SourceId::News))
        .unzip();
    Ok(ProviderOutput {
        payload: ProviderPayload::Feed(FeedDigest::from_entries(entries)),
        text_items,
    })
}

#[async_trait]
impl Provider for GoogleNewsProvider {
    fn source_id(&self) -> SourceId {
        SourceId::News
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self, input: &ProviderInput) -> Result<ProviderOutput, FetchError> {
        let keyword = input.require_keyword()?;
        let resp = self
            .client
            .get(format!("{}/rss/search", self.base))
            .query(&[
                ("q", keyword),
                ("hl", "en-US"),
                ("gl", "US"),
                ("ceid", "US:en"),
            ])
            .send()
            .await?;
        let xml = read_text(resp).await?;
        parse_news(&xml, input.limit_for(SourceId::News, self.limit))
    }
}
