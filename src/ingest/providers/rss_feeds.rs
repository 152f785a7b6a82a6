// src/ingest/providers/rss_feeds.rs
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;

use crate::config::OsintConfig;
use crate::ingest::error::FetchError;
use crate::ingest::http::read_text;
use crate::ingest::rss::{parse_feed, RssEntry};
use crate::ingest::types::{
    Capability, FeedDigest, Provider, ProviderInput, ProviderOutput, ProviderPayload, SourceId,
};

/// Share of the source's wait budget granted to each feed.
const FEED_BUDGET_SHARE: f64 = 0.8;

/// Public RSS feeds filtered by keyword. Feeds are fetched concurrently;
/// the source fails only when every feed fails.
pub struct RssFeedsProvider {
    client: reqwest::Client,
    feeds: Vec<String>,
    limit_per_feed: usize,
    timeout: Duration,
}

impl RssFeedsProvider {
    pub fn new(
        client: reqwest::Client,
        feeds: Vec<String>,
        limit_per_feed: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            feeds,
            limit_per_feed,
            timeout,
        }
    }

    pub fn from_config(cfg: &OsintConfig, client: reqwest::Client) -> Self {
        Self::new(
            client,
            cfg.rss_feeds.clone(),
            cfg.limits.rss_limit_per_feed,
            cfg.timeouts.for_source(SourceId::Rss),
        )
    }

    /// Wait budget for a single feed; a feed that exceeds it counts as failed.
    fn feed_budget(&self) -> Duration {
        self.timeout.mul_f64(FEED_BUDGET_SHARE)
    }

    async fn fetch_feed(&self, url: &str) -> Result<Vec<RssEntry>, FetchError> {
        let resp = self.client.get(url).send().await?;
        let xml = read_text(resp).await?;
        parse_feed(&xml)
    }

    async fn fetch_one(&self, url: &str) -> Result<Vec<RssEntry>, FetchError> {
        let budget = self.feed_budget();
        match tokio::time::timeout(budget, self.fetch_feed(url)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(FetchError::Transport(format!(
                "no response within {} ms",
                budget.as_millis()
            ))),
        }
    }
}

/// Merge per-feed outcomes (in feed order) into one output.
pub fn merge_feeds(
    outcomes: Vec<(String, Result<Vec<RssEntry>, FetchError>)>,
    keyword: &str,
    limit_per_feed: usize,
) -> Result<ProviderOutput, FetchError> {
    let total = outcomes.len();
    let mut failed = 0usize;
    let mut first_error: Option<String> = None;
    let mut entries = Vec::new();
    let mut text_items = Vec::new();

    for (url, outcome) in outcomes {
        match outcome {
            Ok(items) => {
                for entry in items
                    .into_iter()
                    .take(limit_per_feed)
                    .filter(|e| e.mentions(keyword))
                {
                    let (fe, ti) = entry.into_parts(SourceId::Rss);
                    entries.push(fe);
                    text_items.push(ti);
                }
            }
            Err(e) => {
                tracing::warn!(feed = %url, error = %e, "rss feed failed");
                failed += 1;
                first_error.get_or_insert_with(|| format!("{url}: {e}"));
            }
        }
    }

    if total > 0 && failed == total {
        return Err(FetchError::Provider(format!(
            "all {total} feeds failed (first: {})",
            first_error.unwrap_or_default()
        )));
    }

    let mut digest = FeedDigest::from_entries(entries);
    digest.feeds_failed = Some(failed);
    Ok(ProviderOutput {
        payload: ProviderPayload::Feed(digest),
        text_items,
    })
}

#[async_trait]
impl Provider for RssFeedsProvider {
    fn source_id(&self) -> SourceId {
        SourceId::Rss
    }

    fn capability(&self) -> Capability {
        if self.feeds.is_empty() {
            Capability::Missing("no RSS feeds configured".into())
        } else {
            Capability::Ready
        }
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self, input: &ProviderInput) -> Result<ProviderOutput, FetchError> {
        let keyword = input.require_keyword()?;
        let limit_per_feed = input.limit_for(SourceId::Rss, self.limit_per_feed);
        let outcomes = join_all(self.feeds.iter().map(|url| async move {
            (url.clone(), self.fetch_one(url).await)
        }))
        .await;
        merge_feeds(outcomes, keyword, limit_per_feed)
    }
}
