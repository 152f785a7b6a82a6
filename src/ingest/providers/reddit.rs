// src/ingest/providers/reddit.rs
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::config::OsintConfig;
use crate::ingest::error::FetchError;
use crate::ingest::http::{ensure_success, read_json};
use crate::ingest::{normalize_text, scoring_text};
use crate::ingest::types::{
    Capability, FeedDigest, FeedEntry, Provider, ProviderInput, ProviderOutput, ProviderPayload,
    SourceId, TextItem,
};

#[derive(Debug, Deserialize)]
struct TokenResp {
    access_token: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    #[serde(default)]
    title: String,
    #[serde(default)]
    selftext: String,
    created_utc: Option<f64>,
    permalink: Option<String>,
}

/// Reddit search through the OAuth API (application-only token).
pub struct RedditProvider {
    client: reqwest::Client,
    auth_url: String,
    api_base: String,
    client_id: String,
    client_secret: String,
    limit: usize,
    timeout: Duration,
}

impl RedditProvider {
    pub fn from_config(cfg: &OsintConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            auth_url: cfg.endpoints.reddit_auth_url.clone(),
            api_base: cfg.endpoints.reddit_api_base.clone(),
            client_id: cfg.credentials.reddit_client_id.clone(),
            client_secret: cfg.credentials.reddit_client_secret.clone(),
            limit: cfg.limits.reddit_limit,
            timeout: cfg.timeouts.for_source(SourceId::Reddit),
        }
    }

    async fn access_token(&self) -> Result<String, FetchError> {
        let resp = self
            .client
            .post(&self.auth_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;
        let token: TokenResp = read_json(resp).await?;
        match (token.access_token, token.error) {
            (Some(t), _) if !t.is_empty() => Ok(t),
            (_, Some(e)) => Err(FetchError::Provider(format!("reddit auth rejected: {e}"))),
            _ => Err(FetchError::Malformed("reddit auth: no access_token".into())),
        }
    }
}

/// Normalize a search listing into feed entries plus the text to score.
pub fn parse_listing(body: &[u8], limit: usize) -> Result<(FeedDigest, Vec<TextItem>), FetchError> {
    let listing: Listing = serde_json::from_slice(body)?;

    let mut entries = Vec::new();
    let mut items = Vec::new();
    for child in listing.data.children.into_iter().take(limit) {
        let post = child.data;
        let title = normalize_text(&post.title);
        let text = scoring_text(&post.title, &post.selftext);
        if text.is_empty() {
            continue;
        }
        let published_at = post
            .created_utc
            .filter(|t| t.is_finite() && *t >= 0.0)
            .and_then(|t| DateTime::<Utc>::from_timestamp(t as i64, 0));
        entries.push(FeedEntry {
            title: title.clone(),
            url: post.permalink.map(|p| format!("https://reddit.com{p}")),
            published_at,
        });
        items.push(TextItem {
            source_id: SourceId::Reddit,
            title,
            text,
            published_at,
        });
    }
    Ok((FeedDigest::from_entries(entries), items))
}

#[async_trait]
impl Provider for RedditProvider {
    fn source_id(&self) -> SourceId {
        SourceId::Reddit
    }

    fn capability(&self) -> Capability {
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            Capability::Missing("Reddit API credentials not configured".into())
        } else {
            Capability::Ready
        }
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self, input: &ProviderInput) -> Result<ProviderOutput, FetchError> {
        let keyword = input.require_keyword()?;
        let limit = input.limit_for(SourceId::Reddit, self.limit);
        let token = self.access_token().await?;
        let limit_param = limit.to_string();
        let resp = self
            .client
            .get(format!("{}/search", self.api_base))
            .bearer_auth(token)
            .query(&[
                ("q", keyword),
                ("limit", limit_param.as_str()),
                ("t", "week"),
                ("sort", "relevance"),
                ("raw_json", "1"),
            ])
            .send()
            .await?;
        let body = ensure_success(resp).await?.bytes().await?;
        let (digest, text_items) = parse_listing(&body, limit)?;
        Ok(ProviderOutput {
            payload: ProviderPayload::Feed(digest),
            text_items,
        })
    }
}
