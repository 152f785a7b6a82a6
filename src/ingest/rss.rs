// src/ingest/rss.rs
//! RSS 2.0 parsing shared by the news and feed adapters.

use chrono::{DateTime, Utc};
use quick_xml::de::from_str;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::ingest::error::FetchError;
use crate::ingest::{normalize_text, scoring_text};
use crate::ingest::types::{FeedEntry, SourceId, TextItem};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

/// One parsed `<item>`. `title` and `description` are display-normalized;
/// `text` keeps the punctuation the scorers read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RssEntry {
    pub title: String,
    pub description: String,
    pub text: String,
    pub link: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

impl RssEntry {
    /// Case-insensitive keyword match on title or description.
    pub fn mentions(&self, keyword: &str) -> bool {
        let needle = keyword.to_lowercase();
        self.title.to_lowercase().contains(&needle)
            || self.description.to_lowercase().contains(&needle)
    }

    /// Split into the record-facing entry and the text handed to scorers.
    pub fn into_parts(self, source_id: SourceId) -> (FeedEntry, TextItem) {
        let entry = FeedEntry {
            title: self.title.clone(),
            url: self.link,
            published_at: self.published_at,
        };
        let item = TextItem {
            source_id,
            title: self.title,
            text: self.text,
            published_at: self.published_at,
        };
        (entry, item)
    }
}

pub fn parse_rfc2822(ts: &str) -> Option<DateTime<Utc>> {
    OffsetDateTime::parse(ts.trim(), &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

/// Parse an RSS document; entries with neither title nor description are dropped.
pub fn parse_feed(xml: &str) -> Result<Vec<RssEntry>, FetchError> {
    let xml_clean = scrub_html_entities_for_xml(xml);
    let rss: Rss = from_str(&xml_clean)?;

    let mut out = Vec::with_capacity(rss.channel.item.len());
    for it in rss.channel.item {
        let raw_title = it.title.as_deref().unwrap_or_default();
        let raw_description = it.description.as_deref().unwrap_or_default();
        let title = normalize_text(raw_title);
        let description = normalize_text(raw_description);
        if title.is_empty() && description.is_empty() {
            continue;
        }
        out.push(RssEntry {
            title,
            description,
            text: scoring_text(raw_title, raw_description),
            link: it.link.map(|l| l.trim().to_string()).filter(|l| !l.is_empty()),
            published_at: it.pub_date.as_deref().and_then(parse_rfc2822),
        });
    }
    Ok(out)
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
