// src/ingest/types.rs
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ingest::error::FetchError;

/// Per-adapter wait budget when nothing else is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Identifier of one external data origin.
///
/// Variants are declared alphabetically so the derived `Ord` matches the
/// lexical order of the serialized names (the key order of `provider_results`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceId {
    Geolocation,
    News,
    Portscan,
    Reddit,
    Rss,
    Whois,
}

/// Which kind of investigation a source belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Network,
    Topic,
}

impl Variant {
    pub fn as_str(self) -> &'static str {
        match self {
            Variant::Network => "network",
            Variant::Topic => "topic",
        }
    }
}

impl SourceId {
    pub const ALL: [SourceId; 6] = [
        SourceId::Geolocation,
        SourceId::News,
        SourceId::Portscan,
        SourceId::Reddit,
        SourceId::Rss,
        SourceId::Whois,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SourceId::Geolocation => "geolocation",
            SourceId::News => "news",
            SourceId::Portscan => "portscan",
            SourceId::Reddit => "reddit",
            SourceId::Rss => "rss",
            SourceId::Whois => "whois",
        }
    }

    pub fn variant(self) -> Variant {
        match self {
            SourceId::Geolocation | SourceId::Portscan | SourceId::Whois => Variant::Network,
            SourceId::News | SourceId::Reddit | SourceId::Rss => Variant::Topic,
        }
    }

    /// All sources of one variant, in key order.
    pub fn of_variant(variant: Variant) -> impl Iterator<Item = SourceId> {
        Self::ALL.into_iter().filter(move |s| s.variant() == variant)
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| format!("unknown source '{needle}'"))
    }
}

/// Terminal outcome of one adapter call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderStatus {
    Ok,
    /// Never invoked (capability missing or a prerequisite failed upstream).
    Unavailable,
    /// Invoked and failed.
    Error,
    /// Invoked and abandoned after its wait budget elapsed.
    Timeout,
}

impl ProviderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderStatus::Ok => "ok",
            ProviderStatus::Unavailable => "unavailable",
            ProviderStatus::Error => "error",
            ProviderStatus::Timeout => "timeout",
        }
    }
}

/// WHOIS/RDAP view of an address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhoisInfo {
    pub asn: Option<u32>,
    pub organization: Option<String>,
    pub network_range: Option<String>,
    pub country_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub city: Option<String>,
    pub country: Option<String>,
}

impl GeoPoint {
    /// "City, Country", or whichever half is known.
    pub fn label(&self) -> Option<String> {
        match (self.city.as_deref(), self.country.as_deref()) {
            (Some(city), Some(country)) => Some(format!("{city}, {country}")),
            (Some(one), None) | (None, Some(one)) => Some(one.to_string()),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServiceEntry {
    pub port: u16,
    pub protocol: String,
    pub service: String,
}

/// Open services ordered by `(port, protocol)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortScan {
    pub services: Vec<ServiceEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEntry {
    pub title: String,
    pub url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

/// What a text-collecting source (reddit/news/rss) gathered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedDigest {
    pub item_count: usize,
    pub items: Vec<FeedEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feeds_failed: Option<usize>,
}

impl FeedDigest {
    pub fn from_entries(items: Vec<FeedEntry>) -> Self {
        Self {
            item_count: items.len(),
            items,
            feeds_failed: None,
        }
    }
}

/// Normalized payload, one shape per source kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderPayload {
    Whois(WhoisInfo),
    Geolocation(GeoPoint),
    Portscan(PortScan),
    Feed(FeedDigest),
}

/// A piece of text waiting to be scored. Never serialized into the record.
#[derive(Debug, Clone, PartialEq)]
pub struct TextItem {
    pub source_id: SourceId,
    pub title: String,
    pub text: String,
    pub published_at: Option<DateTime<Utc>>,
}

/// What an adapter hands back on success.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderOutput {
    pub payload: ProviderPayload,
    pub text_items: Vec<TextItem>,
}

impl From<ProviderPayload> for ProviderOutput {
    fn from(payload: ProviderPayload) -> Self {
        Self {
            payload,
            text_items: Vec::new(),
        }
    }
}

/// Per-request item caps for the topic sources. `None` keeps the limit the
/// adapter was configured with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemLimits {
    pub reddit: Option<usize>,
    pub news: Option<usize>,
    pub rss_per_feed: Option<usize>,
}

impl ItemLimits {
    pub fn for_source(&self, id: SourceId) -> Option<usize> {
        match id {
            SourceId::Reddit => self.reddit,
            SourceId::News => self.news,
            SourceId::Rss => self.rss_per_feed,
            SourceId::Geolocation | SourceId::Portscan | SourceId::Whois => None,
        }
    }
}

/// Input injected into every adapter of one investigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderInput {
    Network {
        host: String,
        address: Option<IpAddr>,
    },
    Topic {
        keyword: String,
        limits: ItemLimits,
    },
}

impl ProviderInput {
    pub fn address(&self) -> Option<IpAddr> {
        match self {
            ProviderInput::Network { address, .. } => *address,
            ProviderInput::Topic { .. } => None,
        }
    }

    pub fn keyword(&self) -> Option<&str> {
        match self {
            ProviderInput::Topic { keyword, .. } => Some(keyword),
            ProviderInput::Network { .. } => None,
        }
    }

    /// Item cap requested for `id`, or `configured` when none was given.
    pub fn limit_for(&self, id: SourceId, configured: usize) -> usize {
        match self {
            ProviderInput::Topic { limits, .. } => limits.for_source(id).unwrap_or(configured),
            ProviderInput::Network { .. } => configured,
        }
    }

    pub fn require_address(&self) -> Result<IpAddr, FetchError> {
        self.address()
            .ok_or_else(|| FetchError::Provider("no resolvable address".into()))
    }

    pub fn require_keyword(&self) -> Result<&str, FetchError> {
        self.keyword()
            .ok_or_else(|| FetchError::Provider("no keyword supplied".into()))
    }
}

/// What an adapter needs from the target before it can be invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// The raw target is enough.
    Target,
    /// Needs the numeric address produced by upstream resolution.
    ResolvedAddress,
}

/// Whether an adapter can run at all (credentials, feed list, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability {
    Ready,
    Missing(String),
}

/// One external data source behind a uniform contract.
///
/// Adapters only translate; classification into a `ProviderResult`
/// (unavailable / error / timeout) happens at the aggregation boundary.
#[async_trait::async_trait]
pub trait Provider: Send + Sync {
    fn source_id(&self) -> SourceId;

    fn requirement(&self) -> Requirement {
        Requirement::Target
    }

    fn capability(&self) -> Capability {
        Capability::Ready
    }

    fn timeout(&self) -> Duration {
        DEFAULT_TIMEOUT
    }

    async fn fetch(&self, input: &ProviderInput) -> Result<ProviderOutput, FetchError>;
}
