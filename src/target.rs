//! Investigation targets and the one-time address resolution that precedes fan-out.
//!
//! Variant A targets accept an IP literal, a hostname or a URL; the host part is
//! resolved exactly once and the outcome is stored, whatever it is. Variant B
//! targets are a keyword plus the set of sources requested for it.

use std::collections::BTreeSet;
use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::ingest::types::{ItemLimits, SourceId, Variant};

const RESOLVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound for any per-request item cap.
pub const MAX_ITEM_LIMIT: usize = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("target is empty")]
    EmptyTarget,
    #[error("keyword is required")]
    EmptyKeyword,
    #[error("source '{0}' does not apply to topic investigations")]
    UnsupportedSource(SourceId),
    #[error("{0} must be between 1 and {max}", max = MAX_ITEM_LIMIT)]
    InvalidLimit(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    /// The input already was an IP literal.
    Literal,
    Resolved,
    NotFound,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub status: ResolutionStatus,
    pub address: Option<IpAddr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkTarget {
    pub raw_input: String,
    pub host: String,
    pub resolution: Resolution,
}

impl NetworkTarget {
    pub fn resolved_address(&self) -> Option<IpAddr> {
        self.resolution.address
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicTarget {
    pub keyword: String,
    pub requested_sources: BTreeSet<SourceId>,
    pub limits: ItemLimits,
}

impl TopicTarget {
    /// Validate a keyword and source selection. An empty selection means
    /// every topic source.
    pub fn new(
        keyword: &str,
        requested: impl IntoIterator<Item = SourceId>,
    ) -> Result<Self, TargetError> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(TargetError::EmptyKeyword);
        }
        let mut requested_sources = BTreeSet::new();
        for id in requested {
            if id.variant() != Variant::Topic {
                return Err(TargetError::UnsupportedSource(id));
            }
            requested_sources.insert(id);
        }
        if requested_sources.is_empty() {
            requested_sources.extend(SourceId::of_variant(Variant::Topic));
        }
        Ok(Self {
            keyword: keyword.to_string(),
            requested_sources,
            limits: ItemLimits::default(),
        })
    }

    /// Attach per-request item caps; each must lie in `1..=MAX_ITEM_LIMIT`.
    pub fn with_limits(mut self, limits: ItemLimits) -> Result<Self, TargetError> {
        for (name, value) in [
            ("reddit_limit", limits.reddit),
            ("news_limit", limits.news),
            ("rss_limit", limits.rss_per_feed),
        ] {
            if value.is_some_and(|n| n == 0 || n > MAX_ITEM_LIMIT) {
                return Err(TargetError::InvalidLimit(name));
            }
        }
        self.limits = limits;
        Ok(self)
    }
}

/// Either investigation subject, as stored in the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum Target {
    Network(NetworkTarget),
    Topic(TopicTarget),
}

/// Host part of a raw network target, before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedHost {
    pub raw_input: String,
    pub host: String,
    pub literal: Option<IpAddr>,
}

/// Strip scheme, credentials, path and port; lower-case the host.
pub fn parse_host(raw: &str) -> Result<ParsedHost, TargetError> {
    let raw_input = raw.trim().to_string();
    let mut rest = raw_input.as_str();
    if let Some((_, after)) = rest.split_once("://") {
        rest = after;
    }
    rest = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if let Some((_, after)) = rest.rsplit_once('@') {
        rest = after;
    }

    let host = if let Some(inner) = rest.strip_prefix('[') {
        // [v6]:port
        inner.split(']').next().unwrap_or_default()
    } else if rest.parse::<IpAddr>().is_ok() {
        rest
    } else {
        rest.rsplit_once(':')
            .filter(|(_, port)| port.chars().all(|c| c.is_ascii_digit()))
            .map(|(h, _)| h)
            .unwrap_or(rest)
    };
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    if host.is_empty() {
        return Err(TargetError::EmptyTarget);
    }

    Ok(ParsedHost {
        literal: host.parse().ok(),
        raw_input,
        host,
    })
}

/// Why a hostname did not resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveFailure {
    NotFound(String),
    Failed(String),
}

/// Name resolution seam; the system resolver in production, a table in tests.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, ResolveFailure>;
}

/// Resolves through the OS resolver (`getaddrinfo`) on tokio's blocking pool.
#[derive(Debug, Clone, Default)]
pub struct SystemResolver;

#[async_trait]
impl Resolver for SystemResolver {
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, ResolveFailure> {
        let lookup = tokio::net::lookup_host((host, 0));
        match tokio::time::timeout(RESOLVE_TIMEOUT, lookup).await {
            Err(_) => Err(ResolveFailure::Failed("resolution timed out".into())),
            Ok(Err(e)) => {
                let msg = e.to_string();
                let lower = msg.to_ascii_lowercase();
                if lower.contains("not known")
                    || lower.contains("no such host")
                    || lower.contains("nodename nor servname")
                    || lower.contains("no address associated")
                {
                    Err(ResolveFailure::NotFound(msg))
                } else {
                    Err(ResolveFailure::Failed(msg))
                }
            }
            Ok(Ok(addrs)) => Ok(addrs.map(|sa| sa.ip()).collect()),
        }
    }
}

/// Resolve once. IPv4 is preferred so address-bound sources agree on one answer.
pub async fn resolve(parsed: ParsedHost, resolver: &dyn Resolver) -> NetworkTarget {
    let resolution = match parsed.literal {
        Some(ip) => Resolution {
            status: ResolutionStatus::Literal,
            address: Some(ip),
            detail: None,
        },
        None => match resolver.resolve(&parsed.host).await {
            Ok(addrs) => match addrs.iter().find(|a| a.is_ipv4()).or(addrs.first()) {
                Some(ip) => Resolution {
                    status: ResolutionStatus::Resolved,
                    address: Some(*ip),
                    detail: None,
                },
                None => Resolution {
                    status: ResolutionStatus::NotFound,
                    address: None,
                    detail: Some(format!("could not resolve {}: no addresses", parsed.host)),
                },
            },
            Err(ResolveFailure::NotFound(why)) => Resolution {
                status: ResolutionStatus::NotFound,
                address: None,
                detail: Some(format!("could not resolve {}: {why}", parsed.host)),
            },
            Err(ResolveFailure::Failed(why)) => Resolution {
                status: ResolutionStatus::Error,
                address: None,
                detail: Some(format!("resolver error for {}: {why}", parsed.host)),
            },
        },
    };

    match resolution.status {
        ResolutionStatus::NotFound | ResolutionStatus::Error => {
            tracing::warn!(host = %parsed.host, detail = ?resolution.detail, "target did not resolve")
        }
        _ => tracing::debug!(host = %parsed.host, address = ?resolution.address, "target resolved"),
    }

    NetworkTarget {
        raw_input: parsed.raw_input,
        host: parsed.host,
        resolution,
    }
}
