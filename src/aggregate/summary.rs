//! Derived fields folded into the record after the join barrier.

use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Serialize;

use crate::aggregate::record::ProviderResult;
use crate::ingest::types::{ProviderPayload, ProviderStatus, SourceId, TextItem};
use crate::sentiment::{Polarity, Scorer, SentimentScore};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum Summary {
    Network(NetworkSummary),
    Topic(TopicSummary),
}

/// Outcome counts over every configured source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Outcomes {
    pub ok: usize,
    pub unavailable: usize,
    pub error: usize,
    pub timeout: usize,
}

impl Outcomes {
    pub fn count(results: &BTreeMap<SourceId, ProviderResult>) -> Self {
        let mut out = Self::default();
        for r in results.values() {
            match r.status() {
                ProviderStatus::Ok => out.ok += 1,
                ProviderStatus::Unavailable => out.unavailable += 1,
                ProviderStatus::Error => out.error += 1,
                ProviderStatus::Timeout => out.timeout += 1,
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkSummary {
    pub resolved_address: Option<IpAddr>,
    pub dominant_location: Option<String>,
    pub asn: Option<u32>,
    pub organization: Option<String>,
    /// `None` unless the port scan succeeded; zero means nothing is open.
    pub open_port_count: Option<usize>,
    pub outcomes: Outcomes,
}

impl NetworkSummary {
    pub fn build(
        resolved_address: Option<IpAddr>,
        results: &BTreeMap<SourceId, ProviderResult>,
    ) -> Self {
        let mut summary = Self {
            resolved_address,
            dominant_location: None,
            asn: None,
            organization: None,
            open_port_count: None,
            outcomes: Outcomes::count(results),
        };

        for payload in results.values().filter_map(ProviderResult::payload) {
            match payload {
                ProviderPayload::Whois(w) => {
                    summary.asn = w.asn;
                    summary.organization = w.organization.clone();
                }
                ProviderPayload::Geolocation(g) => summary.dominant_location = g.label(),
                ProviderPayload::Portscan(p) => summary.open_port_count = Some(p.services.len()),
                ProviderPayload::Feed(_) => {}
            }
        }
        summary
    }
}

/// Items listed per method in `top_items`.
pub const TOP_ITEMS: usize = 10;

/// Polarity counts, their shares in percent and the mean compound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Distribution {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
    pub total: usize,
    pub positive_percent: f64,
    pub negative_percent: f64,
    pub neutral_percent: f64,
    pub mean_compound: f64,
}

impl Distribution {
    fn add(&mut self, score: &SentimentScore) {
        match score.polarity {
            Polarity::Positive => self.positive += 1,
            Polarity::Negative => self.negative += 1,
            Polarity::Neutral => self.neutral += 1,
        }
        self.total += 1;
        // Running sum; divided once in `finish`.
        self.mean_compound += score.compound;
    }

    fn finish(&mut self) {
        if self.total > 0 {
            let total = self.total as f64;
            self.mean_compound /= total;
            self.positive_percent = self.positive as f64 * 100.0 / total;
            self.negative_percent = self.negative as f64 * 100.0 / total;
            self.neutral_percent = self.neutral as f64 * 100.0 / total;
        }
    }

    /// Strict plurality, neutral on any tie.
    pub fn dominant(&self) -> Polarity {
        if self.positive > self.negative && self.positive > self.neutral {
            Polarity::Positive
        } else if self.negative > self.positive && self.negative > self.neutral {
            Polarity::Negative
        } else {
            Polarity::Neutral
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodSummary {
    pub overall: Distribution,
    pub per_source: BTreeMap<SourceId, Distribution>,
    pub dominant: Polarity,
    /// Strongest opinions first (largest `|compound|`); degraded scores excluded.
    pub top_items: Vec<TopItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopItem {
    pub source_id: SourceId,
    pub title: String,
    pub polarity: Polarity,
    pub compound: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredItem {
    pub source_id: SourceId,
    pub title: String,
    pub published_at: Option<DateTime<Utc>>,
    pub scores: Vec<SentimentScore>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicSummary {
    pub methods: BTreeMap<String, MethodSummary>,
    pub items: Vec<ScoredItem>,
    pub degraded_items: usize,
    pub outcomes: Outcomes,
}

impl TopicSummary {
    /// Score every item with every scorer. Each requested source gets a
    /// `per_source` entry even when it contributed nothing.
    pub fn build(
        requested: &BTreeSet<SourceId>,
        results: &BTreeMap<SourceId, ProviderResult>,
        mut items: Vec<TextItem>,
        scorers: &[Arc<dyn Scorer>],
    ) -> Self {
        // Stable: items of one source with equal timestamps keep fetch order.
        items.sort_by(|a, b| {
            (a.source_id, a.published_at).cmp(&(b.source_id, b.published_at))
        });

        let mut methods: BTreeMap<String, MethodSummary> = scorers
            .iter()
            .map(|s| {
                let per_source = requested
                    .iter()
                    .map(|id| (*id, Distribution::default()))
                    .collect();
                (
                    s.method().to_string(),
                    MethodSummary {
                        overall: Distribution::default(),
                        per_source,
                        dominant: Polarity::Neutral,
                        top_items: Vec::new(),
                    },
                )
            })
            .collect();

        let mut degraded_items = 0usize;
        let mut scored = Vec::with_capacity(items.len());
        for item in items {
            let scores: Vec<SentimentScore> = scorers.iter().map(|s| s.score(&item.text)).collect();
            if scores.iter().any(|s| s.degraded) {
                degraded_items += 1;
            }
            for score in &scores {
                if score.degraded {
                    counter!("scoring_degraded_total", "method" => score.method.clone())
                        .increment(1);
                }
                if let Some(m) = methods.get_mut(&score.method) {
                    m.overall.add(score);
                    m.per_source.entry(item.source_id).or_default().add(score);
                }
            }
            scored.push(ScoredItem {
                source_id: item.source_id,
                title: item.title,
                published_at: item.published_at,
                scores,
            });
        }

        for (method, m) in methods.iter_mut() {
            m.overall.finish();
            m.per_source.values_mut().for_each(Distribution::finish);
            m.dominant = m.overall.dominant();
            m.top_items = top_items(method, &scored);
        }

        Self {
            methods,
            items: scored,
            degraded_items,
            outcomes: Outcomes::count(results),
        }
    }
}

/// Up to `TOP_ITEMS` items ranked by `|compound|` for one method. The sort is
/// stable, so equal magnitudes keep item order.
fn top_items(method: &str, items: &[ScoredItem]) -> Vec<TopItem> {
    let mut ranked: Vec<TopItem> = items
        .iter()
        .filter_map(|item| {
            let score = item
                .scores
                .iter()
                .find(|s| s.method == method && !s.degraded)?;
            Some(TopItem {
                source_id: item.source_id,
                title: item.title.clone(),
                polarity: score.polarity,
                compound: score.compound,
            })
        })
        .collect();
    ranked.sort_by(|a, b| b.compound.abs().total_cmp(&a.compound.abs()));
    ranked.truncate(TOP_ITEMS);
    ranked
}
