//! Fan-out, merge and summary for both investigation variants.
//!
//! Every configured source is dispatched concurrently through the adapter
//! boundary; the aggregator waits on one join barrier and only then merges.
//! Adapter faults never fail an investigation. The only fatal errors are an
//! invalid target (rejected before any I/O) and a merge defect.

pub mod boundary;
pub mod clock;
pub mod record;
pub mod summary;

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use metrics::counter;
use thiserror::Error;

use crate::config::OsintConfig;
use crate::ingest::providers::build_all;
use crate::ingest::types::{Provider, ProviderInput, SourceId, TextItem, Variant};
use crate::sentiment::{default_scorers, Scorer};
use crate::target::{parse_host, resolve, Resolver, SystemResolver, Target, TargetError, TopicTarget};

pub use boundary::run_provider;
pub use clock::{Clock, FixedClock, SystemClock};
pub use record::{AggregateRecord, ProviderResult};
pub use summary::{
    Distribution, MethodSummary, NetworkSummary, Outcomes, ScoredItem, Summary, TopItem,
    TopicSummary, TOP_ITEMS,
};

pub const NO_ADAPTER: &str = "no adapter configured";

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error(transparent)]
    Target(#[from] TargetError),
    /// A defect in merge logic, never an external fault.
    #[error("merge failed: {0}")]
    Merge(String),
}

pub struct Aggregator {
    providers: BTreeMap<SourceId, Arc<dyn Provider>>,
    scorers: Vec<Arc<dyn Scorer>>,
    resolver: Arc<dyn Resolver>,
    clock: Arc<dyn Clock>,
}

impl Aggregator {
    /// No adapters, both built-in scorers, wall clock.
    pub fn new(resolver: Arc<dyn Resolver>) -> Self {
        Self {
            providers: BTreeMap::new(),
            scorers: default_scorers(),
            resolver,
            clock: Arc::new(SystemClock),
        }
    }

    /// All built-in adapters with credentials from `cfg`, system resolver.
    pub fn from_config(cfg: &OsintConfig) -> anyhow::Result<Self> {
        let mut agg = Self::new(Arc::new(SystemResolver));
        for p in build_all(cfg)? {
            agg = agg.with_provider(p);
        }
        Ok(agg)
    }

    /// Register an adapter; replaces any adapter already registered for its source.
    pub fn with_provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.providers.insert(provider.source_id(), provider);
        self
    }

    pub fn with_scorers(mut self, scorers: Vec<Arc<dyn Scorer>>) -> Self {
        self.scorers = scorers;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn sources(&self) -> impl Iterator<Item = SourceId> + '_ {
        self.providers.keys().copied()
    }

    /// Variant A. Resolution runs once here and its outcome is shared by
    /// every address-bound adapter.
    pub async fn investigate_network(&self, raw: &str) -> Result<AggregateRecord, AggregateError> {
        let parsed = parse_host(raw)?;
        let target = resolve(parsed, self.resolver.as_ref()).await;
        tracing::info!(host = %target.host, address = ?target.resolved_address(), "network investigation");

        let input = ProviderInput::Network {
            host: target.host.clone(),
            address: target.resolved_address(),
        };
        let (results, _) = self
            .fan_out(SourceId::of_variant(Variant::Network).collect(), input)
            .await?;

        let summary = Summary::Network(NetworkSummary::build(target.resolved_address(), &results));
        counter!("investigations_total", "variant" => Variant::Network.as_str()).increment(1);
        Ok(AggregateRecord::new(
            Target::Network(target),
            results,
            summary,
            self.clock.now(),
        ))
    }

    /// Variant B. Text from every successful source is scored by every scorer.
    pub async fn investigate_topic(
        &self,
        target: TopicTarget,
    ) -> Result<AggregateRecord, AggregateError> {
        tracing::info!(keyword = %target.keyword, sources = target.requested_sources.len(), "topic investigation");

        let input = ProviderInput::Topic {
            keyword: target.keyword.clone(),
            limits: target.limits,
        };
        let configured: Vec<SourceId> = target.requested_sources.iter().copied().collect();
        let (results, items) = self.fan_out(configured, input).await?;

        let summary = Summary::Topic(TopicSummary::build(
            &target.requested_sources,
            &results,
            items,
            &self.scorers,
        ));
        counter!("investigations_total", "variant" => Variant::Topic.as_str()).increment(1);
        Ok(AggregateRecord::new(
            Target::Topic(target),
            results,
            summary,
            self.clock.now(),
        ))
    }

    async fn fan_out(
        &self,
        configured: Vec<SourceId>,
        input: ProviderInput,
    ) -> Result<(BTreeMap<SourceId, ProviderResult>, Vec<TextItem>), AggregateError> {
        let calls = configured.iter().map(|id| {
            let provider = self.providers.get(id).cloned();
            let input = input.clone();
            let clock = Arc::clone(&self.clock);
            let id = *id;
            async move {
                match provider {
                    Some(p) => run_provider(p, input, clock).await,
                    None => (ProviderResult::unavailable(id, NO_ADAPTER, clock.now()), Vec::new()),
                }
            }
        });
        let outcomes = join_all(calls).await;

        let mut results = BTreeMap::new();
        let mut items = Vec::new();
        for (expected, (result, texts)) in configured.iter().zip(outcomes) {
            if result.source_id() != *expected {
                return Err(AggregateError::Merge(format!(
                    "adapter registered for {expected} reported {}",
                    result.source_id()
                )));
            }
            if results.insert(*expected, result).is_some() {
                return Err(AggregateError::Merge(format!("duplicate result for {expected}")));
            }
            items.extend(texts);
        }
        Ok((results, items))
    }
}
