// tests/common/mod.rs
//
// Shared helpers: scripted adapters, a table resolver, a fixed clock and a
// local axum server for HTTP-level adapter tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;

use osint_aggregator::aggregate::{Aggregator, FixedClock};
use osint_aggregator::ingest::error::FetchError;
use osint_aggregator::ingest::types::{
    Capability, Provider, ProviderInput, ProviderOutput, ProviderPayload, Requirement, SourceId,
    TextItem,
};
use osint_aggregator::target::{ResolveFailure, Resolver};

/// 2025-10-06T10:00:00Z
pub const FIXED_NOW: i64 = 1_759_744_800;

#[derive(Clone)]
pub enum Behaviour {
    Succeed(ProviderOutput),
    Fail(String),
    Panic,
}

/// Adapter double with a call counter and an optional artificial delay.
pub struct Stub {
    pub id: SourceId,
    pub requirement: Requirement,
    pub capability: Capability,
    pub delay: Duration,
    pub timeout: Duration,
    pub behaviour: Behaviour,
    pub calls: Arc<AtomicUsize>,
    /// Set only if the fetch body ran to completion.
    pub completed: Arc<AtomicBool>,
}

impl Stub {
    pub fn ok(id: SourceId, payload: ProviderPayload) -> Self {
        Self::with(id, Behaviour::Succeed(payload.into()))
    }

    pub fn output(id: SourceId, output: ProviderOutput) -> Self {
        Self::with(id, Behaviour::Succeed(output))
    }

    pub fn failing(id: SourceId, message: &str) -> Self {
        Self::with(id, Behaviour::Fail(message.to_string()))
    }

    pub fn panicking(id: SourceId) -> Self {
        Self::with(id, Behaviour::Panic)
    }

    fn with(id: SourceId, behaviour: Behaviour) -> Self {
        Self {
            id,
            requirement: Requirement::Target,
            capability: Capability::Ready,
            delay: Duration::ZERO,
            timeout: Duration::from_secs(5),
            behaviour,
            calls: Arc::new(AtomicUsize::new(0)),
            completed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn needs_address(mut self) -> Self {
        self.requirement = Requirement::ResolvedAddress;
        self
    }

    pub fn missing(mut self, reason: &str) -> Self {
        self.capability = Capability::Missing(reason.to_string());
        self
    }

    pub fn slow(mut self, delay: Duration, timeout: Duration) -> Self {
        self.delay = delay;
        self.timeout = timeout;
        self
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    pub fn completed(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.completed)
    }
}

#[async_trait]
impl Provider for Stub {
    fn source_id(&self) -> SourceId {
        self.id
    }

    fn requirement(&self) -> Requirement {
        self.requirement
    }

    fn capability(&self) -> Capability {
        self.capability.clone()
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self, _input: &ProviderInput) -> Result<ProviderOutput, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.completed.store(true, Ordering::SeqCst);
        match &self.behaviour {
            Behaviour::Succeed(out) => Ok(out.clone()),
            Behaviour::Fail(msg) => Err(FetchError::Transport(msg.clone())),
            Behaviour::Panic => panic!("stub adapter blew up"),
        }
    }
}

/// Resolver backed by a fixed table; unknown hosts are NXDOMAIN.
#[derive(Default)]
pub struct TableResolver {
    pub hosts: HashMap<String, Vec<IpAddr>>,
}

impl TableResolver {
    pub fn with(mut self, host: &str, addr: &str) -> Self {
        self.hosts
            .entry(host.to_string())
            .or_default()
            .push(addr.parse().expect("valid ip"));
        self
    }
}

#[async_trait]
impl Resolver for TableResolver {
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, ResolveFailure> {
        self.hosts
            .get(host)
            .cloned()
            .ok_or_else(|| ResolveFailure::NotFound("Name or service not known".into()))
    }
}

pub fn aggregator(resolver: TableResolver) -> Aggregator {
    Aggregator::new(Arc::new(resolver)).with_clock(Arc::new(FixedClock::at_unix(FIXED_NOW)))
}

pub fn text_item(id: SourceId, text: &str, ts: i64) -> TextItem {
    TextItem {
        source_id: id,
        title: text.to_string(),
        text: text.to_string(),
        published_at: chrono::DateTime::from_timestamp(ts, 0),
    }
}

/// Serve `router` on an ephemeral local port; returns its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock server");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("mock server");
    });
    format!("http://{addr}")
}

pub fn client() -> reqwest::Client {
    osint_aggregator::ingest::http::build_client("osint-aggregator-tests").expect("client")
}
