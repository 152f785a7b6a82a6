use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::aggregate::summary::Summary;
use crate::ingest::types::{ProviderPayload, ProviderStatus, SourceId};
use crate::target::Target;

/// Terminal outcome of one source for one investigation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderResult {
    source_id: SourceId,
    status: ProviderStatus,
    payload: Option<ProviderPayload>,
    error_detail: Option<String>,
    fetched_at: DateTime<Utc>,
}

impl ProviderResult {
    pub fn ok(source_id: SourceId, payload: ProviderPayload, at: DateTime<Utc>) -> Self {
        Self {
            source_id,
            status: ProviderStatus::Ok,
            payload: Some(payload),
            error_detail: None,
            fetched_at: at,
        }
    }

    pub fn unavailable(source_id: SourceId, detail: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self::failed(source_id, ProviderStatus::Unavailable, detail, at)
    }

    pub fn error(source_id: SourceId, detail: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self::failed(source_id, ProviderStatus::Error, detail, at)
    }

    pub fn timeout(source_id: SourceId, detail: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self::failed(source_id, ProviderStatus::Timeout, detail, at)
    }

    fn failed(
        source_id: SourceId,
        status: ProviderStatus,
        detail: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            source_id,
            status,
            payload: None,
            error_detail: Some(detail.into()),
            fetched_at: at,
        }
    }

    pub fn source_id(&self) -> SourceId {
        self.source_id
    }

    pub fn status(&self) -> ProviderStatus {
        self.status
    }

    pub fn payload(&self) -> Option<&ProviderPayload> {
        self.payload.as_ref()
    }

    pub fn error_detail(&self) -> Option<&str> {
        self.error_detail.as_deref()
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn is_ok(&self) -> bool {
        self.status == ProviderStatus::Ok
    }
}

/// Merged result of one investigation. Built once by the aggregator and
/// never changed afterwards; there are no setters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRecord {
    target: Target,
    provider_results: BTreeMap<SourceId, ProviderResult>,
    summary: Summary,
    generated_at: DateTime<Utc>,
}

impl AggregateRecord {
    pub(crate) fn new(
        target: Target,
        provider_results: BTreeMap<SourceId, ProviderResult>,
        summary: Summary,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            target,
            provider_results,
            summary,
            generated_at,
        }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn provider_results(&self) -> &BTreeMap<SourceId, ProviderResult> {
        &self.provider_results
    }

    pub fn result(&self, id: SourceId) -> Option<&ProviderResult> {
        self.provider_results.get(&id)
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }
}
