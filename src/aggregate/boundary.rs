//! The adapter boundary: turns one adapter call into exactly one classified
//! `ProviderResult`, whatever the adapter does (fails, hangs or panics).

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};

use crate::aggregate::clock::Clock;
use crate::aggregate::record::ProviderResult;
use crate::ingest::types::{Capability, Provider, ProviderInput, Requirement, TextItem};
use crate::metrics::ensure_metrics_described;

pub const NO_ADDRESS: &str = "no resolvable address";

/// Run one adapter in its own task under its own timeout.
///
/// Text items are only returned for `ok` outcomes and are re-stamped with the
/// adapter's source id.
pub async fn run_provider(
    provider: Arc<dyn Provider>,
    input: ProviderInput,
    clock: Arc<dyn Clock>,
) -> (ProviderResult, Vec<TextItem>) {
    ensure_metrics_described();
    let id = provider.source_id();

    // Adapter code runs outside the task here too; a panic must not escape.
    let contract = panic::catch_unwind(AssertUnwindSafe(|| {
        (provider.capability(), provider.requirement(), provider.timeout())
    }));
    let (capability, requirement, limit) = match contract {
        Ok(contract) => contract,
        Err(payload) => {
            let detail = format!("adapter panicked: {}", panic_message(payload));
            return finish(ProviderResult::error(id, detail, clock.now()), Vec::new(), None);
        }
    };

    if let Capability::Missing(reason) = capability {
        tracing::debug!(source = %id, %reason, "provider unavailable");
        return finish(ProviderResult::unavailable(id, reason, clock.now()), Vec::new(), None);
    }
    if requirement == Requirement::ResolvedAddress && input.address().is_none() {
        tracing::debug!(source = %id, "provider skipped: target did not resolve");
        return finish(ProviderResult::unavailable(id, NO_ADDRESS, clock.now()), Vec::new(), None);
    }

    let started = Instant::now();
    let task_provider = Arc::clone(&provider);
    let mut task = tokio::spawn(async move { task_provider.fetch(&input).await });

    let (result, items) = match tokio::time::timeout(limit, &mut task).await {
        Ok(Ok(Ok(output))) => {
            let mut items = output.text_items;
            for item in &mut items {
                item.source_id = id;
            }
            (ProviderResult::ok(id, output.payload, clock.now()), items)
        }
        Ok(Ok(Err(e))) => (ProviderResult::error(id, e.to_string(), clock.now()), Vec::new()),
        Ok(Err(join)) if join.is_panic() => {
            let detail = format!("adapter panicked: {}", panic_message(join.into_panic()));
            (ProviderResult::error(id, detail, clock.now()), Vec::new())
        }
        Ok(Err(_)) => (
            ProviderResult::error(id, "adapter task was cancelled", clock.now()),
            Vec::new(),
        ),
        Err(_) => {
            // Whatever the task produces from here on is dropped with it.
            task.abort();
            let detail = format!("no response within {} ms", limit.as_millis());
            (ProviderResult::timeout(id, detail, clock.now()), Vec::new())
        }
    };

    finish(result, items, Some(started.elapsed().as_secs_f64() * 1000.0))
}

fn finish(
    result: ProviderResult,
    items: Vec<TextItem>,
    elapsed_ms: Option<f64>,
) -> (ProviderResult, Vec<TextItem>) {
    let source = result.source_id().as_str();
    let status = result.status().as_str();
    counter!("provider_results_total", "source" => source, "status" => status).increment(1);
    if let Some(ms) = elapsed_ms {
        histogram!("provider_fetch_ms", "source" => source).record(ms);
    }

    if result.is_ok() {
        tracing::info!(source, status, elapsed_ms, items = items.len(), "provider finished");
    } else {
        tracing::warn!(
            source,
            status,
            elapsed_ms,
            detail = result.error_detail().unwrap_or_default(),
            "provider finished without data"
        );
    }
    (result, items)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
