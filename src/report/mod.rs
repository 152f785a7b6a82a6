//! Renderers consuming a finished `AggregateRecord`.
//!
//! Rendering only reads the record. A rendering failure is reported on its
//! own and never touches what was collected.

use std::fmt::Write as _;

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::aggregate::{AggregateRecord, Distribution, ProviderResult, Summary};
use crate::ingest::types::{ProviderPayload, ProviderStatus};
use crate::target::Target;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("could not serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("could not format report: {0}")]
    Format(#[from] std::fmt::Error),
}

/// One rendered output plus the SHA-256 of its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub renderer: &'static str,
    pub media_type: &'static str,
    pub content: String,
    pub sha256: String,
}

impl Artifact {
    fn new(renderer: &'static str, media_type: &'static str, content: String) -> Self {
        let sha256 = sha256_hex(&content);
        Self {
            renderer,
            media_type,
            content,
            sha256,
        }
    }
}

pub fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for b in digest.iter() {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

pub trait Renderer: Send + Sync {
    fn name(&self) -> &'static str;
    fn render(&self, record: &AggregateRecord) -> Result<Artifact, RenderError>;
}

/// Pretty JSON with object keys sorted at every depth.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonExport;

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (k, v) in entries {
                sorted.insert(k, sort_keys(v));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

impl Renderer for JsonExport {
    fn name(&self) -> &'static str {
        "json"
    }

    fn render(&self, record: &AggregateRecord) -> Result<Artifact, RenderError> {
        let value = sort_keys(serde_json::to_value(record)?);
        let mut content = serde_json::to_string_pretty(&value)?;
        content.push('\n');
        Ok(Artifact::new(self.name(), "application/json", content))
    }
}

/// Plain-text report naming the outcome of every source.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextReport;

impl Renderer for TextReport {
    fn name(&self) -> &'static str {
        "text"
    }

    fn render(&self, record: &AggregateRecord) -> Result<Artifact, RenderError> {
        let mut out = String::new();
        write_header(&mut out, record)?;

        writeln!(out)?;
        writeln!(out, "Sources")?;
        for result in record.provider_results().values() {
            writeln!(
                out,
                "  {:<12} {:<12} {}",
                result.source_id().as_str(),
                result.status().as_str(),
                describe(result)
            )?;
        }

        writeln!(out)?;
        writeln!(out, "Summary")?;
        match record.summary() {
            Summary::Network(s) => {
                writeln!(out, "  address:   {}", opt(s.resolved_address.map(|a| a.to_string())))?;
                writeln!(out, "  location:  {}", opt(s.dominant_location.clone()))?;
                writeln!(out, "  asn:       {}", opt(s.asn.map(|a| format!("AS{a}"))))?;
                writeln!(out, "  org:       {}", opt(s.organization.clone()))?;
                let ports = match s.open_port_count {
                    Some(n) => n.to_string(),
                    None => "not scanned".to_string(),
                };
                writeln!(out, "  open ports: {ports}")?;
                let o = s.outcomes;
                writeln!(
                    out,
                    "  outcomes:  ok {} / unavailable {} / error {} / timeout {}",
                    o.ok, o.unavailable, o.error, o.timeout
                )?;
            }
            Summary::Topic(s) => {
                for (method, m) in &s.methods {
                    writeln!(
                        out,
                        "  {method}: {} (dominant {})",
                        dist(&m.overall),
                        m.dominant.as_str()
                    )?;
                    for (source, d) in &m.per_source {
                        writeln!(out, "    {:<10} {}", source.as_str(), dist(d))?;
                    }
                    if !m.top_items.is_empty() {
                        writeln!(out, "    strongest:")?;
                        for t in &m.top_items {
                            writeln!(
                                out,
                                "      {:+.3} {:<8} [{}] {}",
                                t.compound,
                                t.polarity.as_str(),
                                t.source_id.as_str(),
                                t.title
                            )?;
                        }
                    }
                }
                if s.degraded_items > 0 {
                    writeln!(out, "  degraded items: {}", s.degraded_items)?;
                }
                if !s.items.is_empty() {
                    writeln!(out)?;
                    writeln!(out, "Items")?;
                    for item in &s.items {
                        let polarities: Vec<String> = item
                            .scores
                            .iter()
                            .map(|sc| format!("{}={:+.3}", sc.method, sc.compound))
                            .collect();
                        writeln!(
                            out,
                            "  [{}] {} ({})",
                            item.source_id.as_str(),
                            item.title,
                            polarities.join(", ")
                        )?;
                    }
                }
            }
        }

        Ok(Artifact::new(self.name(), "text/plain; charset=utf-8", out))
    }
}

fn write_header(out: &mut String, record: &AggregateRecord) -> std::fmt::Result {
    writeln!(out, "Investigation report")?;
    match record.target() {
        Target::Network(t) => {
            writeln!(out, "Target:    {} (network)", t.raw_input)?;
            match (t.resolution.address, t.resolution.detail.as_deref()) {
                (Some(a), _) => writeln!(out, "Address:   {a}")?,
                (None, Some(why)) => writeln!(out, "Address:   unresolved ({why})")?,
                (None, None) => writeln!(out, "Address:   unresolved")?,
            }
        }
        Target::Topic(t) => {
            let sources: Vec<&str> = t.requested_sources.iter().map(|s| s.as_str()).collect();
            writeln!(out, "Keyword:   {} (topic)", t.keyword)?;
            writeln!(out, "Requested: {}", sources.join(", "))?;
        }
    }
    writeln!(out, "Generated: {}", record.generated_at().to_rfc3339())
}

fn describe(result: &ProviderResult) -> String {
    if result.status() != ProviderStatus::Ok {
        return result.error_detail().unwrap_or("no detail").to_string();
    }
    match result.payload() {
        Some(ProviderPayload::Whois(w)) => {
            let mut parts = Vec::new();
            if let Some(asn) = w.asn {
                parts.push(format!("AS{asn}"));
            }
            parts.extend(w.organization.clone());
            parts.extend(w.network_range.clone());
            parts.extend(w.country_code.clone());
            if parts.is_empty() {
                "no registration data".to_string()
            } else {
                parts.join(", ")
            }
        }
        Some(ProviderPayload::Geolocation(g)) => format!(
            "{} ({:.4}, {:.4})",
            g.label().unwrap_or_else(|| "unknown place".into()),
            g.latitude,
            g.longitude
        ),
        Some(ProviderPayload::Portscan(p)) if p.services.is_empty() => {
            "no open ports found".to_string()
        }
        Some(ProviderPayload::Portscan(p)) => p
            .services
            .iter()
            .map(|s| format!("{}/{} {}", s.port, s.protocol, s.service))
            .collect::<Vec<_>>()
            .join(", "),
        Some(ProviderPayload::Feed(f)) => match f.feeds_failed {
            Some(n) if n > 0 => format!("{} items ({n} feeds failed)", f.item_count),
            _ => format!("{} items", f.item_count),
        },
        None => "no data".to_string(),
    }
}

fn dist(d: &Distribution) -> String {
    format!(
        "positive {} ({:.1}%) / negative {} ({:.1}%) / neutral {} ({:.1}%) of {} (mean {:+.3})",
        d.positive,
        d.positive_percent,
        d.negative,
        d.negative_percent,
        d.neutral,
        d.neutral_percent,
        d.total,
        d.mean_compound
    )
}

fn opt(v: Option<String>) -> String {
    v.unwrap_or_else(|| "-".to_string())
}

/// Run every renderer; failures stay per renderer.
pub fn render_all(
    record: &AggregateRecord,
    renderers: &[&dyn Renderer],
) -> Vec<(&'static str, Result<Artifact, RenderError>)> {
    renderers
        .iter()
        .map(|r| {
            let out = r.render(record);
            if let Err(e) = &out {
                tracing::error!(renderer = r.name(), error = %e, "render failed");
            }
            (r.name(), out)
        })
        .collect()
}
