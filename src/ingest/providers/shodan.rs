// src/ingest/providers/shodan.rs
use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::OsintConfig;
use crate::ingest::error::FetchError;
use crate::ingest::http::ensure_success;
use crate::ingest::types::{
    Capability, PortScan, Provider, ProviderInput, ProviderOutput, ProviderPayload, Requirement,
    ServiceEntry, SourceId,
};

#[derive(Debug, Deserialize)]
struct HostResp {
    #[serde(default)]
    ports: Vec<u16>,
    #[serde(default)]
    data: Vec<Banner>,
}

#[derive(Debug, Deserialize)]
struct Banner {
    port: u16,
    transport: Option<String>,
    product: Option<String>,
    #[serde(rename = "_shodan")]
    meta: Option<BannerMeta>,
}

#[derive(Debug, Deserialize)]
struct BannerMeta {
    module: Option<String>,
}

/// Open ports and services from Shodan's host API. Requires an API key.
pub struct ShodanProvider {
    client: reqwest::Client,
    base: String,
    api_key: String,
    timeout: Duration,
}

impl ShodanProvider {
    pub fn new(
        client: reqwest::Client,
        base: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            base: base.into(),
            api_key: api_key.into(),
            timeout,
        }
    }

    pub fn from_config(cfg: &OsintConfig, client: reqwest::Client) -> Self {
        Self::new(
            client,
            cfg.endpoints.shodan_base.clone(),
            cfg.credentials.shodan_api_key.clone(),
            cfg.timeouts.for_source(SourceId::Portscan),
        )
    }
}

/// Normalize a host document into services ordered by `(port, protocol)`.
/// Banners win over bare port numbers; the first product seen for a
/// `(port, protocol)` pair is kept.
pub fn parse_host(body: &[u8]) -> Result<PortScan, FetchError> {
    let host: HostResp = serde_json::from_slice(body)?;

    let mut seen: BTreeMap<(u16, String), String> = BTreeMap::new();
    for b in host.data {
        let protocol = b
            .transport
            .map(|t| t.to_ascii_lowercase())
            .unwrap_or_else(|| "tcp".into());
        let service = b
            .product
            .or_else(|| b.meta.and_then(|m| m.module))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "unknown".into());
        seen.entry((b.port, protocol)).or_insert(service);
    }
    for port in host.ports {
        if !seen.keys().any(|(p, _)| *p == port) {
            seen.insert((port, "tcp".into()), "unknown".into());
        }
    }

    Ok(PortScan {
        services: seen
            .into_iter()
            .map(|((port, protocol), service)| ServiceEntry {
                port,
                protocol,
                service,
            })
            .collect(),
    })
}

#[async_trait]
impl Provider for ShodanProvider {
    fn source_id(&self) -> SourceId {
        SourceId::Portscan
    }

    fn requirement(&self) -> Requirement {
        Requirement::ResolvedAddress
    }

    fn capability(&self) -> Capability {
        if self.api_key.is_empty() {
            Capability::Missing("Shodan API key not configured".into())
        } else {
            Capability::Ready
        }
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self, input: &ProviderInput) -> Result<ProviderOutput, FetchError> {
        let addr = input.require_address()?;
        let resp = self
            .client
            .get(format!("{}/shodan/host/{}", self.base, addr))
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;

        match resp.status().as_u16() {
            // 404: the host was never scanned, which is not the same as "no open ports".
            404 => {
                return Err(FetchError::Provider(
                    "no Shodan data available for this address".into(),
                ))
            }
            401 | 403 => {
                return Err(FetchError::Http {
                    status: resp.status().as_u16(),
                    message: "Shodan API key is invalid or expired".into(),
                })
            }
            _ => {}
        }

        let body = ensure_success(resp).await?.bytes().await?;
        Ok(ProviderPayload::Portscan(parse_host(&body)?).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_services_and_fills_unknown_ports() {
        let body = br#"{
            "ports": [443, 53, 8080],
            "data": [
                {"port": 443, "transport": "tcp", "product": "cloudflare"},
                {"port": 53, "transport": "udp", "_shodan": {"module": "dns-udp"}},
                {"port": 53, "transport": "tcp", "product": ""},
                {"port": 443, "transport": "tcp", "product": "nginx"}
            ]
        }"#;
        let scan = parse_host(body).unwrap();
        let flat: Vec<(u16, &str, &str)> = scan
            .services
            .iter()
            .map(|s| (s.port, s.protocol.as_str(), s.service.as_str()))
            .collect();
        assert_eq!(
            flat,
            vec![
                (53, "tcp", "unknown"),
                (53, "udp", "dns-udp"),
                (443, "tcp", "cloudflare"),
                (8080, "tcp", "unknown"),
            ]
        );
    }

    #[test]
    fn missing_key_means_not_ready() {
        let p = ShodanProvider::new(reqwest::Client::new(), "http://x", "", Duration::from_secs(1));
        assert!(matches!(p.capability(), Capability::Missing(_)));
    }

    #[test]
    fn host_document_without_ports_is_an_empty_scan() {
        let scan = parse_host(br#"{"ports": [], "data": []}"#).unwrap();
        assert!(scan.services.is_empty());
    }
}
