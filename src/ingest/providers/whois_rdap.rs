// src/ingest/providers/whois_rdap.rs
use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::config::OsintConfig;
use crate::ingest::error::FetchError;
use crate::ingest::http::ensure_success;
use crate::ingest::types::{
    Provider, ProviderInput, ProviderOutput, ProviderPayload, Requirement, SourceId, WhoisInfo,
};

#[derive(Debug, Deserialize)]
struct RdapNetwork {
    name: Option<String>,
    country: Option<String>,
    #[serde(rename = "startAddress")]
    start_address: Option<String>,
    #[serde(rename = "endAddress")]
    end_address: Option<String>,
    #[serde(default)]
    cidr0_cidrs: Vec<Cidr>,
    #[serde(default)]
    arin_originas0_originautnums: Vec<u32>,
    #[serde(default)]
    entities: Vec<Entity>,
}

#[derive(Debug, Deserialize)]
struct Cidr {
    v4prefix: Option<String>,
    v6prefix: Option<String>,
    length: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct Entity {
    #[serde(default)]
    roles: Vec<String>,
    #[serde(rename = "vcardArray")]
    vcard_array: Option<Value>,
}

/// iptoasn.com answer for one address.
#[derive(Debug, Deserialize)]
struct AsnResp {
    #[serde(default)]
    announced: bool,
    as_number: Option<u32>,
}

/// WHOIS via RDAP (`{base}/ip/{addr}`); rdap.org redirects to the owning RIR.
///
/// Only ARIN publishes the origin AS inside RDAP. For the other registries the
/// ASN comes from an IP-to-ASN lookup when one is configured.
pub struct WhoisRdapProvider {
    client: reqwest::Client,
    base: String,
    asn_base: Option<String>,
    timeout: Duration,
}

impl WhoisRdapProvider {
    pub fn new(client: reqwest::Client, base: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            base: base.into(),
            asn_base: None,
            timeout,
        }
    }

    /// Fill a missing ASN from `{asn_base}/v1/as/ip/{addr}`.
    pub fn with_asn_lookup(mut self, asn_base: impl Into<String>) -> Self {
        self.asn_base = Some(asn_base.into());
        self
    }

    pub fn from_config(cfg: &OsintConfig, client: reqwest::Client) -> Self {
        Self::new(
            client,
            cfg.endpoints.rdap_base.clone(),
            cfg.timeouts.for_source(SourceId::Whois),
        )
        .with_asn_lookup(cfg.endpoints.asn_base.clone())
    }

    async fn lookup_asn(&self, base: &str, addr: IpAddr) -> Result<Option<u32>, FetchError> {
        let resp = self
            .client
            .get(format!("{base}/v1/as/ip/{addr}"))
            .header("accept", "application/json")
            .send()
            .await?;
        let body = ensure_success(resp).await?.bytes().await?;
        parse_asn(&body)
    }
}

/// ASN of an iptoasn.com answer; unannounced space has none.
pub fn parse_asn(body: &[u8]) -> Result<Option<u32>, FetchError> {
    let resp: AsnResp = serde_json::from_slice(body)?;
    Ok(resp.as_number.filter(|n| resp.announced && *n != 0))
}

/// Normalize an RDAP IP-network object.
pub fn parse_rdap(body: &[u8]) -> Result<WhoisInfo, FetchError> {
    let net: RdapNetwork = serde_json::from_slice(body)?;

    let network_range = net
        .cidr0_cidrs
        .iter()
        .find_map(|c| {
            let prefix = c.v4prefix.as_deref().or(c.v6prefix.as_deref())?;
            Some(format!("{prefix}/{}", c.length?))
        })
        .or_else(|| match (&net.start_address, &net.end_address) {
            (Some(s), Some(e)) => Some(format!("{s} - {e}")),
            _ => None,
        });

    let organization = ["registrant", "administrative"]
        .iter()
        .find_map(|role| {
            net.entities
                .iter()
                .filter(|e| e.roles.iter().any(|r| r.eq_ignore_ascii_case(role)))
                .find_map(|e| e.vcard_array.as_ref().and_then(vcard_fn))
        })
        .or(net.name.clone());

    Ok(WhoisInfo {
        asn: net.arin_originas0_originautnums.first().copied(),
        organization,
        network_range,
        country_code: net.country.map(|c| c.to_ascii_uppercase()),
    })
}

/// `["vcard", [["fn", {}, "text", "Name"], ...]]` -> `Name`
fn vcard_fn(v: &Value) -> Option<String> {
    v.get(1)?
        .as_array()?
        .iter()
        .filter_map(Value::as_array)
        .find(|prop| prop.first().and_then(Value::as_str) == Some("fn"))
        .and_then(|prop| prop.get(3)?.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

#[async_trait]
impl Provider for WhoisRdapProvider {
    fn source_id(&self) -> SourceId {
        SourceId::Whois
    }

    fn requirement(&self) -> Requirement {
        Requirement::ResolvedAddress
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self, input: &ProviderInput) -> Result<ProviderOutput, FetchError> {
        let addr = input.require_address()?;
        let resp = self
            .client
            .get(format!("{}/ip/{}", self.base, addr))
            .header("accept", "application/rdap+json, application/json")
            .send()
            .await?;
        let body = ensure_success(resp).await?.bytes().await?;
        let mut info = parse_rdap(&body)?;

        if info.asn.is_none() {
            if let Some(base) = self.asn_base.as_deref() {
                // The registration data stands without an ASN.
                match self.lookup_asn(base, addr).await {
                    Ok(asn) => info.asn = asn,
                    Err(e) => tracing::debug!(%addr, error = %e, "ASN lookup failed"),
                }
            }
        }
        Ok(ProviderPayload::Whois(info).into())
    }
}
