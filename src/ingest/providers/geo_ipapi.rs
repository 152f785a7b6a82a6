// src/ingest/providers/geo_ipapi.rs
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::OsintConfig;
use crate::ingest::error::FetchError;
use crate::ingest::http::ensure_success;
use crate::ingest::types::{
    GeoPoint, Provider, ProviderInput, ProviderOutput, ProviderPayload, Requirement, SourceId,
};

const FIELDS: &str = "status,message,country,city,lat,lon";

#[derive(Debug, Deserialize)]
struct IpApiResp {
    status: String,
    message: Option<String>,
    country: Option<String>,
    city: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

/// Geolocation through ip-api.com's JSON endpoint. No credential needed.
pub struct GeoIpApiProvider {
    client: reqwest::Client,
    base: String,
    timeout: Duration,
}

impl GeoIpApiProvider {
    pub fn new(client: reqwest::Client, base: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            base: base.into(),
            timeout,
        }
    }

    pub fn from_config(cfg: &OsintConfig, client: reqwest::Client) -> Self {
        Self::new(
            client,
            cfg.endpoints.geolocation_base.clone(),
            cfg.timeouts.for_source(SourceId::Geolocation),
        )
    }
}

pub fn parse_ipapi(body: &[u8]) -> Result<GeoPoint, FetchError> {
    let r: IpApiResp = serde_json::from_slice(body)?;
    if !r.status.eq_ignore_ascii_case("success") {
        let why = r.message.unwrap_or_else(|| "lookup failed".into());
        return Err(FetchError::Provider(format!("geolocation lookup failed: {why}")));
    }
    let (Some(latitude), Some(longitude)) = (r.lat, r.lon) else {
        return Err(FetchError::Malformed("missing lat/lon".into()));
    };
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(FetchError::Malformed(format!(
            "coordinates out of range: {latitude},{longitude}"
        )));
    }
    Ok(GeoPoint {
        latitude,
        longitude,
        city: r.city.filter(|c| !c.trim().is_empty()),
        country: r.country.filter(|c| !c.trim().is_empty()),
    })
}

#[async_trait]
impl Provider for GeoIpApiProvider {
    fn source_id(&self) -> SourceId {
        SourceId::Geolocation
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
            .get(format!("{}/json/{}", self.base, addr))
            .query(&[("fields", FIELDS)])
            .send()
            .await?;
        let body = ensure_success(resp).await?.bytes().await?;
        Ok(ProviderPayload::Geolocation(parse_ipapi(&body)?).into())
    }
}
