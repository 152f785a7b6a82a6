// src/ingest/http.rs
//! Shared HTTP plumbing for the adapters.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

use crate::ingest::error::FetchError;

/// Longest slice of an error body kept in `error_detail`.
const BODY_EXCERPT_CHARS: usize = 200;

pub fn build_client(user_agent: &str) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .connect_timeout(Duration::from_secs(4))
        .build()
        .context("building reqwest client")
}

/// Turn a non-2xx response into `FetchError::Http` carrying a body excerpt.
pub async fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response, FetchError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(FetchError::Http {
        status: status.as_u16(),
        message: excerpt(&body, status.canonical_reason().unwrap_or("request failed")),
    })
}

pub async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, FetchError> {
    let resp = ensure_success(resp).await?;
    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

pub async fn read_text(resp: reqwest::Response) -> Result<String, FetchError> {
    let resp = ensure_success(resp).await?;
    Ok(resp.text().await?)
}

fn excerpt(body: &str, fallback: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return fallback.to_string();
    }
    trimmed.chars().take(BODY_EXCERPT_CHARS).collect()
}
