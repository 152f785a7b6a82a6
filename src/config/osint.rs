// src/config/osint.rs
//! Runtime configuration: endpoints, credentials, limits and per-source wait budgets.
//!
//! Loaded once at startup (TOML) and handed to adapter constructors; nothing
//! here is read again mid-investigation.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::time::Duration;
use std::{env, fs, path::Path, path::PathBuf};

use crate::ingest::types::{SourceId, DEFAULT_TIMEOUT};

pub const ENV_CONFIG_PATH: &str = "OSINT_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/osint.toml";

/// Credential value meaning "read it from the environment".
const ENV_MARKER: &str = "ENV";

fn default_user_agent() -> String {
    concat!("osint-aggregator/", env!("CARGO_PKG_VERSION")).to_string()
}

fn env_marker() -> String {
    ENV_MARKER.to_string()
}

fn default_feeds() -> Vec<String> {
    [
        "https://rss.nytimes.com/services/xml/rss/nyt/HomePage.xml",
        "https://feeds.bbci.co.uk/news/rss.xml",
        "https://feeds.reuters.com/reuters/topNews",
        "https://www.theguardian.com/world/rss",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OsintConfig {
    pub user_agent: String,
    pub credentials: Credentials,
    pub endpoints: Endpoints,
    pub timeouts: Timeouts,
    pub limits: Limits,
    pub rss_feeds: Vec<String>,
}

impl Default for OsintConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            credentials: Credentials::default(),
            endpoints: Endpoints::default(),
            timeouts: Timeouts::default(),
            limits: Limits::default(),
            rss_feeds: default_feeds(),
        }
    }
}

/// API credentials. `"ENV"` resolves from `SHODAN_API_KEY`, `REDDIT_CLIENT_ID`
/// and `REDDIT_CLIENT_SECRET`; an empty value disables the adapter.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub shodan_api_key: String,
    pub reddit_client_id: String,
    pub reddit_client_secret: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            shodan_api_key: env_marker(),
            reddit_client_id: env_marker(),
            reddit_client_secret: env_marker(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub rdap_base: String,
    pub asn_base: String,
    pub geolocation_base: String,
    pub shodan_base: String,
    pub reddit_auth_url: String,
    pub reddit_api_base: String,
    pub google_news_base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            rdap_base: "https://rdap.org".into(),
            asn_base: "https://api.iptoasn.com".into(),
            geolocation_base: "http://ip-api.com".into(),
            shodan_base: "https://api.shodan.io".into(),
            reddit_auth_url: "https://www.reddit.com/api/v1/access_token".into(),
            reddit_api_base: "https://oauth.reddit.com".into(),
            google_news_base: "https://news.google.com".into(),
        }
    }
}

/// Per-source wait budgets in seconds. Unset sources use `default_secs`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub default_secs: u64,
    pub whois_secs: Option<u64>,
    pub geolocation_secs: Option<u64>,
    pub portscan_secs: Option<u64>,
    pub reddit_secs: Option<u64>,
    pub news_secs: Option<u64>,
    pub rss_secs: Option<u64>,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            default_secs: DEFAULT_TIMEOUT.as_secs(),
            whois_secs: None,
            geolocation_secs: None,
            portscan_secs: None,
            reddit_secs: None,
            news_secs: None,
            rss_secs: None,
        }
    }
}

impl Timeouts {
    pub fn for_source(&self, id: SourceId) -> Duration {
        let specific = match id {
            SourceId::Whois => self.whois_secs,
            SourceId::Geolocation => self.geolocation_secs,
            SourceId::Portscan => self.portscan_secs,
            SourceId::Reddit => self.reddit_secs,
            SourceId::News => self.news_secs,
            SourceId::Rss => self.rss_secs,
        };
        Duration::from_secs(specific.unwrap_or(self.default_secs))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub reddit_limit: usize,
    pub news_limit: usize,
    pub rss_limit_per_feed: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            reddit_limit: 50,
            news_limit: 40,
            rss_limit_per_feed: 20,
        }
    }
}

impl OsintConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading osint config from {}", path.display()))?;
        let cfg: OsintConfig = toml::from_str(&data)
            .with_context(|| format!("parsing osint config {}", path.display()))?;
        Ok(cfg.finalize())
    }

    /// Load config using env var + fallbacks:
    /// 1) $OSINT_CONFIG_PATH (must exist)
    /// 2) config/osint.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            return Self::load_from_file(&pb);
        }
        let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_p.exists() {
            return Self::load_from_file(&default_p);
        }
        Ok(Self::default().finalize())
    }

    /// Resolve `"ENV"` credentials and repair nonsensical values.
    pub fn finalize(mut self) -> Self {
        let c = &mut self.credentials;
        c.shodan_api_key = resolve_secret(&c.shodan_api_key, "SHODAN_API_KEY");
        c.reddit_client_id = resolve_secret(&c.reddit_client_id, "REDDIT_CLIENT_ID");
        c.reddit_client_secret = resolve_secret(&c.reddit_client_secret, "REDDIT_CLIENT_SECRET");

        let t = &mut self.timeouts;
        if t.default_secs == 0 {
            t.default_secs = DEFAULT_TIMEOUT.as_secs();
        }
        // A zero budget would time out every call; treat it as unset.
        for secs in [
            &mut t.whois_secs,
            &mut t.geolocation_secs,
            &mut t.portscan_secs,
            &mut t.reddit_secs,
            &mut t.news_secs,
            &mut t.rss_secs,
        ] {
            if *secs == Some(0) {
                *secs = None;
            }
        }
        if self.user_agent.trim().is_empty() {
            self.user_agent = default_user_agent();
        }
        self.rss_feeds = clean_list(std::mem::take(&mut self.rss_feeds));
        for base in [
            &mut self.endpoints.rdap_base,
            &mut self.endpoints.asn_base,
            &mut self.endpoints.geolocation_base,
            &mut self.endpoints.shodan_base,
            &mut self.endpoints.reddit_api_base,
            &mut self.endpoints.google_news_base,
        ] {
            let trimmed = base.trim().trim_end_matches('/').to_string();
            *base = trimmed;
        }
        self
    }
}

fn resolve_secret(value: &str, var: &str) -> String {
    if !value.trim().eq_ignore_ascii_case(ENV_MARKER) {
        return value.trim().to_string();
    }
    match env::var(var) {
        Ok(v) => v.trim().to_string(),
        Err(_) => {
            tracing::debug!(var, "credential not set; dependent adapter will be unavailable");
            String::new()
        }
    }
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim();
        if !t.is_empty() && !out.iter().any(|o| o == t) {
            out.push(t.to_string());
        }
    }
    out
}
