// src/ingest/mod.rs
pub mod error;
pub mod http;
pub mod providers;
pub mod rss;
pub mod types;

pub use error::FetchError;
pub use types::{
    Capability, FeedDigest, FeedEntry, GeoPoint, ItemLimits, PortScan, Provider, ProviderInput,
    ProviderOutput, ProviderPayload, ProviderStatus, Requirement, ServiceEntry, SourceId,
    TextItem, Variant, WhoisInfo,
};

/// Normalize a display string: `clean_text` plus trailing punctuation stripped.
pub fn normalize_text(s: &str) -> String {
    let mut out = clean_text(s);
    while let Some(last) = out.chars().last() {
        if matches!(last, '!' | '?' | '.' | ',') {
            out.pop();
        } else {
            break;
        }
    }
    out
}

/// Text handed to scorers: decoded, tag-free, whitespace collapsed.
/// Punctuation is kept; exclamation marks carry weight in scoring.
pub fn clean_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out = out.trim().to_string();

    // 5) Length cap: 1500 chars
    if out.chars().count() > 1500 {
        out = out.chars().take(1500).collect();
    }

    out
}

/// Join a headline and its body into one scorable text.
pub fn scoring_text(title: &str, body: &str) -> String {
    let title = clean_text(title);
    let body = clean_text(body);
    match (title.is_empty(), body.is_empty()) {
        (_, true) => title,
        (true, false) => body,
        _ if title.ends_with(['.', '!', '?']) => format!("{title} {body}"),
        _ => format!("{title}. {body}"),
    }
}
