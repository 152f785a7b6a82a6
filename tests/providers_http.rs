// tests/providers_http.rs
//
// Real adapters against a local axum server serving recorded fixtures.
// Covers normalization and the HTTP error mapping of every built-in source.

mod common;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::Query,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};

use common::{aggregator, client, serve, TableResolver};
use osint_aggregator::config::OsintConfig;
use osint_aggregator::ingest::error::FetchError;
use osint_aggregator::ingest::providers::{
    GeoIpApiProvider, GoogleNewsProvider, RedditProvider, RssFeedsProvider, ShodanProvider,
    WhoisRdapProvider,
};
use osint_aggregator::ingest::types::{
    Capability, ItemLimits, Provider, ProviderInput, ProviderPayload, ProviderStatus, SourceId,
};
use osint_aggregator::target::TopicTarget;

const RDAP: &str = include_str!("fixtures/rdap_1.1.1.1.json");
const IPTOASN: &str = r#"{"announced":true,"as_number":13335,"as_country_code":"US","as_description":"CLOUDFLARENET","first_ip":"1.1.1.0","last_ip":"1.1.1.255"}"#;
const IPAPI: &str = include_str!("fixtures/ipapi_1.1.1.1.json");
const SHODAN: &str = include_str!("fixtures/shodan_host.json");
const REDDIT: &str = include_str!("fixtures/reddit_search.json");
const NEWS: &str = include_str!("fixtures/news_search.xml");
const FEED: &str = include_str!("fixtures/feed_world.xml");

const TIMEOUT: Duration = Duration::from_secs(5);

fn json(body: &'static str) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], body)
}

fn xml(body: &'static str) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/rss+xml")], body)
}

async fn shodan_host(Query(q): Query<HashMap<String, String>>) -> axum::response::Response {
    match q.get("key").map(String::as_str) {
        Some("good-key") => json(SHODAN).into_response(),
        _ => (StatusCode::UNAUTHORIZED, "{\"error\":\"Invalid API key\"}").into_response(),
    }
}

async fn reddit_search(
    headers: HeaderMap,
    Query(q): Query<HashMap<String, String>>,
) -> axum::response::Response {
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some("Bearer test-token");
    if !authorized || q.get("q").map(String::as_str) != Some("rust") {
        return StatusCode::FORBIDDEN.into_response();
    }
    json(REDDIT).into_response()
}

fn mock() -> Router {
    Router::new()
        .route("/ip/1.1.1.1", get(|| async { json(RDAP) }))
        .route("/ip/192.0.2.4", get(|| async { json(r#"{"name": "TEST-NET-1", "country": "ZZ"}"#) }))
        .route("/v1/as/ip/1.1.1.1", get(|| async { json(IPTOASN) }))
        .route(
            "/ip/192.0.2.1",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded") }),
        )
        .route("/ip/192.0.2.2", get(|| async { json("{\"name\": ") }))
        .route("/json/1.1.1.1", get(|| async { json(IPAPI) }))
        .route(
            "/json/10.0.0.1",
            get(|| async { json(r#"{"status":"fail","message":"private range"}"#) }),
        )
        .route("/shodan/host/1.1.1.1", get(shodan_host))
        .route(
            "/shodan/host/192.0.2.3",
            get(|| async { json(r#"{"ip_str":"192.0.2.3","ports":[],"data":[]}"#) }),
        )
        .route(
            "/shodan/host/192.0.2.1",
            get(|| async { (StatusCode::NOT_FOUND, "{\"error\":\"No information available\"}") }),
        )
        .route(
            "/api/v1/access_token",
            post(|| async { json(r#"{"access_token":"test-token","token_type":"bearer","expires_in":86400}"#) }),
        )
        .route("/search", get(reddit_search))
        .route("/rss/search", get(|| async { xml(NEWS) }))
        .route("/feeds/world.xml", get(|| async { xml(FEED) }))
        .route(
            "/feeds/down.xml",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
        )
        .route("/feeds/garbage.xml", get(|| async { "<html>not a feed</html>" }))
        .route(
            "/feeds/stalled.xml",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                xml(FEED)
            }),
        )
}

fn net(addr: &str) -> ProviderInput {
    ProviderInput::Network {
        host: addr.to_string(),
        address: Some(addr.parse().unwrap()),
    }
}

fn topic(keyword: &str) -> ProviderInput {
    topic_with(keyword, ItemLimits::default())
}

fn topic_with(keyword: &str, limits: ItemLimits) -> ProviderInput {
    ProviderInput::Topic {
        keyword: keyword.to_string(),
        limits,
    }
}

fn mock_config(base: &str) -> OsintConfig {
    let mut cfg = OsintConfig::default();
    cfg.endpoints.reddit_auth_url = format!("{base}/api/v1/access_token");
    cfg.endpoints.reddit_api_base = base.to_string();
    cfg.endpoints.google_news_base = base.to_string();
    cfg.credentials.reddit_client_id = "id".into();
    cfg.credentials.reddit_client_secret = "secret".into();
    cfg.limits.news_limit = 2;
    cfg
}

#[tokio::test]
async fn whois_normalizes_rdap() {
    let base = serve(mock()).await;
    let p = WhoisRdapProvider::new(client(), base.clone(), TIMEOUT).with_asn_lookup(base);

    let out = p.fetch(&net("1.1.1.1")).await.expect("rdap ok");
    let ProviderPayload::Whois(w) = out.payload else {
        panic!("whois payload expected");
    };
    // APNIC data carries no origin AS; it comes from the IP-to-ASN lookup.
    assert_eq!(w.asn, Some(13335));
    assert_eq!(w.organization.as_deref(), Some("APNIC Research and Development"));
    assert_eq!(w.network_range.as_deref(), Some("1.1.1.0/24"));
    assert_eq!(w.country_code.as_deref(), Some("AU"));
    assert!(out.text_items.is_empty());
}

#[tokio::test]
async fn whois_without_asn_source_keeps_registration_data() {
    let base = serve(mock()).await;

    let no_lookup = WhoisRdapProvider::new(client(), base.clone(), TIMEOUT);
    let ProviderPayload::Whois(w) = no_lookup.fetch(&net("1.1.1.1")).await.unwrap().payload else {
        panic!("whois payload expected");
    };
    assert_eq!(w.asn, None);

    // Lookup answers 404 for this address: whois is still ok, ASN unknown.
    let p = WhoisRdapProvider::new(client(), base.clone(), TIMEOUT).with_asn_lookup(base);
    let ProviderPayload::Whois(w) = p.fetch(&net("192.0.2.4")).await.unwrap().payload else {
        panic!("whois payload expected");
    };
    assert_eq!(w.asn, None);
    assert_eq!(w.organization.as_deref(), Some("TEST-NET-1"));
}

#[tokio::test]
async fn whois_maps_http_and_body_faults() {
    let base = serve(mock()).await;
    let p = WhoisRdapProvider::new(client(), base, TIMEOUT);

    match p.fetch(&net("192.0.2.1")).await {
        Err(FetchError::Http { status, message }) => {
            assert_eq!(status, 500);
            assert!(message.contains("upstream exploded"));
        }
        other => panic!("expected HTTP error, got {other:?}"),
    }
    assert!(matches!(
        p.fetch(&net("192.0.2.2")).await,
        Err(FetchError::Malformed(_))
    ));
}

#[tokio::test]
async fn geolocation_point_and_fail_status() {
    let base = serve(mock()).await;
    let p = GeoIpApiProvider::new(client(), base, TIMEOUT);

    let out = p.fetch(&net("1.1.1.1")).await.unwrap();
    let ProviderPayload::Geolocation(g) = out.payload else {
        panic!("geolocation payload expected");
    };
    assert_eq!(g.label().as_deref(), Some("Brisbane, Australia"));
    assert!((g.latitude + 27.4816).abs() < 1e-9);

    let err = p.fetch(&net("10.0.0.1")).await.unwrap_err();
    assert!(err.to_string().contains("private range"));
}

#[tokio::test]
async fn portscan_services_404_and_bad_key() {
    let base = serve(mock()).await;
    let p = ShodanProvider::new(client(), base.clone(), "good-key", TIMEOUT);

    let out = p.fetch(&net("1.1.1.1")).await.unwrap();
    let ProviderPayload::Portscan(scan) = out.payload else {
        panic!("portscan payload expected");
    };
    let seen: Vec<(u16, &str, &str)> = scan
        .services
        .iter()
        .map(|s| (s.port, s.protocol.as_str(), s.service.as_str()))
        .collect();
    assert_eq!(
        seen,
        vec![
            (53, "tcp", "dns-tcp"),
            (53, "udp", "dns-udp"),
            (80, "tcp", "CloudFlare"),
            (443, "tcp", "CloudFlare"),
        ]
    );

    // Never-scanned host is an error, not an empty scan.
    let err = p.fetch(&net("192.0.2.1")).await.unwrap_err();
    assert!(matches!(err, FetchError::Provider(_)));
    assert!(err.to_string().contains("no Shodan data available"));

    // Scanned host with nothing open stays ok and empty.
    let out = p.fetch(&net("192.0.2.3")).await.unwrap();
    assert_eq!(out.payload, ProviderPayload::Portscan(Default::default()));

    let bad = ShodanProvider::new(client(), base, "stale-key", TIMEOUT);
    let err = bad.fetch(&net("1.1.1.1")).await.unwrap_err();
    assert!(matches!(err, FetchError::Http { status: 401, .. }));
    assert!(err.to_string().contains("invalid or expired"));
}

#[tokio::test]
async fn reddit_token_then_search() {
    let base = serve(mock()).await;
    let p = RedditProvider::from_config(&mock_config(&base), client());

    let out = p.fetch(&topic("rust")).await.expect("reddit ok");
    let ProviderPayload::Feed(d) = out.payload else {
        panic!("feed payload expected");
    };
    // The empty third post is dropped.
    assert_eq!(d.item_count, 2);
    assert_eq!(
        d.items[0].url.as_deref(),
        Some("https://reddit.com/r/rust/comments/abc/rust_2024/")
    );
    assert_eq!(out.text_items.len(), 2);
    assert_eq!(
        out.text_items[0].text,
        "Rust 2024 edition is great. Upgrading was painless & fast."
    );
    assert!(out.text_items.iter().all(|t| t.source_id == SourceId::Reddit));
}

#[tokio::test]
async fn news_search_is_capped_and_cleaned() {
    let base = serve(mock()).await;
    let p = GoogleNewsProvider::from_config(&mock_config(&base), client());

    let out = p.fetch(&topic("rust")).await.unwrap();
    let ProviderPayload::Feed(d) = out.payload else {
        panic!("feed payload expected");
    };
    assert_eq!(d.item_count, 2);
    assert_eq!(d.items[0].url.as_deref(), Some("https://news.example.com/rust-kernel"));
    assert_eq!(
        out.text_items[0].text,
        "Rust adoption grows in the kernel - Example Times. Rust adoption grows Example Times"
    );
    assert_eq!(
        d.items[0].published_at.map(|t| t.timestamp()),
        Some(1_759_744_800)
    );
}

#[tokio::test]
async fn rss_partial_and_total_failure() {
    let base = serve(mock()).await;
    let feeds = vec![
        format!("{base}/feeds/world.xml"),
        format!("{base}/feeds/down.xml"),
        format!("{base}/feeds/garbage.xml"),
    ];
    let p = RssFeedsProvider::new(client(), feeds, 20, TIMEOUT);

    let out = p.fetch(&topic("HARVEST")).await.unwrap();
    let ProviderPayload::Feed(d) = out.payload else {
        panic!("feed payload expected");
    };
    assert_eq!(d.item_count, 2, "title and description both match");
    assert_eq!(d.feeds_failed, Some(2));

    let all_down = RssFeedsProvider::new(
        client(),
        vec![format!("{base}/feeds/down.xml")],
        20,
        TIMEOUT,
    );
    let err = all_down.fetch(&topic("harvest")).await.unwrap_err();
    assert!(err.to_string().contains("all 1 feeds failed"));

    let none = RssFeedsProvider::new(client(), vec![], 20, TIMEOUT);
    assert!(matches!(none.capability(), Capability::Missing(_)));
}

#[tokio::test]
async fn rss_stalled_feed_counts_as_failed() {
    let base = serve(mock()).await;
    let feeds = vec![
        format!("{base}/feeds/world.xml"),
        format!("{base}/feeds/stalled.xml"),
    ];
    let rss = RssFeedsProvider::new(client(), feeds, 20, Duration::from_millis(800));
    let agg = aggregator(TableResolver::default()).with_provider(Arc::new(rss));

    let rec = agg
        .investigate_topic(TopicTarget::new("harvest", [SourceId::Rss]).unwrap())
        .await
        .unwrap();
    let r = rec.result(SourceId::Rss).expect("rss result");
    assert_eq!(r.status(), ProviderStatus::Ok, "{:?}", r.error_detail());
    let Some(ProviderPayload::Feed(d)) = r.payload() else {
        panic!("feed payload expected");
    };
    assert_eq!(d.item_count, 2);
    assert_eq!(d.feeds_failed, Some(1));
}

#[tokio::test]
async fn requested_limits_cap_collected_items() {
    let base = serve(mock()).await;
    let limits = ItemLimits {
        reddit: Some(1),
        news: Some(1),
        rss_per_feed: Some(1),
    };

    let reddit = RedditProvider::from_config(&mock_config(&base), client());
    let out = reddit.fetch(&topic_with("rust", limits)).await.unwrap();
    assert_eq!(out.text_items.len(), 1);

    let news = GoogleNewsProvider::from_config(&mock_config(&base), client());
    let out = news.fetch(&topic_with("rust", limits)).await.unwrap();
    assert_eq!(out.text_items.len(), 1);

    // Only the first item of the feed is considered, and it matches.
    let rss = RssFeedsProvider::new(client(), vec![format!("{base}/feeds/world.xml")], 20, TIMEOUT);
    let out = rss.fetch(&topic_with("harvest", limits)).await.unwrap();
    assert_eq!(out.text_items.len(), 1);
}
