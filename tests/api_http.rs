// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - POST /investigate (+ validation)
// - POST /analyze (+ validation)
// - POST /investigate/report, /analyze/report (plain text)

mod common;

use std::sync::Arc;

use serde_json::json;
use serde_json::Value as Json;
use shuttle_axum::axum::{
    body::{self, Body},
    http::{header, Request, StatusCode},
    Router,
};
use tower::ServiceExt as _; // for `oneshot`

use common::{aggregator, text_item, Stub, TableResolver, FIXED_NOW};
use osint_aggregator::api::{self, AppState};
use osint_aggregator::ingest::types::{
    FeedDigest, GeoPoint, ProviderOutput, ProviderPayload, SourceId,
};

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

/// Router over scripted adapters; portscan and reddit are not registered.
fn test_router() -> Router {
    let agg = aggregator(TableResolver::default().with("one.one.one.one", "1.1.1.1"))
        .with_provider(Arc::new(
            Stub::ok(
                SourceId::Geolocation,
                ProviderPayload::Geolocation(GeoPoint {
                    latitude: -27.4816,
                    longitude: 153.0175,
                    city: Some("Brisbane".into()),
                    country: Some("Australia".into()),
                }),
            )
            .needs_address(),
        ))
        .with_provider(Arc::new(Stub::failing(SourceId::Whois, "connection reset")))
        .with_provider(Arc::new(Stub::output(
            SourceId::News,
            ProviderOutput {
                payload: ProviderPayload::Feed(FeedDigest::default()),
                text_items: vec![text_item(SourceId::News, "great news today", FIXED_NOW)],
            },
        )));
    api::router(AppState::new(agg))
}

fn post_json(uri: &str, payload: Json) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST")
}

async fn body_text(resp: shuttle_axum::axum::response::Response) -> String {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    String::from_utf8(bytes).expect("utf8")
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");

    let resp = test_router().oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK, "health should be 200");
    assert_eq!(body_text(resp).await.trim(), "OK");
}

#[tokio::test]
async fn api_investigate_returns_record_with_every_source() {
    let resp = test_router()
        .oneshot(post_json("/investigate", json!({ "target": "https://one.one.one.one/" })))
        .await
        .expect("oneshot /investigate");
    assert_eq!(resp.status(), StatusCode::OK);

    let v: Json = serde_json::from_str(&body_text(resp).await).expect("json body");
    assert_eq!(v["target"]["variant"], "network");
    assert_eq!(v["target"]["host"], "one.one.one.one");
    assert_eq!(v["target"]["resolution"]["status"], "resolved");

    let results = v["provider_results"].as_object().expect("results map");
    let keys: Vec<&str> = results.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["geolocation", "portscan", "whois"]);
    assert_eq!(results["geolocation"]["status"], "ok");
    assert_eq!(results["geolocation"]["payload"]["kind"], "geolocation");
    assert_eq!(results["whois"]["status"], "error");
    assert_eq!(results["portscan"]["status"], "unavailable");
    assert!(results["portscan"]["payload"].is_null());

    assert_eq!(v["summary"]["dominant_location"], "Brisbane, Australia");
    assert_eq!(v["generated_at"], "2025-10-06T10:00:00Z");
}

#[tokio::test]
async fn api_rejects_invalid_requests_with_400() {
    for (uri, payload) in [
        ("/investigate", json!({ "target": "   " })),
        ("/analyze", json!({ "keyword": "  " })),
        ("/analyze", json!({ "keyword": "rust", "sources": ["whois"] })),
        ("/analyze", json!({ "keyword": "rust", "sources": ["twitter"] })),
        ("/analyze", json!({ "keyword": "rust", "rss_limit": 0 })),
        ("/analyze", json!({ "keyword": "rust", "reddit_limit": 101 })),
        ("/analyze", json!({ "keyword": "rust", "news_pages": 11 })),
    ] {
        let resp = test_router()
            .oneshot(post_json(uri, payload.clone()))
            .await
            .expect("oneshot");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri} {payload}");
        let v: Json = serde_json::from_str(&body_text(resp).await).unwrap();
        assert!(v["error"].as_str().is_some_and(|e| !e.is_empty()));
    }
}

#[tokio::test]
async fn api_analyze_lists_every_requested_source() {
    let resp = test_router()
        .oneshot(post_json("/analyze", json!({ "keyword": "news", "news_pages": 1 })))
        .await
        .expect("oneshot /analyze");
    assert_eq!(resp.status(), StatusCode::OK);

    let v: Json = serde_json::from_str(&body_text(resp).await).unwrap();
    assert_eq!(v["summary"]["variant"], "topic");
    for method in ["lexicon", "rules"] {
        let m = &v["summary"]["methods"][method];
        assert_eq!(m["overall"]["positive"], 1, "{method}");
        assert_eq!(m["per_source"]["reddit"]["total"], 0, "{method}");
        assert_eq!(m["per_source"]["rss"]["total"], 0, "{method}");
        assert_eq!(m["dominant"], "positive");
        assert_eq!(m["overall"]["positive_percent"], 100.0, "{method}");
        assert_eq!(m["top_items"].as_array().map(Vec::len), Some(1), "{method}");
    }
    assert_eq!(v["provider_results"]["reddit"]["status"], "unavailable");
}

#[tokio::test]
async fn api_reports_are_plain_text_and_name_each_outcome() {
    let resp = test_router()
        .oneshot(post_json("/investigate/report", json!({ "target": "1.1.1.1" })))
        .await
        .expect("oneshot report");
    assert_eq!(resp.status(), StatusCode::OK);
    let ct = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(ct.starts_with("text/plain"), "content-type was {ct}");

    let text = body_text(resp).await;
    assert!(text.contains("Brisbane, Australia"));
    assert!(text.lines().any(|l| l.contains("portscan") && l.contains("unavailable")));
    assert!(text.lines().any(|l| l.contains("whois") && l.contains("connection reset")));

    let resp = test_router()
        .oneshot(post_json("/analyze/report", json!({ "keyword": "news", "sources": ["news"] })))
        .await
        .expect("oneshot analyze report");
    assert_eq!(resp.status(), StatusCode::OK);
    let text = body_text(resp).await;
    assert!(text.contains("great news today"));
    assert!(text.contains("lexicon"));
}
