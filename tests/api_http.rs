// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.

use std::sync::Arc;

use axum::{
    body::{self, Body},
    Router,
};
use http::{Request, StatusCode};
use chrono::DateTime;
use serde_json::json;
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use market_digest::ai_adapter::MockProvider;
use market_digest::analyze::Analyzer;
use market_digest::api::{self, AppState};
use market_digest::error::DigestError;
use market_digest::ingest::types::{Headline, SourceProvider};
use market_digest::ingest::Aggregator;
use market_digest::usage_log::MemoryUsageLog;

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

struct StubNews(Option<Vec<Headline>>);

#[async_trait::async_trait]
impl SourceProvider for StubNews {
    async fn fetch_latest(&self) -> Result<Vec<Headline>, DigestError> {
        self.0
            .clone()
            .ok_or_else(|| DigestError::source_unavailable("Stub", "down"))
    }
    fn name(&self) -> &'static str {
        "Stub"
    }
}

fn headline(title: &str, ts: i64) -> Headline {
    Headline {
        title: title.into(),
        url: Some("https://example.com".into()),
        published_at: DateTime::from_timestamp(ts, 0).unwrap(),
        source: "Reuters".into(),
        snippet: Some("snippet".into()),
    }
}

fn test_router(news: Option<Vec<Headline>>, mock: Arc<MockProvider>) -> Router {
    let aggregator = Aggregator::new(vec![Box::new(StubNews(news))], None, 20);
    let analyzer = Analyzer::new(mock, Arc::new(MemoryUsageLog::new()));
    api::router(AppState::new(aggregator, analyzer))
}

fn default_router() -> Router {
    test_router(
        Some(vec![headline("Fed holds", 100), headline("Oil slips", 200)]),
        Arc::new(MockProvider::new("**Trend A**\n- Point 1\n- Point 2")),
    )
}

fn post_json(uri: &str, payload: Json) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build request")
}

async fn read_json(resp: axum::response::Response) -> Json {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse json")
}

#[tokio::test]
async fn health_returns_ok() {
    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let resp = default_router().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    assert_eq!(&bytes[..], b"OK");
}

#[tokio::test]
async fn fetch_returns_headlines_indices_text_and_timestamp() {
    let resp = default_router()
        .oneshot(post_json("/fetch", json!({})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let v = read_json(resp).await;
    assert_eq!(v["success"], true);
    assert_eq!(v["headlines"].as_array().unwrap().len(), 2);
    assert_eq!(v["headlines"][0]["title"], "Oil slips");
    assert!(v["indices"].as_array().unwrap().is_empty());
    assert!(v["aggregated_text"]
        .as_str()
        .unwrap()
        .starts_with("Headline: Oil slips (Reuters)"));
    assert!(v.get("timestamp").is_some());
}

#[tokio::test]
async fn fetch_with_every_provider_down_is_503() {
    let app = test_router(None, Arc::new(MockProvider::new("x")));
    let resp = app.oneshot(post_json("/fetch_news", json!({}))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let v = read_json(resp).await;
    assert_eq!(v["success"], false);
    assert_eq!(v["kind"], "no_data_available");
}

#[tokio::test]
async fn summarize_blank_text_is_400_and_skips_model() {
    let mock = Arc::new(MockProvider::new("x"));
    let app = test_router(Some(vec![]), mock.clone());
    let resp = app
        .oneshot(post_json("/summarize", json!({ "text": "   " })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let v = read_json(resp).await;
    assert_eq!(v["kind"], "empty_input");
    assert_eq!(mock.calls(), 0);
}

#[tokio::test]
async fn summarize_returns_raw_and_html() {
    let resp = default_router()
        .oneshot(post_json(
            "/generate_summary",
            json!({
                "news_text": "Headline: Fed holds",
                "market_data": [{ "symbol": "^DJI", "price": 39000.0, "change": -0.5 }],
                "input_type": "fetched"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let v = read_json(resp).await;
    assert_eq!(v["success"], true);
    assert_eq!(v["summary"], "**Trend A**\n- Point 1\n- Point 2");
    assert_eq!(
        v["summary_html"],
        "<p><strong>Trend A</strong></p>\n<ul>\n<li>Point 1</li>\n<li>Point 2</li>\n</ul>"
    );
}

#[tokio::test]
async fn summarize_provider_failure_is_502_with_detail() {
    let app = test_router(
        Some(vec![]),
        Arc::new(MockProvider::failing("401: Incorrect API key provided")),
    );
    let resp = app
        .oneshot(post_json("/summarize", json!({ "text": "some news" })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let v = read_json(resp).await;
    assert_eq!(v["kind"], "analysis_error");
    assert!(v["error"].as_str().unwrap().contains("Incorrect API key"));
}

#[tokio::test]
async fn export_returns_pdf_attachment() {
    let resp = default_router()
        .oneshot(post_json(
            "/export",
            json!({
                "summary": "## Trends\n- Point",
                "headlines": [
                    { "title": "Fed holds", "url": "https://example.com",
                      "published_at": "2025-03-04T12:30:00Z", "source": "Reuters" },
                    { "title": "Minimal headline" }
                ]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "application/pdf"
    );
    let disp = resp
        .headers()
        .get("content-disposition")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");
    assert!(disp.contains("market_digest.pdf"));

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    assert!(bytes.starts_with(b"%PDF-"));
}

#[tokio::test]
async fn export_without_summary_is_400() {
    let resp = default_router()
        .oneshot(post_json("/export_pdf", json!({ "headlines": [] })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let v = read_json(resp).await;
    assert_eq!(v["error"], "No summary to export");
}

#[tokio::test]
async fn malformed_body_gets_json_error() {
    let resp = default_router()
        .oneshot(post_json("/summarize", json!({ "text": 42 })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let ct = resp
        .headers()
        .get("content-type")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("")
        .to_string();
    assert!(ct.starts_with("application/json"), "content-type: {ct}");
    let v = read_json(resp).await;
    assert_eq!(v["success"], false);
    assert_eq!(v["kind"], "bad_request");
    assert!(!v["error"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn export_without_json_content_type_gets_json_error() {
    let req = Request::builder()
        .method("POST")
        .uri("/export")
        .body(Body::from("summary=hello"))
        .unwrap();
    let resp = default_router().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let v = read_json(resp).await;
    assert_eq!(v["kind"], "bad_request");
}
