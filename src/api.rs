use std::sync::Arc;

use axum::{
    extract::{FromRequest, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::analyze::Analyzer;
use crate::error::DigestError;
use crate::ingest::types::{Headline, IndexQuote};
use crate::ingest::{AggregatedDigest, Aggregator};
use crate::render::{to_display_markup, to_document};
use crate::usage_log::InputType;

pub const STATIC_DIR: &str = "static";

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    pub analyzer: Arc<Analyzer>,
}

impl AppState {
    pub fn new(aggregator: Aggregator, analyzer: Analyzer) -> Self {
        Self {
            aggregator: Arc::new(aggregator),
            analyzer: Arc::new(analyzer),
        }
    }
}

/// Public router. Legacy paths are kept as aliases for older UI builds.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/fetch", post(fetch_news))
        .route("/fetch_news", post(fetch_news))
        .route("/summarize", post(summarize))
        .route("/generate_summary", post(summarize))
        .route("/export", post(export))
        .route("/export_pdf", post(export))
        .fallback_service(ServeDir::new(STATIC_DIR))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// `Json` whose rejection is reported as a `DigestError` body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(DigestError))]
struct ApiJson<T>(T);

#[derive(serde::Serialize)]
struct FetchResp {
    success: bool,
    #[serde(flatten)]
    digest: AggregatedDigest,
}

async fn fetch_news(State(state): State<AppState>) -> Result<Json<FetchResp>, DigestError> {
    let digest = state.aggregator.aggregate().await?;
    Ok(Json(FetchResp {
        success: true,
        digest,
    }))
}

#[derive(serde::Deserialize)]
struct SummarizeReq {
    #[serde(default, alias = "news_text")]
    text: String,
    #[serde(default, alias = "market_data")]
    indices: Vec<IndexQuote>,
    #[serde(default)]
    input_type: InputType,
}

#[derive(serde::Serialize)]
struct SummarizeResp {
    success: bool,
    summary: String,
    summary_html: String,
}

async fn summarize(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<SummarizeReq>,
) -> Result<Json<SummarizeResp>, DigestError> {
    let summary = state
        .analyzer
        .summarize(&body.text, &body.indices, body.input_type)
        .await?;
    let summary_html = to_display_markup(&summary);
    Ok(Json(SummarizeResp {
        success: true,
        summary,
        summary_html,
    }))
}

#[derive(serde::Deserialize)]
struct ExportReq {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    headlines: Vec<Headline>,
}

async fn export(ApiJson(body): ApiJson<ExportReq>) -> Result<Response, DigestError> {
    if body.summary.is_empty() {
        return Err(DigestError::EmptyInput("No summary to export"));
    }
    let bytes = to_document(&body.summary, &body.headlines).inspect_err(|e| {
        tracing::error!(error = %e, "PDF export error");
    })?;
    tracing::info!(bytes = bytes.len(), headlines = body.headlines.len(), "PDF exported");

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"market_digest.pdf\"",
            ),
        ],
        bytes,
    )
        .into_response())
}
