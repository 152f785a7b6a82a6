use std::sync::Arc;

use shuttle_axum::axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::aggregate::{AggregateError, AggregateRecord, Aggregator};
use crate::ingest::providers::google_news::NEWS_PAGE_SIZE;
use crate::ingest::types::{ItemLimits, SourceId};
use crate::report::{Renderer, TextReport};
use crate::target::TopicTarget;

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
}

impl AppState {
    pub fn new(aggregator: Aggregator) -> Self {
        Self {
            aggregator: Arc::new(aggregator),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/investigate", post(investigate))
        .route("/investigate/report", post(investigate_report))
        .route("/analyze", post(analyze))
        .route("/analyze/report", post(analyze_report))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl From<AggregateError> for ApiError {
    fn from(e: AggregateError) -> Self {
        match e {
            AggregateError::Target(t) => ApiError::BadRequest(t.to_string()),
            AggregateError::Merge(_) => {
                tracing::error!(error = %e, "aggregation defect");
                ApiError::Internal(e.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[derive(serde::Deserialize)]
struct InvestigateReq {
    target: String,
}

#[derive(serde::Deserialize)]
struct AnalyzeReq {
    keyword: String,
    #[serde(default)]
    sources: Vec<String>, // empty = every topic source
    reddit_limit: Option<usize>,
    /// Google News result pages; one page is `NEWS_PAGE_SIZE` items.
    news_pages: Option<usize>,
    rss_limit: Option<usize>,
}

impl AnalyzeReq {
    fn into_target(self) -> Result<TopicTarget, ApiError> {
        let sources = self
            .sources
            .iter()
            .map(|s| s.parse::<SourceId>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(ApiError::BadRequest)?;
        let limits = ItemLimits {
            reddit: self.reddit_limit,
            news: self.news_pages.map(|p| p.saturating_mul(NEWS_PAGE_SIZE)),
            rss_per_feed: self.rss_limit,
        };
        TopicTarget::new(&self.keyword, sources)
            .and_then(|t| t.with_limits(limits))
            .map_err(|e| ApiError::BadRequest(e.to_string()))
    }
}

async fn investigate(
    State(state): State<AppState>,
    Json(body): Json<InvestigateReq>,
) -> Result<Json<AggregateRecord>, ApiError> {
    let record = state.aggregator.investigate_network(&body.target).await?;
    Ok(Json(record))
}

async fn analyze(
    State(state): State<AppState>,
    Json(body): Json<AnalyzeReq>,
) -> Result<Json<AggregateRecord>, ApiError> {
    let target = body.into_target()?;
    let record = state.aggregator.investigate_topic(target).await?;
    Ok(Json(record))
}

async fn investigate_report(
    State(state): State<AppState>,
    Json(body): Json<InvestigateReq>,
) -> Result<Response, ApiError> {
    let record = state.aggregator.investigate_network(&body.target).await?;
    text_report(&record)
}

async fn analyze_report(
    State(state): State<AppState>,
    Json(body): Json<AnalyzeReq>,
) -> Result<Response, ApiError> {
    let target = body.into_target()?;
    let record = state.aggregator.investigate_topic(target).await?;
    text_report(&record)
}

fn text_report(record: &AggregateRecord) -> Result<Response, ApiError> {
    let artifact = TextReport
        .render(record)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok((
        [(header::CONTENT_TYPE, artifact.media_type)],
        artifact.content,
    )
        .into_response())
}
