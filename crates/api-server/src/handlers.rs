//! API request handlers

use axum::extract::{Path, State};
use axum::Json;
use phishlens_scoring::{CompositeVerdict, DomainReputation, PageContext};
use std::sync::Arc;
use tracing::{info, warn};

use crate::models::{ApiError, HealthResponse, UrlAnalysisRequest};
use crate::state::AppState;

/// Analyze a URL for phishing threats
pub async fn analyze_url(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UrlAnalysisRequest>,
) -> Result<Json<CompositeVerdict>, ApiError> {
    const PATH: &str = "/api/v1/analyze/url";

    if let Err(message) = request.validate() {
        warn!(url = request.url, "rejected malformed submission");
        return Err(ApiError::invalid_request(message, PATH));
    }

    info!(url = request.url, user = request.user_id.as_deref().unwrap_or("-"), "analyzing URL");

    let page = PageContext {
        title: request.page_title,
        text: request.page_text,
        css_colors: request.css_colors,
    };
    let page = page.has_content().then_some(page);

    state
        .pipeline
        .analyze_url(&request.url, page.as_ref())
        .await
        .map(Json)
        .map_err(|e| ApiError::analysis_failed(e.to_string(), PATH))
}

/// Threat-intelligence reputation for a bare domain
pub async fn domain_reputation(
    State(state): State<Arc<AppState>>,
    Path(domain): Path<String>,
) -> Json<DomainReputation> {
    info!(domain, "domain reputation lookup");
    Json(state.pipeline.domain_reputation(&domain).await)
}

/// Health check with component status
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let cache = state.pipeline.verdicts().cache().stats().await;

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        cache,
        ml_primary_loaded: state.pipeline.ml_primary_loaded(),
        feed_size: state.pipeline.intel().feed().len(),
    })
}
