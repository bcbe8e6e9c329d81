// src/api.rs
//! Thin HTTP adapter over the pipeline. Only defects produce a 500.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::acquire::types::{AcquisitionRequest, ProfileRecord};
use crate::acquire::{AcquireError, Acquired, AcquisitionFailure};
use crate::pipeline::{FieldPreviews, OutreachPipeline, PipelineError};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<OutreachPipeline>,
}

impl AppState {
    pub fn new(pipeline: OutreachPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let audio_dir = state.pipeline.audio_store().dir().to_path_buf();
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/outreach", post(outreach))
        .route("/api/debug-scrape", post(debug_scrape))
        .nest_service("/audio", ServeDir::new(audio_dir))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OutreachReq {
    #[serde(default)]
    linkedin_profile: Option<String>,
    #[serde(default)]
    product_description: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DebugOut {
    strategy: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    acquisition_error: Option<String>,
    #[serde(flatten)]
    previews: FieldPreviews,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OutreachResp {
    email: String,
    audio_url: String,
    scraped_data: ProfileRecord,
    product_description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<String>,
    debug: DebugOut,
}

async fn outreach(
    State(state): State<AppState>,
    Json(body): Json<OutreachReq>,
) -> Result<Json<OutreachResp>, ApiError> {
    let reference = body.linkedin_profile.unwrap_or_default();
    let result = state
        .pipeline
        .run(&reference, body.product_description.as_deref())
        .await?;

    let note = if result.diagnostics.notes.is_empty() {
        None
    } else {
        Some(result.diagnostics.notes.join("; "))
    };
    Ok(Json(OutreachResp {
        email: result.text,
        audio_url: result.audio.url().to_string(),
        scraped_data: result.record,
        product_description: result.product_description,
        note,
        debug: DebugOut {
            strategy: result.diagnostics.strategy,
            acquisition_error: result.diagnostics.acquisition_error,
            previews: result.diagnostics.previews,
        },
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DebugScrapeReq {
    #[serde(default)]
    linkedin_profile: Option<String>,
    #[serde(default)]
    strategy: Option<String>,
    /// Per-attempt cap in seconds; adapters keep their own budgets when absent.
    #[serde(default)]
    timeout_secs: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
enum ScrapeOutcome {
    Success(Acquired),
    Failure(AcquisitionFailure),
}

async fn debug_scrape(
    State(state): State<AppState>,
    Json(body): Json<DebugScrapeReq>,
) -> Result<Response, ApiError> {
    let Some(reference) = body.linkedin_profile.filter(|r| !r.trim().is_empty()) else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "LinkedIn profile URL required" })),
        )
            .into_response());
    };

    let mut request = AcquisitionRequest::new(reference);
    if let Some(s) = body.strategy.filter(|s| !s.trim().is_empty()) {
        request = request.restricted_to([s]);
    }
    if let Some(secs) = body.timeout_secs.filter(|s| *s > 0) {
        request = request.with_budget(std::time::Duration::from_secs(secs));
    }

    let outcome = match state.pipeline.orchestrator().acquire(&request).await {
        Ok(acquired) => ScrapeOutcome::Success(acquired),
        Err(AcquireError::Exhausted(failure)) => ScrapeOutcome::Failure(failure),
        Err(defect @ AcquireError::Defect { .. }) => {
            return Err(ApiError::Defect(defect.to_string()));
        }
    };

    Ok(Json(json!({
        "scrapingResult": outcome,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
    .into_response())
}

#[derive(Debug)]
pub enum ApiError {
    Defect(String),
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        ApiError::Defect(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Defect(details) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to generate outreach", "details": details })),
            )
                .into_response(),
        }
    }
}
