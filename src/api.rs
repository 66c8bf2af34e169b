//! HTTP surface: manual pipeline trigger, dry-run assessment, and read-only
//! views over decisions, scopes, and the transparency report.
//!
//! The surface is deliberately thin: every handler delegates to the core
//! and maps store failures to 500. Policy refusals never become errors.

use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::assessment::{Assessment, RiskCategory};
use crate::classifier::{self, AssessContext};
use crate::pipeline::{self, PipelineReport};
use crate::post::{AuthorMeta, NormalizedPost};
use crate::report::{self, ReportSummary};
use crate::state::AppState;
use crate::store::{AppealStatus, DecisionRecord, FinalOutcome, OutcomeRecord, ScopeActivation};

type ApiError = (StatusCode, String);

fn internal(e: anyhow::Error) -> ApiError {
    (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}"))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/pipeline/run", post(run_pipeline_once))
        .route("/assess", post(assess_sample))
        .route("/decisions", get(list_decisions))
        .route("/scopes", get(list_scopes))
        .route("/outcomes", post(record_outcome))
        .route("/report", get(transparency_report))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Manual trigger for one pipeline run. Only total store unavailability is
/// an error; everything else lands inside the report.
async fn run_pipeline_once(
    State(state): State<AppState>,
) -> Result<Json<PipelineReport>, ApiError> {
    let report = pipeline::run_pipeline(&state).await.map_err(internal)?;
    Ok(Json(report))
}

#[derive(Deserialize)]
struct AssessReq {
    text: String,
    #[serde(default)]
    links: Vec<String>,
    #[serde(default)]
    recent_by_author: Vec<String>,
}

#[derive(Serialize)]
struct AssessResp {
    #[serde(skip_serializing_if = "Option::is_none")]
    assessment: Option<Assessment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply: Option<String>,
}

/// Dry-run classification of sample text: no record, no outbound action.
async fn assess_sample(
    State(state): State<AppState>,
    Json(body): Json<AssessReq>,
) -> Json<AssessResp> {
    let sample = NormalizedPost {
        post_id: "probe".to_string(),
        author_id: "probe-author".to_string(),
        author: AuthorMeta::default(),
        text: body.text,
        links: body.links,
        created_at: Utc::now(),
        scope_id: "probe-scope".to_string(),
        from_mention: false,
    };
    let ctx = AssessContext {
        recent_by_author: body.recent_by_author,
    };

    let assessment = classifier::assess(&sample, Some(&ctx));
    let reply = match &assessment {
        Some(a) => Some(state.composer.compose(a.category, &sample.text).await),
        None => None,
    };

    Json(AssessResp { assessment, reply })
}

fn query_usize(q: &HashMap<String, String>, key: &str, default: usize) -> usize {
    q.get(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

async fn list_decisions(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Result<Json<Vec<DecisionRecord>>, ApiError> {
    let limit = query_usize(&q, "limit", 50).min(500);
    let rows = state.store.recent_decisions(limit).await.map_err(internal)?;
    Ok(Json(rows))
}

async fn list_scopes(
    State(state): State<AppState>,
) -> Result<Json<Vec<ScopeActivation>>, ApiError> {
    let rows = state.store.scope_activations().await.map_err(internal)?;
    Ok(Json(rows))
}

#[derive(Deserialize)]
struct OutcomeReq {
    post_id: String,
    original_category: RiskCategory,
    original_score: f32,
    final_outcome: FinalOutcome,
    #[serde(default)]
    appeal_status: Option<AppealStatus>,
}

/// Append one learning outcome. The outcome log is append-only and never
/// mutates the decision it refers to.
async fn record_outcome(
    State(state): State<AppState>,
    Json(body): Json<OutcomeReq>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .store
        .append_outcome(OutcomeRecord {
            post_id: body.post_id,
            original_category: body.original_category,
            original_score: body.original_score,
            final_outcome: body.final_outcome,
            appeal_status: body.appeal_status,
            recorded_at: Utc::now(),
        })
        .await
        .map_err(internal)?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

#[derive(Serialize)]
struct ReportResp {
    summary: ReportSummary,
    text: String,
}

async fn transparency_report(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Result<Json<ReportResp>, ApiError> {
    let hours = query_usize(&q, "hours", 24).clamp(1, 24 * 30) as i64;
    let end = Utc::now();
    let start = end - Duration::hours(hours);
    let summary = report::window(state.store.as_ref(), start, end)
        .await
        .map_err(internal)?;
    let text = report::render_lines(&summary, &format!("{hours}h"));
    Ok(Json(ReportResp { summary, text }))
}
