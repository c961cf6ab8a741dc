use crate::application::services::RefreshReport;
use crate::infrastructure::http::middleware::{ApiResult, AppState};
use axum::{extract::State, Json};
use serde_json::{json, Value};

/// POST /api/availability/refresh - Recheck every livechat agent now
pub async fn refresh_availability(State(state): State<AppState>) -> ApiResult<Json<RefreshReport>> {
    let report = state
        .business_hour_evaluator
        .refresh_agent_availability()
        .await?;
    Ok(Json(report))
}

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
