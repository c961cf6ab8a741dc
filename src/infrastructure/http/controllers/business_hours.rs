use crate::domain::entities::{BusinessHourWindow, SaveBusinessHourRequest};
use crate::infrastructure::http::middleware::{ApiError, ApiResult, AppState};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct BusinessHoursQuery {
    /// Absent: the global schedule
    pub department_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OpenQuery {
    /// RFC 3339 instant, defaults to now
    pub at: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OpenResponse {
    pub department_id: String,
    pub open: bool,
    pub at: String,
}

#[derive(Debug, Serialize)]
pub struct RemovedResponse {
    pub removed: u64,
}

/// POST /api/business-hours - Create or replace a window
pub async fn save_business_hour(
    State(state): State<AppState>,
    Json(request): Json<SaveBusinessHourRequest>,
) -> ApiResult<Json<BusinessHourWindow>> {
    let window = state.business_hour_service.save(request).await?;
    Ok(Json(window))
}

/// GET /api/business-hours?department_id=
pub async fn list_business_hours(
    State(state): State<AppState>,
    Query(query): Query<BusinessHoursQuery>,
) -> ApiResult<Json<Vec<BusinessHourWindow>>> {
    let windows = match query.department_id.as_deref() {
        Some(department_id) => {
            state
                .business_hour_service
                .find_by_department(department_id)
                .await?
        }
        None => state.business_hour_service.find_global().await?,
    };
    Ok(Json(windows))
}

/// DELETE /api/business-hours/:id
pub async fn delete_business_hour(
    State(state): State<AppState>,
    Path(window_id): Path<String>,
) -> ApiResult<StatusCode> {
    state.business_hour_service.remove_window(&window_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/departments/:id/business-hours
pub async fn delete_department_business_hours(
    State(state): State<AppState>,
    Path(department_id): Path<String>,
) -> ApiResult<Json<RemovedResponse>> {
    let removed = state
        .business_hour_service
        .remove_by_department(&department_id)
        .await?;
    Ok(Json(RemovedResponse { removed }))
}

/// GET /api/departments/:id/open?at=
pub async fn is_department_open(
    State(state): State<AppState>,
    Path(department_id): Path<String>,
    Query(query): Query<OpenQuery>,
) -> ApiResult<Json<OpenResponse>> {
    let at = match query.at.as_deref() {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| ApiError::BadRequest(format!("Invalid RFC 3339 instant: {}", raw)))?,
        None => state.business_hour_evaluator.now(),
    };

    let open = state
        .business_hour_evaluator
        .is_open(&department_id, at)
        .await?;

    Ok(Json(OpenResponse {
        department_id,
        open,
        at: at.to_rfc3339(),
    }))
}
