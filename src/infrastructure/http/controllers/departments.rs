use crate::domain::entities::{
    AddDepartmentAgentRequest, CreateDepartmentRequest, Department, DepartmentAgent,
    UpdateDepartmentRequest,
};
use crate::infrastructure::http::middleware::{optional_json, ApiResult, AppState};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct QueueQuery {
    /// Comma-separated usernames; absent lists every membership
    pub usernames: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResetCountsResponse {
    pub department_id: String,
    pub reset: u64,
}

/// POST /api/departments
pub async fn create_department(
    State(state): State<AppState>,
    Json(request): Json<CreateDepartmentRequest>,
) -> ApiResult<(StatusCode, Json<Department>)> {
    let department = state.department_service.create(request).await?;
    Ok((StatusCode::CREATED, Json(department)))
}

/// GET /api/departments
pub async fn list_departments(State(state): State<AppState>) -> ApiResult<Json<Vec<Department>>> {
    Ok(Json(state.department_service.list().await?))
}

/// GET /api/departments/:id
pub async fn get_department(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Department>> {
    Ok(Json(state.department_service.get(&id).await?))
}

/// PATCH /api/departments/:id
pub async fn update_department(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateDepartmentRequest>,
) -> ApiResult<Json<Department>> {
    Ok(Json(state.department_service.update(&id, request).await?))
}

/// DELETE /api/departments/:id - Cascades to memberships and windows
pub async fn delete_department(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.department_service.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/departments/:id/agents/:agent_id
pub async fn add_department_agent(
    State(state): State<AppState>,
    Path((department_id, agent_id)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<DepartmentAgent>> {
    let request: AddDepartmentAgentRequest = optional_json(&headers, &body)?;
    let membership = state
        .membership_service
        .add_agent(&department_id, &agent_id, request)
        .await?;
    Ok(Json(membership))
}

/// DELETE /api/departments/:id/agents/:agent_id - Idempotent
pub async fn remove_department_agent(
    State(state): State<AppState>,
    Path((department_id, agent_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    state
        .membership_service
        .remove_agent(&department_id, &agent_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/departments/:id/agents
pub async fn list_department_agents(
    State(state): State<AppState>,
    Path(department_id): Path<String>,
) -> ApiResult<Json<Vec<DepartmentAgent>>> {
    state.department_service.get(&department_id).await?;
    let memberships = state
        .membership_service
        .list_by_department(&department_id)
        .await?;
    Ok(Json(memberships))
}

/// POST /api/departments/:id/agents/reset-counts
pub async fn reset_department_counts(
    State(state): State<AppState>,
    Path(department_id): Path<String>,
) -> ApiResult<Json<ResetCountsResponse>> {
    let reset = state
        .membership_service
        .reset_counts(&department_id)
        .await?;
    Ok(Json(ResetCountsResponse {
        department_id,
        reset,
    }))
}

/// GET /api/queue?usernames=a,b
pub async fn list_queue(
    State(state): State<AppState>,
    Query(query): Query<QueueQuery>,
) -> ApiResult<Json<Vec<DepartmentAgent>>> {
    let usernames: Vec<String> = query
        .usernames
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string)
        .collect();

    Ok(Json(state.membership_service.list_queue(&usernames).await?))
}
