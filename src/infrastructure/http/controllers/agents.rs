use crate::application::services::agent_directory_service::{parse_capability, parse_presence};
use crate::domain::entities::{
    Agent, AgentStatusSummary, RegisterAgentRequest, RenameAgentRequest, SetPresenceRequest,
};
use crate::infrastructure::http::middleware::{ApiResult, AppState};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct StatusSummaryQuery {
    pub department_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BusinessHoursStatusResponse {
    pub agent_id: String,
    pub within_business_hours: bool,
}

/// POST /api/agents - Register or refresh an agent from the directory
pub async fn register_agent(
    State(state): State<AppState>,
    Json(request): Json<RegisterAgentRequest>,
) -> ApiResult<(StatusCode, Json<Agent>)> {
    let agent = state.agent_directory_service.register_agent(request).await?;
    Ok((StatusCode::CREATED, Json(agent)))
}

/// GET /api/agents
pub async fn list_agents(State(state): State<AppState>) -> ApiResult<Json<Vec<Agent>>> {
    Ok(Json(state.agent_directory_service.list_agents().await?))
}

/// GET /api/agents/:id
pub async fn get_agent(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
) -> ApiResult<Json<Agent>> {
    Ok(Json(state.agent_directory_service.get_agent(&agent_id).await?))
}

/// PUT /api/agents/:id/presence
pub async fn set_presence(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
    Json(request): Json<SetPresenceRequest>,
) -> ApiResult<Json<Agent>> {
    let status = parse_presence(&request.status)?;
    let agent = state
        .agent_directory_service
        .set_presence(&agent_id, status)
        .await?;
    Ok(Json(agent))
}

/// PUT /api/agents/:id/capabilities/:capability
pub async fn grant_capability(
    State(state): State<AppState>,
    Path((agent_id, capability)): Path<(String, String)>,
) -> ApiResult<Json<Agent>> {
    let capability = parse_capability(&capability)?;
    let agent = state
        .agent_directory_service
        .grant_capability(&agent_id, capability)
        .await?;
    Ok(Json(agent))
}

/// DELETE /api/agents/:id/capabilities/:capability
pub async fn revoke_capability(
    State(state): State<AppState>,
    Path((agent_id, capability)): Path<(String, String)>,
) -> ApiResult<Json<Agent>> {
    let capability = parse_capability(&capability)?;
    let agent = state
        .agent_directory_service
        .revoke_capability(&agent_id, capability)
        .await?;
    Ok(Json(agent))
}

/// PUT /api/agents/:id/username
pub async fn rename_agent(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
    Json(request): Json<RenameAgentRequest>,
) -> ApiResult<Json<Agent>> {
    let agent = state
        .agent_directory_service
        .rename_agent(&agent_id, &request.username)
        .await?;
    Ok(Json(agent))
}

/// GET /api/agents/status-summary?department_id=
pub async fn status_summary(
    State(state): State<AppState>,
    Query(query): Query<StatusSummaryQuery>,
) -> ApiResult<Json<AgentStatusSummary>> {
    let summary = state
        .agent_directory_service
        .count_agents_status(query.department_id.as_deref())
        .await?;
    Ok(Json(summary))
}

/// GET /api/agents/:id/business-hours
pub async fn agent_business_hours(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
) -> ApiResult<Json<BusinessHoursStatusResponse>> {
    let within_business_hours = state
        .agent_directory_service
        .is_within_business_hours(&agent_id)
        .await?;
    Ok(Json(BusinessHoursStatusResponse {
        agent_id,
        within_business_hours,
    }))
}
