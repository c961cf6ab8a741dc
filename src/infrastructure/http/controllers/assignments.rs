use crate::domain::entities::{AssignmentResult, Selection};
use crate::infrastructure::http::middleware::{optional_json, ApiResult, AppState};
use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct SelectAgentRequest {
    pub department_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SelectionResponse {
    Assigned(AssignmentResult),
    Empty { status: &'static str },
}

impl From<Selection> for SelectionResponse {
    fn from(selection: Selection) -> Self {
        match selection {
            Selection::Assigned(result) => SelectionResponse::Assigned(result),
            Selection::NoAgentAvailable => SelectionResponse::Empty {
                status: "no_agent_available",
            },
        }
    }
}

/// POST /api/routing/next - Pick the next human agent
pub async fn select_next_agent(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<SelectionResponse>> {
    let request: SelectAgentRequest = optional_json(&headers, &body)?;
    let selection = state
        .assignment_service
        .select_next(request.department_id.as_deref())
        .await?;

    Ok(Json(selection.into()))
}

/// POST /api/routing/next-bot - Pick the next bot
pub async fn select_next_bot(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<SelectionResponse>> {
    let request: SelectAgentRequest = optional_json(&headers, &body)?;
    let selection = state
        .assignment_service
        .select_next_bot(request.department_id.as_deref())
        .await?;

    Ok(Json(selection.into()))
}
