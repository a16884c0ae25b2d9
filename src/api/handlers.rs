// src/api/handlers.rs
// HTTP handlers for the agent endpoints. Identity comes from headers set by
// the upstream auth proxy (x-user-id, x-family-id, optionally
// x-family-member-id and x-roles); the handlers build an AgentRunContext per
// request and hand everything to the orchestrator.

use axum::{
    extract::State,
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::agent::{AgentRequest, AgentRunContext, Orchestrator};
use crate::api::error::{ApiError, ApiResult};

pub struct AppState {
    pub orchestrator: Orchestrator,
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Build the per-request context from identity headers. `previous_context`
/// stays empty here; the orchestrator loads it.
fn run_context(headers: &HeaderMap, conversation_id: String) -> ApiResult<AgentRunContext> {
    let user_id =
        header(headers, "x-user-id").ok_or_else(|| ApiError::unauthorized("Missing x-user-id header"))?;
    let family_id = header(headers, "x-family-id")
        .ok_or_else(|| ApiError::unauthorized("Missing x-family-id header"))?;
    let family_member_id = header(headers, "x-family-member-id").unwrap_or_else(|| user_id.clone());
    let roles = header(headers, "x-roles")
        .map(|raw| {
            raw.split(',')
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .collect()
        })
        .unwrap_or_default();

    Ok(AgentRunContext {
        request_id: uuid::Uuid::new_v4().to_string(),
        user_id,
        family_id,
        family_member_id,
        roles,
        timezone: header(headers, "x-timezone"),
        conversation_id,
        previous_context: None,
    })
}

/// POST /agent/message
///
/// The single conversational entry point. A request carrying a confirmation
/// token with `confirmed: true` is dispatched to the confirmation flow
/// instead of routing the message text.
pub async fn agent_message(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(mut request): Json<AgentRequest>,
) -> ApiResult<Json<Value>> {
    let conversation_id = request
        .conversation_id
        .take()
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let mut context = run_context(&headers, conversation_id)?;
    if request.timezone.is_some() {
        context.timezone = request.timezone.clone();
    }

    if let Some(token) = request
        .confirmation_token
        .as_deref()
        .filter(|_| request.confirmed == Some(true))
    {
        info!("Confirmation request {} from {}", context.request_id, context.user_id);
        let response = state.orchestrator.confirm(token, context).await;
        return Ok(Json(serde_json::to_value(response).map_err(|e| {
            ApiError::internal(format!("Failed to serialize response: {}", e))
        })?));
    }

    if request.message.trim().is_empty() {
        return Err(ApiError::bad_request("Message must not be empty"));
    }

    info!(
        "Agent request {} from {} ({} chars)",
        context.request_id,
        context.user_id,
        request.message.len()
    );
    let response = state.orchestrator.orchestrate(&request, context).await;
    Ok(Json(serde_json::to_value(response).map_err(|e| {
        ApiError::internal(format!("Failed to serialize response: {}", e))
    })?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRequest {
    pub confirmation_token: String,
    pub conversation_id: Option<String>,
}

/// POST /agent/confirm
pub async fn agent_confirm(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<ConfirmRequest>,
) -> ApiResult<Json<Value>> {
    let conversation_id = request
        .conversation_id
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let context = run_context(&headers, conversation_id)?;

    let response = state
        .orchestrator
        .confirm(&request.confirmation_token, context)
        .await;
    Ok(Json(serde_json::to_value(response).map_err(|e| {
        ApiError::internal(format!("Failed to serialize response: {}", e))
    })?))
}

/// GET /agent/pending — the caller's own unexpired pending actions.
pub async fn agent_pending(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    let context = run_context(&headers, String::new())?;
    let pending = state
        .orchestrator
        .pending_actions()
        .get_by_user(&context.user_id)
        .await;
    let infos: Vec<_> = pending.iter().map(|p| p.to_info()).collect();
    Ok(Json(json!({ "pending": infos, "count": infos.len() })))
}

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
