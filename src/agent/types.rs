// src/agent/types.rs
// Shared types for the agent core. Wire-facing DTOs keep camelCase field names
// so the web client contract stays stable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::ToolResult;

/// The fixed set of domains a message can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Tasks,
    Calendar,
    Meals,
    Lists,
    Unknown,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Tasks => "tasks",
            Domain::Calendar => "calendar",
            Domain::Meals => "meals",
            Domain::Lists => "lists",
            Domain::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Option<Domain> {
        match s.trim().to_lowercase().as_str() {
            "tasks" => Some(Domain::Tasks),
            "calendar" => Some(Domain::Calendar),
            "meals" => Some(Domain::Meals),
            "lists" => Some(Domain::Lists),
            "unknown" => Some(Domain::Unknown),
            _ => None,
        }
    }

    /// Resolve which domain's confirmed-action executor owns a tool call.
    ///
    /// Tool names follow the `domain.verb` convention (`calendar.update`,
    /// `shopping.addItems`). Meals and shopping confirmations are both handled
    /// by the meals executor; anything unrecognized defaults to tasks.
    pub fn from_tool_name(tool_name: &str) -> Domain {
        if tool_name.starts_with("calendar.") {
            Domain::Calendar
        } else if tool_name.starts_with("meals.") || tool_name.starts_with("shopping.") {
            Domain::Meals
        } else {
            Domain::Tasks
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One routing decision: best-guess domain plus how sure we are and why.
/// Ephemeral, consumed immediately by the orchestrator.
#[derive(Debug, Clone, Serialize)]
pub struct IntentRoute {
    pub domain: Domain,
    pub confidence: f32,
    pub reasons: Vec<String>,
}

/// An intended side-effecting operation before it runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    pub tool_name: String,
    pub input: Value,
}

/// Inbound request to the orchestrator.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRequest {
    #[serde(default)]
    pub message: String,
    pub conversation_id: Option<String>,
    pub domain_hint: Option<Domain>,
    pub confirmation_token: Option<String>,
    pub confirmed: Option<bool>,
    pub timezone: Option<String>,
}

/// Audit record of one tool invocation during a turn.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentAction {
    pub tool: String,
    pub input: Value,
    pub result: ToolResult,
}

/// Sanitized view of a pending action, safe to show a user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingActionInfo {
    pub token: String,
    pub description: String,
    pub tool_name: String,
    pub input_preview: Value,
    /// ISO-8601 expiry timestamp.
    pub expires_at: DateTime<Utc>,
    pub is_destructive: bool,
}

/// Uniform response envelope returned for every turn.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResponse {
    pub text: String,
    pub actions: Vec<AgentAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    pub domain: Domain,
    pub conversation_id: String,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_confirmation: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_action: Option<PendingActionInfo>,
}

/// Per-request execution context threaded through the whole core.
///
/// `previous_context` is populated by the orchestrator itself before executor
/// dispatch; callers leave it `None`. Logging rides on `tracing` spans rather
/// than an explicit logger handle.
#[derive(Debug, Clone)]
pub struct AgentRunContext {
    pub request_id: String,
    pub user_id: String,
    pub family_id: String,
    pub family_member_id: String,
    pub roles: Vec<String>,
    pub timezone: Option<String>,
    pub conversation_id: String,
    pub previous_context: Option<crate::agent::context::ConversationContext>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_parse_roundtrip() {
        for d in [
            Domain::Tasks,
            Domain::Calendar,
            Domain::Meals,
            Domain::Lists,
            Domain::Unknown,
        ] {
            assert_eq!(Domain::parse(d.as_str()), Some(d));
        }
        assert_eq!(Domain::parse("groceries"), None);
    }

    #[test]
    fn test_domain_from_tool_name() {
        assert_eq!(Domain::from_tool_name("calendar.update"), Domain::Calendar);
        assert_eq!(Domain::from_tool_name("meals.savePlan"), Domain::Meals);
        assert_eq!(Domain::from_tool_name("shopping.addItems"), Domain::Meals);
        assert_eq!(Domain::from_tool_name("tasks.create"), Domain::Tasks);
        assert_eq!(Domain::from_tool_name("something.else"), Domain::Tasks);
    }
}
