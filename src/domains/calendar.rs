// src/domains/calendar.rs
// Calendar domain: family events and schedule questions. Searches and new
// events run immediately; updates and deletes of existing events are gated
// behind confirmation, deletes as destructive. Search results land in the
// response payload under "events" so the orchestrator can remember them for
// referential follow-ups ("make those all-day").

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{gate_for_confirmation, run_confirmed_action};
use crate::agent::executor::{DomainExecutor, ExecutorResult};
use crate::agent::pending::PendingActionStore;
use crate::agent::types::{AgentAction, AgentRunContext, ToolCall};
use crate::store::FamilyStore;
use crate::tools::{ToolContext, ToolHandler, ToolRegistry};

// ── Tools

struct CreateTool(Arc<FamilyStore>);

#[async_trait]
impl ToolHandler for CreateTool {
    async fn run(&self, input: Value, ctx: &ToolContext) -> Result<Value> {
        let title = input
            .get("title")
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| anyhow!("Missing 'title' parameter"))?;
        let start = input
            .get("start")
            .and_then(|v| v.as_str())
            .map(String::from);
        let all_day = input
            .get("allDay")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        let event = self
            .0
            .add_event(&ctx.family_id, title.trim(), start, all_day, &ctx.user_id)
            .await;
        Ok(json!({ "event": event }))
    }
}

struct SearchTool(Arc<FamilyStore>);

#[async_trait]
impl ToolHandler for SearchTool {
    async fn run(&self, input: Value, ctx: &ToolContext) -> Result<Value> {
        let query = input.get("query").and_then(|v| v.as_str()).unwrap_or("");
        let events = self.0.search_events(&ctx.family_id, query).await;
        let count = events.len();
        Ok(json!({ "events": events, "count": count }))
    }
}

struct UpdateTool(Arc<FamilyStore>);

#[async_trait]
impl ToolHandler for UpdateTool {
    async fn run(&self, input: Value, ctx: &ToolContext) -> Result<Value> {
        let id = input
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("Missing 'id' parameter"))?;
        let title = input
            .get("title")
            .and_then(|v| v.as_str())
            .map(String::from);
        let start = input
            .get("start")
            .and_then(|v| v.as_str())
            .map(String::from);
        let all_day = input.get("allDay").and_then(|v| v.as_bool());

        let event = self
            .0
            .update_event(&ctx.family_id, id, title, start, all_day)
            .await
            .ok_or_else(|| anyhow!("No event with id {}", id))?;
        Ok(json!({ "event": event }))
    }
}

struct DeleteTool(Arc<FamilyStore>);

#[async_trait]
impl ToolHandler for DeleteTool {
    async fn run(&self, input: Value, ctx: &ToolContext) -> Result<Value> {
        let id = input
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("Missing 'id' parameter"))?;
        if !self.0.delete_event(&ctx.family_id, id).await {
            return Err(anyhow!("No event with id {}", id));
        }
        Ok(json!({ "deleted": id }))
    }
}

pub fn register_tools(registry: &mut ToolRegistry, store: Arc<FamilyStore>) {
    registry.register("calendar.create", Arc::new(CreateTool(store.clone())));
    registry.register("calendar.search", Arc::new(SearchTool(store.clone())));
    registry.register("calendar.update", Arc::new(UpdateTool(store.clone())));
    registry.register("calendar.delete", Arc::new(DeleteTool(store)));
}

// ── Executor

static SEARCH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(what|show|list|when|which|find|search|do (?:we|i) have)\b").unwrap()
});
static ANALYZE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(how many|how often|busiest|free time|analy[sz]e|overlap)\b").unwrap()
});
static UPDATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(change|update|move|reschedule|rename|make (?:those|them|it|that))\b")
        .unwrap()
});
static DELETE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(delete|remove|cancel)\b").unwrap());
static ALL_DAY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\ball[ -]?day\b").unwrap());
static TITLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:add|create|schedule|put)\s+(?:an?\s+)?(?:event\s+(?:for\s+|called\s+)?)?(.+)$")
        .unwrap()
});
static QUERY_STOPWORDS: Lazy<Regex> = Lazy::new(|| {
    // Longer alternatives first so "what's" is consumed whole.
    Regex::new(
        r"(?i)\b(what's|whats|what|show|me|list|when|is|are|the|my|our|do|we|i|have|on|calendar|events?|scheduled|for)\b",
    )
    .unwrap()
});

fn clean(raw: &str) -> String {
    raw.trim().trim_end_matches(['.', '!', '?']).trim().to_string()
}

/// Strip question scaffolding down to the words worth matching titles on.
fn extract_query(message: &str) -> String {
    let stripped = QUERY_STOPWORDS.replace_all(message, " ");
    clean(&stripped.split_whitespace().collect::<Vec<_>>().join(" "))
}

pub struct CalendarExecutor {
    tools: Arc<ToolRegistry>,
    pending: Arc<PendingActionStore>,
}

impl CalendarExecutor {
    pub fn new(tools: Arc<ToolRegistry>, pending: Arc<PendingActionStore>) -> Self {
        Self { tools, pending }
    }

    /// Resolve "those"/"it" against the events remembered from the previous
    /// search turn. First match wins; the reference flows are single-event.
    fn referenced_event_id(ctx: &AgentRunContext) -> Option<String> {
        ctx.previous_context
            .as_ref()
            .and_then(|p| p.last_results.as_ref())
            .and_then(|r| r.items.first())
            .map(|e| e.id.clone())
    }

    async fn run_search(
        &self,
        message: &str,
        analyze: bool,
        tool_ctx: &ToolContext,
    ) -> ExecutorResult {
        let input = json!({ "query": extract_query(message) });
        let result = self
            .tools
            .invoke("calendar.search", input.clone(), tool_ctx)
            .await;
        let count = result
            .data
            .as_ref()
            .and_then(|d| d.get("count"))
            .and_then(|c| c.as_u64())
            .unwrap_or(0);

        let mut payload = result.data.clone().unwrap_or_else(|| json!({}));
        let text = if analyze {
            let analysis = format!("{} event(s) match; see the payload for details.", count);
            if let Some(map) = payload.as_object_mut() {
                map.insert("analysis".into(), json!(analysis));
            }
            analysis
        } else if count == 0 {
            "I didn't find any matching events.".to_string()
        } else {
            format!("I found {} event(s).", count)
        };

        ExecutorResult {
            text,
            actions: vec![AgentAction {
                tool: "calendar.search".into(),
                input,
                result,
            }],
            payload: Some(payload),
            requires_confirmation: false,
            pending_action: None,
        }
    }
}

#[async_trait]
impl DomainExecutor for CalendarExecutor {
    async fn handle(&self, message: &str, ctx: &AgentRunContext) -> Result<ExecutorResult> {
        let tool_ctx = ToolContext::from(ctx);

        if DELETE_RE.is_match(message) {
            let Some(id) = Self::referenced_event_id(ctx) else {
                return Ok(ExecutorResult::text_only(
                    "Which event should I remove? Try searching for it first.",
                ));
            };
            return Ok(gate_for_confirmation(
                &self.pending,
                ctx,
                ToolCall {
                    tool_name: "calendar.delete".into(),
                    input: json!({ "id": id }),
                },
                "Delete that calendar event".to_string(),
                true,
            )
            .await);
        }

        if UPDATE_RE.is_match(message) {
            let Some(id) = Self::referenced_event_id(ctx) else {
                return Ok(ExecutorResult::text_only(
                    "Which event should I change? Try searching for it first.",
                ));
            };
            let mut input = json!({ "id": id });
            let mut description = "Update that calendar event".to_string();
            if ALL_DAY_RE.is_match(message) {
                input["allDay"] = json!(true);
                description = "Make that event all-day".to_string();
            }
            return Ok(gate_for_confirmation(
                &self.pending,
                ctx,
                ToolCall {
                    tool_name: "calendar.update".into(),
                    input,
                },
                description,
                false,
            )
            .await);
        }

        let analyze = ANALYZE_RE.is_match(message);
        if analyze || SEARCH_RE.is_match(message) {
            return Ok(self.run_search(message, analyze, &tool_ctx).await);
        }

        // Default to creating an event.
        let title = TITLE_RE
            .captures(message)
            .map(|caps| clean(&caps[1]))
            .unwrap_or_else(|| clean(message));
        if title.is_empty() {
            return Ok(ExecutorResult {
                text: "What should the event be called?".to_string(),
                actions: Vec::new(),
                payload: Some(json!({ "awaitingInput": "event title" })),
                requires_confirmation: false,
                pending_action: None,
            });
        }

        let input = json!({ "title": title, "allDay": ALL_DAY_RE.is_match(message) });
        let result = self
            .tools
            .invoke("calendar.create", input.clone(), &tool_ctx)
            .await;
        let text = if result.success {
            format!("I've added \"{}\" to the calendar.", title)
        } else {
            format!(
                "I couldn't add that event: {}.",
                result.error.as_deref().unwrap_or("unknown error")
            )
        };
        let payload = result.data.clone();

        Ok(ExecutorResult {
            text,
            actions: vec![AgentAction {
                tool: "calendar.create".into(),
                input,
                result,
            }],
            payload,
            requires_confirmation: false,
            pending_action: None,
        })
    }

    async fn handle_confirmed(&self, token: &str, ctx: &AgentRunContext) -> Result<ExecutorResult> {
        Ok(run_confirmed_action(&self.pending, &self.tools, token, ctx).await)
    }
}
