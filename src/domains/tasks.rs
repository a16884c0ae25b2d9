// src/domains/tasks.rs
// Tasks domain: to-dos, reminders, chores. Creation and completion run
// immediately; deletion is destructive and goes through the confirmation
// gate.

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
        let assigned_to = input
            .get("assignedTo")
            .and_then(|v| v.as_str())
            .map(String::from);
        let due = input.get("due").and_then(|v| v.as_str()).map(String::from);

        let task = self
            .0
            .add_task(&ctx.family_id, title.trim(), assigned_to, due, &ctx.user_id)
            .await;
        Ok(json!({ "task": task }))
    }
}

struct ListTool(Arc<FamilyStore>);

#[async_trait]
impl ToolHandler for ListTool {
    async fn run(&self, _input: Value, ctx: &ToolContext) -> Result<Value> {
        let tasks = self.0.tasks(&ctx.family_id).await;
        let count = tasks.len();
        Ok(json!({ "tasks": tasks, "count": count }))
    }
}

struct CompleteTool(Arc<FamilyStore>);

#[async_trait]
impl ToolHandler for CompleteTool {
    async fn run(&self, input: Value, ctx: &ToolContext) -> Result<Value> {
        let id = input
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("Missing 'id' parameter"))?;
        let task = self
            .0
            .complete_task(&ctx.family_id, id)
            .await
            .ok_or_else(|| anyhow!("No task with id {}", id))?;
        Ok(json!({ "task": task }))
    }
}

struct DeleteTool(Arc<FamilyStore>);

#[async_trait]
impl ToolHandler for DeleteTool {
    async fn run(&self, input: Value, ctx: &ToolContext) -> Result<Value> {
        let target = input
            .get("id")
            .or_else(|| input.get("title"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("Missing 'id' or 'title' parameter"))?;
        let task = self
            .0
            .delete_task(&ctx.family_id, target)
            .await
            .ok_or_else(|| anyhow!("No task matching \"{}\"", target))?;
        Ok(json!({ "deleted": task }))
    }
}

pub fn register_tools(registry: &mut ToolRegistry, store: Arc<FamilyStore>) {
    registry.register("tasks.create", Arc::new(CreateTool(store.clone())));
    registry.register("tasks.list", Arc::new(ListTool(store.clone())));
    registry.register("tasks.complete", Arc::new(CompleteTool(store.clone())));
    registry.register("tasks.delete", Arc::new(DeleteTool(store)));
}

// ── Executor

// A listing needs both a view verb and task vocabulary. "list" alone is not
// enough; in chained messages it usually refers to a shopping list.
static LIST_VERB_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(show|list|what|which)\b").unwrap());
static TASK_NOUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(tasks?|to-?dos?|chores?)\b").unwrap());
static DELETE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:delete|remove|cancel|drop)\b\s+(?:the\s+)?(?:task\s+)?(?:to\s+)?(.*)$")
        .unwrap()
});
static TITLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:remind me to|remind me|add a task to|create a task to|a task to|task to|need to)\s+(.+)$")
        .unwrap()
});

fn trim_title(raw: &str) -> String {
    raw.trim().trim_end_matches(['.', '!', '?']).trim().to_string()
}

pub struct TasksExecutor {
    tools: Arc<ToolRegistry>,
    pending: Arc<PendingActionStore>,
}

impl TasksExecutor {
    pub fn new(tools: Arc<ToolRegistry>, pending: Arc<PendingActionStore>) -> Self {
        Self { tools, pending }
    }
}

#[async_trait]
impl DomainExecutor for TasksExecutor {
    async fn handle(&self, message: &str, ctx: &AgentRunContext) -> Result<ExecutorResult> {
        let tool_ctx = ToolContext::from(ctx);

        // A previous turn asked for the task title; this message is it.
        let awaiting_title = ctx
            .previous_context
            .as_ref()
            .and_then(|p| p.awaiting_input.as_deref())
            == Some("task title");

        if !awaiting_title {
            if let Some(caps) = DELETE_RE.captures(message) {
                let target = trim_title(&caps[1]);
                if !target.is_empty() {
                    return Ok(gate_for_confirmation(
                        &self.pending,
                        ctx,
                        ToolCall {
                            tool_name: "tasks.delete".into(),
                            input: json!({ "title": target }),
                        },
                        format!("Delete task: {}", target),
                        true,
                    )
                    .await);
                }
            }

            if LIST_VERB_RE.is_match(message) && TASK_NOUN_RE.is_match(message) {
                let result = self.tools.invoke("tasks.list", json!({}), &tool_ctx).await;
                let count = result
                    .data
                    .as_ref()
                    .and_then(|d| d.get("count"))
                    .and_then(|c| c.as_u64())
                    .unwrap_or(0);
                let payload = result.data.clone();
                let text = if count == 0 {
                    "There are no open tasks right now.".to_string()
                } else {
                    format!("You have {} task(s) on the family board.", count)
                };
                return Ok(ExecutorResult {
                    text,
                    actions: vec![AgentAction {
                        tool: "tasks.list".into(),
                        input: json!({}),
                        result,
                    }],
                    payload,
                    requires_confirmation: false,
                    pending_action: None,
                });
            }
        }

        let title = if awaiting_title {
            trim_title(message)
        } else {
            TITLE_RE
                .captures(message)
                .map(|caps| trim_title(&caps[1]))
                .unwrap_or_else(|| trim_title(message))
        };

        if title.is_empty() {
            return Ok(ExecutorResult {
                text: "What should the task say?".to_string(),
                actions: Vec::new(),
                payload: Some(json!({ "awaitingInput": "task title" })),
                requires_confirmation: false,
                pending_action: None,
            });
        }

        let input = json!({ "title": title });
        let result = self
            .tools
            .invoke("tasks.create", input.clone(), &tool_ctx)
            .await;
        let text = if result.success {
            format!("I've created the task \"{}\".", title)
        } else {
            format!(
                "I couldn't create that task: {}.",
                result.error.as_deref().unwrap_or("unknown error")
            )
        };
        let payload = result.data.clone();

        Ok(ExecutorResult {
            text,
            actions: vec![AgentAction {
                tool: "tasks.create".into(),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::{build_tools, test_run_context};

    fn executor() -> (TasksExecutor, Arc<PendingActionStore>) {
        let store = Arc::new(FamilyStore::new());
        let tools = Arc::new(build_tools(store));
        let pending = Arc::new(PendingActionStore::new());
        (TasksExecutor::new(tools, pending.clone()), pending)
    }

    #[tokio::test]
    async fn test_create_extracts_title() {
        let (executor, _) = executor();
        let result = executor
            .handle("Create a task to buy milk", &test_run_context())
            .await
            .unwrap();
        assert_eq!(result.actions.len(), 1);
        assert!(result.actions[0].result.success);
        assert_eq!(result.actions[0].input["title"], "buy milk");
        assert!(result.text.contains("buy milk"));
    }

    #[tokio::test]
    async fn test_listing_requires_task_vocabulary() {
        let (executor, _) = executor();
        let result = executor
            .handle("show my tasks", &test_run_context())
            .await
            .unwrap();
        assert_eq!(result.actions[0].tool, "tasks.list");
    }

    #[tokio::test]
    async fn test_chained_list_mention_still_creates_reminder() {
        let (executor, _) = executor();
        // "list" here belongs to the shopping half of a chained message.
        let result = executor
            .handle(
                "add milk to the list and also remind me to call mom",
                &test_run_context(),
            )
            .await
            .unwrap();
        assert_eq!(result.actions[0].tool, "tasks.create");
        assert_eq!(result.actions[0].input["title"], "call mom");
    }

    #[tokio::test]
    async fn test_delete_is_confirmation_gated() {
        let (executor, pending) = executor();
        let result = executor
            .handle("delete the task to buy milk", &test_run_context())
            .await
            .unwrap();
        assert!(result.requires_confirmation);
        let info = result.pending_action.unwrap();
        assert!(info.is_destructive);
        assert_eq!(info.tool_name, "tasks.delete");
        assert_eq!(pending.size().await, 1);
    }

    #[tokio::test]
    async fn test_awaiting_input_consumes_followup_as_title() {
        let (executor, _) = executor();
        let mut ctx = test_run_context();
        ctx.previous_context = Some(crate::agent::context::ConversationContext {
            last_domain: Some(crate::agent::types::Domain::Tasks),
            awaiting_input: Some("task title".into()),
            ..Default::default()
        });
        let result = executor.handle("water the plants", &ctx).await.unwrap();
        assert_eq!(result.actions[0].input["title"], "water the plants");
    }
}
