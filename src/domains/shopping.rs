// src/domains/shopping.rs
// Lists domain: the shared shopping list. Adding and showing items run
// immediately; removing an item is gated as destructive. Confirmed removals
// are finished by the meals executor, which owns both tool prefixes.

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

const DEFAULT_LIST: &str = "shopping";

// ── Tools

struct AddItemsTool(Arc<FamilyStore>);

#[async_trait]
impl ToolHandler for AddItemsTool {
    async fn run(&self, input: Value, ctx: &ToolContext) -> Result<Value> {
        let names: Vec<String> = input
            .get("items")
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|i| i.as_str())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        if names.is_empty() {
            return Err(anyhow!("Missing 'items' parameter"));
        }
        let list = input
            .get("list")
            .and_then(|v| v.as_str())
            .unwrap_or(DEFAULT_LIST);

        let added = self.0.add_items(&ctx.family_id, list, &names).await;
        let count = added.len();
        Ok(json!({ "items": added, "count": count }))
    }
}

struct ListTool(Arc<FamilyStore>);

#[async_trait]
impl ToolHandler for ListTool {
    async fn run(&self, input: Value, ctx: &ToolContext) -> Result<Value> {
        let list = input
            .get("list")
            .and_then(|v| v.as_str())
            .unwrap_or(DEFAULT_LIST);
        let items = self.0.items(&ctx.family_id, list).await;
        let count = items.len();
        Ok(json!({ "items": items, "count": count }))
    }
}

struct RemoveItemTool(Arc<FamilyStore>);

#[async_trait]
impl ToolHandler for RemoveItemTool {
    async fn run(&self, input: Value, ctx: &ToolContext) -> Result<Value> {
        let name = input
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("Missing 'name' parameter"))?;
        let list = input
            .get("list")
            .and_then(|v| v.as_str())
            .unwrap_or(DEFAULT_LIST);
        if !self.0.remove_item(&ctx.family_id, list, name).await {
            return Err(anyhow!("\"{}\" is not on the {} list", name, list));
        }
        Ok(json!({ "removed": name }))
    }
}

pub fn register_tools(registry: &mut ToolRegistry, store: Arc<FamilyStore>) {
    registry.register("shopping.addItems", Arc::new(AddItemsTool(store.clone())));
    registry.register("shopping.list", Arc::new(ListTool(store.clone())));
    registry.register("shopping.removeItem", Arc::new(RemoveItemTool(store)));
}

// ── Executor

static SHOW_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(what|whats|what's|show|read)\b").unwrap());
static REMOVE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:remove|take|cross|delete)\b\s+(?:off\s+)?(.+?)(?:\s+(?:off|from)\b.*)?$")
        .unwrap()
});
static ADD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:add|put|buy|get|pick up|need|out of|running low on)\s+(.+?)(?:\s+(?:to|on)\s+(?:the|my|our)\b.*)?$",
    )
    .unwrap()
});

fn split_items(raw: &str) -> Vec<String> {
    raw.split(',')
        .flat_map(|part| part.split(" and "))
        .map(|part| {
            part.trim()
                .trim_start_matches("some ")
                .trim_end_matches(['.', '!', '?'])
                .trim()
                .to_string()
        })
        .filter(|part| !part.is_empty())
        .collect()
}

pub struct ShoppingExecutor {
    tools: Arc<ToolRegistry>,
    pending: Arc<PendingActionStore>,
}

impl ShoppingExecutor {
    pub fn new(tools: Arc<ToolRegistry>, pending: Arc<PendingActionStore>) -> Self {
        Self { tools, pending }
    }
}

#[async_trait]
impl DomainExecutor for ShoppingExecutor {
    async fn handle(&self, message: &str, ctx: &AgentRunContext) -> Result<ExecutorResult> {
        let tool_ctx = ToolContext::from(ctx);

        if let Some(caps) = REMOVE_RE.captures(message) {
            let name = split_items(&caps[1]).into_iter().next().unwrap_or_default();
            if !name.is_empty() {
                return Ok(gate_for_confirmation(
                    &self.pending,
                    ctx,
                    ToolCall {
                        tool_name: "shopping.removeItem".into(),
                        input: json!({ "name": name, "list": DEFAULT_LIST }),
                    },
                    format!("Remove \"{}\" from the shopping list", name),
                    true,
                )
                .await);
            }
        }

        if let Some(caps) = ADD_RE.captures(message) {
            let items = split_items(&caps[1]);
            if !items.is_empty() {
                let input = json!({ "items": items, "list": DEFAULT_LIST });
                let result = self
                    .tools
                    .invoke("shopping.addItems", input.clone(), &tool_ctx)
                    .await;
                let text = if result.success {
                    format!("Added {} item(s) to the shopping list.", items.len())
                } else {
                    format!(
                        "I couldn't update the list: {}.",
                        result.error.as_deref().unwrap_or("unknown error")
                    )
                };
                let payload = result.data.clone();
                return Ok(ExecutorResult {
                    text,
                    actions: vec![AgentAction {
                        tool: "shopping.addItems".into(),
                        input,
                        result,
                    }],
                    payload,
                    requires_confirmation: false,
                    pending_action: None,
                });
            }
        }

        if SHOW_RE.is_match(message) {
            let input = json!({ "list": DEFAULT_LIST });
            let result = self
                .tools
                .invoke("shopping.list", input.clone(), &tool_ctx)
                .await;
            let count = result
                .data
                .as_ref()
                .and_then(|d| d.get("count"))
                .and_then(|c| c.as_u64())
                .unwrap_or(0);
            let payload = result.data.clone();
            let text = if count == 0 {
                "The shopping list is empty.".to_string()
            } else {
                format!("There are {} item(s) on the shopping list.", count)
            };
            return Ok(ExecutorResult {
                text,
                actions: vec![AgentAction {
                    tool: "shopping.list".into(),
                    input,
                    result,
                }],
                payload,
                requires_confirmation: false,
                pending_action: None,
            });
        }

        Ok(ExecutorResult {
            text: "What should I add to the list?".to_string(),
            actions: Vec::new(),
            payload: Some(json!({ "awaitingInput": "list items" })),
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

    fn executor() -> (ShoppingExecutor, Arc<PendingActionStore>) {
        let store = Arc::new(FamilyStore::new());
        let tools = Arc::new(build_tools(store));
        let pending = Arc::new(PendingActionStore::new());
        (ShoppingExecutor::new(tools, pending.clone()), pending)
    }

    #[test]
    fn test_split_items_handles_commas_and_and() {
        assert_eq!(
            split_items("milk, eggs and some bread"),
            vec!["milk", "eggs", "bread"]
        );
    }

    #[tokio::test]
    async fn test_add_items_runs_immediately() {
        let (executor, pending) = executor();
        let result = executor
            .handle("add milk and eggs to the shopping list", &test_run_context())
            .await
            .unwrap();
        assert!(result.actions[0].result.success);
        assert_eq!(result.payload.unwrap()["count"], 2);
        assert_eq!(pending.size().await, 0);
    }

    #[tokio::test]
    async fn test_remove_is_gated() {
        let (executor, _) = executor();
        let result = executor
            .handle("remove milk from the list", &test_run_context())
            .await
            .unwrap();
        assert!(result.requires_confirmation);
        let info = result.pending_action.unwrap();
        assert_eq!(info.tool_name, "shopping.removeItem");
        assert!(info.is_destructive);
    }
}
