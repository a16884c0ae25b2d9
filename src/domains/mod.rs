// src/domains/mod.rs
// Reference executors and tools for the four real domains plus the unknown
// fallback. Each executor is a thin adapter: light message parsing, tool
// invocation through the registry, and confirmation gating for writes that
// need a human sign-off. The agent core consumes these only through the
// DomainExecutor / ToolRegistry interfaces.

pub mod calendar;
pub mod meals;
pub mod shopping;
pub mod tasks;
pub mod unknown;

use serde_json::json;
use std::sync::Arc;

use crate::agent::executor::{ExecutorResult, ExecutorSet};
use crate::agent::pending::{CreatePendingAction, PendingActionStore};
use crate::agent::types::{AgentAction, AgentRunContext, Domain, ToolCall};
use crate::store::FamilyStore;
use crate::tools::{ToolContext, ToolRegistry};

/// Register every reference tool against one shared family store.
pub fn build_tools(store: Arc<FamilyStore>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    tasks::register_tools(&mut registry, store.clone());
    calendar::register_tools(&mut registry, store.clone());
    meals::register_tools(&mut registry, store.clone());
    shopping::register_tools(&mut registry, store);
    registry
}

/// Build the executor set for all five domains.
pub fn build_executors(
    tools: Arc<ToolRegistry>,
    pending: Arc<PendingActionStore>,
) -> ExecutorSet {
    let mut set = ExecutorSet::new();
    set.register(
        Domain::Tasks,
        Arc::new(tasks::TasksExecutor::new(tools.clone(), pending.clone())),
    );
    set.register(
        Domain::Calendar,
        Arc::new(calendar::CalendarExecutor::new(tools.clone(), pending.clone())),
    );
    set.register(
        Domain::Meals,
        Arc::new(meals::MealsExecutor::new(tools.clone(), pending.clone())),
    );
    set.register(
        Domain::Lists,
        Arc::new(shopping::ShoppingExecutor::new(tools.clone(), pending)),
    );
    set.register(Domain::Unknown, Arc::new(unknown::UnknownExecutor));
    set
}

/// Park a tool call behind a confirmation token and tell the user what is
/// waiting for them.
pub(crate) async fn gate_for_confirmation(
    pending: &PendingActionStore,
    ctx: &AgentRunContext,
    tool_call: ToolCall,
    description: String,
    is_destructive: bool,
) -> ExecutorResult {
    let action = pending
        .create(CreatePendingAction {
            user_id: ctx.user_id.clone(),
            family_id: ctx.family_id.clone(),
            request_id: ctx.request_id.clone(),
            conversation_id: ctx.conversation_id.clone(),
            tool_call,
            description: description.clone(),
            ttl_ms: None,
            is_destructive,
        })
        .await;

    ExecutorResult {
        text: format!("Just to confirm: {}?", description),
        actions: Vec::new(),
        payload: None,
        requires_confirmation: true,
        pending_action: Some(action.to_info()),
    }
}

/// Shared confirmed-action runner: consume the token (the at-most-once gate),
/// then execute the parked tool call. Any lookup failure surfaces as a single
/// opaque "nothing to confirm" message; the distinct reason goes to the
/// payload for operators and tests.
pub(crate) async fn run_confirmed_action(
    pending: &PendingActionStore,
    tools: &ToolRegistry,
    token: &str,
    ctx: &AgentRunContext,
) -> ExecutorResult {
    let action = match pending.consume(token, &ctx.user_id, &ctx.family_id).await {
        Ok(action) => action,
        Err(failure) => {
            return ExecutorResult {
                text: "That action has expired or was already confirmed. Please start over."
                    .to_string(),
                actions: Vec::new(),
                payload: Some(json!({ "error": failure.reason() })),
                requires_confirmation: false,
                pending_action: None,
            };
        }
    };

    let tool_ctx = ToolContext::from(ctx);
    let result = tools
        .invoke(&action.tool_call.tool_name, action.tool_call.input.clone(), &tool_ctx)
        .await;

    let text = if result.success {
        format!("Confirmed: {}.", action.description)
    } else {
        format!(
            "I couldn't finish that: {}.",
            result.error.as_deref().unwrap_or("the operation failed")
        )
    };

    ExecutorResult {
        text,
        actions: vec![AgentAction {
            tool: action.tool_call.tool_name.clone(),
            input: action.tool_call.input,
            result,
        }],
        payload: None,
        requires_confirmation: false,
        pending_action: None,
    }
}

#[cfg(test)]
pub(crate) fn test_run_context() -> AgentRunContext {
    AgentRunContext {
        request_id: "req-1".into(),
        user_id: "user-a".into(),
        family_id: "fam-x".into(),
        family_member_id: "member-1".into(),
        roles: vec!["adult".into()],
        timezone: Some("Europe/Berlin".into()),
        conversation_id: "conv-1".into(),
        previous_context: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_confirmed_action_is_single_use() {
        let store = Arc::new(FamilyStore::new());
        let tools = build_tools(store);
        let pending = PendingActionStore::new();
        let ctx = test_run_context();

        let gated = gate_for_confirmation(
            &pending,
            &ctx,
            ToolCall {
                tool_name: "tasks.create".into(),
                input: json!({ "title": "buy milk" }),
            },
            "Create task: buy milk".into(),
            false,
        )
        .await;
        let token = gated.pending_action.unwrap().token;

        let first = run_confirmed_action(&pending, &tools, &token, &ctx).await;
        assert_eq!(first.actions.len(), 1);
        assert!(first.actions[0].result.success);

        let second = run_confirmed_action(&pending, &tools, &token, &ctx).await;
        assert!(second.actions.is_empty());
        assert_eq!(second.payload.unwrap()["error"], "not_found");
    }
}
