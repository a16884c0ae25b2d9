// src/domains/meals.rs
// Meals domain: the weekly meal plan. Showing and saving plans both run
// immediately; a plan save only replaces one (date, meal) slot, so there is
// nothing destructive to gate. This executor also finishes confirmed
// shopping-side actions, since both prefixes resolve here.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use std::sync::Arc;

use super::run_confirmed_action;
use crate::agent::executor::{DomainExecutor, ExecutorResult};
use crate::agent::pending::PendingActionStore;
use crate::agent::types::{AgentAction, AgentRunContext};
use crate::store::FamilyStore;
use crate::tools::{ToolContext, ToolHandler, ToolRegistry};

// ── Tools

struct PlansTool(Arc<FamilyStore>);

#[async_trait]
impl ToolHandler for PlansTool {
    async fn run(&self, _input: Value, ctx: &ToolContext) -> Result<Value> {
        let plans = self.0.meal_plans(&ctx.family_id).await;
        let count = plans.len();
        Ok(json!({ "plans": plans, "count": count }))
    }
}

struct SavePlanTool(Arc<FamilyStore>);

#[async_trait]
impl ToolHandler for SavePlanTool {
    async fn run(&self, input: Value, ctx: &ToolContext) -> Result<Value> {
        let date = input
            .get("date")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("Missing 'date' parameter"))?;
        let meal = input
            .get("meal")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("Missing 'meal' parameter"))?;
        let recipe = input
            .get("recipe")
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| anyhow!("Missing 'recipe' parameter"))?;

        let plan = self
            .0
            .save_meal_plan(&ctx.family_id, date, meal, recipe.trim())
            .await;
        Ok(json!({ "plan": plan }))
    }
}

pub fn register_tools(registry: &mut ToolRegistry, store: Arc<FamilyStore>) {
    registry.register("meals.plans", Arc::new(PlansTool(store.clone())));
    registry.register("meals.savePlan", Arc::new(SavePlanTool(store)));
}

// ── Executor

static SHOW_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(what|whats|what's|show|list)\b").unwrap());
static MEAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(breakfast|lunch|dinner)\b").unwrap());
static DAY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(monday|tuesday|wednesday|thursday|friday|saturday|sunday|today|tomorrow|\d{4}-\d{2}-\d{2})\b")
        .unwrap()
});
static RECIPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:plan|make|have|cook)\s+(.+?)\s+for\s+(?:breakfast|lunch|dinner)\b")
        .unwrap()
});

pub struct MealsExecutor {
    tools: Arc<ToolRegistry>,
    pending: Arc<PendingActionStore>,
}

impl MealsExecutor {
    pub fn new(tools: Arc<ToolRegistry>, pending: Arc<PendingActionStore>) -> Self {
        Self { tools, pending }
    }
}

#[async_trait]
impl DomainExecutor for MealsExecutor {
    async fn handle(&self, message: &str, ctx: &AgentRunContext) -> Result<ExecutorResult> {
        let tool_ctx = ToolContext::from(ctx);

        let recipe = RECIPE_RE.captures(message).map(|caps| caps[1].to_string());

        if recipe.is_none() && SHOW_RE.is_match(message) {
            let result = self.tools.invoke("meals.plans", json!({}), &tool_ctx).await;
            let count = result
                .data
                .as_ref()
                .and_then(|d| d.get("count"))
                .and_then(|c| c.as_u64())
                .unwrap_or(0);
            let payload = result.data.clone();
            let text = if count == 0 {
                "There's no meal plan yet.".to_string()
            } else {
                format!("The plan has {} meal(s) on it.", count)
            };
            return Ok(ExecutorResult {
                text,
                actions: vec![AgentAction {
                    tool: "meals.plans".into(),
                    input: json!({}),
                    result,
                }],
                payload,
                requires_confirmation: false,
                pending_action: None,
            });
        }

        let Some(recipe) = recipe else {
            return Ok(ExecutorResult {
                text: "What should I plan, and for which meal? For example: \"plan tacos for dinner on Friday\"."
                    .to_string(),
                actions: Vec::new(),
                payload: Some(json!({ "awaitingInput": "meal plan details" })),
                requires_confirmation: false,
                pending_action: None,
            });
        };

        let meal = MEAL_RE
            .find(message)
            .map(|m| m.as_str().to_lowercase())
            .unwrap_or_else(|| "dinner".to_string());
        let date = DAY_RE
            .find(message)
            .map(|m| m.as_str().to_lowercase())
            .unwrap_or_else(|| "today".to_string());

        let input = json!({ "date": date, "meal": meal, "recipe": recipe });
        let result = self
            .tools
            .invoke("meals.savePlan", input.clone(), &tool_ctx)
            .await;
        let text = if result.success {
            format!("Planned: {} for {} on {}.", recipe, meal, date)
        } else {
            format!(
                "I couldn't save that plan: {}.",
                result.error.as_deref().unwrap_or("unknown error")
            )
        };
        let payload = result.data.clone();

        Ok(ExecutorResult {
            text,
            actions: vec![AgentAction {
                tool: "meals.savePlan".into(),
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

    fn executor() -> MealsExecutor {
        let store = Arc::new(FamilyStore::new());
        let tools = Arc::new(build_tools(store));
        MealsExecutor::new(tools, Arc::new(PendingActionStore::new()))
    }

    #[tokio::test]
    async fn test_plan_parses_recipe_meal_and_day() {
        let executor = executor();
        let result = executor
            .handle("plan tacos for dinner on Friday", &test_run_context())
            .await
            .unwrap();
        assert!(result.actions[0].result.success);
        let input = &result.actions[0].input;
        assert_eq!(input["recipe"], "tacos");
        assert_eq!(input["meal"], "dinner");
        assert_eq!(input["date"], "friday");
    }

    #[tokio::test]
    async fn test_show_lists_plans() {
        let executor = executor();
        executor
            .handle("plan pasta for lunch on Monday", &test_run_context())
            .await
            .unwrap();
        let result = executor
            .handle("what's on the meal plan", &test_run_context())
            .await
            .unwrap();
        assert_eq!(result.payload.unwrap()["count"], 1);
    }

    #[tokio::test]
    async fn test_unparseable_request_asks_for_details() {
        let executor = executor();
        let result = executor.handle("meals please", &test_run_context()).await.unwrap();
        assert!(result.actions.is_empty());
        assert_eq!(result.payload.unwrap()["awaitingInput"], "meal plan details");
    }
}
