// src/domains/unknown.rs

use anyhow::Result;
use async_trait::async_trait;

use crate::agent::executor::{DomainExecutor, ExecutorResult};
use crate::agent::types::AgentRunContext;

/// Fallback executor for messages no domain claims. Never fails, never
/// touches any store; it just tells the user what the assistant can do.
pub struct UnknownExecutor;

const HELP_TEXT: &str = "I'm not sure what you'd like me to do. I can help with \
tasks (\"remind me to call the plumber\"), the calendar (\"what's on this week?\"), \
meal planning (\"plan tacos for Friday dinner\"), and shopping lists \
(\"add milk to the list\").";

#[async_trait]
impl DomainExecutor for UnknownExecutor {
    async fn handle(&self, _message: &str, _ctx: &AgentRunContext) -> Result<ExecutorResult> {
        Ok(ExecutorResult::text_only(HELP_TEXT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::test_run_context;

    #[tokio::test]
    async fn test_unknown_offers_help() {
        let result = UnknownExecutor
            .handle("asdf qwerty", &test_run_context())
            .await
            .unwrap();
        assert!(result.text.contains("shopping lists"));
        assert!(result.actions.is_empty());
        assert!(!result.requires_confirmation);
    }

    #[tokio::test]
    async fn test_unknown_has_no_confirmed_path() {
        let result = UnknownExecutor
            .handle_confirmed("pa_0000", &test_run_context())
            .await
            .unwrap();
        assert!(result.text.contains("nothing here"));
    }
}
