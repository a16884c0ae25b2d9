// src/agent/executor.rs
// Per-domain executor contract plus the registry the orchestrator resolves
// executors from. The registry is an explicit dependency-injection object
// built once at startup — no module-level mutable maps.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::agent::types::{AgentAction, AgentRunContext, Domain, PendingActionInfo};

/// What an executor produced for one turn.
#[derive(Debug, Clone, Default)]
pub struct ExecutorResult {
    pub text: String,
    pub actions: Vec<AgentAction>,
    pub payload: Option<Value>,
    pub requires_confirmation: bool,
    pub pending_action: Option<PendingActionInfo>,
}

impl ExecutorResult {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// A domain's message handler. `handle` interprets a raw message for its own
/// domain; `handle_confirmed` finishes a previously gated write, and is the
/// place where `PendingActionStore::consume` must be called.
#[async_trait]
pub trait DomainExecutor: Send + Sync {
    async fn handle(&self, message: &str, ctx: &AgentRunContext) -> Result<ExecutorResult>;

    async fn handle_confirmed(&self, token: &str, ctx: &AgentRunContext) -> Result<ExecutorResult> {
        let _ = (token, ctx);
        Ok(ExecutorResult::text_only(
            "There's nothing here waiting for confirmation.",
        ))
    }
}

/// Registry of one executor per domain. Last registration wins; domains with
/// no executor fall back to the `unknown` executor at resolve time.
#[derive(Default)]
pub struct ExecutorSet {
    executors: HashMap<Domain, Arc<dyn DomainExecutor>>,
}

impl ExecutorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, domain: Domain, executor: Arc<dyn DomainExecutor>) {
        self.executors.insert(domain, executor);
    }

    pub fn get(&self, domain: Domain) -> Option<Arc<dyn DomainExecutor>> {
        self.executors.get(&domain).cloned()
    }

    /// The executor for `domain`, or the unknown-domain executor when none is
    /// registered.
    pub fn resolve(&self, domain: Domain) -> Option<Arc<dyn DomainExecutor>> {
        self.get(domain).or_else(|| self.get(Domain::Unknown))
    }

    pub fn registered_domains(&self) -> Vec<Domain> {
        self.executors.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stub(&'static str);

    #[async_trait]
    impl DomainExecutor for Stub {
        async fn handle(&self, _message: &str, _ctx: &AgentRunContext) -> Result<ExecutorResult> {
            Ok(ExecutorResult::text_only(self.0))
        }
    }

    fn ctx() -> AgentRunContext {
        AgentRunContext {
            request_id: "r".into(),
            user_id: "u".into(),
            family_id: "f".into(),
            family_member_id: "m".into(),
            roles: vec![],
            timezone: None,
            conversation_id: "c".into(),
            previous_context: None,
        }
    }

    #[tokio::test]
    async fn test_resolve_falls_back_to_unknown() {
        let mut set = ExecutorSet::new();
        set.register(Domain::Unknown, Arc::new(Stub("fallback")));

        let exec = set.resolve(Domain::Meals).unwrap();
        let result = exec.handle("anything", &ctx()).await.unwrap();
        assert_eq!(result.text, "fallback");
    }

    #[tokio::test]
    async fn test_last_registration_wins() {
        let mut set = ExecutorSet::new();
        set.register(Domain::Tasks, Arc::new(Stub("first")));
        set.register(Domain::Tasks, Arc::new(Stub("second")));

        let exec = set.resolve(Domain::Tasks).unwrap();
        let result = exec.handle("x", &ctx()).await.unwrap();
        assert_eq!(result.text, "second");
    }
}
