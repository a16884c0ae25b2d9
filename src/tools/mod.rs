// src/tools/mod.rs
// Typed tool registry: maps dot-namespaced tool names (tasks.create,
// calendar.search, shopping.addItems) to side-effecting handlers. The
// orchestrator never inspects tool internals; domain executors invoke tools by
// name with arbitrary JSON in and arbitrary JSON out.

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::agent::types::AgentRunContext;

/// Per-invocation context handed to tool handlers.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub request_id: String,
    pub user_id: String,
    pub family_id: String,
    pub family_member_id: String,
    pub roles: Vec<String>,
    pub timezone: Option<String>,
}

impl From<&AgentRunContext> for ToolContext {
    fn from(ctx: &AgentRunContext) -> Self {
        Self {
            request_id: ctx.request_id.clone(),
            user_id: ctx.user_id.clone(),
            family_id: ctx.family_id.clone(),
            family_member_id: ctx.family_member_id.clone(),
            roles: ctx.roles.clone(),
            timezone: ctx.timezone.clone(),
        }
    }
}

/// Outcome of one tool invocation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_ms: Option<u64>,
}

impl ToolResult {
    pub fn ok(data: Value, execution_ms: u64) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            execution_ms: Some(execution_ms),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            execution_ms: None,
        }
    }
}

/// A single named, input-validating, side-effecting operation.
/// Handlers validate their own input and return a JSON payload on success.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn run(&self, input: Value, ctx: &ToolContext) -> Result<Value>;
}

/// Registry of tool handlers, built once at startup and shared behind an Arc.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under a dot-namespaced name. Last registration wins.
    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn ToolHandler>) {
        self.tools.insert(name.into(), handler);
    }

    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Execute a tool by name. Handler failures are captured into the result
    /// rather than propagated, so a broken tool cannot take down a turn.
    pub async fn invoke(&self, name: &str, input: Value, ctx: &ToolContext) -> ToolResult {
        let Some(handler) = self.tools.get(name) else {
            warn!("Unknown tool requested: {}", name);
            return ToolResult::failure(format!("Unknown tool: {}", name));
        };

        let start = Instant::now();
        match handler.run(input, ctx).await {
            Ok(data) => {
                let elapsed = start.elapsed().as_millis() as u64;
                info!("Tool {} completed in {}ms", name, elapsed);
                ToolResult::ok(data, elapsed)
            }
            Err(e) => {
                warn!("Tool {} failed: {}", name, e);
                ToolResult {
                    success: false,
                    data: None,
                    error: Some(e.to_string()),
                    execution_ms: Some(start.elapsed().as_millis() as u64),
                }
            }
        }
    }
}
