// src/agent/context.rs
// Best-effort short-term memory across turns of one conversation, keyed by
// (conversationId, userId, familyId). Losing an entry degrades follow-up UX
// but cannot corrupt data, so there is no hard correctness requirement here —
// unlike the pending-action store. Entries idle out after a configurable
// window to bound memory.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::agent::types::Domain;
use crate::config::CONFIG;

/// What kind of query produced `last_results`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    Search,
    Analyze,
}

/// Lightweight summary of one calendar event kept for referential follow-ups
/// ("change those to all-day").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_day: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Value>,
}

/// The results of the last search/analysis turn, for follow-up references.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastResultsContext {
    pub domain: Domain,
    pub query_type: QueryType,
    pub description: String,
    pub items: Vec<EventSummary>,
    pub timestamp: DateTime<Utc>,
}

/// Short-lived cross-turn state for one conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationContext {
    pub last_domain: Option<Domain>,
    /// What follow-up input the system is waiting for, if any.
    pub awaiting_input: Option<String>,
    /// Partially-built entities awaiting completion across turns.
    pub pending_event: Option<Value>,
    pub pending_task: Option<Value>,
    pub last_results: Option<LastResultsContext>,
    pub updated_at: DateTime<Utc>,
}

impl Default for ConversationContext {
    fn default() -> Self {
        Self {
            last_domain: None,
            awaiting_input: None,
            pending_event: None,
            pending_task: None,
            last_results: None,
            updated_at: Utc::now(),
        }
    }
}

/// Partial update: `Some` fields overwrite, `None` fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct ContextPatch {
    pub last_domain: Option<Domain>,
    pub awaiting_input: Option<String>,
    pub pending_event: Option<Value>,
    pub pending_task: Option<Value>,
    pub last_results: Option<LastResultsContext>,
}

type ContextKey = (String, String, String);

fn key(conversation_id: &str, user_id: &str, family_id: &str) -> ContextKey {
    (
        conversation_id.to_string(),
        user_id.to_string(),
        family_id.to_string(),
    )
}

/// In-memory store of conversation contexts. Process-local, like the
/// pending-action store.
#[derive(Default)]
pub struct ConversationContextStore {
    contexts: RwLock<HashMap<ContextKey, ConversationContext>>,
}

impl ConversationContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(
        &self,
        conversation_id: &str,
        user_id: &str,
        family_id: &str,
    ) -> Option<ConversationContext> {
        let contexts = self.contexts.read().await;
        contexts
            .get(&key(conversation_id, user_id, family_id))
            .cloned()
    }

    /// Merge the given fields into any existing context, or create one.
    pub async fn set(
        &self,
        conversation_id: &str,
        user_id: &str,
        family_id: &str,
        patch: ContextPatch,
    ) {
        let mut contexts = self.contexts.write().await;
        let entry = contexts
            .entry(key(conversation_id, user_id, family_id))
            .or_default();

        if patch.last_domain.is_some() {
            entry.last_domain = patch.last_domain;
        }
        if patch.awaiting_input.is_some() {
            entry.awaiting_input = patch.awaiting_input;
        }
        if patch.pending_event.is_some() {
            entry.pending_event = patch.pending_event;
        }
        if patch.pending_task.is_some() {
            entry.pending_task = patch.pending_task;
        }
        if patch.last_results.is_some() {
            entry.last_results = patch.last_results;
        }
        entry.updated_at = Utc::now();
    }

    /// Remove the context entirely. A completed write closes the loop; stale
    /// awaiting-input state would mislead the next turn.
    pub async fn clear(&self, conversation_id: &str, user_id: &str, family_id: &str) {
        let mut contexts = self.contexts.write().await;
        contexts.remove(&key(conversation_id, user_id, family_id));
    }

    /// Drop contexts idle for longer than the configured window.
    pub async fn cleanup(&self) -> usize {
        let cutoff = Utc::now() - Duration::seconds(CONFIG.context_idle_secs);
        let mut contexts = self.contexts.write().await;
        let before = contexts.len();
        contexts.retain(|_, ctx| ctx.updated_at > cutoff);
        let removed = before - contexts.len();
        if removed > 0 {
            debug!("Conversation context cleanup removed {} idle entries", removed);
        }
        removed
    }

    pub async fn size(&self) -> usize {
        self.contexts.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_merges_instead_of_replacing() {
        let store = ConversationContextStore::new();
        store
            .set(
                "c1",
                "u1",
                "f1",
                ContextPatch {
                    last_domain: Some(Domain::Tasks),
                    awaiting_input: Some("due date".into()),
                    ..Default::default()
                },
            )
            .await;
        store
            .set(
                "c1",
                "u1",
                "f1",
                ContextPatch {
                    pending_task: Some(json!({ "title": "buy milk" })),
                    ..Default::default()
                },
            )
            .await;

        let ctx = store.get("c1", "u1", "f1").await.unwrap();
        assert_eq!(ctx.last_domain, Some(Domain::Tasks));
        assert_eq!(ctx.awaiting_input.as_deref(), Some("due date"));
        assert_eq!(ctx.pending_task.unwrap()["title"], "buy milk");
    }

    #[tokio::test]
    async fn test_keys_are_scoped_to_user_and_family() {
        let store = ConversationContextStore::new();
        store
            .set(
                "c1",
                "u1",
                "f1",
                ContextPatch {
                    last_domain: Some(Domain::Calendar),
                    ..Default::default()
                },
            )
            .await;

        assert!(store.get("c1", "u1", "f1").await.is_some());
        assert!(store.get("c1", "u2", "f1").await.is_none());
        assert!(store.get("c1", "u1", "f2").await.is_none());
    }

    #[tokio::test]
    async fn test_clear_removes_entry() {
        let store = ConversationContextStore::new();
        store
            .set(
                "c1",
                "u1",
                "f1",
                ContextPatch {
                    awaiting_input: Some("which list".into()),
                    ..Default::default()
                },
            )
            .await;
        assert_eq!(store.size().await, 1);

        store.clear("c1", "u1", "f1").await;
        assert!(store.get("c1", "u1", "f1").await.is_none());
        assert_eq!(store.size().await, 0);
    }
}
