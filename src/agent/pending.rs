// src/agent/pending.rs
// In-memory registry of write operations awaiting human confirmation.
//
// Tokens are opaque `pa_<32 hex>` capabilities (128 bits of randomness) and are
// single-use: `consume` removes the entry under the same write guard that
// validates it, so two concurrent confirmations with the same token resolve to
// exactly one success. Expiry is computed lazily at read time; `cleanup()` only
// bounds memory growth from abandoned actions.
//
// Process-local by design. Horizontal scaling needs a shared backing store with
// atomic compare-and-delete; the external contract here would stay the same.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::agent::types::{PendingActionInfo, ToolCall};
use crate::config::CONFIG;

/// A not-yet-executed write operation gated behind confirmation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingAction {
    pub token: String,
    pub user_id: String,
    pub family_id: String,
    pub request_id: String,
    pub conversation_id: String,
    pub tool_call: ToolCall,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub ttl_ms: i64,
    pub is_destructive: bool,
}

impl PendingAction {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + Duration::milliseconds(self.ttl_ms)
    }

    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }

    /// Sanitized view, safe to hand back to the caller for UI display.
    pub fn to_info(&self) -> PendingActionInfo {
        PendingActionInfo {
            token: self.token.clone(),
            description: self.description.clone(),
            tool_name: self.tool_call.tool_name.clone(),
            input_preview: self.tool_call.input.clone(),
            expires_at: self.expires_at(),
            is_destructive: self.is_destructive,
        }
    }
}

/// Creation parameters; `ttl_ms` and `is_destructive` are optional.
#[derive(Debug, Clone)]
pub struct CreatePendingAction {
    pub user_id: String,
    pub family_id: String,
    pub request_id: String,
    pub conversation_id: String,
    pub tool_call: ToolCall,
    pub description: String,
    pub ttl_ms: Option<i64>,
    pub is_destructive: bool,
}

/// Why a lookup failed. Callers surface all three as an opaque "nothing to
/// confirm"; the distinction exists for logs and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LookupFailure {
    #[error("pending action not found or expired")]
    NotFound,
    #[error("pending action belongs to a different user")]
    UserMismatch,
    #[error("pending action belongs to a different family")]
    FamilyMismatch,
}

impl LookupFailure {
    pub fn reason(&self) -> &'static str {
        match self {
            LookupFailure::NotFound => "not_found",
            LookupFailure::UserMismatch => "user_mismatch",
            LookupFailure::FamilyMismatch => "family_mismatch",
        }
    }
}

fn generate_token() -> String {
    format!("pa_{:032x}", rand::rng().random::<u128>())
}

/// Process-lifetime store of pending actions, keyed by token.
#[derive(Default)]
pub struct PendingActionStore {
    actions: RwLock<HashMap<String, PendingAction>>,
}

impl PendingActionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a fresh token and store the action under it.
    pub async fn create(&self, options: CreatePendingAction) -> PendingAction {
        let action = PendingAction {
            token: generate_token(),
            user_id: options.user_id,
            family_id: options.family_id,
            request_id: options.request_id,
            conversation_id: options.conversation_id,
            tool_call: options.tool_call,
            description: options.description,
            created_at: Utc::now(),
            ttl_ms: options.ttl_ms.unwrap_or(CONFIG.pending_action_ttl_ms),
            is_destructive: options.is_destructive,
        };

        info!(
            "Pending action created: {} ({}, ttl {}ms)",
            action.tool_call.tool_name, action.token, action.ttl_ms
        );

        let mut actions = self.actions.write().await;
        actions.insert(action.token.clone(), action.clone());
        action
    }

    fn check(
        action: &PendingAction,
        user_id: &str,
        family_id: &str,
        now: DateTime<Utc>,
    ) -> Option<LookupFailure> {
        if action.user_id != user_id {
            return Some(LookupFailure::UserMismatch);
        }
        if action.family_id != family_id {
            return Some(LookupFailure::FamilyMismatch);
        }
        if action.is_expired_at(now) {
            return Some(LookupFailure::NotFound);
        }
        None
    }

    /// Read-only peek, scoped to the owning user and family. Does not delete.
    pub async fn get(
        &self,
        token: &str,
        user_id: &str,
        family_id: &str,
    ) -> Result<PendingAction, LookupFailure> {
        let actions = self.actions.read().await;
        let Some(action) = actions.get(token) else {
            return Err(LookupFailure::NotFound);
        };
        match Self::check(action, user_id, family_id, Utc::now()) {
            Some(failure) => Err(failure),
            None => Ok(action.clone()),
        }
    }

    /// Validate and atomically remove in one step. A second consume with the
    /// same token fails with `not_found` — this is the at-most-once guarantee
    /// the confirmation-execution flow relies on.
    pub async fn consume(
        &self,
        token: &str,
        user_id: &str,
        family_id: &str,
    ) -> Result<PendingAction, LookupFailure> {
        let mut actions = self.actions.write().await;
        let Some(action) = actions.get(token) else {
            return Err(LookupFailure::NotFound);
        };
        if let Some(failure) = Self::check(action, user_id, family_id, Utc::now()) {
            return Err(failure);
        }
        // The write guard is held across check and remove.
        let action = actions.remove(token).unwrap();
        debug!("Pending action consumed: {}", token);
        Ok(action)
    }

    /// Remove an entry unconditionally. Returns whether anything was removed.
    pub async fn delete(&self, token: &str) -> bool {
        self.actions.write().await.remove(token).is_some()
    }

    /// All non-expired actions for a user, ignoring family scope.
    /// For introspection and listing, not redemption.
    pub async fn get_by_user(&self, user_id: &str) -> Vec<PendingAction> {
        let now = Utc::now();
        let actions = self.actions.read().await;
        actions
            .values()
            .filter(|a| a.user_id == user_id && !a.is_expired_at(now))
            .cloned()
            .collect()
    }

    /// Drop expired entries; safe to call on an idle timer.
    pub async fn cleanup(&self) -> usize {
        let now = Utc::now();
        let mut actions = self.actions.write().await;
        let before = actions.len();
        actions.retain(|_, a| !a.is_expired_at(now));
        let removed = before - actions.len();
        if removed > 0 {
            debug!("Pending action cleanup removed {} expired entries", removed);
        }
        removed
    }

    pub async fn size(&self) -> usize {
        self.actions.read().await.len()
    }
}
