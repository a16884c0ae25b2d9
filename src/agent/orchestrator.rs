// src/agent/orchestrator.rs
// The control loop: one AgentRequest + AgentRunContext in, one AgentResponse
// out. Coordinates the context store, multi-intent detection, routing, domain
// executors, and post-turn context updates, plus the separate confirmation
// flow. Nothing in here is allowed to escape as an error — every failure mode
// degrades to a returned response.

use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::agent::context::{
    ContextPatch, ConversationContextStore, EventSummary, LastResultsContext, QueryType,
};
use crate::agent::executor::{ExecutorResult, ExecutorSet};
use crate::agent::multi_intent::MultiIntentDetector;
use crate::agent::pending::PendingActionStore;
use crate::agent::router::IntentRouter;
use crate::agent::types::{AgentRequest, AgentResponse, AgentRunContext, Domain};

const EXECUTOR_FAILURE_TEXT: &str =
    "Sorry, I encountered an error processing your request. Please try again.";
const MULTI_TEXT_SEPARATOR: &str = "\n\n---\n\n";

pub struct Orchestrator {
    executors: ExecutorSet,
    router: IntentRouter,
    detector: MultiIntentDetector,
    pending: Arc<PendingActionStore>,
    contexts: Arc<ConversationContextStore>,
}

impl Orchestrator {
    pub fn new(
        executors: ExecutorSet,
        router: IntentRouter,
        detector: MultiIntentDetector,
        pending: Arc<PendingActionStore>,
        contexts: Arc<ConversationContextStore>,
    ) -> Self {
        Self {
            executors,
            router,
            detector,
            pending,
            contexts,
        }
    }

    pub fn pending_actions(&self) -> &Arc<PendingActionStore> {
        &self.pending
    }

    pub fn conversation_contexts(&self) -> &Arc<ConversationContextStore> {
        &self.contexts
    }

    /// Main flow: route one message and dispatch it to the owning domain
    /// executor(s). Resolves for every input; never returns an error.
    pub async fn orchestrate(
        &self,
        request: &AgentRequest,
        mut context: AgentRunContext,
    ) -> AgentResponse {
        let previous = self
            .contexts
            .get(&context.conversation_id, &context.user_id, &context.family_id)
            .await;
        context.previous_context = previous.clone();

        // A conversation that is waiting on input keeps its last domain as an
        // implicit hint, so the user can answer a clarifying question without
        // restating the domain.
        let effective_hint = request.domain_hint.or_else(|| {
            previous
                .as_ref()
                .filter(|p| p.awaiting_input.is_some())
                .and_then(|p| p.last_domain)
        });

        if effective_hint.is_none() {
            let detection = self.detector.detect(&request.message).await;
            if detection.is_multi_intent && detection.domains.len() >= 2 {
                info!(
                    "Multi-intent fan-out across {:?} (request {})",
                    detection.domains, context.request_id
                );
                return self
                    .run_multi_domain(&request.message, &detection.domains, &context)
                    .await;
            }
        }

        let route = self.router.route(&request.message, effective_hint).await;
        info!(
            "Routed to {} (confidence {:.2}, request {})",
            route.domain, route.confidence, context.request_id
        );

        let result = self
            .run_executor(route.domain, &request.message, &context)
            .await;
        self.update_conversation_context(route.domain, &result, &context)
            .await;
        self.envelope(route.domain, result, &context)
    }

    /// Run one domain executor, converting any fault into a graceful apology.
    async fn run_executor(
        &self,
        domain: Domain,
        message: &str,
        context: &AgentRunContext,
    ) -> ExecutorResult {
        let Some(executor) = self.executors.resolve(domain) else {
            error!("No executor registered for {} and no unknown fallback", domain);
            return failure_result();
        };

        match executor.handle(message, context).await {
            Ok(result) => result,
            Err(e) => {
                error!(
                    "Executor for {} failed (request {}): {}",
                    domain, context.request_id, e
                );
                failure_result()
            }
        }
    }

    /// Fan one message out to every detected domain, sequentially. Each
    /// executor independently reinterprets the full message for its own
    /// domain; no message splitting is performed. A confirmation-requiring
    /// result short-circuits the remaining domains so one leg's sign-off
    /// cannot race partially-applied side effects elsewhere.
    async fn run_multi_domain(
        &self,
        message: &str,
        domains: &[Domain],
        context: &AgentRunContext,
    ) -> AgentResponse {
        let primary = domains[0];
        let mut texts: Vec<String> = Vec::new();
        let mut actions = Vec::new();
        let mut merged_payload = Map::new();
        let mut succeeded = 0usize;

        for &domain in domains {
            let Some(executor) = self.executors.resolve(domain) else {
                warn!("No executor for {} during multi-intent fan-out", domain);
                continue;
            };

            let result = match executor.handle(message, context).await {
                Ok(result) => result,
                Err(e) => {
                    // Recovered per-domain: only domains that succeeded
                    // contribute to the merged response.
                    error!(
                        "Executor for {} failed during fan-out (request {}): {}",
                        domain, context.request_id, e
                    );
                    continue;
                }
            };

            if result.requires_confirmation {
                let mut result = result;
                result.payload = Some(mark_multi_intent(result.payload.take(), domains));
                self.update_conversation_context(domain, &result, context)
                    .await;
                return self.envelope(domain, result, context);
            }

            succeeded += 1;
            if !result.text.is_empty() {
                texts.push(result.text);
            }
            actions.extend(result.actions);
            if let Some(Value::Object(obj)) = result.payload {
                // Shallow merge; later executors win on key collisions.
                for (k, v) in obj {
                    merged_payload.insert(k, v);
                }
            }
        }

        if succeeded == 0 {
            let result = failure_result();
            return self.envelope(primary, result, context);
        }

        let payload = Some(mark_multi_intent(
            (!merged_payload.is_empty()).then_some(Value::Object(merged_payload)),
            domains,
        ));
        let merged = ExecutorResult {
            text: texts.join(MULTI_TEXT_SEPARATOR),
            actions,
            payload,
            requires_confirmation: false,
            pending_action: None,
        };

        self.update_conversation_context(primary, &merged, context)
            .await;
        self.envelope(primary, merged, context)
    }

    /// Post-turn context bookkeeping. Follow-up-relevant state (awaiting
    /// input, partial entities, search/analysis results) is written back;
    /// a completed successful write clears the conversation instead.
    async fn update_conversation_context(
        &self,
        domain: Domain,
        result: &ExecutorResult,
        context: &AgentRunContext,
    ) {
        let payload = result.payload.as_ref();

        let last_results = if domain == Domain::Calendar {
            payload.and_then(summarize_calendar_events)
        } else {
            None
        };

        let awaiting_input = payload
            .and_then(|p| p.get("awaitingInput"))
            .filter(|v| !v.is_null())
            .map(|v| match v.as_str() {
                Some(s) => s.to_string(),
                None => v.to_string(),
            });
        let pending_event = payload
            .and_then(|p| p.get("pendingEvent"))
            .filter(|v| !v.is_null())
            .cloned();
        let pending_task = payload
            .and_then(|p| p.get("pendingTask"))
            .filter(|v| !v.is_null())
            .cloned();

        let has_followup_state = awaiting_input.is_some()
            || pending_event.is_some()
            || pending_task.is_some()
            || last_results.is_some();

        if has_followup_state {
            self.contexts
                .set(
                    &context.conversation_id,
                    &context.user_id,
                    &context.family_id,
                    ContextPatch {
                        last_domain: Some(domain),
                        awaiting_input,
                        pending_event,
                        pending_task,
                        last_results,
                    },
                )
                .await;
        } else if result.actions.iter().any(|a| a.result.success) {
            self.contexts
                .clear(&context.conversation_id, &context.user_id, &context.family_id)
                .await;
        }
    }

    /// Confirmation flow: peek (not consume) the pending action to find which
    /// domain's confirmed-action executor owns it, then hand over. The peeked
    /// executor is responsible for calling `consume` itself before performing
    /// the write — that is where at-most-once is enforced.
    pub async fn confirm(&self, token: &str, context: AgentRunContext) -> AgentResponse {
        let domain = match self
            .pending
            .get(token, &context.user_id, &context.family_id)
            .await
        {
            Ok(action) => Domain::from_tool_name(&action.tool_call.tool_name),
            Err(failure) => {
                // Let the default executor produce the user-facing "nothing
                // to confirm" text; the reason stays in the logs.
                info!(
                    "Confirmation peek failed ({}): {}",
                    failure.reason(),
                    token
                );
                Domain::Tasks
            }
        };

        let Some(executor) = self.executors.resolve(domain) else {
            error!("No executor available for confirmation in {}", domain);
            return self.envelope(domain, failure_result(), &context);
        };

        let result = match executor.handle_confirmed(token, &context).await {
            Ok(result) => result,
            Err(e) => {
                error!(
                    "Confirmed-action executor for {} failed (request {}): {}",
                    domain, context.request_id, e
                );
                failure_result()
            }
        };

        self.update_conversation_context(domain, &result, &context)
            .await;
        self.envelope(domain, result, &context)
    }

    fn envelope(
        &self,
        domain: Domain,
        result: ExecutorResult,
        context: &AgentRunContext,
    ) -> AgentResponse {
        AgentResponse {
            text: result.text,
            actions: result.actions,
            payload: result.payload,
            domain,
            conversation_id: context.conversation_id.clone(),
            request_id: context.request_id.clone(),
            requires_confirmation: result.requires_confirmation.then_some(true),
            pending_action: result.pending_action,
        }
    }
}

fn failure_result() -> ExecutorResult {
    ExecutorResult {
        text: EXECUTOR_FAILURE_TEXT.to_string(),
        actions: Vec::new(),
        payload: Some(json!({ "error": true })),
        requires_confirmation: false,
        pending_action: None,
    }
}

fn mark_multi_intent(payload: Option<Value>, domains: &[Domain]) -> Value {
    let mut obj = match payload {
        Some(Value::Object(obj)) => obj,
        _ => Map::new(),
    };
    obj.insert("multiIntent".to_string(), Value::Bool(true));
    obj.insert(
        "domains".to_string(),
        Value::Array(
            domains
                .iter()
                .map(|d| Value::String(d.as_str().to_string()))
                .collect(),
        ),
    );
    Value::Object(obj)
}

/// Summarize a calendar payload's `events` array (id, title, start, all-day,
/// recurrence) for referential follow-ups. Events without an id are skipped;
/// an empty summary yields no context entry.
fn summarize_calendar_events(payload: &Value) -> Option<LastResultsContext> {
    let events = payload.get("events")?.as_array()?;
    let items: Vec<EventSummary> = events
        .iter()
        .filter_map(|e| {
            let id = match e.get("id")? {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
            Some(EventSummary {
                id,
                title: e.get("title").and_then(|v| v.as_str()).map(String::from),
                start: e.get("start").and_then(|v| v.as_str()).map(String::from),
                all_day: e.get("allDay").and_then(|v| v.as_bool()),
                recurrence: e.get("recurrence").filter(|v| !v.is_null()).cloned(),
            })
        })
        .collect();

    if items.is_empty() {
        return None;
    }

    let is_analysis = payload
        .get("analysis")
        .map(|v| !v.is_null())
        .unwrap_or(false);

    Some(LastResultsContext {
        domain: Domain::Calendar,
        query_type: if is_analysis {
            QueryType::Analyze
        } else {
            QueryType::Search
        },
        description: format!("{} calendar events", items.len()),
        items,
        timestamp: chrono::Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_summarize_skips_events_without_id() {
        let payload = json!({
            "events": [
                { "id": "e1", "title": "Dentist", "start": "2026-09-01T10:00:00Z" },
                { "title": "no id here" }
            ]
        });
        let results = summarize_calendar_events(&payload).unwrap();
        assert_eq!(results.items.len(), 1);
        assert_eq!(results.items[0].id, "e1");
        assert_eq!(results.query_type, QueryType::Search);
    }

    #[test]
    fn test_summarize_flags_analysis() {
        let payload = json!({
            "events": [{ "id": "e1" }],
            "analysis": { "busiest": "tuesday" }
        });
        let results = summarize_calendar_events(&payload).unwrap();
        assert_eq!(results.query_type, QueryType::Analyze);
    }

    #[test]
    fn test_summarize_empty_events_yields_none() {
        assert!(summarize_calendar_events(&json!({ "events": [] })).is_none());
        assert!(summarize_calendar_events(&json!({ "other": 1 })).is_none());
    }

    #[test]
    fn test_mark_multi_intent_preserves_existing_keys() {
        let marked = mark_multi_intent(
            Some(json!({ "taskId": "t1" })),
            &[Domain::Lists, Domain::Tasks],
        );
        assert_eq!(marked["taskId"], "t1");
        assert_eq!(marked["multiIntent"], true);
        assert_eq!(marked["domains"], json!(["lists", "tasks"]));
    }
}
