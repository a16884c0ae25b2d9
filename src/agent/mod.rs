// src/agent/mod.rs
// The agent core: stores, routing, multi-intent detection, and the
// orchestrator control loop.

pub mod context;
pub mod executor;
pub mod keywords;
pub mod multi_intent;
pub mod orchestrator;
pub mod pending;
pub mod router;
pub mod types;

pub use context::{ContextPatch, ConversationContext, ConversationContextStore};
pub use executor::{DomainExecutor, ExecutorResult, ExecutorSet};
pub use multi_intent::{MultiIntentDetector, MultiIntentResult};
pub use orchestrator::Orchestrator;
pub use pending::{CreatePendingAction, LookupFailure, PendingAction, PendingActionStore};
pub use router::IntentRouter;
pub use types::{
    AgentAction, AgentRequest, AgentResponse, AgentRunContext, Domain, IntentRoute,
    PendingActionInfo, ToolCall,
};
