// src/lib.rs

pub mod agent;
pub mod api;
pub mod config;
pub mod domains;
pub mod llm;
pub mod store;
pub mod tools;

pub use agent::{AgentRequest, AgentResponse, AgentRunContext, Domain, Orchestrator};
