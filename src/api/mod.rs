// src/api/mod.rs

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

pub mod error;
pub mod handlers;

pub use handlers::AppState;

pub fn api_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/agent/message", post(handlers::agent_message))
        .route("/agent/confirm", post(handlers::agent_confirm))
        .route("/agent/pending", get(handlers::agent_pending))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
