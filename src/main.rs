// src/main.rs

use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::FmtSubscriber;

use hearth_agent::agent::{
    ConversationContextStore, IntentRouter, MultiIntentDetector, Orchestrator, PendingActionStore,
};
use hearth_agent::api::{api_router, AppState};
use hearth_agent::config::CONFIG;
use hearth_agent::domains::{build_executors, build_tools};
use hearth_agent::llm::gemini::GeminiClassifier;
use hearth_agent::llm::IntentClassifier;
use hearth_agent::store::FamilyStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(
            CONFIG
                .log_level
                .parse::<tracing::Level>()
                .unwrap_or(tracing::Level::INFO),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting Hearth agent core");

    let classifier: Option<Arc<dyn IntentClassifier>> = match GeminiClassifier::from_config() {
        Some(classifier) => {
            info!("Intent classifier: {} via Gemini", CONFIG.classifier_model);
            Some(Arc::new(classifier))
        }
        None => {
            warn!("No GEMINI_API_KEY set; falling back to keyword routing");
            None
        }
    };

    let store = Arc::new(FamilyStore::new());
    let tools = Arc::new(build_tools(store));
    info!("Registered tools: {}", tools.tool_names().join(", "));

    let pending = Arc::new(PendingActionStore::new());
    let contexts = Arc::new(ConversationContextStore::new());
    let executors = build_executors(tools, pending.clone());
    let orchestrator = Orchestrator::new(
        executors,
        IntentRouter::new(classifier.clone()),
        MultiIntentDetector::new(classifier),
        pending.clone(),
        contexts.clone(),
    );

    // Periodic eviction of expired pending actions and idle conversations.
    let cleanup_handle = tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(CONFIG.cleanup_interval_secs));
        loop {
            interval.tick().await;
            let expired = pending.cleanup().await;
            let idle = contexts.cleanup().await;
            if expired > 0 || idle > 0 {
                info!(
                    "Cleanup pass removed {} expired pending action(s), {} idle context(s)",
                    expired, idle
                );
            }
        }
    });

    let app = api_router(Arc::new(AppState { orchestrator }));

    let bind_address = format!("{}:{}", CONFIG.host, CONFIG.port);
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("Agent API listening on http://{}", bind_address);

    tokio::select! {
        result = axum::serve(listener, app) => {
            if let Err(e) = result {
                error!("Server error: {}", e);
            }
        }
        _ = cleanup_handle => {
            error!("Cleanup task unexpectedly terminated");
        }
    }

    Ok(())
}
