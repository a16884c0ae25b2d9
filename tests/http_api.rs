// tests/http_api.rs
// Smoke tests for the HTTP surface using tower's oneshot, no bound socket.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::util::ServiceExt;

use hearth_agent::agent::{
    ConversationContextStore, IntentRouter, MultiIntentDetector, Orchestrator, PendingActionStore,
};
use hearth_agent::api::{api_router, AppState};
use hearth_agent::domains::{build_executors, build_tools};
use hearth_agent::store::FamilyStore;

fn app() -> axum::Router {
    let store = Arc::new(FamilyStore::new());
    let tools = Arc::new(build_tools(store));
    let pending = Arc::new(PendingActionStore::new());
    let contexts = Arc::new(ConversationContextStore::new());
    let executors = build_executors(tools, pending.clone());
    let orchestrator = Orchestrator::new(
        executors,
        IntentRouter::keyword_only(),
        MultiIntentDetector::keyword_only(),
        pending,
        contexts,
    );
    api_router(Arc::new(AppState { orchestrator }))
}

fn message_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/agent/message")
        .header("content-type", "application/json")
        .header("x-user-id", "user-a")
        .header("x-family-id", "fam-x")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let response = app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn test_message_requires_identity_headers() {
    let request = Request::builder()
        .method("POST")
        .uri("/agent/message")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "message": "hi there" }).to_string()))
        .unwrap();

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], true);
    assert_eq!(body["error_code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_empty_message_is_rejected() {
    let response = app()
        .oneshot(message_request(json!({ "message": "   " })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_message_round_trip() {
    let response = app()
        .oneshot(message_request(json!({
            "message": "Create a task to buy milk",
            "conversationId": "conv-1"
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["domain"], "tasks");
    assert_eq!(body["conversationId"], "conv-1");
    assert_eq!(body["actions"][0]["tool"], "tasks.create");
    assert_eq!(body["actions"][0]["result"]["success"], true);
    assert!(body["requestId"].as_str().is_some());
}

#[tokio::test]
async fn test_gate_and_confirm_over_http() {
    let app = app();

    // Create, then ask for a destructive delete.
    app.clone()
        .oneshot(message_request(json!({
            "message": "Create a task to walk the dog",
            "conversationId": "conv-1"
        })))
        .await
        .unwrap();
    let gated = app
        .clone()
        .oneshot(message_request(json!({
            "message": "delete the task to walk the dog",
            "conversationId": "conv-1"
        })))
        .await
        .unwrap();
    let gated = body_json(gated).await;
    assert_eq!(gated["requiresConfirmation"], true);
    let token = gated["pendingAction"]["token"].as_str().unwrap().to_string();

    // The pending listing shows it.
    let pending = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/agent/pending")
                .header("x-user-id", "user-a")
                .header("x-family-id", "fam-x")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(body_json(pending).await["count"], 1);

    // Confirm through the message endpoint.
    let confirmed = app
        .clone()
        .oneshot(message_request(json!({
            "confirmationToken": token,
            "confirmed": true,
            "conversationId": "conv-1"
        })))
        .await
        .unwrap();
    assert_eq!(confirmed.status(), StatusCode::OK);
    let confirmed = body_json(confirmed).await;
    assert_eq!(confirmed["actions"][0]["result"]["success"], true);

    // Replay via the dedicated confirm endpoint fails soft.
    let replay = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/agent/confirm")
                .header("content-type", "application/json")
                .header("x-user-id", "user-a")
                .header("x-family-id", "fam-x")
                .body(Body::from(
                    json!({ "confirmationToken": token, "conversationId": "conv-1" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(replay.status(), StatusCode::OK);
    let replay = body_json(replay).await;
    assert_eq!(replay["payload"]["error"], "not_found");
}
