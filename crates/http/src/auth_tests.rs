use super::*;
use crate::state::AppState;
use ac_core::{Clock, FakeClock};
use ac_fanout::FanOut;
use ac_gateway::FakeAgentClient;
use ac_orchestrator::{Orchestrator, OrchestratorConfig};
use ac_storage::EventStore;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::middleware;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower::ServiceExt;

async fn test_state(auth_token: Option<String>) -> SharedState<FakeAgentClient, FakeClock> {
    let storage = EventStore::open_in_memory(ac_storage::DEFAULT_EVENT_RETENTION).await.expect("in-memory db");
    let orchestrator = Orchestrator::new(FakeAgentClient::new(), storage, FanOut::new(), FakeClock::new(), OrchestratorConfig::default());
    Arc::new(AppState { orchestrator, auth_token })
}

fn guarded_app(state: SharedState<FakeAgentClient, FakeClock>) -> Router {
    Router::new()
        .route("/protected", get(|| async { "ok" }))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer_token::<FakeAgentClient, FakeClock>))
        .with_state(state)
}

#[tokio::test]
async fn no_token_configured_allows_any_request() {
    let app = guarded_app(test_state(None).await);
    let response = app.oneshot(Request::builder().uri("/protected").body(Body::empty()).expect("request")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn correct_bearer_token_is_admitted() {
    let app = guarded_app(test_state(Some("secret".to_string())).await);
    let request = Request::builder().uri("/protected").header("Authorization", "Bearer secret").body(Body::empty()).expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_header_is_rejected() {
    let app = guarded_app(test_state(Some("secret".to_string())).await);
    let response = app.oneshot(Request::builder().uri("/protected").body(Body::empty()).expect("request")).await.expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_token_is_rejected() {
    let app = guarded_app(test_state(Some("secret".to_string())).await);
    let request = Request::builder().uri("/protected").header("Authorization", "Bearer nope").body(Body::empty()).expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
