// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! REST + SSE transport (spec.md §6). The only crate in the workspace that
//! knows about HTTP: everything else in the router is a thin translation
//! from `axum` extractors to `ac-orchestrator::Orchestrator` calls and back.
//!
//! Grounded on `oj-daemon/src/server/mod.rs`'s `Router::new()` assembly —
//! routes, a `middleware::from_fn` auth layer, and `tower-http`'s
//! `TraceLayer`/`CorsLayer` — generalized from a job-queue surface to the
//! thread/job/approval surface spec.md §6 defines.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::{Config, ConfigError};
pub use state::{AppState, SharedState};

use ac_core::Clock;
use ac_gateway::AgentClient;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the full application router over a shared [`AppState`]. Generic
/// over `AgentClient`/`Clock` so the workspace integration suite can
/// exercise the exact same router against a `FakeAgentClient`
/// (SPEC_FULL.md §13) that `ac-http::main` wires up against the real
/// subprocess-backed one.
pub fn router<A: AgentClient, C: Clock>(state: SharedState<A, C>) -> Router {
    // `/health` is the one route reachable without a bearer token (spec
    // §6), so the auth middleware is layered only onto the protected
    // sub-router rather than the whole app.
    let protected = Router::new()
        .route("/v1/threads", post(routes::threads::create_thread::<A, C>).get(routes::threads::list_threads::<A, C>))
        .route("/v1/threads/:thread_id", get(routes::threads::get_thread::<A, C>))
        .route("/v1/threads/:thread_id/activate", post(routes::threads::activate_thread::<A, C>))
        .route("/v1/threads/:thread_id/archive", post(routes::threads::archive_thread::<A, C>))
        .route("/v1/threads/:thread_id/turns", post(routes::threads::start_turn::<A, C>))
        .route("/v1/threads/:thread_id/events", get(routes::threads::thread_events::<A, C>))
        .route("/v1/jobs/:job_id", get(routes::jobs::job_snapshot::<A, C>))
        .route("/v1/jobs/:job_id/events", get(routes::jobs::job_events::<A, C>))
        .route("/v1/jobs/:job_id/approve", post(routes::jobs::approve_job::<A, C>))
        .route("/v1/jobs/:job_id/cancel", post(routes::jobs::cancel_job::<A, C>))
        .route_layer(axum::middleware::from_fn_with_state(state.clone(), auth::require_bearer_token::<A, C>));

    Router::new()
        .route("/health", get(routes::health::health::<A, C>))
        .merge(protected)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Convenience wrapper for [`router`] that wraps a freshly-built
/// [`AppState`] in the `Arc` the router expects.
pub fn app<A: AgentClient, C: Clock>(state: AppState<A, C>) -> Router {
    router(Arc::new(state))
}
