// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thread-scoped routes (spec.md §6): `/v1/threads` and its children.
//! Grounded on `oj-daemon/src/server/routes/jobs.rs`'s handler shape —
//! extract path/body, call into the runtime, map the result through
//! `IntoResponse` — generalized from a job-queue surface to the
//! thread/turn/approval surface spec.md §6 defines.

use crate::error::ApiError;
use crate::state::SharedState;
use ac_core::{ApprovalPolicy, Clock, JobId, SandboxMode, Thread, ThreadId};
use ac_gateway::AgentClient;
use ac_orchestrator::StartTurnRequest;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct CreateThreadBody {
    #[serde(rename = "projectPath")]
    pub project_path: String,
    #[serde(default, rename = "approvalPolicy")]
    pub approval_policy: Option<ApprovalPolicy>,
    #[serde(default)]
    pub sandbox: Option<SandboxMode>,
    #[serde(default)]
    pub model: Option<String>,
    /// Accepted for forward compatibility; the upstream agent protocol has
    /// no slot for a client-chosen thread name today.
    #[serde(default, rename = "threadName")]
    pub thread_name: Option<String>,
}

pub async fn create_thread<A: AgentClient, C: Clock>(
    State(state): State<SharedState<A, C>>,
    Json(body): Json<CreateThreadBody>,
) -> Result<(StatusCode, Json<Thread>), ApiError> {
    if body.thread_name.is_some() {
        tracing::debug!("threadName supplied but not forwarded to the agent");
    }
    let thread = state
        .orchestrator
        .create_thread(body.project_path, body.approval_policy.unwrap_or_default(), body.sandbox.unwrap_or_default(), body.model)
        .await?;
    Ok((StatusCode::CREATED, Json(thread)))
}

pub async fn list_threads<A: AgentClient, C: Clock>(State(state): State<SharedState<A, C>>) -> Json<Vec<Thread>> {
    Json(state.orchestrator.list_threads())
}

pub async fn get_thread<A: AgentClient, C: Clock>(
    State(state): State<SharedState<A, C>>,
    Path(thread_id): Path<String>,
) -> Result<Json<Thread>, ApiError> {
    let thread = state.orchestrator.get_thread(&ThreadId::from(thread_id))?;
    Ok(Json(thread))
}

pub async fn activate_thread<A: AgentClient, C: Clock>(
    State(state): State<SharedState<A, C>>,
    Path(thread_id): Path<String>,
) -> Result<Json<Thread>, ApiError> {
    let thread = state.orchestrator.activate_thread(&ThreadId::from(thread_id))?;
    Ok(Json(thread))
}

pub async fn archive_thread<A: AgentClient, C: Clock>(
    State(state): State<SharedState<A, C>>,
    Path(thread_id): Path<String>,
) -> Result<Json<Thread>, ApiError> {
    let thread = state.orchestrator.archive_thread(&ThreadId::from(thread_id))?;
    Ok(Json(thread))
}

#[derive(Debug, Deserialize)]
pub struct StartTurnBody {
    pub text: String,
    #[serde(default)]
    pub input: Option<Value>,
    #[serde(default, rename = "approvalPolicy")]
    pub approval_policy: Option<ApprovalPolicy>,
    #[serde(default)]
    pub sandbox: Option<SandboxMode>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartTurnResponse {
    #[serde(rename = "jobId")]
    pub job_id: JobId,
}

pub async fn start_turn<A: AgentClient, C: Clock>(
    State(state): State<SharedState<A, C>>,
    Path(thread_id): Path<String>,
    Json(body): Json<StartTurnBody>,
) -> Result<(StatusCode, Json<StartTurnResponse>), ApiError> {
    let req = StartTurnRequest {
        text: body.text,
        input: body.input,
        approval_policy: body.approval_policy,
        sandbox_mode: body.sandbox,
        model: body.model,
    };
    let job_id = state.orchestrator.start_turn(&ThreadId::from(thread_id), req).await?;
    Ok((StatusCode::ACCEPTED, Json(StartTurnResponse { job_id })))
}

#[derive(Debug, Deserialize)]
pub struct ThreadEventsQuery {
    #[serde(default = "default_cursor")]
    pub cursor: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_cursor() -> i64 {
    -1
}

fn default_limit() -> i64 {
    200
}

#[derive(Debug, Serialize)]
pub struct EventsPageBody<T> {
    pub data: Vec<T>,
    #[serde(rename = "nextCursor")]
    pub next_cursor: i64,
    #[serde(rename = "hasMore")]
    pub has_more: bool,
}

pub async fn thread_events<A: AgentClient, C: Clock>(
    State(state): State<SharedState<A, C>>,
    Path(thread_id): Path<String>,
    Query(query): Query<ThreadEventsQuery>,
) -> Result<Json<EventsPageBody<ac_core::Event>>, ApiError> {
    let page = state.orchestrator.read_thread_history(&ThreadId::from(thread_id), query.cursor, query.limit).await?;
    Ok(Json(EventsPageBody { data: page.events, next_cursor: page.next_cursor, has_more: page.has_more }))
}
