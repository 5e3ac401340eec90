// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `GET /health` (spec.md §6): the one endpoint reachable without a bearer
//! token, so a caller can tell auth is required before trying anything else.

use crate::state::SharedState;
use ac_core::Clock;
use ac_gateway::AgentClient;
use axum::extract::State;
use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthBody {
    status: &'static str,
    #[serde(rename = "authEnabled")]
    auth_enabled: bool,
}

pub async fn health<A: AgentClient, C: Clock>(State(state): State<SharedState<A, C>>) -> Json<HealthBody> {
    Json(HealthBody { status: "ok", auth_enabled: state.auth_token.is_some() })
}
