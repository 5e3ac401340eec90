// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bearer-token auth middleware (spec.md §6): "if a bearer token is
//! configured, every request except `/health` must carry
//! `Authorization: Bearer <token>`; otherwise 401." Grounded on
//! `fourthplaces-mntogether/packages/server/src/server/middleware.rs`'s
//! `jwt_auth_middleware` — a `middleware::from_fn` closure checked against
//! shared state before the handler runs.

use crate::error::Unauthenticated;
use crate::state::SharedState;
use ac_core::Clock;
use ac_gateway::AgentClient;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;

pub async fn require_bearer_token<A: AgentClient, C: Clock>(
    State(state): State<SharedState<A, C>>,
    request: Request,
    next: Next,
) -> Result<Response, Unauthenticated> {
    match &state.auth_token {
        None => Ok(next.run(request).await),
        Some(expected) => {
            let presented = request
                .headers()
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "));
            if presented == Some(expected.as_str()) {
                Ok(next.run(request).await)
            } else {
                Err(Unauthenticated)
            }
        }
    }
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
