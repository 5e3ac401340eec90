// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared axum state: the Orchestrator plus the (optional) bearer token.
//! Generic over `AgentClient`/`Clock` so the integration-test suite can
//! build the same router with a `FakeAgentClient` (SPEC_FULL.md §13)
//! instead of the real subprocess-backed one `ac-http::main` wires up.

use ac_core::Clock;
use ac_gateway::AgentClient;
use ac_orchestrator::Orchestrator;
use std::sync::Arc;

pub struct AppState<A: AgentClient, C: Clock> {
    pub orchestrator: Orchestrator<A, C>,
    pub auth_token: Option<String>,
}

impl<A: AgentClient, C: Clock> Clone for AppState<A, C> {
    fn clone(&self) -> Self {
        Self { orchestrator: self.orchestrator.clone(), auth_token: self.auth_token.clone() }
    }
}

pub type SharedState<A, C> = Arc<AppState<A, C>>;
