// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error-to-HTTP mapping (spec.md §7). `ac-http` is the only crate in the
//! workspace that knows about HTTP status codes; every `OrchestratorError`
//! maps to a `(StatusCode, ErrorBody)` in exactly this one `IntoResponse`
//! impl, grounded on `oj-daemon`'s centralized `Response` encoding.

use ac_orchestrator::OrchestratorError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

/// Thin wrapper so we can impl a foreign trait (`IntoResponse`) for a
/// foreign type (`OrchestratorError`) without `ac-orchestrator` needing to
/// know about axum.
pub struct ApiError(pub OrchestratorError);

impl From<OrchestratorError> for ApiError {
    fn from(e: OrchestratorError) -> Self {
        Self(e)
    }
}

/// Authentication failures never reach `ac-orchestrator` — they're rejected
/// by the bearer-token middleware before a handler runs — so they get their
/// own lightweight variant rather than round-tripping through
/// `OrchestratorError`.
pub struct Unauthenticated;

impl IntoResponse for Unauthenticated {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, Json(ErrorBody { error: "UNAUTHENTICATED", message: "missing or invalid bearer token".to_string() })).into_response()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.0.code();
        let status = match code {
            "INVALID_ARGUMENT" | "INVALID_DECISION_FOR_KIND" | "INVALID_EXEC_POLICY_AMENDMENT" => StatusCode::BAD_REQUEST,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "THREAD_BUSY" | "JOB_TERMINAL" | "CURSOR_EXPIRED" => StatusCode::CONFLICT,
            "AGENT_UNAVAILABLE" | "AGENT_DISCONNECTED" => StatusCode::SERVICE_UNAVAILABLE,
            "RPC_TIMEOUT" => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorBody { error: code, message: self.0.to_string() })).into_response()
    }
}
