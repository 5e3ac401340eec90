// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Gateway error taxonomy (spec.md §4.2, §7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("rpc call to {method} timed out after {timeout_ms}ms")]
    RpcTimeout { method: String, timeout_ms: u64 },

    #[error("agent subprocess is not currently alive")]
    AgentUnavailable,

    #[error("agent subprocess disconnected")]
    AgentDisconnected,

    #[error("agent returned an rpc error: {code} {message}")]
    RpcError { code: i64, message: String },

    #[error("malformed frame from agent: {0}")]
    Protocol(String),

    #[error("io error talking to agent subprocess: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Serde(#[from] serde_json::Error),
}
