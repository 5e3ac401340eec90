// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stable error taxonomy for the Orchestrator (spec.md §7). `ac-http` maps
//! every variant to an HTTP status in exactly one place; the string tags
//! returned by [`OrchestratorError::code`] are the wire-stable error codes
//! clients match on.

use ac_core::{ApprovalId, CoreError, JobId, ThreadId};
use ac_gateway::GatewayError;
use ac_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("decision {decision} is not valid for approval kind {kind}")]
    InvalidDecisionForKind { decision: String, kind: String },

    #[error("accept_with_execpolicy_amendment requires a non-empty list of non-empty tokens")]
    InvalidExecPolicyAmendment,

    #[error("thread {0} not found")]
    ThreadNotFound(ThreadId),

    #[error("job {0} not found")]
    JobNotFound(JobId),

    #[error("approval {0} not found")]
    ApprovalNotFound(ApprovalId),

    #[error("thread {0} already has a non-terminal job")]
    ThreadBusy(ThreadId),

    #[error("job {0} is already terminal")]
    JobTerminal(JobId),

    #[error("cursor expired for job {0}")]
    CursorExpired(JobId),

    #[error("cursor expired at position {0}")]
    HistoryCursorExpired(i64),

    #[error("agent subprocess unavailable")]
    AgentUnavailable,

    #[error("agent subprocess disconnected")]
    AgentDisconnected,

    #[error("rpc call to {method} timed out after {timeout_ms}ms")]
    RpcTimeout { method: String, timeout_ms: u64 },

    #[error("storage error: {0}")]
    StorageError(String),
}

impl OrchestratorError {
    /// The stable wire error code clients match on (spec §7).
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::InvalidDecisionForKind { .. } => "INVALID_DECISION_FOR_KIND",
            Self::InvalidExecPolicyAmendment => "INVALID_EXEC_POLICY_AMENDMENT",
            Self::ThreadNotFound(_) | Self::JobNotFound(_) | Self::ApprovalNotFound(_) => "NOT_FOUND",
            Self::ThreadBusy(_) => "THREAD_BUSY",
            Self::JobTerminal(_) => "JOB_TERMINAL",
            Self::CursorExpired(_) | Self::HistoryCursorExpired(_) => "CURSOR_EXPIRED",
            Self::AgentUnavailable => "AGENT_UNAVAILABLE",
            Self::AgentDisconnected => "AGENT_DISCONNECTED",
            Self::RpcTimeout { .. } => "RPC_TIMEOUT",
            Self::StorageError(_) => "STORAGE_ERROR",
        }
    }
}

impl From<CoreError> for OrchestratorError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidDecisionForKind { decision, kind } => {
                Self::InvalidDecisionForKind { decision, kind }
            }
            CoreError::InvalidExecPolicyAmendment => Self::InvalidExecPolicyAmendment,
        }
    }
}

impl From<StorageError> for OrchestratorError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::CursorExpired(job_id) => Self::CursorExpired(job_id),
            StorageError::JobTerminal(job_id) => Self::JobTerminal(job_id),
            other => Self::StorageError(other.to_string()),
        }
    }
}

impl From<GatewayError> for OrchestratorError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::AgentUnavailable => Self::AgentUnavailable,
            GatewayError::AgentDisconnected => Self::AgentDisconnected,
            GatewayError::RpcTimeout { method, timeout_ms } => Self::RpcTimeout { method, timeout_ms },
            other => Self::StorageError(other.to_string()),
        }
    }
}
