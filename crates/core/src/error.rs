// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy shared by the data model (spec.md §7).
//!
//! Grounded on `AgentAdapterError` in `oj-daemon/src/adapters/agent/mod.rs`:
//! one flat `thiserror` enum per crate boundary. `ac-orchestrator::OrchestratorError`
//! is the type that actually carries spec §7's stable error codes end to
//! end; this enum covers only the validation failures that belong to
//! `ac-core`'s own data (the approval decision mapping, §4.3.4).
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("decision {decision} is not valid for approval kind {kind}")]
    InvalidDecisionForKind { decision: String, kind: String },

    #[error("accept_with_execpolicy_amendment requires a non-empty list of non-empty tokens")]
    InvalidExecPolicyAmendment,
}
