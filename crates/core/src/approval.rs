// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Approval gate (spec.md §3, §4.3.4).
//!
//! Grounded on `oj-core/src/decision.rs`'s `Decision`/`DecisionSource`: a
//! human-in-the-loop gate record with a creation timestamp, a resolution
//! timestamp, and a superseding rule — generalized here from multi-purpose
//! decision sources down to the two approval kinds spec.md §3 defines.

use crate::error::CoreError;
use crate::JobId;
use serde::{Deserialize, Serialize};

crate::agent_id! {
    /// Opaque, agent-assigned approval id.
    pub struct ApprovalId;
}

/// What kind of sensitive action the agent wants to gate.
///
/// Unknown kinds round-trip through `Other` so the orchestrator never has to
/// reject an approval request just because the agent added a new kind.
/// Serialized/deserialized by hand (rather than a derive) since `Other`
/// carries the original string instead of matching a fixed tag set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalKind {
    CommandExecution,
    ApplyPatch,
    Other(String),
}

impl Serialize for ApprovalKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ApprovalKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(match s.as_str() {
            "command_execution" => Self::CommandExecution,
            "apply_patch" => Self::ApplyPatch,
            _ => Self::Other(s),
        })
    }
}

impl std::fmt::Display for ApprovalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CommandExecution => f.write_str("command_execution"),
            Self::ApplyPatch => f.write_str("apply_patch"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

/// Lifecycle state of an [`Approval`] (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalState {
    Pending,
    Resolved,
}

crate::simple_display! {
    ApprovalState {
        Pending => "pending",
        Resolved => "resolved",
    }
}

/// Client-facing approval decision (spec.md §4.3.4, request body of
/// `POST /v1/jobs/{jid}/approve`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecisionKind {
    Accept,
    AcceptForSession,
    Decline,
    Cancel,
    AcceptWithExecpolicyAmendment,
}

impl std::fmt::Display for ApprovalDecisionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Accept => "accept",
            Self::AcceptForSession => "accept_for_session",
            Self::Decline => "decline",
            Self::Cancel => "cancel",
            Self::AcceptWithExecpolicyAmendment => "accept_with_execpolicy_amendment",
        };
        f.write_str(s)
    }
}

impl ApprovalDecisionKind {
    /// Whether resolving with this decision unblocks the job back to
    /// `RUNNING` (true) or terminates it as `CANCELLED` (false) — spec.md
    /// §4.3.2's `WAITING_APPROVAL` transitions.
    pub fn unblocks(&self) -> bool {
        matches!(self, Self::Accept | Self::AcceptForSession | Self::AcceptWithExecpolicyAmendment)
    }
}

/// A resolved approval decision, carrying whatever upstream-specific data the
/// kind requires (spec.md §4.3.4's exec-policy amendment token list).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDecision {
    pub kind: ApprovalDecisionKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub execpolicy_amendment: Vec<String>,
}

impl ResolvedDecision {
    pub fn simple(kind: ApprovalDecisionKind) -> Self {
        Self { kind, execpolicy_amendment: Vec::new() }
    }

    /// Validate and build the decision per spec §4.3.4, then render the
    /// exact upstream `resolveApproval` reply shape.
    pub fn build(
        kind: ApprovalDecisionKind,
        approval_kind: &ApprovalKind,
        execpolicy_amendment: Vec<String>,
    ) -> Result<Self, CoreError> {
        if kind == ApprovalDecisionKind::AcceptWithExecpolicyAmendment {
            if !matches!(approval_kind, ApprovalKind::CommandExecution) {
                return Err(CoreError::InvalidDecisionForKind {
                    decision: kind.to_string(),
                    kind: approval_kind.to_string(),
                });
            }
            if execpolicy_amendment.is_empty()
                || execpolicy_amendment.iter().any(|tok| tok.is_empty())
            {
                return Err(CoreError::InvalidExecPolicyAmendment);
            }
        } else if !execpolicy_amendment.is_empty() {
            return Err(CoreError::InvalidExecPolicyAmendment);
        }
        Ok(Self { kind, execpolicy_amendment })
    }

    /// The exact JSON-RPC reply value sent to `resolveApproval` (spec §4.3.4).
    pub fn to_upstream_value(&self) -> serde_json::Value {
        match self.kind {
            ApprovalDecisionKind::Accept => serde_json::json!("accept"),
            ApprovalDecisionKind::AcceptForSession => serde_json::json!("acceptForSession"),
            ApprovalDecisionKind::Decline => serde_json::json!("decline"),
            ApprovalDecisionKind::Cancel => serde_json::json!("cancel"),
            ApprovalDecisionKind::AcceptWithExecpolicyAmendment => serde_json::json!({
                "acceptWithExecpolicyAmendment": {
                    "execpolicy_amendment": self.execpolicy_amendment,
                }
            }),
        }
    }
}

/// A synchronous approval gate raised by the agent (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Approval {
    pub approval_id: ApprovalId,
    pub job_id: JobId,
    pub thread_id: crate::ThreadId,
    pub kind: ApprovalKind,
    /// Kind-specific request details (command/cwd/argv, or diff summary),
    /// preserved verbatim per the opaque-JSON design note (spec §9).
    pub request: serde_json::Value,
    pub state: ApprovalState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<ResolvedDecision>,
}

impl Approval {
    pub fn new(
        approval_id: ApprovalId,
        job_id: JobId,
        thread_id: crate::ThreadId,
        kind: ApprovalKind,
        request: serde_json::Value,
    ) -> Self {
        Self { approval_id, job_id, thread_id, kind, request, state: ApprovalState::Pending, decision: None }
    }

    pub fn is_pending(&self) -> bool {
        self.state == ApprovalState::Pending
    }

    pub fn resolve(&mut self, decision: ResolvedDecision) {
        self.state = ApprovalState::Resolved;
        self.decision = Some(decision);
    }
}

#[cfg(test)]
#[path = "approval_tests.rs"]
mod tests;
