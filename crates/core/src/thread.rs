// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thread entity (spec.md §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

crate::agent_id! {
    /// Opaque, agent-assigned conversational context id.
    pub struct ThreadId;
}

crate::agent_id! {
    /// Opaque, agent-assigned turn id. Bound late to a [`crate::JobId`]
    /// (spec §4.3.6) once the agent acks `sendUserMessage` or emits
    /// `turn/started`.
    pub struct TurnId;
}

/// Approval policy governing how aggressively the agent asks before acting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApprovalPolicy {
    Untrusted,
    OnFailure,
    OnRequest,
    Never,
}

crate::simple_display! {
    ApprovalPolicy {
        Untrusted => "untrusted",
        OnFailure => "on-failure",
        OnRequest => "on-request",
        Never => "never",
    }
}

impl Default for ApprovalPolicy {
    fn default() -> Self {
        Self::OnRequest
    }
}

/// Sandbox isolation level granted to the agent for this thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SandboxMode {
    ReadOnly,
    WorkspaceWrite,
    DangerFullAccess,
}

crate::simple_display! {
    SandboxMode {
        ReadOnly => "read-only",
        WorkspaceWrite => "workspace-write",
        DangerFullAccess => "danger-full-access",
    }
}

impl Default for SandboxMode {
    fn default() -> Self {
        Self::WorkspaceWrite
    }
}

/// A conversational context maintained by the agent (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub thread_id: ThreadId,
    pub project_path: String,
    pub approval_policy: ApprovalPolicy,
    pub sandbox_mode: SandboxMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub archived: bool,
}

impl Thread {
    pub fn new(
        thread_id: ThreadId,
        project_path: impl Into<String>,
        approval_policy: ApprovalPolicy,
        sandbox_mode: SandboxMode,
        model: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            thread_id,
            project_path: project_path.into(),
            approval_policy,
            sandbox_mode,
            model,
            created_at: now,
            updated_at: now,
            archived: false,
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Thread {
    /// Construct a Thread with sensible test defaults, letting callers
    /// override only the fields they care about.
    pub fn for_test(thread_id: impl Into<ThreadId>, project_path: impl Into<String>) -> Self {
        let now = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap_or_else(Utc::now);
        Self::new(
            thread_id.into(),
            project_path,
            ApprovalPolicy::default(),
            SandboxMode::default(),
            None,
            now,
        )
    }
}

#[cfg(test)]
#[path = "thread_tests.rs"]
mod tests;
