// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event taxonomy emitted to subscribers (spec.md §4.3.3).
//!
//! Grounded on `oj-core/src/event/mod.rs`'s `Event` enum (`#[serde(tag =
//! "type")]`), generalized to an *adjacently* tagged enum (`tag = "type",
//! content = "payload"`) since spec.md §4.3.3 requires `type` and `payload`
//! to be separate top-level fields rather than flattened together. Unknown
//! fields inside opaque payloads are preserved verbatim (design note, §9)
//! by carrying them as `serde_json::Value` rather than fully-typed structs
//! wherever spec.md doesn't enumerate the shape.

use crate::approval::{ApprovalDecisionKind, ApprovalId, ApprovalKind};
use crate::job::{JobId, JobState};
use crate::thread::ThreadId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The type-specific contents of an [`Event`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum EventPayload {
    #[serde(rename = "thread.started")]
    ThreadStarted { #[serde(rename = "threadId")] thread_id: ThreadId },

    #[serde(rename = "job.state")]
    JobState {
        state: JobState,
        #[serde(default, skip_serializing_if = "Option::is_none", rename = "errorMessage")]
        error_message: Option<String>,
    },

    #[serde(rename = "job.finished")]
    JobFinished {
        state: JobState,
        #[serde(default, skip_serializing_if = "Option::is_none", rename = "errorMessage")]
        error_message: Option<String>,
    },

    #[serde(rename = "item.started")]
    ItemStarted(serde_json::Value),

    #[serde(rename = "item.completed")]
    ItemCompleted(serde_json::Value),

    #[serde(rename = "item.agentMessage.delta")]
    ItemAgentMessageDelta {
        #[serde(rename = "itemId")]
        item_id: String,
        delta: String,
    },

    #[serde(rename = "item.commandExecution.outputDelta")]
    ItemCommandExecutionOutputDelta(serde_json::Value),

    #[serde(rename = "item.fileChange.outputDelta")]
    ItemFileChangeOutputDelta(serde_json::Value),

    #[serde(rename = "approval.required")]
    ApprovalRequired {
        #[serde(rename = "approvalId")]
        approval_id: ApprovalId,
        kind: ApprovalKind,
        /// Kind-specific details (command/cwd/argv, or diff summary),
        /// carried verbatim per the opaque-JSON design note (spec §9).
        details: serde_json::Value,
    },

    #[serde(rename = "approval.resolved")]
    ApprovalResolved {
        #[serde(rename = "approvalId")]
        approval_id: ApprovalId,
        decision: ApprovalDecisionKind,
    },

    #[serde(rename = "error")]
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<serde_json::Value>,
    },
}

impl EventPayload {
    /// The wire type tag, e.g. `"job.state"`. Useful for SSE `event:` lines
    /// and logging without re-serializing the whole payload.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::ThreadStarted { .. } => "thread.started",
            Self::JobState { .. } => "job.state",
            Self::JobFinished { .. } => "job.finished",
            Self::ItemStarted(_) => "item.started",
            Self::ItemCompleted(_) => "item.completed",
            Self::ItemAgentMessageDelta { .. } => "item.agentMessage.delta",
            Self::ItemCommandExecutionOutputDelta(_) => "item.commandExecution.outputDelta",
            Self::ItemFileChangeOutputDelta(_) => "item.fileChange.outputDelta",
            Self::ApprovalRequired { .. } => "approval.required",
            Self::ApprovalResolved { .. } => "approval.resolved",
            Self::Error { .. } => "error",
        }
    }

    /// Whether this is the one `job.finished` event that must be the final
    /// event appended for a job (invariant I2).
    pub fn is_job_finished(&self) -> bool {
        matches!(self, Self::JobFinished { .. })
    }
}

/// One entry in a job's append-only event log (spec.md §3's Event entity).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub job_id: JobId,
    pub seq: i64,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl Event {
    pub fn new(job_id: JobId, seq: i64, ts: DateTime<Utc>, payload: EventPayload) -> Self {
        Self { job_id, seq, ts, payload }
    }

    pub fn type_tag(&self) -> &'static str {
        self.payload.type_tag()
    }

    pub fn is_job_finished(&self) -> bool {
        self.payload.is_job_finished()
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
