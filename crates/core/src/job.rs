// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job (turn) identifier and state machine (spec.md §3, §4.3.2).

use crate::{ThreadId, TurnId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Locally-assigned, stable handle for one agent turn.
    pub struct JobId("job-");
}

/// Job lifecycle state (spec.md §4.3.2). `Done`/`Failed`/`Cancelled` are
/// terminal and sticky per invariant I2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Queued,
    Running,
    WaitingApproval,
    Done,
    Failed,
    Cancelled,
}

crate::simple_display! {
    JobState {
        Queued => "QUEUED",
        Running => "RUNNING",
        WaitingApproval => "WAITING_APPROVAL",
        Done => "DONE",
        Failed => "FAILED",
        Cancelled => "CANCELLED",
    }
}

impl JobState {
    /// Terminal states are sticky (invariant I2): once reached, no further
    /// state transition is legal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Cancelled)
    }

    pub fn is_non_terminal(&self) -> bool {
        !self.is_terminal()
    }
}

/// Durable snapshot of a job's state (spec.md §3's Job entity; persisted via
/// `ac-storage::upsertJob`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub job_id: JobId,
    pub thread_id: ThreadId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_id: Option<TurnId>,
    pub state: JobState,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub last_seq: i64,
}

impl JobSnapshot {
    pub fn new(job_id: JobId, thread_id: ThreadId, created_at: DateTime<Utc>) -> Self {
        Self {
            job_id,
            thread_id,
            turn_id: None,
            state: JobState::Queued,
            created_at,
            finished_at: None,
            error_message: None,
            last_seq: -1,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl JobSnapshot {
    pub fn for_test(thread_id: impl Into<ThreadId>) -> Self {
        let now = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap_or_else(Utc::now);
        Self::new(JobId::new(), thread_id.into(), now)
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
