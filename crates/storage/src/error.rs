// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage error taxonomy (spec.md §4.1, §7).

use ac_core::JobId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("job {0} already reached a terminal state; no further events may be appended")]
    JobTerminal(JobId),

    #[error("cursor is out of retention for job {0}")]
    CursorExpired(JobId),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] sqlx::Error),

    #[error("event payload serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
