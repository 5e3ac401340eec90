// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Logical schema (spec.md §6) and migration bootstrap.
//!
//! Matches the oj-daemon convention of a plain `CREATE TABLE IF NOT EXISTS`
//! bootstrap run at connect time rather than a versioned migration runner —
//! this service has exactly one schema version, so there is nothing to
//! migrate between yet.

use crate::error::StorageError;
use sqlx::SqlitePool;

pub(crate) async fn run_migrations(pool: &SqlitePool) -> Result<(), StorageError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS events (
            job_id TEXT NOT NULL,
            seq INTEGER NOT NULL,
            type TEXT NOT NULL,
            ts TEXT NOT NULL,
            payload TEXT NOT NULL,
            dedupe_key TEXT,
            PRIMARY KEY (job_id, seq)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_events_dedupe
        ON events (job_id, dedupe_key)
        WHERE dedupe_key IS NOT NULL
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS jobs (
            job_id TEXT PRIMARY KEY,
            thread_id TEXT NOT NULL,
            turn_id TEXT,
            state TEXT NOT NULL,
            created_at TEXT NOT NULL,
            finished_at TEXT,
            error_message TEXT,
            last_seq INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_thread ON jobs (thread_id)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS turn_bindings (
            thread_id TEXT NOT NULL,
            turn_id TEXT NOT NULL,
            job_id TEXT NOT NULL,
            PRIMARY KEY (thread_id, turn_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
