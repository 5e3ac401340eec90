// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable Event Store (spec.md §4.1): append-only job event log, job
//! snapshots, and the turn→job binding table. Backed by sqlite via `sqlx`,
//! grounded on `crcn-seesaw-rs`'s `sqlx`-based job store (adapted from
//! postgres to sqlite per spec §6's "one embedded relational database
//! file") and on `oj-daemon/src/storage/mod.rs`'s in-memory
//! `MaterializedState` for the hot-tail cache concept — here scoped to a
//! per-job ring rather than the whole process.
//!
//! `ac-storage` knows nothing about HTTP, SSE, or the agent subprocess; it
//! is the sole owner of `dbPath` and the only crate that imports `sqlx`.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod backup;
pub mod codec;
pub mod error;
mod schema;

pub use error::StorageError;

use ac_core::{Event, EventPayload, JobId, JobSnapshot, JobState, ThreadId, TurnId};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex as SyncMutex;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;

/// Default per-job event ring size (spec §3's Event entity, §4.1 retention).
pub const DEFAULT_EVENT_RETENTION: i64 = 2000;
/// Minimum allowed retention (spec §3: "configurable, default 2000, min 100").
pub const MIN_EVENT_RETENTION: i64 = 100;

/// A page of events read from the store (spec §4.1's `readRange`).
#[derive(Debug, Clone)]
pub struct EventPage {
    pub events: Vec<Event>,
    pub next_cursor: i64,
    pub has_more: bool,
}

/// Durable event log, job snapshots, and turn→job bindings.
///
/// Cloning shares the same connection pool and per-job lock table.
#[derive(Clone)]
pub struct EventStore {
    pool: SqlitePool,
    retention: i64,
    job_locks: Arc<SyncMutex<HashMap<JobId, Arc<AsyncMutex<()>>>>>,
}

impl EventStore {
    /// Open (creating if absent) the sqlite database at `path`, backing up
    /// any existing file before running the schema bootstrap, and enabling
    /// WAL journal mode for crash-safe durability.
    pub async fn open(path: &Path, retention: i64) -> Result<Self, StorageError> {
        backup::backup_before_migrate(path)?;

        let retention = retention.max(MIN_EVENT_RETENTION);

        let opts = SqliteConnectOptions::from_str(&format!("sqlite://{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new().max_connections(8).connect_with(opts).await?;

        schema::run_migrations(&pool).await?;

        Ok(Self { pool, retention, job_locks: Arc::new(SyncMutex::new(HashMap::new())) })
    }

    /// In-memory sqlite store for tests that don't need a real file on disk.
    #[cfg(any(test, feature = "test-support"))]
    pub async fn open_in_memory(retention: i64) -> Result<Self, StorageError> {
        let retention = retention.max(MIN_EVENT_RETENTION);
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")?.create_if_missing(true);
        let pool = SqlitePoolOptions::new().max_connections(1).connect_with(opts).await?;
        schema::run_migrations(&pool).await?;
        Ok(Self { pool, retention, job_locks: Arc::new(SyncMutex::new(HashMap::new())) })
    }

    fn job_lock(&self, job_id: &JobId) -> Arc<AsyncMutex<()>> {
        self.job_locks.lock().entry(*job_id).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
    }

    /// Append one event to `job_id`'s log, assigning the next sequence
    /// number under the per-job lock (spec §4.1's `appendEvent`,
    /// invariant I1). `dedupe_key`, when supplied, makes the append
    /// idempotent (R1): a second call with the same key for the same job
    /// is a no-op that returns the originally-assigned seq.
    pub async fn append_event(
        &self,
        job_id: JobId,
        payload: EventPayload,
        dedupe_key: Option<&str>,
    ) -> Result<i64, StorageError> {
        let lock = self.job_lock(&job_id);
        let _guard = lock.lock().await;

        if let Some(key) = dedupe_key {
            if let Some(existing) = self.find_by_dedupe_key(job_id, key).await? {
                return Ok(existing);
            }
        }

        let is_finished = payload.is_job_finished();
        if let Some(snapshot) = self.load_job_unlocked(job_id).await? {
            if snapshot.is_terminal() && !is_finished {
                return Err(StorageError::JobTerminal(job_id));
            }
        }

        let next_seq = self.max_seq_unlocked(job_id).await?.map(|s| s + 1).unwrap_or(0);
        let ts = Utc::now();
        let (type_tag, payload_json) = codec::encode(&payload)?;

        sqlx::query(
            "INSERT INTO events (job_id, seq, type, ts, payload, dedupe_key) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(job_id.as_str())
        .bind(next_seq)
        .bind(&type_tag)
        .bind(ts.to_rfc3339())
        .bind(&payload_json)
        .bind(dedupe_key)
        .execute(&self.pool)
        .await?;

        sqlx::query("UPDATE jobs SET last_seq = ? WHERE job_id = ?")
            .bind(next_seq)
            .bind(job_id.as_str())
            .execute(&self.pool)
            .await?;

        if next_seq >= self.retention {
            self.evict_job_tail_unlocked(job_id, self.retention).await?;
        }

        Ok(next_seq)
    }

    async fn find_by_dedupe_key(&self, job_id: JobId, key: &str) -> Result<Option<i64>, StorageError> {
        let row = sqlx::query("SELECT seq FROM events WHERE job_id = ? AND dedupe_key = ?")
            .bind(job_id.as_str())
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get::<i64, _>("seq")))
    }

    async fn max_seq_unlocked(&self, job_id: JobId) -> Result<Option<i64>, StorageError> {
        let row = sqlx::query("SELECT MAX(seq) as m FROM events WHERE job_id = ?")
            .bind(job_id.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get::<Option<i64>, _>("m")?)
    }

    /// Read events with `seq > after_cursor`, up to `limit` (spec §4.1's
    /// `readRange`). Enforces cursor validity per invariant I5.
    pub async fn read_range(
        &self,
        job_id: JobId,
        after_cursor: i64,
        limit: i64,
    ) -> Result<EventPage, StorageError> {
        let min_seq = sqlx::query("SELECT MIN(seq) as m FROM events WHERE job_id = ?")
            .bind(job_id.as_str())
            .fetch_one(&self.pool)
            .await?
            .try_get::<Option<i64>, _>("m")?;

        let last_seq = self.max_seq_unlocked(job_id).await?;

        if after_cursor != ac_core::CURSOR_FRESH {
            let caught_up = last_seq.is_some_and(|l| after_cursor == l);
            if !caught_up {
                if let Some(min) = min_seq {
                    if after_cursor + 1 < min {
                        return Err(StorageError::CursorExpired(job_id));
                    }
                } else {
                    // No events at all retained for this job: any non-fresh,
                    // non-caught-up cursor cannot be satisfied.
                    return Err(StorageError::CursorExpired(job_id));
                }
            }
        }

        let rows = sqlx::query(
            "SELECT job_id, seq, type, ts, payload FROM events WHERE job_id = ? AND seq > ? ORDER BY seq ASC LIMIT ?",
        )
        .bind(job_id.as_str())
        .bind(after_cursor)
        .bind(limit + 1)
        .fetch_all(&self.pool)
        .await?;

        let has_more = rows.len() as i64 > limit;
        let mut events = Vec::with_capacity(rows.len().min(limit as usize));
        for row in rows.into_iter().take(limit as usize) {
            let seq: i64 = row.get("seq");
            let type_tag: String = row.get("type");
            let ts_str: String = row.get("ts");
            let payload_json: String = row.get("payload");
            let ts = DateTime::parse_from_rfc3339(&ts_str).map(|dt| dt.with_timezone(&Utc)).unwrap_or_else(|_| Utc::now());
            let payload = codec::decode(&type_tag, &payload_json)?;
            events.push(Event::new(job_id, seq, ts, payload));
        }

        let next_cursor = events.last().map(|e| e.seq).unwrap_or(after_cursor);
        Ok(EventPage { events, next_cursor, has_more })
    }

    /// Persist a job snapshot (spec §4.1's `upsertJob`).
    pub async fn upsert_job(&self, snapshot: &JobSnapshot) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO jobs (job_id, thread_id, turn_id, state, created_at, finished_at, error_message, last_seq)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(job_id) DO UPDATE SET
                thread_id = excluded.thread_id,
                turn_id = excluded.turn_id,
                state = excluded.state,
                finished_at = excluded.finished_at,
                error_message = excluded.error_message,
                last_seq = excluded.last_seq
            "#,
        )
        .bind(snapshot.job_id.as_str())
        .bind(snapshot.thread_id.as_str())
        .bind(snapshot.turn_id.as_ref().map(|t| t.as_str()))
        .bind(snapshot.state.to_string())
        .bind(snapshot.created_at.to_rfc3339())
        .bind(snapshot.finished_at.map(|t| t.to_rfc3339()))
        .bind(&snapshot.error_message)
        .bind(snapshot.last_seq)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Load a job snapshot by id (spec §4.1's `loadJob`).
    pub async fn load_job(&self, job_id: JobId) -> Result<Option<JobSnapshot>, StorageError> {
        self.load_job_unlocked(job_id).await
    }

    async fn load_job_unlocked(&self, job_id: JobId) -> Result<Option<JobSnapshot>, StorageError> {
        let row = sqlx::query(
            "SELECT job_id, thread_id, turn_id, state, created_at, finished_at, error_message, last_seq FROM jobs WHERE job_id = ?",
        )
        .bind(job_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else { return Ok(None) };
        Ok(Some(row_to_snapshot(row)?))
    }

    /// Record a late turn→job binding (spec §3.4.3.6, §4.1's `bindTurn`).
    /// Idempotent: re-binding the same `(thread_id, turn_id)` to the same
    /// job is a no-op.
    pub async fn bind_turn(&self, job_id: JobId, thread_id: &ThreadId, turn_id: &TurnId) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT OR IGNORE INTO turn_bindings (thread_id, turn_id, job_id) VALUES (?, ?, ?)",
        )
        .bind(thread_id.as_str())
        .bind(turn_id.as_str())
        .bind(job_id.as_str())
        .execute(&self.pool)
        .await?;

        sqlx::query("UPDATE jobs SET turn_id = ? WHERE job_id = ?")
            .bind(turn_id.as_str())
            .bind(job_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Resolve a `(thread_id, turn_id)` pair to its bound job, if any
    /// (spec §4.1's `lookupJobByTurn`).
    pub async fn lookup_job_by_turn(&self, thread_id: &ThreadId, turn_id: &TurnId) -> Result<Option<JobId>, StorageError> {
        let row = sqlx::query("SELECT job_id FROM turn_bindings WHERE thread_id = ? AND turn_id = ?")
            .bind(thread_id.as_str())
            .bind(turn_id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| JobId::from_string(r.get::<String, _>("job_id"))))
    }

    /// Retention GC: keep only the newest `keep_last_n` events of a job,
    /// evicting the oldest prefix (spec §4.1's `evictJobTail`). Readers
    /// that held a cursor into the evicted prefix observe `CURSOR_EXPIRED`
    /// on their next `read_range`.
    pub async fn evict_job_tail(&self, job_id: JobId, keep_last_n: i64) -> Result<u64, StorageError> {
        let lock = self.job_lock(&job_id);
        let _guard = lock.lock().await;
        self.evict_job_tail_unlocked(job_id, keep_last_n).await
    }

    async fn evict_job_tail_unlocked(&self, job_id: JobId, keep_last_n: i64) -> Result<u64, StorageError> {
        let result = sqlx::query(
            r#"
            DELETE FROM events
            WHERE job_id = ? AND seq <= (
                SELECT MAX(seq) - ? FROM events WHERE job_id = ?
            )
            "#,
        )
        .bind(job_id.as_str())
        .bind(keep_last_n - 1)
        .bind(job_id.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Full eviction of terminal jobs whose `finished_at` predates `ttl`
    /// (the age-based GC half of DESIGN.md's retention decision). Deletes
    /// the job's events, its row, and any turn bindings pointing at it.
    pub async fn evict_finished_older_than(&self, ttl: ChronoDuration) -> Result<u64, StorageError> {
        let cutoff = (Utc::now() - ttl).to_rfc3339();
        let stale_jobs = sqlx::query(
            "SELECT job_id FROM jobs WHERE finished_at IS NOT NULL AND finished_at < ?",
        )
        .bind(&cutoff)
        .fetch_all(&self.pool)
        .await?;

        let mut evicted = 0u64;
        for row in stale_jobs {
            let job_id: String = row.get("job_id");
            sqlx::query("DELETE FROM events WHERE job_id = ?").bind(&job_id).execute(&self.pool).await?;
            sqlx::query("DELETE FROM turn_bindings WHERE job_id = ?").bind(&job_id).execute(&self.pool).await?;
            sqlx::query("DELETE FROM jobs WHERE job_id = ?").bind(&job_id).execute(&self.pool).await?;
            evicted += 1;
        }
        Ok(evicted)
    }
}

fn row_to_snapshot(row: sqlx::sqlite::SqliteRow) -> Result<JobSnapshot, StorageError> {
    let job_id = JobId::from_string(row.get::<String, _>("job_id"));
    let thread_id = ThreadId::from(row.get::<String, _>("thread_id"));
    let turn_id: Option<String> = row.get("turn_id");
    let state_str: String = row.get("state");
    let created_at_str: String = row.get("created_at");
    let finished_at_str: Option<String> = row.get("finished_at");
    let error_message: Option<String> = row.get("error_message");
    let last_seq: i64 = row.get("last_seq");

    let state = parse_job_state(&state_str);
    let created_at = DateTime::parse_from_rfc3339(&created_at_str).map(|d| d.with_timezone(&Utc)).unwrap_or_else(|_| Utc::now());
    let finished_at = finished_at_str
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|d| d.with_timezone(&Utc));

    Ok(JobSnapshot {
        job_id,
        thread_id,
        turn_id: turn_id.map(TurnId::from),
        state,
        created_at,
        finished_at,
        error_message,
        last_seq,
    })
}

fn parse_job_state(s: &str) -> JobState {
    match s {
        "QUEUED" => JobState::Queued,
        "RUNNING" => JobState::Running,
        "WAITING_APPROVAL" => JobState::WaitingApproval,
        "DONE" => JobState::Done,
        "FAILED" => JobState::Failed,
        "CANCELLED" => JobState::Cancelled,
        other => {
            tracing::warn!(state = %other, "unknown job state in storage, defaulting to FAILED");
            JobState::Failed
        }
    }
}
