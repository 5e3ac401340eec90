// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thread history replay synthesis (spec.md §4.3.5): turns `readThread`'s
//! agent-native turn/item snapshot into the same event shape a live
//! subscriber would have seen, so a reconnecting client can reconstruct
//! chat state without ever having observed the live stream.
//!
//! Grounded on `oj-daemon/src/listener/query_logs.rs`'s pattern of
//! flattening a stored, structured history into a client-paginated wire
//! sequence on demand rather than persisting a second copy — here the
//! "stored" half is instead a live `readThread` call to the agent, and the
//! structured history is turns/items instead of log lines.

use crate::Orchestrator;
use ac_core::{Event, EventPayload, JobId, JobState, ThreadId, TurnId};
use ac_gateway::AgentClient;
use serde_json::{json, Value};

/// A page of synthesized thread-history events (spec §4.3.5's offset
/// cursor over the flattened turn/item sequence).
#[derive(Debug, Clone)]
pub struct HistoryPage {
    pub events: Vec<Event>,
    pub next_cursor: i64,
    pub has_more: bool,
}

/// `readThreadHistory(threadId, cursor, limit)` (spec §4.3.1, §4.3.5).
///
/// Calls the agent's `readThread`, flattens every turn into the event
/// sequence spec.md §4.3.5 prescribes, then paginates the flattened
/// sequence by plain list offset (`cursor` is a position in this
/// synthesized list, not a job's `seq` — the two cursor spaces are
/// unrelated and must not be confused by callers).
pub(crate) async fn read_thread_history<A: AgentClient, C: ac_core::Clock>(
    orchestrator: &Orchestrator<A, C>,
    thread_id: &ThreadId,
    cursor: i64,
    limit: i64,
) -> Result<HistoryPage, crate::OrchestratorError> {
    let result = orchestrator
        .inner
        .agent
        .call("readThread", json!({ "threadId": thread_id.as_str() }), orchestrator.inner.config.rpc_timeout)
        .await?;

    let turns = result.get("turns").and_then(Value::as_array).cloned().unwrap_or_default();
    let events = synthesize(orchestrator, thread_id, &turns).await;

    let total = events.len() as i64;
    if cursor < ac_core::CURSOR_FRESH || cursor >= total {
        return Err(crate::OrchestratorError::HistoryCursorExpired(cursor));
    }

    let start = (cursor + 1).max(0) as usize;
    let end = (start + limit.max(0) as usize).min(events.len());
    let page: Vec<Event> = events.get(start..end).map(<[Event]>::to_vec).unwrap_or_default();
    let next_cursor = if page.is_empty() { cursor } else { cursor + page.len() as i64 };
    let has_more = end < events.len();

    Ok(HistoryPage { events: page, next_cursor, has_more })
}

/// Flatten every turn into a replayable event sequence, per spec §4.3.5's
/// five numbered steps. Seq numbers are assigned per (synthetic or live)
/// `jobId`, starting at 0 — matching a fresh live subscription's numbering
/// even though this sequence is never persisted into the Event Store.
async fn synthesize<A: AgentClient, C: ac_core::Clock>(orchestrator: &Orchestrator<A, C>, thread_id: &ThreadId, turns: &[Value]) -> Vec<Event> {
    let mut out = Vec::new();
    let now = orchestrator.inner.clock.utc_now();

    for turn in turns {
        let turn_id_str = turn.get("turnId").and_then(Value::as_str).unwrap_or_default();
        let status = turn.get("status").and_then(Value::as_str).unwrap_or_default();
        let items = turn.get("items").and_then(Value::as_array).cloned().unwrap_or_default();

        let bound = orchestrator.inner.storage.lookup_job_by_turn(thread_id, &TurnId::from(turn_id_str)).await.ok().flatten();
        let job_id = bound.unwrap_or_else(|| synthetic_job_id(thread_id, turn_id_str));

        let mut seq = 0i64;

        for item in &items {
            let item_type = item.get("type").and_then(Value::as_str).unwrap_or_default();
            if item_type != "userMessage" && item_type != "agentMessage" {
                continue;
            }
            let minimized = minimize_item(item, item_type);
            out.push(Event::new(job_id, seq, now, EventPayload::ItemCompleted(minimized)));
            seq += 1;
        }

        let derived_state = match status {
            "completed" => JobState::Done,
            "failed" => JobState::Failed,
            "interrupted" => JobState::Cancelled,
            "inProgress" => JobState::Running,
            other => {
                tracing::warn!(status = %other, turn_id = %turn_id_str, "unrecognized turn status in thread history; treating as failed");
                JobState::Failed
            }
        };

        let error_message = turn.get("errorMessage").and_then(Value::as_str).map(str::to_string);

        out.push(Event::new(
            job_id,
            seq,
            now,
            EventPayload::JobState { state: derived_state, error_message: error_message.clone() },
        ));
        seq += 1;

        if derived_state.is_terminal() {
            out.push(Event::new(
                job_id,
                seq,
                now,
                EventPayload::JobFinished { state: derived_state, error_message: error_message.clone() },
            ));
            seq += 1;
        }

        if status == "failed" {
            if let Some(message) = error_message {
                out.push(Event::new(job_id, seq, now, EventPayload::Error { message, details: None }));
            }
        }
    }

    out
}

/// Minimize an item down to `{id, type, text|content}` (spec §4.3.5 step 1).
fn minimize_item(item: &Value, item_type: &str) -> Value {
    let id = item.get("id").cloned().unwrap_or(Value::Null);
    let text = item.get("text").cloned();
    let content = item.get("content").cloned();
    json!({
        "id": id,
        "type": item_type,
        "text": text,
        "content": content,
    })
}

/// Synthesize a stable history jobId of the form `hist_<threadId>_<turnId>`
/// (spec §4.3.5 step 3) for turns with no locally-bound live job.
fn synthetic_job_id(thread_id: &ThreadId, turn_id: &str) -> JobId {
    JobId::from_string(format!("hist_{}_{}", thread_id.as_str(), turn_id))
}

#[cfg(test)]
#[path = "history_tests.rs"]
mod tests;
