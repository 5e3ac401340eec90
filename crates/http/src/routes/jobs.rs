// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job-scoped routes (spec.md §6): snapshot, event tail (JSON or SSE,
//! negotiated on `Accept`), approval resolution, cancellation.
//!
//! The SSE branch is grounded on `fourthplaces-mntogether/packages/server/
//! src/kernel/sse.rs`'s history-then-live merge: drain the catch-up page
//! first, then forward the live receiver until the job finishes or the
//! fan-out evicts the subscription as a slow consumer.

use crate::error::ApiError;
use crate::routes::threads::EventsPageBody;
use crate::state::SharedState;
use ac_core::{ApprovalDecisionKind, ApprovalId, Clock, Event, JobId, JobSnapshot};
use ac_gateway::AgentClient;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::stream::{self, Stream};
use serde::Deserialize;
use std::convert::Infallible;

pub async fn job_snapshot<A: AgentClient, C: Clock>(
    State(state): State<SharedState<A, C>>,
    Path(job_id): Path<String>,
) -> Result<Json<JobSnapshot>, ApiError> {
    let snapshot = state.orchestrator.job_snapshot(JobId::from_string(job_id)).await?;
    Ok(Json(snapshot))
}

#[derive(Debug, Deserialize)]
pub struct JobEventsQuery {
    #[serde(default = "default_cursor")]
    pub cursor: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_cursor() -> i64 {
    -1
}

fn default_limit() -> i64 {
    500
}

/// `GET /v1/jobs/{jid}/events`: `Accept: text/event-stream` opens a live,
/// reconnectable SSE tail (spec §4.4); anything else gets one bounded JSON
/// page of history (spec §4.3.1's non-streaming bootstrap path).
pub async fn job_events<A: AgentClient, C: Clock>(
    State(state): State<SharedState<A, C>>,
    Path(job_id): Path<String>,
    Query(query): Query<JobEventsQuery>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let job_id = JobId::from_string(job_id);
    let wants_sse = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("text/event-stream"))
        .unwrap_or(false);

    if !wants_sse {
        let page = state.orchestrator.list_events(job_id, query.cursor, query.limit).await?;
        return Ok(Json(EventsPageBody { data: page.events, next_cursor: page.next_cursor, has_more: page.has_more }).into_response());
    }

    let subscription = state.orchestrator.subscribe_job(job_id, query.cursor).await?;
    Ok(Sse::new(event_stream(subscription)).keep_alive(KeepAlive::default()).into_response())
}

struct StreamCursor {
    history: std::vec::IntoIter<Event>,
    /// Low-water mark: the last `seq` already delivered via `history`. The
    /// live queue was registered before the history page's gap-close read,
    /// so it can carry events already included in `history` (see
    /// `Orchestrator::subscribe_job`) — anything at or below this mark is
    /// skipped rather than re-delivered.
    low_water: i64,
    /// `None` when the job was already terminal at subscribe time — the
    /// stream ends once `history` drains instead of waiting on a live
    /// queue/done-signal pair that will never fire (spec.md's Subscription
    /// lifecycle: torn down once job-terminal state is observed).
    live: Option<LiveTail>,
}

struct LiveTail {
    rx: tokio::sync::mpsc::Receiver<Event>,
    done: tokio::sync::oneshot::Receiver<ac_fanout::CloseReason>,
}

fn event_stream(subscription: ac_orchestrator::JobSubscription) -> impl Stream<Item = Result<SseEvent, Infallible>> {
    let low_water = subscription.history.next_cursor;
    let cursor = StreamCursor {
        history: subscription.history.events.into_iter(),
        low_water,
        live: subscription.subscription.map(|sub| LiveTail { rx: sub.rx, done: sub.done }),
    };

    stream::unfold(cursor, |mut cursor| async move {
        if let Some(event) = cursor.history.next() {
            return Some((to_sse(&event), cursor));
        }
        let Some(live) = cursor.live.as_mut() else {
            // Job was already terminal at subscribe time and history is
            // fully drained; nothing more will ever be published.
            return None;
        };
        loop {
            tokio::select! {
                biased;
                maybe = live.rx.recv() => {
                    let event = maybe?;
                    if event.seq <= cursor.low_water {
                        continue;
                    }
                    return Some((to_sse(&event), cursor));
                }
                _ = &mut live.done => return None,
            }
        }
    })
    .map(Ok)
}

fn to_sse(event: &Event) -> SseEvent {
    SseEvent::default().event(event.type_tag()).json_data(event).unwrap_or_else(|_| SseEvent::default().event("error").data("serialization failure"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ac_core::EventPayload;
    use ac_storage::EventPage;
    use futures_util::StreamExt;

    fn event(job_id: JobId, seq: i64) -> Event {
        Event::new(job_id, seq, chrono::Utc::now(), EventPayload::JobState { state: ac_core::JobState::Running, error_message: None })
    }

    /// Regression test for the handoff race documented on
    /// `Orchestrator::subscribe_job`: the live queue is registered before
    /// the catch-up page's gap-close read, so it can carry events already
    /// present in `history`. `event_stream` must filter those out rather
    /// than re-deliver them (spec §8 P3).
    #[tokio::test]
    async fn event_stream_drops_events_already_covered_by_history() {
        let job_id = JobId::new();
        let history = EventPage { events: vec![event(job_id, 0), event(job_id, 1)], next_cursor: 1, has_more: false };

        let (tx, rx) = tokio::sync::mpsc::channel(8);
        let (_done_tx, done_rx) = tokio::sync::oneshot::channel();

        // Simulates the handoff race: the live queue already has event 1
        // (duplicate of history's tail) followed by the genuinely new event 2.
        tx.try_send(event(job_id, 1)).unwrap();
        tx.try_send(event(job_id, 2)).unwrap();
        drop(tx);

        let subscription = ac_orchestrator::JobSubscription {
            subscription: Some(ac_fanout::Subscription { id: 1, job_id, rx, done: done_rx }),
            history,
        };

        let delivered: Vec<_> = event_stream(subscription).collect().await;
        // History (seq 0, 1) plus the one genuinely new live event (seq 2):
        // 3 deliveries, not 4 — the duplicate seq-1 off the live queue must
        // be filtered.
        assert_eq!(delivered.len(), 3);
    }

    /// A job already terminal at subscribe time has no live queue
    /// (`Orchestrator::subscribe_job` returns `subscription: None`); the
    /// stream must end once history drains instead of hanging forever —
    /// spec.md's Subscription lifecycle tears down "on ... job terminal
    /// state observed by subscriber".
    #[tokio::test]
    async fn event_stream_ends_immediately_for_an_already_terminal_job() {
        let job_id = JobId::new();
        let history = EventPage {
            events: vec![event(job_id, 0), Event::new(job_id, 1, chrono::Utc::now(), EventPayload::JobFinished { state: ac_core::JobState::Done, error_message: None })],
            next_cursor: 1,
            has_more: false,
        };

        let subscription = ac_orchestrator::JobSubscription { subscription: None, history };

        let delivered = tokio::time::timeout(std::time::Duration::from_millis(200), event_stream(subscription).collect::<Vec<_>>())
            .await
            .expect("stream must end instead of hanging on a live queue that will never arrive");
        assert_eq!(delivered.len(), 2);
    }
}

#[derive(Debug, Deserialize)]
pub struct ApproveBody {
    #[serde(rename = "approvalId")]
    pub approval_id: String,
    pub decision: ApprovalDecisionKind,
    #[serde(default, rename = "execPolicyAmendment")]
    pub exec_policy_amendment: Vec<String>,
}

pub async fn approve_job<A: AgentClient, C: Clock>(
    State(state): State<SharedState<A, C>>,
    Path(job_id): Path<String>,
    Json(body): Json<ApproveBody>,
) -> Result<StatusCode, ApiError> {
    let approval_id = ApprovalId::from(body.approval_id);
    state.orchestrator.resolve_approval(JobId::from_string(job_id), &approval_id, body.decision, body.exec_policy_amendment).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn cancel_job<A: AgentClient, C: Clock>(
    State(state): State<SharedState<A, C>>,
    Path(job_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.orchestrator.cancel_job(JobId::from_string(job_id)).await?;
    Ok(StatusCode::ACCEPTED)
}
