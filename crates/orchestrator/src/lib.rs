// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session Orchestrator (spec.md §4.3): the state-machine hub. Owns every
//! thread/job/approval state machine, translates client intents into agent
//! requests, consumes agent notifications, assigns sequence numbers,
//! appends to the Event Store, and fans out to live subscribers.
//!
//! Grounded on `oj-daemon/src/engine/runtime/mod.rs`'s `Runtime<A, N, C>`:
//! one process-wide instance generic over its adapter and clock, holding
//! its in-memory bookkeeping behind `parking_lot::Mutex`es alongside a
//! handle to durable storage — generalized here from job/crew/runbook
//! bookkeeping to the thread/job/approval state machines spec.md §4.3.2,
//! §4.3.4 define, plus the late turn-binding buffer (§4.3.6).

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod error;
mod history;
mod notify;

pub use error::OrchestratorError;
pub use history::HistoryPage;

use ac_core::{
    Approval, ApprovalDecisionKind, ApprovalId, ApprovalKind, ApprovalPolicy, Clock, Event,
    EventPayload, JobId, JobSnapshot, JobState, ResolvedDecision, SandboxMode, Thread, ThreadId,
};
use ac_fanout::FanOut;
use ac_gateway::{AgentClient, PendingApprovalId};
use ac_storage::{EventPage, EventStore};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Tunables for the Orchestrator (spec §10's `WORKER_*` environment knobs).
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Default timeout for `AgentClient::call` (spec §4.2).
    pub rpc_timeout: Duration,
    /// `cancelJob`'s grace window before forcing `CANCELLED` (spec §5).
    pub cancel_grace: Duration,
    /// Late turn-binding buffer window (spec §4.3.6).
    pub orphan_window: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            rpc_timeout: Duration::from_millis(30_000),
            cancel_grace: Duration::from_millis(10_000),
            orphan_window: Duration::from_millis(5_000),
        }
    }
}

/// Input to `startTurn` (spec §4.3.1).
#[derive(Debug, Clone, Default)]
pub struct StartTurnRequest {
    pub text: String,
    pub input: Option<Value>,
    pub approval_policy: Option<ApprovalPolicy>,
    pub sandbox_mode: Option<SandboxMode>,
    pub model: Option<String>,
}

/// A live subscription handed back to the HTTP layer: the catch-up history
/// page plus the live tail (spec §4.4's "replay-then-live handoff").
///
/// `subscription` is `None` when the job was already terminal at
/// subscribe time: spec.md's Subscription lifecycle tears the
/// subscription down once "job terminal state [is] observed by
/// subscriber", and a job whose `job.finished` already landed in history
/// will never publish again (`FanOut::publish` only prunes its registry
/// entry on a subsequent publish), so there is nothing left to subscribe
/// to — the caller must end the stream once `history` is drained instead
/// of waiting on a live queue and done-signal that will never fire.
pub struct JobSubscription {
    pub subscription: Option<ac_fanout::Subscription>,
    pub history: EventPage,
}

pub(crate) struct BufferedNotification {
    method: String,
    params: Value,
    arrived_at: Instant,
}

/// A job awaiting its late `turnId` binding (spec §4.3.6). Notifications
/// for the thread that arrive before the binding is established are held
/// here, bounded by `OrchestratorConfig::orphan_window`.
pub(crate) struct PendingBinding {
    job_id: JobId,
    buffered: Vec<BufferedNotification>,
}

struct Inner<A: AgentClient, C: Clock> {
    agent: A,
    storage: EventStore,
    fanout: FanOut,
    clock: C,
    config: OrchestratorConfig,
    threads: Mutex<HashMap<ThreadId, Thread>>,
    /// The one non-terminal job per thread (invariant I3).
    active_job: Mutex<HashMap<ThreadId, JobId>>,
    pending_bindings: Mutex<HashMap<ThreadId, PendingBinding>>,
    approvals: Mutex<HashMap<ApprovalId, Approval>>,
    /// At most one pending approval per job (invariant I4).
    pending_approval: Mutex<HashMap<JobId, ApprovalId>>,
    /// The agent's raw JSON-RPC request id for each outstanding approval,
    /// needed to answer it later via `AgentClient::resolve_approval`.
    pending_requests: Mutex<HashMap<ApprovalId, PendingApprovalId>>,
}

/// The Session Orchestrator. Cheap to clone (an `Arc` handle); every clone
/// shares the same in-memory state, storage handle, and gateway.
pub struct Orchestrator<A: AgentClient, C: Clock> {
    inner: Arc<Inner<A, C>>,
}

impl<A: AgentClient, C: Clock> Clone for Orchestrator<A, C> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<A: AgentClient, C: Clock> Orchestrator<A, C> {
    /// Construct the Orchestrator and start its background notification
    /// consumer. Exactly one Event Store, one Gateway, one Fan-Out per
    /// process (spec §9's "replace singleton stores with constructor
    /// injection").
    pub fn new(agent: A, storage: EventStore, fanout: FanOut, clock: C, config: OrchestratorConfig) -> Self {
        let inner = Arc::new(Inner {
            agent,
            storage,
            fanout,
            clock,
            config,
            threads: Mutex::new(HashMap::new()),
            active_job: Mutex::new(HashMap::new()),
            pending_bindings: Mutex::new(HashMap::new()),
            approvals: Mutex::new(HashMap::new()),
            pending_approval: Mutex::new(HashMap::new()),
            pending_requests: Mutex::new(HashMap::new()),
        });
        let this = Self { inner };

        if let Some(rx) = this.inner.agent.take_notifications() {
            let consumer = this.clone();
            tokio::spawn(async move { notify::run(consumer, rx).await });
        } else {
            tracing::warn!("agent notification stream already taken; orchestrator will not observe agent events");
        }

        this
    }

    /// `initialize` (spec §6's upstream method list) — issued once at
    /// startup by the binary entrypoint before any thread is created.
    pub async fn initialize(&self) -> Result<Value, OrchestratorError> {
        self.inner.agent.call("initialize", json!({}), self.inner.config.rpc_timeout).await.map_err(Into::into)
    }

    /// `createThread(projectPath, approvalPolicy, sandbox, model) → Thread`.
    pub async fn create_thread(
        &self,
        project_path: String,
        approval_policy: ApprovalPolicy,
        sandbox_mode: SandboxMode,
        model: Option<String>,
    ) -> Result<Thread, OrchestratorError> {
        if project_path.trim().is_empty() {
            return Err(OrchestratorError::InvalidArgument("projectPath must not be empty".into()));
        }

        let params = json!({
            "projectPath": project_path,
            "approvalPolicy": approval_policy,
            "sandboxMode": sandbox_mode,
            "model": model,
        });
        let result = self.inner.agent.call("newThread", params, self.inner.config.rpc_timeout).await?;
        let thread_id = result
            .get("threadId")
            .and_then(Value::as_str)
            .map(ThreadId::from)
            .ok_or_else(|| OrchestratorError::InvalidArgument("agent newThread reply missing threadId".into()))?;

        let now = self.inner.clock.utc_now();
        let thread = Thread::new(thread_id.clone(), project_path, approval_policy, sandbox_mode, model, now);
        self.inner.threads.lock().insert(thread_id.clone(), thread.clone());
        tracing::info!(%thread_id, "thread created");
        Ok(thread)
    }

    /// `listThreads()`.
    pub fn list_threads(&self) -> Vec<Thread> {
        self.inner.threads.lock().values().cloned().collect()
    }

    pub fn get_thread(&self, thread_id: &ThreadId) -> Result<Thread, OrchestratorError> {
        self.inner.threads.lock().get(thread_id).cloned().ok_or_else(|| OrchestratorError::ThreadNotFound(thread_id.clone()))
    }

    /// `activateThread(threadId)`.
    pub fn activate_thread(&self, thread_id: &ThreadId) -> Result<Thread, OrchestratorError> {
        let mut threads = self.inner.threads.lock();
        let thread = threads.get_mut(thread_id).ok_or_else(|| OrchestratorError::ThreadNotFound(thread_id.clone()))?;
        thread.archived = false;
        thread.touch(self.inner.clock.utc_now());
        Ok(thread.clone())
    }

    /// `archiveThread(threadId)`.
    pub fn archive_thread(&self, thread_id: &ThreadId) -> Result<Thread, OrchestratorError> {
        let mut threads = self.inner.threads.lock();
        let thread = threads.get_mut(thread_id).ok_or_else(|| OrchestratorError::ThreadNotFound(thread_id.clone()))?;
        thread.archived = true;
        thread.touch(self.inner.clock.utc_now());
        Ok(thread.clone())
    }

    /// `startTurn(threadId, {...}) → {jobId}` (spec §4.3.1). Enforces I3
    /// (one live turn per thread) by atomically reserving the thread's
    /// active-job slot before issuing `sendUserMessage`.
    pub async fn start_turn(&self, thread_id: &ThreadId, req: StartTurnRequest) -> Result<JobId, OrchestratorError> {
        if req.text.trim().is_empty() {
            return Err(OrchestratorError::InvalidArgument("text must not be empty".into()));
        }
        if !self.inner.threads.lock().contains_key(thread_id) {
            return Err(OrchestratorError::ThreadNotFound(thread_id.clone()));
        }

        let job_id = JobId::new();
        {
            let mut active = self.inner.active_job.lock();
            if active.contains_key(thread_id) {
                return Err(OrchestratorError::ThreadBusy(thread_id.clone()));
            }
            active.insert(thread_id.clone(), job_id);
        }

        let now = self.inner.clock.utc_now();
        let snapshot = JobSnapshot::new(job_id, thread_id.clone(), now);
        if let Err(e) = self.inner.storage.upsert_job(&snapshot).await {
            self.inner.active_job.lock().remove(thread_id);
            return Err(e.into());
        }

        self.inner.pending_bindings.lock().insert(thread_id.clone(), PendingBinding { job_id, buffered: Vec::new() });

        let params = json!({
            "threadId": thread_id.as_str(),
            "text": req.text,
            "input": req.input,
            "approvalPolicy": req.approval_policy,
            "sandbox": req.sandbox_mode,
            "model": req.model,
        });

        match self.inner.agent.call("sendUserMessage", params, self.inner.config.rpc_timeout).await {
            Ok(result) => {
                if let Some(turn_id) = result.get("turnId").and_then(Value::as_str).map(ac_core::TurnId::from) {
                    self.bind_and_activate(thread_id.clone(), job_id, turn_id).await;
                }
                // Otherwise the binding is established later by the first
                // `turn/started` notification for this thread (spec §4.3.6).
                Ok(job_id)
            }
            Err(e) => {
                // No event has been appended yet: clean up the reservation
                // and fail synchronously rather than translating to a
                // terminal transition (spec §7).
                self.inner.pending_bindings.lock().remove(thread_id);
                self.inner.active_job.lock().remove(thread_id);
                let mut failed = snapshot;
                failed.state = JobState::Failed;
                failed.error_message = Some(e.to_string());
                failed.finished_at = Some(self.inner.clock.utc_now());
                let _ = self.inner.storage.upsert_job(&failed).await;
                Err(e.into())
            }
        }
    }

    /// `listEvents(jobId, cursor, limit)` (spec §4.3.1's non-streaming
    /// bootstrap path).
    pub async fn list_events(&self, job_id: JobId, cursor: i64, limit: i64) -> Result<EventPage, OrchestratorError> {
        self.inner.storage.read_range(job_id, cursor, limit).await.map_err(Into::into)
    }

    pub async fn job_snapshot(&self, job_id: JobId) -> Result<JobSnapshot, OrchestratorError> {
        self.inner.storage.load_job(job_id).await?.ok_or(OrchestratorError::JobNotFound(job_id))
    }

    /// `subscribeJob(jobId, cursor)` (spec §4.4). If the job is already
    /// terminal, returns history only (`subscription: None`) — there is
    /// nothing left to ever publish. Otherwise registers with the Fan-Out
    /// first, then drains history up to the resume cursor and closes the
    /// gap against anything appended in between — the live queue and the
    /// catch-up page can therefore both carry the handful of events
    /// published during the handoff; callers dedupe on `seq` using
    /// `history.next_cursor` as the low-water mark before reading `rx`.
    pub async fn subscribe_job(&self, job_id: JobId, cursor: i64) -> Result<JobSubscription, OrchestratorError> {
        let snapshot = self.inner.storage.load_job(job_id).await?.ok_or(OrchestratorError::JobNotFound(job_id))?;

        let mut history = self.inner.storage.read_range(job_id, cursor, i64::MAX).await?;

        if snapshot.is_terminal() {
            // Nothing will ever publish for this job again; registering a
            // live subscriber here would sit in the fan-out registry
            // forever (it's only pruned by a subsequent `publish`, which
            // can't happen). The caller ends the stream once `history` is
            // drained.
            return Ok(JobSubscription { subscription: None, history });
        }

        let subscription = self.inner.fanout.subscribe(job_id);
        let gap = self.inner.storage.read_range(job_id, history.next_cursor, i64::MAX).await?;
        history.next_cursor = gap.next_cursor;
        history.has_more = gap.has_more;
        history.events.extend(gap.events);

        Ok(JobSubscription { subscription: Some(subscription), history })
    }

    /// `resolveApproval(jobId, approvalId, decision, execPolicyAmendment?)`
    /// (spec §4.3.1, §4.3.4).
    pub async fn resolve_approval(
        &self,
        job_id: JobId,
        approval_id: &ApprovalId,
        decision: ApprovalDecisionKind,
        execpolicy_amendment: Vec<String>,
    ) -> Result<(), OrchestratorError> {
        let approval_kind = {
            let approvals = self.inner.approvals.lock();
            let approval = approvals.get(approval_id).ok_or_else(|| OrchestratorError::ApprovalNotFound(approval_id.clone()))?;
            if approval.job_id != job_id {
                return Err(OrchestratorError::ApprovalNotFound(approval_id.clone()));
            }
            if !approval.is_pending() {
                return Err(OrchestratorError::InvalidArgument(format!("approval {approval_id} already resolved")));
            }
            approval.kind.clone()
        };

        let resolved = ResolvedDecision::build(decision, &approval_kind, execpolicy_amendment)?;

        let request_id = self
            .inner
            .pending_requests
            .lock()
            .remove(approval_id)
            .ok_or_else(|| OrchestratorError::ApprovalNotFound(approval_id.clone()))?;

        self.inner.agent.resolve_approval(request_id, resolved.to_upstream_value()).await?;

        {
            let mut approvals = self.inner.approvals.lock();
            if let Some(approval) = approvals.get_mut(approval_id) {
                approval.resolve(resolved.clone());
            }
        }
        self.inner.pending_approval.lock().remove(&job_id);

        self.append_and_publish(
            job_id,
            EventPayload::ApprovalResolved { approval_id: approval_id.clone(), decision: resolved.kind.clone() },
            None,
        )
        .await?;

        if resolved.kind.unblocks() {
            self.transition_job(job_id, JobState::Running, None).await?;
        } else {
            self.transition_job(job_id, JobState::Cancelled, None).await?;
        }
        Ok(())
    }

    /// `cancelJob(jobId)` (spec §4.3.1, §5's cancellation grace window).
    pub async fn cancel_job(&self, job_id: JobId) -> Result<(), OrchestratorError> {
        let snapshot = self.inner.storage.load_job(job_id).await?.ok_or(OrchestratorError::JobNotFound(job_id))?;
        if snapshot.is_terminal() {
            return Err(OrchestratorError::JobTerminal(job_id));
        }

        // Best-effort: the agent is expected to answer with a
        // `turn/completed{status:"interrupted"}` notification, handled by
        // the ordinary state machine. We don't fail `cancelJob` just
        // because the interrupt call itself errors; the grace window below
        // forces the terminal transition regardless.
        if let Err(e) = self.inner.agent.call("interruptTurn", json!({"jobId": job_id.as_str()}), self.inner.config.rpc_timeout).await {
            tracing::warn!(error = %e, %job_id, "interruptTurn call failed; relying on cancellation grace window");
        }

        let orchestrator = self.clone();
        let grace = self.inner.config.cancel_grace;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            if let Ok(Some(snapshot)) = orchestrator.inner.storage.load_job(job_id).await {
                if !snapshot.is_terminal() {
                    tracing::warn!(%job_id, "cancellation grace window elapsed; forcing CANCELLED");
                    if let Err(e) = orchestrator.transition_job(job_id, JobState::Cancelled, None).await {
                        tracing::error!(error = %e, %job_id, "failed to force job to CANCELLED after grace window");
                    }
                }
            }
        });
        Ok(())
    }

    /// `readThreadHistory(threadId, cursor, limit)` — see `history.rs`.
    pub async fn read_thread_history(&self, thread_id: &ThreadId, cursor: i64, limit: i64) -> Result<HistoryPage, OrchestratorError> {
        history::read_thread_history(self, thread_id, cursor, limit).await
    }

    /// Age-based retention sweep (DESIGN.md's open-question decision #1):
    /// delete the full row set of every terminal job whose `finished_at`
    /// predates `ttl`. Meant to be called periodically by a background task
    /// in the binary entrypoint, not from request-handling paths.
    pub async fn run_retention_sweep(&self, ttl: chrono::Duration) -> Result<u64, OrchestratorError> {
        self.inner.storage.evict_finished_older_than(ttl).await.map_err(Into::into)
    }

    /// Append one event to `job_id`'s log and publish it to live
    /// subscribers (the Orchestrator's half of spec §4's
    /// Gateway→Orchestrator→Store→Fan-Out flow).
    pub(crate) async fn append_and_publish(
        &self,
        job_id: JobId,
        payload: EventPayload,
        dedupe_key: Option<&str>,
    ) -> Result<Event, OrchestratorError> {
        let seq = self.inner.storage.append_event(job_id, payload.clone(), dedupe_key).await?;
        let event = Event::new(job_id, seq, self.inner.clock.utc_now(), payload);
        self.inner.fanout.publish(&event);
        Ok(event)
    }

    /// Drive `job_id` through one state transition (spec §4.3.2): append
    /// `job.state`, and if the new state is terminal, also append exactly
    /// one `job.finished`. Sticky per invariant I2 — a no-op if the job is
    /// already terminal.
    pub(crate) async fn transition_job(&self, job_id: JobId, new_state: JobState, error_message: Option<String>) -> Result<(), OrchestratorError> {
        let snapshot = self.inner.storage.load_job(job_id).await?.ok_or(OrchestratorError::JobNotFound(job_id))?;
        if snapshot.is_terminal() {
            return Ok(());
        }

        self.append_and_publish(job_id, EventPayload::JobState { state: new_state, error_message: error_message.clone() }, None).await?;
        if new_state.is_terminal() {
            self.append_and_publish(job_id, EventPayload::JobFinished { state: new_state, error_message: error_message.clone() }, None).await?;
        }

        let mut updated = self.inner.storage.load_job(job_id).await?.ok_or(OrchestratorError::JobNotFound(job_id))?;
        updated.state = new_state;
        updated.error_message = error_message;
        if new_state.is_terminal() {
            updated.finished_at = Some(self.inner.clock.utc_now());
            self.inner.active_job.lock().retain(|_, v| *v != job_id);
            self.inner.pending_approval.lock().remove(&job_id);
            self.inner.pending_bindings.lock().retain(|_, pb| pb.job_id != job_id);
        }
        self.inner.storage.upsert_job(&updated).await?;
        Ok(())
    }

    /// Transition `QUEUED → RUNNING` exactly once (spec §4.3.2), idempotent
    /// against the ack-vs-`turn/started` race (spec §4.3.6).
    pub(crate) async fn activate_if_queued(&self, job_id: JobId) -> Result<(), OrchestratorError> {
        if let Some(snapshot) = self.inner.storage.load_job(job_id).await? {
            if snapshot.state == JobState::Queued {
                self.transition_job(job_id, JobState::Running, None).await?;
            }
        }
        Ok(())
    }

    /// Record the late `turnId` binding, activate the job, and replay any
    /// notifications that arrived for this thread before the binding was
    /// established (spec §4.3.6).
    pub(crate) async fn bind_and_activate(&self, thread_id: ThreadId, job_id: JobId, turn_id: ac_core::TurnId) {
        if let Err(e) = self.inner.storage.bind_turn(job_id, &thread_id, &turn_id).await {
            tracing::error!(error = %e, %job_id, "failed to record turn binding");
            return;
        }
        tracing::info!(%thread_id, %turn_id, %job_id, "turn bound to job");

        let buffered = self.inner.pending_bindings.lock().remove(&thread_id).map(|pb| pb.buffered).unwrap_or_default();

        if let Err(e) = self.activate_if_queued(job_id).await {
            tracing::error!(error = %e, %job_id, "failed to transition job to RUNNING on binding");
        }

        for buffered_notification in buffered {
            notify::dispatch_bound(self, job_id, &buffered_notification.method, buffered_notification.params).await;
        }
    }

    /// Force a job to `FAILED` without going through the normal append
    /// path — used when the normal append itself has already failed (spec
    /// §7: "the Orchestrator treats a failed append as a state-transition
    /// failure and drives the Job to FAILED").
    pub(crate) async fn force_fail_locally(&self, job_id: JobId, message: String) {
        if let Ok(Some(mut snapshot)) = self.inner.storage.load_job(job_id).await {
            if !snapshot.is_terminal() {
                snapshot.state = JobState::Failed;
                snapshot.error_message = Some(message);
                snapshot.finished_at = Some(self.inner.clock.utc_now());
                let _ = self.inner.storage.upsert_job(&snapshot).await;
            }
        }
        self.inner.active_job.lock().retain(|_, v| *v != job_id);
        self.inner.pending_approval.lock().remove(&job_id);
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
