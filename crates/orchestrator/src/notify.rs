// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent notification consumer (spec.md §4.2, §4.3.2, §4.3.6). One
//! background task per Orchestrator drains `AgentClient::take_notifications`
//! and drives the job state machine; `resolveApproval`'s caller-facing half
//! lives in `lib.rs`, this module only covers the agent-initiated half
//! (approval *requests*, not their resolution).
//!
//! Grounded on `oj-adapters/src/agent/coop/ws.rs`'s `event_bridge` loop,
//! generalized from its flat event-tagging to this spec's full notification
//! taxonomy plus the late turn-binding buffer it never needed (the source
//! adapter always carried a stable id on every frame).

use crate::{BufferedNotification, Orchestrator};
use ac_core::{Approval, ApprovalKind, Clock, EventPayload, JobId, JobState, ThreadId, TurnId};
use ac_gateway::{AgentClient, GatewayMessage};
use serde_json::{json, Value};
use tokio::sync::mpsc;

pub(crate) async fn run<A: AgentClient, C: Clock>(orchestrator: Orchestrator<A, C>, mut rx: mpsc::Receiver<GatewayMessage>) {
    while let Some(message) = rx.recv().await {
        match message {
            GatewayMessage::Notification { method, params } => orchestrator.handle_notification(&method, params).await,
            GatewayMessage::ApprovalRequest { method, params, request_id } => {
                orchestrator.handle_approval_request(&method, params, request_id).await
            }
            GatewayMessage::Disconnected => orchestrator.handle_disconnect().await,
        }
    }
    tracing::warn!("agent notification channel closed; notification consumer exiting");
}

impl<A: AgentClient, C: Clock> Orchestrator<A, C> {
    pub(crate) async fn handle_notification(&self, method: &str, params: Value) {
        let thread_id = params.get("threadId").and_then(Value::as_str).map(ThreadId::from);
        let turn_id = params.get("turnId").and_then(Value::as_str).map(TurnId::from);

        if method == "turn/started" {
            self.handle_turn_started(thread_id, turn_id, params).await;
            return;
        }

        self.route_or_buffer(thread_id, turn_id, method, params).await;
    }

    async fn handle_turn_started(&self, thread_id: Option<ThreadId>, turn_id: Option<TurnId>, params: Value) {
        let (Some(thread_id), Some(turn_id)) = (thread_id, turn_id) else {
            tracing::warn!("turn/started notification missing threadId or turnId; dropping");
            return;
        };

        if let Ok(Some(job_id)) = self.storage_lookup(&thread_id, &turn_id).await {
            // Raced with the `sendUserMessage` ack already binding this
            // turn (spec §4.3.6); route normally, which is a no-op.
            dispatch_bound(self, job_id, "turn/started", params).await;
            return;
        }

        let job_id = match self.pending_binding_job_id(&thread_id) {
            Some(job_id) => job_id,
            None => {
                tracing::warn!(%thread_id, %turn_id, "turn/started for a thread with no pending job; dropping as orphan");
                return;
            }
        };

        self.bind_and_activate(thread_id, job_id, turn_id).await;
    }

    /// Route a notification to its job if the `(threadId, turnId)` pair
    /// already resolves; otherwise buffer it against the thread's pending
    /// binding (pruning anything that's aged out of the orphan window), or
    /// drop it as an orphan if there is no pending binding at all.
    async fn route_or_buffer(&self, thread_id: Option<ThreadId>, turn_id: Option<TurnId>, method: &str, params: Value) {
        if let (Some(thread_id), Some(turn_id)) = (&thread_id, &turn_id) {
            if let Ok(Some(job_id)) = self.storage_lookup(thread_id, turn_id).await {
                dispatch_bound(self, job_id, method, params).await;
                return;
            }
        }

        if let Some(thread_id) = &thread_id {
            if self.buffer_for_pending_binding(thread_id, method, params.clone()) {
                return;
            }
        }

        tracing::warn!(%method, "dropping unroutable agent notification as an orphan");
    }

    async fn storage_lookup(&self, thread_id: &ThreadId, turn_id: &TurnId) -> Result<Option<JobId>, ac_storage::StorageError> {
        self.inner.storage.lookup_job_by_turn(thread_id, turn_id).await
    }

    fn pending_binding_job_id(&self, thread_id: &ThreadId) -> Option<JobId> {
        self.inner.pending_bindings.lock().get(thread_id).map(|pb| pb.job_id)
    }

    fn buffer_for_pending_binding(&self, thread_id: &ThreadId, method: &str, params: Value) -> bool {
        let mut pending = self.inner.pending_bindings.lock();
        let Some(pending_binding) = pending.get_mut(thread_id) else { return false };

        let now = self.inner.clock.now();
        let window = self.inner.config.orphan_window;
        let before = pending_binding.buffered.len();
        pending_binding.buffered.retain(|b| now.duration_since(b.arrived_at) < window);
        let dropped = before - pending_binding.buffered.len();
        if dropped > 0 {
            tracing::warn!(%thread_id, dropped, "dropped orphaned notifications past the turn-binding window");
        }

        pending_binding.buffered.push(BufferedNotification { method: method.to_string(), params, arrived_at: now });
        true
    }

    pub(crate) async fn handle_approval_request(&self, method: &str, params: Value, request_id: ac_gateway::PendingApprovalId) {
        let thread_id = params.get("threadId").and_then(Value::as_str).map(ThreadId::from);
        let turn_id = params.get("turnId").and_then(Value::as_str).map(TurnId::from);

        let job_id = match (&thread_id, &turn_id) {
            (Some(t), Some(turn)) => self.storage_lookup(t, turn).await.ok().flatten(),
            _ => None,
        };

        let Some(job_id) = job_id else {
            tracing::error!(%method, "approval request for an unresolvable turn; auto-declining");
            let _ = self.inner.agent.resolve_approval(request_id, json!("decline")).await;
            return;
        };

        if self.inner.pending_approval.lock().contains_key(&job_id) {
            tracing::error!(%job_id, %method, "second approval request before the first resolved; auto-declining");
            let _ = self.inner.agent.resolve_approval(request_id, json!("decline")).await;
            return;
        }

        let kind = match method {
            "execCommandApproval" => ApprovalKind::CommandExecution,
            "applyPatchApproval" => ApprovalKind::ApplyPatch,
            other => ApprovalKind::Other(other.to_string()),
        };
        let details = params.get("details").cloned().unwrap_or_else(|| params.clone());
        let approval_id = params
            .get("approvalId")
            .and_then(Value::as_str)
            .map(ac_core::ApprovalId::from)
            .unwrap_or_else(|| ac_core::ApprovalId::from(format!("approval-{}", request_id.0)));

        let approval = Approval::new(
            approval_id.clone(),
            job_id,
            thread_id.clone().unwrap_or_else(|| ThreadId::from("")),
            kind.clone(),
            details.clone(),
        );
        self.inner.approvals.lock().insert(approval_id.clone(), approval);
        self.inner.pending_approval.lock().insert(job_id, approval_id.clone());
        self.inner.pending_requests.lock().insert(approval_id.clone(), request_id);

        tracing::info!(%job_id, %approval_id, %method, "approval required");

        if let Err(e) = self.append_and_publish(job_id, EventPayload::ApprovalRequired { approval_id, kind, details }, None).await {
            tracing::error!(error = %e, %job_id, "failed to append approval.required event");
        }
        if let Err(e) = self.transition_job(job_id, JobState::WaitingApproval, None).await {
            tracing::error!(error = %e, %job_id, "failed to transition job to WAITING_APPROVAL");
        }
    }

    pub(crate) async fn handle_disconnect(&self) {
        tracing::error!("agent subprocess disconnected; failing all active jobs");
        let job_ids: Vec<JobId> = self.inner.active_job.lock().values().copied().collect();
        for job_id in job_ids {
            if let Err(e) = self.transition_job(job_id, JobState::Failed, Some("agent subprocess disconnected".to_string())).await {
                tracing::error!(error = %e, %job_id, "failed to fail job after agent disconnect");
                self.force_fail_locally(job_id, "agent subprocess disconnected".to_string()).await;
            }
        }
    }

}

/// Apply one already-routed (job-bound) notification. Free function so
/// `bind_and_activate` in `lib.rs` can replay buffered notifications
/// through the same path newly-arriving ones take.
pub(crate) async fn dispatch_bound<A: AgentClient, C: Clock>(orchestrator: &Orchestrator<A, C>, job_id: JobId, method: &str, params: Value) {
    let result = match method {
        "turn/started" => orchestrator.activate_if_queued(job_id).await,
        "turn/completed" => handle_turn_completed(orchestrator, job_id, params).await,
        "item/started" => orchestrator.append_and_publish(job_id, EventPayload::ItemStarted(params), None).await.map(|_| ()),
        "item/completed" => orchestrator.append_and_publish(job_id, EventPayload::ItemCompleted(params), None).await.map(|_| ()),
        "item/agentMessage/delta" => handle_delta(orchestrator, job_id, params).await,
        "item/commandExecution/outputDelta" => {
            orchestrator.append_and_publish(job_id, EventPayload::ItemCommandExecutionOutputDelta(params), None).await.map(|_| ())
        }
        "item/fileChange/outputDelta" => {
            orchestrator.append_and_publish(job_id, EventPayload::ItemFileChangeOutputDelta(params), None).await.map(|_| ())
        }
        "error" => handle_scoped_error(orchestrator, job_id, params).await,
        other => {
            tracing::debug!(method = %other, "ignoring unrecognized agent notification method");
            Ok(())
        }
    };

    if let Err(e) = result {
        tracing::error!(error = %e, %job_id, %method, "failed to apply agent notification; forcing job to FAILED");
        orchestrator.force_fail_locally(job_id, format!("STORAGE_ERROR: {e}")).await;
    }
}

async fn handle_turn_completed<A: AgentClient, C: Clock>(orchestrator: &Orchestrator<A, C>, job_id: JobId, params: Value) -> Result<(), crate::OrchestratorError> {
    let status = params.get("status").and_then(Value::as_str).unwrap_or_default();
    let error_message = params.get("errorMessage").and_then(Value::as_str).map(str::to_string);
    let new_state = match status {
        "completed" => JobState::Done,
        "failed" => JobState::Failed,
        "interrupted" => JobState::Cancelled,
        other => {
            tracing::warn!(status = %other, "unrecognized turn/completed status; treating as failed");
            JobState::Failed
        }
    };
    orchestrator.transition_job(job_id, new_state, error_message).await
}

async fn handle_delta<A: AgentClient, C: Clock>(orchestrator: &Orchestrator<A, C>, job_id: JobId, params: Value) -> Result<(), crate::OrchestratorError> {
    let item_id = params.get("itemId").and_then(Value::as_str).unwrap_or_default().to_string();
    let delta = params.get("delta").and_then(Value::as_str).unwrap_or_default().to_string();
    orchestrator.append_and_publish(job_id, EventPayload::ItemAgentMessageDelta { item_id, delta }, None).await.map(|_| ())
}

async fn handle_scoped_error<A: AgentClient, C: Clock>(orchestrator: &Orchestrator<A, C>, job_id: JobId, params: Value) -> Result<(), crate::OrchestratorError> {
    let message = params.get("message").and_then(Value::as_str).unwrap_or("agent error").to_string();
    orchestrator.append_and_publish(job_id, EventPayload::Error { message: message.clone(), details: Some(params) }, None).await?;
    orchestrator.transition_job(job_id, JobState::Failed, Some(message)).await
}
