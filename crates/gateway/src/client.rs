// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `AgentClient` trait: the Orchestrator's entire view of the upstream
//! agent subprocess (spec.md §4.2). Grounded on `oj-daemon`'s
//! `AgentAdapter` trait — one small async trait per external collaborator,
//! with a fake implementation behind `test-support` so the orchestration
//! state machine can be tested without a real subprocess.

use crate::error::GatewayError;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc;

/// Correlates a reply to a server-initiated approval request. Wraps the
/// JSON-RPC numeric id the agent used when it issued the request — not
/// minted by us, just round-tripped back in the reply frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PendingApprovalId(pub u64);

/// One demultiplexed frame from the agent's notification stream
/// (spec.md §4.2's `notifications()`).
#[derive(Debug, Clone)]
pub enum GatewayMessage {
    /// A one-way notification (`thread/started`, `turn/completed`, ...).
    Notification { method: String, params: Value },
    /// A server-initiated RPC request the Orchestrator must eventually
    /// answer via [`AgentClient::resolve_approval`] (`applyPatchApproval`,
    /// `execCommandApproval`).
    ApprovalRequest { method: String, params: Value, request_id: PendingApprovalId },
    /// The subprocess exited or its connection was otherwise lost. Every
    /// in-flight job must be driven to `FAILED` (spec §4.2's restart
    /// behavior).
    Disconnected,
}

/// The Orchestrator's sole view of the upstream agent subprocess.
#[async_trait]
pub trait AgentClient: Send + Sync + 'static {
    /// Issue a correlated JSON-RPC request and await its response
    /// (spec §4.2's `call`). Generic over method name: the Orchestrator
    /// calls `initialize`, `newThread`, `sendUserMessage`, `interruptTurn`,
    /// and `readThread` through this single entry point.
    async fn call(&self, method: &str, params: Value, timeout: Duration) -> Result<Value, GatewayError>;

    /// Answer a server-initiated approval request previously delivered via
    /// [`GatewayMessage::ApprovalRequest`] (spec §4.2, §4.3.1's
    /// `resolveApproval`).
    async fn resolve_approval(&self, request_id: PendingApprovalId, reply: Value) -> Result<(), GatewayError>;

    /// Take ownership of the notification stream. Single consumer; callers
    /// must drain promptly (spec §4.2: a stalled consumer is treated as a
    /// fatal orchestrator bug). Returns `None` if already taken.
    fn take_notifications(&self) -> Option<mpsc::Receiver<GatewayMessage>>;
}
