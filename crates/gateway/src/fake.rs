// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory [`AgentClient`] for `ac-orchestrator`'s state-machine test
//! suite. Grounded on `oj-adapters`' `test-support`-gated `FakeAdapter`:
//! a scriptable double recording every call it receives and letting the
//! test drive notifications by hand.

use crate::client::{AgentClient, GatewayMessage, PendingApprovalId};
use crate::error::GatewayError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::mpsc;

/// One recorded `call()` invocation, for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: String,
    pub params: Value,
}

/// One recorded `resolve_approval()` invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedResolution {
    pub request_id: PendingApprovalId,
    pub reply: Value,
}

/// A scriptable [`AgentClient`] double. Queue canned responses per method
/// with [`FakeAgentClient::push_response`]; unscripted methods return a
/// default `{}` success so tests only need to script the calls they care
/// about. Push synthetic agent notifications with
/// [`FakeAgentClient::push_notification`] and read them back through the
/// real `notifications()` channel, exactly as the Orchestrator would.
pub struct FakeAgentClient {
    responses: parking_lot::Mutex<std::collections::HashMap<String, VecDeque<Result<Value, GatewayError>>>>,
    calls: parking_lot::Mutex<Vec<RecordedCall>>,
    resolutions: parking_lot::Mutex<Vec<RecordedResolution>>,
    notif_tx: mpsc::Sender<GatewayMessage>,
    notif_rx: parking_lot::Mutex<Option<mpsc::Receiver<GatewayMessage>>>,
}

impl FakeAgentClient {
    pub fn new() -> Self {
        let (notif_tx, notif_rx) = mpsc::channel(256);
        Self {
            responses: parking_lot::Mutex::new(std::collections::HashMap::new()),
            calls: parking_lot::Mutex::new(Vec::new()),
            resolutions: parking_lot::Mutex::new(Vec::new()),
            notif_tx,
            notif_rx: parking_lot::Mutex::new(Some(notif_rx)),
        }
    }

    /// Queue the next response `method` will return, in FIFO order.
    pub fn push_response(&self, method: &str, response: Result<Value, GatewayError>) {
        self.responses.lock().entry(method.to_string()).or_default().push_back(response);
    }

    /// Push a synthetic notification into the consumer's queue.
    pub async fn push_notification(&self, method: &str, params: Value) {
        let _ = self.notif_tx.send(GatewayMessage::Notification { method: method.to_string(), params }).await;
    }

    /// Push a synthetic server-initiated approval request.
    pub async fn push_approval_request(&self, method: &str, params: Value, request_id: PendingApprovalId) {
        let _ = self.notif_tx.send(GatewayMessage::ApprovalRequest { method: method.to_string(), params, request_id }).await;
    }

    /// Push a synthetic disconnect.
    pub async fn push_disconnect(&self) {
        let _ = self.notif_tx.send(GatewayMessage::Disconnected).await;
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn resolutions(&self) -> Vec<RecordedResolution> {
        self.resolutions.lock().clone()
    }
}

impl Default for FakeAgentClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentClient for FakeAgentClient {
    async fn call(&self, method: &str, params: Value, _timeout: Duration) -> Result<Value, GatewayError> {
        self.calls.lock().push(RecordedCall { method: method.to_string(), params });
        let scripted = self.responses.lock().get_mut(method).and_then(VecDeque::pop_front);
        scripted.unwrap_or(Ok(Value::Object(Default::default())))
    }

    async fn resolve_approval(&self, request_id: PendingApprovalId, reply: Value) -> Result<(), GatewayError> {
        self.resolutions.lock().push(RecordedResolution { request_id, reply });
        Ok(())
    }

    fn take_notifications(&self) -> Option<mpsc::Receiver<GatewayMessage>> {
        self.notif_rx.lock().take()
    }
}

/// Lets callers hold on to a `FakeAgentClient` handle for scripting
/// responses and pushing notifications *after* handing ownership of the
/// same client to an `Orchestrator` (which takes `A` by value, not by
/// reference) — e.g. the workspace-level HTTP integration suite, which
/// needs to keep driving the fake agent once the router owns it.
#[async_trait]
impl AgentClient for std::sync::Arc<FakeAgentClient> {
    async fn call(&self, method: &str, params: Value, timeout: Duration) -> Result<Value, GatewayError> {
        (**self).call(method, params, timeout).await
    }

    async fn resolve_approval(&self, request_id: PendingApprovalId, reply: Value) -> Result<(), GatewayError> {
        (**self).resolve_approval(request_id, reply).await
    }

    fn take_notifications(&self) -> Option<mpsc::Receiver<GatewayMessage>> {
        (**self).take_notifications()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unscripted_call_returns_default_success() {
        let client = FakeAgentClient::new();
        let result = client.call("newThread", Value::Null, Duration::from_secs(1)).await.unwrap();
        assert_eq!(result, Value::Object(Default::default()));
        assert_eq!(client.calls().len(), 1);
    }

    #[tokio::test]
    async fn scripted_call_returns_in_fifo_order() {
        let client = FakeAgentClient::new();
        client.push_response("call", Ok(serde_json::json!(1)));
        client.push_response("call", Ok(serde_json::json!(2)));

        assert_eq!(client.call("call", Value::Null, Duration::from_secs(1)).await.unwrap(), serde_json::json!(1));
        assert_eq!(client.call("call", Value::Null, Duration::from_secs(1)).await.unwrap(), serde_json::json!(2));
    }

    #[tokio::test]
    async fn pushed_notification_is_observable_through_the_channel() {
        let client = FakeAgentClient::new();
        let mut rx = client.take_notifications().unwrap();
        client.push_notification("turn/started", serde_json::json!({"turnId": "t1"})).await;

        let msg = rx.recv().await.unwrap();
        assert!(matches!(msg, GatewayMessage::Notification { method, .. } if method == "turn/started"));
    }

    #[tokio::test]
    async fn resolve_approval_is_recorded() {
        let client = FakeAgentClient::new();
        client.resolve_approval(PendingApprovalId(7), serde_json::json!("accept")).await.unwrap();
        assert_eq!(client.resolutions().len(), 1);
        assert_eq!(client.resolutions()[0].request_id, PendingApprovalId(7));
    }
}
