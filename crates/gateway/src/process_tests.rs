// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::client::GatewayMessage;
use std::time::Duration;

fn sh_config(script: &str) -> GatewayConfig {
    GatewayConfig {
        command: "/bin/sh".into(),
        args: vec!["-c".into(), script.into()],
        cwd: None,
        max_restart_attempts: 0,
        restart_backoff_base: Duration::from_millis(10),
        notification_queue: 16,
    }
}

#[tokio::test]
async fn call_receives_correlated_response() {
    // Reads one line (our request) and always replies to id 1 with a fixed result.
    let script = r#"read -r line; printf '{"jsonrpc":"2.0","id":1,"result":{"ok":true}}\n'"#;
    let client = ProcessAgentClient::spawn(sh_config(script));

    let result = client
        .call("ping", serde_json::json!({}), Duration::from_secs(5))
        .await
        .expect("call should succeed");
    assert_eq!(result, serde_json::json!({"ok": true}));
}

#[tokio::test]
async fn call_surfaces_rpc_error_responses() {
    let script = r#"read -r line; printf '{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"boom"}}\n'"#;
    let client = ProcessAgentClient::spawn(sh_config(script));

    let err = client.call("ping", serde_json::json!({}), Duration::from_secs(5)).await.unwrap_err();
    match err {
        GatewayError::RpcError { code, message } => {
            assert_eq!(code, -32000);
            assert_eq!(message, "boom");
        }
        other => panic!("expected RpcError, got {other:?}"),
    }
}

#[tokio::test]
async fn call_times_out_when_agent_never_replies() {
    let client = ProcessAgentClient::spawn(sh_config("sleep 5"));

    let err = client.call("ping", serde_json::json!({}), Duration::from_millis(50)).await.unwrap_err();
    assert!(matches!(err, GatewayError::RpcTimeout { .. }));
}

#[tokio::test]
async fn disconnect_is_reported_on_unexpected_exit() {
    let client = ProcessAgentClient::spawn(sh_config("exit 1"));
    let mut notifications = client.take_notifications().expect("notifications available once");

    let msg = tokio::time::timeout(Duration::from_secs(2), notifications.recv())
        .await
        .expect("should receive a message before timeout")
        .expect("channel should not be closed");
    assert!(matches!(msg, GatewayMessage::Disconnected));
}

#[tokio::test]
async fn take_notifications_returns_none_second_time() {
    let client = ProcessAgentClient::spawn(sh_config("sleep 5"));
    assert!(client.take_notifications().is_some());
    assert!(client.take_notifications().is_none());
}
