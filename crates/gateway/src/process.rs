// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Real subprocess-backed [`AgentClient`]: single owner of the upstream
//! agent's stdio, correlated request/response calls, and notification
//! demultiplexing (spec.md §4.2).
//!
//! Grounded on `oj-daemon/src/adapters/agent/coop/spawn.rs` (spawn, reaper
//! task logging exit status, bounded readiness handling) and
//! `oj-adapters/src/agent/coop/ws.rs`'s `event_bridge` (a background task
//! reading frames in a loop and forwarding onto an `mpsc::Sender`).

use crate::client::{AgentClient, GatewayMessage, PendingApprovalId};
use crate::error::GatewayError;
use crate::framing;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{mpsc, oneshot, Mutex as AsyncMutex};

/// Notification methods the Gateway forwards to the Orchestrator
/// (spec §4.2). Anything else is logged and dropped.
const SUPPORTED_NOTIFICATIONS: &[&str] = &[
    "thread/started",
    "turn/started",
    "turn/completed",
    "item/started",
    "item/completed",
    "item/agentMessage/delta",
    "item/commandExecution/outputDelta",
    "item/fileChange/outputDelta",
    "error",
];

/// Static configuration for spawning the agent subprocess (spec §6's env
/// overrides: `command`/`args`/`cwd`).
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub command: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Bounded restart attempts, to avoid a restart storm (spec §4.2).
    pub max_restart_attempts: u32,
    pub restart_backoff_base: Duration,
    /// Bound on the notification channel (spec §4.2: "a small bounded
    /// queue"). A stalled consumer beyond this bound is a fatal bug.
    pub notification_queue: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            command: String::new(),
            args: Vec::new(),
            cwd: None,
            max_restart_attempts: 5,
            restart_backoff_base: Duration::from_millis(500),
            notification_queue: 64,
        }
    }
}

struct Shared {
    stdin: AsyncMutex<Option<ChildStdin>>,
    pending: parking_lot::Mutex<HashMap<u64, oneshot::Sender<Result<Value, GatewayError>>>>,
    next_id: AtomicU64,
    notif_tx: mpsc::Sender<GatewayMessage>,
    alive: AtomicBool,
}

impl Shared {
    fn fail_all_pending(&self) {
        let mut pending = self.pending.lock();
        for (_, tx) in pending.drain() {
            let _ = tx.send(Err(GatewayError::AgentDisconnected));
        }
    }
}

/// The real `AgentClient`: spawns and supervises the upstream agent
/// subprocess for the lifetime of the gateway.
pub struct ProcessAgentClient {
    shared: Arc<Shared>,
    notif_rx: parking_lot::Mutex<Option<mpsc::Receiver<GatewayMessage>>>,
}

impl ProcessAgentClient {
    /// Spawn the agent subprocess and start its supervisor task. The
    /// supervisor restarts the process on unexpected exit with exponential
    /// backoff, bounded by `config.max_restart_attempts`.
    pub fn spawn(config: GatewayConfig) -> Self {
        let (notif_tx, notif_rx) = mpsc::channel(config.notification_queue);
        let shared = Arc::new(Shared {
            stdin: AsyncMutex::new(None),
            pending: parking_lot::Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            notif_tx,
            alive: AtomicBool::new(false),
        });

        tokio::spawn(supervise(shared.clone(), config));

        Self { shared, notif_rx: parking_lot::Mutex::new(Some(notif_rx)) }
    }
}

#[async_trait]
impl AgentClient for ProcessAgentClient {
    async fn call(&self, method: &str, params: Value, timeout: Duration) -> Result<Value, GatewayError> {
        if !self.shared.alive.load(Ordering::SeqCst) {
            return Err(GatewayError::AgentUnavailable);
        }

        let id = self.shared.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.shared.pending.lock().insert(id, tx);

        let frame = json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params});
        {
            let mut guard = self.shared.stdin.lock().await;
            match guard.as_mut() {
                Some(stdin) => {
                    if let Err(e) = framing::write_frame(stdin, &frame).await {
                        self.shared.pending.lock().remove(&id);
                        return Err(GatewayError::Io(e));
                    }
                }
                None => {
                    self.shared.pending.lock().remove(&id);
                    return Err(GatewayError::AgentUnavailable);
                }
            }
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(GatewayError::AgentDisconnected),
            Err(_) => {
                self.shared.pending.lock().remove(&id);
                Err(GatewayError::RpcTimeout { method: method.to_string(), timeout_ms: timeout.as_millis() as u64 })
            }
        }
    }

    async fn resolve_approval(&self, request_id: PendingApprovalId, reply: Value) -> Result<(), GatewayError> {
        let frame = json!({"jsonrpc": "2.0", "id": request_id.0, "result": reply});
        let mut guard = self.shared.stdin.lock().await;
        match guard.as_mut() {
            Some(stdin) => framing::write_frame(stdin, &frame).await.map_err(GatewayError::Io),
            None => Err(GatewayError::AgentUnavailable),
        }
    }

    fn take_notifications(&self) -> Option<mpsc::Receiver<GatewayMessage>> {
        self.notif_rx.lock().take()
    }
}

async fn supervise(shared: Arc<Shared>, config: GatewayConfig) {
    let mut attempt = 0u32;
    loop {
        match spawn_once(&shared, &config).await {
            Ok(status) => tracing::warn!(%status, "agent subprocess exited"),
            Err(e) => tracing::error!(error = %e, "failed to spawn agent subprocess"),
        }

        shared.alive.store(false, Ordering::SeqCst);
        shared.fail_all_pending();
        if shared.notif_tx.send(GatewayMessage::Disconnected).await.is_err() {
            tracing::warn!("no orchestrator listening for disconnect notification");
        }

        attempt += 1;
        if attempt > config.max_restart_attempts {
            tracing::error!(attempt, "exceeded max restart attempts; giving up on agent subprocess");
            return;
        }
        let backoff = config.restart_backoff_base * 2u32.pow(attempt.min(6));
        tracing::info!(?backoff, attempt, "restarting agent subprocess after backoff");
        tokio::time::sleep(backoff).await;
    }
}

async fn spawn_once(shared: &Arc<Shared>, config: &GatewayConfig) -> std::io::Result<std::process::ExitStatus> {
    let mut cmd = Command::new(&config.command);
    cmd.args(&config.args);
    if let Some(cwd) = &config.cwd {
        cmd.current_dir(cwd);
    }
    cmd.stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped());

    let mut child: Child = cmd.spawn()?;
    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| std::io::Error::other("agent subprocess stdin not piped"))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| std::io::Error::other("agent subprocess stdout not piped"))?;
    let stderr = child.stderr.take();

    *shared.stdin.lock().await = Some(stdin);
    shared.alive.store(true, Ordering::SeqCst);
    tracing::info!(command = %config.command, ?config.args, "agent subprocess spawned");

    if let Some(stderr) = stderr {
        tokio::spawn(log_stderr(stderr));
    }

    let reader_shared = shared.clone();
    let reader_task = tokio::spawn(read_loop(reader_shared, stdout));

    let status = child.wait().await?;
    reader_task.abort();
    Ok(status)
}

async fn log_stderr(stderr: tokio::process::ChildStderr) {
    use tokio::io::AsyncBufReadExt;
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        tracing::warn!(agent_stderr = %line, "agent subprocess stderr");
    }
}

async fn read_loop(shared: Arc<Shared>, stdout: ChildStdout) {
    let mut reader = BufReader::new(stdout);
    loop {
        match framing::read_frame(&mut reader).await {
            Ok(Some(value)) => handle_frame(&shared, value).await,
            Ok(None) => {
                tracing::info!("agent stdout closed");
                break;
            }
            Err(e) => {
                tracing::error!(error = %e, "error reading frame from agent");
                break;
            }
        }
    }
}

async fn handle_frame(shared: &Arc<Shared>, value: Value) {
    let has_id = value.get("id").is_some();
    let has_method = value.get("method").is_some();

    if has_id && !has_method {
        let Some(id) = value.get("id").and_then(Value::as_u64) else { return };
        let Some(tx) = shared.pending.lock().remove(&id) else { return };
        if let Some(err) = value.get("error") {
            let code = err.get("code").and_then(Value::as_i64).unwrap_or(0);
            let message = err.get("message").and_then(Value::as_str).unwrap_or_default().to_string();
            let _ = tx.send(Err(GatewayError::RpcError { code, message }));
        } else {
            let result = value.get("result").cloned().unwrap_or(Value::Null);
            let _ = tx.send(Ok(result));
        }
        return;
    }

    if !has_method {
        return;
    }
    let method = value.get("method").and_then(Value::as_str).unwrap_or_default().to_string();
    let params = value.get("params").cloned().unwrap_or(Value::Null);

    let message = if has_id {
        let id = value.get("id").and_then(Value::as_u64).unwrap_or(0);
        GatewayMessage::ApprovalRequest { method: method.clone(), params, request_id: PendingApprovalId(id) }
    } else if SUPPORTED_NOTIFICATIONS.contains(&method.as_str()) {
        GatewayMessage::Notification { method: method.clone(), params }
    } else {
        tracing::debug!(%method, "dropping unsupported notification method");
        return;
    };

    match shared.notif_tx.try_send(message) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(_)) => {
            tracing::error!(
                %method,
                "orchestrator stalled draining gateway notifications past the bounded queue; this is a fatal bug"
            );
            std::process::exit(1);
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            tracing::warn!(%method, "notification channel closed; no orchestrator listening");
        }
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
