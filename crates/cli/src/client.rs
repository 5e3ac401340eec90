// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin `reqwest` client for the `ac-http` REST surface (spec.md §6).
//!
//! Grounded on `oj-cli`'s `DaemonClient` (one client struct wrapping a
//! transport handle, with `send`/`reject` helpers centralizing error
//! translation) — adapted here from a length-prefixed IPC socket to a
//! plain HTTP client, since `ac-http` talks REST, not a bespoke daemon
//! protocol.

use ac_core::{ApprovalDecisionKind, Event, JobSnapshot, Thread};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request to {url} failed: {source}")]
    Transport { url: String, #[source] source: reqwest::Error },

    #[error("{message}")]
    Api { status: u16, code: String, message: String },

    #[error("failed to decode response body from {url}: {source}")]
    Decode { url: String, #[source] source: reqwest::Error },
}

impl ClientError {
    /// Mirrors `oj`'s exit-code convention of mapping a stable error
    /// code/class to a non-zero process exit status.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Api { status, .. } => {
                if *status == 404 {
                    2
                } else if *status == 409 {
                    3
                } else {
                    1
                }
            }
            _ => 1,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    message: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct EventsPage<T> {
    pub data: Vec<T>,
    #[serde(rename = "nextCursor")]
    pub next_cursor: i64,
    #[serde(rename = "hasMore")]
    pub has_more: bool,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct HealthBody {
    pub status: String,
    #[serde(rename = "authEnabled")]
    pub auth_enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct CreateThreadBody {
    #[serde(rename = "projectPath")]
    pub project_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "approvalPolicy")]
    pub approval_policy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sandbox: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartTurnBody {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "approvalPolicy")]
    pub approval_policy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sandbox: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct StartTurnResponse {
    #[serde(rename = "jobId")]
    pub job_id: String,
}

#[derive(Debug, Serialize)]
pub struct ApproveBody {
    #[serde(rename = "approvalId")]
    pub approval_id: String,
    pub decision: ApprovalDecisionKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty", rename = "execPolicyAmendment")]
    pub exec_policy_amendment: Vec<String>,
}

/// Talks to one `ac-http` instance over a bearer-token-protected HTTP API.
pub struct AgentCoreClient {
    base_url: String,
    token: Option<String>,
    http: reqwest::Client,
}

impl AgentCoreClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        let http = reqwest::Client::builder().timeout(Duration::from_secs(30)).build().unwrap_or_default();
        Self { base_url: base_url.into(), token, http }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn decode<T: for<'de> Deserialize<'de>>(&self, url: &str, response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let body: ErrorBody = response
                .json()
                .await
                .unwrap_or_else(|_| ErrorBody { error: "UNKNOWN".to_string(), message: format!("HTTP {status}") });
            return Err(ClientError::Api { status: status.as_u16(), code: body.error, message: body.message });
        }
        response.json().await.map_err(|source| ClientError::Decode { url: url.to_string(), source })
    }

    pub async fn health(&self) -> Result<HealthBody, ClientError> {
        let url = self.url("/health");
        let response = self.http.get(&url).send().await.map_err(|source| ClientError::Transport { url: url.clone(), source })?;
        self.decode(&url, response).await
    }

    pub async fn create_thread(&self, body: CreateThreadBody) -> Result<Thread, ClientError> {
        let url = self.url("/v1/threads");
        let response =
            self.authed(self.http.post(&url)).json(&body).send().await.map_err(|source| ClientError::Transport { url: url.clone(), source })?;
        self.decode(&url, response).await
    }

    pub async fn list_threads(&self) -> Result<Vec<Thread>, ClientError> {
        let url = self.url("/v1/threads");
        let response = self.authed(self.http.get(&url)).send().await.map_err(|source| ClientError::Transport { url: url.clone(), source })?;
        self.decode(&url, response).await
    }

    pub async fn get_thread(&self, thread_id: &str) -> Result<Thread, ClientError> {
        let url = self.url(&format!("/v1/threads/{thread_id}"));
        let response = self.authed(self.http.get(&url)).send().await.map_err(|source| ClientError::Transport { url: url.clone(), source })?;
        self.decode(&url, response).await
    }

    pub async fn activate_thread(&self, thread_id: &str) -> Result<Thread, ClientError> {
        let url = self.url(&format!("/v1/threads/{thread_id}/activate"));
        let response = self.authed(self.http.post(&url)).send().await.map_err(|source| ClientError::Transport { url: url.clone(), source })?;
        self.decode(&url, response).await
    }

    pub async fn archive_thread(&self, thread_id: &str) -> Result<Thread, ClientError> {
        let url = self.url(&format!("/v1/threads/{thread_id}/archive"));
        let response = self.authed(self.http.post(&url)).send().await.map_err(|source| ClientError::Transport { url: url.clone(), source })?;
        self.decode(&url, response).await
    }

    pub async fn start_turn(&self, thread_id: &str, body: StartTurnBody) -> Result<StartTurnResponse, ClientError> {
        let url = self.url(&format!("/v1/threads/{thread_id}/turns"));
        let response =
            self.authed(self.http.post(&url)).json(&body).send().await.map_err(|source| ClientError::Transport { url: url.clone(), source })?;
        self.decode(&url, response).await
    }

    pub async fn thread_events(&self, thread_id: &str, cursor: i64, limit: i64) -> Result<EventsPage<Event>, ClientError> {
        let url = self.url(&format!("/v1/threads/{thread_id}/events?cursor={cursor}&limit={limit}"));
        let response = self.authed(self.http.get(&url)).send().await.map_err(|source| ClientError::Transport { url: url.clone(), source })?;
        self.decode(&url, response).await
    }

    pub async fn job_snapshot(&self, job_id: &str) -> Result<JobSnapshot, ClientError> {
        let url = self.url(&format!("/v1/jobs/{job_id}"));
        let response = self.authed(self.http.get(&url)).send().await.map_err(|source| ClientError::Transport { url: url.clone(), source })?;
        self.decode(&url, response).await
    }

    pub async fn job_events(&self, job_id: &str, cursor: i64) -> Result<EventsPage<Event>, ClientError> {
        let url = self.url(&format!("/v1/jobs/{job_id}/events?cursor={cursor}"));
        let response = self
            .authed(self.http.get(&url))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|source| ClientError::Transport { url: url.clone(), source })?;
        self.decode(&url, response).await
    }

    /// Opens the raw SSE tail as a byte stream; `commands::job::follow`
    /// parses `data:` frames out of it itself rather than pulling in a
    /// dedicated SSE client crate for one read-only CLI command.
    pub async fn job_events_stream(&self, job_id: &str, cursor: i64) -> Result<reqwest::Response, ClientError> {
        let url = self.url(&format!("/v1/jobs/{job_id}/events?cursor={cursor}"));
        let response = self
            .authed(self.http.get(&url))
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|source| ClientError::Transport { url: url.clone(), source })?;
        if !response.status().is_success() {
            let status = response.status();
            let body: ErrorBody = response
                .json()
                .await
                .unwrap_or_else(|_| ErrorBody { error: "UNKNOWN".to_string(), message: format!("HTTP {status}") });
            return Err(ClientError::Api { status: status.as_u16(), code: body.error, message: body.message });
        }
        Ok(response)
    }

    pub async fn approve_job(&self, job_id: &str, body: ApproveBody) -> Result<(), ClientError> {
        let url = self.url(&format!("/v1/jobs/{job_id}/approve"));
        let response =
            self.authed(self.http.post(&url)).json(&body).send().await.map_err(|source| ClientError::Transport { url: url.clone(), source })?;
        if !response.status().is_success() {
            let status = response.status();
            let body: ErrorBody = response
                .json()
                .await
                .unwrap_or_else(|_| ErrorBody { error: "UNKNOWN".to_string(), message: format!("HTTP {status}") });
            return Err(ClientError::Api { status: status.as_u16(), code: body.error, message: body.message });
        }
        Ok(())
    }

    pub async fn cancel_job(&self, job_id: &str) -> Result<(), ClientError> {
        let url = self.url(&format!("/v1/jobs/{job_id}/cancel"));
        let response = self.authed(self.http.post(&url)).send().await.map_err(|source| ClientError::Transport { url: url.clone(), source })?;
        if !response.status().is_success() {
            let status = response.status();
            let body: ErrorBody = response
                .json()
                .await
                .unwrap_or_else(|_| ErrorBody { error: "UNKNOWN".to_string(), message: format!("HTTP {status}") });
            return Err(ClientError::Api { status: status.as_u16(), code: body.error, message: body.message });
        }
        Ok(())
    }
}
