// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ac job` - job inspection, approval, and cancellation (spec.md §4.3.1,
//! §6). `follow` is grounded on `oj-cli`'s `poll_log_follow` (tail a
//! stream until the server closes it or the user interrupts), adapted
//! from a line-oriented polling loop to parsing the daemon's SSE frames
//! directly off the response body.

use ac_core::ApprovalDecisionKind;
use clap::{Args, Subcommand};
use futures_util::StreamExt;

use crate::client::{AgentCoreClient, ApproveBody};
use crate::exit_error::ExitError;
use crate::output::{format_or_json, handle_list, OutputFormat};

#[derive(Args)]
pub struct JobArgs {
    #[command(subcommand)]
    pub command: JobCommand,
}

#[derive(Subcommand)]
pub enum JobCommand {
    /// Show a job's current snapshot
    Show {
        /// Job id
        id: String,
    },
    /// List a job's events (non-streaming bootstrap page, spec §4.3.1)
    Events {
        /// Job id
        id: String,
        /// Resume cursor (-1 for the start)
        #[arg(long, default_value_t = -1)]
        cursor: i64,
        /// Stream live events via SSE instead of returning one page
        #[arg(long)]
        follow: bool,
    },
    /// Resolve a pending approval (spec §4.3.4)
    Approve {
        /// Job id
        job_id: String,
        /// Approval id
        approval_id: String,
        /// Decision: accept, accept_for_session, decline, cancel,
        /// accept_with_execpolicy_amendment
        #[arg(long, default_value = "accept")]
        decision: String,
        /// Exec-policy amendment tokens, required when decision is
        /// accept_with_execpolicy_amendment
        #[arg(long = "amend-token")]
        amend_tokens: Vec<String>,
    },
    /// Cancel a running job (spec §4.3.1, §5's grace window)
    Cancel {
        /// Job id
        id: String,
    },
}

impl JobCommand {
    pub async fn run(self, client: &AgentCoreClient, format: OutputFormat) -> Result<(), ExitError> {
        match self {
            Self::Show { id } => {
                let snapshot = client.job_snapshot(&id).await.map_err(|e| ExitError::new(e.exit_code(), e.to_string()))?;
                format_or_json(format, &snapshot, |s| {
                    println!("{}", s.job_id);
                    println!("  thread: {}", s.thread_id);
                    println!("  state: {}", s.state);
                    if let Some(turn_id) = &s.turn_id {
                        println!("  turn: {turn_id}");
                    }
                    if let Some(message) = &s.error_message {
                        println!("  error: {message}");
                    }
                })
                .map_err(|e| ExitError::new(1, e.to_string()))
            }
            Self::Events { id, cursor, follow } => {
                if follow {
                    return follow_events(client, &id, cursor).await;
                }
                let page = client.job_events(&id, cursor).await.map_err(|e| ExitError::new(e.exit_code(), e.to_string()))?;
                handle_list(format, &page.data, "no events", |e| println!("{}  {}", e.seq, e.type_tag())).map_err(|e| ExitError::new(1, e.to_string()))?;
                if format == OutputFormat::Text {
                    println!("-- nextCursor={} hasMore={}", page.next_cursor, page.has_more);
                }
                Ok(())
            }
            Self::Approve { job_id, approval_id, decision, amend_tokens } => {
                let decision = parse_decision(&decision)?;
                client
                    .approve_job(&job_id, ApproveBody { approval_id, decision, exec_policy_amendment: amend_tokens })
                    .await
                    .map_err(|e| ExitError::new(e.exit_code(), e.to_string()))?;
                println!("approval resolved");
                Ok(())
            }
            Self::Cancel { id } => {
                client.cancel_job(&id).await.map_err(|e| ExitError::new(e.exit_code(), e.to_string()))?;
                println!("cancellation requested");
                Ok(())
            }
        }
    }
}

fn parse_decision(raw: &str) -> Result<ApprovalDecisionKind, ExitError> {
    match raw {
        "accept" => Ok(ApprovalDecisionKind::Accept),
        "accept_for_session" => Ok(ApprovalDecisionKind::AcceptForSession),
        "decline" => Ok(ApprovalDecisionKind::Decline),
        "cancel" => Ok(ApprovalDecisionKind::Cancel),
        "accept_with_execpolicy_amendment" => Ok(ApprovalDecisionKind::AcceptWithExecpolicyAmendment),
        other => Err(ExitError::new(1, format!("unrecognized decision {other:?}"))),
    }
}

/// Drain the job's SSE tail, printing one line per `data:` frame, until the
/// server closes the stream (job reached a terminal state or evicted us as
/// a slow consumer — either way there is nothing left to print).
async fn follow_events(client: &AgentCoreClient, job_id: &str, cursor: i64) -> Result<(), ExitError> {
    let response = client.job_events_stream(job_id, cursor).await.map_err(|e| ExitError::new(e.exit_code(), e.to_string()))?;
    let mut stream = response.bytes_stream();
    let mut buffer = String::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| ExitError::new(1, format!("stream read failed: {e}")))?;
        buffer.push_str(&String::from_utf8_lossy(&chunk));

        while let Some(pos) = buffer.find("\n\n") {
            let frame = buffer[..pos].to_string();
            buffer.drain(..pos + 2);
            for line in frame.lines() {
                if let Some(data) = line.strip_prefix("data: ") {
                    println!("{data}");
                }
            }
        }
    }
    Ok(())
}
