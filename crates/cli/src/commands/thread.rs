// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ac thread` - thread management commands (spec.md §4.3.1, §6).

use ac_core::Thread;
use clap::{Args, Subcommand};
use serde_json::Value;

use crate::client::{AgentCoreClient, CreateThreadBody, StartTurnBody};
use crate::exit_error::ExitError;
use crate::output::{format_or_json, handle_list, OutputFormat};

#[derive(Args)]
pub struct ThreadArgs {
    #[command(subcommand)]
    pub command: ThreadCommand,
}

#[derive(Subcommand)]
pub enum ThreadCommand {
    /// Create a new thread against the running agent
    Create {
        /// Filesystem path the agent operates on
        project_path: String,
        /// Approval policy: untrusted, on-failure, on-request, never
        #[arg(long)]
        approval_policy: Option<String>,
        /// Sandbox mode: read-only, workspace-write, danger-full-access
        #[arg(long)]
        sandbox: Option<String>,
        /// Model override
        #[arg(long)]
        model: Option<String>,
    },
    /// List known threads
    List,
    /// Show one thread
    Show {
        /// Thread id
        id: String,
    },
    /// Mark a thread active (un-archive it)
    Activate {
        /// Thread id
        id: String,
    },
    /// Archive a thread
    Archive {
        /// Thread id
        id: String,
    },
    /// Start a turn on a thread (`POST /v1/threads/{id}/turns`)
    Turn {
        /// Thread id
        id: String,
        /// User message text
        text: String,
        /// Raw JSON input payload, forwarded verbatim to the agent
        #[arg(long)]
        input: Option<String>,
        /// Approval policy override for this turn
        #[arg(long)]
        approval_policy: Option<String>,
        /// Sandbox mode override for this turn
        #[arg(long)]
        sandbox: Option<String>,
        /// Model override for this turn
        #[arg(long)]
        model: Option<String>,
    },
    /// Replay a thread's synthesized history (spec.md §4.3.5)
    Events {
        /// Thread id
        id: String,
        /// Resume cursor (-1 for the start)
        #[arg(long, default_value_t = -1)]
        cursor: i64,
        /// Page size
        #[arg(long, default_value_t = 200)]
        limit: i64,
    },
}

impl ThreadCommand {
    pub async fn run(self, client: &AgentCoreClient, format: OutputFormat) -> Result<(), ExitError> {
        match self {
            Self::Create { project_path, approval_policy, sandbox, model } => {
                let thread = client
                    .create_thread(CreateThreadBody { project_path, approval_policy, sandbox, model })
                    .await
                    .map_err(|e| ExitError::new(e.exit_code(), e.to_string()))?;
                print_thread(format, &thread)
            }
            Self::List => {
                let threads = client.list_threads().await.map_err(|e| ExitError::new(e.exit_code(), e.to_string()))?;
                handle_list(format, &threads, "no threads", |t: &Thread| {
                    println!("{}  {}  archived={}  {}", t.thread_id, t.approval_policy, t.archived, t.project_path);
                })
                .map_err(|e| ExitError::new(1, e.to_string()))
            }
            Self::Show { id } => {
                let thread = client.get_thread(&id).await.map_err(|e| ExitError::new(e.exit_code(), e.to_string()))?;
                print_thread(format, &thread)
            }
            Self::Activate { id } => {
                let thread = client.activate_thread(&id).await.map_err(|e| ExitError::new(e.exit_code(), e.to_string()))?;
                print_thread(format, &thread)
            }
            Self::Archive { id } => {
                let thread = client.archive_thread(&id).await.map_err(|e| ExitError::new(e.exit_code(), e.to_string()))?;
                print_thread(format, &thread)
            }
            Self::Turn { id, text, input, approval_policy, sandbox, model } => {
                let input = input.map(|raw| serde_json::from_str::<Value>(&raw)).transpose().map_err(|e| ExitError::new(1, format!("--input is not valid JSON: {e}")))?;
                let response = client
                    .start_turn(&id, StartTurnBody { text, input, approval_policy, sandbox, model })
                    .await
                    .map_err(|e| ExitError::new(e.exit_code(), e.to_string()))?;
                format_or_json(format, &response, |r| println!("{}", r.job_id)).map_err(|e| ExitError::new(1, e.to_string()))
            }
            Self::Events { id, cursor, limit } => {
                let page = client.thread_events(&id, cursor, limit).await.map_err(|e| ExitError::new(e.exit_code(), e.to_string()))?;
                handle_list(format, &page.data, "no events", |e| println!("{}  {}", e.seq, e.type_tag())).map_err(|e| ExitError::new(1, e.to_string()))?;
                if format == OutputFormat::Text {
                    println!("-- nextCursor={} hasMore={}", page.next_cursor, page.has_more);
                }
                Ok(())
            }
        }
    }
}

fn print_thread(format: OutputFormat, thread: &Thread) -> Result<(), ExitError> {
    format_or_json(format, thread, |t| {
        println!("{}", t.thread_id);
        println!("  project: {}", t.project_path);
        println!("  approval policy: {}", t.approval_policy);
        println!("  sandbox: {}", t.sandbox_mode);
        println!("  archived: {}", t.archived);
        if let Some(model) = &t.model {
            println!("  model: {model}");
        }
    })
    .map_err(|e| ExitError::new(1, e.to_string()))
}
