// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ac`: operator CLI for the agent-core worker daemon (`acd`). Talks to a
//! running `ac-http` instance over its REST surface (spec.md §6); carries
//! no state and no agent-subprocess knowledge of its own.
//!
//! Grounded on `oj-cli`'s top-level `clap` derive (global flags, one
//! subcommand enum per resource dispatched to `commands::*`) and
//! `ExitError`-carrying command results so `main` has exactly one place
//! that turns a command outcome into a process exit code.

mod client;
mod commands;
mod exit_error;
mod output;

use clap::{Parser, Subcommand};
use exit_error::ExitError;
use output::OutputFormat;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "ac", version, about = "Operator CLI for the agent-core worker daemon")]
struct Cli {
    /// Base URL of the running `ac-http` daemon
    #[arg(long, env = "AC_SERVER", default_value = "http://127.0.0.1:8787", global = true)]
    server: String,

    /// Bearer token, if the daemon has `WORKER_TOKEN` configured
    #[arg(long, env = "AC_TOKEN", global = true)]
    token: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check daemon health
    Health,
    /// Thread management
    Thread(commands::thread::ThreadArgs),
    /// Job inspection, approval, and cancellation
    Job(commands::job::JobArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let client = client::AgentCoreClient::new(cli.server, cli.token);

    let result = match cli.command {
        Command::Health => commands::health::run(&client, cli.format).await,
        Command::Thread(args) => args.command.run(&client, cli.format).await,
        Command::Job(args) => args.command.run(&client, cli.format).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(ExitError { code, message }) => {
            eprintln!("error: {message}");
            ExitCode::from(code.clamp(1, 255) as u8)
        }
    }
}
