// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the `ac-http` binary
//! (SPEC_FULL.md §10), matching `oj-daemon/src/env.rs`'s convention of one
//! module of typed accessors rather than a config-file parser. Config is
//! read once at startup and is immutable for the process lifetime (spec §5).

use std::path::PathBuf;
use std::time::Duration;

use ac_gateway::GatewayConfig;
use ac_orchestrator::OrchestratorConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a valid integer, got {value:?}")]
    InvalidInteger { name: &'static str, value: String },

    #[error("{name} must not be an empty string")]
    Empty { name: &'static str },

    #[error("AGENT_COMMAND must be set to the upstream agent subprocess command")]
    MissingAgentCommand,
}

/// Fully-resolved process configuration (SPEC_FULL.md §10).
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub auth_token: Option<String>,
    pub db_path: PathBuf,
    pub event_retention: i64,
    /// Age after which a terminal job's full event/turn-binding row set is
    /// eligible for eviction (DESIGN.md's age-based GC half of spec §4.1's
    /// retention policy), swept periodically by the daemon's background task.
    pub finished_job_ttl_hours: i64,
    pub gateway: GatewayConfig,
    pub orchestrator: OrchestratorConfig,
}

impl Config {
    /// Load configuration from the process environment. Malformed values are
    /// startup failures (SPEC_FULL.md §10): the caller is expected to print
    /// the diagnostic and exit non-zero rather than fall back to a default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = parse_u16("PORT", 8787)?;
        let auth_token = non_empty_opt("WORKER_TOKEN")?;
        let db_path = std::env::var("WORKER_DB_PATH").unwrap_or_else(|_| "./agent-core.db".to_string()).into();
        let event_retention = parse_i64("WORKER_EVENT_RETENTION", ac_storage::DEFAULT_EVENT_RETENTION)?
            .max(ac_storage::MIN_EVENT_RETENTION);
        let finished_job_ttl_hours = parse_i64("WORKER_FINISHED_JOB_TTL_HOURS", 24)?;

        let command = std::env::var("AGENT_COMMAND").map_err(|_| ConfigError::MissingAgentCommand)?;
        if command.trim().is_empty() {
            return Err(ConfigError::MissingAgentCommand);
        }
        let args = std::env::var("AGENT_ARGS")
            .ok()
            .map(|s| s.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect())
            .unwrap_or_default();
        let cwd = std::env::var("AGENT_CWD").ok().map(PathBuf::from);

        let rpc_timeout = Duration::from_millis(parse_u64("WORKER_RPC_TIMEOUT_MS", 30_000)?);
        let cancel_grace = Duration::from_millis(parse_u64("WORKER_CANCEL_GRACE_MS", 10_000)?);
        let orphan_window = Duration::from_millis(parse_u64("WORKER_ORPHAN_WINDOW_MS", 5_000)?);

        Ok(Self {
            port,
            auth_token,
            db_path,
            event_retention,
            finished_job_ttl_hours,
            gateway: GatewayConfig { command, args, cwd, ..GatewayConfig::default() },
            orchestrator: OrchestratorConfig { rpc_timeout, cancel_grace, orphan_window },
        })
    }

    pub fn subscriber_queue(&self) -> usize {
        parse_usize_or_default("WORKER_SUBSCRIBER_QUEUE", ac_fanout::DEFAULT_SUBSCRIBER_QUEUE)
    }

    pub fn auth_enabled(&self) -> bool {
        self.auth_token.is_some()
    }
}

fn parse_u16(name: &'static str, default: u16) -> Result<u16, ConfigError> {
    match std::env::var(name) {
        Err(_) => Ok(default),
        Ok(s) => s.parse().map_err(|_| ConfigError::InvalidInteger { name, value: s }),
    }
}

fn parse_u64(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Err(_) => Ok(default),
        Ok(s) => s.parse().map_err(|_| ConfigError::InvalidInteger { name, value: s }),
    }
}

fn parse_i64(name: &'static str, default: i64) -> Result<i64, ConfigError> {
    match std::env::var(name) {
        Err(_) => Ok(default),
        Ok(s) => s.parse().map_err(|_| ConfigError::InvalidInteger { name, value: s }),
    }
}

fn parse_usize_or_default(name: &'static str, default: usize) -> usize {
    std::env::var(name).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn non_empty_opt(name: &'static str) -> Result<Option<String>, ConfigError> {
    match std::env::var(name) {
        Err(_) => Ok(None),
        Ok(s) if s.is_empty() => Err(ConfigError::Empty { name }),
        Ok(s) => Ok(Some(s)),
    }
}
