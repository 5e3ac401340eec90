// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `acd`: the worker daemon binary. Reads configuration from the
//! environment (spec.md §10), wires up storage, gateway, fan-out and
//! orchestrator, then serves the REST+SSE surface until interrupted.
//!
//! Grounded on `oj-daemon/src/lifecycle/mod.rs`'s `"--- ojd: starting (pid:
//! N) ---"` startup marker convention and `fourthplaces-mntogether/
//! packages/server/src/server/main.rs`'s `tracing_subscriber` init +
//! `axum::serve` shape, adapted from a Unix-socket listener to the
//! TCP+bearer-token transport spec.md §6 defines.

use ac_fanout::FanOut;
use ac_gateway::ProcessAgentClient;
use ac_http::Config;
use ac_orchestrator::Orchestrator;
use ac_storage::EventStore;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,ac_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            tracing::error!("{message}");
            eprintln!("ERROR Failed to start daemon: {message}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), String> {
    println!("--- acd: starting (pid: {}) ---", std::process::id());

    let config = Config::from_env().map_err(|e| e.to_string())?;
    tracing::info!(port = config.port, db_path = %config.db_path.display(), auth_enabled = config.auth_enabled(), "configuration loaded");

    let storage = EventStore::open(&config.db_path, config.event_retention).await.map_err(|e| e.to_string())?;
    let agent = ProcessAgentClient::spawn(config.gateway.clone());
    let fanout = FanOut::with_capacity(config.subscriber_queue());
    let orchestrator = Orchestrator::new(agent, storage, fanout, ac_core::SystemClock, config.orchestrator.clone());

    orchestrator.initialize().await.map_err(|e| e.to_string())?;
    tracing::info!("agent initialized");

    spawn_retention_sweep(orchestrator.clone(), config.finished_job_ttl_hours);

    let state = std::sync::Arc::new(ac_http::AppState { orchestrator, auth_token: config.auth_token.clone() });
    let app = ac_http::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| format!("failed to bind {addr}: {e}"))?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await.map_err(|e| e.to_string())?;

    tracing::info!("daemon shutdown complete");
    Ok(())
}

/// Periodically runs the age-based retention sweep (spec §4.1, DESIGN.md's
/// open-question decision #1) in the background, independent of the
/// per-append ring eviction `ac-storage` already does inline.
fn spawn_retention_sweep<A, C>(orchestrator: Orchestrator<A, C>, ttl_hours: i64)
where
    A: ac_gateway::AgentClient + 'static,
    C: ac_core::Clock + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(3600));
        interval.tick().await; // first tick fires immediately; skip it
        loop {
            interval.tick().await;
            match orchestrator.run_retention_sweep(chrono::Duration::hours(ttl_hours)).await {
                Ok(evicted) if evicted > 0 => tracing::info!(evicted, "retention sweep evicted finished jobs"),
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "retention sweep failed"),
            }
        }
    });
}

/// Resolves on Ctrl+C or SIGTERM, whichever arrives first, so the daemon
/// drains in-flight requests before exiting (spec §6's exit-code contract).
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        let Ok(mut sigterm) = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) else { return };
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl-c, shutting down"),
        _ = terminate => tracing::info!("received sigterm, shutting down"),
    }
}
