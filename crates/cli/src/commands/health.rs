// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ac health` - check daemon liveness and auth configuration.

use crate::client::AgentCoreClient;
use crate::exit_error::ExitError;
use crate::output::{format_or_json, OutputFormat};

pub async fn run(client: &AgentCoreClient, format: OutputFormat) -> Result<(), ExitError> {
    let health = client.health().await.map_err(|e| ExitError::new(e.exit_code(), e.to_string()))?;
    format_or_json(format, &health, |health| {
        println!("status: {}", health.status);
        println!("auth enabled: {}", health.auth_enabled);
    })
    .map_err(|e| ExitError::new(1, e.to_string()))
}
