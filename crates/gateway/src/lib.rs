// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent Client Gateway (spec.md §4.2): single owner of the upstream agent
//! subprocess. Demultiplexes its notification stream, serializes
//! correlated request/response calls, and answers server-initiated
//! approval requests.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod error;
mod framing;
mod process;

#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use client::{AgentClient, GatewayMessage, PendingApprovalId};
pub use error::GatewayError;
pub use process::{GatewayConfig, ProcessAgentClient};

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeAgentClient, RecordedCall, RecordedResolution};
