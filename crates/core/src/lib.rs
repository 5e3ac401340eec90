// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Data model, ids, clock, and error taxonomy shared across the agent-core
//! workspace (spec.md §3, §7). Zero knowledge of HTTP, SSE, sqlite, or the
//! upstream JSON-RPC wire format — those belong to `ac-storage`,
//! `ac-gateway`, and `ac-http`.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

#[macro_use]
pub mod macros;
pub mod id;

pub mod approval;
pub mod clock;
pub mod error;
pub mod event;
pub mod job;
pub mod thread;

pub use approval::{Approval, ApprovalDecisionKind, ApprovalId, ApprovalKind, ApprovalState, ResolvedDecision};
pub use clock::{Clock, FakeClock, SystemClock};
pub use error::CoreError;
pub use event::{Event, EventPayload};
pub use job::{JobId, JobSnapshot, JobState};
pub use thread::{ApprovalPolicy, SandboxMode, Thread, ThreadId, TurnId};

/// Fresh-subscription cursor sentinel (spec.md §3's Subscription entity:
/// "cursor (last delivered seq, -1 initially)").
pub const CURSOR_FRESH: i64 = -1;
