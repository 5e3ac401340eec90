// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subscription Fan-Out (spec.md §4.4): per-job registry of live
//! subscribers, each a bounded outbound queue with a drop-subscriber
//! (not drop-message) backpressure policy.
//!
//! Grounded on `fourthplaces-mntogether/packages/server/src/kernel/
//! stream_hub.rs`'s topic-keyed `broadcast` hub, generalized from a
//! generic pub/sub hub to this spec's per-job, bounded-queue registry:
//! `broadcast` channels lag (drop messages) under backpressure, which
//! would violate spec §4.4's lossless-for-well-behaved-consumers
//! requirement, so each subscriber gets its own bounded `mpsc` channel
//! instead and a full queue evicts the *subscriber*, not the message.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use ac_core::{Event, JobId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, oneshot};

/// Default per-subscription queue bound (spec §4.4: "default 256 events").
pub const DEFAULT_SUBSCRIBER_QUEUE: usize = 256;

/// Why a subscription's done signal fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The subscriber's queue overflowed; it must resubscribe with its
    /// last observed cursor (spec §4.4).
    SlowConsumer,
}

/// A live subscription returned by [`FanOut::subscribe`]. Read `rx` for
/// live events; `done` resolves if the fan-out evicts this subscription
/// out of band (currently only for [`CloseReason::SlowConsumer`] — normal
/// job termination is observable in-band as a `job.finished` event
/// followed by channel closure, with no separate signal needed).
pub struct Subscription {
    pub id: u64,
    pub job_id: JobId,
    pub rx: mpsc::Receiver<Event>,
    pub done: oneshot::Receiver<CloseReason>,
}

struct SubscriberHandle {
    id: u64,
    tx: mpsc::Sender<Event>,
    done_tx: Option<oneshot::Sender<CloseReason>>,
}

/// Per-job subscriber registry (spec.md §4.4).
pub struct FanOut {
    capacity: usize,
    next_id: AtomicU64,
    jobs: Mutex<HashMap<JobId, Vec<SubscriberHandle>>>,
}

impl FanOut {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_SUBSCRIBER_QUEUE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { capacity, next_id: AtomicU64::new(1), jobs: Mutex::new(HashMap::new()) }
    }

    /// Register a new live subscriber for `job_id`.
    ///
    /// Callers implement spec §4.4's full handoff protocol themselves:
    /// read history up to the resume cursor from the Event Store, *then*
    /// call this under the same per-job lock the Orchestrator already
    /// holds while appending, so no event appended between the history
    /// read and this registration is missed.
    pub fn subscribe(&self, job_id: JobId) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(self.capacity);
        let (done_tx, done_rx) = oneshot::channel();
        self.jobs.lock().entry(job_id).or_default().push(SubscriberHandle { id, tx, done_tx: Some(done_tx) });
        Subscription { id, job_id, rx, done: done_rx }
    }

    /// Push `event` to every live subscriber of its job. Never blocks the
    /// appender: a full subscriber queue evicts that subscriber with
    /// [`CloseReason::SlowConsumer`] instead of waiting or dropping the
    /// event for well-behaved consumers (spec §4.4, §5).
    pub fn publish(&self, event: &Event) {
        let job_id = event.job_id;
        let mut jobs = self.jobs.lock();
        let Some(subs) = jobs.get_mut(&job_id) else { return };

        subs.retain_mut(|sub| match sub.tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(%job_id, subscriber_id = sub.id, "slow consumer; evicting subscription");
                if let Some(done_tx) = sub.done_tx.take() {
                    let _ = done_tx.send(CloseReason::SlowConsumer);
                }
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });

        if subs.is_empty() {
            jobs.remove(&job_id);
        } else if event.is_job_finished() {
            // job.finished is the last event for this job (invariant I2);
            // dropping the senders closes each subscriber's channel once
            // the event already enqueued is drained — no further publish
            // will ever target this job_id again.
            jobs.remove(&job_id);
        }
    }

    /// Number of live subscribers currently registered for `job_id`.
    pub fn subscriber_count(&self, job_id: JobId) -> usize {
        self.jobs.lock().get(&job_id).map(Vec::len).unwrap_or(0)
    }
}

impl Default for FanOut {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "fanout_tests.rs"]
mod tests;
