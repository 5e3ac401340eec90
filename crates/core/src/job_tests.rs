// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn terminal_states_are_exactly_done_failed_cancelled() {
    assert!(JobState::Done.is_terminal());
    assert!(JobState::Failed.is_terminal());
    assert!(JobState::Cancelled.is_terminal());
    assert!(!JobState::Queued.is_terminal());
    assert!(!JobState::Running.is_terminal());
    assert!(!JobState::WaitingApproval.is_terminal());
}

#[test]
fn state_serializes_screaming_snake_case_matching_wire_contract() {
    assert_eq!(serde_json::to_string(&JobState::WaitingApproval).unwrap(), "\"WAITING_APPROVAL\"");
}

#[test]
fn new_snapshot_starts_queued_with_sentinel_seq() {
    let snap = JobSnapshot::for_test("thread_1");
    assert_eq!(snap.state, JobState::Queued);
    assert_eq!(snap.last_seq, -1);
    assert!(snap.turn_id.is_none());
    assert!(!snap.is_terminal());
}
