// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn unknown_kind_round_trips_via_other() {
    let json = serde_json::json!("future_kind");
    let kind: ApprovalKind = serde_json::from_value(json).unwrap();
    assert_eq!(kind, ApprovalKind::Other("future_kind".to_string()));
    assert_eq!(serde_json::to_value(&kind).unwrap(), serde_json::json!("future_kind"));
}

#[parameterized(
    accept = { ApprovalDecisionKind::Accept, serde_json::json!("accept") },
    accept_for_session = { ApprovalDecisionKind::AcceptForSession, serde_json::json!("acceptForSession") },
    decline = { ApprovalDecisionKind::Decline, serde_json::json!("decline") },
    cancel = { ApprovalDecisionKind::Cancel, serde_json::json!("cancel") },
)]
fn simple_decisions_map_to_upstream_value(kind: ApprovalDecisionKind, expected: serde_json::Value) {
    let decision = ResolvedDecision::build(kind, &ApprovalKind::CommandExecution, Vec::new()).unwrap();
    assert_eq!(decision.to_upstream_value(), expected);
}

#[test]
fn execpolicy_amendment_requires_command_execution_kind() {
    let err = ResolvedDecision::build(
        ApprovalDecisionKind::AcceptWithExecpolicyAmendment,
        &ApprovalKind::ApplyPatch,
        vec!["--yes".to_string()],
    )
    .unwrap_err();
    assert!(matches!(err, CoreError::InvalidDecisionForKind { .. }));
}

#[test]
fn execpolicy_amendment_rejects_empty_token_list() {
    let err = ResolvedDecision::build(
        ApprovalDecisionKind::AcceptWithExecpolicyAmendment,
        &ApprovalKind::CommandExecution,
        Vec::new(),
    )
    .unwrap_err();
    assert!(matches!(err, CoreError::InvalidExecPolicyAmendment));
}

#[test]
fn execpolicy_amendment_rejects_empty_token() {
    let err = ResolvedDecision::build(
        ApprovalDecisionKind::AcceptWithExecpolicyAmendment,
        &ApprovalKind::CommandExecution,
        vec!["ok".to_string(), "".to_string()],
    )
    .unwrap_err();
    assert!(matches!(err, CoreError::InvalidExecPolicyAmendment));
}

#[test]
fn execpolicy_amendment_renders_upstream_shape() {
    let decision = ResolvedDecision::build(
        ApprovalDecisionKind::AcceptWithExecpolicyAmendment,
        &ApprovalKind::CommandExecution,
        vec!["--yes".to_string(), "rm".to_string()],
    )
    .unwrap();
    assert_eq!(
        decision.to_upstream_value(),
        serde_json::json!({"acceptWithExecpolicyAmendment": {"execpolicy_amendment": ["--yes", "rm"]}})
    );
}

#[test]
fn amendment_tokens_rejected_for_other_decisions() {
    let err = ResolvedDecision::build(
        ApprovalDecisionKind::Accept,
        &ApprovalKind::CommandExecution,
        vec!["stray".to_string()],
    )
    .unwrap_err();
    assert!(matches!(err, CoreError::InvalidExecPolicyAmendment));
}

#[test]
fn accept_variants_unblock_cancel_and_decline_do_not() {
    assert!(ApprovalDecisionKind::Accept.unblocks());
    assert!(ApprovalDecisionKind::AcceptForSession.unblocks());
    assert!(ApprovalDecisionKind::AcceptWithExecpolicyAmendment.unblocks());
    assert!(!ApprovalDecisionKind::Decline.unblocks());
    assert!(!ApprovalDecisionKind::Cancel.unblocks());
}
