// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::{JobId, ThreadId};

#[test]
fn job_id_roundtrips_through_string() {
    let id = JobId::new();
    let s = id.to_string();
    assert!(s.starts_with(JobId::PREFIX));
    assert_eq!(JobId::from_string(&s), id);
}

#[test]
fn job_id_is_unique() {
    assert_ne!(JobId::new(), JobId::new());
}

#[test]
fn thread_id_parses_opaque_agent_string() {
    let t = ThreadId::from("thread_abc123");
    assert_eq!(t.as_str(), "thread_abc123");
    assert_eq!(t.to_string(), "thread_abc123");
}

#[test]
fn thread_id_serializes_as_bare_string() {
    let t = ThreadId::from("thread_abc123");
    let json = serde_json::to_string(&t).unwrap();
    assert_eq!(json, "\"thread_abc123\"");
}

mod proptest_roundtrip {
    use super::*;
    use crate::id::{IdBuf, ID_MAX_LEN};
    use proptest::prelude::*;

    proptest! {
        /// Any agent-assigned string within the inline buffer's capacity
        /// round-trips through `IdBuf` unchanged (spec §3: ids are opaque
        /// strings handed to us by the agent, never reinterpreted).
        #[test]
        fn idbuf_roundtrips_for_any_string_within_capacity(
            s in proptest::string::string_regex(&format!("[ -~]{{0,{ID_MAX_LEN}}}")).unwrap()
        ) {
            let buf = IdBuf::new(&s);
            prop_assert_eq!(buf.as_str(), s.as_str());
        }

        /// `ThreadId`/`TurnId`/`ApprovalId`-style opaque ids (here exercised
        /// via `ThreadId`) preserve arbitrary ASCII content exactly, since
        /// `agent_id!` wraps an owned `String` rather than re-encoding it.
        #[test]
        fn thread_id_preserves_arbitrary_ascii_content(s in "[ -~]{0,256}") {
            let t = ThreadId::from(s.clone());
            prop_assert_eq!(t.as_str(), s.as_str());
            let json = serde_json::to_string(&t).unwrap();
            let back: ThreadId = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(back, t);
        }
    }
}
