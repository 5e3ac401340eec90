use super::*;
use ac_core::{ApprovalPolicy, FakeClock, SandboxMode, Thread};
use ac_fanout::FanOut;
use ac_gateway::FakeAgentClient;
use ac_storage::EventStore;

async fn test_orchestrator() -> (Orchestrator<FakeAgentClient, FakeClock>, ThreadId) {
    let storage = EventStore::open_in_memory(2000).await.unwrap();
    let fanout = FanOut::new();
    let clock = FakeClock::new();
    let agent = FakeAgentClient::new();
    let thread_id = ThreadId::from("thread-history-1");
    agent.push_response("newThread", Ok(json!({ "threadId": thread_id.as_str() })));

    let orchestrator = Orchestrator::new(agent, storage, fanout, clock, OrchestratorConfig::default());
    let thread = orchestrator.create_thread("/repo".into(), ApprovalPolicy::OnRequest, SandboxMode::WorkspaceWrite, None).await.unwrap();
    (orchestrator, thread.thread_id)
}

#[tokio::test]
async fn synthesizes_completed_turn_with_messages() {
    let (orchestrator, thread_id) = test_orchestrator().await;

    orchestrator.inner.agent.push_response(
        "readThread",
        Ok(json!({
            "turns": [{
                "turnId": "turn-1",
                "status": "completed",
                "items": [
                    {"id": "i1", "type": "userMessage", "text": "hello"},
                    {"id": "i2", "type": "agentMessage", "text": "hi there"},
                ],
            }],
        })),
    );

    let page = read_thread_history(&orchestrator, &thread_id, ac_core::CURSOR_FRESH, 100).await.unwrap();

    assert_eq!(page.events.len(), 4);
    assert_eq!(page.events[0].seq, 0);
    assert!(matches!(&page.events[0].payload, EventPayload::ItemCompleted(_)));
    assert!(matches!(&page.events[1].payload, EventPayload::ItemCompleted(_)));
    assert!(matches!(&page.events[2].payload, EventPayload::JobState { state: JobState::Done, .. }));
    assert!(matches!(&page.events[3].payload, EventPayload::JobFinished { state: JobState::Done, .. }));
    assert!(!page.has_more);
    assert_eq!(page.next_cursor, 4);

    // Every synthesized event for this turn shares the same synthetic job id.
    let job_id = page.events[0].job_id;
    assert!(job_id.as_str().starts_with("hist_"));
    assert!(page.events.iter().all(|e| e.job_id == job_id));
}

#[tokio::test]
async fn failed_turn_emits_trailing_error_event() {
    let (orchestrator, thread_id) = test_orchestrator().await;

    orchestrator.inner.agent.push_response(
        "readThread",
        Ok(json!({
            "turns": [{
                "turnId": "turn-2",
                "status": "failed",
                "errorMessage": "boom",
                "items": [],
            }],
        })),
    );

    let page = read_thread_history(&orchestrator, &thread_id, ac_core::CURSOR_FRESH, 100).await.unwrap();

    assert_eq!(page.events.len(), 3);
    assert!(matches!(&page.events[0].payload, EventPayload::JobState { state: JobState::Failed, .. }));
    assert!(matches!(&page.events[1].payload, EventPayload::JobFinished { state: JobState::Failed, .. }));
    assert!(matches!(&page.events[2].payload, EventPayload::Error { ref message, .. } if message == "boom"));
}

#[tokio::test]
async fn in_progress_turn_has_no_finished_event() {
    let (orchestrator, thread_id) = test_orchestrator().await;

    orchestrator.inner.agent.push_response(
        "readThread",
        Ok(json!({
            "turns": [{
                "turnId": "turn-3",
                "status": "inProgress",
                "items": [],
            }],
        })),
    );

    let page = read_thread_history(&orchestrator, &thread_id, ac_core::CURSOR_FRESH, 100).await.unwrap();

    assert_eq!(page.events.len(), 1);
    assert!(matches!(&page.events[0].payload, EventPayload::JobState { state: JobState::Running, .. }));
}

#[tokio::test]
async fn reuses_bound_job_id_for_a_live_turn() {
    let (orchestrator, thread_id) = test_orchestrator().await;

    orchestrator.inner.agent.push_response("sendUserMessage", Ok(json!({ "turnId": "turn-live" })));
    let job_id = orchestrator.start_turn(&thread_id, StartTurnRequest { text: "go".into(), ..Default::default() }).await.unwrap();

    orchestrator.inner.agent.push_response(
        "readThread",
        Ok(json!({
            "turns": [{
                "turnId": "turn-live",
                "status": "inProgress",
                "items": [],
            }],
        })),
    );

    let page = read_thread_history(&orchestrator, &thread_id, ac_core::CURSOR_FRESH, 100).await.unwrap();
    assert_eq!(page.events[0].job_id, job_id);
}

#[tokio::test]
async fn pagination_walks_the_flattened_sequence() {
    let (orchestrator, thread_id) = test_orchestrator().await;

    orchestrator.inner.agent.push_response(
        "readThread",
        Ok(json!({
            "turns": [
                {"turnId": "t1", "status": "completed", "items": [{"id": "a", "type": "userMessage", "text": "hi"}]},
                {"turnId": "t2", "status": "completed", "items": [{"id": "b", "type": "userMessage", "text": "there"}]},
            ],
        })),
    );

    let first = read_thread_history(&orchestrator, &thread_id, ac_core::CURSOR_FRESH, 1).await.unwrap();
    assert_eq!(first.events.len(), 1);
    assert!(first.has_more);

    let second = read_thread_history(&orchestrator, &thread_id, first.next_cursor, 1).await.unwrap();
    assert_eq!(second.events.len(), 1);
    assert_ne!(first.events[0].job_id, second.events[0].job_id);
}

#[tokio::test]
async fn cursor_past_total_is_expired() {
    let (orchestrator, thread_id) = test_orchestrator().await;

    orchestrator.inner.agent.push_response("readThread", Ok(json!({ "turns": [] })));

    let err = read_thread_history(&orchestrator, &thread_id, 5, 10).await.unwrap_err();
    assert_eq!(err.code(), "CURSOR_EXPIRED");
}

/// Boundary case of spec.md §4.3.5's "`CURSOR_EXPIRED` if `c ≥ total`":
/// `cursor == total` (not just strictly greater) must also be rejected.
#[tokio::test]
async fn cursor_exactly_at_total_is_expired() {
    let (orchestrator, thread_id) = test_orchestrator().await;

    let turns = json!({
        "turns": [{"turnId": "t1", "status": "completed", "items": [{"id": "a", "type": "userMessage", "text": "hi"}]}],
    });
    orchestrator.inner.agent.push_response("readThread", Ok(turns.clone()));
    orchestrator.inner.agent.push_response("readThread", Ok(turns));

    let page = read_thread_history(&orchestrator, &thread_id, ac_core::CURSOR_FRESH, 100).await.unwrap();
    let total = page.events.len() as i64;

    let err = read_thread_history(&orchestrator, &thread_id, total, 10).await.unwrap_err();
    assert_eq!(err.code(), "CURSOR_EXPIRED");
}
