//! Scenario 7, spec.md §8: "Slow consumer eviction" — a subscriber that
//! never drains its queue gets evicted once the bound fills, rather than
//! blocking the appender or silently dropping events for everyone else.

use crate::common::spawn_app_with_queue_capacity;
use ac_core::JobId;
use serde_json::json;

#[tokio::test]
async fn a_subscriber_that_never_reads_gets_evicted() {
    let app = spawn_app_with_queue_capacity(4).await;
    let thread_id = app.create_thread("thread-7").await;
    let job_id = app.start_turn(&thread_id, "turn-7", "hello").await;

    let subscription = app.orchestrator.subscribe_job(JobId::from_string(&job_id), -1).await.expect("subscribe");
    let mut done = subscription.subscription.expect("job is still running; must have a live subscription").done;

    for i in 0..16 {
        app.notify(&thread_id, "turn-7", "item/agentMessage/delta", json!({"itemId": "i1", "delta": format!("chunk-{i}")})).await;
    }

    let reason = done.try_recv().expect("subscription should have been evicted by now");
    assert_eq!(reason, ac_fanout::CloseReason::SlowConsumer);

    // Eviction doesn't touch the durable log: every delta is still there
    // for a fresh subscriber to replay from the start.
    let page = app.job_events(&job_id, -1).await;
    let delta_count = page["data"].as_array().unwrap().iter().filter(|e| e["type"] == "item.agentMessage.delta").count();
    assert_eq!(delta_count, 16);
}
