//! Scenario 4, spec.md §8: "Cursor reconnect" — a client that already
//! consumed events up to some `seq` resumes from that cursor and sees only
//! what it missed, not the whole history again.

use crate::common::spawn_app;
use serde_json::json;

#[tokio::test]
async fn resuming_from_a_cursor_skips_already_seen_events() {
    let app = spawn_app().await;
    let thread_id = app.create_thread("thread-4").await;
    let job_id = app.start_turn(&thread_id, "turn-4", "hello").await;

    let first_page = app.job_events(&job_id, -1).await;
    let first_cursor = first_page["nextCursor"].as_i64().expect("nextCursor");
    assert_eq!(first_page["data"].as_array().unwrap().len(), 1); // job.state QUEUED->RUNNING

    app.notify(&thread_id, "turn-4", "item/agentMessage/delta", json!({"itemId": "i1", "delta": "hi"})).await;
    app.notify(&thread_id, "turn-4", "turn/completed", json!({"status": "completed"})).await;

    let resumed = app.job_events(&job_id, first_cursor).await;
    let tags: Vec<&str> = resumed["data"].as_array().unwrap().iter().map(|e| e["type"].as_str().unwrap()).collect();
    assert_eq!(tags, vec!["item.agentMessage.delta", "job.state", "job.finished"]);

    // Replaying from the very start still returns the full log.
    let everything = app.job_events(&job_id, -1).await;
    assert_eq!(everything["data"].as_array().unwrap().len(), 4);
}
