//! Scenario 1, spec.md §8: "Happy chat" — create a thread, start a turn,
//! stream a delta, complete the item, and reach `DONE`.

use crate::common::spawn_app;
use serde_json::json;

#[tokio::test]
async fn happy_chat_reaches_done() {
    let app = spawn_app().await;
    let thread_id = app.create_thread("thread-1").await;
    let job_id = app.start_turn(&thread_id, "turn-1", "Reply OK").await;

    let snapshot = app.job_snapshot(&job_id).await;
    assert_eq!(snapshot["state"], "RUNNING");

    app.notify(&thread_id, "turn-1", "item/agentMessage/delta", json!({"itemId": "i1", "delta": "OK"})).await;
    app.notify(&thread_id, "turn-1", "item/completed", json!({"type": "agentMessage", "text": "OK"})).await;
    app.notify(&thread_id, "turn-1", "turn/completed", json!({"status": "completed"})).await;

    let page = app.job_events(&job_id, -1).await;
    let tags: Vec<&str> = page["data"].as_array().unwrap().iter().map(|e| e["type"].as_str().unwrap()).collect();
    similar_asserts::assert_eq!(tags, vec!["job.state", "item.agentMessage.delta", "item.completed", "job.state", "job.finished"]);

    let snapshot = app.job_snapshot(&job_id).await;
    assert_eq!(snapshot["state"], "DONE");
}
