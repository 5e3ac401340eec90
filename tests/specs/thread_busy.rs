//! Scenario 6, spec.md §8: "Thread busy" — invariant I3 (one live turn per
//! thread): starting a second turn while the first is still active is
//! rejected with `THREAD_BUSY`, not queued or silently dropped.

use crate::common::spawn_app;
use serde_json::json;

#[tokio::test]
async fn starting_a_second_turn_on_a_busy_thread_is_rejected() {
    let app = spawn_app().await;
    let thread_id = app.create_thread("thread-6").await;
    let _job_id = app.start_turn(&thread_id, "turn-6a", "first turn").await;

    app.agent.push_response("sendUserMessage", Ok(json!({"turnId": "turn-6b"})));
    let response = app
        .client
        .post(format!("{}/v1/threads/{thread_id}/turns", app.base_url))
        .json(&json!({"text": "second turn"}))
        .send()
        .await
        .expect("second start-turn request");

    assert_eq!(response.status(), 409);
    let body: serde_json::Value = response.json().await.expect("error body");
    assert_eq!(body["error"], "THREAD_BUSY");
}
