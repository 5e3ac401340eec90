//! Scenario 3, spec.md §8: "Approval decline" — declining an approval
//! terminates the job as `CANCELLED` rather than unblocking it.

use crate::common::spawn_app;
use serde_json::json;

#[tokio::test]
async fn declining_an_approval_cancels_the_job() {
    let app = spawn_app().await;
    let thread_id = app.create_thread("thread-3").await;
    let job_id = app.start_turn(&thread_id, "turn-3", "rm -rf build/").await;

    app.agent.push_approval_request(
        "execCommandApproval",
        json!({"threadId": thread_id, "turnId": "turn-3", "approvalId": "appr-2", "details": {"command": "rm -rf build/"}}),
        ac_gateway::PendingApprovalId(1),
    ).await;
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    let response = app
        .client
        .post(format!("{}/v1/jobs/{job_id}/approve", app.base_url))
        .json(&json!({"approvalId": "appr-2", "decision": "decline"}))
        .send()
        .await
        .expect("approve request");
    assert_eq!(response.status(), 204);

    let resolutions = app.agent.resolutions();
    assert_eq!(resolutions[0].reply, json!("decline"));

    let snapshot = app.job_snapshot(&job_id).await;
    assert_eq!(snapshot["state"], "CANCELLED");

    let page = app.job_events(&job_id, -1).await;
    let tags: Vec<&str> = page["data"].as_array().unwrap().iter().map(|e| e["type"].as_str().unwrap()).collect();
    assert_eq!(tags.last(), Some(&"job.finished"));

    // Resolving the same approval a second time is a no-op error, not a
    // second CANCELLED transition (I2: terminal states are sticky).
    let response = app
        .client
        .post(format!("{}/v1/jobs/{job_id}/approve", app.base_url))
        .json(&json!({"approvalId": "appr-2", "decision": "accept"}))
        .send()
        .await
        .expect("second approve request");
    assert!(!response.status().is_success());
}
