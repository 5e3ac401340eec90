//! Scenario 2, spec.md §8: "Approval accept" — an `execCommandApproval`
//! request parks the job at `WAITING_APPROVAL`; accepting it unblocks the
//! job back to `RUNNING` and forwards the upstream reply.

use crate::common::spawn_app;
use serde_json::json;

#[tokio::test]
async fn accepting_an_approval_unblocks_the_job() {
    let app = spawn_app().await;
    let thread_id = app.create_thread("thread-2").await;
    let job_id = app.start_turn(&thread_id, "turn-2", "rm -rf build/").await;

    app.agent.push_approval_request(
        "execCommandApproval",
        json!({"threadId": thread_id, "turnId": "turn-2", "approvalId": "appr-1", "details": {"command": "rm -rf build/"}}),
        ac_gateway::PendingApprovalId(1),
    ).await;
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    let snapshot = app.job_snapshot(&job_id).await;
    assert_eq!(snapshot["state"], "WAITING_APPROVAL");

    let response = app
        .client
        .post(format!("{}/v1/jobs/{job_id}/approve", app.base_url))
        .json(&json!({"approvalId": "appr-1", "decision": "accept"}))
        .send()
        .await
        .expect("approve request");
    assert_eq!(response.status(), 204);

    let resolutions = app.agent.resolutions();
    assert_eq!(resolutions.len(), 1);
    assert_eq!(resolutions[0].reply, json!("accept"));

    let snapshot = app.job_snapshot(&job_id).await;
    assert_eq!(snapshot["state"], "RUNNING");

    let page = app.job_events(&job_id, -1).await;
    let tags: Vec<&str> = page["data"].as_array().unwrap().iter().map(|e| e["type"].as_str().unwrap()).collect();
    assert!(tags.contains(&"approval.required"));
    assert!(tags.contains(&"approval.resolved"));
}
