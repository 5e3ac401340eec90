//! Shared harness for the end-to-end scenarios in spec.md §8. Boots the
//! real `ac-http` router over a `FakeAgentClient` standing in for the
//! upstream subprocess, bound to an ephemeral TCP port, and drives it with
//! a plain `reqwest::Client` — mirroring SPEC_FULL.md §13's description of
//! this root package's role as the workspace's black-box test suite.

use ac_core::FakeClock;
use ac_fanout::FanOut;
use ac_gateway::FakeAgentClient;
use ac_http::AppState;
use ac_orchestrator::{Orchestrator, OrchestratorConfig};
use ac_storage::EventStore;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

pub type TestOrchestrator = Orchestrator<Arc<FakeAgentClient>, FakeClock>;

pub struct TestApp {
    pub base_url: String,
    pub agent: Arc<FakeAgentClient>,
    pub clock: FakeClock,
    pub orchestrator: TestOrchestrator,
    pub client: reqwest::Client,
}

impl TestApp {
    /// Convenience: create a thread and return its id, scripting the
    /// `newThread` response the fake agent hands back.
    pub async fn create_thread(&self, thread_id: &str) -> String {
        self.agent.push_response("newThread", Ok(json!({ "threadId": thread_id })));
        let response = self
            .client
            .post(format!("{}/v1/threads", self.base_url))
            .json(&json!({ "projectPath": "/repo" }))
            .send()
            .await
            .expect("create thread request");
        assert_eq!(response.status(), 201);
        let body: Value = response.json().await.expect("thread body");
        body["threadId"].as_str().expect("threadId").to_string()
    }

    /// Convenience: start a turn, scripting `sendUserMessage`'s ack so the
    /// turn is bound to its job id immediately.
    pub async fn start_turn(&self, thread_id: &str, turn_id: &str, text: &str) -> String {
        self.agent.push_response("sendUserMessage", Ok(json!({ "turnId": turn_id })));
        let response = self
            .client
            .post(format!("{}/v1/threads/{thread_id}/turns", self.base_url))
            .json(&json!({ "text": text }))
            .send()
            .await
            .expect("start turn request");
        assert_eq!(response.status(), 202);
        let body: Value = response.json().await.expect("turn body");
        body["jobId"].as_str().expect("jobId").to_string()
    }

    pub async fn notify(&self, thread_id: &str, turn_id: &str, method: &str, mut extra: Value) {
        extra["threadId"] = json!(thread_id);
        extra["turnId"] = json!(turn_id);
        self.agent.push_notification(method, extra).await;
        // Give the background notification-consumer task a chance to run.
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    pub async fn job_snapshot(&self, job_id: &str) -> Value {
        self.client.get(format!("{}/v1/jobs/{job_id}", self.base_url)).send().await.expect("job snapshot request").json().await.expect("job body")
    }

    pub async fn job_events(&self, job_id: &str, cursor: i64) -> Value {
        self.client
            .get(format!("{}/v1/jobs/{job_id}/events?cursor={cursor}", self.base_url))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .expect("job events request")
            .json()
            .await
            .expect("job events body")
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(None, 256).await
}

pub async fn spawn_app_with_token(token: Option<String>) -> TestApp {
    spawn_app_with(token, 256).await
}

pub async fn spawn_app_with_queue_capacity(capacity: usize) -> TestApp {
    spawn_app_with(None, capacity).await
}

async fn spawn_app_with(token: Option<String>, queue_capacity: usize) -> TestApp {
    let storage = EventStore::open_in_memory(2000).await.expect("open in-memory store");
    let fanout = FanOut::with_capacity(queue_capacity);
    let clock = FakeClock::new();
    let agent = Arc::new(FakeAgentClient::new());
    let config = OrchestratorConfig { cancel_grace: Duration::from_millis(50), orphan_window: Duration::from_millis(200), ..Default::default() };
    let orchestrator = Orchestrator::new(agent.clone(), storage, fanout, clock.clone(), config);
    orchestrator.initialize().await.expect("initialize");

    let state = Arc::new(AppState { orchestrator: orchestrator.clone(), auth_token: token });
    let app = ac_http::router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    // Give the listener a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(20)).await;

    TestApp { base_url: format!("http://{addr}"), agent, clock, orchestrator, client: reqwest::Client::new() }
}
