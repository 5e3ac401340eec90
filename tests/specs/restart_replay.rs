//! Scenario 5, spec.md §8: "Restart replay" — run a job to completion,
//! drop every in-process handle, reopen the same database file, and
//! confirm the full event log and job snapshot survive intact.

use ac_core::{Clock, EventPayload, JobId, JobSnapshot, JobState, SystemClock, ThreadId, TurnId};
use ac_storage::EventStore;

#[tokio::test]
async fn reopening_the_store_after_a_restart_replays_the_full_log() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("agent-core.db");

    let job_id = JobId::new();
    let thread_id = ThreadId::from("thread-5");
    let turn_id = TurnId::from("turn-5");

    {
        let storage = EventStore::open(&db_path, 2000).await.expect("open store");
        let now = SystemClock.utc_now();
        storage.upsert_job(&JobSnapshot::new(job_id, thread_id.clone(), now)).await.expect("upsert job");
        storage.bind_turn(job_id, &thread_id, &turn_id).await.expect("bind turn");

        storage.append_event(job_id, EventPayload::JobState { state: JobState::Running, error_message: None }, None).await.expect("append running");
        storage
            .append_event(job_id, EventPayload::ItemAgentMessageDelta { item_id: "i1".into(), delta: "hi".into() }, None)
            .await
            .expect("append delta");
        storage.append_event(job_id, EventPayload::JobState { state: JobState::Done, error_message: None }, None).await.expect("append done");
        storage.append_event(job_id, EventPayload::JobFinished { state: JobState::Done, error_message: None }, None).await.expect("append finished");

        let mut snapshot = storage.load_job(job_id).await.expect("load job").expect("job exists");
        snapshot.state = JobState::Done;
        snapshot.finished_at = Some(SystemClock.utc_now());
        storage.upsert_job(&snapshot).await.expect("finalize job");
        // `storage` (and its pool) is dropped here, simulating process exit.
    }

    let reopened = EventStore::open(&db_path, 2000).await.expect("reopen store");

    let snapshot = reopened.load_job(job_id).await.expect("load job after restart").expect("job survives restart");
    assert_eq!(snapshot.state, JobState::Done);

    let page = reopened.read_range(job_id, -1, i64::MAX).await.expect("read full log");
    assert_eq!(page.events.len(), 4);
    assert_eq!(page.events[0].seq, 0);
    assert_eq!(page.events.last().expect("last event").seq, 3);
    assert!(page.events.last().expect("last event").payload.is_job_finished());

    let bound_job = reopened.lookup_job_by_turn(&thread_id, &turn_id).await.expect("lookup turn binding");
    assert_eq!(bound_job, Some(job_id));
}
