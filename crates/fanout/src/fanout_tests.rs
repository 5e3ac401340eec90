use super::*;
use ac_core::{EventPayload, JobId, JobState};
use chrono::Utc;

fn finished_event(job_id: JobId, seq: i64) -> Event {
    Event::new(job_id, seq, Utc::now(), EventPayload::JobFinished { state: JobState::Done, error_message: None })
}

fn state_event(job_id: JobId, seq: i64) -> Event {
    Event::new(job_id, seq, Utc::now(), EventPayload::JobState { state: JobState::Running, error_message: None })
}

#[tokio::test]
async fn publish_delivers_to_all_subscribers_of_the_job() {
    let fanout = FanOut::new();
    let job_id = JobId::new();
    let mut sub_a = fanout.subscribe(job_id);
    let mut sub_b = fanout.subscribe(job_id);
    assert_eq!(fanout.subscriber_count(job_id), 2);

    fanout.publish(&state_event(job_id, 0));

    assert_eq!(sub_a.rx.recv().await.unwrap().seq, 0);
    assert_eq!(sub_b.rx.recv().await.unwrap().seq, 0);
}

#[tokio::test]
async fn publish_is_scoped_to_its_own_job() {
    let fanout = FanOut::new();
    let job_a = JobId::new();
    let job_b = JobId::new();
    let mut sub_a = fanout.subscribe(job_a);
    let _sub_b = fanout.subscribe(job_b);

    fanout.publish(&state_event(job_a, 0));

    assert_eq!(sub_a.rx.recv().await.unwrap().seq, 0);
    assert_eq!(fanout.subscriber_count(job_b), 1);
}

#[tokio::test]
async fn full_queue_evicts_the_slow_subscriber_without_blocking() {
    let fanout = FanOut::with_capacity(2);
    let job_id = JobId::new();
    let mut slow = fanout.subscribe(job_id);

    // Fill the subscriber's bounded queue past capacity; publish must not
    // block or panic, it must evict the subscriber instead.
    for seq in 0..5 {
        fanout.publish(&state_event(job_id, seq));
    }

    assert_eq!(fanout.subscriber_count(job_id), 0);
    let reason = slow.done.await.expect("done signal should fire");
    assert_eq!(reason, CloseReason::SlowConsumer);
}

#[tokio::test]
async fn a_fast_subscriber_is_unaffected_by_a_slow_sibling() {
    let fanout = FanOut::with_capacity(1);
    let job_id = JobId::new();
    let mut slow = fanout.subscribe(job_id);
    let mut fast = fanout.subscribe(job_id);

    fanout.publish(&state_event(job_id, 0));
    // drain the fast one immediately so it never overflows
    assert_eq!(fast.rx.recv().await.unwrap().seq, 0);

    // leave `slow`'s single buffered event undrained and overflow it
    fanout.publish(&state_event(job_id, 1));
    fanout.publish(&state_event(job_id, 2));

    assert_eq!(slow.done.await.unwrap(), CloseReason::SlowConsumer);
    assert_eq!(fast.rx.recv().await.unwrap().seq, 1);
    assert_eq!(fast.rx.recv().await.unwrap().seq, 2);
}

#[tokio::test]
async fn job_finished_drains_then_closes_the_channel() {
    let fanout = FanOut::new();
    let job_id = JobId::new();
    let mut sub = fanout.subscribe(job_id);

    fanout.publish(&state_event(job_id, 0));
    fanout.publish(&finished_event(job_id, 1));

    assert_eq!(sub.rx.recv().await.unwrap().seq, 0);
    let last = sub.rx.recv().await.unwrap();
    assert!(last.is_job_finished());
    assert!(sub.rx.recv().await.is_none(), "channel should close after job.finished is drained");
    assert_eq!(fanout.subscriber_count(job_id), 0);
}

#[tokio::test]
async fn publish_to_a_job_with_no_subscribers_is_a_no_op() {
    let fanout = FanOut::new();
    let job_id = JobId::new();
    fanout.publish(&state_event(job_id, 0));
    assert_eq!(fanout.subscriber_count(job_id), 0);
}

#[tokio::test]
async fn dropped_receiver_is_pruned_on_next_publish() {
    let fanout = FanOut::new();
    let job_id = JobId::new();
    let sub = fanout.subscribe(job_id);
    drop(sub);

    fanout.publish(&state_event(job_id, 0));
    assert_eq!(fanout.subscriber_count(job_id), 0);
}
