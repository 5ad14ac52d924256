mod test_utils;

use std::sync::Arc;
use std::time::Duration;
use test_utils::{job, job_with_priority};
use tollgate_core::{JobState, Priority};
use tollgate_dispatch::{AdmissionScheduler, Admitted};
use tollgate_rate_limit::{QuotaDimension, QuotaTracker, QuotaUnit};

fn tokens_per_minute(capacity: u64) -> Arc<QuotaTracker> {
    Arc::new(QuotaTracker::new(vec![QuotaDimension::per_minute(
        "tpm",
        QuotaUnit::Tokens,
        capacity,
    )]))
}

fn granted(admitted: Option<Admitted>) -> tollgate_core::Job {
    match admitted {
        Some(Admitted::Granted { job, .. }) => job,
        other => panic!("Expected granted job, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_head_job_is_not_overtaken_by_smaller_job() {
    let scheduler = AdmissionScheduler::new(tokens_per_minute(1000));

    scheduler.push(job("first", 600), 0);
    scheduler.push(job("big", 600), 1);
    scheduler.push(job("small", 100), 2);

    assert_eq!(granted(scheduler.next_admitted().await).id(), job("first", 600).id());

    // 400 tokens are free, enough for "small" but not for "big" at the head.
    let waiting = tokio::time::timeout(Duration::from_secs(1), scheduler.next_admitted()).await;
    assert!(waiting.is_err());
    assert_eq!(scheduler.len(), 2);

    let next = granted(scheduler.next_admitted().await);
    assert_eq!(next.id(), job("big", 600).id());
    assert_eq!(*next.state(), JobState::Admitted);
}

#[tokio::test(start_paused = true)]
async fn test_closed_empty_scheduler_returns_none() {
    let scheduler = AdmissionScheduler::new(Arc::new(QuotaTracker::unlimited()));
    scheduler.close();
    assert!(scheduler.next_admitted().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_closed_scheduler_still_drains_queued_jobs() {
    let scheduler = AdmissionScheduler::new(Arc::new(QuotaTracker::unlimited()));
    scheduler.push(job("a", 10), 0);
    scheduler.close();

    granted(scheduler.next_admitted().await);
    assert!(scheduler.next_admitted().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_push_wakes_waiting_worker() {
    let scheduler = Arc::new(AdmissionScheduler::new(Arc::new(QuotaTracker::unlimited())));

    let waiter = {
        let scheduler = Arc::clone(&scheduler);
        tokio::spawn(async move { scheduler.next_admitted().await })
    };
    tokio::task::yield_now().await;
    assert!(!waiter.is_finished());

    scheduler.push(job("late", 10), 0);
    let admitted = tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(granted(admitted).id(), job("late", 10).id());
}

#[tokio::test(start_paused = true)]
async fn test_oversized_job_is_rejected() {
    let scheduler = AdmissionScheduler::new(tokens_per_minute(1000));
    scheduler.push(job("huge", 1001), 0);

    match scheduler.next_admitted().await {
        Some(Admitted::Rejected { job: rejected, seq, .. }) => {
            assert_eq!(rejected.id(), job("huge", 1001).id());
            assert_eq!(seq, 0);
            assert_eq!(*rejected.attempts(), 0);
        }
        other => panic!("Expected rejection, got {:?}", other),
    }
    assert!(scheduler.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_priority_then_submission_order() {
    let scheduler = AdmissionScheduler::new(Arc::new(QuotaTracker::unlimited()));
    scheduler.push(job_with_priority("a", Priority::Low), 0);
    scheduler.push(job_with_priority("b", Priority::Normal), 1);
    scheduler.push(job_with_priority("c", Priority::High), 2);
    scheduler.push(job_with_priority("d", Priority::Normal), 3);

    let mut order = Vec::new();
    while !scheduler.is_empty() {
        order.push(granted(scheduler.next_admitted().await).id().to_string());
    }

    let expected: Vec<String> = ["c", "b", "d", "a"]
        .iter()
        .map(|doc| job(doc, 10).id().to_string())
        .collect();
    assert_eq!(order, expected);
}

#[tokio::test(start_paused = true)]
async fn test_requeued_job_keeps_its_place() {
    let scheduler = AdmissionScheduler::new(Arc::new(QuotaTracker::unlimited()));
    scheduler.push(job("first", 10), 0);
    scheduler.push(job("second", 10), 1);

    let first = granted(scheduler.next_admitted().await);
    scheduler.push(first, 0);

    let again = granted(scheduler.next_admitted().await);
    assert_eq!(again.id(), job("first", 10).id());
}
