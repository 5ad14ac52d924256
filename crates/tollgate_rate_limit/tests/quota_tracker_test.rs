//! Tests for multi-dimension admission.

use std::time::Duration;
use tokio::time::Instant;
use tollgate_core::BudgetConfig;
use tollgate_rate_limit::{
    Admission, DAY, Demand, MINUTE, QuotaDimension, QuotaTracker, QuotaUnit, RateLimitErrorKind,
    Reservation, tiers::OpenAITier,
};

fn granted(admission: Admission) -> Reservation {
    match admission {
        Admission::Granted(reservation) => reservation,
        Admission::Denied { wait_until } => panic!("denied until {:?}", wait_until),
    }
}

fn wait_until(admission: Admission) -> Instant {
    match admission {
        Admission::Denied { wait_until } => wait_until,
        Admission::Granted(_) => panic!("unexpectedly granted"),
    }
}

#[test]
fn test_rpm_window_rolls_over() {
    let tracker = QuotaTracker::new(vec![QuotaDimension::per_minute(
        "rpm",
        QuotaUnit::Requests,
        3,
    )]);
    let start = Instant::now();
    let one = Demand::new(1, 0, 0);

    for _ in 0..3 {
        granted(tracker.reserve_at(&one, start).unwrap());
    }
    let until = wait_until(tracker.reserve_at(&one, start).unwrap());
    assert_eq!(until, start + MINUTE);

    wait_until(tracker.reserve_at(&one, start + Duration::from_secs(59)).unwrap());
    granted(tracker.reserve_at(&one, start + MINUTE).unwrap());
}

#[test]
fn test_token_dimension_blocks_despite_request_headroom() {
    let tracker = QuotaTracker::new(vec![
        QuotaDimension::per_minute("rpm", QuotaUnit::Requests, 100),
        QuotaDimension::per_minute("tpm", QuotaUnit::Tokens, 1_000),
    ]);
    let start = Instant::now();
    let job = Demand::new(1, 400, 0);

    granted(tracker.reserve_at(&job, start).unwrap());
    granted(tracker.reserve_at(&job, start + Duration::from_secs(1)).unwrap());
    let until = wait_until(tracker.reserve_at(&job, start + Duration::from_secs(2)).unwrap());
    assert_eq!(until, start + MINUTE);
}

#[test]
fn test_wait_until_is_latest_constrained_dimension() {
    let tracker = QuotaTracker::new(vec![
        QuotaDimension::per_minute("rpm", QuotaUnit::Requests, 1),
        QuotaDimension::new("tp5m", QuotaUnit::Tokens, Duration::from_secs(300), 500),
    ]);
    let start = Instant::now();

    granted(tracker.reserve_at(&Demand::new(1, 500, 0), start).unwrap());
    let until = wait_until(tracker.reserve_at(&Demand::new(1, 1, 0), start).unwrap());
    assert_eq!(until, start + Duration::from_secs(300));
}

#[test]
fn test_demand_larger_than_capacity_is_rejected() {
    let tracker = QuotaTracker::new(vec![QuotaDimension::per_minute(
        "tpm",
        QuotaUnit::Tokens,
        1_000,
    )]);

    let err = tracker.reserve(&Demand::new(1, 1_001, 0)).unwrap_err();
    assert_eq!(
        err.kind(),
        &RateLimitErrorKind::DemandExceedsCapacity {
            dimension: "tpm".to_string(),
            demand: 1_001,
            capacity: 1_000,
        }
    );
}

#[test]
fn test_zero_amounts_ignore_dimension() {
    let tracker = QuotaTracker::new(vec![
        QuotaDimension::per_minute("rpm", QuotaUnit::Requests, 10),
        QuotaDimension::per_minute("upm", QuotaUnit::Units, 1),
    ]);
    let start = Instant::now();

    granted(tracker.reserve_at(&Demand::new(1, 0, 1), start).unwrap());
    // No units requested, so the saturated unit dimension does not apply.
    granted(tracker.reserve_at(&Demand::new(1, 0, 0), start).unwrap());
    wait_until(tracker.reserve_at(&Demand::new(1, 0, 1), start).unwrap());
}

#[test]
fn test_reconcile_releases_overestimated_tokens() {
    let tracker = QuotaTracker::new(vec![QuotaDimension::per_minute(
        "tpm",
        QuotaUnit::Tokens,
        1_000,
    )]);
    let start = Instant::now();

    let reservation = granted(tracker.reserve_at(&Demand::new(1, 900, 0), start).unwrap());
    wait_until(tracker.reserve_at(&Demand::new(1, 400, 0), start).unwrap());

    tracker.reconcile(&reservation, 300);
    granted(tracker.reserve_at(&Demand::new(1, 400, 0), start).unwrap());

    let usage = tracker.usage();
    assert_eq!(*usage[0].used(), 700);
    assert_eq!(*usage[0].remaining(), 300);
}

#[test]
fn test_reconcile_counts_usage_of_zero_token_estimate() {
    let tracker = QuotaTracker::new(vec![QuotaDimension::per_minute(
        "tpm",
        QuotaUnit::Tokens,
        1_000,
    )]);
    let start = Instant::now();

    let reservation = granted(tracker.reserve_at(&Demand::new(1, 0, 0), start).unwrap());
    tracker.reconcile(&reservation, 800);

    assert_eq!(*tracker.usage()[0].used(), 800);
    let until = wait_until(tracker.reserve_at(&Demand::new(1, 400, 0), start).unwrap());
    assert_eq!(until, start + MINUTE);
}

#[test]
fn test_throttle_beyond_clock_range_is_ignored() {
    let tracker = QuotaTracker::unlimited();
    let start = Instant::now();

    tracker.throttle_at(Duration::MAX, start);
    granted(tracker.reserve_at(&Demand::new(1, 0, 0), start).unwrap());

    // An unrepresentable throttle keeps the one already in effect.
    tracker.throttle_at(Duration::from_secs(30), start);
    tracker.throttle_at(Duration::MAX, start);
    let until = wait_until(tracker.reserve_at(&Demand::new(1, 0, 0), start).unwrap());
    assert_eq!(until, start + Duration::from_secs(30));
}

#[test]
fn test_throttle_blocks_all_admission() {
    let tracker = QuotaTracker::unlimited();
    let start = Instant::now();

    tracker.throttle_at(Duration::from_secs(20), start);
    let until = wait_until(tracker.reserve_at(&Demand::new(1, 0, 0), start).unwrap());
    assert_eq!(until, start + Duration::from_secs(20));

    // A shorter throttle does not shorten the current one.
    tracker.throttle_at(Duration::from_secs(5), start);
    let until = wait_until(
        tracker
            .reserve_at(&Demand::new(1, 0, 0), start + Duration::from_secs(10))
            .unwrap(),
    );
    assert_eq!(until, start + Duration::from_secs(20));

    granted(
        tracker
            .reserve_at(&Demand::new(1, 0, 0), start + Duration::from_secs(20))
            .unwrap(),
    );
}

#[test]
fn test_tighten_only_lowers_matching_dimensions() {
    let tracker = QuotaTracker::new(vec![
        QuotaDimension::per_minute("rpm", QuotaUnit::Requests, 500),
        QuotaDimension::per_day("rpd", QuotaUnit::Requests, 10_000),
    ]);

    assert_eq!(tracker.tighten(QuotaUnit::Requests, MINUTE, 100), 1);
    assert_eq!(tracker.tighten(QuotaUnit::Requests, MINUTE, 300), 0);

    let dims = tracker.dimensions();
    assert_eq!(*dims[0].capacity(), 100);
    assert_eq!(*dims[1].capacity(), 10_000);
    assert_eq!(*dims[1].window(), DAY);
}

#[test]
fn test_set_capacity_by_name() {
    let tracker = QuotaTracker::new(vec![QuotaDimension::per_minute(
        "rpm",
        QuotaUnit::Requests,
        1,
    )]);
    let start = Instant::now();
    let one = Demand::new(1, 0, 0);

    granted(tracker.reserve_at(&one, start).unwrap());
    wait_until(tracker.reserve_at(&one, start).unwrap());

    tracker.set_capacity("rpm", 2).unwrap();
    granted(tracker.reserve_at(&one, start).unwrap());

    let err = tracker.set_capacity("tpd", 5).unwrap_err();
    assert_eq!(
        err.kind(),
        &RateLimitErrorKind::UnknownDimension("tpd".to_string())
    );
}

#[test]
fn test_from_tier_applies_budget() {
    let budget = BudgetConfig::builder().rpm_multiplier(0.5).build();
    let tracker = QuotaTracker::from_tier(&OpenAITier::Tier1, &budget);

    let dims = tracker.dimensions();
    let names: Vec<&str> = dims.iter().map(|d| d.name().as_str()).collect();
    assert_eq!(names, vec!["rpm", "tpm", "rpd"]);
    assert_eq!(*dims[0].capacity(), 250);
    assert_eq!(*dims[1].capacity(), 200_000);
    assert_eq!(*dims[2].window(), DAY);
}

#[test]
fn test_time_never_runs_backwards() {
    let tracker = QuotaTracker::new(vec![QuotaDimension::per_minute(
        "rpm",
        QuotaUnit::Requests,
        1,
    )]);
    let start = Instant::now();
    let one = Demand::new(1, 0, 0);

    let late = granted(
        tracker
            .reserve_at(&one, start + Duration::from_secs(30))
            .unwrap(),
    );
    assert_eq!(*late.granted_at(), start + Duration::from_secs(30));

    let until = wait_until(tracker.reserve_at(&one, start).unwrap());
    assert_eq!(until, start + Duration::from_secs(90));
}
