//! Integration tests for reconciliation: cached account totals versus
//! the ledger, and repair of drift.

use chrono::{TimeZone, Utc};
use kudos_core::{
    clock::{Clock, ManualClock},
    config::ActivityKind,
    engine::PointsEngine,
};
use std::sync::Arc;

fn build() -> (PointsEngine, Arc<ManualClock>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 6, 9, 0, 0).unwrap()));
    let engine = PointsEngine::build_test(clock.clone()).expect("build_test failed");
    (engine, clock)
}

#[test]
fn consistent_ledger_reports_no_drift() {
    let (engine, _clock) = build();

    engine.award("amy", ActivityKind::BlogPost, Some("p1")).unwrap();
    engine.award("ray", ActivityKind::PollVote, Some("v1")).unwrap();
    engine.record_daily_activity("ray").unwrap();

    assert!(engine.reconcile_all(false).unwrap().is_empty());
    let report = engine.reconcile("ray", false).unwrap();
    assert!(report.is_consistent());
    assert_eq!(report.ledger_total, 8);
    assert_eq!(report.cached_total, 8);
}

#[test]
fn drift_is_reported_without_repair() {
    let (engine, clock) = build();

    engine.award("amy", ActivityKind::CourseComplete, Some("c1")).unwrap();
    engine.award("amy", ActivityKind::CourseComplete, Some("c2")).unwrap();
    // Simulate a credit that never landed.
    engine
        .store()
        .overwrite_account_totals("amy", 50, 2, clock.now())
        .unwrap();

    let report = engine.reconcile("amy", false).unwrap();
    assert_eq!(report.ledger_total, 100);
    assert_eq!(report.cached_total, 50);
    assert_eq!(report.drift, 50);
    assert!(!report.repaired);

    let account = engine.store().get_account("amy").unwrap().unwrap();
    assert_eq!(account.total_points, 50);
}

#[test]
fn repair_restores_total_and_level_from_ledger() {
    let (engine, clock) = build();

    for course in 0..4 {
        engine
            .award("sol", ActivityKind::CourseComplete, Some(&format!("course-{course}")))
            .unwrap();
    }
    engine
        .store()
        .overwrite_account_totals("sol", 0, 1, clock.now())
        .unwrap();

    let drifted = engine.reconcile_all(true).unwrap();
    assert_eq!(drifted.len(), 1);
    assert_eq!(drifted[0].user_id, "sol");
    assert_eq!(drifted[0].drift, 200);
    assert!(drifted[0].repaired);

    let account = engine.store().get_account("sol").unwrap().unwrap();
    assert_eq!(account.total_points, 200);
    assert_eq!(account.level, 3);
    assert!(engine.reconcile("sol", false).unwrap().is_consistent());
}

#[test]
fn repair_can_lower_an_inflated_level() {
    let (engine, clock) = build();

    engine.award("tia", ActivityKind::BlogPost, Some("p1")).unwrap();
    engine
        .store()
        .overwrite_account_totals("tia", 500, 4, clock.now())
        .unwrap();

    let report = engine.reconcile("tia", true).unwrap();
    assert_eq!(report.drift, -485);

    let account = engine.store().get_account("tia").unwrap().unwrap();
    assert_eq!(account.total_points, 15);
    assert_eq!(account.level, 1);
}

#[test]
fn user_without_activity_is_consistent() {
    let (engine, _clock) = build();

    let report = engine.reconcile("ghost", true).unwrap();
    assert!(report.is_consistent());
    assert!(!report.repaired);
    assert!(engine.store().get_account("ghost").unwrap().is_none());
}
