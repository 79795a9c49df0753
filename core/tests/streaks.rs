//! Integration tests for daily activity: login credit, consecutive-day
//! streaks and the streak bonus.

use chrono::{Duration, TimeZone, Utc};
use kudos_core::{
    clock::ManualClock,
    config::ActivityKind,
    engine::PointsEngine,
    event::PointsEvent,
    streak_tracker::StreakChange,
};
use std::sync::Arc;

fn build() -> (PointsEngine, Arc<ManualClock>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 6, 8, 30, 0).unwrap()));
    let engine = PointsEngine::build_test(clock.clone()).expect("build_test failed");
    (engine, clock)
}

#[test]
fn three_consecutive_days_build_a_streak_of_three() {
    let (engine, clock) = build();

    let mut changes = Vec::new();
    for _ in 0..3 {
        let outcome = engine.record_daily_activity("ana").unwrap();
        assert!(outcome.login_award.is_some());
        changes.push((outcome.change, outcome.current_streak));
        clock.advance_days(1);
    }

    assert_eq!(
        changes,
        vec![
            (StreakChange::Started, 1),
            (StreakChange::Extended, 2),
            (StreakChange::Extended, 3),
        ]
    );
    let account = engine.store().get_account("ana").unwrap().unwrap();
    assert_eq!(account.current_streak, 3);
    assert_eq!(account.longest_streak, 3);
    assert_eq!(account.total_points, 15);
}

#[test]
fn second_login_same_day_changes_nothing() {
    let (engine, clock) = build();

    engine.record_daily_activity("ben").unwrap();
    clock.advance(Duration::hours(6));
    let again = engine.record_daily_activity("ben").unwrap();

    assert_eq!(again.change, StreakChange::Unchanged);
    assert_eq!(again.current_streak, 1);
    assert!(again.login_award.is_none());
    assert!(again.bonus_award.is_none());
    assert_eq!(engine.store().ledger_entry_count("ben").unwrap(), 1);
}

#[test]
fn missed_day_resets_streak_to_one() {
    let (engine, clock) = build();

    engine.record_daily_activity("cy").unwrap();
    clock.advance_days(1);
    engine.record_daily_activity("cy").unwrap();
    clock.advance_days(2);
    let outcome = engine.record_daily_activity("cy").unwrap();

    assert_eq!(outcome.change, StreakChange::Reset);
    assert_eq!(outcome.current_streak, 1);
    assert_eq!(outcome.longest_streak, 2);

    let account = engine.store().get_account("cy").unwrap().unwrap();
    assert_eq!(account.last_active_date, Some(outcome.active_on));
    assert_eq!(account.longest_streak, 2);
}

#[test]
fn streak_follows_calendar_days_not_elapsed_hours() {
    let (engine, clock) = build();
    clock.set(Utc.with_ymd_and_hms(2024, 5, 6, 23, 30, 0).unwrap());

    engine.record_daily_activity("dee").unwrap();
    clock.advance(Duration::hours(1));
    let outcome = engine.record_daily_activity("dee").unwrap();

    assert_eq!(outcome.change, StreakChange::Extended);
    assert_eq!(outcome.current_streak, 2);
}

#[test]
fn bonus_pays_from_the_seventh_day_once_per_day() {
    let (engine, clock) = build();

    for day in 1..=6 {
        let outcome = engine.record_daily_activity("eve").unwrap();
        assert!(outcome.bonus_award.is_none(), "no bonus expected on day {day}");
        clock.advance_days(1);
    }

    let seventh = engine.record_daily_activity("eve").unwrap();
    assert_eq!(seventh.current_streak, 7);
    let bonus = seventh.bonus_award.expect("bonus on day 7");
    assert_eq!(bonus.activity_kind, ActivityKind::StreakBonus);
    assert_eq!(bonus.points_awarded, 20);

    // Logging in again the same day pays nothing more.
    clock.advance(Duration::hours(2));
    let again = engine.record_daily_activity("eve").unwrap();
    assert!(again.bonus_award.is_none());

    clock.advance_days(1);
    let eighth = engine.record_daily_activity("eve").unwrap();
    assert_eq!(eighth.current_streak, 8);
    assert!(eighth.bonus_award.is_some());

    // Break the streak: no bonus after the reset.
    clock.advance_days(2);
    let reset = engine.record_daily_activity("eve").unwrap();
    assert_eq!(reset.change, StreakChange::Reset);
    assert!(reset.bonus_award.is_none());

    let account = engine.store().get_account("eve").unwrap().unwrap();
    // 9 logins × 5 + 2 bonuses × 20
    assert_eq!(account.total_points, 85);
    assert_eq!(account.current_streak, 1);
    assert_eq!(account.longest_streak, 8);
}

#[test]
fn login_credit_counts_toward_other_activity_totals() {
    let (engine, _clock) = build();

    engine.award("fay", ActivityKind::BlogPost, Some("post-1"));
    let outcome = engine.record_daily_activity("fay").unwrap();
    assert_eq!(outcome.current_streak, 1);

    let account = engine.store().get_account("fay").unwrap().unwrap();
    assert_eq!(account.total_points, 20);
    assert_eq!(account.history.len(), 2);
}

#[test]
fn streak_outcome_maps_to_events() {
    let (engine, _clock) = build();

    let first = engine.record_daily_activity("gus").unwrap();
    let events = PointsEvent::from_streak(&first);
    assert!(matches!(
        events.as_slice(),
        [
            PointsEvent::PointsAwarded { points: 5, .. },
            PointsEvent::StreakUpdated { change: StreakChange::Started, current_streak: 1, .. },
        ]
    ));

    let again = engine.record_daily_activity("gus").unwrap();
    assert!(PointsEvent::from_streak(&again).is_empty());
}
