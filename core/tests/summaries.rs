//! Integration tests for the read side: user summary, admin table,
//! leaderboards and the activity feed.

use chrono::{Duration, TimeZone, Utc};
use kudos_core::{
    clock::ManualClock,
    config::ActivityKind,
    engine::PointsEngine,
    member::Member,
    store::{AdminSortKey, SortOrder},
    summary_service::{AdminSummaryOptions, LeaderboardPeriod},
};
use std::sync::Arc;

fn build() -> (PointsEngine, Arc<ManualClock>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 6, 12, 0, 0).unwrap()));
    let engine = PointsEngine::build_test(clock.clone()).expect("build_test failed");
    (engine, clock)
}

/// Four members; Dave is deactivated.
/// Points: alice 65, bob 30, carol 0, dave 50.
fn seed_members(engine: &PointsEngine) {
    for (id, name, email) in [
        ("u-alice", "Alice Archer", "alice@example.org"),
        ("u-bob", "Bob Baker", "bob@sample.net"),
        ("u-carol", "Carol Cole", "carol@example.org"),
        ("u-dave", "Dave Dunn", "dave@example.org"),
    ] {
        engine.upsert_member(&Member::new(id, name, email)).unwrap();
    }
    let mut dave = Member::new("u-dave", "Dave Dunn", "dave@example.org");
    dave.active = false;
    engine.upsert_member(&dave).unwrap();

    engine.award("u-alice", ActivityKind::BlogPost, Some("a-post")).unwrap();
    engine.award("u-alice", ActivityKind::CourseComplete, Some("a-course")).unwrap();
    for poll in 0..10 {
        engine.award("u-bob", ActivityKind::PollVote, Some(&format!("b-poll-{poll}"))).unwrap();
    }
    engine.award("u-dave", ActivityKind::CourseComplete, Some("d-course")).unwrap();
}

// ─────────────────────────────────────────────────────────────────────────────
// User summary
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn unknown_user_gets_an_empty_summary() {
    let (engine, _clock) = build();

    let summary = engine.user_summary("nobody").unwrap();
    assert_eq!(summary.total_points, 0);
    assert_eq!(summary.weekly_points, 0);
    assert_eq!(summary.current_streak, 0);
    assert_eq!(summary.level.level, 1);
    assert_eq!(summary.level.title, "Newcomer");
    assert_eq!(summary.level.points_to_next, Some(50));
    assert!(summary.breakdown.is_empty());
    assert!(summary.recent_history.is_empty());
    assert_eq!(summary.points_config.len(), engine.config().activities.len());
}

#[test]
fn weekly_points_only_cover_the_trailing_window() {
    let (engine, clock) = build();

    engine.award("ola", ActivityKind::CourseComplete, Some("old-course")).unwrap();
    clock.advance_days(8);
    engine.award("ola", ActivityKind::BlogPost, Some("fresh-post")).unwrap();
    engine.award("ola", ActivityKind::BlogComment, Some("fresh-comment")).unwrap();

    let summary = engine.user_summary("ola").unwrap();
    assert_eq!(summary.total_points, 70);
    assert_eq!(summary.weekly_points, 20);
    assert_eq!(summary.level.level, 2);
    assert_eq!(summary.level.title, "Contributor");
    assert_eq!(summary.level.points_to_next, Some(80));
}

#[test]
fn breakdown_is_ordered_by_points() {
    let (engine, _clock) = build();

    for i in 0..4 {
        engine.award("pat", ActivityKind::BlogLike, Some(&format!("like-{i}"))).unwrap();
    }
    engine.award("pat", ActivityKind::BlogPost, Some("post")).unwrap();
    for i in 0..2 {
        engine.award("pat", ActivityKind::PollVote, Some(&format!("poll-{i}"))).unwrap();
    }

    let summary = engine.user_summary("pat").unwrap();
    let order: Vec<_> = summary
        .breakdown
        .iter()
        .map(|b| (b.activity_kind, b.count, b.points))
        .collect();
    assert_eq!(
        order,
        vec![
            (ActivityKind::BlogPost, 1, 15),
            (ActivityKind::PollVote, 2, 6),
            (ActivityKind::BlogLike, 4, 4),
        ]
    );
    assert_eq!(summary.recent_history.len(), 7);
}

// ─────────────────────────────────────────────────────────────────────────────
// Admin summary
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn admin_summary_sorts_by_total_points_by_default() {
    let (engine, _clock) = build();
    seed_members(&engine);

    let summary = engine.admin_summary(&AdminSummaryOptions::default()).unwrap();
    let ids: Vec<_> = summary.rows.iter().map(|r| r.user_id.as_str()).collect();
    assert_eq!(ids, vec!["u-alice", "u-bob", "u-carol"]);

    let alice = &summary.rows[0];
    assert_eq!(alice.total_points, 65);
    assert_eq!(alice.weekly_points, 65);
    assert_eq!(alice.level, 2);
    assert_eq!(alice.level_title, "Contributor");
    assert_eq!(alice.activity_count, 2);
    assert_eq!(alice.breakdown[0].activity_kind, ActivityKind::CourseComplete);

    let carol = &summary.rows[2];
    assert_eq!(carol.total_points, 0);
    assert_eq!(carol.level, 1);
    assert!(carol.breakdown.is_empty());
}

#[test]
fn admin_summary_search_is_case_insensitive_on_name_and_email() {
    let (engine, _clock) = build();
    seed_members(&engine);

    let by_name = engine
        .admin_summary(&AdminSummaryOptions { search: Some("ARCHER".into()), ..Default::default() })
        .unwrap();
    assert_eq!(by_name.rows.len(), 1);
    assert_eq!(by_name.rows[0].user_id, "u-alice");
    assert_eq!(by_name.pagination.total_rows, 1);

    let by_email = engine
        .admin_summary(&AdminSummaryOptions { search: Some("example.org".into()), ..Default::default() })
        .unwrap();
    let ids: Vec<_> = by_email.rows.iter().map(|r| r.user_id.as_str()).collect();
    // Dave matches but is inactive.
    assert_eq!(ids, vec!["u-alice", "u-carol"]);

    // Totals ignore the search filter.
    assert_eq!(by_email.platform_totals.user_count, 3);
    assert_eq!(by_email.platform_totals.total_points_awarded, 95);
}

#[test]
fn blank_search_matches_everyone() {
    let (engine, _clock) = build();
    seed_members(&engine);

    let summary = engine
        .admin_summary(&AdminSummaryOptions { search: Some("   ".into()), ..Default::default() })
        .unwrap();
    assert_eq!(summary.pagination.total_rows, 3);
}

#[test]
fn admin_summary_paginates() {
    let (engine, _clock) = build();
    seed_members(&engine);

    let options = AdminSummaryOptions { limit: 2, ..Default::default() };
    let first = engine.admin_summary(&options).unwrap();
    assert_eq!(first.rows.len(), 2);
    assert_eq!(first.pagination.total_rows, 3);
    assert_eq!(first.pagination.total_pages, 2);

    let second = engine
        .admin_summary(&AdminSummaryOptions { page: 2, ..options.clone() })
        .unwrap();
    assert_eq!(second.rows.len(), 1);
    assert_eq!(second.rows[0].user_id, "u-carol");

    let beyond = engine
        .admin_summary(&AdminSummaryOptions { page: 5, ..options })
        .unwrap();
    assert!(beyond.rows.is_empty());

    let clamped = engine
        .admin_summary(&AdminSummaryOptions { limit: 10_000, page: 0, ..Default::default() })
        .unwrap();
    assert_eq!(clamped.pagination.limit, 100);
    assert_eq!(clamped.pagination.page, 1);
}

#[test]
fn admin_summary_sorts_on_requested_column() {
    let (engine, _clock) = build();
    seed_members(&engine);
    engine.record_daily_activity("u-carol").unwrap();

    let by_streak_asc = engine
        .admin_summary(&AdminSummaryOptions {
            sort_by: AdminSortKey::CurrentStreak,
            sort_order: SortOrder::Asc,
            ..Default::default()
        })
        .unwrap();
    let ids: Vec<_> = by_streak_asc.rows.iter().map(|r| r.user_id.as_str()).collect();
    // Ties fall back to user id.
    assert_eq!(ids, vec!["u-alice", "u-bob", "u-carol"]);

    let by_activity = engine
        .admin_summary(&AdminSummaryOptions {
            sort_by: "activityCount".parse().unwrap(),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(by_activity.rows[0].user_id, "u-bob");
    assert_eq!(by_activity.rows[0].activity_count, 10);
}

#[test]
fn platform_totals_cover_active_members() {
    let (engine, _clock) = build();
    seed_members(&engine);

    let totals = engine
        .admin_summary(&AdminSummaryOptions::default())
        .unwrap()
        .platform_totals;
    assert_eq!(totals.user_count, 3);
    assert_eq!(totals.total_points_awarded, 95);
    assert_eq!(totals.total_activity_count, 12);
    assert!((totals.average_points_per_user - 95.0 / 3.0).abs() < 1e-9);
}

#[test]
fn deactivated_member_leaves_totals_and_leaderboard() {
    let (engine, _clock) = build();
    seed_members(&engine);

    assert!(engine.set_member_active("u-bob", false).unwrap());
    assert!(!engine.set_member_active("u-nobody", false).unwrap());

    let totals = engine
        .admin_summary(&AdminSummaryOptions::default())
        .unwrap()
        .platform_totals;
    assert_eq!(totals.user_count, 2);
    assert_eq!(totals.total_points_awarded, 65);
    let board = engine.leaderboard(LeaderboardPeriod::AllTime, 10).unwrap();
    assert_eq!(board.len(), 1);
    assert_eq!(board[0].user_id, "u-alice");
    // The ledger still holds Bob's points.
    assert_eq!(engine.user_summary("u-bob").unwrap().total_points, 30);

    assert!(engine.set_member_active("u-dave", true).unwrap());
    let board = engine.leaderboard(LeaderboardPeriod::AllTime, 10).unwrap();
    assert_eq!(board[1].user_id, "u-dave");
}

// ─────────────────────────────────────────────────────────────────────────────
// Leaderboards and activity feed
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn all_time_leaderboard_ranks_active_members() {
    let (engine, _clock) = build();
    seed_members(&engine);

    let board = engine.leaderboard(LeaderboardPeriod::AllTime, 10).unwrap();
    let ranked: Vec<_> = board
        .iter()
        .map(|r| (r.rank, r.user_id.as_str(), r.points))
        .collect();
    assert_eq!(ranked, vec![(1, "u-alice", 65), (2, "u-bob", 30)]);
    assert_eq!(board[0].level_title, "Contributor");
}

#[test]
fn weekly_leaderboard_uses_recent_points() {
    let (engine, clock) = build();
    seed_members(&engine);

    clock.advance_days(8);
    for poll in 10..15 {
        engine.award("u-bob", ActivityKind::PollVote, Some(&format!("b-poll-{poll}"))).unwrap();
    }
    engine.award("u-carol", ActivityKind::BlogComment, Some("c-comment")).unwrap();

    let board = engine.leaderboard(LeaderboardPeriod::Weekly, 10).unwrap();
    let ranked: Vec<_> = board
        .iter()
        .map(|r| (r.rank, r.user_id.as_str(), r.points))
        .collect();
    assert_eq!(ranked, vec![(1, "u-bob", 15), (2, "u-carol", 5)]);

    let top = engine.leaderboard(LeaderboardPeriod::AllTime, 1).unwrap();
    assert_eq!(top[0].user_id, "u-alice");
    assert_eq!(top.len(), 1);
}

#[test]
fn activity_feed_pages_newest_first() {
    let (engine, clock) = build();

    for poll in 0..5 {
        engine.award("quin", ActivityKind::PollVote, Some(&format!("poll-{poll}"))).unwrap();
        clock.advance(Duration::minutes(1));
    }

    let first = engine.user_activity("quin", 1, 2).unwrap();
    let refs: Vec<_> = first
        .entries
        .iter()
        .map(|e| e.reference_id.as_deref().unwrap())
        .collect();
    assert_eq!(refs, vec!["poll-4", "poll-3"]);
    assert_eq!(first.pagination.total_rows, 5);
    assert_eq!(first.pagination.total_pages, 3);

    let last = engine.user_activity("quin", 3, 2).unwrap();
    assert_eq!(last.entries.len(), 1);
    assert_eq!(last.entries[0].reference_id.as_deref(), Some("poll-0"));
}

#[test]
fn points_config_lists_every_configured_kind() {
    let (engine, _clock) = build();

    let catalog = engine.points_config();
    assert!(catalog.iter().all(|c| c.points > 0));
    assert!(catalog.iter().any(|c| c.kind == ActivityKind::DailyLogin));
    assert!(!catalog.iter().any(|c| c.kind == ActivityKind::NewsComment));
}
