//! kudos-runner: headless driver for the activity points ledger.
//!
//! Usage:
//!   kudos-runner --seed 12345 --users 50 --days 30 --db run.db
//!   kudos-runner --ipc-mode --db run.db --data-dir ./data

mod names;
mod traffic;

use anyhow::Result;
use chrono::{TimeZone, Utc};
use kudos_core::{
    award_engine::AwardOutcome,
    clock::ManualClock,
    config::{ActivityKind, PointsConfig},
    engine::PointsEngine,
    event::PointsEvent,
    member::Member,
    store::PointsStore,
    summary_service::{AdminSummaryOptions, LeaderboardPeriod},
};
use names::NameGenerator;
use serde_json::json;
use std::env;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use traffic::{Action, SimUser};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    Award {
        user_id:      String,
        kind:         String,
        #[serde(default)]
        reference_id: Option<String>,
    },
    Login {
        user_id: String,
    },
    Member {
        user_id: String,
        name:    String,
        email:   String,
        #[serde(default = "default_active")]
        active:  bool,
    },
    MemberActive {
        user_id: String,
        active:  bool,
    },
    UserSummary {
        user_id: String,
    },
    AdminSummary {
        #[serde(default)]
        options: AdminSummaryOptions,
    },
    Leaderboard {
        period: LeaderboardPeriod,
        #[serde(default = "default_leaderboard_limit")]
        limit:  u32,
    },
    Activity {
        user_id: String,
        #[serde(default = "default_page")]
        page:    u32,
        #[serde(default = "default_leaderboard_limit")]
        limit:   u32,
    },
    Config,
    AdvanceDays {
        days: i64,
    },
    Reconcile {
        #[serde(default)]
        user_id: Option<String>,
        #[serde(default)]
        repair:  bool,
    },
    Quit,
}

fn default_active() -> bool { true }
fn default_page() -> u32 { 1 }
fn default_leaderboard_limit() -> u32 { 10 }

/// Tallies of what a simulation run did.
#[derive(Debug, Default)]
struct RunCounts {
    logins:        u64,
    awarded:       u64,
    duplicate:     u64,
    capped:        u64,
    unknown_kind:  u64,
    failed:        u64,
    streak_bonus:  u64,
    level_ups:     u64,
    points_issued: i64,
}

impl RunCounts {
    fn record_award(&mut self, outcome: &AwardOutcome) {
        match outcome {
            AwardOutcome::Awarded { entry, level_change } => {
                self.awarded += 1;
                self.points_issued += entry.points_awarded;
                if level_change.is_some() {
                    self.level_ups += 1;
                }
            }
            AwardOutcome::Duplicate => self.duplicate += 1,
            AwardOutcome::DailyCapReached { .. } => self.capped += 1,
            AwardOutcome::UnknownKind => self.unknown_kind += 1,
            AwardOutcome::Failed { .. } => self.failed += 1,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let users = parse_arg(&args, "--users", 50u64);
    let days = parse_arg(&args, "--days", 30u32);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = string_arg(&args, "--db").unwrap_or(":memory:");
    let data_dir = string_arg(&args, "--data-dir").unwrap_or("./data");

    if !ipc_mode {
        println!("kudos-runner");
        println!("  seed:      {seed}");
        println!("  users:     {users}");
        println!("  days:      {days}");
        println!("  db:        {db}");
        println!("  data_dir:  {data_dir}");
        println!();
    }

    let config = load_config(data_dir)?;
    let store = if db == ":memory:" {
        PointsStore::in_memory()?
    } else {
        PointsStore::open(db)?
    };
    store.migrate()?;

    // Simulation starts on a fixed date so seeded runs are reproducible;
    // IPC sessions start at the current instant.
    let start = if ipc_mode {
        Utc::now()
    } else {
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0)
            .single()
            .ok_or_else(|| anyhow::anyhow!("invalid simulation start"))?
    };
    let clock = Arc::new(ManualClock::new(start));
    let engine = PointsEngine::build(store, Arc::new(config), clock.clone())?;

    if ipc_mode {
        run_ipc_loop(&engine, &clock)?;
    } else {
        let counts = simulate(&engine, &clock, seed, users, days)?;
        print_summary(&engine, &counts, days)?;
    }

    Ok(())
}

fn load_config(data_dir: &str) -> Result<PointsConfig> {
    if Path::new(data_dir).join("points").is_dir() {
        PointsConfig::load(data_dir)
    } else {
        log::warn!("no points config under {data_dir}; using built-in defaults");
        Ok(PointsConfig::default())
    }
}

// ── Simulation ─────────────────────────────────────────────────────

fn simulate(
    engine: &PointsEngine,
    clock: &ManualClock,
    seed: u64,
    users: u64,
    days: u32,
) -> Result<RunCounts> {
    let mut sim_users: Vec<SimUser> = (0..users).map(|i| SimUser::new(seed, i)).collect();
    for (index, user) in (0u64..).zip(&sim_users) {
        engine.upsert_member(&NameGenerator::member(&user.user_id, index, seed))?;
    }

    let mut counts = RunCounts::default();
    for day in 0..days {
        for user in sim_users.iter_mut() {
            for action in user.actions_for_day(day) {
                match action {
                    Action::Login => {
                        let Some(outcome) = engine.record_daily_activity(&user.user_id) else {
                            counts.failed += 1;
                            continue;
                        };
                        if outcome.login_award.is_some() {
                            counts.logins += 1;
                        }
                        if let Some(bonus) = &outcome.bonus_award {
                            counts.streak_bonus += 1;
                            counts.points_issued += bonus.points_awarded;
                        }
                        if let Some(login) = &outcome.login_award {
                            counts.points_issued += login.points_awarded;
                        }
                    }
                    Action::Act { kind, reference } => {
                        let outcome = engine.try_award(&user.user_id, kind, reference.as_deref());
                        counts.record_award(&outcome);
                    }
                }
            }
        }
        clock.advance_days(1);
        log::debug!("simulated day {}/{days}", day + 1);
    }
    Ok(counts)
}

fn print_summary(engine: &PointsEngine, counts: &RunCounts, days: u32) -> Result<()> {
    let admin = engine.admin_summary(&AdminSummaryOptions::default())?;
    let totals = &admin.platform_totals;

    println!("=== RUN SUMMARY ===");
    println!("  days run:        {days}");
    println!("  members:         {}", totals.user_count);
    println!("  logins credited: {}", counts.logins);
    println!("  awards:          {}", counts.awarded);
    println!("  duplicates:      {}", counts.duplicate);
    println!("  capped:          {}", counts.capped);
    println!("  unknown kind:    {}", counts.unknown_kind);
    println!("  failed:          {}", counts.failed);
    println!("  streak bonuses:  {}", counts.streak_bonus);
    println!("  level ups:       {}", counts.level_ups);
    println!("  points issued:   {}", counts.points_issued);
    println!("  ledger points:   {}", totals.total_points_awarded);
    println!("  ledger entries:  {}", totals.total_activity_count);
    println!("  avg per member:  {:.1}", totals.average_points_per_user);

    println!();
    println!("=== LEADERBOARD (All Time) ===");
    for row in engine.leaderboard(LeaderboardPeriod::AllTime, 10)? {
        println!(
            "  {:>2}. {:<24} {:>6} pts  L{} {}",
            row.rank, row.name, row.points, row.level, row.level_title
        );
    }

    println!();
    println!("=== LEADERBOARD (Last 7 Days) ===");
    for row in engine.leaderboard(LeaderboardPeriod::Weekly, 5)? {
        println!("  {:>2}. {:<24} {:>6} pts", row.rank, row.name, row.points);
    }

    println!();
    let drifted = engine.reconcile_all(false)?;
    if drifted.is_empty() {
        println!("=== RECONCILIATION: all accounts match the ledger ===");
    } else {
        println!("=== RECONCILIATION: {} account(s) drifted ===", drifted.len());
        for report in drifted {
            println!(
                "  {} cached {} ledger {} (drift {:+})",
                report.user_id, report.cached_total, report.ledger_total, report.drift
            );
        }
    }
    Ok(())
}

// ── IPC ────────────────────────────────────────────────────────────

fn run_ipc_loop(engine: &PointsEngine, clock: &ManualClock) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<IpcCommand>(&buffer) {
            Ok(IpcCommand::Quit) => break,
            Ok(cmd) => handle_command(engine, clock, cmd)
                .unwrap_or_else(|e| json!({ "error": e.to_string() })),
            Err(e) => json!({ "error": e.to_string() }),
        };
        writeln!(stdout, "{response}")?;
        stdout.flush()?;
    }
    Ok(())
}

fn handle_command(
    engine: &PointsEngine,
    clock: &ManualClock,
    cmd: IpcCommand,
) -> Result<serde_json::Value> {
    let value = match cmd {
        IpcCommand::Award { user_id, kind, reference_id } => match kind.parse::<ActivityKind>() {
            Ok(kind) => {
                let outcome = engine.try_award(&user_id, kind, reference_id.as_deref());
                let events = PointsEvent::from_award(&user_id, kind, &outcome);
                json!({ "outcome": outcome, "events": events })
            }
            Err(e) => {
                log::warn!("ipc: {e}; user {user_id} not credited");
                json!({ "outcome": AwardOutcome::UnknownKind, "events": [] })
            }
        },
        IpcCommand::Login { user_id } => match engine.record_daily_activity(&user_id) {
            Some(outcome) => {
                let events = PointsEvent::from_streak(&outcome);
                json!({ "streak": outcome, "events": events })
            }
            None => json!({ "error": "daily activity not recorded" }),
        },
        IpcCommand::Member { user_id, name, email, active } => {
            let mut member = Member::new(&user_id, &name, &email);
            member.active = active;
            engine.upsert_member(&member)?;
            json!({ "member": member })
        }
        IpcCommand::MemberActive { user_id, active } => {
            let found = engine.set_member_active(&user_id, active)?;
            json!({ "user_id": user_id, "active": active, "found": found })
        }
        IpcCommand::UserSummary { user_id } => serde_json::to_value(engine.user_summary(&user_id)?)?,
        IpcCommand::AdminSummary { options } => serde_json::to_value(engine.admin_summary(&options)?)?,
        IpcCommand::Leaderboard { period, limit } => {
            json!({ "period": period, "rows": engine.leaderboard(period, limit)? })
        }
        IpcCommand::Activity { user_id, page, limit } => {
            serde_json::to_value(engine.user_activity(&user_id, page, limit)?)?
        }
        IpcCommand::Config => json!({ "activities": engine.points_config() }),
        IpcCommand::AdvanceDays { days } => {
            clock.advance_days(days);
            json!({ "now": kudos_core::clock::Clock::now(clock) })
        }
        IpcCommand::Reconcile { user_id: Some(user_id), repair } => {
            json!({ "reports": [engine.reconcile(&user_id, repair)?] })
        }
        IpcCommand::Reconcile { user_id: None, repair } => {
            json!({ "reports": engine.reconcile_all(repair)? })
        }
        IpcCommand::Quit => json!({}),
    };
    Ok(value)
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
