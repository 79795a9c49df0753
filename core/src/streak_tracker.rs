//! Streak tracker — daily login bookkeeping.
//!
//! Called once per successful authentication. Credits DAILY_LOGIN,
//! advances or resets the consecutive-day streak, and pays STREAK_BONUS
//! once the streak reaches the configured threshold.
//!
//! RULE: Authentication must never fail because of this module.
//! `record_daily_activity` absorbs and logs every error.

use crate::{
    award_engine::AwardEngine,
    config::ActivityKind,
    error::{LedgerError, LedgerResult},
    ledger::LedgerEntry,
};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Compare-and-set attempts before giving up on a contended streak update.
const STREAK_CAS_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakChange {
    /// First recorded activity for this account.
    Started,
    /// Active yesterday; streak grew by one.
    Extended,
    /// A gap of one or more days; streak restarted at 1.
    Reset,
    /// Already recorded today; nothing changed.
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreakOutcome {
    pub user_id:        String,
    pub change:         StreakChange,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub active_on:      NaiveDate,
    pub login_award:    Option<LedgerEntry>,
    pub bonus_award:    Option<LedgerEntry>,
}

/// The next streak value given the last active day.
pub fn next_streak(last_active: Option<NaiveDate>, today: NaiveDate, current: u32) -> (StreakChange, u32) {
    match last_active {
        Some(last) if last == today => (StreakChange::Unchanged, current),
        Some(last) if last + Duration::days(1) == today => {
            (StreakChange::Extended, current.saturating_add(1))
        }
        Some(_) => (StreakChange::Reset, 1),
        None => (StreakChange::Started, 1),
    }
}

pub struct StreakTracker<'a> {
    engine: &'a AwardEngine,
}

impl<'a> StreakTracker<'a> {
    pub fn new(engine: &'a AwardEngine) -> Self {
        Self { engine }
    }

    /// Record that `user_id` was active today. Returns `None` if the
    /// bookkeeping failed (the failure is logged, never raised).
    pub fn record_daily_activity(&self, user_id: &str) -> Option<StreakOutcome> {
        match self.record_inner(user_id) {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                log::error!("streak: daily activity for {user_id} not recorded: {e}");
                None
            }
        }
    }

    fn record_inner(&self, user_id: &str) -> LedgerResult<StreakOutcome> {
        let store = self.engine.store();
        let config = self.engine.config();

        // DAILY_LOGIN has daily_limit = 1, so this is idempotent per day.
        let login_award = self.engine.award(user_id, ActivityKind::DailyLogin, None);

        let now = self.engine.clock().now();
        let today = config.day_boundary.day_of(now);
        store.ensure_account(user_id, config.levels.base().level, now)?;

        let mut settled = None;
        for _ in 0..STREAK_CAS_ATTEMPTS {
            let state = store
                .streak_state(user_id)?
                .ok_or_else(|| LedgerError::Corrupt(format!("account {user_id} vanished")))?;
            let (change, streak) = next_streak(state.last_active_date, today, state.current_streak);

            if change == StreakChange::Unchanged {
                settled = Some((change, streak, state.longest_streak));
                break;
            }
            if store.compare_and_set_streak(user_id, state.last_active_date, streak, today, now)? {
                settled = Some((change, streak, state.longest_streak.max(streak)));
                break;
            }
            // Another login for this user updated the streak between our
            // read and write; re-read and decide again.
            log::debug!("streak: concurrent update for {user_id}, retrying");
        }

        let (change, current_streak, longest_streak) = settled.ok_or_else(|| {
            LedgerError::Other(anyhow::anyhow!(
                "streak for {user_id} still contended after {STREAK_CAS_ATTEMPTS} attempts"
            ))
        })?;

        match change {
            StreakChange::Reset => log::debug!("streak: {user_id} reset to 1"),
            StreakChange::Extended if current_streak == config.streak_threshold => {
                log::info!("streak: {user_id} reached {current_streak} consecutive days")
            }
            _ => {}
        }

        // STREAK_BONUS has daily_limit = 1: at most one bonus per day
        // while the streak holds.
        let bonus_award = if change != StreakChange::Unchanged
            && current_streak >= config.streak_threshold
        {
            self.engine.award(user_id, ActivityKind::StreakBonus, None)
        } else {
            None
        };

        Ok(StreakOutcome {
            user_id: user_id.to_string(),
            change,
            current_streak,
            longest_streak,
            active_on: today,
            login_award,
            bonus_award,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    #[test]
    fn first_activity_starts_at_one() {
        assert_eq!(next_streak(None, d(10), 0), (StreakChange::Started, 1));
    }

    #[test]
    fn consecutive_day_extends() {
        assert_eq!(next_streak(Some(d(9)), d(10), 4), (StreakChange::Extended, 5));
    }

    #[test]
    fn same_day_is_unchanged() {
        assert_eq!(next_streak(Some(d(10)), d(10), 4), (StreakChange::Unchanged, 4));
    }

    #[test]
    fn gap_resets() {
        assert_eq!(next_streak(Some(d(7)), d(10), 9), (StreakChange::Reset, 1));
    }

    #[test]
    fn future_last_active_resets() {
        assert_eq!(next_streak(Some(d(12)), d(10), 3), (StreakChange::Reset, 1));
    }

    #[test]
    fn month_boundary_counts_as_consecutive() {
        let last = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(next_streak(Some(last), today, 2), (StreakChange::Extended, 3));
    }
}
