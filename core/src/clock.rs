//! Ledger clock and calendar-day bucketing.
//!
//! RULE: Nothing in the ledger reads the wall clock directly.
//! Every "now" flows through a `Clock`, so tests and the runner can
//! drive day boundaries deterministically with a `ManualClock`.

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(start) }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *self.lock() = instant;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.lock();
        *now += by;
    }

    pub fn advance_days(&self, days: i64) {
        self.advance(Duration::days(days));
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
        self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.lock()
    }
}

/// Which midnight ends a "day" for daily caps and streaks.
///
/// `Local` follows the server's timezone. `FixedOffset` pins the boundary
/// to a UTC offset so results do not depend on where the process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "zone", rename_all = "snake_case")]
pub enum DayBoundary {
    #[default]
    Local,
    FixedOffset { minutes: i32 },
}

impl DayBoundary {
    pub const UTC: DayBoundary = DayBoundary::FixedOffset { minutes: 0 };

    /// The calendar day `instant` falls on.
    pub fn day_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        match self {
            Self::Local => instant.with_timezone(&Local).date_naive(),
            Self::FixedOffset { minutes } => {
                instant.with_timezone(&fixed_offset(*minutes)).date_naive()
            }
        }
    }

    /// The first instant of `day`.
    pub fn start_of(&self, day: NaiveDate) -> DateTime<Utc> {
        let midnight = day.and_time(NaiveTime::MIN);
        match self {
            Self::Local => Local
                .from_local_datetime(&midnight)
                .earliest()
                // Midnight skipped by a DST jump: the day starts one hour later.
                .or_else(|| Local.from_local_datetime(&(midnight + Duration::hours(1))).earliest())
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or_else(|| Utc.from_utc_datetime(&midnight)),
            Self::FixedOffset { minutes } => {
                let offset = fixed_offset(*minutes);
                Utc.from_utc_datetime(&(midnight - offset.fix()))
            }
        }
    }

    /// Half-open window `[day_start, next_day_start)`.
    pub fn window(&self, day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        (self.start_of(day), self.start_of(day + Duration::days(1)))
    }

    pub fn is_valid(&self) -> bool {
        match self {
            Self::Local => true,
            Self::FixedOffset { minutes } => minutes.unsigned_abs() < 24 * 60,
        }
    }
}

/// Out-of-range offsets fall back to UTC; `is_valid` rejects them at load.
fn fixed_offset(minutes: i32) -> chrono::FixedOffset {
    minutes
        .checked_mul(60)
        .and_then(chrono::FixedOffset::east_opt)
        .unwrap_or_else(|| Utc.fix())
}
