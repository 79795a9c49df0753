//! Read-only reporting queries: admin table, platform totals, leaderboards.

use super::{from_date, to_millis, PointsStore};
use crate::{
    error::{LedgerError, LedgerResult},
    types::{Points, UserId},
};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Numeric columns the admin table can be sorted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminSortKey {
    #[default]
    TotalPoints,
    WeeklyPoints,
    Level,
    CurrentStreak,
    LongestStreak,
    ActivityCount,
}

impl AdminSortKey {
    fn column(&self) -> &'static str {
        match self {
            Self::TotalPoints   => "total_points",
            Self::WeeklyPoints  => "weekly_points",
            Self::Level         => "level",
            Self::CurrentStreak => "current_streak",
            Self::LongestStreak => "longest_streak",
            Self::ActivityCount => "activity_count",
        }
    }
}

impl FromStr for AdminSortKey {
    type Err = LedgerError;

    /// Accepts both `total_points` and `totalPoints` spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "totalpoints" | "points" => Ok(Self::TotalPoints),
            "weeklypoints"           => Ok(Self::WeeklyPoints),
            "level"                  => Ok(Self::Level),
            "currentstreak" | "streak" => Ok(Self::CurrentStreak),
            "longeststreak"          => Ok(Self::LongestStreak),
            "activitycount" | "activities" => Ok(Self::ActivityCount),
            _ => Err(LedgerError::InvalidSort { field: s.to_string() }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    fn keyword(&self) -> &'static str {
        match self {
            Self::Asc  => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl FromStr for SortOrder {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending"   => Ok(Self::Asc),
            "desc" | "descending" => Ok(Self::Desc),
            _ => Err(LedgerError::InvalidSort { field: s.to_string() }),
        }
    }
}

/// One admin table row before the per-kind breakdown is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminRowBase {
    pub user_id:          UserId,
    pub name:             String,
    pub email:            String,
    pub total_points:     Points,
    pub weekly_points:    Points,
    pub level:            u32,
    pub current_streak:   u32,
    pub longest_streak:   u32,
    pub last_active_date: Option<NaiveDate>,
    pub activity_count:   i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformTotals {
    pub user_count:             i64,
    pub total_points_awarded:   Points,
    pub total_activity_count:   i64,
    pub average_points_per_user: f64,
}

/// A leaderboard row before ranks are assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardRowBase {
    pub user_id: UserId,
    pub name:    String,
    pub points:  Points,
    pub level:   u32,
}

/// Active members, optionally narrowed by the search placeholder `p`.
/// A NULL search disables the filter.
fn member_filter(p: &str) -> String {
    format!(
        "m.active = 1
         AND ({p} IS NULL OR instr(lower(m.name), {p}) > 0 OR instr(lower(m.email), {p}) > 0)"
    )
}

impl PointsStore {
    // ── Admin table ───────────────────────────────────────────────

    /// Active members matching `search` (case-insensitive substring of name
    /// or email), sorted by `sort` then user id, one page at a time.
    #[allow(clippy::too_many_arguments)]
    pub fn admin_rows(
        &self,
        search: Option<&str>,
        sort: AdminSortKey,
        order: SortOrder,
        weekly_from: DateTime<Utc>,
        weekly_to: DateTime<Utc>,
        base_level: u32,
        limit: u32,
        offset: u64,
    ) -> LedgerResult<Vec<AdminRowBase>> {
        let needle = search.map(str::to_lowercase);
        let sql = format!(
            "SELECT m.user_id, m.name, m.email,
                    COALESCE(a.total_points, 0)   AS total_points,
                    COALESCE(a.level, ?1)         AS level,
                    COALESCE(a.current_streak, 0) AS current_streak,
                    COALESCE(a.longest_streak, 0) AS longest_streak,
                    a.last_active_date,
                    (SELECT COUNT(*) FROM ledger_entry l
                      WHERE l.user_id = m.user_id) AS activity_count,
                    (SELECT COALESCE(SUM(l.points_awarded), 0) FROM ledger_entry l
                      WHERE l.user_id = m.user_id
                        AND l.created_at >= ?2 AND l.created_at < ?3) AS weekly_points
             FROM member m
             LEFT JOIN points_account a ON a.user_id = m.user_id
             WHERE {}
             ORDER BY {} {}, m.user_id ASC
             LIMIT ?5 OFFSET ?6",
            member_filter("?4"),
            sort.column(),
            order.keyword(),
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![
                base_level,
                to_millis(weekly_from),
                to_millis(weekly_to),
                needle,
                limit as i64,
                offset as i64,
            ],
            |row| {
                Ok(AdminRowBase {
                    user_id:          row.get(0)?,
                    name:             row.get(1)?,
                    email:            row.get(2)?,
                    total_points:     row.get(3)?,
                    level:            row.get(4)?,
                    current_streak:   row.get(5)?,
                    longest_streak:   row.get(6)?,
                    last_active_date: from_date(7, row.get(7)?)?,
                    activity_count:   row.get(8)?,
                    weekly_points:    row.get(9)?,
                })
            },
        )?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn admin_row_count(&self, search: Option<&str>) -> LedgerResult<i64> {
        let needle = search.map(str::to_lowercase);
        let sql = format!("SELECT COUNT(*) FROM member m WHERE {}", member_filter("?1"));
        let count: i64 = self.conn.query_row(&sql, params![needle], |row| row.get(0))?;
        Ok(count)
    }

    pub fn platform_totals(&self) -> LedgerResult<PlatformTotals> {
        let user_count = self.active_member_count()?;
        let (total_points_awarded, total_activity_count): (Points, i64) = self.conn.query_row(
            "SELECT COALESCE(SUM(l.points_awarded), 0), COUNT(*)
             FROM ledger_entry l
             JOIN member m ON m.user_id = l.user_id
             WHERE m.active = 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let average_points_per_user = if user_count > 0 {
            total_points_awarded as f64 / user_count as f64
        } else {
            0.0
        };
        Ok(PlatformTotals {
            user_count,
            total_points_awarded,
            total_activity_count,
            average_points_per_user,
        })
    }

    // ── Leaderboards ──────────────────────────────────────────────

    pub fn leaderboard_all_time(&self, limit: u32) -> LedgerResult<Vec<LeaderboardRowBase>> {
        let mut stmt = self.conn.prepare(
            "SELECT m.user_id, m.name, a.total_points, a.level
             FROM points_account a
             JOIN member m ON m.user_id = a.user_id
             WHERE m.active = 1 AND a.total_points > 0
             ORDER BY a.total_points DESC, m.user_id ASC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(LeaderboardRowBase {
                user_id: row.get(0)?,
                name:    row.get(1)?,
                points:  row.get(2)?,
                level:   row.get(3)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Points earned in `[from, to)`, largest first.
    pub fn leaderboard_window(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        base_level: u32,
        limit: u32,
    ) -> LedgerResult<Vec<LeaderboardRowBase>> {
        let mut stmt = self.conn.prepare(
            "SELECT m.user_id, m.name, SUM(l.points_awarded) AS points,
                    COALESCE(a.level, ?3)
             FROM ledger_entry l
             JOIN member m ON m.user_id = l.user_id
             LEFT JOIN points_account a ON a.user_id = l.user_id
             WHERE m.active = 1 AND l.created_at >= ?1 AND l.created_at < ?2
             GROUP BY m.user_id, m.name, a.level
             ORDER BY points DESC, m.user_id ASC
             LIMIT ?4",
        )?;
        let rows = stmt.query_map(
            params![to_millis(from), to_millis(to), base_level, limit as i64],
            |row| {
                Ok(LeaderboardRowBase {
                    user_id: row.get(0)?,
                    name:    row.get(1)?,
                    points:  row.get(2)?,
                    level:   row.get(3)?,
                })
            },
        )?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_key_accepts_both_spellings() {
        assert_eq!("totalPoints".parse::<AdminSortKey>().unwrap(), AdminSortKey::TotalPoints);
        assert_eq!("current_streak".parse::<AdminSortKey>().unwrap(), AdminSortKey::CurrentStreak);
        assert_eq!("ActivityCount".parse::<AdminSortKey>().unwrap(), AdminSortKey::ActivityCount);
        assert!(matches!(
            "email".parse::<AdminSortKey>(),
            Err(LedgerError::InvalidSort { .. })
        ));
    }

    #[test]
    fn sort_order_parses() {
        assert_eq!("ASC".parse::<SortOrder>().unwrap(), SortOrder::Asc);
        assert_eq!("descending".parse::<SortOrder>().unwrap(), SortOrder::Desc);
        assert!("sideways".parse::<SortOrder>().is_err());
    }
}
