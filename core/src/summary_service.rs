//! Summary / aggregation service — per-user and admin-wide reporting.
//!
//! RULE: Read-only. Nothing here writes, and errors propagate to the
//! caller as ordinary failures.

use crate::{
    account::HistoryRecord,
    clock::Clock,
    config::{ActivityConfigView, PointsConfig},
    error::LedgerResult,
    ledger::{ActivityBreakdown, LedgerEntry},
    level::LevelInfo,
    store::{AdminRowBase, AdminSortKey, LeaderboardRowBase, PlatformTotals, PointsStore, SortOrder},
    types::{Points, UserId},
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_LIMIT: u32 = 20;
pub const MAX_PAGE_LIMIT: u32 = 100;

// ── Shapes ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub user_id:          UserId,
    pub name:             Option<String>,
    pub total_points:     Points,
    pub weekly_points:    Points,
    pub current_streak:   u32,
    pub longest_streak:   u32,
    pub last_active_date: Option<NaiveDate>,
    pub level:            LevelInfo,
    /// Per-kind counts, largest point total first.
    pub breakdown:        Vec<ActivityBreakdown>,
    pub recent_history:   Vec<HistoryRecord>,
    /// How to earn points, echoed for client display.
    pub points_config:    Vec<ActivityConfigView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminSummaryOptions {
    pub page:       u32,
    pub limit:      u32,
    pub search:     Option<String>,
    pub sort_by:    AdminSortKey,
    pub sort_order: SortOrder,
}

impl Default for AdminSummaryOptions {
    fn default() -> Self {
        Self {
            page:       1,
            limit:      DEFAULT_PAGE_LIMIT,
            search:     None,
            sort_by:    AdminSortKey::default(),
            sort_order: SortOrder::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminRow {
    pub user_id:          UserId,
    pub name:             String,
    pub email:            String,
    pub total_points:     Points,
    pub weekly_points:    Points,
    pub level:            u32,
    pub level_title:      String,
    pub current_streak:   u32,
    pub longest_streak:   u32,
    pub last_active_date: Option<NaiveDate>,
    pub activity_count:   i64,
    pub breakdown:        Vec<ActivityBreakdown>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page:        u32,
    pub limit:       u32,
    pub total_rows:  i64,
    pub total_pages: i64,
}

impl Pagination {
    fn new(page: u32, limit: u32, total_rows: i64) -> Self {
        let limit_i = i64::from(limit);
        Self {
            page,
            limit,
            total_rows,
            total_pages: (total_rows + limit_i - 1) / limit_i,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminSummary {
    pub rows:            Vec<AdminRow>,
    pub pagination:      Pagination,
    pub platform_totals: PlatformTotals,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardPeriod {
    AllTime,
    Weekly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardRow {
    pub rank:        u32,
    pub user_id:     UserId,
    pub name:        String,
    pub points:      Points,
    pub level:       u32,
    pub level_title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityPage {
    pub entries:    Vec<LedgerEntry>,
    pub pagination: Pagination,
}

// ── Service ────────────────────────────────────────────────────────

pub struct SummaryService<'a> {
    store:  &'a PointsStore,
    config: &'a PointsConfig,
    clock:  &'a dyn Clock,
}

impl<'a> SummaryService<'a> {
    pub fn new(store: &'a PointsStore, config: &'a PointsConfig, clock: &'a dyn Clock) -> Self {
        Self { store, config, clock }
    }

    /// `[now - weekly_window_days, now]`, expressed half-open for the store.
    fn weekly_window(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let now = self.clock.now();
        (
            now - Duration::days(self.config.weekly_window_days),
            now + Duration::milliseconds(1),
        )
    }

    pub fn user_summary(&self, user_id: &str) -> LedgerResult<UserSummary> {
        let account = self.store.get_account(user_id)?;
        let member = self.store.get_member(user_id)?;
        let (from, to) = self.weekly_window();
        let weekly_points = self.store.sum_points_between(user_id, from, to)?;
        let breakdown = self.store.ledger_breakdown(user_id)?;

        let (total_points, current_streak, longest_streak, last_active_date, recent_history) =
            match account {
                Some(a) => (a.total_points, a.current_streak, a.longest_streak, a.last_active_date, a.history),
                None => (0, 0, 0, None, Vec::new()),
            };

        Ok(UserSummary {
            user_id: user_id.to_string(),
            name: member.map(|m| m.name),
            total_points,
            weekly_points,
            current_streak,
            longest_streak,
            last_active_date,
            level: self.config.levels.info(total_points),
            breakdown,
            recent_history,
            points_config: self.config.catalog(),
        })
    }

    pub fn admin_summary(&self, options: &AdminSummaryOptions) -> LedgerResult<AdminSummary> {
        let page = options.page.max(1);
        let limit = options.limit.clamp(1, MAX_PAGE_LIMIT);
        let offset = u64::from(page - 1) * u64::from(limit);
        let search = options
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let (from, to) = self.weekly_window();
        let base_level = self.config.levels.base().level;
        let rows = self.store.admin_rows(
            search,
            options.sort_by,
            options.sort_order,
            from,
            to,
            base_level,
            limit,
            offset,
        )?;
        let total_rows = self.store.admin_row_count(search)?;

        let rows = rows
            .into_iter()
            .map(|row| self.admin_row(row))
            .collect::<LedgerResult<Vec<_>>>()?;

        Ok(AdminSummary {
            rows,
            pagination: Pagination::new(page, limit, total_rows),
            platform_totals: self.store.platform_totals()?,
        })
    }

    fn admin_row(&self, row: AdminRowBase) -> LedgerResult<AdminRow> {
        let breakdown = self.store.ledger_breakdown(&row.user_id)?;
        let level_title = self.level_title(row.level);
        Ok(AdminRow {
            user_id:          row.user_id,
            name:             row.name,
            email:            row.email,
            total_points:     row.total_points,
            weekly_points:    row.weekly_points,
            level:            row.level,
            level_title,
            current_streak:   row.current_streak,
            longest_streak:   row.longest_streak,
            last_active_date: row.last_active_date,
            activity_count:   row.activity_count,
            breakdown,
        })
    }

    pub fn leaderboard(
        &self,
        period: LeaderboardPeriod,
        limit: u32,
    ) -> LedgerResult<Vec<LeaderboardRow>> {
        let limit = limit.clamp(1, MAX_PAGE_LIMIT);
        let rows = match period {
            LeaderboardPeriod::AllTime => self.store.leaderboard_all_time(limit)?,
            LeaderboardPeriod::Weekly => {
                let (from, to) = self.weekly_window();
                self.store
                    .leaderboard_window(from, to, self.config.levels.base().level, limit)?
            }
        };
        Ok(rows
            .into_iter()
            .zip(1u32..)
            .map(|(row, rank)| self.leaderboard_row(rank, row))
            .collect())
    }

    fn leaderboard_row(&self, rank: u32, row: LeaderboardRowBase) -> LeaderboardRow {
        LeaderboardRow {
            rank,
            level_title: self.level_title(row.level),
            user_id: row.user_id,
            name: row.name,
            points: row.points,
            level: row.level,
        }
    }

    /// One user's ledger entries, newest first.
    pub fn user_activity(&self, user_id: &str, page: u32, limit: u32) -> LedgerResult<ActivityPage> {
        let page = page.max(1);
        let limit = limit.clamp(1, MAX_PAGE_LIMIT);
        let offset = u64::from(page - 1) * u64::from(limit);
        let entries = self.store.ledger_entries_page(user_id, limit, offset)?;
        let total_rows = self.store.ledger_entry_count(user_id)?;
        Ok(ActivityPage {
            entries,
            pagination: Pagination::new(page, limit, total_rows),
        })
    }

    pub fn points_config(&self) -> Vec<ActivityConfigView> {
        self.config.catalog()
    }

    fn level_title(&self, level: u32) -> String {
        self.config
            .levels
            .thresholds()
            .iter()
            .find(|t| t.level == level)
            .map(|t| t.title.clone())
            .unwrap_or_default()
    }
}
