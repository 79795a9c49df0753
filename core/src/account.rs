//! The per-user points account: a cached aggregate over the ledger.

use crate::{
    config::ActivityKind,
    ledger::LedgerEntry,
    types::{EntryId, Points, UserId},
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointsAccount {
    pub user_id:          UserId,
    /// Cached SUM(points_awarded) over this user's ledger entries.
    pub total_points:     Points,
    pub level:            u32,
    pub current_streak:   u32,
    pub longest_streak:   u32,
    pub last_active_date: Option<NaiveDate>,
    pub updated_at:       DateTime<Utc>,
    /// Newest first, bounded by `PointsConfig::history_limit`.
    pub history:          Vec<HistoryRecord>,
}

/// Compact, display-only summary of one award.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub entry_id:      EntryId,
    pub activity_kind: ActivityKind,
    pub reference_id:  Option<String>,
    pub points:        Points,
    pub created_at:    DateTime<Utc>,
}

impl From<&LedgerEntry> for HistoryRecord {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            entry_id:      entry.id.clone(),
            activity_kind: entry.activity_kind,
            reference_id:  entry.reference_id.clone(),
            points:        entry.points_awarded,
            created_at:    entry.created_at,
        }
    }
}

/// Account state returned by the atomic credit statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountTotals {
    pub total_points: Points,
    pub level:        u32,
}

/// Streak fields read for a compare-and-set update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreakState {
    pub current_streak:   u32,
    pub longest_streak:   u32,
    pub last_active_date: Option<NaiveDate>,
}
