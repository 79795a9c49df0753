//! Ledger records.
//!
//! RULE: A ledger entry is written once and never changed.
//! `points_awarded` is copied from the rule at award time, so later
//! config changes never rewrite history.

use crate::{
    config::ActivityKind,
    types::{EntryId, Points, UserId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id:             EntryId,
    pub user_id:        UserId,
    pub activity_kind:  ActivityKind,
    /// The post/poll/comment that earned the credit. `None` for login and streak events.
    pub reference_id:   Option<String>,
    pub points_awarded: Points,
    pub created_at:     DateTime<Utc>,
}

impl LedgerEntry {
    pub fn new(
        user_id: &str,
        activity_kind: ActivityKind,
        reference_id: Option<&str>,
        points_awarded: Points,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            activity_kind,
            reference_id: reference_id.map(str::to_string),
            points_awarded,
            created_at,
        }
    }
}

/// Result of appending to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// The (user, kind, reference) uniqueness constraint rejected the row.
    Duplicate,
}

/// Count and summed points for one activity kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityBreakdown {
    pub activity_kind: ActivityKind,
    pub count:         i64,
    pub points:        Points,
}
