//! Points events — a flat, serializable account of what the write path did.
//!
//! The runner streams these as JSON; callers that only need
//! entry-or-nothing use `AwardEngine::award` and ignore them.

use crate::{
    award_engine::AwardOutcome,
    config::ActivityKind,
    streak_tracker::{StreakChange, StreakOutcome},
    types::{EntryId, Points, UserId},
};
use serde::{Deserialize, Serialize};

/// Variants are added as needed — never removed or reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PointsEvent {
    PointsAwarded {
        user_id:       UserId,
        entry_id:      EntryId,
        activity_kind: ActivityKind,
        reference_id:  Option<String>,
        points:        Points,
    },
    AwardSkipped {
        user_id:       UserId,
        activity_kind: ActivityKind,
        reason:        String,
    },
    LevelReached {
        user_id: UserId,
        from:    u32,
        to:      u32,
        title:   String,
    },
    StreakUpdated {
        user_id:        UserId,
        change:         StreakChange,
        current_streak: u32,
    },
}

impl PointsEvent {
    /// Events for one award attempt.
    pub fn from_award(user_id: &str, kind: ActivityKind, outcome: &AwardOutcome) -> Vec<Self> {
        let skipped = |reason: String| {
            vec![PointsEvent::AwardSkipped {
                user_id:       user_id.to_string(),
                activity_kind: kind,
                reason,
            }]
        };
        match outcome {
            AwardOutcome::Awarded { entry, level_change } => {
                let mut events = vec![PointsEvent::PointsAwarded {
                    user_id:       entry.user_id.clone(),
                    entry_id:      entry.id.clone(),
                    activity_kind: entry.activity_kind,
                    reference_id:  entry.reference_id.clone(),
                    points:        entry.points_awarded,
                }];
                if let Some(change) = level_change {
                    events.push(PointsEvent::LevelReached {
                        user_id: entry.user_id.clone(),
                        from:    change.from,
                        to:      change.to,
                        title:   change.title.clone(),
                    });
                }
                events
            }
            AwardOutcome::UnknownKind => skipped("unknown_kind".into()),
            AwardOutcome::Duplicate => skipped("duplicate".into()),
            AwardOutcome::DailyCapReached { limit } => skipped(format!("daily_cap_reached:{limit}")),
            AwardOutcome::Failed { reason } => skipped(format!("failed:{reason}")),
        }
    }

    /// Events for one daily-activity call.
    pub fn from_streak(outcome: &StreakOutcome) -> Vec<Self> {
        let mut events = Vec::new();
        let mut credited = |entry: &crate::ledger::LedgerEntry| {
            events.push(PointsEvent::PointsAwarded {
                user_id:       entry.user_id.clone(),
                entry_id:      entry.id.clone(),
                activity_kind: entry.activity_kind,
                reference_id:  entry.reference_id.clone(),
                points:        entry.points_awarded,
            })
        };
        if let Some(entry) = &outcome.login_award {
            credited(entry);
        }
        if let Some(entry) = &outcome.bonus_award {
            credited(entry);
        }
        if outcome.change != StreakChange::Unchanged {
            events.push(PointsEvent::StreakUpdated {
                user_id:        outcome.user_id.clone(),
                change:         outcome.change,
                current_streak: outcome.current_streak,
            });
        }
        events
    }
}
