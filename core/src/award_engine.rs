//! Award engine — credits users for platform actions.
//!
//! RULES:
//!   - Awarding points is a side benefit of a user action, never a
//!     precondition for it. `award` never returns an error; every
//!     failure is logged and becomes "no award".
//!   - Uniqueness of (user, kind, reference) is enforced by the store's
//!     unique index. The pre-check here only saves a failed insert.
//!   - The daily cap is a best-effort read-then-write check. Concurrent
//!     awards for one user/kind near the limit may overshoot it slightly.
//!
//! Steps per award:
//!   1. Resolve the rule for the kind (unknown kind → warn, no award)
//!   2. Duplicate reference check
//!   3. Daily cap check over `[today_start, tomorrow_start)`
//!   4. Append the ledger entry
//!   5. Atomically credit the account + bounded history (retried)
//!   6. Raise the cached level if the new total crossed a threshold

use crate::{
    account::HistoryRecord,
    clock::Clock,
    config::{ActivityKind, ActivityRule, PointsConfig},
    error::LedgerResult,
    ledger::{InsertOutcome, LedgerEntry},
    store::PointsStore,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What a single award attempt did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AwardOutcome {
    Awarded {
        entry:        LedgerEntry,
        level_change: Option<LevelChange>,
    },
    UnknownKind,
    /// This (user, kind, reference) was already credited.
    Duplicate,
    DailyCapReached { limit: u32 },
    /// A storage failure was absorbed.
    Failed { reason: String },
}

impl AwardOutcome {
    pub fn entry(&self) -> Option<&LedgerEntry> {
        match self {
            Self::Awarded { entry, .. } => Some(entry),
            _ => None,
        }
    }

    pub fn into_entry(self) -> Option<LedgerEntry> {
        match self {
            Self::Awarded { entry, .. } => Some(entry),
            _ => None,
        }
    }

    pub fn is_awarded(&self) -> bool {
        matches!(self, Self::Awarded { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelChange {
    pub from:  u32,
    pub to:    u32,
    pub title: String,
}

pub struct AwardEngine {
    store:  PointsStore,
    config: Arc<PointsConfig>,
    clock:  Arc<dyn Clock>,
}

impl AwardEngine {
    pub fn new(store: PointsStore, config: Arc<PointsConfig>, clock: Arc<dyn Clock>) -> Self {
        Self { store, config, clock }
    }

    pub fn store(&self) -> &PointsStore {
        &self.store
    }

    pub fn config(&self) -> &PointsConfig {
        &self.config
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// A second engine over its own connection to the same database,
    /// sharing this engine's config and clock.
    pub fn reopen(&self) -> LedgerResult<Self> {
        Ok(Self {
            store:  self.store.reopen()?,
            config: Arc::clone(&self.config),
            clock:  Arc::clone(&self.clock),
        })
    }

    /// Credit `user_id` for `kind`. Returns the new entry, or `None` when
    /// nothing was awarded for any reason.
    pub fn award(
        &self,
        user_id: &str,
        kind: ActivityKind,
        reference_id: Option<&str>,
    ) -> Option<LedgerEntry> {
        self.try_award(user_id, kind, reference_id).into_entry()
    }

    /// `award` for callers holding the kind as a string.
    pub fn award_named(
        &self,
        user_id: &str,
        kind: &str,
        reference_id: Option<&str>,
    ) -> Option<LedgerEntry> {
        match kind.parse::<ActivityKind>() {
            Ok(kind) => self.award(user_id, kind, reference_id),
            Err(_) => {
                log::warn!("award: unknown activity kind '{kind}' for user {user_id}; skipping");
                None
            }
        }
    }

    /// Like `award`, but reports why nothing was awarded.
    pub fn try_award(
        &self,
        user_id: &str,
        kind: ActivityKind,
        reference_id: Option<&str>,
    ) -> AwardOutcome {
        // Blank references identify nothing; treat them as absent. Others
        // are stored and compared verbatim.
        let reference_id = reference_id.filter(|r| !r.trim().is_empty());

        match self.award_inner(user_id, kind, reference_id) {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("award: {kind} for user {user_id} failed: {e}");
                AwardOutcome::Failed { reason: e.to_string() }
            }
        }
    }

    fn award_inner(
        &self,
        user_id: &str,
        kind: ActivityKind,
        reference_id: Option<&str>,
    ) -> LedgerResult<AwardOutcome> {
        let Some(rule) = self.config.rule(kind) else {
            log::warn!("award: no points rule for {kind}; user {user_id} not credited");
            return Ok(AwardOutcome::UnknownKind);
        };

        if let Some(reference) = reference_id {
            if self.store.ledger_entry_exists(user_id, kind, reference)? {
                log::debug!("award: {kind}/{reference} already credited to {user_id}");
                return Ok(AwardOutcome::Duplicate);
            }
        }

        let now = self.clock.now();
        if self.daily_cap_reached(user_id, kind, rule, now)? {
            log::debug!(
                "award: {kind} daily limit {} reached for {user_id}",
                rule.daily_limit
            );
            return Ok(AwardOutcome::DailyCapReached { limit: rule.daily_limit });
        }

        let entry = LedgerEntry::new(user_id, kind, reference_id, rule.points, now);
        if self.store.insert_ledger_entry(&entry)? == InsertOutcome::Duplicate {
            // Lost the race to a concurrent award of the same reference.
            log::debug!("award: {kind} for {user_id} rejected by uniqueness constraint");
            return Ok(AwardOutcome::Duplicate);
        }

        let level_change = match self.credit_account(&entry) {
            Ok(change) => change,
            Err(e) => {
                log::error!(
                    "award: ledger entry {} ({kind}, {} pts) is durable but account {user_id} \
                     was not credited: {e}; reconcile this account",
                    entry.id,
                    entry.points_awarded
                );
                return Err(e);
            }
        };

        log::debug!(
            "award: {user_id} +{} for {kind}{}",
            entry.points_awarded,
            entry.reference_id.as_deref().map(|r| format!(" ({r})")).unwrap_or_default()
        );
        Ok(AwardOutcome::Awarded { entry, level_change })
    }

    fn daily_cap_reached(
        &self,
        user_id: &str,
        kind: ActivityKind,
        rule: &ActivityRule,
        now: chrono::DateTime<chrono::Utc>,
    ) -> LedgerResult<bool> {
        if rule.daily_limit == 0 {
            return Ok(false);
        }
        let boundary = self.config.day_boundary;
        let (day_start, next_day_start) = boundary.window(boundary.day_of(now));
        let today = self
            .store
            .count_entries_between(user_id, kind, day_start, next_day_start)?;
        Ok(today >= i64::from(rule.daily_limit))
    }

    /// Steps 5 and 6: increment + history, then level.
    fn credit_account(&self, entry: &LedgerEntry) -> LedgerResult<Option<LevelChange>> {
        let levels = &self.config.levels;
        let record = HistoryRecord::from(entry);
        let totals = self.config.retry.run("account credit", || {
            self.store.credit_account(
                &entry.user_id,
                &record,
                levels.base().level,
                self.config.history_limit,
                entry.created_at,
            )
        })?;

        let reached = levels.level_of(totals.total_points);
        if reached.level <= totals.level {
            return Ok(None);
        }
        let raised = self.config.retry.run("level update", || {
            self.store.raise_account_level(&entry.user_id, reached.level)
        })?;
        if !raised {
            // A concurrent award already moved the level at least this far.
            return Ok(None);
        }
        log::info!(
            "level: {} reached level {} ({}) at {} points",
            entry.user_id,
            reached.level,
            reached.title,
            totals.total_points
        );
        Ok(Some(LevelChange {
            from:  totals.level,
            to:    reached.level,
            title: reached.title.clone(),
        }))
    }
}
