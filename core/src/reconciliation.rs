//! Reconciliation — compares each account's cached total against its
//! ledger sum and optionally repairs drift.
//!
//! Design:
//!   - Ledger total = sum(ledger_entry.points_awarded) for the user
//!   - Cached total = points_account.total_points (0 if no account yet)
//!   - Drift = ledger total − cached total
//!   - Drift appears only when an award wrote its ledger entry but the
//!     account credit failed after retries (logged at error level).
//!   - Repair rewrites the cached total and the derived level from the ledger.

use crate::{
    clock::Clock,
    config::PointsConfig,
    error::LedgerResult,
    store::PointsStore,
    types::{Points, UserId},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub user_id:      UserId,
    pub cached_total: Points,
    pub ledger_total: Points,
    pub drift:        Points,
    pub repaired:     bool,
}

impl ReconciliationReport {
    pub fn is_consistent(&self) -> bool {
        self.drift == 0
    }
}

pub struct Reconciler<'a> {
    store:  &'a PointsStore,
    config: &'a PointsConfig,
    clock:  &'a dyn Clock,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a PointsStore, config: &'a PointsConfig, clock: &'a dyn Clock) -> Self {
        Self { store, config, clock }
    }

    pub fn reconcile_account(&self, user_id: &str, repair: bool) -> LedgerResult<ReconciliationReport> {
        let ledger_total = self.store.ledger_total(user_id)?;
        let account = self.store.get_account(user_id)?;
        let cached_total = account.as_ref().map(|a| a.total_points).unwrap_or(0);
        let drift = ledger_total - cached_total;

        let mut report = ReconciliationReport {
            user_id: user_id.to_string(),
            cached_total,
            ledger_total,
            drift,
            repaired: false,
        };
        if drift == 0 {
            return Ok(report);
        }

        log::warn!(
            "reconcile: {user_id} cached {cached_total} vs ledger {ledger_total} (drift {drift:+})"
        );
        if !repair {
            return Ok(report);
        }

        let now = self.clock.now();
        let levels = &self.config.levels;
        self.store.ensure_account(user_id, levels.base().level, now)?;
        let level = levels.level_of(ledger_total);
        if let Some(previous) = account.as_ref().map(|a| a.level).filter(|l| *l > level.level) {
            log::warn!(
                "reconcile: {user_id} level lowered {previous} -> {} by repair",
                level.level
            );
        }
        self.store
            .overwrite_account_totals(user_id, ledger_total, level.level, now)?;
        report.repaired = true;
        log::info!("reconcile: {user_id} repaired to {ledger_total} points (level {})", level.level);
        Ok(report)
    }

    /// Reconcile every user with ledger activity. Returns only drifted accounts.
    pub fn reconcile_all(&self, repair: bool) -> LedgerResult<Vec<ReconciliationReport>> {
        let mut drifted = Vec::new();
        for user_id in self.store.ledger_user_ids()? {
            let report = self.reconcile_account(&user_id, repair)?;
            if !report.is_consistent() {
                drifted.push(report);
            }
        }
        Ok(drifted)
    }
}
