//! The points engine — one entry point wiring the gamification ledger.
//!
//! CALL CONTRACT:
//!   - Feature services (blog, discussion, poll, course) call `award`.
//!   - The auth service calls `record_daily_activity` once per login.
//!   - The HTTP layer calls the read-side methods.
//!
//! RULES:
//!   - Config and clock are injected once at build time, never global.
//!   - Write paths absorb errors; read paths return `LedgerResult`.
//!   - One engine = one database connection. Use `reopen()` to give each
//!     concurrent worker its own.

use crate::{
    award_engine::{AwardEngine, AwardOutcome},
    clock::Clock,
    config::{ActivityConfigView, ActivityKind, PointsConfig},
    error::LedgerResult,
    ledger::LedgerEntry,
    member::Member,
    reconciliation::{Reconciler, ReconciliationReport},
    store::PointsStore,
    streak_tracker::{StreakOutcome, StreakTracker},
    summary_service::{
        ActivityPage, AdminSummary, AdminSummaryOptions, LeaderboardPeriod, LeaderboardRow,
        SummaryService, UserSummary,
    },
};
use std::sync::Arc;

pub struct PointsEngine {
    awards: AwardEngine,
}

impl PointsEngine {
    /// Build an engine over an already-migrated store. The config is
    /// validated here so the write paths never see out-of-range values.
    pub fn build(
        store: PointsStore,
        config: Arc<PointsConfig>,
        clock: Arc<dyn Clock>,
    ) -> LedgerResult<Self> {
        config.validate()?;
        Ok(Self {
            awards: AwardEngine::new(store, config, clock),
        })
    }

    /// In-memory engine with the test config. Used by tests and tooling.
    pub fn build_test(clock: Arc<dyn Clock>) -> LedgerResult<Self> {
        let store = PointsStore::in_memory()?;
        store.migrate()?;
        Self::build(store, Arc::new(PointsConfig::default_test()), clock)
    }

    /// Another engine on its own connection to the same database.
    pub fn reopen(&self) -> LedgerResult<Self> {
        Ok(Self {
            awards: self.awards.reopen()?,
        })
    }

    pub fn store(&self) -> &PointsStore {
        self.awards.store()
    }

    pub fn config(&self) -> &PointsConfig {
        self.awards.config()
    }

    // ── Write side ─────────────────────────────────────────────────

    pub fn award(
        &self,
        user_id: &str,
        kind: ActivityKind,
        reference_id: Option<&str>,
    ) -> Option<LedgerEntry> {
        self.awards.award(user_id, kind, reference_id)
    }

    pub fn award_named(
        &self,
        user_id: &str,
        kind: &str,
        reference_id: Option<&str>,
    ) -> Option<LedgerEntry> {
        self.awards.award_named(user_id, kind, reference_id)
    }

    pub fn try_award(
        &self,
        user_id: &str,
        kind: ActivityKind,
        reference_id: Option<&str>,
    ) -> AwardOutcome {
        self.awards.try_award(user_id, kind, reference_id)
    }

    pub fn record_daily_activity(&self, user_id: &str) -> Option<StreakOutcome> {
        StreakTracker::new(&self.awards).record_daily_activity(user_id)
    }

    /// Mirror a platform user into the member directory.
    pub fn upsert_member(&self, member: &Member) -> LedgerResult<()> {
        self.store().upsert_member(member)
    }

    /// Hide or restore a member in admin views and leaderboards. Their
    /// ledger and account are untouched.
    pub fn set_member_active(&self, user_id: &str, active: bool) -> LedgerResult<bool> {
        self.store().set_member_active(user_id, active)
    }

    // ── Read side ──────────────────────────────────────────────────

    fn summaries(&self) -> SummaryService<'_> {
        SummaryService::new(self.awards.store(), self.awards.config(), self.awards.clock())
    }

    pub fn user_summary(&self, user_id: &str) -> LedgerResult<UserSummary> {
        self.summaries().user_summary(user_id)
    }

    pub fn admin_summary(&self, options: &AdminSummaryOptions) -> LedgerResult<AdminSummary> {
        self.summaries().admin_summary(options)
    }

    pub fn leaderboard(&self, period: LeaderboardPeriod, limit: u32) -> LedgerResult<Vec<LeaderboardRow>> {
        self.summaries().leaderboard(period, limit)
    }

    pub fn user_activity(&self, user_id: &str, page: u32, limit: u32) -> LedgerResult<ActivityPage> {
        self.summaries().user_activity(user_id, page, limit)
    }

    pub fn points_config(&self) -> Vec<ActivityConfigView> {
        self.summaries().points_config()
    }

    // ── Audit ──────────────────────────────────────────────────────

    fn reconciler(&self) -> Reconciler<'_> {
        Reconciler::new(self.awards.store(), self.awards.config(), self.awards.clock())
    }

    pub fn reconcile(&self, user_id: &str, repair: bool) -> LedgerResult<ReconciliationReport> {
        self.reconciler().reconcile_account(user_id, repair)
    }

    pub fn reconcile_all(&self, repair: bool) -> LedgerResult<Vec<ReconciliationReport>> {
        self.reconciler().reconcile_all(repair)
    }
}
