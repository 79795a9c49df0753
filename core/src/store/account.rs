use super::{from_date, from_millis, to_date, to_millis, PointsStore};
use crate::{
    account::{AccountTotals, HistoryRecord, PointsAccount, StreakState},
    error::LedgerResult,
    types::Points,
};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, OptionalExtension, Transaction, TransactionBehavior};

impl PointsStore {
    // ── Account ───────────────────────────────────────────────────

    /// Credit `record.points` to the account and push `record` onto its
    /// bounded history, as one write transaction.
    ///
    /// The increment is a single upsert (`total = total + ?`), never a
    /// read-modify-write, so concurrent credits for one user cannot be lost.
    pub fn credit_account(
        &self,
        user_id: &str,
        record: &HistoryRecord,
        base_level: u32,
        history_limit: usize,
        now: DateTime<Utc>,
    ) -> LedgerResult<AccountTotals> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;

        let totals = tx.query_row(
            "INSERT INTO points_account (user_id, total_points, level, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT (user_id) DO UPDATE SET
                 total_points = total_points + excluded.total_points,
                 updated_at   = excluded.updated_at
             RETURNING total_points, level",
            params![user_id, record.points, base_level, to_millis(now)],
            |row| {
                Ok(AccountTotals {
                    total_points: row.get(0)?,
                    level:        row.get(1)?,
                })
            },
        )?;

        tx.execute(
            "INSERT INTO account_history (user_id, entry_id, activity_kind, reference_id, points, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user_id,
                &record.entry_id,
                record.activity_kind,
                &record.reference_id,
                record.points,
                to_millis(record.created_at),
            ],
        )?;

        tx.execute(
            "DELETE FROM account_history
             WHERE user_id = ?1 AND id NOT IN (
                 SELECT id FROM account_history
                 WHERE user_id = ?1 ORDER BY id DESC LIMIT ?2
             )",
            params![user_id, history_limit as i64],
        )?;

        tx.commit()?;
        Ok(totals)
    }

    /// Create an empty account if none exists. Returns true if one was created.
    pub fn ensure_account(
        &self,
        user_id: &str,
        base_level: u32,
        now: DateTime<Utc>,
    ) -> LedgerResult<bool> {
        let created = self.conn.execute(
            "INSERT INTO points_account (user_id, total_points, level, created_at, updated_at)
             VALUES (?1, 0, ?2, ?3, ?3)
             ON CONFLICT (user_id) DO NOTHING",
            params![user_id, base_level, to_millis(now)],
        )?;
        Ok(created > 0)
    }

    /// Raise the stored level. Never lowers it, so out-of-order writers
    /// racing on one account cannot regress a level.
    pub fn raise_account_level(&self, user_id: &str, level: u32) -> LedgerResult<bool> {
        let changed = self.conn.execute(
            "UPDATE points_account SET level = ?2 WHERE user_id = ?1 AND level < ?2",
            params![user_id, level],
        )?;
        Ok(changed > 0)
    }

    /// Rewrite the cached total and level. Used only by reconciliation repair.
    pub fn overwrite_account_totals(
        &self,
        user_id: &str,
        total_points: Points,
        level: u32,
        now: DateTime<Utc>,
    ) -> LedgerResult<()> {
        self.conn.execute(
            "UPDATE points_account SET total_points = ?2, level = ?3, updated_at = ?4
             WHERE user_id = ?1",
            params![user_id, total_points, level, to_millis(now)],
        )?;
        Ok(())
    }

    pub fn get_account(&self, user_id: &str) -> LedgerResult<Option<PointsAccount>> {
        let account = self
            .conn
            .query_row(
                "SELECT user_id, total_points, level, current_streak, longest_streak,
                        last_active_date, updated_at
                 FROM points_account WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok(PointsAccount {
                        user_id:          row.get(0)?,
                        total_points:     row.get(1)?,
                        level:            row.get(2)?,
                        current_streak:   row.get(3)?,
                        longest_streak:   row.get(4)?,
                        last_active_date: from_date(5, row.get(5)?)?,
                        updated_at:       from_millis(6, row.get(6)?)?,
                        history:          Vec::new(),
                    })
                },
            )
            .optional()?;

        match account {
            Some(mut account) => {
                account.history = self.account_history(user_id)?;
                Ok(Some(account))
            }
            None => Ok(None),
        }
    }

    /// Display history, newest first.
    pub fn account_history(&self, user_id: &str) -> LedgerResult<Vec<HistoryRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT entry_id, activity_kind, reference_id, points, created_at
             FROM account_history WHERE user_id = ?1
             ORDER BY id DESC",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok(HistoryRecord {
                entry_id:      row.get(0)?,
                activity_kind: row.get(1)?,
                reference_id:  row.get(2)?,
                points:        row.get(3)?,
                created_at:    from_millis(4, row.get(4)?)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn streak_state(&self, user_id: &str) -> LedgerResult<Option<StreakState>> {
        let state = self
            .conn
            .query_row(
                "SELECT current_streak, longest_streak, last_active_date
                 FROM points_account WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok(StreakState {
                        current_streak:   row.get(0)?,
                        longest_streak:   row.get(1)?,
                        last_active_date: from_date(2, row.get(2)?)?,
                    })
                },
            )
            .optional()?;
        Ok(state)
    }

    /// Write a new streak only if `last_active_date` still equals `expected`.
    /// Returns false when another writer got there first.
    pub fn compare_and_set_streak(
        &self,
        user_id: &str,
        expected: Option<NaiveDate>,
        current_streak: u32,
        active_on: NaiveDate,
        now: DateTime<Utc>,
    ) -> LedgerResult<bool> {
        let changed = self.conn.execute(
            "UPDATE points_account SET
                 current_streak   = ?2,
                 longest_streak   = MAX(longest_streak, ?2),
                 last_active_date = ?3,
                 updated_at       = ?4
             WHERE user_id = ?1 AND last_active_date IS ?5",
            params![
                user_id,
                current_streak,
                to_date(active_on),
                to_millis(now),
                expected.map(to_date),
            ],
        )?;
        Ok(changed > 0)
    }
}
