use super::{from_millis, is_constraint_violation, to_millis, PointsStore};
use crate::{
    config::ActivityKind,
    error::LedgerResult,
    ledger::{ActivityBreakdown, InsertOutcome, LedgerEntry},
    types::Points,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

const ENTRY_COLUMNS: &str =
    "id, user_id, activity_kind, reference_id, points_awarded, created_at";

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<LedgerEntry> {
    Ok(LedgerEntry {
        id:             row.get(0)?,
        user_id:        row.get(1)?,
        activity_kind:  row.get(2)?,
        reference_id:   row.get(3)?,
        points_awarded: row.get(4)?,
        created_at:     from_millis(5, row.get(5)?)?,
    })
}

impl PointsStore {
    // ── Ledger ────────────────────────────────────────────────────

    /// Append an entry. A uniqueness violation on (user, kind, reference)
    /// is reported as `Duplicate`, not as an error.
    pub fn insert_ledger_entry(&self, entry: &LedgerEntry) -> LedgerResult<InsertOutcome> {
        let result = self.conn.execute(
            "INSERT INTO ledger_entry (id, user_id, activity_kind, reference_id, points_awarded, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                &entry.id,
                &entry.user_id,
                entry.activity_kind,
                &entry.reference_id,
                entry.points_awarded,
                to_millis(entry.created_at),
            ],
        );
        match result {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(e) if is_constraint_violation(&e) => Ok(InsertOutcome::Duplicate),
            Err(e) => Err(e.into()),
        }
    }

    pub fn ledger_entry_exists(
        &self,
        user_id: &str,
        kind: ActivityKind,
        reference_id: &str,
    ) -> LedgerResult<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM ledger_entry
                 WHERE user_id = ?1 AND activity_kind = ?2 AND reference_id = ?3",
                params![user_id, kind, reference_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn get_ledger_entry(&self, entry_id: &str) -> LedgerResult<Option<LedgerEntry>> {
        let entry = self
            .conn
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM ledger_entry WHERE id = ?1"),
                params![entry_id],
                entry_from_row,
            )
            .optional()?;
        Ok(entry)
    }

    /// Entries of `kind` for `user_id` with `from <= created_at < to`.
    pub fn count_entries_between(
        &self,
        user_id: &str,
        kind: ActivityKind,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> LedgerResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM ledger_entry
             WHERE user_id = ?1 AND activity_kind = ?2
               AND created_at >= ?3 AND created_at < ?4",
            params![user_id, kind, to_millis(from), to_millis(to)],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Points earned by `user_id` with `from <= created_at < to`.
    pub fn sum_points_between(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> LedgerResult<Points> {
        let sum: Points = self.conn.query_row(
            "SELECT COALESCE(SUM(points_awarded), 0) FROM ledger_entry
             WHERE user_id = ?1 AND created_at >= ?2 AND created_at < ?3",
            params![user_id, to_millis(from), to_millis(to)],
            |row| row.get(0),
        )?;
        Ok(sum)
    }

    /// Authoritative total: the ledger sum for one user.
    pub fn ledger_total(&self, user_id: &str) -> LedgerResult<Points> {
        let sum: Points = self.conn.query_row(
            "SELECT COALESCE(SUM(points_awarded), 0) FROM ledger_entry WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(sum)
    }

    pub fn ledger_entry_count(&self, user_id: &str) -> LedgerResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM ledger_entry WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Per-kind count and points, largest point total first.
    pub fn ledger_breakdown(&self, user_id: &str) -> LedgerResult<Vec<ActivityBreakdown>> {
        let mut stmt = self.conn.prepare(
            "SELECT activity_kind, COUNT(*), SUM(points_awarded)
             FROM ledger_entry WHERE user_id = ?1
             GROUP BY activity_kind
             ORDER BY SUM(points_awarded) DESC, activity_kind ASC",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok(ActivityBreakdown {
                activity_kind: row.get(0)?,
                count:         row.get(1)?,
                points:        row.get(2)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// A page of one user's entries, newest first.
    pub fn ledger_entries_page(
        &self,
        user_id: &str,
        limit: u32,
        offset: u64,
    ) -> LedgerResult<Vec<LedgerEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM ledger_entry
             WHERE user_id = ?1
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?2 OFFSET ?3"
        ))?;
        let rows = stmt.query_map(params![user_id, limit as i64, offset as i64], entry_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Every user that has at least one ledger entry (for reconciliation sweeps).
    pub fn ledger_user_ids(&self) -> LedgerResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT user_id FROM ledger_entry ORDER BY user_id ASC",
        )?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> PointsStore {
        let store = PointsStore::in_memory().unwrap();
        store.migrate().unwrap();
        store
    }

    fn at(hour: u32) -> DateTime<Utc> {
        use chrono::TimeZone;
        Utc.with_ymd_and_hms(2024, 5, 6, hour, 0, 0).unwrap()
    }

    #[test]
    fn second_insert_of_a_reference_is_a_duplicate() {
        let store = store();
        let first = LedgerEntry::new("u1", ActivityKind::PollVote, Some("poll-1"), 3, at(9));
        let second = LedgerEntry::new("u1", ActivityKind::PollVote, Some("poll-1"), 3, at(10));
        assert_eq!(store.insert_ledger_entry(&first).unwrap(), InsertOutcome::Inserted);
        assert_eq!(store.insert_ledger_entry(&second).unwrap(), InsertOutcome::Duplicate);
        assert!(store.ledger_entry_exists("u1", ActivityKind::PollVote, "poll-1").unwrap());
        assert_eq!(store.get_ledger_entry(&first.id).unwrap(), Some(first));
        assert_eq!(store.get_ledger_entry(&second.id).unwrap(), None);
    }

    #[test]
    fn entries_without_reference_are_not_deduplicated() {
        let store = store();
        for hour in 9..12 {
            let entry = LedgerEntry::new("u1", ActivityKind::DailyLogin, None, 5, at(hour));
            assert_eq!(store.insert_ledger_entry(&entry).unwrap(), InsertOutcome::Inserted);
        }
        assert_eq!(store.ledger_total("u1").unwrap(), 15);
    }

    #[test]
    fn window_queries_are_half_open() {
        let store = store();
        for hour in [9, 10, 11] {
            let entry = LedgerEntry::new("u1", ActivityKind::BlogLike, None, 1, at(hour));
            store.insert_ledger_entry(&entry).unwrap();
        }
        assert_eq!(store.count_entries_between("u1", ActivityKind::BlogLike, at(9), at(11)).unwrap(), 2);
        assert_eq!(store.sum_points_between("u1", at(10), at(12)).unwrap(), 2);
    }

    #[test]
    fn ledger_rows_cannot_be_changed() {
        let store = store();
        let entry = LedgerEntry::new("u1", ActivityKind::BlogPost, Some("p1"), 15, at(9));
        store.insert_ledger_entry(&entry).unwrap();

        assert!(store
            .conn
            .execute("UPDATE ledger_entry SET points_awarded = 1000", [])
            .is_err());
        assert!(store.conn.execute("DELETE FROM ledger_entry", []).is_err());
        assert_eq!(store.ledger_total("u1").unwrap(), 15);
    }
}
