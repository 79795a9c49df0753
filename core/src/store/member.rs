use super::PointsStore;
use crate::{error::LedgerResult, member::Member};
use rusqlite::{params, OptionalExtension};

impl PointsStore {
    // ── Member directory ──────────────────────────────────────────

    pub fn upsert_member(&self, member: &Member) -> LedgerResult<()> {
        self.conn.execute(
            "INSERT INTO member (user_id, name, email, active)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (user_id) DO UPDATE SET
                 name   = excluded.name,
                 email  = excluded.email,
                 active = excluded.active",
            params![&member.user_id, &member.name, &member.email, member.active],
        )?;
        Ok(())
    }

    pub fn get_member(&self, user_id: &str) -> LedgerResult<Option<Member>> {
        let member = self
            .conn
            .query_row(
                "SELECT user_id, name, email, active FROM member WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok(Member {
                        user_id: row.get(0)?,
                        name:    row.get(1)?,
                        email:   row.get(2)?,
                        active:  row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(member)
    }

    /// Returns false if no such member exists.
    pub fn set_member_active(&self, user_id: &str, active: bool) -> LedgerResult<bool> {
        let changed = self.conn.execute(
            "UPDATE member SET active = ?2 WHERE user_id = ?1",
            params![user_id, active],
        )?;
        Ok(changed > 0)
    }

    pub fn active_member_count(&self) -> LedgerResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM member WHERE active = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
