// ============================================================================
// src/store/realms.rs – Realm, user, session and group queries
// ============================================================================

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, OptionalExtension};
use std::collections::HashSet;
use tracing::{debug, info};

use super::models::{Realm, Role, Session, UserProfile};
use super::{cutoff_before, from_ts, to_ts, Store};

/// Bots every realm is expected to carry, as `(local part, display name)`.
pub const REALM_INTERNAL_BOTS: &[(&str, &str)] = &[
    ("welcome-bot", "Welcome Bot"),
    ("notification-bot", "Notification Bot"),
    ("reminder-bot", "Reminder Bot"),
];

impl Store {
    /// Look a realm up by numeric id first, then by string id.
    pub fn find_realm(&self, selector: &str) -> Result<Option<Realm>> {
        if let Ok(id) = selector.parse::<i64>() {
            let sql = format!("select {} from realm where id = ?1", Realm::COLUMNS);
            let found = self
                .conn()
                .query_row(&sql, [id], Realm::from_row)
                .optional()
                .context("query realm by id")?;
            if found.is_some() {
                return Ok(found);
            }
        }
        let sql = format!("select {} from realm where string_id = ?1", Realm::COLUMNS);
        self.conn()
            .query_row(&sql, [selector], Realm::from_row)
            .optional()
            .context("query realm by string id")
    }

    pub fn realm_by_id(&self, id: i64) -> Result<Realm> {
        let sql = format!("select {} from realm where id = ?1", Realm::COLUMNS);
        self.conn()
            .query_row(&sql, [id], Realm::from_row)
            .with_context(|| format!("load realm {id}"))
    }

    pub fn list_realms(&self) -> Result<Vec<Realm>> {
        let sql = format!("select {} from realm order by id", Realm::COLUMNS);
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map([], Realm::from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("list realms")
    }

    /// Users whose delivery email matches case-insensitively, optionally
    /// restricted to one realm.
    pub fn users_by_email(&self, email: &str, realm_id: Option<i64>) -> Result<Vec<UserProfile>> {
        let sql = format!(
            "select {} from user_profile
             where delivery_email = ?1 collate nocase and (?2 is null or realm_id = ?2)
             order by id",
            UserProfile::COLUMNS
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params![email, realm_id], UserProfile::from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("query users by email")
    }

    /// Active owners and administrators, bots included, ordered by email.
    pub fn admin_users_and_bots(&self, realm_id: i64) -> Result<Vec<UserProfile>> {
        let sql = format!(
            "select {} from user_profile
             where realm_id = ?1 and is_active = 1 and role in (?2, ?3)
             order by delivery_email collate nocase",
            UserProfile::COLUMNS
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(
            params![realm_id, Role::Owner.as_i64(), Role::Administrator.as_i64()],
            UserProfile::from_row,
        )?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("query realm admins")
    }

    pub fn human_owner_ids(&self, realm_id: i64) -> Result<HashSet<i64>> {
        let mut stmt = self.conn().prepare(
            "select id from user_profile
             where realm_id = ?1 and is_active = 1 and is_bot = 0 and role = ?2",
        )?;
        let rows = stmt.query_map(params![realm_id, Role::Owner.as_i64()], |r| r.get(0))?;
        rows.collect::<rusqlite::Result<HashSet<i64>>>()
            .context("query realm owners")
    }

    /// Sessions of `user_id` that have not expired at `now`.
    pub fn active_sessions(&self, user_id: i64, now: DateTime<Utc>) -> Result<Vec<Session>> {
        let mut stmt = self.conn().prepare(
            "select session_key, expire_date, data from session
             where user_id = ?1 and expire_date > ?2 order by expire_date",
        )?;
        let rows = stmt.query_map(params![user_id, to_ts(now)], |r| {
            let data: String = r.get(2)?;
            Ok(Session {
                session_key: r.get(0)?,
                expire_date: from_ts(r.get(1)?),
                data: serde_json::from_str(&data).unwrap_or(serde_json::Value::String(data)),
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("query sessions")
    }

    pub fn active_bots_owned_by(&self, user_id: i64) -> Result<Vec<UserProfile>> {
        let sql = format!(
            "select {} from user_profile
             where bot_owner_id = ?1 and is_bot = 1 and is_active = 1 order by id",
            UserProfile::COLUMNS
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map([user_id], UserProfile::from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("query owned bots")
    }

    /// Deactivate a user and the bots they own, and drop their sessions.
    /// Returns the number of bots deactivated.
    pub fn deactivate_user(&mut self, user_id: i64) -> Result<usize> {
        let tx = self.conn_mut().transaction()?;
        tx.execute("update user_profile set is_active = 0 where id = ?1", [user_id])?;
        let bots = tx.execute(
            "update user_profile set is_active = 0
             where bot_owner_id = ?1 and is_bot = 1 and is_active = 1",
            [user_id],
        )?;
        let sessions = tx.execute("delete from session where user_id = ?1", [user_id])?;
        tx.commit().context("commit user deactivation")?;
        info!(user_id, bots, sessions, "user deactivated");
        Ok(bots)
    }

    pub fn active_human_count(&self, realm_id: i64) -> Result<i64> {
        self.conn()
            .query_row(
                "select count(*) from user_profile where realm_id = ?1 and is_active = 1 and is_bot = 0",
                [realm_id],
                |r| r.get(0),
            )
            .context("count realm users")
    }

    pub fn message_count(&self, realm_id: i64) -> Result<i64> {
        self.conn()
            .query_row(
                "select count(*) from message where realm_id = ?1",
                [realm_id],
                |r| r.get(0),
            )
            .context("count realm messages")
    }

    /// Remove the realm row; every dependent row goes with it via cascades.
    pub fn delete_realm(&mut self, realm_id: i64) -> Result<()> {
        let tx = self.conn_mut().transaction()?;
        let transactions = tx.execute("delete from archive_transaction where realm_id = ?1", [realm_id])?;
        let realms = tx.execute("delete from realm where id = ?1", [realm_id])?;
        tx.commit().context("commit realm deletion")?;
        info!(realm_id, realms, transactions, "realm deleted");
        Ok(())
    }

    /// Add every eligible user past their realm's waiting period to the
    /// full-members group. Returns `(realm string id, newly promoted)` pairs.
    pub fn promote_new_full_members(&mut self, now: DateTime<Utc>) -> Result<Vec<(String, usize)>> {
        let realms = self.list_realms()?;
        let tx = self.conn_mut().transaction()?;
        let mut promoted = Vec::with_capacity(realms.len());
        for realm in realms.iter().filter(|r| !r.deactivated) {
            let cutoff = cutoff_before(
                now,
                Duration::try_days(realm.waiting_period_threshold),
                &format!("waiting period of realm {}", realm.string_id),
            )?;
            let added = tx.execute(
                "insert or ignore into full_member (realm_id, user_id)
                 select realm_id, id from user_profile
                 where realm_id = ?1 and is_active = 1 and is_bot = 0
                   and role <= ?2 and date_joined <= ?3",
                params![realm.id, Role::Member.as_i64(), to_ts(cutoff)],
            )?;
            debug!(realm = %realm.string_id, added, "full members promoted");
            promoted.push((realm.string_id.clone(), added));
        }
        tx.commit().context("commit full member promotion")?;
        Ok(promoted)
    }

    #[cfg(test)]
    pub fn is_full_member(&self, realm_id: i64, user_id: i64) -> Result<bool> {
        self.conn()
            .query_row(
                "select exists(select 1 from full_member where realm_id = ?1 and user_id = ?2)",
                params![realm_id, user_id],
                |r| r.get(0),
            )
            .context("query full member")
    }

    /// Create any internal bot missing from any realm. Returns the emails created,
    /// prefixed with the realm string id.
    pub fn create_missing_internal_bots(
        &mut self,
        bot_domain: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>> {
        let realms = self.list_realms()?;
        let tx = self.conn_mut().transaction()?;
        let mut created = Vec::new();
        for realm in &realms {
            for (local, name) in REALM_INTERNAL_BOTS {
                let email = format!("{local}@{bot_domain}");
                let exists: bool = tx.query_row(
                    "select exists(select 1 from user_profile
                     where realm_id = ?1 and delivery_email = ?2 collate nocase)",
                    params![realm.id, email],
                    |r| r.get(0),
                )?;
                if exists {
                    continue;
                }
                tx.execute(
                    "insert into user_profile (realm_id, delivery_email, full_name, role, is_bot, date_joined)
                     values (?1, ?2, ?3, ?4, 1, ?5)",
                    params![realm.id, email, name, Role::Member.as_i64(), to_ts(now)],
                )?;
                created.push(format!("{}: {email}", realm.string_id));
            }
        }
        tx.commit().context("commit internal bots")?;
        Ok(created)
    }
}
