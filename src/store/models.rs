// ============================================================================
// src/store/models.rs – Row types read from the realm store
// ============================================================================

use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::Serialize;

use super::from_ts;

/// Organization-level role. Lower values carry more privilege.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Administrator,
    Moderator,
    Member,
    Guest,
}

impl Role {
    pub fn as_i64(self) -> i64 {
        match self {
            Role::Owner => 100,
            Role::Administrator => 200,
            Role::Moderator => 300,
            Role::Member => 400,
            Role::Guest => 600,
        }
    }

    /// Unknown codes are treated as the least privileged role.
    pub fn from_i64(code: i64) -> Self {
        match code {
            100 => Role::Owner,
            200 => Role::Administrator,
            300 => Role::Moderator,
            400 => Role::Member,
            _ => Role::Guest,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Realm {
    pub id: i64,
    pub string_id: String,
    pub name: String,
    pub deactivated: bool,
    pub message_retention_days: Option<i64>,
    pub waiting_period_threshold: i64,
    pub date_created: DateTime<Utc>,
}

impl Realm {
    pub(crate) const COLUMNS: &'static str = "id, string_id, name, deactivated, \
        message_retention_days, waiting_period_threshold, date_created";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            string_id: row.get(1)?,
            name: row.get(2)?,
            deactivated: row.get(3)?,
            message_retention_days: row.get(4)?,
            waiting_period_threshold: row.get(5)?,
            date_created: from_ts(row.get(6)?),
        })
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct UserProfile {
    pub id: i64,
    pub realm_id: i64,
    pub delivery_email: String,
    pub full_name: String,
    pub role: Role,
    pub is_bot: bool,
    pub bot_owner_id: Option<i64>,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

impl UserProfile {
    pub(crate) const COLUMNS: &'static str = "id, realm_id, delivery_email, full_name, role, \
        is_bot, bot_owner_id, is_active, date_joined";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            realm_id: row.get(1)?,
            delivery_email: row.get(2)?,
            full_name: row.get(3)?,
            role: Role::from_i64(row.get(4)?),
            is_bot: row.get(5)?,
            bot_owner_id: row.get(6)?,
            is_active: row.get(7)?,
            date_joined: from_ts(row.get(8)?),
        })
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Stream {
    pub id: i64,
    pub name: String,
    pub invite_only: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct Session {
    pub session_key: String,
    pub expire_date: DateTime<Utc>,
    pub data: serde_json::Value,
}

#[derive(Clone, Debug, Serialize)]
pub struct Linkifier {
    pub pattern: String,
    pub url_template: String,
}

#[cfg(test)]
mod tests {
    use super::Role;

    #[test]
    fn unknown_role_codes_are_least_privileged() {
        for role in [Role::Owner, Role::Administrator, Role::Moderator, Role::Member, Role::Guest] {
            assert_eq!(Role::from_i64(role.as_i64()), role);
        }
        assert!(Role::Owner.as_i64() < Role::Member.as_i64());
        assert_eq!(Role::from_i64(999), Role::Guest);
    }
}
