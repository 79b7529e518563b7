// ============================================================================
// src/store/mod.rs – SQLite-backed realm store
// ============================================================================

pub mod attachments;
pub mod export;
pub mod linkifiers;
pub mod models;
pub mod queue;
pub mod realms;
pub mod retention;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use std::path::Path;

pub use models::{Realm, Role, UserProfile};

use crate::error::AdminError;

const SCHEMA: &str = r#"
create table if not exists realm (
  id integer primary key,
  string_id text not null unique,
  name text not null,
  deactivated integer not null default 0,
  message_retention_days integer null,
  waiting_period_threshold integer not null default 0,
  date_created integer not null
);

create table if not exists user_profile (
  id integer primary key,
  realm_id integer not null references realm(id) on delete cascade,
  delivery_email text not null,
  full_name text not null,
  role integer not null default 400,
  is_bot integer not null default 0,
  bot_owner_id integer null references user_profile(id) on delete set null,
  is_active integer not null default 1,
  date_joined integer not null
);
create index if not exists user_profile_email on user_profile(delivery_email collate nocase);

create table if not exists stream (
  id integer primary key,
  realm_id integer not null references realm(id) on delete cascade,
  name text not null,
  invite_only integer not null default 0,
  message_retention_days integer null
);

create table if not exists message (
  -- ids carry over into the archive and must never be reused
  id integer primary key autoincrement,
  realm_id integer not null references realm(id) on delete cascade,
  sender_id integer not null references user_profile(id) on delete cascade,
  stream_id integer null references stream(id) on delete cascade,
  subject text not null default '',
  content text not null,
  date_sent integer not null
);
create index if not exists message_date_sent on message(realm_id, date_sent);

create table if not exists user_message (
  -- ids carry over into the archive and must never be reused
  id integer primary key autoincrement,
  user_profile_id integer not null references user_profile(id) on delete cascade,
  message_id integer not null references message(id) on delete cascade,
  flags integer not null default 0,
  unique (user_profile_id, message_id)
);

-- A batch of messages moved to the archive together; vacuumed as a unit.
create table if not exists archive_transaction (
  id integer primary key,
  realm_id integer null references realm(id) on delete cascade,
  timestamp integer not null,
  restored integer not null default 0
);

create table if not exists archived_message (
  id integer primary key,
  realm_id integer not null references realm(id) on delete cascade,
  sender_id integer not null,
  stream_id integer null,
  subject text not null default '',
  content text not null,
  date_sent integer not null,
  archive_transaction_id integer not null references archive_transaction(id) on delete cascade
);

create table if not exists archived_user_message (
  id integer primary key,
  user_profile_id integer not null,
  message_id integer not null references archived_message(id) on delete cascade,
  flags integer not null default 0
);

create table if not exists attachment (
  -- ids carry over into the archive and must never be reused
  id integer primary key autoincrement,
  realm_id integer not null references realm(id) on delete cascade,
  owner_id integer not null references user_profile(id) on delete cascade,
  path_id text not null unique,
  file_name text not null,
  size integer not null default 0,
  create_time integer not null
);

create table if not exists attachment_message (
  attachment_id integer not null references attachment(id) on delete cascade,
  message_id integer not null references message(id) on delete cascade,
  primary key (attachment_id, message_id)
);

create table if not exists archived_attachment (
  id integer primary key,
  realm_id integer not null references realm(id) on delete cascade,
  owner_id integer not null,
  path_id text not null unique,
  file_name text not null,
  size integer not null default 0,
  create_time integer not null
);

create table if not exists archived_attachment_message (
  archived_attachment_id integer not null references archived_attachment(id) on delete cascade,
  archived_message_id integer not null references archived_message(id) on delete cascade,
  primary key (archived_attachment_id, archived_message_id)
);

create table if not exists session (
  session_key text primary key,
  user_id integer not null references user_profile(id) on delete cascade,
  expire_date integer not null,
  data text not null default '{}'
);

create table if not exists realm_linkifier (
  id integer primary key,
  realm_id integer not null references realm(id) on delete cascade,
  pattern text not null,
  url_template text not null,
  unique (realm_id, pattern)
);

-- Membership of the realm's full-members system group.
create table if not exists full_member (
  realm_id integer not null references realm(id) on delete cascade,
  user_id integer not null references user_profile(id) on delete cascade,
  primary key (realm_id, user_id)
);

create table if not exists queue_event (
  id integer primary key,
  queue_name text not null,
  payload text not null,
  enqueued_at integer not null
);
"#;

/// Handle onto the realm database. Commands are single-threaded, so the
/// connection is owned directly rather than shared.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("open database {}", path.display()))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")
            .context("enable foreign keys")?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    /// Create any missing tables. Safe to run repeatedly.
    pub fn migrate(&self) -> Result<()> {
        self.conn
            .execute_batch(SCHEMA)
            .context("apply schema")?;
        Ok(())
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub(crate) fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}

pub(crate) fn to_ts(t: DateTime<Utc>) -> i64 {
    t.timestamp()
}

pub(crate) fn from_ts(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

/// `now` minus `age`, or a usage error when the age is out of range.
/// `what` names the setting for the operator.
pub(crate) fn cutoff_before(
    now: DateTime<Utc>,
    age: Option<Duration>,
    what: &str,
) -> Result<DateTime<Utc>, AdminError> {
    age.and_then(|age| now.checked_sub_signed(age))
        .ok_or_else(|| AdminError::Usage(format!("{what} is out of range")))
}
