// ============================================================================
// src/store/attachments.rs – Attachment rows and unclaimed-upload queries
// ============================================================================

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Row};
use std::collections::BTreeSet;

use super::{cutoff_before, from_ts, to_ts, Store};

#[derive(Clone, Debug)]
pub struct AttachmentRow {
    pub id: i64,
    pub path_id: String,
    pub file_name: String,
    pub create_time: DateTime<Utc>,
}

impl AttachmentRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            path_id: row.get(1)?,
            file_name: row.get(2)?,
            create_time: from_ts(row.get(3)?),
        })
    }
}

/// Live and archived attachments that nothing references any more.
#[derive(Debug, Default)]
pub struct Unclaimed {
    pub attachments: Vec<AttachmentRow>,
    pub archived: Vec<AttachmentRow>,
}

impl Store {
    /// Attachments created more than `weeks` ago that neither a live nor an
    /// archived message points at.
    pub fn old_unclaimed_attachments(&self, now: DateTime<Utc>, weeks: i64) -> Result<Unclaimed> {
        let cutoff = to_ts(cutoff_before(now, Duration::try_weeks(weeks), "--weeks")?);
        let mut stmt = self.conn().prepare(
            "select a.id, a.path_id, a.file_name, a.create_time from attachment a
             where a.create_time < ?1
               and not exists (select 1 from attachment_message am where am.attachment_id = a.id)
               and not exists (select 1 from archived_attachment_message aam
                               where aam.archived_attachment_id = a.id)
             order by a.id",
        )?;
        let attachments = stmt
            .query_map([cutoff], AttachmentRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("query unclaimed attachments")?;

        let mut stmt = self.conn().prepare(
            "select aa.id, aa.path_id, aa.file_name, aa.create_time from archived_attachment aa
             where aa.create_time < ?1
               and not exists (select 1 from archived_attachment_message aam
                               where aam.archived_attachment_id = aa.id)
               and not exists (select 1 from attachment_message am where am.attachment_id = aa.id)
             order by aa.id",
        )?;
        let archived = stmt
            .query_map([cutoff], AttachmentRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("query unclaimed archived attachments")?;

        Ok(Unclaimed { attachments, archived })
    }

    /// Drop the given rows. Returns the storage paths no longer referenced by
    /// any attachment row, which the caller should delete from storage.
    pub fn delete_unclaimed(&mut self, unclaimed: &Unclaimed) -> Result<Vec<String>> {
        let tx = self.conn_mut().transaction()?;
        for a in &unclaimed.attachments {
            tx.execute("delete from attachment where id = ?1", [a.id])?;
        }
        for a in &unclaimed.archived {
            tx.execute("delete from archived_attachment where id = ?1", [a.id])?;
        }
        let candidates: BTreeSet<&str> = unclaimed
            .attachments
            .iter()
            .chain(&unclaimed.archived)
            .map(|a| a.path_id.as_str())
            .collect();
        let mut orphaned = Vec::new();
        for path_id in candidates {
            let still_used: bool = tx.query_row(
                "select exists(select 1 from attachment where path_id = ?1)
                     or exists(select 1 from archived_attachment where path_id = ?1)",
                [path_id],
                |r| r.get(0),
            )?;
            if !still_used {
                orphaned.push(path_id.to_string());
            }
        }
        tx.commit().context("commit unclaimed attachment deletion")?;
        Ok(orphaned)
    }

    /// True when a live or archived attachment row owns `path_id`.
    pub fn attachment_path_known(&self, path_id: &str) -> Result<bool> {
        self.conn()
            .query_row(
                "select exists(select 1 from attachment where path_id = ?1)
                     or exists(select 1 from archived_attachment where path_id = ?1)",
                params![path_id],
                |r| r.get(0),
            )
            .context("query attachment path")
    }

    /// Every storage path owned by the realm, live or archived.
    pub fn realm_attachment_paths(&self, realm_id: i64) -> Result<Vec<String>> {
        let mut stmt = self.conn().prepare(
            "select path_id from attachment where realm_id = ?1
             union
             select path_id from archived_attachment where realm_id = ?1
             order by 1",
        )?;
        let rows = stmt.query_map([realm_id], |r| r.get(0))?;
        rows.collect::<rusqlite::Result<Vec<String>>>()
            .context("query realm attachments")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fixtures::{self, days_ago, now};
    use crate::error::AdminError;
    use crate::store::models::Role;

    #[test]
    fn only_old_unreferenced_attachments_are_unclaimed() {
        let mut store = Store::open_in_memory().unwrap();
        let r = fixtures::realm(&store, "zulip", Some(1));
        let u = fixtures::user(&store, r, "a@x.com", "A", Role::Member);
        let m = fixtures::message(&store, r, u, None, "m", days_ago(2), &[u]);
        fixtures::attachment(&store, r, u, "1/aa/claimed.png", days_ago(60), &[m]);
        fixtures::attachment(&store, r, u, "1/bb/orphan.png", days_ago(60), &[]);
        fixtures::attachment(&store, r, u, "1/cc/recent.png", days_ago(3), &[]);

        let found = store.old_unclaimed_attachments(now(), 5).unwrap();
        let paths: Vec<_> = found.attachments.iter().map(|a| a.path_id.as_str()).collect();
        assert_eq!(paths, vec!["1/bb/orphan.png"]);
        assert!(found.archived.is_empty());

        // Once archived, the claimed attachment is still referenced by the archive.
        store.archive_messages(now(), 1000).unwrap();
        let found = store.old_unclaimed_attachments(now(), 5).unwrap();
        assert_eq!(found.attachments.len(), 1);
        assert!(found.archived.is_empty());

        // Vacuuming the archive releases both copies.
        store.clean_archived_data(now() + Duration::days(60), 30).unwrap();
        let found = store.old_unclaimed_attachments(now(), 5).unwrap();
        assert_eq!(found.attachments.len(), 2);
        assert_eq!(found.archived.len(), 1);

        let orphaned = store.delete_unclaimed(&found).unwrap();
        assert_eq!(orphaned, vec!["1/aa/claimed.png", "1/bb/orphan.png"]);
        assert!(store.attachment_path_known("1/cc/recent.png").unwrap());
        assert!(!store.attachment_path_known("1/aa/claimed.png").unwrap());
    }

    #[test]
    fn huge_week_count_is_a_usage_error() {
        let store = Store::open_in_memory().unwrap();
        let err = store.old_unclaimed_attachments(now(), 1_000_000_000).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AdminError>(),
            Some(AdminError::Usage(m)) if m == "--weeks is out of range"
        ));
    }

    #[test]
    fn realm_paths_merge_live_and_archived() {
        let mut store = Store::open_in_memory().unwrap();
        let r = fixtures::realm(&store, "zulip", Some(1));
        let u = fixtures::user(&store, r, "a@x.com", "A", Role::Member);
        let m = fixtures::message(&store, r, u, None, "m", days_ago(2), &[u]);
        fixtures::attachment(&store, r, u, "1/aa/a.png", days_ago(2), &[m]);
        fixtures::attachment(&store, r, u, "1/bb/b.png", days_ago(2), &[]);
        store.archive_messages(now(), 1000).unwrap();

        assert_eq!(
            store.realm_attachment_paths(r).unwrap(),
            vec!["1/aa/a.png", "1/bb/b.png"]
        );
    }
}
