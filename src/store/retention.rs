// ============================================================================
// src/store/retention.rs – Message retention: archive and vacuum
// ============================================================================

//! Messages older than their retention period move to the `archived_*`
//! tables in batches, one archive transaction per batch. Archive
//! transactions older than the vacuuming delay are then deleted for good.
//!
//! The effective retention of a message is its stream's
//! `message_retention_days` when set, otherwise its realm's. A missing or
//! non-positive value (conventionally -1) keeps messages forever.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Transaction};
use tracing::{debug, info};

use super::{cutoff_before, to_ts, Store};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveReport {
    pub messages: usize,
    pub transactions: usize,
}

const SECONDS_PER_DAY: i64 = 86_400;

impl Store {
    /// Delete archive transactions (and everything archived under them)
    /// older than `delay_days`. Returns the number of transactions removed.
    pub fn clean_archived_data(&mut self, now: DateTime<Utc>, delay_days: i64) -> Result<usize> {
        let cutoff = cutoff_before(
            now,
            Duration::try_days(delay_days),
            "retention.archived_data_vacuuming_delay_days",
        )?;
        let removed = self
            .conn()
            .execute(
                "delete from archive_transaction where timestamp < ?1",
                [to_ts(cutoff)],
            )
            .context("vacuum archive transactions")?;
        info!(removed, cutoff = %cutoff, "archived data vacuumed");
        Ok(removed)
    }

    /// Move every message past its retention period into the archive.
    pub fn archive_messages(&mut self, now: DateTime<Utc>, batch_size: usize) -> Result<ArchiveReport> {
        let batch_size = batch_size.max(1);
        let mut report = ArchiveReport::default();
        for realm in self.list_realms()? {
            let tx = self.conn_mut().transaction()?;
            tx.execute_batch(
                "create temp table if not exists archive_batch (id integer primary key);
                 delete from temp.archive_batch;",
            )?;
            let mut realm_total = 0;
            loop {
                let picked = tx.execute(
                    "insert into temp.archive_batch (id)
                     select m.id from message m
                     left join stream s on s.id = m.stream_id
                     where m.realm_id = ?1
                       and coalesce(s.message_retention_days, ?2) > 0
                       and m.date_sent < ?3 - coalesce(s.message_retention_days, ?2) * ?4
                     order by m.id
                     limit ?5",
                    params![
                        realm.id,
                        realm.message_retention_days,
                        to_ts(now),
                        SECONDS_PER_DAY,
                        batch_size as i64
                    ],
                )?;
                if picked == 0 {
                    break;
                }
                move_batch_to_archive(&tx, realm.id, now)?;
                realm_total += picked;
                report.transactions += 1;
                debug!(realm = %realm.string_id, picked, "archived message batch");
            }
            tx.commit()
                .with_context(|| format!("commit archive for realm {}", realm.string_id))?;
            if realm_total > 0 {
                info!(realm = %realm.string_id, messages = realm_total, "messages archived");
            }
            report.messages += realm_total;
        }
        Ok(report)
    }

    #[cfg(test)]
    pub fn archived_message_count(&self) -> Result<i64> {
        self.conn()
            .query_row("select count(*) from archived_message", [], |r| r.get(0))
            .context("count archived messages")
    }
}

/// Copy the rows selected in `temp.archive_batch` into the archive under a new
/// archive transaction, then delete the live rows.
fn move_batch_to_archive(tx: &Transaction<'_>, realm_id: i64, now: DateTime<Utc>) -> Result<()> {
    tx.execute(
        "insert into archive_transaction (realm_id, timestamp) values (?1, ?2)",
        params![realm_id, to_ts(now)],
    )?;
    let archive_id = tx.last_insert_rowid();

    tx.execute(
        "insert into archived_message
           (id, realm_id, sender_id, stream_id, subject, content, date_sent, archive_transaction_id)
         select id, realm_id, sender_id, stream_id, subject, content, date_sent, ?1
         from message where id in (select id from temp.archive_batch)",
        [archive_id],
    )?;
    tx.execute(
        "insert into archived_user_message (id, user_profile_id, message_id, flags)
         select id, user_profile_id, message_id, flags
         from user_message where message_id in (select id from temp.archive_batch)",
        [],
    )?;
    tx.execute(
        "insert or ignore into archived_attachment
           (id, realm_id, owner_id, path_id, file_name, size, create_time)
         select a.id, a.realm_id, a.owner_id, a.path_id, a.file_name, a.size, a.create_time
         from attachment a
         where a.id in (select attachment_id from attachment_message
                        where message_id in (select id from temp.archive_batch))",
        [],
    )?;
    tx.execute(
        "insert or ignore into archived_attachment_message (archived_attachment_id, archived_message_id)
         select attachment_id, message_id from attachment_message
         where message_id in (select id from temp.archive_batch)",
        [],
    )?;
    // user_message and attachment_message rows cascade.
    tx.execute(
        "delete from message where id in (select id from temp.archive_batch)",
        [],
    )?;
    tx.execute("delete from temp.archive_batch", [])?;
    Ok(())
}
