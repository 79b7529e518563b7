// ============================================================================
// src/store/export.rs – Single-user message export
// ============================================================================

//! Layout written into the export directory:
//!
//! * `user.json` – realm public metadata, the user's profile, the streams the
//!   exported messages belong to and the realm's linkifiers.
//! * `messages-000001.json`, … – the messages the user received, ordered by
//!   id, at most `chunk_size` per file.

use anyhow::{Context, Result};
use rusqlite::params;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::models::{Linkifier, Stream, UserProfile};
use super::Store;
use crate::util::atomic::atomic_write_json;

#[derive(Serialize)]
struct RealmMeta<'a> {
    id: i64,
    string_id: &'a str,
    name: &'a str,
    date_created: i64,
}

#[derive(Serialize)]
struct UserFile<'a> {
    realm: RealmMeta<'a>,
    user_profile: &'a UserProfile,
    streams: Vec<Stream>,
    linkifiers: Vec<Linkifier>,
}

#[derive(Debug, Serialize)]
pub struct ExportedMessage {
    pub id: i64,
    pub sender_id: i64,
    pub sender_email: String,
    pub stream_id: Option<i64>,
    pub subject: String,
    pub content: String,
    pub date_sent: i64,
    pub flags: i64,
}

#[derive(Serialize)]
struct MessageChunk<'a> {
    messages: &'a [ExportedMessage],
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub messages: usize,
    pub files: Vec<PathBuf>,
}

impl Store {
    /// Write the message history of `user` into `output_dir`, which must exist.
    pub fn export_user(
        &self,
        user: &UserProfile,
        output_dir: &Path,
        chunk_size: usize,
    ) -> Result<ExportSummary> {
        let chunk_size = chunk_size.max(1);
        let realm = self.realm_by_id(user.realm_id)?;
        let mut summary = ExportSummary::default();
        let mut stream_ids = BTreeSet::new();

        let mut after_id = 0_i64;
        let mut chunk_no = 0;
        loop {
            let chunk = self.received_messages(user.id, after_id, chunk_size)?;
            let Some(last) = chunk.last() else { break };
            after_id = last.id;
            chunk_no += 1;
            stream_ids.extend(chunk.iter().filter_map(|m| m.stream_id));

            let path = output_dir.join(format!("messages-{chunk_no:06}.json"));
            atomic_write_json(&path, &MessageChunk { messages: &chunk })?;
            debug!(file = %path.display(), messages = chunk.len(), "wrote message chunk");
            summary.messages += chunk.len();
            summary.files.push(path);
        }

        let user_file = UserFile {
            realm: RealmMeta {
                id: realm.id,
                string_id: &realm.string_id,
                name: &realm.name,
                date_created: realm.date_created.timestamp(),
            },
            user_profile: user,
            streams: self.streams_by_id(&stream_ids)?,
            linkifiers: self.linkifiers_for_realm(realm.id)?,
        };
        let path = output_dir.join("user.json");
        atomic_write_json(&path, &user_file)?;
        summary.files.insert(0, path);

        info!(user = %user.delivery_email, messages = summary.messages, "user exported");
        Ok(summary)
    }

    fn received_messages(&self, user_id: i64, after_id: i64, limit: usize) -> Result<Vec<ExportedMessage>> {
        let mut stmt = self.conn().prepare(
            "select m.id, m.sender_id, s.delivery_email, m.stream_id, m.subject, m.content,
                    m.date_sent, um.flags
             from user_message um
             join message m on m.id = um.message_id
             join user_profile s on s.id = m.sender_id
             where um.user_profile_id = ?1 and m.id > ?2
             order by m.id
             limit ?3",
        )?;
        let rows = stmt.query_map(params![user_id, after_id, limit as i64], |r| {
            Ok(ExportedMessage {
                id: r.get(0)?,
                sender_id: r.get(1)?,
                sender_email: r.get(2)?,
                stream_id: r.get(3)?,
                subject: r.get(4)?,
                content: r.get(5)?,
                date_sent: r.get(6)?,
                flags: r.get(7)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("query received messages")
    }

    fn streams_by_id(&self, ids: &BTreeSet<i64>) -> Result<Vec<Stream>> {
        let mut stmt = self
            .conn()
            .prepare("select id, name, invite_only from stream where id = ?1")?;
        let mut streams = Vec::with_capacity(ids.len());
        for id in ids {
            let stream = stmt
                .query_row([id], |r| {
                    Ok(Stream {
                        id: r.get(0)?,
                        name: r.get(1)?,
                        invite_only: r.get(2)?,
                    })
                })
                .with_context(|| format!("load stream {id}"))?;
            streams.push(stream);
        }
        Ok(streams)
    }
}
