// ============================================================================
// src/cmd/delete_old_unclaimed_attachments.rs – Reap uploads no message uses
// ============================================================================

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::error::AdminError;
use crate::store::Store;
use crate::ui::UX;
use crate::util::audit::AuditLog;
use crate::util::upload::LocalUploads;

/// Files are uploaded before their database row is written, so very recent
/// files without a row are left alone.
const STORAGE_GRACE_MINUTES: i64 = 5;
const STORAGE_DELETE_BATCH: usize = 1000;

#[derive(Debug, Clone, Copy)]
pub struct ReapOptions {
    pub weeks: i64,
    pub for_real: bool,
    pub clean_up_storage: bool,
}

impl Default for ReapOptions {
    fn default() -> Self {
        Self {
            weeks: 5,
            for_real: false,
            clean_up_storage: false,
        }
    }
}

pub fn run(
    ux: &UX,
    store: &mut Store,
    uploads: &LocalUploads,
    audit: &AuditLog,
    now: DateTime<Utc>,
    opts: ReapOptions,
) -> Result<()> {
    ux.line(&format!(
        "Deleting unclaimed attached files older than {} weeks",
        opts.weeks
    ));

    let unclaimed = store.old_unclaimed_attachments(now, opts.weeks)?;
    for a in unclaimed.attachments.iter().chain(&unclaimed.archived) {
        ux.line(&format!("* {} created at {}", a.file_name, a.create_time));
    }

    if opts.for_real {
        let orphaned = store.delete_unclaimed(&unclaimed)?;
        let removed = uploads.delete_many(&orphaned)?;
        audit.record(
            "ATTACHMENTS_DELETE",
            &format!(
                "rows={} files={removed}",
                unclaimed.attachments.len() + unclaimed.archived.len()
            ),
        );
        ux.blank();
        ux.success("Unclaimed files deleted.");
    }

    if opts.clean_up_storage {
        ux.blank();
        clean_attachment_upload_backend(ux, store, uploads, now, !opts.for_real)?;
    }

    if !opts.for_real {
        ux.blank();
        return Err(AdminError::DryRun("delete").into());
    }
    Ok(())
}

/// Remove stored files that no attachment row (live or archived) owns.
pub fn clean_attachment_upload_backend(
    ux: &UX,
    store: &Store,
    uploads: &LocalUploads,
    now: DateTime<Utc>,
    dry_run: bool,
) -> Result<usize> {
    let cutoff = now - Duration::minutes(STORAGE_GRACE_MINUTES);
    ux.line(&format!(
        "Removing extra files in storage back-end older than {}",
        cutoff.to_rfc3339()
    ));

    let mut to_delete: Vec<String> = Vec::new();
    let mut deleted = 0;
    for (path_id, modified_at) in uploads.all_files()? {
        if store.attachment_path_known(&path_id)? || modified_at > cutoff {
            continue;
        }
        ux.line(&format!("* {path_id} modified at {modified_at}"));
        if dry_run {
            continue;
        }
        to_delete.push(path_id);
        if to_delete.len() >= STORAGE_DELETE_BATCH {
            deleted += uploads.delete_many(&to_delete)?;
            to_delete.clear();
        }
    }
    if !to_delete.is_empty() {
        deleted += uploads.delete_many(&to_delete)?;
    }
    info!(deleted, dry_run, "storage sweep finished");
    Ok(deleted)
}
