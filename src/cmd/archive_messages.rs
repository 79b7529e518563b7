// ============================================================================
// src/cmd/archive_messages.rs – Vacuum old archives, then archive expired messages
// ============================================================================

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::config::Retention;
use crate::store::retention::ArchiveReport;
use crate::store::Store;
use crate::ui::UX;
use crate::util::audit::AuditLog;

pub fn run(
    ux: &UX,
    store: &mut Store,
    cfg: &Retention,
    audit: &AuditLog,
    now: DateTime<Utc>,
) -> Result<ArchiveReport> {
    let vacuumed = store.clean_archived_data(now, cfg.archived_data_vacuuming_delay_days)?;
    let report = store.archive_messages(now, cfg.batch_size)?;

    ux.line(&format!(
        "Removed {vacuumed} archive transactions older than {} days.",
        cfg.archived_data_vacuuming_delay_days
    ));
    ux.line(&format!(
        "Archived {} messages in {} transactions.",
        report.messages, report.transactions
    ));
    audit.record(
        "ARCHIVE_MESSAGES",
        &format!(
            "vacuumed={vacuumed} archived={} transactions={}",
            report.messages, report.transactions
        ),
    );
    Ok(report)
}
