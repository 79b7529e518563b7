// ============================================================================
// src/util/audit.rs – Minimal append-only audit trail
// ============================================================================

use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::config::Audit;

/// Where destructive operations are recorded, if anywhere.
#[derive(Clone, Debug)]
pub struct AuditLog {
    path: Option<PathBuf>,
}

impl AuditLog {
    pub fn from_config(cfg: &Audit) -> Self {
        Self {
            path: cfg.enabled.then(|| cfg.log_path.clone()),
        }
    }

    pub fn disabled() -> Self {
        Self { path: None }
    }

    #[cfg(test)]
    pub fn at(path: &Path) -> Self {
        Self {
            path: Some(path.to_path_buf()),
        }
    }

    /// Append a timestamped event (0600 permissions). An unwritable log is
    /// reported through tracing and otherwise ignored.
    pub fn record(&self, event: &str, detail: &str) {
        let Some(path) = &self.path else { return };
        if let Err(e) = append(path, event, detail) {
            warn!(path = %path.display(), error = %e, "audit log unwritable");
        }
    }
}

fn append(path: &Path, event: &str, detail: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .mode(0o600)
        .open(path)?;
    let ts = Local::now().format("%Y-%m-%d %H:%M:%S");
    writeln!(file, "[{ts}] {event}: {detail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let log = AuditLog::at(&path);
        log.record("USER_DEACTIVATE", "hamlet@x.com");
        log.record("REALM_DELETE", "zulip");

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("USER_DEACTIVATE: hamlet@x.com"));
    }

    #[test]
    fn disabled_log_writes_nothing() {
        let cfg = Audit {
            enabled: false,
            log_path: PathBuf::from("/nonexistent/dir/audit.log"),
        };
        AuditLog::from_config(&cfg).record("X", "y");
        AuditLog::disabled().record("X", "y");
    }
}
