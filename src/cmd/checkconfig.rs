// ============================================================================
// src/cmd/checkconfig.rs – Validate the tool configuration before use
// ============================================================================

use anyhow::Result;
use tracing::debug;

use crate::cmd::export_single_user::tar_runner;
use crate::config::Config;
use crate::error::AdminError;
use crate::ui::UX;

/// Every problem found in `cfg`, in a stable order. Empty means usable.
pub fn problems(cfg: &Config) -> Vec<String> {
    let mut found = Vec::new();

    match cfg.database.path.parent() {
        Some(dir) if dir.as_os_str().is_empty() || dir.is_dir() => {}
        Some(dir) => found.push(format!("database directory {} does not exist", dir.display())),
        None => found.push(format!("database path {} has no parent", cfg.database.path.display())),
    }
    if !cfg.uploads.local_dir.is_dir() {
        found.push(format!(
            "uploads directory {} does not exist",
            cfg.uploads.local_dir.display()
        ));
    }
    if cfg.retention.batch_size == 0 {
        found.push("retention.batch_size must be positive".to_string());
    }
    if cfg.export.chunk_size == 0 {
        found.push("export.chunk_size must be positive".to_string());
    }
    if let Err(e) = tar_runner(&cfg.export) {
        found.push(format!("tar is unusable: {e}"));
    }
    if cfg.bots.internal_bot_domain.trim().is_empty() {
        found.push("bots.internal_bot_domain must not be empty".to_string());
    }

    debug!(problems = found.len(), "configuration checked");
    found
}

pub fn run(ux: &UX, cfg: &Config) -> Result<()> {
    let found = problems(cfg);
    if !found.is_empty() {
        return Err(AdminError::Config(found).into());
    }
    ux.data_panel(
        "Configuration",
        &[
            ("database", cfg.database.path.display().to_string()),
            ("uploads", cfg.uploads.local_dir.display().to_string()),
            ("queue", if cfg.queue.enabled { "enabled" } else { "disabled" }.to_string()),
            (
                "audit",
                if cfg.audit.enabled {
                    cfg.audit.log_path.display().to_string()
                } else {
                    "disabled".to_string()
                },
            ),
        ],
    );
    ux.blank();
    ux.success("Configuration OK.");
    Ok(())
}
