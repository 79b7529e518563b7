// ============================================================================
// src/config.rs – strict config loader
// ============================================================================

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    /// SQLite file holding realms, users and messages.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("/var/lib/realm-admin/realms.db")
}

impl Default for Database {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Queue {
    /// When false, publishing fails instead of spooling the event.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Default for Queue {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Retention {
    #[serde(default = "default_vacuum_delay_days")]
    pub archived_data_vacuuming_delay_days: i64,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_vacuum_delay_days() -> i64 {
    30
}

fn default_batch_size() -> usize {
    1000
}

impl Default for Retention {
    fn default() -> Self {
        Self {
            archived_data_vacuuming_delay_days: default_vacuum_delay_days(),
            batch_size: default_batch_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Export {
    /// Messages per `messages-NNNNNN.json` file.
    #[serde(default = "default_batch_size")]
    pub chunk_size: usize,
    #[serde(default = "default_tar_timeout_secs")]
    pub tar_timeout_secs: u64,
    /// Optional explicit path to tar (must be allowlisted)
    #[serde(default)]
    pub tar_path: Option<String>,
}

fn default_tar_timeout_secs() -> u64 {
    600
}

impl Default for Export {
    fn default() -> Self {
        Self {
            chunk_size: default_batch_size(),
            tar_timeout_secs: default_tar_timeout_secs(),
            tar_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Uploads {
    /// Root of the local attachment storage; attachment `path_id`s are relative to it.
    #[serde(default = "default_upload_dir")]
    pub local_dir: PathBuf,
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("/var/lib/realm-admin/uploads")
}

impl Default for Uploads {
    fn default() -> Self {
        Self {
            local_dir: default_upload_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bots {
    #[serde(default = "default_internal_bot_domain")]
    pub internal_bot_domain: String,
}

fn default_internal_bot_domain() -> String {
    "chat.internal".to_string()
}

impl Default for Bots {
    fn default() -> Self {
        Self {
            internal_bot_domain: default_internal_bot_domain(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Audit {
    /// Record destructive operations in an append-only log.
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_audit_log_path")]
    pub log_path: PathBuf,
}

fn default_audit_log_path() -> PathBuf {
    PathBuf::from("/var/log/realm-admin.log")
}

impl Default for Audit {
    fn default() -> Self {
        Self {
            enabled: true,
            log_path: default_audit_log_path(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: Database,
    #[serde(default)]
    pub queue: Queue,
    #[serde(default)]
    pub retention: Retention,
    #[serde(default)]
    pub export: Export,
    #[serde(default)]
    pub uploads: Uploads,
    #[serde(default)]
    pub bots: Bots,
    #[serde(default)]
    pub audit: Audit,
}

impl Config {
    pub fn load<P: AsRef<Path>>(p: P) -> Result<Self> {
        let s = fs::read_to_string(&p)
            .with_context(|| format!("read config: {}", p.as_ref().display()))?;
        let cfg: Self = if p.as_ref().extension().and_then(|e| e.to_str()) == Some("toml") {
            toml::from_str(&s).context("toml parse")?
        } else {
            serde_yaml::from_str(&s).context("yaml parse")?
        };
        Ok(cfg)
    }

    /// Load from `path` when given, otherwise fall back to built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn toml_sections_are_optional() {
        let mut f = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(f, "[queue]\nenabled = false\n\n[retention]\nbatch_size = 50").unwrap();

        let cfg = Config::load(f.path()).unwrap();
        assert!(!cfg.queue.enabled);
        assert_eq!(cfg.retention.batch_size, 50);
        assert_eq!(cfg.retention.archived_data_vacuuming_delay_days, 30);
        assert_eq!(cfg.export.chunk_size, 1000);
    }

    #[test]
    fn yaml_is_used_for_other_extensions() {
        let mut f = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(f, "database:\n  path: /tmp/x.db\naudit:\n  enabled: false").unwrap();

        let cfg = Config::load(f.path()).unwrap();
        assert_eq!(cfg.database.path, PathBuf::from("/tmp/x.db"));
        assert!(!cfg.audit.enabled);
        assert_eq!(cfg.audit.log_path, PathBuf::from("/var/log/realm-admin.log"));
        assert!(cfg.queue.enabled);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = Config::load("/nonexistent/realm-admin.toml").unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/realm-admin.toml"));
    }
}
