// ============================================================================
// src/cmd/export_single_user.rs – Export one user's message history as a tarball
// ============================================================================

//! Exports only the user's message history and the realm-public metadata
//! needed to understand it; bots owned by the user are left alone.

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::cmd::base::{Cmd, TAR_BINARIES};
use crate::cmd::realm_args::{get_user, RealmArgs};
use crate::config::Export;
use crate::error::AdminError;
use crate::store::Store;
use crate::ui::UX;

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub email: String,
    pub output_dir: Option<PathBuf>,
    pub realm: RealmArgs,
}

pub fn run(ux: &UX, store: &Store, cfg: &Export, opts: &ExportOptions) -> Result<PathBuf> {
    let realm = opts.realm.resolve(store)?;
    let user = get_user(store, &opts.email, realm.as_ref())?;
    let output_dir = prepare_output_dir(opts.output_dir.as_deref())?;
    let tar = tar_runner(cfg)?;

    ux.line(&format!("Exporting user {}", user.delivery_email));
    store.export_user(&user, &output_dir, cfg.chunk_size)?;
    ux.line(&format!(
        "Finished exporting to {}; tarring",
        output_dir.display()
    ));

    let tarball = tarball_path(&output_dir);
    let (parent, base) = split_dir(&output_dir)?;
    let tarball_str = utf8(&tarball)?;
    tar.check(&[
        &format!("-czf{tarball_str}"),
        &format!("-C{}", utf8(parent)?),
        utf8(base)?,
    ])
    .context("create export tarball")?;

    info!(user = %user.delivery_email, tarball = %tarball.display(), "export complete");
    ux.success(&format!("Tarball written to {tarball_str}"));
    Ok(tarball)
}

pub(crate) fn tar_runner(cfg: &Export) -> Result<Cmd> {
    let timeout = Duration::from_secs(cfg.tar_timeout_secs);
    match &cfg.tar_path {
        Some(path) => Cmd::new_allowlisted(path.clone(), timeout),
        None => Cmd::discover(TAR_BINARIES, timeout),
    }
}

/// Pick the directory to export into. Without an explicit directory a fresh
/// temporary one is created and kept; an explicit directory must be absent or
/// empty and is never modified otherwise.
pub fn prepare_output_dir(requested: Option<&Path>) -> Result<PathBuf> {
    let Some(requested) = requested else {
        let dir = tempfile::Builder::new()
            .prefix("zulip-export-")
            .tempdir()
            .context("create temporary export directory")?;
        return Ok(dir.keep());
    };

    let dir = std::path::absolute(requested)
        .with_context(|| format!("resolve {}", requested.display()))?;
    if dir.exists() {
        let mut entries = fs::read_dir(&dir).with_context(|| format!("read {}", dir.display()))?;
        if entries.next().is_some() {
            return Err(AdminError::NonEmptyOutputDir(dir).into());
        }
    } else {
        fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    }
    Ok(dir)
}

/// `<dir>.tar.gz`, ignoring any trailing separator on `dir`.
pub fn tarball_path(dir: &Path) -> PathBuf {
    let trimmed: PathBuf = dir.components().collect();
    let mut name = OsString::from(trimmed.as_os_str());
    name.push(".tar.gz");
    PathBuf::from(name)
}

fn split_dir(dir: &Path) -> Result<(&Path, &Path)> {
    let parent = dir.parent().context("export directory has no parent")?;
    let base = dir.file_name().context("export directory has no name")?;
    Ok((parent, Path::new(base)))
}

fn utf8(p: &Path) -> Result<&str> {
    p.to_str()
        .with_context(|| format!("path is not valid UTF-8: {}", p.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fixtures::{self, days_ago};
    use crate::store::Role;

    #[test]
    fn nonempty_output_dir_is_refused_untouched() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("keep.txt"), b"precious").unwrap();

        let err = prepare_output_dir(Some(dir.path())).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AdminError>(),
            Some(AdminError::NonEmptyOutputDir(_))
        ));
        let names: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(names.len(), 1);
        assert_eq!(fs::read(dir.path().join("keep.txt")).unwrap(), b"precious");
    }

    #[test]
    fn missing_and_empty_dirs_are_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let fresh = dir.path().join("a/b/out");
        assert_eq!(prepare_output_dir(Some(&fresh)).unwrap(), fresh);
        assert!(fresh.is_dir());
        assert_eq!(prepare_output_dir(Some(&fresh)).unwrap(), fresh);
    }

    #[test]
    fn temp_dir_is_kept_with_prefix() {
        let dir = prepare_output_dir(None).unwrap();
        assert!(dir.is_dir());
        let name = dir.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("zulip-export-"));
        fs::remove_dir(&dir).unwrap();
    }

    #[test]
    fn tarball_sits_next_to_directory() {
        assert_eq!(
            tarball_path(Path::new("/tmp/export/")),
            PathBuf::from("/tmp/export.tar.gz")
        );
    }

    #[test]
    fn full_export_produces_tarball() {
        if Cmd::discover(TAR_BINARIES, Duration::from_secs(1)).is_err() {
            return;
        }
        let store = Store::open_in_memory().unwrap();
        let r = fixtures::realm(&store, "zulip", None);
        let u = fixtures::user(&store, r, "hamlet@x.com", "Hamlet", Role::Member);
        fixtures::message(&store, r, u, None, "hello", days_ago(1), &[u]);

        let root = tempfile::tempdir().unwrap();
        let opts = ExportOptions {
            email: "hamlet@x.com".into(),
            output_dir: Some(root.path().join("hamlet")),
            realm: RealmArgs::default(),
        };
        let (ux, out) = UX::capture();
        let tarball = run(&ux, &store, &Export::default(), &opts).unwrap();

        assert_eq!(tarball, root.path().join("hamlet.tar.gz"));
        assert!(tarball.is_file());
        let text = out.text();
        assert!(text.starts_with("Exporting user hamlet@x.com\n"));
        assert!(text.ends_with(&format!("Tarball written to {}\n", tarball.display())));
    }
}
