// ============================================================================
// src/util/atomic.rs – Durable, permissioned atomic writes (export files)
// ============================================================================

use anyhow::{bail, Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

/// Return the parent directory path or error with context.
fn parent_dir(path: &Path) -> Result<PathBuf> {
    path.parent()
        .map(|p| p.to_path_buf())
        .context("Target path has no parent directory")
}

/// Fsync a directory to persist metadata (like rename).
fn fsync_dir(dir: &Path) -> Result<()> {
    let f = File::open(dir).with_context(|| format!("Open dir for fsync: {dir:?}"))?;
    f.sync_all()
        .with_context(|| format!("Fsync dir failed: {dir:?}"))?;
    Ok(())
}

/// Reject writes if target is a symlink.
fn reject_symlink_target(path: &Path) -> Result<()> {
    if let Ok(meta) = fs::symlink_metadata(path) {
        if meta.file_type().is_symlink() {
            bail!("Refusing to write to symlink: {}", path.display());
        }
    }
    Ok(())
}

/// Core atomic write: writes bytes to a temp file in the same directory,
/// fsyncs the file, renames into place, then fsyncs the parent directory.
/// Applies exact POSIX mode (ignores umask). An existing target is never replaced.
pub fn atomic_write_bytes(path: &Path, bytes: &[u8], mode: u32) -> Result<()> {
    reject_symlink_target(path)?;

    let dir = parent_dir(path)?;
    if !dir.is_dir() {
        bail!("Target directory does not exist: {}", dir.display());
    }

    if path.exists() {
        bail!("File already exists: {}", path.display());
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .context("Target path missing file name")?;

    // Open temp file with explicit mode; retry on the rare name collision.
    let mut attempt = 0;
    let (tmp, mut f) = loop {
        let tmp = dir.join(format!(".{}.tmp-{}", file_name, nanoid::nanoid!(8)));
        match OpenOptions::new()
            .create_new(true)
            .write(true)
            .mode(mode)
            .open(&tmp)
        {
            Ok(f) => break (tmp, f),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && attempt < 8 => {
                attempt += 1;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Open temp file failed: {tmp:?}"));
            }
        }
    };

    f.write_all(bytes).context("Write to temp file failed")?;
    f.sync_all().context("Fsync temp file failed")?;

    fs::rename(&tmp, path).with_context(|| {
        format!(
            "Atomic rename failed ({} -> {})",
            tmp.display(),
            path.display()
        )
    })?;

    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .with_context(|| format!("Set permissions failed for {}", path.display()))?;

    fsync_dir(&dir)?;

    Ok(())
}

/// Atomic write of pretty-printed JSON with 0600 permissions; never overwrites.
pub fn atomic_write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut s = serde_json::to_string_pretty(value).context("Serialize JSON failed")?;
    s.push('\n');
    atomic_write_bytes(path, s.as_bytes(), 0o600)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn writes_with_exact_mode_and_no_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("user.json");
        atomic_write_json(&target, &json!({"a": 1})).unwrap();

        let meta = fs::metadata(&target).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("user.json")]);
    }

    #[test]
    fn never_overwrites_an_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("f");
        atomic_write_bytes(&target, b"one", 0o600).unwrap();
        assert!(atomic_write_bytes(&target, b"two", 0o600).is_err());
        assert_eq!(fs::read(&target).unwrap(), b"one");
    }

    #[cfg(unix)]
    #[test]
    fn refuses_symlink_targets() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real");
        fs::write(&real, b"x").unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();
        assert!(atomic_write_bytes(&link, b"y", 0o600).is_err());
    }
}
