// ============================================================================
// src/util/upload.rs – Local-disk attachment storage
// ============================================================================

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Attachment files stored under a root directory, addressed by `path_id`
/// (a relative path such as `2/ab/cdef/report.pdf`).
#[derive(Clone, Debug)]
pub struct LocalUploads {
    root: PathBuf,
}

impl LocalUploads {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path_id: &str) -> Result<PathBuf> {
        let rel = Path::new(path_id);
        if rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            bail!("invalid attachment path id: {path_id}");
        }
        Ok(self.root.join(rel))
    }

    /// Delete the stored files; files already gone are not an error.
    pub fn delete_many<S: AsRef<str>>(&self, path_ids: &[S]) -> Result<usize> {
        let mut deleted = 0;
        for path_id in path_ids {
            let path = self.resolve(path_id.as_ref())?;
            match fs::remove_file(&path) {
                Ok(()) => deleted += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!(path = %path.display(), "attachment file already absent");
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("delete {}", path.display()));
                }
            }
        }
        Ok(deleted)
    }

    /// Every stored file as `(path_id, modified_at)`, sorted by path id.
    pub fn all_files(&self) -> Result<Vec<(String, DateTime<Utc>)>> {
        let mut out = Vec::new();
        if self.root.is_dir() {
            walk(&self.root, &self.root, &mut out)?;
        }
        out.sort();
        Ok(out)
    }
}

fn walk(root: &Path, dir: &Path, out: &mut Vec<(String, DateTime<Utc>)>) -> Result<()> {
    for entry in fs::read_dir(dir).with_context(|| format!("read dir {}", dir.display()))? {
        let entry = entry?;
        let path = entry.path();
        let meta = entry.metadata()?;
        if meta.is_dir() {
            walk(root, &path, out)?;
        } else if meta.is_file() {
            let rel = path
                .strip_prefix(root)
                .context("walked outside upload root")?
                .to_string_lossy()
                .into_owned();
            let modified: DateTime<Utc> = meta.modified()?.into();
            out.push((rel, modified));
        }
    }
    Ok(())
}
