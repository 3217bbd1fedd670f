//! Local artifact cache
//!
//! One `.npy` file per (run, model type, version). Content for a name never
//! changes, so entries are reused without invalidation and written at most
//! once. The directory is a pure cache and may be deleted at any time.

use crate::error::{Error, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

pub mod npy;

const SEPARATOR: &str = "_";
const EXTENSION: &str = "npy";

static TEMP_SEQUENCE: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct ArtifactCache {
    dir: PathBuf,
}

impl ArtifactCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Deterministic entry path for (run, model type, version)
    pub fn name_for(&self, run_id: &str, model_type: &str, version: &str) -> Result<PathBuf> {
        let parts = [run_id, model_type, version];
        for part in parts {
            if part.is_empty() || part.contains(|c: char| matches!(c, '/' | '\\' | '\0')) {
                return Err(Error::InvalidCacheKey(format!(
                    "One or more of {:?} is not a plain identifier",
                    parts
                )));
            }
        }

        Ok(self
            .dir
            .join(format!("{}.{}", parts.join(SEPARATOR), EXTENSION)))
    }

    /// Load an entry; `Ok(None)` on miss, `Err` if the file is unreadable or undecodable
    pub async fn load(&self, path: &Path) -> Result<Option<Vec<f32>>> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::Cache {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })
            }
        };

        let values = npy::decode_f32(&bytes).map_err(|e| Error::Cache {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        debug!(path = %path.display(), len = values.len(), "Cache hit");
        Ok(Some(values))
    }

    /// Write an entry unless it already exists
    ///
    /// The blob is written to a temporary file in the cache directory and then
    /// hard-linked into place, so a reader never sees a partial entry and an
    /// existing entry is never replaced. Returns `Ok(false)` when the entry was
    /// already present.
    pub async fn store(&self, path: &Path, values: &[f32]) -> Result<bool> {
        if tokio::fs::try_exists(path).await.unwrap_or(false) {
            debug!(path = %path.display(), "Cache entry already present, not overwriting");
            return Ok(false);
        }

        self.ensure_dir().await;

        let temp_path = temp_path_for(path);
        let written = write_new(&temp_path, &npy::encode_f32(values)).await;
        let linked = match written {
            Ok(()) => tokio::fs::hard_link(&temp_path, path).await,
            Err(e) => Err(e),
        };
        let _ = tokio::fs::remove_file(&temp_path).await;

        match linked {
            Ok(()) => {
                info!(path = %path.display(), len = values.len(), "Cached array");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!(path = %path.display(), "Cache entry already present, not overwriting");
                Ok(false)
            }
            Err(e) => Err(cmt_common::Error::Io(e).into()),
        }
    }

    /// Best-effort directory creation; an existing or unwritable directory is not an error here
    async fn ensure_dir(&self) {
        if let Err(e) = tokio::fs::create_dir_all(&self.dir).await {
            match e.kind() {
                ErrorKind::AlreadyExists | ErrorKind::PermissionDenied => {
                    debug!(dir = %self.dir.display(), error = %e, "Cache directory not created")
                }
                _ => warn!(dir = %self.dir.display(), error = %e, "Cache directory not created"),
            }
        }
    }
}

/// Unique sibling of `path` used while an entry is being written
fn temp_path_for(path: &Path) -> PathBuf {
    let sequence = TEMP_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}.{}.tmp", name, std::process::id(), sequence))
}

async fn write_new(path: &Path, blob: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(blob).await?;
    file.sync_all().await
}
