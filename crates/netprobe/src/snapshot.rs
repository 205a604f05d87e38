//! Snapshot persistence.
//!
//! Each cycle is written as `snapshot_<unix-seconds>.json` under the results
//! directory. The document is written to a temporary file in the same
//! directory and renamed into place, so readers only ever see complete
//! snapshots.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::cycle::CycleRecord;
use crate::error::SnapshotError;

#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    dir: PathBuf,
}

impl SnapshotWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path the snapshot for `record` is written to.
    pub fn path_for(&self, record: &CycleRecord) -> PathBuf {
        self.dir.join(record.file_name())
    }

    /// Persist `record`, creating the directory if needed.
    ///
    /// A snapshot from an earlier cycle in the same second is replaced.
    pub fn write(&self, record: &CycleRecord) -> Result<PathBuf, SnapshotError> {
        fs::create_dir_all(&self.dir)?;

        let path = self.path_for(record);
        if path.exists() {
            warn!(path = %path.display(), "snapshot name collision, overwriting previous snapshot");
        }

        let content = serde_json::to_vec_pretty(record)?;

        let mut temp = NamedTempFile::new_in(&self.dir)?;
        temp.write_all(&content)?;
        temp.as_file().sync_all()?;
        temp.persist(&path)?;

        debug!(path = %path.display(), bytes = content.len(), "snapshot written");
        Ok(path)
    }

    /// Load a snapshot written by [`Self::write`].
    pub fn read(path: impl AsRef<Path>) -> Result<CycleRecord, SnapshotError> {
        let raw = fs::read(path)?;
        Ok(serde_json::from_slice(&raw)?)
    }
}
