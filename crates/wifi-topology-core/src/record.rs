//! Append-only NDJSON snapshot recorder.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::RecordError;
use crate::snapshot::Snapshot;

/// Appends one JSON line per snapshot, flushing after every write.
#[derive(Debug)]
pub struct SnapshotRecorder {
    path: PathBuf,
    file: File,
    written: u64,
}

impl SnapshotRecorder {
    /// Open `path` for appending, creating it if missing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RecordError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| RecordError::Io {
                path: path.clone(),
                source,
            })?;
        info!(path = %path.display(), "recording started");
        Ok(Self {
            path,
            file,
            written: 0,
        })
    }

    pub fn append(&mut self, snapshot: &Snapshot) -> Result<(), RecordError> {
        let mut line = serde_json::to_string(snapshot)?;
        line.push('\n');
        self.file
            .write_all(line.as_bytes())
            .and_then(|()| self.file.flush())
            .map_err(|source| RecordError::Io {
                path: self.path.clone(),
                source,
            })?;
        self.written += 1;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshots written by this recorder instance.
    pub fn written(&self) -> u64 {
        self.written
    }
}
