// JSON file store for the retained dataset.
// Writes go to a temp file in the same directory, fsync, then rename over the target,
// so a killed process never leaves a truncated dataset behind.

pub mod retention;

use chrono::NaiveDate;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::instrument;

use crate::models::{DailySnapshot, Dataset};

pub use retention::{DEFAULT_RETENTION_DAYS, cutoff_date, merge, retain};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("dataset file not found: {}", path.display())]
    Missing { path: PathBuf },
    #[error("dataset file {} is not valid: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("encode dataset: {0}")]
    Encode(#[source] serde_json::Error),
}

pub struct SnapshotStore {
    path: PathBuf,
    retention_days: u32,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>, retention_days: u32) -> Self {
        Self {
            path: path.into(),
            retention_days,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn retention_days(&self) -> u32 {
        self.retention_days
    }

    /// Read the dataset. A missing file is an empty dataset; an unparsable one is an error.
    #[instrument(skip(self), fields(store = "snapshot", operation = "load", path = %self.path.display()))]
    pub fn load(&self) -> Result<Dataset, StoreError> {
        match self.load_existing() {
            Err(StoreError::Missing { .. }) => {
                tracing::info!("no dataset on disk yet; starting empty");
                Ok(Dataset::new())
            }
            other => other,
        }
    }

    /// Read the dataset, treating a missing file as an error.
    pub fn load_existing(&self) -> Result<Dataset, StoreError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::Missing {
                    path: self.path.clone(),
                });
            }
            Err(e) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source: e,
                });
            }
        };
        let dataset: Dataset =
            serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt {
                path: self.path.clone(),
                source: e,
            })?;
        tracing::debug!(days = dataset.len(), "dataset loaded");
        Ok(dataset)
    }

    /// Persist atomically: temp file in the target directory, fsync, rename.
    #[instrument(skip(self, dataset), fields(store = "snapshot", operation = "save", days = dataset.len()))]
    pub fn save(&self, dataset: &Dataset) -> Result<(), StoreError> {
        let bytes = encode(dataset).map_err(StoreError::Encode)?;
        write_atomic(&self.path, &bytes)?;
        tracing::info!(path = %self.path.display(), days = dataset.len(), "dataset saved");
        Ok(())
    }

    /// Fails when the dataset directory does not accept new files.
    pub fn check_writable(&self) -> Result<(), StoreError> {
        let dir = parent_dir(&self.path);
        std::fs::create_dir_all(&dir).map_err(|e| StoreError::Io {
            path: dir.clone(),
            source: e,
        })?;
        NamedTempFile::new_in(&dir)
            .map(drop)
            .map_err(|e| StoreError::Io { path: dir, source: e })
    }

    /// Drop days outside this store's window, counted back from `today`.
    pub fn compact(&self, dataset: &Dataset, today: NaiveDate) -> Dataset {
        let kept = retain(dataset, self.retention_days, today);
        let dropped = dataset.len() - kept.len();
        if dropped > 0 {
            tracing::info!(
                dropped,
                cutoff = %cutoff_date(today, self.retention_days),
                "dropped days outside retention window"
            );
        }
        kept
    }

    /// Retain, then merge `snapshot` for `date`.
    pub fn apply_day(
        &self,
        dataset: &Dataset,
        date: NaiveDate,
        snapshot: DailySnapshot,
        today: NaiveDate,
    ) -> Dataset {
        if dataset.contains(date) {
            tracing::info!(%date, "replacing existing snapshot for date");
        }
        merge(&self.compact(dataset, today), date, snapshot)
    }
}

/// Serialize with 4-space indentation (same layout as earlier dataset files).
pub fn encode(dataset: &Dataset) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = Vec::new();
    {
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
        dataset.serialize(&mut ser)?;
    }
    out.push(b'\n');
    Ok(out)
}

/// Write `bytes` to `path` through a synced temp file and rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    commit(stage(path, bytes)?, path)
}

/// Synced temp file holding `bytes`, next to `path`. Dropping it without
/// [`commit`] removes it.
pub fn stage(path: &Path, bytes: &[u8]) -> Result<NamedTempFile, StoreError> {
    let dir = parent_dir(path);
    let io_err = |source: std::io::Error| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    std::fs::create_dir_all(&dir).map_err(io_err)?;
    let mut tmp = NamedTempFile::new_in(&dir).map_err(io_err)?;
    tmp.write_all(bytes).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    Ok(tmp)
}

/// Rename a staged file over `path`.
pub fn commit(staged: NamedTempFile, path: &Path) -> Result<(), StoreError> {
    staged.persist(path).map_err(|e| StoreError::Io {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
