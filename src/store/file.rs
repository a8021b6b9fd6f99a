//! JSON file persistence for the performance collection.
//!
//! The whole collection is one pretty-printed array of [`PerfRecord`]s,
//! rewritten after every change.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::models::PerfRecord;
use crate::services::collection::{ImportReport, PerfCollection};
use crate::services::performance::PerfError;

/// File name of the collection inside the data directory.
pub const PERFS_FILE_NAME: &str = "perfs.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed collection file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Import failed: {0}")]
    Import(#[from] PerfError),
}

/// Reads and writes the collection file.
#[derive(Debug, Clone)]
pub struct PerfStore {
    file_path: PathBuf,
}

impl PerfStore {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }

    /// Store for `perfs.json` inside `data_dir`.
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(PERFS_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Load the collection; a missing file yields an empty one.
    ///
    /// Individual invalid records are skipped and listed in the report; a
    /// file that is not a JSON array of records is an error.
    pub fn load(&self) -> Result<(PerfCollection, ImportReport), StoreError> {
        let mut collection = PerfCollection::new();
        if !self.file_path.exists() {
            tracing::info!(
                "No collection at {}, starting empty",
                self.file_path.display()
            );
            return Ok((collection, ImportReport::default()));
        }

        let content = fs::read_to_string(&self.file_path).map_err(|source| StoreError::Io {
            path: self.file_path.clone(),
            source,
        })?;
        let records: Vec<PerfRecord> = serde_json::from_str(&content)?;
        let report = collection.deserialize(records)?;

        tracing::info!(
            "Loaded collection from {} ({} races)",
            self.file_path.display(),
            report.loaded
        );
        Ok((collection, report))
    }

    /// Write the collection atomically (temp file, then rename).
    pub fn save(&self, collection: &PerfCollection) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.file_path.clone(),
            source,
        };

        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        let content = serde_json::to_string_pretty(&collection.serialize())?;
        let temp_path = self.file_path.with_extension("json.tmp");
        fs::write(&temp_path, content).map_err(io_err)?;
        fs::rename(&temp_path, &self.file_path).map_err(io_err)?;

        tracing::debug!(
            "Saved {} races to {}",
            collection.main_count(),
            self.file_path.display()
        );
        Ok(())
    }
}
