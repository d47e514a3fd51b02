//! Record source adapters.
//!
//! `JsonRecordSource` reads a JSON array of raw patient records from a
//! file path, standing in for a remote clinical-data system.
//! `FixedRecordSource` serves a canned batch from memory and exists for
//! tests and local experiments.

use std::path::{Path, PathBuf};

use crate::domain::RawPatientRecord;
use crate::ports::RecordSource;

/// Error type for record retrieval.
#[derive(Debug, thiserror::Error)]
pub enum RecordSourceError {
    #[error("record source unreachable: {0}")]
    Unreachable(String),

    #[error("record payload malformed: {0}")]
    Malformed(String),
}

/// Record source backed by a JSON file.
pub struct JsonRecordSource {
    path: PathBuf,
}

impl JsonRecordSource {
    /// Create a source reading from the given file path.
    #[must_use]
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl RecordSource for JsonRecordSource {
    type Error = RecordSourceError;

    fn fetch(&self, limit: usize) -> Result<Vec<RawPatientRecord>, Self::Error> {
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| RecordSourceError::Unreachable(format!("{:?}: {e}", self.path)))?;
        let mut records: Vec<RawPatientRecord> = serde_json::from_str(&content)
            .map_err(|e| RecordSourceError::Malformed(e.to_string()))?;
        records.truncate(limit);
        tracing::info!(count = records.len(), "fetched patient records");
        Ok(records)
    }
}

/// In-memory record source serving a fixed batch.
#[derive(Debug, Clone, Default)]
pub struct FixedRecordSource {
    records: Vec<RawPatientRecord>,
}

impl FixedRecordSource {
    /// Create a source over a canned batch.
    #[must_use]
    pub fn new(records: Vec<RawPatientRecord>) -> Self {
        Self { records }
    }
}

impl RecordSource for FixedRecordSource {
    type Error = RecordSourceError;

    fn fetch(&self, limit: usize) -> Result<Vec<RawPatientRecord>, Self::Error> {
        Ok(self.records.iter().take(limit).cloned().collect())
    }
}
