//! SQLite adapter: artifact store and score sink in one local database.
//!
//! Model artifacts are stored as a single JSON payload per key, so the
//! scaler and classifier can only be loaded or replaced together.
//!
//! # Mutex Behavior
//!
//! The connection is protected by `Mutex`. A poisoned mutex (from panic
//! in another thread) will cause panic; fail-fast is the intended
//! behavior for a data-bearing healthcare component.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};

use crate::domain::RiskAssessment;
use crate::model::ModelArtifacts;
use crate::ports::{ArtifactStore, ScoreSink};

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("not found: {0}")]
    NotFound(String),
}

/// SQLite storage adapter.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Open (or create) a database at the given path.
    ///
    /// # Errors
    /// Returns error if the database cannot be opened or initialized.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.init_schema()?;
        Ok(storage)
    }

    /// Create an in-memory database (for testing).
    ///
    /// # Errors
    /// Returns error if the database cannot be created.
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.init_schema()?;
        Ok(storage)
    }

    fn init_schema(&self) -> Result<(), StorageError> {
        let conn = self.conn.lock().expect("Lock failed");

        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS artifacts (
                key TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                saved_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS risk_scores (
                patient_id TEXT NOT NULL,
                score REAL NOT NULL,
                category TEXT NOT NULL,
                assessed_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_risk_scores_patient
                ON risk_scores(patient_id);

            CREATE TABLE IF NOT EXISTS care_gaps (
                patient_id TEXT NOT NULL,
                score REAL NOT NULL,
                created_at TEXT NOT NULL
            );
            ",
        )?;

        Ok(())
    }

    /// Total number of persisted score rows.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn count_scores(&self) -> Result<usize, StorageError> {
        let conn = self.conn.lock().expect("Lock failed");
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM risk_scores", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Total number of persisted care-gap rows.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn count_care_gaps(&self) -> Result<usize, StorageError> {
        let conn = self.conn.lock().expect("Lock failed");
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM care_gaps", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Most recently written score for a patient, if any.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn latest_score(&self, patient_id: &str) -> Result<Option<(f64, String)>, StorageError> {
        let conn = self.conn.lock().expect("Lock failed");
        let row = conn
            .query_row(
                "SELECT score, category FROM risk_scores
                 WHERE patient_id = ?1 ORDER BY assessed_at DESC LIMIT 1",
                params![patient_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        Ok(row)
    }
}

impl ArtifactStore for SqliteStorage {
    type Error = StorageError;

    fn load(&self, key: &str) -> Result<Option<ModelArtifacts>, Self::Error> {
        let conn = self.conn.lock().expect("Lock failed");
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM artifacts WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        match payload {
            None => Ok(None),
            Some(json) => {
                let artifacts = serde_json::from_str(&json)
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
                Ok(Some(artifacts))
            }
        }
    }

    fn save(&self, key: &str, artifacts: &ModelArtifacts) -> Result<(), Self::Error> {
        let payload = serde_json::to_string(artifacts)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let conn = self.conn.lock().expect("Lock failed");
        conn.execute(
            "INSERT OR REPLACE INTO artifacts (key, payload, saved_at)
             VALUES (?1, ?2, ?3)",
            params![key, payload, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

impl ScoreSink for SqliteStorage {
    type Error = StorageError;

    fn write_score(&self, assessment: &RiskAssessment) -> Result<(), Self::Error> {
        let conn = self.conn.lock().expect("Lock failed");
        conn.execute(
            "INSERT INTO risk_scores (patient_id, score, category, assessed_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                assessment.patient_id,
                assessment.score,
                assessment.category.as_str(),
                assessment.assessed_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn create_care_gap(&self, assessment: &RiskAssessment) -> Result<(), Self::Error> {
        let conn = self.conn.lock().expect("Lock failed");
        conn.execute(
            "INSERT INTO care_gaps (patient_id, score, created_at)
             VALUES (?1, ?2, ?3)",
            params![
                assessment.patient_id,
                assessment.score,
                assessment.assessed_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}
