//! Ports layer: Trait definitions for external collaborators.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the pipeline and external systems: the clinical record
//! source, the model artifact store, and the score write-back sink.

use crate::domain::{RawPatientRecord, RiskAssessment};
use crate::model::ModelArtifacts;

/// Source of raw patient records for one batch run.
pub trait RecordSource: Send + Sync {
    /// Error type for record retrieval.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetch up to `limit` records, in source order.
    ///
    /// # Errors
    /// Returns error on connectivity or authorization failure; the
    /// orchestrator aborts the run in that case.
    fn fetch(&self, limit: usize) -> Result<Vec<RawPatientRecord>, Self::Error>;
}

/// Durable store for fitted model artifacts.
///
/// The scaler and classifier are stored as one bundled value under a
/// key, so a partial artifact set cannot exist.
pub trait ArtifactStore: Send + Sync {
    /// Error type for artifact operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the artifacts stored under `key`.
    ///
    /// # Returns
    /// `None` when nothing is stored under the key.
    ///
    /// # Errors
    /// Returns error if the store is unreachable or the payload is
    /// corrupt.
    fn load(&self, key: &str) -> Result<Option<ModelArtifacts>, Self::Error>;

    /// Persist artifacts under `key`, replacing any previous value.
    ///
    /// # Errors
    /// Returns error if the store rejects the write.
    fn save(&self, key: &str, artifacts: &ModelArtifacts) -> Result<(), Self::Error>;
}

/// Sink that receives computed scores and care-gap requests.
pub trait ScoreSink: Send + Sync {
    /// Error type for write-back operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Write one patient's assessment back to the clinical system.
    ///
    /// # Errors
    /// A failure affects only this patient; the orchestrator counts it
    /// and continues.
    fn write_score(&self, assessment: &RiskAssessment) -> Result<(), Self::Error>;

    /// Request a care-gap record for a high-risk patient.
    ///
    /// # Errors
    /// Failures are logged and counted, never fatal to the run.
    fn create_care_gap(&self, assessment: &RiskAssessment) -> Result<(), Self::Error>;
}
