//! # Caresight
//!
//! Batch risk-scoring pipeline for care coordination.
//!
//! This crate provides:
//! - Feature derivation from raw per-patient clinical records
//! - A deterministic tree-ensemble risk model with tiered score calibration
//! - Rule-based care recommendations derived from features and risk tier
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core business types (patient records, features, assessments, recommendations)
//! - `model`: Scaler, classifier and bundled model artifacts
//! - `ports`: Trait definitions for external collaborators
//! - `adapters`: Concrete implementations (SQLite, JSON record files)
//! - `application`: The pipeline orchestrator tying the stages together

pub mod adapters;
pub mod application;
pub mod domain;
pub mod model;
pub mod ports;

pub use domain::{RawPatientRecord, Recommendation, RiskAssessment, RiskCategory};

/// Result type for Caresight operations
pub type Result<T> = std::result::Result<T, CaresightError>;

/// Main error type for Caresight
#[derive(Debug, thiserror::Error)]
pub enum CaresightError {
    #[error("record source unreachable: {0}")]
    Connectivity(String),

    #[error("no usable data: {0}")]
    Data(String),

    #[error("feature configuration mismatch: {0}")]
    Configuration(String),

    #[error("model not initialized: fit or load artifacts before predicting")]
    ModelNotInitialized,

    #[error("storage operation failed: {0}")]
    Storage(#[from] adapters::StorageError),

    #[error("all {attempted} score writebacks failed")]
    WritebackFailed { attempted: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
