//! Scoring handle: holds the current artifacts and turns a raw feature
//! matrix into per-patient risk assessments.
//!
//! The handle starts empty; scoring before artifacts are installed is
//! an error with no partial output. Installing new artifacts replaces
//! the value wholesale, never edits it in place.

use crate::domain::RiskAssessment;
use crate::model::artifacts::ModelArtifacts;
use crate::model::forest;
use crate::model::matrix::FeatureMatrix;
use crate::{CaresightError, Result};

/// Immutable-state scorer over one set of model artifacts.
#[derive(Debug, Default)]
pub struct RiskScorer {
    artifacts: Option<ModelArtifacts>,
}

impl RiskScorer {
    /// Create an uninitialized scorer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scorer over already-fitted artifacts.
    #[must_use]
    pub fn with_artifacts(artifacts: ModelArtifacts) -> Self {
        Self {
            artifacts: Some(artifacts),
        }
    }

    /// Install (or replace) the artifacts this scorer uses.
    pub fn install(&mut self, artifacts: ModelArtifacts) {
        self.artifacts = Some(artifacts);
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.artifacts.is_some()
    }

    /// Borrow the installed artifacts, if any.
    #[must_use]
    pub fn artifacts(&self) -> Option<&ModelArtifacts> {
        self.artifacts.as_ref()
    }

    /// Scale the batch, predict probabilities and tier them.
    ///
    /// # Errors
    /// `ModelNotInitialized` when no artifacts are installed;
    /// `Configuration` when the batch feature set does not reproduce the
    /// fit-time feature list.
    pub fn score(&self, matrix: &FeatureMatrix) -> Result<Vec<RiskAssessment>> {
        let artifacts = self
            .artifacts
            .as_ref()
            .ok_or(CaresightError::ModelNotInitialized)?;

        let scaled = artifacts.scaler.transform(matrix)?;
        let probabilities = forest::predict(&artifacts.model, &scaled)?;

        Ok(matrix
            .patient_ids
            .iter()
            .zip(probabilities)
            .map(|(patient_id, score)| RiskAssessment::new(patient_id, score))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FeatureBuilder, RawPatientRecord};
    use crate::model::artifacts::TrainingMode;
    use crate::model::forest::TrainConfig;
    use crate::model::scaler::ScalerState;
    use chrono::NaiveDate;

    fn patient_matrix() -> FeatureMatrix {
        let as_of = NaiveDate::from_ymd_opt(2026, 6, 1).expect("valid date");
        let mut builder = FeatureBuilder::new(as_of);
        let records: Vec<RawPatientRecord> = (0..8)
            .map(|i| {
                let mut record = RawPatientRecord::new(format!("p-{i}"));
                record.age = Some(30 + 5 * i as u32);
                record
            })
            .collect();
        let vectors = builder.build_batch(&records);
        FeatureMatrix::from_vectors(&vectors).expect("Should project")
    }

    fn fitted_artifacts(matrix: &FeatureMatrix) -> ModelArtifacts {
        let scaler = ScalerState::fit(matrix).expect("Should fit scaler");
        let scaled = scaler.transform(matrix).expect("Should transform");
        let (model, _) =
            forest::fit_proxy(matrix, &scaled, &TrainConfig::default()).expect("Should fit");
        ModelArtifacts::new(scaler, model, TrainingMode::Proxy)
    }

    #[test]
    fn test_score_before_initialization_fails_without_output() {
        let scorer = RiskScorer::new();
        assert!(!scorer.is_ready());
        let err = scorer.score(&patient_matrix()).expect_err("must fail");
        assert!(matches!(err, CaresightError::ModelNotInitialized));
    }

    #[test]
    fn test_score_yields_one_assessment_per_patient() {
        let matrix = patient_matrix();
        let scorer = RiskScorer::with_artifacts(fitted_artifacts(&matrix));

        let assessments = scorer.score(&matrix).expect("Should score");
        assert_eq!(assessments.len(), matrix.n_rows());
        for (assessment, patient_id) in assessments.iter().zip(&matrix.patient_ids) {
            assert_eq!(&assessment.patient_id, patient_id);
            assert!((0.0..=1.0).contains(&assessment.score));
        }
    }

    #[test]
    fn test_install_makes_scorer_ready() {
        let matrix = patient_matrix();
        let mut scorer = RiskScorer::new();
        scorer.install(fitted_artifacts(&matrix));
        assert!(scorer.is_ready());
        assert!(scorer.artifacts().is_some());
    }
}
