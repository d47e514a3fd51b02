//! Pipeline service: Orchestrates one batch run end to end.
//!
//! Stage order: Fetch -> Preprocess -> ModelReady -> Predict ->
//! Recommend -> Writeback. A stage with no usable data halts the run
//! and reports failure; downstream stages are never applied to a
//! partial input. Model and scaler state are immutable values for the
//! whole batch; refitting builds new artifacts rather than editing the
//! installed ones.

use std::sync::Arc;

use chrono::Utc;

use crate::adapters::StorageError;
use crate::domain::{recommend_for, FeatureBuilder, Recommendation, RiskCategory};
use crate::model::{
    fit_proxy, FeatureMatrix, ModelArtifacts, RiskScorer, ScalerState, TrainConfig, TrainingMode,
};
use crate::model::{fit_supervised, TrainReport};
use crate::ports::{ArtifactStore, RecordSource, ScoreSink};
use crate::{CaresightError, Result};

/// Pipeline tuning knobs.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum records fetched per run
    pub fetch_limit: usize,
    /// Key the bundled artifacts are stored under
    pub artifact_key: String,
    /// Score writebacks are issued in chunks of this size
    pub writeback_chunk: usize,
    /// Forest training parameters
    pub train: TrainConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fetch_limit: 100,
            artifact_key: "risk-model/current".to_string(),
            writeback_chunk: 25,
            train: TrainConfig::default(),
        }
    }
}

/// Outcome of one batch run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub processed: usize,
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub writeback_ok: usize,
    pub writeback_failed: usize,
    pub care_gaps_created: usize,
    pub care_gap_failures: usize,
    /// Whether this run fitted fresh artifacts instead of loading them
    pub refit: bool,
    pub recommendations: Vec<Recommendation>,
}

/// Service driving the risk-scoring pipeline over its three ports.
pub struct PipelineService<R, A, S>
where
    R: RecordSource,
    A: ArtifactStore,
    S: ScoreSink,
{
    records: Arc<R>,
    artifacts: Arc<A>,
    sink: Arc<S>,
    config: PipelineConfig,
}

impl<R, A, S> PipelineService<R, A, S>
where
    R: RecordSource,
    A: ArtifactStore,
    S: ScoreSink,
    A::Error: Into<StorageError>,
{
    /// Create a new pipeline service.
    pub fn new(records: Arc<R>, artifacts: Arc<A>, sink: Arc<S>, config: PipelineConfig) -> Self {
        Self {
            records,
            artifacts,
            sink,
            config,
        }
    }

    /// Run one synchronous batch.
    ///
    /// # Errors
    /// `Connectivity` when the record source is unreachable, `Data` when
    /// a stage has nothing usable to work on, `WritebackFailed` when
    /// every score write was rejected. Per-patient write failures are
    /// counted in the summary, not raised.
    pub fn run(&self) -> Result<RunSummary> {
        tracing::info!("starting batch run");

        // Fetch
        let records = self
            .records
            .fetch(self.config.fetch_limit)
            .map_err(|e| CaresightError::Connectivity(e.to_string()))?;
        if records.is_empty() {
            return Err(CaresightError::Data(
                "record source returned an empty batch".into(),
            ));
        }
        tracing::info!(count = records.len(), "fetched batch");

        // Preprocess
        let mut builder = FeatureBuilder::new(Utc::now().date_naive());
        let vectors = builder.build_batch(&records);
        let matrix = FeatureMatrix::from_vectors(&vectors)?;

        // ModelReady: load persisted artifacts or fit new ones.
        let (artifacts, refit) = self.ensure_artifacts(&matrix)?;
        let scorer = RiskScorer::with_artifacts(artifacts);

        // Predict
        let assessments = scorer.score(&matrix)?;

        // Recommend
        let recommendations: Vec<Recommendation> = vectors
            .iter()
            .zip(&assessments)
            .map(|(features, assessment)| recommend_for(features, assessment))
            .collect();

        // Writeback, in fixed-size chunks; failures are per-patient.
        let mut summary = RunSummary {
            processed: assessments.len(),
            low: 0,
            medium: 0,
            high: 0,
            writeback_ok: 0,
            writeback_failed: 0,
            care_gaps_created: 0,
            care_gap_failures: 0,
            refit,
            recommendations,
        };

        for chunk in assessments.chunks(self.config.writeback_chunk.max(1)) {
            for assessment in chunk {
                match assessment.category {
                    RiskCategory::Low => summary.low += 1,
                    RiskCategory::Medium => summary.medium += 1,
                    RiskCategory::High => summary.high += 1,
                }

                match self.sink.write_score(assessment) {
                    Ok(()) => summary.writeback_ok += 1,
                    Err(e) => {
                        tracing::warn!(
                            patient_id = %assessment.patient_id,
                            error = %e,
                            "score writeback failed"
                        );
                        summary.writeback_failed += 1;
                    }
                }

                if assessment.category == RiskCategory::High {
                    match self.sink.create_care_gap(assessment) {
                        Ok(()) => summary.care_gaps_created += 1,
                        Err(e) => {
                            tracing::warn!(
                                patient_id = %assessment.patient_id,
                                error = %e,
                                "care-gap creation failed"
                            );
                            summary.care_gap_failures += 1;
                        }
                    }
                }
            }
        }

        if summary.writeback_ok == 0 {
            return Err(CaresightError::WritebackFailed {
                attempted: summary.processed,
            });
        }

        tracing::info!(
            processed = summary.processed,
            low = summary.low,
            medium = summary.medium,
            high = summary.high,
            writeback_ok = summary.writeback_ok,
            writeback_failed = summary.writeback_failed,
            care_gaps = summary.care_gaps_created,
            refit = summary.refit,
            "batch run complete"
        );

        Ok(summary)
    }

    /// Fit fresh artifacts against caller-supplied ground-truth labels
    /// (one per fetched record, in fetch order) and persist them.
    ///
    /// # Errors
    /// Same failure surface as `run`, plus `Configuration` when the
    /// label count does not match the batch.
    pub fn train_supervised(&self, labels: &[u8]) -> Result<TrainReport> {
        let records = self
            .records
            .fetch(self.config.fetch_limit)
            .map_err(|e| CaresightError::Connectivity(e.to_string()))?;
        if records.is_empty() {
            return Err(CaresightError::Data(
                "record source returned an empty batch".into(),
            ));
        }

        let mut builder = FeatureBuilder::new(Utc::now().date_naive());
        let vectors = builder.build_batch(&records);
        let matrix = FeatureMatrix::from_vectors(&vectors)?;

        let scaler = ScalerState::fit(&matrix)?;
        let scaled = scaler.transform(&matrix)?;
        let (model, report) = fit_supervised(&scaled, labels, &self.config.train)?;

        let artifacts = ModelArtifacts::new(scaler, model, TrainingMode::Supervised);
        self.artifacts
            .save(&self.config.artifact_key, &artifacts)
            .map_err(|e| CaresightError::Storage(e.into()))?;

        tracing::info!(key = %self.config.artifact_key, "persisted supervised artifacts");
        Ok(report)
    }

    fn ensure_artifacts(&self, matrix: &FeatureMatrix) -> Result<(ModelArtifacts, bool)> {
        match self
            .artifacts
            .load(&self.config.artifact_key)
            .map_err(|e| CaresightError::Storage(e.into()))?
        {
            Some(artifacts) => {
                tracing::info!(key = %self.config.artifact_key, "loaded persisted artifacts");
                Ok((artifacts, false))
            }
            None => {
                tracing::info!(
                    key = %self.config.artifact_key,
                    "no persisted artifacts, fitting on the current batch"
                );
                let scaler = ScalerState::fit(matrix)?;
                let scaled = scaler.transform(matrix)?;
                let (model, _) = fit_proxy(matrix, &scaled, &self.config.train)?;
                let artifacts = ModelArtifacts::new(scaler, model, TrainingMode::Proxy);
                self.artifacts
                    .save(&self.config.artifact_key, &artifacts)
                    .map_err(|e| CaresightError::Storage(e.into()))?;
                Ok((artifacts, true))
            }
        }
    }
}
