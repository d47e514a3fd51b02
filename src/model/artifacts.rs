//! Bundled model artifacts.
//!
//! The scaler and classifier are versioned together as one value, so a
//! store can never hand back one without the other.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::forest::RiskModelState;
use crate::model::scaler::ScalerState;

/// How the bundled model was fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainingMode {
    /// Fit against supplied ground-truth labels
    Supervised,
    /// Fit against synthetic condition-burden labels; diagnostic only
    Proxy,
}

/// Scaler + classifier fitted from the same reference batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifacts {
    pub scaler: ScalerState,
    pub model: RiskModelState,
    pub mode: TrainingMode,
    pub trained_at: DateTime<Utc>,
}

impl ModelArtifacts {
    /// Bundle freshly fitted state.
    #[must_use]
    pub fn new(scaler: ScalerState, model: RiskModelState, mode: TrainingMode) -> Self {
        Self {
            scaler,
            model,
            mode,
            trained_at: Utc::now(),
        }
    }
}
