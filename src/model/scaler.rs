//! Standard scaler: per-feature centering and variance normalization.
//!
//! Fitted once on a reference batch and applied identically to later
//! batches; the state is an immutable value shared read-only until the
//! next refit.

use serde::{Deserialize, Serialize};

use crate::model::matrix::FeatureMatrix;
use crate::{CaresightError, Result};

/// Per-feature (mean, std) pairs plus the feature order they were fit on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerState {
    feature_names: Vec<String>,
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl ScalerState {
    /// Fit per-feature mean and standard deviation over a reference batch.
    ///
    /// # Errors
    /// Returns `Data` if the matrix has no rows.
    pub fn fit(matrix: &FeatureMatrix) -> Result<Self> {
        let n = matrix.n_rows();
        if n == 0 {
            return Err(CaresightError::Data(
                "cannot fit a scaler on an empty matrix".into(),
            ));
        }

        let n_features = matrix.n_features();
        let mut means = vec![0.0; n_features];
        for row in &matrix.rows {
            for (mean, value) in means.iter_mut().zip(row) {
                *mean += value;
            }
        }
        for mean in &mut means {
            *mean /= n as f64;
        }

        let mut stds = vec![0.0; n_features];
        for row in &matrix.rows {
            for ((std, value), mean) in stds.iter_mut().zip(row).zip(&means) {
                let centered = value - mean;
                *std += centered * centered;
            }
        }
        for std in &mut stds {
            *std = (*std / n as f64).sqrt();
        }

        Ok(Self {
            feature_names: matrix.feature_names.clone(),
            means,
            stds,
        })
    }

    /// Apply `(x - mean) / std` elementwise. A zero-variance feature
    /// scales to 0 (std of 0 is treated as 1).
    ///
    /// # Errors
    /// Returns `Configuration` when the matrix feature list differs from
    /// the one the scaler was fit on.
    pub fn transform(&self, matrix: &FeatureMatrix) -> Result<FeatureMatrix> {
        if self.feature_names != matrix.feature_names {
            return Err(CaresightError::Configuration(format!(
                "scaler was fit on {} features but the batch carries {}",
                self.feature_names.len(),
                matrix.feature_names.len()
            )));
        }

        let rows = matrix
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .zip(&self.means)
                    .zip(&self.stds)
                    .map(|((value, mean), std)| {
                        let divisor = if *std == 0.0 { 1.0 } else { *std };
                        (value - mean) / divisor
                    })
                    .collect()
            })
            .collect();

        Ok(FeatureMatrix {
            feature_names: matrix.feature_names.clone(),
            patient_ids: matrix.patient_ids.clone(),
            rows,
        })
    }

    /// Feature order the scaler was fit on.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }
}
