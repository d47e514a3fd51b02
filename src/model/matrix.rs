//! Projection of per-patient feature vectors into a dense matrix.
//!
//! Column order follows [`FEATURE_NAMES`]; a vector missing any named
//! feature is a hard structural mismatch, not a defaultable gap.

use crate::domain::{FeatureVector, FEATURE_NAMES};
use crate::{CaresightError, Result};

/// Dense feature matrix for one batch, rows in patient order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub feature_names: Vec<String>,
    pub patient_ids: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    /// Project a batch of feature vectors into matrix form.
    ///
    /// # Errors
    /// Returns `Data` for an empty batch and `Configuration` when any
    /// vector lacks one of the model's named features.
    pub fn from_vectors(vectors: &[FeatureVector]) -> Result<Self> {
        if vectors.is_empty() {
            return Err(CaresightError::Data(
                "cannot build a feature matrix from an empty batch".into(),
            ));
        }

        let feature_names: Vec<String> = FEATURE_NAMES.iter().map(|s| s.to_string()).collect();
        let mut patient_ids = Vec::with_capacity(vectors.len());
        let mut rows = Vec::with_capacity(vectors.len());

        for vector in vectors {
            let mut row = Vec::with_capacity(feature_names.len());
            for name in &feature_names {
                let value = vector.get(name).ok_or_else(|| {
                    CaresightError::Configuration(format!(
                        "patient {} is missing feature {name}",
                        vector.patient_id
                    ))
                })?;
                row.push(value);
            }
            patient_ids.push(vector.patient_id.clone());
            rows.push(row);
        }

        Ok(Self {
            feature_names,
            patient_ids,
            rows,
        })
    }

    /// Number of patients (rows).
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of features (columns).
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Extract one named column, if present.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let index = self.feature_names.iter().position(|n| n == name)?;
        Some(self.rows.iter().map(|row| row[index]).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FeatureBuilder, RawPatientRecord, AGE, TASK_COUNT};
    use chrono::NaiveDate;

    fn batch(n: usize) -> Vec<FeatureVector> {
        let as_of = NaiveDate::from_ymd_opt(2026, 6, 1).expect("valid date");
        let mut builder = FeatureBuilder::new(as_of);
        let records: Vec<RawPatientRecord> = (0..n)
            .map(|i| {
                let mut record = RawPatientRecord::new(format!("p-{i}"));
                record.age = Some(30 + i as u32);
                record
            })
            .collect();
        builder.build_batch(&records)
    }

    #[test]
    fn test_projection_shape_and_order() {
        let matrix = FeatureMatrix::from_vectors(&batch(3)).expect("Should project");
        assert_eq!(matrix.n_rows(), 3);
        assert_eq!(matrix.n_features(), FEATURE_NAMES.len());
        assert_eq!(matrix.patient_ids, vec!["p-0", "p-1", "p-2"]);
        assert_eq!(matrix.column(AGE), Some(vec![30.0, 31.0, 32.0]));
    }

    #[test]
    fn test_empty_batch_is_a_data_error() {
        let err = FeatureMatrix::from_vectors(&[]).expect_err("must fail");
        assert!(matches!(err, CaresightError::Data(_)));
    }

    #[test]
    fn test_unknown_column_is_none() {
        let matrix = FeatureMatrix::from_vectors(&batch(1)).expect("Should project");
        assert!(matrix.column("no_such_feature").is_none());
        assert!(matrix.column(TASK_COUNT).is_some());
    }
}
