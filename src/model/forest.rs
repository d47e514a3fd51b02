//! Tree-ensemble risk classifier.
//!
//! A small random forest over gini-impurity splits: bootstrap row
//! sampling, sqrt feature subsampling, leaf probabilities averaged
//! across trees. All randomness flows from a single seeded ChaCha
//! stream, so a fit is reproducible end to end.
//!
//! Two training modes exist: supervised fit against real binary labels
//! with held-out diagnostics, and a proxy mode that synthesizes labels
//! from condition burden and age when no ground truth is available. The
//! proxy output is diagnostic only, not a validated risk estimate.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::domain::{AGE, CHRONIC_CONDITION_COUNT};
use crate::model::matrix::FeatureMatrix;
use crate::{CaresightError, Result};

/// Fraction of rows held out for diagnostics during a supervised fit.
const HOLDOUT_FRACTION: f64 = 0.25;

/// Minimum gini decrease for a split to be worth keeping.
const MIN_GAIN: f64 = 1e-12;

/// Forest training parameters. The seed is fixed by default so repeated
/// fits on the same batch produce the same model.
#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_leaf: usize,
    pub seed: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            n_trees: 25,
            max_depth: 6,
            min_leaf: 2,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        probability: f64,
    },
}

/// One fitted decision tree, stored as an index-linked node arena with
/// the root at index 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DecisionTree {
    nodes: Vec<TreeNode>,
}

impl DecisionTree {
    fn predict_row(&self, row: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Leaf { probability } => return *probability,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

/// Trained classifier parameters plus the ordered feature list it
/// expects. Immutable after fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskModelState {
    pub feature_names: Vec<String>,
    trees: Vec<DecisionTree>,
}

impl RiskModelState {
    fn predict_row(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.trees.iter().map(|tree| tree.predict_row(row)).sum();
        sum / self.trees.len() as f64
    }
}

/// Held-out diagnostics from a supervised fit. Reported, not consumed
/// downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// `confusion[actual][predicted]` over {0, 1}
    pub confusion: [[usize; 2]; 2],
}

/// Fit diagnostics: held-out metrics (absent when the batch is too small
/// to hold anything out) and impurity-decrease feature importances,
/// sorted descending.
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub metrics: Option<ModelMetrics>,
    pub importances: Vec<(String, f64)>,
}

/// Fit the forest against supplied binary labels.
///
/// Rows are shuffled with a seeded RNG and split 0.75/0.25 into train
/// and held-out partitions; metrics come from the held-out part.
///
/// # Errors
/// Returns `Data` for an empty matrix and `Configuration` when the
/// label count does not match the row count.
pub fn fit_supervised(
    matrix: &FeatureMatrix,
    labels: &[u8],
    config: &TrainConfig,
) -> Result<(RiskModelState, TrainReport)> {
    let n = matrix.n_rows();
    if n == 0 {
        return Err(CaresightError::Data(
            "cannot fit a model on an empty matrix".into(),
        ));
    }
    if labels.len() != n {
        return Err(CaresightError::Configuration(format!(
            "label count {} does not match row count {n}",
            labels.len()
        )));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut rng);
    let holdout_size = ((n as f64) * HOLDOUT_FRACTION).floor() as usize;
    let (holdout_idx, train_idx) = indices.split_at(holdout_size);

    let mut trees = Vec::with_capacity(config.n_trees);
    let mut importances = vec![0.0; matrix.n_features()];
    for _ in 0..config.n_trees {
        let sample: Vec<usize> = (0..train_idx.len())
            .map(|_| train_idx[rng.gen_range(0..train_idx.len())])
            .collect();
        let mut builder = TreeBuilder {
            matrix,
            labels,
            config,
            nodes: Vec::new(),
            importances: vec![0.0; matrix.n_features()],
        };
        builder.grow(&sample, 0, &mut rng);
        for (total, tree_share) in importances.iter_mut().zip(&builder.importances) {
            *total += tree_share;
        }
        trees.push(DecisionTree {
            nodes: builder.nodes,
        });
    }

    let state = RiskModelState {
        feature_names: matrix.feature_names.clone(),
        trees,
    };

    let metrics = if holdout_idx.is_empty() {
        None
    } else {
        let metrics = evaluate(&state, matrix, labels, holdout_idx);
        tracing::info!(
            precision = metrics.precision,
            recall = metrics.recall,
            f1 = metrics.f1,
            held_out = holdout_idx.len(),
            "fitted risk model"
        );
        Some(metrics)
    };

    let report = TrainReport {
        metrics,
        importances: ranked_importances(&matrix.feature_names, importances),
    };

    Ok((state, report))
}

/// Synthesize proxy labels from the raw (unscaled) batch: positive when
/// `chronic_condition_count + age / 10` exceeds the batch median of that
/// quantity.
///
/// # Errors
/// Returns `Configuration` when the matrix lacks the source columns.
pub fn proxy_labels(raw: &FeatureMatrix) -> Result<Vec<u8>> {
    let chronic = raw.column(CHRONIC_CONDITION_COUNT).ok_or_else(|| {
        CaresightError::Configuration(format!("matrix lacks {CHRONIC_CONDITION_COUNT}"))
    })?;
    let age = raw
        .column(AGE)
        .ok_or_else(|| CaresightError::Configuration(format!("matrix lacks {AGE}")))?;

    let burden: Vec<f64> = chronic
        .iter()
        .zip(&age)
        .map(|(c, a)| c + a / 10.0)
        .collect();
    if burden.is_empty() {
        return Err(CaresightError::Data(
            "cannot derive proxy labels from an empty batch".into(),
        ));
    }
    let cutoff = median(&burden);
    Ok(burden.iter().map(|&b| u8::from(b > cutoff)).collect())
}

/// Fit in proxy mode: labels derived from the raw batch, trees fit on
/// the scaled batch. Usable when no supervised label exists, but the
/// output is a diagnostic, not validated clinical risk.
pub fn fit_proxy(
    raw: &FeatureMatrix,
    scaled: &FeatureMatrix,
    config: &TrainConfig,
) -> Result<(RiskModelState, TrainReport)> {
    if raw.n_rows() != scaled.n_rows() {
        return Err(CaresightError::Configuration(format!(
            "raw batch has {} rows but scaled batch has {}",
            raw.n_rows(),
            scaled.n_rows()
        )));
    }
    tracing::warn!(
        "fitting with synthetic proxy labels; scores are diagnostic, not validated clinical risk"
    );
    let labels = proxy_labels(raw)?;
    fit_supervised(scaled, &labels, config)
}

/// Predict the positive-class probability for every row.
///
/// # Errors
/// Returns `Configuration` unless the matrix feature list reproduces
/// the fit-time list exactly; column order matters.
pub fn predict(state: &RiskModelState, matrix: &FeatureMatrix) -> Result<Vec<f64>> {
    if state.feature_names != matrix.feature_names {
        return Err(CaresightError::Configuration(format!(
            "model expects {} features in fit order but the batch differs",
            state.feature_names.len()
        )));
    }
    Ok(matrix
        .rows
        .iter()
        .map(|row| state.predict_row(row))
        .collect())
}

struct TreeBuilder<'a> {
    matrix: &'a FeatureMatrix,
    labels: &'a [u8],
    config: &'a TrainConfig,
    nodes: Vec<TreeNode>,
    importances: Vec<f64>,
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl TreeBuilder<'_> {
    fn grow(&mut self, rows: &[usize], depth: usize, rng: &mut ChaCha8Rng) -> usize {
        let positives = rows.iter().filter(|&&r| self.labels[r] == 1).count();
        let probability = positives as f64 / rows.len() as f64;

        let stop = depth >= self.config.max_depth
            || rows.len() < self.config.min_leaf * 2
            || positives == 0
            || positives == rows.len();
        if stop {
            return self.push_leaf(probability);
        }

        let Some(split) = self.best_split(rows, positives, rng) else {
            return self.push_leaf(probability);
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .copied()
            .partition(|&r| self.matrix.rows[r][split.feature] <= split.threshold);
        if left_rows.is_empty() || right_rows.is_empty() {
            return self.push_leaf(probability);
        }

        self.importances[split.feature] += split.gain * rows.len() as f64;

        let index = self.nodes.len();
        // Placeholder replaced once both children are grown.
        self.nodes.push(TreeNode::Leaf { probability });
        let left = self.grow(&left_rows, depth + 1, rng);
        let right = self.grow(&right_rows, depth + 1, rng);
        self.nodes[index] = TreeNode::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        index
    }

    fn push_leaf(&mut self, probability: f64) -> usize {
        self.nodes.push(TreeNode::Leaf { probability });
        self.nodes.len() - 1
    }

    fn best_split(
        &self,
        rows: &[usize],
        positives: usize,
        rng: &mut ChaCha8Rng,
    ) -> Option<SplitCandidate> {
        let n_features = self.matrix.n_features();
        let subsample = ((n_features as f64).sqrt().ceil() as usize).clamp(1, n_features);
        let mut candidates: Vec<usize> = (0..n_features).collect();
        candidates.shuffle(rng);
        candidates.truncate(subsample);

        let total = rows.len() as f64;
        let parent = gini(positives, rows.len());
        let mut best: Option<SplitCandidate> = None;

        for &feature in &candidates {
            let mut values: Vec<f64> = rows
                .iter()
                .map(|&r| self.matrix.rows[r][feature])
                .collect();
            values.sort_by(f64::total_cmp);
            values.dedup();

            for pair in values.windows(2) {
                let threshold = (pair[0] + pair[1]) / 2.0;
                let mut left_n = 0;
                let mut left_pos = 0;
                for &r in rows {
                    if self.matrix.rows[r][feature] <= threshold {
                        left_n += 1;
                        left_pos += usize::from(self.labels[r] == 1);
                    }
                }
                let right_n = rows.len() - left_n;
                if left_n == 0 || right_n == 0 {
                    continue;
                }
                let right_pos = positives - left_pos;
                let weighted = (left_n as f64 / total) * gini(left_pos, left_n)
                    + (right_n as f64 / total) * gini(right_pos, right_n);
                let gain = parent - weighted;
                if gain > best.as_ref().map_or(MIN_GAIN, |b| b.gain) {
                    best = Some(SplitCandidate {
                        feature,
                        threshold,
                        gain,
                    });
                }
            }
        }

        best
    }
}

fn gini(positives: usize, n: usize) -> f64 {
    let p = positives as f64 / n as f64;
    2.0 * p * (1.0 - p)
}

fn evaluate(
    state: &RiskModelState,
    matrix: &FeatureMatrix,
    labels: &[u8],
    holdout: &[usize],
) -> ModelMetrics {
    let mut confusion = [[0usize; 2]; 2];
    for &i in holdout {
        let probability = state.predict_row(&matrix.rows[i]);
        let predicted = usize::from(probability >= 0.5);
        confusion[usize::from(labels[i] == 1)][predicted] += 1;
    }

    let tp = confusion[1][1] as f64;
    let fp = confusion[0][1] as f64;
    let missed = confusion[1][0] as f64;
    let precision = if tp + fp == 0.0 { 0.0 } else { tp / (tp + fp) };
    let recall = if tp + missed == 0.0 {
        0.0
    } else {
        tp / (tp + missed)
    };
    let f1 = if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    };

    ModelMetrics {
        precision,
        recall,
        f1,
        confusion,
    }
}

fn ranked_importances(names: &[String], raw: Vec<f64>) -> Vec<(String, f64)> {
    let total: f64 = raw.iter().sum();
    let mut ranked: Vec<(String, f64)> = names
        .iter()
        .cloned()
        .zip(raw)
        .map(|(name, value)| {
            let share = if total > 0.0 { value / total } else { 0.0 };
            (name, share)
        })
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_matrix(names: &[&str], rows: Vec<Vec<f64>>) -> FeatureMatrix {
        FeatureMatrix {
            feature_names: names.iter().map(|s| s.to_string()).collect(),
            patient_ids: (0..rows.len()).map(|i| format!("p-{i}")).collect(),
            rows,
        }
    }

    /// 40 rows separable on the first feature, with a value gap between
    /// the classes so every learnable threshold falls inside the gap.
    fn separable() -> (FeatureMatrix, Vec<u8>) {
        let rows: Vec<Vec<f64>> = (0..40)
            .map(|i| {
                let burden = if i < 20 { i } else { i + 10 };
                vec![burden as f64, (i % 3) as f64]
            })
            .collect();
        let labels: Vec<u8> = (0..40).map(|i| u8::from(i >= 20)).collect();
        (toy_matrix(&["burden", "noise"], rows), labels)
    }

    #[test]
    fn test_fit_separates_clean_data() {
        let (matrix, labels) = separable();
        let (state, report) =
            fit_supervised(&matrix, &labels, &TrainConfig::default()).expect("Should fit");

        let scores = predict(&state, &matrix).expect("Should predict");
        for (&score, &label) in scores.iter().zip(&labels) {
            assert!((0.0..=1.0).contains(&score));
            if label == 1 {
                assert!(score > 0.5, "positive row scored {score}");
            } else {
                assert!(score < 0.5, "negative row scored {score}");
            }
        }

        let metrics = report.metrics.expect("holdout diagnostics");
        assert!(metrics.f1 > 0.9, "f1 was {}", metrics.f1);
        // The separating feature dominates the importances.
        assert_eq!(report.importances[0].0, "burden");
        assert!(report.importances[0].1 > 0.5);
    }

    #[test]
    fn test_fit_is_deterministic_for_a_fixed_seed() {
        let (matrix, labels) = separable();
        let config = TrainConfig::default();
        let (a, _) = fit_supervised(&matrix, &labels, &config).expect("Should fit");
        let (b, _) = fit_supervised(&matrix, &labels, &config).expect("Should fit");
        assert_eq!(
            predict(&a, &matrix).expect("Should predict"),
            predict(&b, &matrix).expect("Should predict"),
        );
    }

    #[test]
    fn test_label_count_mismatch_is_rejected() {
        let (matrix, _) = separable();
        let err =
            fit_supervised(&matrix, &[1, 0], &TrainConfig::default()).expect_err("must fail");
        assert!(matches!(err, CaresightError::Configuration(_)));
    }

    #[test]
    fn test_predict_rejects_reordered_features() {
        let (matrix, labels) = separable();
        let (state, _) =
            fit_supervised(&matrix, &labels, &TrainConfig::default()).expect("Should fit");

        let mut reordered = matrix.clone();
        reordered.feature_names.swap(0, 1);
        let err = predict(&state, &reordered).expect_err("must fail");
        assert!(matches!(err, CaresightError::Configuration(_)));
    }

    #[test]
    fn test_proxy_labels_split_at_the_median() {
        use crate::domain::FEATURE_NAMES;

        let chronic_idx = FEATURE_NAMES
            .iter()
            .position(|&n| n == CHRONIC_CONDITION_COUNT)
            .expect("known feature");
        let age_idx = FEATURE_NAMES
            .iter()
            .position(|&n| n == AGE)
            .expect("known feature");

        let mut rows = vec![vec![0.0; FEATURE_NAMES.len()]; 4];
        // Burden values: 1.0, 3.0, 5.0, 9.0 -> median 4.0.
        for (row, (chronic, age)) in rows
            .iter_mut()
            .zip([(1.0, 0.0), (1.0, 20.0), (2.0, 30.0), (4.0, 50.0)])
        {
            row[chronic_idx] = chronic;
            row[age_idx] = age;
        }
        let names: Vec<&str> = FEATURE_NAMES.to_vec();
        let matrix = toy_matrix(&names, rows);

        let labels = proxy_labels(&matrix).expect("Should derive");
        assert_eq!(labels, vec![0, 0, 1, 1]);
    }

    #[test]
    fn test_single_class_batch_scores_zero() {
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let labels = vec![0u8; 10];
        let matrix = toy_matrix(&["only"], rows);
        let (state, report) =
            fit_supervised(&matrix, &labels, &TrainConfig::default()).expect("Should fit");

        let scores = predict(&state, &matrix).expect("Should predict");
        assert!(scores.iter().all(|&s| s == 0.0));
        // Nothing to split on: no importances accumulate.
        assert!(report.importances.iter().all(|(_, share)| *share == 0.0));
    }

    #[test]
    fn test_model_state_round_trips_through_json() {
        let (matrix, labels) = separable();
        let (state, _) =
            fit_supervised(&matrix, &labels, &TrainConfig::default()).expect("Should fit");
        let expected = predict(&state, &matrix).expect("Should predict");

        let json = serde_json::to_string(&state).expect("serialize");
        let restored: RiskModelState = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(predict(&restored, &matrix).expect("Should predict"), expected);
    }
}
