//! Model layer: feature matrix projection, scaling, the tree-ensemble
//! classifier and the bundled artifacts that version them together.

mod artifacts;
mod forest;
mod matrix;
mod scaler;
mod scorer;

pub use artifacts::{ModelArtifacts, TrainingMode};
pub use forest::{
    fit_proxy, fit_supervised, predict, proxy_labels, ModelMetrics, RiskModelState, TrainConfig,
    TrainReport,
};
pub use matrix::FeatureMatrix;
pub use scaler::ScalerState;
pub use scorer::RiskScorer;
