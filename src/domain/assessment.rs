//! Risk assessment types.
//!
//! Maps the model's continuous probability output to an ordinal risk
//! tier under fixed thresholds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ordinal risk tier derived from a probability score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskCategory {
    /// Low risk, routine maintenance
    Low,
    /// Medium risk, preventive coordination recommended
    Medium,
    /// High risk, intervention required
    High,
}

impl RiskCategory {
    /// Tier a probability score. Bin edges are 0, 0.3, 0.6 and 1.0 with
    /// each bin closed on its upper side, so 0.3 is Low and 0.6 Medium.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score <= 0.3 {
            Self::Low
        } else if score <= 0.6 {
            Self::Medium
        } else {
            Self::High
        }
    }

    /// Stable string form used for persistence.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl std::fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One per patient per run; superseded, not merged, by the next run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub patient_id: String,

    /// Probability of the positive class, in [0, 1]
    pub score: f64,

    pub category: RiskCategory,

    pub assessed_at: DateTime<Utc>,
}

impl RiskAssessment {
    /// Create an assessment, deriving the tier from the score.
    #[must_use]
    pub fn new(patient_id: impl Into<String>, score: f64) -> Self {
        Self {
            patient_id: patient_id.into(),
            score,
            category: RiskCategory::from_score(score),
            assessed_at: Utc::now(),
        }
    }
}
