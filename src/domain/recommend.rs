//! Recommendation engine: deterministic rule evaluation over a
//! patient's derived features and risk tier.
//!
//! The rule set is a declarative ordered table evaluated first-to-last;
//! every matching rule appends its recommendation, with no
//! short-circuit. Order and wording are part of the contract.

use serde::{Deserialize, Serialize};

use crate::domain::assessment::{RiskAssessment, RiskCategory};
use crate::domain::features::{
    AGE, CHRONIC_CONDITION_COUNT, DAYS_SINCE_LAST_ENCOUNTER, FeatureVector, MEDICATION_ADHERENCE,
    MEDICATION_COUNT, MISSING_FOLLOW_UP,
};

pub const HIGH_INTERVENTION: &str = "Immediate care coordination intervention required";
pub const HIGH_CHRONIC_ENROLLMENT: &str = "Enroll in chronic care management program";
pub const HIGH_MEDICATION_RECONCILIATION: &str = "Medication reconciliation recommended";
pub const HIGH_IMMEDIATE_FOLLOW_UP: &str = "Schedule immediate follow-up appointment";
pub const MEDIUM_PREVENTIVE: &str = "Preventive care coordination recommended";
pub const MEDIUM_FOLLOW_UP_30_DAYS: &str = "Schedule follow-up within 30 days";
pub const MEDIUM_ADHERENCE_COUNSELING: &str = "Medication adherence counseling recommended";
pub const LOW_ROUTINE: &str = "Routine care maintenance";
pub const LOW_ROUTINE_CHECK_UP: &str = "Schedule routine annual check-up";
pub const SENIOR_FALL_RISK: &str = "Fall risk assessment recommended";
pub const SENIOR_WELLNESS_VISIT: &str = "Medicare annual wellness visit reminder";

struct Rule {
    when: fn(&FeatureVector, RiskCategory) -> bool,
    advise: &'static str,
}

fn feature(features: &FeatureVector, name: &str) -> f64 {
    features.get(name).unwrap_or(0.0)
}

/// Ordered rule table: tier-specific rules first, universal rules last.
const RULES: &[Rule] = &[
    Rule {
        when: |_, tier| tier == RiskCategory::High,
        advise: HIGH_INTERVENTION,
    },
    Rule {
        when: |f, tier| tier == RiskCategory::High && feature(f, CHRONIC_CONDITION_COUNT) > 2.0,
        advise: HIGH_CHRONIC_ENROLLMENT,
    },
    Rule {
        when: |f, tier| tier == RiskCategory::High && feature(f, MEDICATION_COUNT) > 5.0,
        advise: HIGH_MEDICATION_RECONCILIATION,
    },
    Rule {
        when: |f, tier| tier == RiskCategory::High && f.flag(MISSING_FOLLOW_UP),
        advise: HIGH_IMMEDIATE_FOLLOW_UP,
    },
    Rule {
        when: |_, tier| tier == RiskCategory::Medium,
        advise: MEDIUM_PREVENTIVE,
    },
    Rule {
        when: |f, tier| {
            tier == RiskCategory::Medium && feature(f, DAYS_SINCE_LAST_ENCOUNTER) > 90.0
        },
        advise: MEDIUM_FOLLOW_UP_30_DAYS,
    },
    Rule {
        when: |f, tier| tier == RiskCategory::Medium && feature(f, MEDICATION_ADHERENCE) < 0.8,
        advise: MEDIUM_ADHERENCE_COUNSELING,
    },
    Rule {
        when: |_, tier| tier == RiskCategory::Low,
        advise: LOW_ROUTINE,
    },
    Rule {
        when: |f, tier| tier == RiskCategory::Low && feature(f, DAYS_SINCE_LAST_ENCOUNTER) > 180.0,
        advise: LOW_ROUTINE_CHECK_UP,
    },
    Rule {
        when: |f, _| feature(f, AGE) > 65.0,
        advise: SENIOR_FALL_RISK,
    },
    Rule {
        when: |f, _| feature(f, AGE) > 65.0,
        advise: SENIOR_WELLNESS_VISIT,
    },
];

/// Ordered recommendations for one patient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub patient_id: String,
    pub actions: Vec<String>,
}

/// Evaluate the rule table for one patient.
#[must_use]
pub fn recommend(features: &FeatureVector, category: RiskCategory) -> Vec<String> {
    RULES
        .iter()
        .filter(|rule| (rule.when)(features, category))
        .map(|rule| rule.advise.to_string())
        .collect()
}

/// Pair an assessment with its source feature vector.
#[must_use]
pub fn recommend_for(features: &FeatureVector, assessment: &RiskAssessment) -> Recommendation {
    Recommendation {
        patient_id: assessment.patient_id.clone(),
        actions: recommend(features, assessment.category),
    }
}
