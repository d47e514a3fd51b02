//! Domain layer: Core business types and logic.
//!
//! This module contains pure Rust types with no external collaborators.
//! All types are serializable; derivations are total over missing data.

mod assessment;
mod features;
mod record;
mod recommend;

pub use assessment::{RiskAssessment, RiskCategory};
pub use features::{
    FeatureBuilder, FeatureVector, ACTIVE_MEDICATION_COUNT, AGE, CHRONIC_CONDITION_AGE_RISK,
    CHRONIC_CONDITION_COUNT, CONDITION_COUNT, DAYS_SINCE_LAST_ENCOUNTER, ENCOUNTER_COUNT,
    ENGAGEMENT_SCORE, ENROLLMENT_STATUS_CODE, FEATURE_NAMES, GENDER_CODE,
    HIGH_PRIORITY_TASK_COUNT, LANGUAGE_CODE, MEDICATION_ADHERENCE, MEDICATION_COUNT,
    MISSING_FOLLOW_UP, OPEN_TASK_COUNT, PROGRAM_STATUS_CODE, TASK_COUNT,
};
pub use record::{Condition, Encounter, Medication, RawPatientRecord, Task};
pub use recommend::{
    recommend, recommend_for, Recommendation, HIGH_CHRONIC_ENROLLMENT, HIGH_IMMEDIATE_FOLLOW_UP,
    HIGH_INTERVENTION, HIGH_MEDICATION_RECONCILIATION, LOW_ROUTINE, LOW_ROUTINE_CHECK_UP,
    MEDIUM_ADHERENCE_COUNSELING, MEDIUM_FOLLOW_UP_30_DAYS, MEDIUM_PREVENTIVE, SENIOR_FALL_RISK,
    SENIOR_WELLNESS_VISIT,
};
