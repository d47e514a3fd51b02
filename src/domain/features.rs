//! Feature derivation: one raw patient record in, one flat numeric
//! feature vector out.
//!
//! Every derivation is defined even when the source data is absent;
//! missing leaf fields fall back to the documented defaults and never
//! raise an error. Categorical fields are integer-factorized with a
//! code assigned by first-seen order within the processing batch, so
//! the builder is scoped to one batch and rebuilt for the next.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::record::RawPatientRecord;

pub const TASK_COUNT: &str = "task_count";
pub const OPEN_TASK_COUNT: &str = "open_task_count";
pub const HIGH_PRIORITY_TASK_COUNT: &str = "high_priority_task_count";
pub const CONDITION_COUNT: &str = "condition_count";
pub const CHRONIC_CONDITION_COUNT: &str = "chronic_condition_count";
pub const MEDICATION_COUNT: &str = "medication_count";
pub const ACTIVE_MEDICATION_COUNT: &str = "active_medication_count";
pub const ENCOUNTER_COUNT: &str = "encounter_count";
pub const DAYS_SINCE_LAST_ENCOUNTER: &str = "days_since_last_encounter";
pub const AGE: &str = "age";
pub const MEDICATION_ADHERENCE: &str = "medication_adherence";
pub const ENGAGEMENT_SCORE: &str = "engagement_score";
pub const CHRONIC_CONDITION_AGE_RISK: &str = "chronic_condition_age_risk";
pub const MISSING_FOLLOW_UP: &str = "missing_follow_up";
pub const GENDER_CODE: &str = "gender_code";
pub const LANGUAGE_CODE: &str = "language_code";
pub const ENROLLMENT_STATUS_CODE: &str = "enrollment_status_code";
pub const PROGRAM_STATUS_CODE: &str = "program_status_code";

/// Ordered feature names for this model version. The order defines the
/// matrix column layout and must be reproduced exactly at inference time.
pub const FEATURE_NAMES: [&str; 18] = [
    TASK_COUNT,
    OPEN_TASK_COUNT,
    HIGH_PRIORITY_TASK_COUNT,
    CONDITION_COUNT,
    CHRONIC_CONDITION_COUNT,
    MEDICATION_COUNT,
    ACTIVE_MEDICATION_COUNT,
    ENCOUNTER_COUNT,
    DAYS_SINCE_LAST_ENCOUNTER,
    AGE,
    MEDICATION_ADHERENCE,
    ENGAGEMENT_SCORE,
    CHRONIC_CONDITION_AGE_RISK,
    MISSING_FOLLOW_UP,
    GENDER_CODE,
    LANGUAGE_CODE,
    ENROLLMENT_STATUS_CODE,
    PROGRAM_STATUS_CODE,
];

/// Days assumed since the last encounter when none carry a parsable date.
pub const DEFAULT_DAYS_SINCE_ENCOUNTER: f64 = 365.0;

/// Threshold in days beyond which a patient counts as missing follow-up.
pub const FOLLOW_UP_WINDOW_DAYS: f64 = 180.0;

/// Placeholder for absent categorical values before coding.
const UNKNOWN_CATEGORY: &str = "Unknown";

/// Flat numeric feature vector for one patient.
///
/// Derived, never mutated after creation; recomputation produces a new
/// vector rather than an in-place edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub patient_id: String,
    values: BTreeMap<String, f64>,
}

impl FeatureVector {
    fn new(patient_id: impl Into<String>) -> Self {
        Self {
            patient_id: patient_id.into(),
            values: BTreeMap::new(),
        }
    }

    fn insert(&mut self, name: &str, value: f64) {
        self.values.insert(name.to_string(), value);
    }

    /// Look up a named feature value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Read a boolean feature encoded as 0/1.
    #[must_use]
    pub fn flag(&self, name: &str) -> bool {
        self.get(name).unwrap_or(0.0) > 0.5
    }
}

/// Batch-scoped categorical factorization: the same value seen twice in
/// one batch always gets the same code; codes are not stable across
/// separate runs.
#[derive(Debug, Default)]
struct CategoricalCodebook {
    fields: HashMap<&'static str, HashMap<String, usize>>,
}

impl CategoricalCodebook {
    fn code(&mut self, field: &'static str, value: &str) -> f64 {
        let field_codes = self.fields.entry(field).or_default();
        let next = field_codes.len();
        *field_codes.entry(value.to_string()).or_insert(next) as f64
    }
}

/// Converts raw patient records into feature vectors for one batch.
///
/// Takes an explicit `as_of` date so day arithmetic is deterministic;
/// the orchestrator passes the current date.
#[derive(Debug)]
pub struct FeatureBuilder {
    as_of: NaiveDate,
    codebook: CategoricalCodebook,
}

impl FeatureBuilder {
    /// Create a builder for a batch processed as of the given date.
    #[must_use]
    pub fn new(as_of: NaiveDate) -> Self {
        Self {
            as_of,
            codebook: CategoricalCodebook::default(),
        }
    }

    /// Derive the feature vector for one record. Total over missing data.
    pub fn build(&mut self, record: &RawPatientRecord) -> FeatureVector {
        let mut features = FeatureVector::new(&record.id);

        let task_count = record.tasks.len() as f64;
        let open_task_count = record
            .tasks
            .iter()
            .filter(|t| t.status.as_deref() == Some("Open"))
            .count() as f64;
        let high_priority_task_count = record
            .tasks
            .iter()
            .filter(|t| t.priority.as_deref() == Some("High"))
            .count() as f64;

        let condition_count = record.conditions.len() as f64;
        let chronic_condition_count = record
            .conditions
            .iter()
            .filter(|c| {
                c.summary
                    .as_deref()
                    .unwrap_or("")
                    .to_lowercase()
                    .contains("chronic")
            })
            .count() as f64;

        let medication_count = record.medications.len() as f64;
        let active_medication_count = record
            .medications
            .iter()
            .filter(|m| m.status.as_deref() == Some("Active"))
            .count() as f64;

        let encounter_count = record.encounters.len() as f64;
        let last_encounter = record
            .encounters
            .iter()
            .filter_map(|e| e.service_date.as_deref().and_then(parse_service_date))
            .max();
        let days_since_last_encounter = last_encounter
            .map(|date| (self.as_of - date).num_days() as f64)
            .unwrap_or(DEFAULT_DAYS_SINCE_ENCOUNTER);

        let age = record.age.map_or(0.0, f64::from);
        let medication_adherence = if medication_count == 0.0 {
            0.0
        } else {
            active_medication_count / medication_count
        };
        let engagement_score = (task_count - open_task_count) + encounter_count;
        let chronic_condition_age_risk = chronic_condition_count * (age / 100.0);
        let missing_follow_up = if days_since_last_encounter > FOLLOW_UP_WINDOW_DAYS {
            1.0
        } else {
            0.0
        };

        features.insert(TASK_COUNT, task_count);
        features.insert(OPEN_TASK_COUNT, open_task_count);
        features.insert(HIGH_PRIORITY_TASK_COUNT, high_priority_task_count);
        features.insert(CONDITION_COUNT, condition_count);
        features.insert(CHRONIC_CONDITION_COUNT, chronic_condition_count);
        features.insert(MEDICATION_COUNT, medication_count);
        features.insert(ACTIVE_MEDICATION_COUNT, active_medication_count);
        features.insert(ENCOUNTER_COUNT, encounter_count);
        features.insert(DAYS_SINCE_LAST_ENCOUNTER, days_since_last_encounter);
        features.insert(AGE, age);
        features.insert(MEDICATION_ADHERENCE, medication_adherence);
        features.insert(ENGAGEMENT_SCORE, engagement_score);
        features.insert(CHRONIC_CONDITION_AGE_RISK, chronic_condition_age_risk);
        features.insert(MISSING_FOLLOW_UP, missing_follow_up);

        features.insert(
            GENDER_CODE,
            self.categorical(GENDER_CODE, record.gender.as_deref()),
        );
        features.insert(
            LANGUAGE_CODE,
            self.categorical(LANGUAGE_CODE, record.primary_language.as_deref()),
        );
        features.insert(
            ENROLLMENT_STATUS_CODE,
            self.categorical(ENROLLMENT_STATUS_CODE, record.enrollment_status.as_deref()),
        );
        features.insert(
            PROGRAM_STATUS_CODE,
            self.categorical(PROGRAM_STATUS_CODE, record.program_status.as_deref()),
        );

        features
    }

    /// Derive feature vectors for a whole batch, in record order.
    pub fn build_batch(&mut self, records: &[RawPatientRecord]) -> Vec<FeatureVector> {
        records.iter().map(|record| self.build(record)).collect()
    }

    fn categorical(&mut self, field: &'static str, value: Option<&str>) -> f64 {
        self.codebook.code(field, value.unwrap_or(UNKNOWN_CATEGORY))
    }
}

/// Parse a calendar service date, accepting ISO and US slash formats.
/// Returns `None` for anything unparsable; callers skip those.
fn parse_service_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%m/%d/%Y"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::{Condition, Encounter, Medication, Task};

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 1).expect("valid date")
    }

    fn task(status: &str, priority: &str) -> Task {
        Task {
            status: Some(status.to_string()),
            priority: Some(priority.to_string()),
        }
    }

    #[test]
    fn test_empty_record_defaults() {
        let mut builder = FeatureBuilder::new(as_of());
        let features = builder.build(&RawPatientRecord::new("p-empty"));

        for name in [
            TASK_COUNT,
            OPEN_TASK_COUNT,
            HIGH_PRIORITY_TASK_COUNT,
            CONDITION_COUNT,
            CHRONIC_CONDITION_COUNT,
            MEDICATION_COUNT,
            ACTIVE_MEDICATION_COUNT,
            ENCOUNTER_COUNT,
        ] {
            assert_eq!(features.get(name), Some(0.0), "{name} should default to 0");
        }
        assert_eq!(
            features.get(DAYS_SINCE_LAST_ENCOUNTER),
            Some(DEFAULT_DAYS_SINCE_ENCOUNTER)
        );
        assert_eq!(features.get(MEDICATION_ADHERENCE), Some(0.0));
        assert!(features.flag(MISSING_FOLLOW_UP));
        // Missing categoricals are coded as "Unknown", first seen -> 0.
        assert_eq!(features.get(GENDER_CODE), Some(0.0));
    }

    #[test]
    fn test_full_feature_set_present() {
        let mut builder = FeatureBuilder::new(as_of());
        let features = builder.build(&RawPatientRecord::new("p-1"));
        for name in FEATURE_NAMES {
            assert!(features.get(name).is_some(), "missing feature {name}");
        }
    }

    #[test]
    fn test_counts_and_derived_scores() {
        let record = RawPatientRecord {
            id: "p-2".into(),
            age: Some(70),
            tasks: vec![task("Open", "High"), task("Completed", "Low")],
            conditions: vec![
                Condition {
                    summary: Some("CHRONIC heart failure".into()),
                },
                Condition {
                    summary: Some("Acute sinusitis".into()),
                },
                Condition { summary: None },
            ],
            medications: vec![
                Medication {
                    status: Some("Active".into()),
                },
                Medication {
                    status: Some("Discontinued".into()),
                },
            ],
            encounters: vec![
                Encounter {
                    service_date: Some("2026-05-02".into()),
                },
                Encounter {
                    service_date: Some("not-a-date".into()),
                },
            ],
            ..Default::default()
        };

        let mut builder = FeatureBuilder::new(as_of());
        let features = builder.build(&record);

        assert_eq!(features.get(TASK_COUNT), Some(2.0));
        assert_eq!(features.get(OPEN_TASK_COUNT), Some(1.0));
        assert_eq!(features.get(HIGH_PRIORITY_TASK_COUNT), Some(1.0));
        // Case-insensitive "chronic" match; missing summary treated as empty.
        assert_eq!(features.get(CHRONIC_CONDITION_COUNT), Some(1.0));
        assert_eq!(features.get(MEDICATION_ADHERENCE), Some(0.5));
        // 2026-05-02 -> 2026-06-01 is 30 days; unparsable date skipped.
        assert_eq!(features.get(DAYS_SINCE_LAST_ENCOUNTER), Some(30.0));
        assert!(!features.flag(MISSING_FOLLOW_UP));
        // (2 - 1) completed tasks + 2 encounters
        assert_eq!(features.get(ENGAGEMENT_SCORE), Some(3.0));
        // 1 chronic condition * 70 / 100
        let risk = features.get(CHRONIC_CONDITION_AGE_RISK).expect("present");
        assert!((risk - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_adherence_stays_in_unit_interval() {
        for (active, total) in [(0usize, 0usize), (0, 3), (2, 3), (3, 3)] {
            let record = RawPatientRecord {
                id: "p-adh".into(),
                medications: (0..total)
                    .map(|i| Medication {
                        status: Some((if i < active { "Active" } else { "Stopped" }).into()),
                    })
                    .collect(),
                ..Default::default()
            };
            let mut builder = FeatureBuilder::new(as_of());
            let adherence = builder
                .build(&record)
                .get(MEDICATION_ADHERENCE)
                .expect("present");
            assert!((0.0..=1.0).contains(&adherence));
        }
    }

    #[test]
    fn test_categorical_codes_first_seen_order() {
        let mut spanish = RawPatientRecord::new("p-a");
        spanish.primary_language = Some("Spanish".into());
        let mut english = RawPatientRecord::new("p-b");
        english.primary_language = Some("English".into());
        let mut spanish_again = RawPatientRecord::new("p-c");
        spanish_again.primary_language = Some("Spanish".into());

        let mut builder = FeatureBuilder::new(as_of());
        let batch = builder.build_batch(&[spanish, english, spanish_again]);

        assert_eq!(batch[0].get(LANGUAGE_CODE), Some(0.0));
        assert_eq!(batch[1].get(LANGUAGE_CODE), Some(1.0));
        assert_eq!(batch[2].get(LANGUAGE_CODE), Some(0.0));
    }

    #[test]
    fn test_rebuild_is_idempotent_within_batch() {
        let mut record = RawPatientRecord::new("p-same");
        record.gender = Some("F".into());
        record.age = Some(44);
        record.encounters = vec![Encounter {
            service_date: Some("2026-03-10".into()),
        }];

        let mut builder = FeatureBuilder::new(as_of());
        let first = builder.build(&record);
        let second = builder.build(&record);
        assert_eq!(first, second);
    }

    #[test]
    fn test_future_dated_encounter_still_parses() {
        let mut record = RawPatientRecord::new("p-future");
        record.encounters = vec![Encounter {
            service_date: Some("12/24/2026".into()),
        }];
        let mut builder = FeatureBuilder::new(as_of());
        let days = builder
            .build(&record)
            .get(DAYS_SINCE_LAST_ENCOUNTER)
            .expect("present");
        assert!(days < 0.0);
    }
}
