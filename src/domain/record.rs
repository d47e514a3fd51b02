//! Raw patient record types as fetched from the clinical record source.
//!
//! Every leaf field that the source may omit is an explicit `Option`;
//! downstream derivations define a default for each one, so a sparse
//! record is never an error.

use serde::{Deserialize, Serialize};

/// One care-coordination task attached to a patient.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Task {
    /// Task workflow status, e.g. "Open" or "Completed"
    #[serde(default)]
    pub status: Option<String>,

    /// Task priority, e.g. "High", "Medium", "Low"
    #[serde(default)]
    pub priority: Option<String>,
}

/// A diagnosed condition with its free-text diagnostic summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Condition {
    #[serde(default)]
    pub summary: Option<String>,
}

/// A medication order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Medication {
    /// Medication status, e.g. "Active" or "Discontinued"
    #[serde(default)]
    pub status: Option<String>,
}

/// A clinical encounter. The service date is a calendar date without a
/// time component; unparsable values are skipped during derivation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Encounter {
    #[serde(default)]
    pub service_date: Option<String>,
}

/// Raw per-patient record: demographics plus nested ordered collections.
///
/// Immutable once fetched; owned by the orchestrator for the duration of
/// one batch run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPatientRecord {
    /// Opaque patient identifier
    pub id: String,

    /// Display name (never logged; identifiers only)
    #[serde(default)]
    pub name: String,

    /// Age in whole years, when known
    #[serde(default)]
    pub age: Option<u32>,

    #[serde(default)]
    pub gender: Option<String>,

    #[serde(default)]
    pub primary_language: Option<String>,

    #[serde(default)]
    pub enrollment_status: Option<String>,

    #[serde(default)]
    pub program_status: Option<String>,

    #[serde(default)]
    pub tasks: Vec<Task>,

    #[serde(default)]
    pub conditions: Vec<Condition>,

    #[serde(default)]
    pub medications: Vec<Medication>,

    #[serde(default)]
    pub encounters: Vec<Encounter>,
}

impl RawPatientRecord {
    /// Create an empty record with only an identifier set.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}
