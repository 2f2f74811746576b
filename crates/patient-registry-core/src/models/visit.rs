//! Visit models.

use serde::{Deserialize, Serialize};

/// A recorded clinic visit. Visits are immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Visit {
    pub id: i64,
    pub patient_id: i64,
    /// When the visit took place (RFC 3339)
    pub visit_date: String,
    pub doctor_name: String,
    pub reason: String,
    pub notes: Option<String>,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
}

/// Input for recording a visit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVisit {
    pub patient_id: i64,
    pub visit_date: String,
    pub doctor_name: String,
    pub reason: String,
    pub notes: Option<String>,
}

impl NewVisit {
    /// Names of required fields that are empty or whitespace-only.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let required: [(&'static str, &str); 3] = [
            ("visit_date", &self.visit_date),
            ("doctor_name", &self.doctor_name),
            ("reason", &self.reason),
        ];
        required
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| name)
            .collect()
    }
}

/// A visit joined with its patient's name, for the all-visits listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VisitWithPatient {
    #[serde(flatten)]
    pub visit: Visit,
    pub first_name: String,
    pub last_name: String,
}
