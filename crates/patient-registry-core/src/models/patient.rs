//! Patient models.

use serde::{Deserialize, Serialize};

use super::Visit;

/// Patient gender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            "other" => Some(Gender::Other),
            _ => None,
        }
    }
}

/// ABO/Rh blood group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BloodGroup {
    #[serde(rename = "A+")]
    APos,
    #[serde(rename = "A-")]
    ANeg,
    #[serde(rename = "B+")]
    BPos,
    #[serde(rename = "B-")]
    BNeg,
    #[serde(rename = "AB+")]
    AbPos,
    #[serde(rename = "AB-")]
    AbNeg,
    #[serde(rename = "O+")]
    OPos,
    #[serde(rename = "O-")]
    ONeg,
}

impl BloodGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            BloodGroup::APos => "A+",
            BloodGroup::ANeg => "A-",
            BloodGroup::BPos => "B+",
            BloodGroup::BNeg => "B-",
            BloodGroup::AbPos => "AB+",
            BloodGroup::AbNeg => "AB-",
            BloodGroup::OPos => "O+",
            BloodGroup::ONeg => "O-",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "A+" => Some(BloodGroup::APos),
            "A-" => Some(BloodGroup::ANeg),
            "B+" => Some(BloodGroup::BPos),
            "B-" => Some(BloodGroup::BNeg),
            "AB+" => Some(BloodGroup::AbPos),
            "AB-" => Some(BloodGroup::AbNeg),
            "O+" => Some(BloodGroup::OPos),
            "O-" => Some(BloodGroup::ONeg),
            _ => None,
        }
    }
}

/// A registered patient as stored.
///
/// `visit_count` is derived state: it always equals the number of visit rows
/// referencing this patient and is maintained incrementally by the visit
/// operations, never set by callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    /// Date of birth (ISO 8601 date)
    pub date_of_birth: String,
    pub gender: Gender,
    /// Contact email, unique across patients
    pub email: String,
    pub phone: String,
    pub address: String,
    pub blood_group: Option<BloodGroup>,
    pub allergies: Option<String>,
    pub conditions: Option<String>,
    pub medications: Option<String>,
    pub insurance_provider: Option<String>,
    pub insurance_number: Option<String>,
    /// Gates whether new visits may be recorded
    pub allowed_to_visit: bool,
    pub visit_count: i64,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
}

/// Input for registering a patient.
///
/// Excludes `id`, `created_at` and `visit_count`; those are assigned by the
/// access layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPatient {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub gender: Gender,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub blood_group: Option<BloodGroup>,
    pub allergies: Option<String>,
    pub conditions: Option<String>,
    pub medications: Option<String>,
    pub insurance_provider: Option<String>,
    pub insurance_number: Option<String>,
}

impl NewPatient {
    /// Names of required fields that are empty or whitespace-only.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let required: [(&'static str, &str); 6] = [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("date_of_birth", &self.date_of_birth),
            ("email", &self.email),
            ("phone", &self.phone),
            ("address", &self.address),
        ];
        required
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| name)
            .collect()
    }
}

/// Partial patient update.
///
/// One `Option` per writable column; `None` leaves the column unchanged.
/// `id`, `created_at` and `visit_count` are not representable here, so they
/// cannot be set through an update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub gender: Option<Gender>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub blood_group: Option<BloodGroup>,
    pub allergies: Option<String>,
    pub conditions: Option<String>,
    pub medications: Option<String>,
    pub insurance_provider: Option<String>,
    pub insurance_number: Option<String>,
    pub allowed_to_visit: Option<bool>,
}

impl PatientUpdate {
    /// True when no field is present.
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.date_of_birth.is_none()
            && self.gender.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.address.is_none()
            && self.blood_group.is_none()
            && self.allergies.is_none()
            && self.conditions.is_none()
            && self.medications.is_none()
            && self.insurance_provider.is_none()
            && self.insurance_number.is_none()
            && self.allowed_to_visit.is_none()
    }
}

/// A patient together with its visit history, newest visit first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientWithVisits {
    #[serde(flatten)]
    pub patient: Patient,
    pub visits: Vec<Visit>,
}
