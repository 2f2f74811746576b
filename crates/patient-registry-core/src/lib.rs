//! Patient Registry Core
//!
//! Data-access layer for a patient registration and visit-tracking
//! application. The presentation layer (forms, tables, dialogs) is an
//! external collaborator: it calls the operations on [`PatientRegistry`] and
//! renders the results, and consumes nothing else from this crate.
//!
//! # Architecture
//!
//! ```text
//! UI action ──▶ PatientRegistry (validation, visit-allowance policy)
//!                      │
//!                      ▼
//!               Database (rusqlite, single shared connection)
//!                      │
//!          ┌───────────┼────────────┐
//!          ▼           ▼            ▼
//!      patients      visits    raw query gate
//!       (CRUD)    (count-kept)  (SELECT only)
//! ```
//!
//! # Core invariant
//!
//! **A patient's `visit_count` always equals the number of visit rows that
//! reference it.** The count is maintained incrementally: visit insertion and
//! deletion update it inside the same transaction as the row change.
//!
//! # Modules
//!
//! - [`db`]: SQLite database layer (schema, patient/visit operations, gated
//!   raw queries)
//! - [`models`]: domain types (Patient, Visit, update/input structs)

pub mod db;
pub mod models;

// Re-export commonly used types
pub use db::{Database, QueryResult};
pub use models::{
    BloodGroup, Gender, NewPatient, NewVisit, Patient, PatientUpdate, PatientWithVisits, Visit,
    VisitWithPatient,
};

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use tracing::{debug, info, warn};

// =========================================================================
// Error Taxonomy
// =========================================================================

/// Failures surfaced to the presentation layer.
///
/// Every failure is scoped to the single requested operation; nothing here is
/// fatal to the process and nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Missing or invalid required input; the caller can correct and resubmit.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A referenced entity id does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rejected by a business rule, e.g. recording a visit for a blocked
    /// patient.
    #[error("Policy violation: {0}")]
    Policy(String),

    /// A raw query failed the read-only gate.
    #[error("Query rejected: {0}")]
    RejectedQuery(String),

    /// Underlying storage failure, surfaced with a generic message.
    #[error("Storage error: {0}")]
    Store(String),
}

impl From<db::DbError> for RegistryError {
    fn from(e: db::DbError) -> Self {
        match e {
            db::DbError::NotFound(msg) => RegistryError::NotFound(msg),
            db::DbError::RejectedQuery(msg) => RegistryError::RejectedQuery(msg),
            other => RegistryError::Store(other.to_string()),
        }
    }
}

impl<T> From<PoisonError<T>> for RegistryError {
    fn from(e: PoisonError<T>) -> Self {
        RegistryError::Store(format!("Lock poisoned: {e}"))
    }
}

fn validation_error(missing: Vec<&'static str>) -> RegistryError {
    RegistryError::Validation(format!("missing required fields: {}", missing.join(", ")))
}

// =========================================================================
// Registry Facade
// =========================================================================

/// Thread-safe handle over the shared store.
///
/// This is the complete collaborator contract exposed to the presentation
/// layer; the [`Database`] underneath is never handed out directly.
pub struct PatientRegistry {
    db: Arc<Mutex<Database>>,
}

impl PatientRegistry {
    /// Open or create a registry database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RegistryError> {
        let db = Database::open(path)?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }

    /// Create an in-memory registry (for testing).
    pub fn open_in_memory() -> Result<Self, RegistryError> {
        let db = Database::open_in_memory()?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Database>, RegistryError> {
        Ok(self.db.lock()?)
    }

    // =====================================================================
    // Patient Operations
    // =====================================================================

    /// Register a new patient.
    pub fn create_patient(&self, input: NewPatient) -> Result<Patient, RegistryError> {
        let missing = input.missing_fields();
        if !missing.is_empty() {
            return Err(validation_error(missing));
        }

        let db = self.lock()?;
        let patient = db.insert_patient(&input)?;
        info!(id = patient.id, "registered patient");
        Ok(patient)
    }

    /// All patients, newest first. Callers paginate in memory.
    pub fn all_patients(&self) -> Result<Vec<Patient>, RegistryError> {
        let db = self.lock()?;
        Ok(db.list_patients()?)
    }

    /// A patient with its visit history, or `None` when the id is unknown.
    pub fn patient_by_id(&self, id: i64) -> Result<Option<PatientWithVisits>, RegistryError> {
        let db = self.lock()?;
        Ok(db.get_patient_with_visits(id)?)
    }

    /// Apply a partial update. Returns `None` (and writes nothing) when the
    /// update carries no fields.
    pub fn update_patient(
        &self,
        id: i64,
        update: PatientUpdate,
    ) -> Result<Option<Patient>, RegistryError> {
        let db = self.lock()?;
        let updated = db.update_patient(id, &update)?;
        if updated.is_some() {
            debug!(id, "updated patient");
        }
        Ok(updated)
    }

    /// Delete a patient and all of its visits.
    pub fn delete_patient(&self, id: i64) -> Result<(), RegistryError> {
        let mut db = self.lock()?;
        db.delete_patient(id)?;
        info!(id, "deleted patient and visits");
        Ok(())
    }

    /// Toggle whether new visits may be recorded for a patient.
    pub fn set_visit_allowance(&self, id: i64, allowed: bool) -> Result<Patient, RegistryError> {
        let db = self.lock()?;
        let patient = db.set_visit_allowance(id, allowed)?;
        info!(id, allowed, "updated visit allowance");
        Ok(patient)
    }

    /// Case-insensitive substring search over name, email and phone.
    pub fn search_patients(&self, term: &str) -> Result<Vec<Patient>, RegistryError> {
        let db = self.lock()?;
        Ok(db.search_patients(term)?)
    }

    // =====================================================================
    // Visit Operations
    // =====================================================================

    /// Record a visit for a patient.
    ///
    /// The visit-allowance policy is enforced here, in the workflow, before
    /// the storage layer is touched.
    pub fn add_visit(&self, input: NewVisit) -> Result<Visit, RegistryError> {
        let missing = input.missing_fields();
        if !missing.is_empty() {
            return Err(validation_error(missing));
        }

        let mut db = self.lock()?;
        let patient = db
            .get_patient(input.patient_id)?
            .ok_or_else(|| RegistryError::NotFound(format!("patient {}", input.patient_id)))?;
        if !patient.allowed_to_visit {
            warn!(patient_id = patient.id, "visit blocked by allowance policy");
            return Err(RegistryError::Policy(format!(
                "patient {} is not allowed to visit",
                patient.id
            )));
        }

        let visit = db.insert_visit(&input)?;
        info!(visit_id = visit.id, patient_id = visit.patient_id, "recorded visit");
        Ok(visit)
    }

    /// Delete a visit.
    pub fn delete_visit(&self, id: i64) -> Result<(), RegistryError> {
        let mut db = self.lock()?;
        db.delete_visit(id)?;
        info!(id, "deleted visit");
        Ok(())
    }

    /// Visits for one patient, newest first.
    pub fn visits_for_patient(&self, patient_id: i64) -> Result<Vec<Visit>, RegistryError> {
        let db = self.lock()?;
        Ok(db.visits_for_patient(patient_id)?)
    }

    /// All visits joined with patient names, newest first.
    pub fn all_visits_with_patient_names(&self) -> Result<Vec<VisitWithPatient>, RegistryError> {
        let db = self.lock()?;
        Ok(db.list_visits_with_patient_names()?)
    }

    // =====================================================================
    // Raw Query Gateway
    // =====================================================================

    /// Run an ad hoc query through the read-only gate.
    pub fn execute_read_only_query(&self, text: &str) -> Result<QueryResult, RegistryError> {
        let db = self.lock()?;
        match db.execute_read_only(text) {
            Ok(result) => Ok(result),
            Err(e) => {
                if matches!(e, db::DbError::RejectedQuery(_)) {
                    warn!("raw query rejected: {e}");
                }
                Err(e.into())
            }
        }
    }
}

// =========================================================================
// Process-Wide Registry
// =========================================================================

static REGISTRY: OnceLock<PatientRegistry> = OnceLock::new();

/// Install the process-wide registry at startup.
///
/// Fails if a registry is already installed; there is no implicit
/// reinitialization.
pub fn init<P: AsRef<Path>>(path: P) -> Result<(), RegistryError> {
    let registry = PatientRegistry::open(path)?;
    REGISTRY
        .set(registry)
        .map_err(|_| RegistryError::Store("registry already initialized".into()))
}

/// The process-wide registry, if [`init`] has run.
pub fn global() -> Option<&'static PatientRegistry> {
    REGISTRY.get()
}
