//! Patient database operations.

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{BloodGroup, Gender, NewPatient, Patient, PatientUpdate, PatientWithVisits};

/// Column list shared by every patient SELECT; order matches `PatientRow`.
const PATIENT_COLUMNS: &str = "id, first_name, last_name, date_of_birth, gender, email, \
     phone, address, blood_group, allergies, conditions, medications, \
     insurance_provider, insurance_number, allowed_to_visit, visit_count, created_at";

impl Database {
    /// Insert a new patient. Returns the stored record with its generated id.
    ///
    /// New patients always start with `allowed_to_visit = true` and
    /// `visit_count = 0`.
    pub fn insert_patient(&self, input: &NewPatient) -> DbResult<Patient> {
        let created_at = Self::now();
        self.conn.execute(
            r#"
            INSERT INTO patients (
                first_name, last_name, date_of_birth, gender, email, phone,
                address, blood_group, allergies, conditions, medications,
                insurance_provider, insurance_number, allowed_to_visit,
                visit_count, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, 1, 0, ?14)
            "#,
            params![
                input.first_name,
                input.last_name,
                input.date_of_birth,
                input.gender.as_str(),
                input.email,
                input.phone,
                input.address,
                input.blood_group.map(|bg| bg.as_str()),
                input.allergies,
                input.conditions,
                input.medications,
                input.insurance_provider,
                input.insurance_number,
                created_at,
            ],
        )?;
        let id = self.conn.last_insert_rowid();

        Ok(Patient {
            id,
            first_name: input.first_name.clone(),
            last_name: input.last_name.clone(),
            date_of_birth: input.date_of_birth.clone(),
            gender: input.gender,
            email: input.email.clone(),
            phone: input.phone.clone(),
            address: input.address.clone(),
            blood_group: input.blood_group,
            allergies: input.allergies.clone(),
            conditions: input.conditions.clone(),
            medications: input.medications.clone(),
            insurance_provider: input.insurance_provider.clone(),
            insurance_number: input.insurance_number.clone(),
            allowed_to_visit: true,
            visit_count: 0,
            created_at,
        })
    }

    /// Get a patient by id.
    pub fn get_patient(&self, id: i64) -> DbResult<Option<Patient>> {
        self.conn
            .query_row(
                &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?"),
                [id],
                map_patient_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Get a patient merged with its visit history (newest visit first).
    pub fn get_patient_with_visits(&self, id: i64) -> DbResult<Option<PatientWithVisits>> {
        let Some(patient) = self.get_patient(id)? else {
            return Ok(None);
        };
        let visits = self.visits_for_patient(id)?;
        Ok(Some(PatientWithVisits { patient, visits }))
    }

    /// List all patients, newest first.
    pub fn list_patients(&self) -> DbResult<Vec<Patient>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PATIENT_COLUMNS} FROM patients ORDER BY created_at DESC, id DESC"
        ))?;
        let rows = stmt.query_map([], map_patient_row)?;

        let mut patients = Vec::new();
        for row in rows {
            patients.push(row?.try_into()?);
        }
        Ok(patients)
    }

    /// Case-insensitive substring search over name, email and phone.
    ///
    /// An empty (or whitespace-only) term returns all patients.
    pub fn search_patients(&self, term: &str) -> DbResult<Vec<Patient>> {
        let term = term.trim();
        if term.is_empty() {
            return self.list_patients();
        }

        let pattern = format!("%{}%", term.to_lowercase());
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {PATIENT_COLUMNS} FROM patients
            WHERE lower(first_name) LIKE ?1
               OR lower(last_name) LIKE ?1
               OR lower(email) LIKE ?1
               OR lower(phone) LIKE ?1
            ORDER BY created_at DESC, id DESC
            "#
        ))?;
        let rows = stmt.query_map([pattern], map_patient_row)?;

        let mut patients = Vec::new();
        for row in rows {
            patients.push(row?.try_into()?);
        }
        Ok(patients)
    }

    /// Apply a partial update to a patient.
    ///
    /// Only fields present in the update are written, through an explicit
    /// field-to-column map; `id`, `created_at` and `visit_count` have no
    /// corresponding update field and stay untouched. Returns `None` without
    /// writing when the update carries no fields.
    pub fn update_patient(&self, id: i64, update: &PatientUpdate) -> DbResult<Option<Patient>> {
        if self.get_patient(id)?.is_none() {
            return Err(DbError::NotFound(format!("patient {id}")));
        }
        if update.is_empty() {
            return Ok(None);
        }

        let mut sets: Vec<&'static str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(v) = &update.first_name {
            sets.push("first_name = ?");
            values.push(Value::Text(v.clone()));
        }
        if let Some(v) = &update.last_name {
            sets.push("last_name = ?");
            values.push(Value::Text(v.clone()));
        }
        if let Some(v) = &update.date_of_birth {
            sets.push("date_of_birth = ?");
            values.push(Value::Text(v.clone()));
        }
        if let Some(v) = update.gender {
            sets.push("gender = ?");
            values.push(Value::Text(v.as_str().to_string()));
        }
        if let Some(v) = &update.email {
            sets.push("email = ?");
            values.push(Value::Text(v.clone()));
        }
        if let Some(v) = &update.phone {
            sets.push("phone = ?");
            values.push(Value::Text(v.clone()));
        }
        if let Some(v) = &update.address {
            sets.push("address = ?");
            values.push(Value::Text(v.clone()));
        }
        if let Some(v) = update.blood_group {
            sets.push("blood_group = ?");
            values.push(Value::Text(v.as_str().to_string()));
        }
        if let Some(v) = &update.allergies {
            sets.push("allergies = ?");
            values.push(Value::Text(v.clone()));
        }
        if let Some(v) = &update.conditions {
            sets.push("conditions = ?");
            values.push(Value::Text(v.clone()));
        }
        if let Some(v) = &update.medications {
            sets.push("medications = ?");
            values.push(Value::Text(v.clone()));
        }
        if let Some(v) = &update.insurance_provider {
            sets.push("insurance_provider = ?");
            values.push(Value::Text(v.clone()));
        }
        if let Some(v) = &update.insurance_number {
            sets.push("insurance_number = ?");
            values.push(Value::Text(v.clone()));
        }
        if let Some(v) = update.allowed_to_visit {
            sets.push("allowed_to_visit = ?");
            values.push(Value::Integer(v as i64));
        }

        values.push(Value::Integer(id));
        let sql = format!("UPDATE patients SET {} WHERE id = ?", sets.join(", "));
        self.conn.execute(&sql, params_from_iter(values))?;

        self.get_patient(id)?
            .map(Some)
            .ok_or_else(|| DbError::NotFound(format!("patient {id}")))
    }

    /// Delete a patient and all of its visits in one transaction.
    pub fn delete_patient(&mut self, id: i64) -> DbResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM visits WHERE patient_id = ?", [id])?;
        let deleted = tx.execute("DELETE FROM patients WHERE id = ?", [id])?;
        if deleted == 0 {
            return Err(DbError::NotFound(format!("patient {id}")));
        }
        tx.commit()?;
        Ok(())
    }

    /// Set whether new visits may be recorded for a patient.
    pub fn set_visit_allowance(&self, id: i64, allowed: bool) -> DbResult<Patient> {
        let updated = self.conn.execute(
            "UPDATE patients SET allowed_to_visit = ?1 WHERE id = ?2",
            params![allowed, id],
        )?;
        if updated == 0 {
            return Err(DbError::NotFound(format!("patient {id}")));
        }
        self.get_patient(id)?
            .ok_or_else(|| DbError::NotFound(format!("patient {id}")))
    }
}

/// Intermediate row struct for database mapping.
struct PatientRow {
    id: i64,
    first_name: String,
    last_name: String,
    date_of_birth: String,
    gender: String,
    email: String,
    phone: String,
    address: String,
    blood_group: Option<String>,
    allergies: Option<String>,
    conditions: Option<String>,
    medications: Option<String>,
    insurance_provider: Option<String>,
    insurance_number: Option<String>,
    allowed_to_visit: bool,
    visit_count: i64,
    created_at: String,
}

fn map_patient_row(row: &Row<'_>) -> rusqlite::Result<PatientRow> {
    Ok(PatientRow {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        date_of_birth: row.get(3)?,
        gender: row.get(4)?,
        email: row.get(5)?,
        phone: row.get(6)?,
        address: row.get(7)?,
        blood_group: row.get(8)?,
        allergies: row.get(9)?,
        conditions: row.get(10)?,
        medications: row.get(11)?,
        insurance_provider: row.get(12)?,
        insurance_number: row.get(13)?,
        allowed_to_visit: row.get(14)?,
        visit_count: row.get(15)?,
        created_at: row.get(16)?,
    })
}

impl TryFrom<PatientRow> for Patient {
    type Error = DbError;

    fn try_from(row: PatientRow) -> Result<Self, Self::Error> {
        let gender = Gender::parse(&row.gender)
            .ok_or_else(|| DbError::Constraint(format!("Unknown gender: {}", row.gender)))?;
        let blood_group = row
            .blood_group
            .map(|s| {
                BloodGroup::parse(&s)
                    .ok_or_else(|| DbError::Constraint(format!("Unknown blood group: {s}")))
            })
            .transpose()?;

        Ok(Patient {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            date_of_birth: row.date_of_birth,
            gender,
            email: row.email,
            phone: row.phone,
            address: row.address,
            blood_group,
            allergies: row.allergies,
            conditions: row.conditions,
            medications: row.medications,
            insurance_provider: row.insurance_provider,
            insurance_number: row.insurance_number,
            allowed_to_visit: row.allowed_to_visit,
            visit_count: row.visit_count,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn sample_input(email: &str) -> NewPatient {
        NewPatient {
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            date_of_birth: "1990-01-01".into(),
            gender: Gender::Female,
            email: email.into(),
            phone: "555-1111".into(),
            address: "1 Main St".into(),
            blood_group: Some(BloodGroup::OPos),
            allergies: None,
            conditions: None,
            medications: None,
            insurance_provider: None,
            insurance_number: None,
        }
    }

    #[test]
    fn test_insert_and_get() {
        let db = setup_db();

        let created = db.insert_patient(&sample_input("jane@x.com")).unwrap();
        assert!(created.allowed_to_visit);
        assert_eq!(created.visit_count, 0);

        let retrieved = db.get_patient(created.id).unwrap().unwrap();
        assert_eq!(retrieved, created);
    }

    #[test]
    fn test_get_missing_returns_none() {
        let db = setup_db();
        assert!(db.get_patient(999).unwrap().is_none());
    }

    #[test]
    fn test_list_newest_first() {
        let db = setup_db();

        let first = db.insert_patient(&sample_input("a@x.com")).unwrap();
        let second = db.insert_patient(&sample_input("b@x.com")).unwrap();

        let all = db.list_patients().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, second.id);
        assert_eq!(all[1].id, first.id);
    }

    #[test]
    fn test_partial_update() {
        let db = setup_db();
        let created = db.insert_patient(&sample_input("jane@x.com")).unwrap();

        let update = PatientUpdate {
            phone: Some("555-2222".into()),
            allergies: Some("penicillin".into()),
            ..Default::default()
        };
        let updated = db.update_patient(created.id, &update).unwrap().unwrap();

        assert_eq!(updated.phone, "555-2222");
        assert_eq!(updated.allergies, Some("penicillin".into()));
        // Everything else untouched
        assert_eq!(updated.first_name, created.first_name);
        assert_eq!(updated.email, created.email);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.visit_count, 0);
    }

    #[test]
    fn test_empty_update_is_noop() {
        let db = setup_db();
        let created = db.insert_patient(&sample_input("jane@x.com")).unwrap();

        let result = db
            .update_patient(created.id, &PatientUpdate::default())
            .unwrap();
        assert!(result.is_none());

        let stored = db.get_patient(created.id).unwrap().unwrap();
        assert_eq!(stored, created);
    }

    #[test]
    fn test_update_missing_patient() {
        let db = setup_db();
        let update = PatientUpdate {
            phone: Some("555-2222".into()),
            ..Default::default()
        };
        let result = db.update_patient(42, &update);
        assert!(matches!(result, Err(DbError::NotFound(_))));
    }

    #[test]
    fn test_search_case_insensitive_substring() {
        let db = setup_db();

        let mut input = sample_input("jane@x.com");
        db.insert_patient(&input).unwrap();

        input.first_name = "John".into();
        input.last_name = "Roe".into();
        input.email = "john@y.com".into();
        db.insert_patient(&input).unwrap();

        let by_name = db.search_patients("ANE").unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].first_name, "Jane");

        let by_email = db.search_patients("y.com").unwrap();
        assert_eq!(by_email.len(), 1);
        assert_eq!(by_email[0].first_name, "John");

        let by_phone = db.search_patients("555").unwrap();
        assert_eq!(by_phone.len(), 2);

        // Empty term returns everyone
        assert_eq!(db.search_patients("  ").unwrap().len(), 2);
    }

    #[test]
    fn test_set_visit_allowance() {
        let db = setup_db();
        let created = db.insert_patient(&sample_input("jane@x.com")).unwrap();

        let updated = db.set_visit_allowance(created.id, false).unwrap();
        assert!(!updated.allowed_to_visit);

        let result = db.set_visit_allowance(999, false);
        assert!(matches!(result, Err(DbError::NotFound(_))));
    }

    #[test]
    fn test_delete_patient_removes_visits() {
        let mut db = setup_db();
        let created = db.insert_patient(&sample_input("jane@x.com")).unwrap();

        let visit = crate::models::NewVisit {
            patient_id: created.id,
            visit_date: "2024-01-01T09:00:00+00:00".into(),
            doctor_name: "Dr. Smith".into(),
            reason: "checkup".into(),
            notes: None,
        };
        db.insert_visit(&visit).unwrap();

        db.delete_patient(created.id).unwrap();
        assert!(db.get_patient(created.id).unwrap().is_none());
        assert!(db.visits_for_patient(created.id).unwrap().is_empty());
    }

    #[test]
    fn test_delete_missing_patient() {
        let mut db = setup_db();
        let result = db.delete_patient(7);
        assert!(matches!(result, Err(DbError::NotFound(_))));
    }
}
