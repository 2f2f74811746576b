//! SQLite schema definition.

/// Complete database schema for the patient registry.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    date_of_birth TEXT NOT NULL,
    gender TEXT NOT NULL,                        -- male, female, other
    email TEXT NOT NULL UNIQUE,
    phone TEXT NOT NULL,
    address TEXT NOT NULL,
    blood_group TEXT,                            -- A+ .. O-, NULL if unknown
    allergies TEXT,
    conditions TEXT,
    medications TEXT,
    insurance_provider TEXT,
    insurance_number TEXT,
    allowed_to_visit INTEGER NOT NULL DEFAULT 1,
    visit_count INTEGER NOT NULL DEFAULT 0,      -- maintained by visit ops
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_patients_created_at ON patients(created_at);
CREATE INDEX IF NOT EXISTS idx_patients_last_name ON patients(last_name);

-- ============================================================================
-- Visits (immutable after creation)
-- ============================================================================

CREATE TABLE IF NOT EXISTS visits (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    patient_id INTEGER NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
    visit_date TEXT NOT NULL,
    doctor_name TEXT NOT NULL,
    reason TEXT NOT NULL,
    notes TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_visits_patient ON visits(patient_id);
CREATE INDEX IF NOT EXISTS idx_visits_date ON visits(visit_date);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_valid() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.execute_batch(SCHEMA);
        assert!(result.is_ok(), "Schema should be valid SQL: {:?}", result);
    }

    #[test]
    fn test_visit_requires_existing_patient() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        let result = conn.execute(
            "INSERT INTO visits (patient_id, visit_date, doctor_name, reason) \
             VALUES (999, '2024-01-01', 'Dr. Smith', 'checkup')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_cascade_delete() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        conn.execute(
            "INSERT INTO patients (first_name, last_name, date_of_birth, gender, \
             email, phone, address) VALUES ('Jane', 'Doe', '1990-01-01', 'female', \
             'jane@x.com', '555-1111', '1 Main St')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO visits (patient_id, visit_date, doctor_name, reason) \
             VALUES (1, '2024-01-01', 'Dr. Smith', 'checkup')",
            [],
        )
        .unwrap();

        conn.execute("DELETE FROM patients WHERE id = 1", []).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM visits", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_email_unique() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        let insert = "INSERT INTO patients (first_name, last_name, date_of_birth, gender, \
                      email, phone, address) VALUES ('Jane', 'Doe', '1990-01-01', 'female', \
                      'jane@x.com', '555-1111', '1 Main St')";
        conn.execute(insert, []).unwrap();
        assert!(conn.execute(insert, []).is_err());
    }
}
