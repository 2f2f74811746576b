//! Visit database operations.
//!
//! The two compound operations here keep the patients' `visit_count` column
//! in lockstep with the visit rows: insert + increment and delete + decrement
//! each run inside a single transaction, so a reader never observes a visit
//! row without its count update.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{NewVisit, Visit, VisitWithPatient};

const VISIT_COLUMNS: &str = "id, patient_id, visit_date, doctor_name, reason, notes, created_at";

impl Database {
    /// Insert a visit and increment the parent patient's visit count,
    /// atomically.
    pub fn insert_visit(&mut self, input: &NewVisit) -> DbResult<Visit> {
        let created_at = Self::now();
        let tx = self.conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO visits (patient_id, visit_date, doctor_name, reason, notes, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                input.patient_id,
                input.visit_date,
                input.doctor_name,
                input.reason,
                input.notes,
                created_at,
            ],
        )?;
        let id = tx.last_insert_rowid();

        let updated = tx.execute(
            "UPDATE patients SET visit_count = visit_count + 1 WHERE id = ?",
            [input.patient_id],
        )?;
        if updated == 0 {
            // Transaction dropped without commit, insert rolls back
            return Err(DbError::NotFound(format!("patient {}", input.patient_id)));
        }

        tx.commit()?;

        Ok(Visit {
            id,
            patient_id: input.patient_id,
            visit_date: input.visit_date.clone(),
            doctor_name: input.doctor_name.clone(),
            reason: input.reason.clone(),
            notes: input.notes.clone(),
            created_at,
        })
    }

    /// Delete a visit and decrement the parent patient's visit count,
    /// atomically.
    pub fn delete_visit(&mut self, id: i64) -> DbResult<()> {
        let tx = self.conn.transaction()?;

        let patient_id: Option<i64> = tx
            .query_row("SELECT patient_id FROM visits WHERE id = ?", [id], |row| {
                row.get(0)
            })
            .optional()?;
        let Some(patient_id) = patient_id else {
            return Err(DbError::NotFound(format!("visit {id}")));
        };

        tx.execute("DELETE FROM visits WHERE id = ?", [id])?;
        tx.execute(
            "UPDATE patients SET visit_count = visit_count - 1 WHERE id = ?",
            [patient_id],
        )?;

        tx.commit()?;
        Ok(())
    }

    /// Visits for one patient, newest visit first.
    pub fn visits_for_patient(&self, patient_id: i64) -> DbResult<Vec<Visit>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {VISIT_COLUMNS} FROM visits WHERE patient_id = ? \
             ORDER BY visit_date DESC, id DESC"
        ))?;
        let rows = stmt.query_map([patient_id], map_visit_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// All visits joined with their patient's name, newest visit first.
    pub fn list_visits_with_patient_names(&self) -> DbResult<Vec<VisitWithPatient>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT v.id, v.patient_id, v.visit_date, v.doctor_name, v.reason,
                   v.notes, v.created_at, p.first_name, p.last_name
            FROM visits v
            JOIN patients p ON v.patient_id = p.id
            ORDER BY v.visit_date DESC, v.id DESC
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(VisitWithPatient {
                visit: map_visit_row(row)?,
                first_name: row.get(7)?,
                last_name: row.get(8)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

fn map_visit_row(row: &Row<'_>) -> rusqlite::Result<Visit> {
    Ok(Visit {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        visit_date: row.get(2)?,
        doctor_name: row.get(3)?,
        reason: row.get(4)?,
        notes: row.get(5)?,
        created_at: row.get(6)?,
    })
}
