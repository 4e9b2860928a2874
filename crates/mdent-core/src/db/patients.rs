//! Patient and history book database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbResult};
use crate::models::{HistoryBook, Patient};

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get(0)?,
        branch_id: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        reg_no: row.get(4)?,
        phone: row.get(5)?,
        email: row.get(6)?,
        birth_date: row.get(7)?,
        gender: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

const PATIENT_COLUMNS: &str =
    "id, branch_id, first_name, last_name, reg_no, phone, email, birth_date, gender, created_at, updated_at";

fn patient_matches(patient: &Patient, needle: &str) -> bool {
    patient.first_name.to_lowercase().contains(needle)
        || patient.last_name.to_lowercase().contains(needle)
        || patient.reg_no.to_lowercase().contains(needle)
        || patient
            .email
            .as_deref()
            .map_or(false, |email| email.to_lowercase().contains(needle))
        || patient
            .phone
            .as_deref()
            .map_or(false, |phone| phone.to_lowercase().contains(needle))
}

impl Database {
    /// Insert a new patient.
    pub fn insert_patient(&self, patient: &Patient) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO patients (
                id, branch_id, first_name, last_name, reg_no,
                phone, email, birth_date, gender, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                patient.id,
                patient.branch_id,
                patient.first_name,
                patient.last_name,
                patient.reg_no,
                patient.phone,
                patient.email,
                patient.birth_date,
                patient.gender,
                patient.created_at,
                patient.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Update an existing patient row in full.
    pub fn update_patient(&self, patient: &Patient) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE patients SET
                branch_id = ?2,
                first_name = ?3,
                last_name = ?4,
                reg_no = ?5,
                phone = ?6,
                email = ?7,
                birth_date = ?8,
                gender = ?9,
                updated_at = ?10
            WHERE id = ?1
            "#,
            params![
                patient.id,
                patient.branch_id,
                patient.first_name,
                patient.last_name,
                patient.reg_no,
                patient.phone,
                patient.email,
                patient.birth_date,
                patient.gender,
                patient.updated_at,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a patient by ID.
    pub fn get_patient(&self, id: &str) -> DbResult<Option<Patient>> {
        self.conn
            .query_row(
                &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?"),
                [id],
                patient_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Get a patient by registration number.
    pub fn get_patient_by_reg_no(&self, reg_no: &str) -> DbResult<Option<Patient>> {
        self.conn
            .query_row(
                &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE reg_no = ?"),
                [reg_no],
                patient_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Search patients across names, reg_no, email (case-insensitive contains)
    /// and phone (substring). An empty query lists everyone. Most recently
    /// updated first, capped at `limit`.
    ///
    /// Case folding happens in Rust; SQLite's LIKE folds ASCII only and the
    /// patient roster is not ASCII. Query text matches literally, `%` and
    /// `_` carry no wildcard meaning.
    pub fn search_patients(&self, query: &str, limit: usize) -> DbResult<Vec<Patient>> {
        let needle = query.trim().to_lowercase();
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PATIENT_COLUMNS} FROM patients ORDER BY updated_at DESC"
        ))?;
        let rows = stmt.query_map([], patient_from_row)?;

        let mut matches = Vec::new();
        for row in rows {
            if matches.len() >= limit {
                break;
            }
            let patient = row?;
            if needle.is_empty() || patient_matches(&patient, &needle) {
                matches.push(patient);
            }
        }
        Ok(matches)
    }

    /// Delete a patient row.
    pub fn delete_patient(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM patients WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    /// Whether any appointment, encounter or invoice still references
    /// the patient.
    pub fn patient_has_dependents(&self, id: &str) -> DbResult<bool> {
        let exists: bool = self.conn.query_row(
            r#"
            SELECT EXISTS (SELECT 1 FROM appointments WHERE patient_id = ?1)
                OR EXISTS (SELECT 1 FROM encounters   WHERE patient_id = ?1)
                OR EXISTS (SELECT 1 FROM invoices     WHERE patient_id = ?1)
            "#,
            [id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Insert a new history book.
    pub fn insert_history_book(&self, book: &HistoryBook) -> DbResult<()> {
        self.conn.execute(
            "INSERT INTO history_books (id, patient_id, book_number, opened_at) VALUES (?1, ?2, ?3, ?4)",
            params![book.id, book.patient_id, book.book_number, book.opened_at],
        )?;
        Ok(())
    }

    /// Get the history book of one patient, if opened.
    pub fn get_history_book_for_patient(&self, patient_id: &str) -> DbResult<Option<HistoryBook>> {
        self.conn
            .query_row(
                "SELECT id, patient_id, book_number, opened_at FROM history_books WHERE patient_id = ?",
                [patient_id],
                |row| {
                    Ok(HistoryBook {
                        id: row.get(0)?,
                        patient_id: row.get(1)?,
                        book_number: row.get(2)?,
                        opened_at: row.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    /// Whether a history book number is already taken.
    pub fn history_book_number_exists(&self, book_number: &str) -> DbResult<bool> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM history_books WHERE book_number = ?)",
            [book_number],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Delete a patient's history book, if any.
    pub fn delete_history_book_for_patient(&self, patient_id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM history_books WHERE patient_id = ?", [patient_id])?;
        Ok(rows_affected > 0)
    }
}
