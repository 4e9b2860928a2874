//! Encounter, chart note and procedure database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{ChartNote, Encounter, Procedure};

fn encounter_from_row(row: &Row<'_>) -> rusqlite::Result<Encounter> {
    Ok(Encounter {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        doctor_id: row.get(2)?,
        branch_id: row.get(3)?,
        occurred_at: row.get(4)?,
        reason: row.get(5)?,
        notes: row.get(6)?,
        created_at: row.get(7)?,
    })
}

const ENCOUNTER_COLUMNS: &str =
    "id, patient_id, doctor_id, branch_id, occurred_at, reason, notes, created_at";

const PROCEDURE_COLUMNS: &str =
    "id, encounter_id, patient_id, code, name, tooth_code, quantity, unit_price, total_amount, billed_invoice_id, created_at";

impl Database {
    /// Insert a new encounter.
    pub fn insert_encounter(&self, encounter: &Encounter) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO encounters (
                id, patient_id, doctor_id, branch_id,
                occurred_at, reason, notes, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                encounter.id,
                encounter.patient_id,
                encounter.doctor_id,
                encounter.branch_id,
                encounter.occurred_at,
                encounter.reason,
                encounter.notes,
                encounter.created_at,
            ],
        )?;
        Ok(())
    }

    /// Get an encounter by ID.
    pub fn get_encounter(&self, id: &str) -> DbResult<Option<Encounter>> {
        self.conn
            .query_row(
                &format!("SELECT {ENCOUNTER_COLUMNS} FROM encounters WHERE id = ?"),
                [id],
                encounter_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List a patient's encounters, most recent visit first.
    pub fn list_encounters_for_patient(&self, patient_id: &str) -> DbResult<Vec<Encounter>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENCOUNTER_COLUMNS} FROM encounters WHERE patient_id = ? ORDER BY occurred_at DESC"
        ))?;
        let rows = stmt.query_map([patient_id], encounter_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Insert a new chart note.
    pub fn insert_chart_note(&self, note: &ChartNote) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO chart_notes (id, encounter_id, patient_id, tooth_code, note, noted_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                note.id,
                note.encounter_id,
                note.patient_id,
                note.tooth_code,
                note.note,
                note.noted_at,
            ],
        )?;
        Ok(())
    }

    /// List an encounter's chart notes in the order they were taken.
    pub fn list_chart_notes_for_encounter(&self, encounter_id: &str) -> DbResult<Vec<ChartNote>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, encounter_id, patient_id, tooth_code, note, noted_at
            FROM chart_notes
            WHERE encounter_id = ?
            ORDER BY noted_at
            "#,
        )?;
        let rows = stmt.query_map([encounter_id], |row| {
            Ok(ChartNote {
                id: row.get(0)?,
                encounter_id: row.get(1)?,
                patient_id: row.get(2)?,
                tooth_code: row.get(3)?,
                note: row.get(4)?,
                noted_at: row.get(5)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Insert a new procedure.
    pub fn insert_procedure(&self, procedure: &Procedure) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO procedures (
                id, encounter_id, patient_id, code, name, tooth_code,
                quantity, unit_price, total_amount, billed_invoice_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                procedure.id,
                procedure.encounter_id,
                procedure.patient_id,
                procedure.code,
                procedure.name,
                procedure.tooth_code,
                procedure.quantity,
                procedure.unit_price.to_string(),
                procedure.total_amount.to_string(),
                procedure.billed_invoice_id,
                procedure.created_at,
            ],
        )?;
        Ok(())
    }

    /// Get a procedure by ID.
    pub fn get_procedure(&self, id: &str) -> DbResult<Option<Procedure>> {
        self.conn
            .query_row(
                &format!("SELECT {PROCEDURE_COLUMNS} FROM procedures WHERE id = ?"),
                [id],
                procedure_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List an encounter's procedures in recording order.
    pub fn list_procedures_for_encounter(&self, encounter_id: &str) -> DbResult<Vec<Procedure>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PROCEDURE_COLUMNS} FROM procedures WHERE encounter_id = ? ORDER BY created_at"
        ))?;
        let rows = stmt.query_map([encounter_id], procedure_row)?;

        let mut procedures = Vec::new();
        for row in rows {
            procedures.push(row?.try_into()?);
        }
        Ok(procedures)
    }

    /// Claim a procedure for an invoice. Succeeds only while the procedure
    /// is still unbilled, so a second claim reports `false`.
    pub fn mark_procedure_billed(&self, procedure_id: &str, invoice_id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE procedures SET billed_invoice_id = ?2 WHERE id = ?1 AND billed_invoice_id IS NULL",
            params![procedure_id, invoice_id],
        )?;
        Ok(rows_affected > 0)
    }
}

/// Intermediate row struct for database mapping.
struct ProcedureRow {
    id: String,
    encounter_id: String,
    patient_id: String,
    code: String,
    name: String,
    tooth_code: Option<String>,
    quantity: i64,
    unit_price: String,
    total_amount: String,
    billed_invoice_id: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
}

fn procedure_row(row: &Row<'_>) -> rusqlite::Result<ProcedureRow> {
    Ok(ProcedureRow {
        id: row.get(0)?,
        encounter_id: row.get(1)?,
        patient_id: row.get(2)?,
        code: row.get(3)?,
        name: row.get(4)?,
        tooth_code: row.get(5)?,
        quantity: row.get(6)?,
        unit_price: row.get(7)?,
        total_amount: row.get(8)?,
        billed_invoice_id: row.get(9)?,
        created_at: row.get(10)?,
    })
}

impl TryFrom<ProcedureRow> for Procedure {
    type Error = DbError;

    fn try_from(row: ProcedureRow) -> Result<Self, Self::Error> {
        Ok(Procedure {
            id: row.id,
            encounter_id: row.encounter_id,
            patient_id: row.patient_id,
            code: row.code,
            name: row.name,
            tooth_code: row.tooth_code,
            quantity: row.quantity,
            unit_price: row.unit_price.parse()?,
            total_amount: row.total_amount.parse()?,
            billed_invoice_id: row.billed_invoice_id,
            created_at: row.created_at,
        })
    }
}
