//! Clinical record: encounters with their chart notes and procedures.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::db::Database;
use crate::error::{CoreError, CoreResult};
use crate::models::{
    ChartNote, CreateChartNote, CreateEncounter, CreateProcedure, Encounter, Procedure,
};

/// Clinical record over the shared store.
pub struct Clinical<'a> {
    db: &'a Database,
}

impl<'a> Clinical<'a> {
    /// Create a new clinical record view.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Open an encounter for a visit. The row is immutable afterward;
    /// clinical content accrues as appended notes and procedures.
    pub fn create_encounter(
        &self,
        spec: CreateEncounter,
        now: DateTime<Utc>,
    ) -> CoreResult<Encounter> {
        if self.db.get_patient(&spec.patient_id)?.is_none() {
            return Err(CoreError::InvalidReference(format!(
                "patient {} not found",
                spec.patient_id
            )));
        }
        if self.db.get_doctor(&spec.doctor_id)?.is_none() {
            return Err(CoreError::InvalidReference(format!(
                "doctor {} not found",
                spec.doctor_id
            )));
        }
        if self.db.get_branch(&spec.branch_id)?.is_none() {
            return Err(CoreError::InvalidReference(format!(
                "branch {} not found",
                spec.branch_id
            )));
        }
        let encounter = Encounter::new(spec, now);
        self.db.insert_encounter(&encounter)?;
        Ok(encounter)
    }

    /// Append a chart note to an encounter. The patient id on the note is
    /// copied from the stored encounter, never taken from the caller.
    pub fn add_chart_note(
        &self,
        encounter_id: &str,
        spec: CreateChartNote,
        now: DateTime<Utc>,
    ) -> CoreResult<ChartNote> {
        let encounter = self.require_encounter(encounter_id)?;
        let note = ChartNote::new(encounter.id, encounter.patient_id, spec, now);
        self.db.insert_chart_note(&note)?;
        Ok(note)
    }

    /// Record a performed procedure. The total is computed here as
    /// `unit_price * quantity`; the request shape carries no total at all.
    pub fn add_procedure(
        &self,
        encounter_id: &str,
        spec: CreateProcedure,
        now: DateTime<Utc>,
    ) -> CoreResult<Procedure> {
        if spec.quantity <= 0 {
            return Err(CoreError::InvalidQuantity(format!(
                "quantity must be positive, got {}",
                spec.quantity
            )));
        }
        if spec.unit_price < Decimal::ZERO {
            return Err(CoreError::InvalidQuantity(format!(
                "unit price must not be negative, got {}",
                spec.unit_price
            )));
        }
        let encounter = self.require_encounter(encounter_id)?;
        let procedure = Procedure::new(encounter.id, encounter.patient_id, spec, now)?;
        self.db.insert_procedure(&procedure)?;
        Ok(procedure)
    }

    pub fn get_encounter(&self, id: &str) -> CoreResult<Option<Encounter>> {
        Ok(self.db.get_encounter(id)?)
    }

    /// All encounters of one patient, latest first.
    pub fn list_for_patient(&self, patient_id: &str) -> CoreResult<Vec<Encounter>> {
        Ok(self.db.list_encounters_for_patient(patient_id)?)
    }

    pub fn list_chart_notes(&self, encounter_id: &str) -> CoreResult<Vec<ChartNote>> {
        Ok(self.db.list_chart_notes_for_encounter(encounter_id)?)
    }

    pub fn list_procedures(&self, encounter_id: &str) -> CoreResult<Vec<Procedure>> {
        Ok(self.db.list_procedures_for_encounter(encounter_id)?)
    }

    fn require_encounter(&self, id: &str) -> CoreResult<Encounter> {
        self.db
            .get_encounter(id)?
            .ok_or_else(|| CoreError::InvalidReference(format!("encounter {} not found", id)))
    }
}
