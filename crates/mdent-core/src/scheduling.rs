//! Scheduling ledger: appointment booking and the one-way status move.

use chrono::{DateTime, Utc};

use crate::db::Database;
use crate::error::{CoreError, CoreResult};
use crate::models::{Appointment, AppointmentStatus, CreateAppointment};

/// Scheduling ledger over the shared store.
pub struct Scheduling<'a> {
    db: &'a Database,
}

impl<'a> Scheduling<'a> {
    /// Create a new scheduling view.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Book an appointment.
    ///
    /// The doctor and the room must belong to the appointment's branch; the
    /// patient may visit any branch, not only their home one. Overlapping
    /// bookings are not checked.
    pub fn create_appointment(
        &self,
        spec: CreateAppointment,
        now: DateTime<Utc>,
    ) -> CoreResult<Appointment> {
        if spec.starts_at >= spec.ends_at {
            return Err(CoreError::InvalidReference(format!(
                "appointment must start before it ends ({} >= {})",
                spec.starts_at, spec.ends_at
            )));
        }
        if self.db.get_patient(&spec.patient_id)?.is_none() {
            return Err(CoreError::InvalidReference(format!(
                "patient {} not found",
                spec.patient_id
            )));
        }
        if self.db.get_branch(&spec.branch_id)?.is_none() {
            return Err(CoreError::InvalidReference(format!(
                "branch {} not found",
                spec.branch_id
            )));
        }
        let doctor = self.db.get_doctor(&spec.doctor_id)?.ok_or_else(|| {
            CoreError::InvalidReference(format!("doctor {} not found", spec.doctor_id))
        })?;
        if doctor.branch_id != spec.branch_id {
            return Err(CoreError::InvalidReference(format!(
                "doctor {} does not work at branch {}",
                spec.doctor_id, spec.branch_id
            )));
        }
        let room = self.db.get_room(&spec.room_id)?.ok_or_else(|| {
            CoreError::InvalidReference(format!("room {} not found", spec.room_id))
        })?;
        if room.branch_id != spec.branch_id {
            return Err(CoreError::InvalidReference(format!(
                "room {} is not at branch {}",
                spec.room_id, spec.branch_id
            )));
        }

        let appointment = Appointment::new(spec, now);
        self.db.insert_appointment(&appointment)?;
        Ok(appointment)
    }

    /// Move a SCHEDULED appointment to a terminal status. Each appointment
    /// makes this move exactly once; terminal statuses never change again.
    pub fn transition_appointment(
        &self,
        appointment_id: &str,
        target: AppointmentStatus,
        now: DateTime<Utc>,
    ) -> CoreResult<Appointment> {
        let mut appointment = self.db.get_appointment(appointment_id)?.ok_or_else(|| {
            CoreError::InvalidReference(format!("appointment {} not found", appointment_id))
        })?;

        if !target.is_terminal() {
            return Err(CoreError::InvalidTransition(format!(
                "appointment cannot move back to {}",
                target.as_str()
            )));
        }
        if appointment.status.is_terminal() {
            return Err(CoreError::InvalidTransition(format!(
                "appointment {} is already {}",
                appointment_id,
                appointment.status.as_str()
            )));
        }

        self.db
            .update_appointment_status(appointment_id, target, now)?;
        appointment.status = target;
        appointment.updated_at = now;
        Ok(appointment)
    }

    pub fn get_appointment(&self, id: &str) -> CoreResult<Option<Appointment>> {
        Ok(self.db.get_appointment(id)?)
    }

    /// All appointments of one patient, latest start first.
    pub fn list_for_patient(&self, patient_id: &str) -> CoreResult<Vec<Appointment>> {
        Ok(self.db.list_appointments_for_patient(patient_id)?)
    }
}
