//! Appointment model and its status lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Appointment lifecycle status. An appointment starts SCHEDULED and moves
/// to exactly one terminal status; terminal statuses never revert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "SCHEDULED",
            AppointmentStatus::Completed => "COMPLETED",
            AppointmentStatus::Cancelled => "CANCELLED",
            AppointmentStatus::NoShow => "NO_SHOW",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SCHEDULED" => Some(AppointmentStatus::Scheduled),
            "COMPLETED" => Some(AppointmentStatus::Completed),
            "CANCELLED" => Some(AppointmentStatus::Cancelled),
            "NO_SHOW" => Some(AppointmentStatus::NoShow),
            _ => None,
        }
    }

    /// Everything except SCHEDULED is terminal.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AppointmentStatus::Scheduled)
    }
}

/// A time-boxed reservation of a doctor, a room and a patient at a branch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub branch_id: String,
    pub room_id: String,
    /// Start instant, strictly before `ends_at`
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Build a new SCHEDULED appointment from a creation request.
    pub fn new(spec: CreateAppointment, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            patient_id: spec.patient_id,
            doctor_id: spec.doctor_id,
            branch_id: spec.branch_id,
            room_id: spec.room_id,
            starts_at: spec.starts_at,
            ends_at: spec.ends_at,
            status: AppointmentStatus::Scheduled,
            notes: spec.notes,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Input for creating an appointment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointment {
    pub patient_id: String,
    pub doctor_id: String,
    pub branch_id: String,
    pub room_id: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub notes: Option<String>,
}
