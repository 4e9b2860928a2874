//! Clinical visit records: encounters, chart notes and performed procedures.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// A clinical visit by a patient with one doctor at one branch.
///
/// Encounters are append-only. Once created, clinical content grows through
/// child chart notes and procedures; the encounter row itself is never
/// rewritten.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Encounter {
    pub id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub branch_id: String,
    pub occurred_at: DateTime<Utc>,
    pub reason: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Encounter {
    pub fn new(spec: CreateEncounter, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            patient_id: spec.patient_id,
            doctor_id: spec.doctor_id,
            branch_id: spec.branch_id,
            occurred_at: spec.occurred_at.unwrap_or(now),
            reason: spec.reason,
            notes: spec.notes,
            created_at: now,
        }
    }
}

/// A free-text observation within an encounter, optionally about one tooth.
///
/// `patient_id` is copied from the parent encounter so per-patient chart
/// queries need no join.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartNote {
    pub id: String,
    pub encounter_id: String,
    pub patient_id: String,
    /// FDI two-digit tooth designation, e.g. "26"; absent for
    /// mouth-wide observations
    pub tooth_code: Option<String>,
    pub note: String,
    pub noted_at: DateTime<Utc>,
}

impl ChartNote {
    pub fn new(
        encounter_id: String,
        patient_id: String,
        spec: CreateChartNote,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            encounter_id,
            patient_id,
            tooth_code: spec.tooth_code,
            note: spec.note,
            noted_at: now,
        }
    }
}

/// A billable act performed during an encounter.
///
/// `total_amount` is always `unit_price * quantity`, computed when the
/// procedure is recorded and never trusted from the caller. Once the
/// procedure lands on an invoice, `billed_invoice_id` is set and the row
/// becomes immutable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Procedure {
    pub id: String,
    pub encounter_id: String,
    pub patient_id: String,
    /// Billing catalog code, e.g. "FL-26"
    pub code: String,
    pub name: String,
    pub tooth_code: Option<String>,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub total_amount: Decimal,
    /// Set once, when the procedure lands on an invoice
    pub billed_invoice_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Procedure {
    /// Fails with `InvalidAmount` when `unit_price * quantity` leaves the
    /// representable decimal range.
    pub fn new(
        encounter_id: String,
        patient_id: String,
        spec: CreateProcedure,
        now: DateTime<Utc>,
    ) -> CoreResult<Self> {
        let total_amount = spec
            .unit_price
            .checked_mul(Decimal::from(spec.quantity))
            .ok_or_else(|| {
                CoreError::InvalidAmount(format!(
                    "procedure total out of range: {} x {}",
                    spec.unit_price, spec.quantity
                ))
            })?;
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            encounter_id,
            patient_id,
            code: spec.code,
            name: spec.name,
            tooth_code: spec.tooth_code,
            quantity: spec.quantity,
            unit_price: spec.unit_price,
            total_amount,
            billed_invoice_id: None,
            created_at: now,
        })
    }

    pub fn is_billed(&self) -> bool {
        self.billed_invoice_id.is_some()
    }
}

/// Input for opening an encounter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEncounter {
    pub patient_id: String,
    pub doctor_id: String,
    pub branch_id: String,
    pub reason: String,
    pub notes: Option<String>,
    /// Defaults to the current instant when omitted
    pub occurred_at: Option<DateTime<Utc>>,
}

/// Input for adding a chart note to an encounter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateChartNote {
    pub tooth_code: Option<String>,
    pub note: String,
}

/// Input for recording a performed procedure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProcedure {
    pub code: String,
    pub name: String,
    pub tooth_code: Option<String>,
    pub quantity: i64,
    pub unit_price: Decimal,
}
