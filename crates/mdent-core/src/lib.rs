//! mDent Core Library
//!
//! Clinical-billing transaction model for a multi-branch dental clinic.
//!
//! # Architecture
//!
//! ```text
//!      Boundary layer (HTTP, credential checks, logging)
//!                 │
//!                 │ verified Identity + request structs
//!                 ▼
//!  ┌──────────────────────────────────────────────┐
//!  │                  MdentCore                   │
//!  │   expiry + role gate, clock, guarded store   │
//!  └──────┬──────────┬───────────┬──────────┬─────┘
//!         ▼          ▼           ▼          ▼
//!     Registry   Scheduling   Clinical   Billing
//!     branches   appointments encounters invoices
//!     patients                chart notes payments
//!     doctors                 procedures
//!         │          │           │          │
//!         └──────────┴─────┬─────┴──────────┘
//!                          ▼
//!              SQLite store (single writer,
//!              one transaction per use case)
//! ```
//!
//! # Core principle
//!
//! **Every consistency rule lives here.** The boundary layer shapes and
//! authenticates requests; the core re-checks every invariant against the
//! store before anything commits, and multi-row writes are atomic.
//!
//! # Modules
//!
//! - [`models`]: domain types (Branch, Patient, Encounter, Invoice, ...)
//! - [`db`]: SQLite store layer and schema
//! - [`registry`], [`scheduling`], [`clinical`], [`billing`]: the four
//!   domain components, each borrowing the shared store
//! - [`access`]: verified caller identity and role checks
//! - [`clock`]: injectable time source
//! - [`error`]: error kinds surfaced to the boundary layer

pub mod access;
pub mod billing;
pub mod clinical;
pub mod clock;
pub mod db;
pub mod error;
pub mod models;
pub mod registry;
pub mod scheduling;

// Re-export commonly used types
pub use access::{Identity, Role};
pub use billing::Billing;
pub use clinical::Clinical;
pub use clock::{Clock, FixedClock, SystemClock};
pub use db::Database;
pub use error::{CoreError, CoreResult};
pub use models::{
    Appointment, AppointmentStatus, Branch, ChartNote, CreateAppointment, CreateBranch,
    CreateChartNote, CreateDoctor, CreateEncounter, CreateInvoice, CreatePatient, CreateProcedure,
    CreateRoom, Doctor, Encounter, HistoryBook, Invoice, InvoiceDetail, InvoiceItem,
    InvoiceItemSpec, InvoiceStatus, Patient, Payment, PaymentMethod, PaymentSpec, Procedure, Room,
    UpdateBranch, UpdatePatient,
};
pub use registry::Registry;
pub use scheduling::Scheduling;

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

impl<T> From<std::sync::PoisonError<T>> for CoreError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        CoreError::StoreUnavailable(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe clinic core: the guarded store, the clock and the gate.
///
/// Every operation locks the store for its full duration, so mutations are
/// serialized and cross-row invariants (the payment cap in particular)
/// cannot be raced.
pub struct MdentCore {
    db: Arc<Mutex<Database>>,
    clock: Box<dyn Clock + Send + Sync>,
}

impl MdentCore {
    /// Open or create the store at the given path, using the system clock.
    pub fn open<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        Ok(Self::with_clock(Database::open(path)?, SystemClock))
    }

    /// In-memory store, for tests.
    pub fn open_in_memory() -> CoreResult<Self> {
        Ok(Self::with_clock(Database::open_in_memory()?, SystemClock))
    }

    /// Wrap an already opened store, stamping records from `clock`.
    pub fn with_clock<C>(db: Database, clock: C) -> Self
    where
        C: Clock + Send + Sync + 'static,
    {
        Self {
            db: Arc::new(Mutex::new(db)),
            clock: Box::new(clock),
        }
    }

    /// Gate prologue for mutating operations: reads the clock and rejects
    /// expired identities. Role checks are added per operation.
    fn authorize(&self, identity: &Identity) -> CoreResult<DateTime<Utc>> {
        let now = self.clock.now();
        access::require_active(identity, now)?;
        Ok(now)
    }

    // =========================================================================
    // Identity Registry
    // =========================================================================

    /// Idempotent branch registration keyed by code; never overwrites.
    pub fn register_branch(&self, identity: &Identity, spec: CreateBranch) -> CoreResult<Branch> {
        let now = self.authorize(identity)?;
        let db = self.db.lock()?;
        Registry::new(&db).register_branch(spec, now)
    }

    /// Strict branch creation; a known code is a `DuplicateKey` error.
    pub fn create_branch(&self, identity: &Identity, spec: CreateBranch) -> CoreResult<Branch> {
        let now = self.authorize(identity)?;
        let db = self.db.lock()?;
        Registry::new(&db).create_branch(spec, now)
    }

    /// Partial branch edit. Admin only.
    pub fn update_branch(
        &self,
        identity: &Identity,
        branch_id: &str,
        changes: UpdateBranch,
    ) -> CoreResult<Branch> {
        let now = self.authorize(identity)?;
        access::require_role(identity, &[Role::Admin])?;
        let db = self.db.lock()?;
        Registry::new(&db).update_branch(branch_id, changes, now)
    }

    pub fn get_branch(&self, branch_id: &str) -> CoreResult<Option<Branch>> {
        let db = self.db.lock()?;
        Registry::new(&db).get_branch(branch_id)
    }

    pub fn list_branches(&self) -> CoreResult<Vec<Branch>> {
        let db = self.db.lock()?;
        Registry::new(&db).list_branches()
    }

    /// Create a treatment room under an existing branch.
    pub fn create_room(&self, identity: &Identity, spec: CreateRoom) -> CoreResult<Room> {
        let now = self.authorize(identity)?;
        let db = self.db.lock()?;
        Registry::new(&db).create_room(spec, now)
    }

    pub fn list_rooms(&self, branch_id: &str) -> CoreResult<Vec<Room>> {
        let db = self.db.lock()?;
        Registry::new(&db).list_rooms(branch_id)
    }

    /// Create a doctor under an existing branch.
    pub fn create_doctor(&self, identity: &Identity, spec: CreateDoctor) -> CoreResult<Doctor> {
        let now = self.authorize(identity)?;
        let db = self.db.lock()?;
        Registry::new(&db).create_doctor(spec, now)
    }

    pub fn list_doctors(&self, branch_id: &str) -> CoreResult<Vec<Doctor>> {
        let db = self.db.lock()?;
        Registry::new(&db).list_doctors(branch_id)
    }

    /// Register a patient; the registration number must be new.
    pub fn create_patient(&self, identity: &Identity, spec: CreatePatient) -> CoreResult<Patient> {
        let now = self.authorize(identity)?;
        let db = self.db.lock()?;
        Registry::new(&db).create_patient(spec, now)
    }

    pub fn get_patient(&self, patient_id: &str) -> CoreResult<Option<Patient>> {
        let db = self.db.lock()?;
        Registry::new(&db).get_patient(patient_id)
    }

    /// Free-text patient search; an empty query lists the most recently
    /// updated patients.
    pub fn search_patients(&self, query: &str) -> CoreResult<Vec<Patient>> {
        let db = self.db.lock()?;
        Registry::new(&db).search_patients(query)
    }

    /// Partial patient update; omitted fields stay as stored.
    pub fn update_patient(
        &self,
        identity: &Identity,
        patient_id: &str,
        changes: UpdatePatient,
    ) -> CoreResult<Patient> {
        let now = self.authorize(identity)?;
        let db = self.db.lock()?;
        Registry::new(&db).update_patient(patient_id, changes, now)
    }

    /// Delete a patient and their history book. Admin only; refused while
    /// appointments, encounters or invoices still reference the patient.
    pub fn delete_patient(&self, identity: &Identity, patient_id: &str) -> CoreResult<()> {
        self.authorize(identity)?;
        access::require_role(identity, &[Role::Admin])?;
        let db = self.db.lock()?;
        Registry::new(&db).delete_patient(patient_id)
    }

    /// Open the patient's unique history book.
    pub fn open_history_book(
        &self,
        identity: &Identity,
        patient_id: &str,
        book_number: &str,
    ) -> CoreResult<HistoryBook> {
        let now = self.authorize(identity)?;
        let db = self.db.lock()?;
        Registry::new(&db).open_history_book(patient_id, book_number, now)
    }

    pub fn get_history_book(&self, patient_id: &str) -> CoreResult<Option<HistoryBook>> {
        let db = self.db.lock()?;
        Registry::new(&db).get_history_book(patient_id)
    }

    // =========================================================================
    // Scheduling Ledger
    // =========================================================================

    /// Book an appointment; doctor and room must belong to its branch.
    pub fn create_appointment(
        &self,
        identity: &Identity,
        spec: CreateAppointment,
    ) -> CoreResult<Appointment> {
        let now = self.authorize(identity)?;
        let db = self.db.lock()?;
        Scheduling::new(&db).create_appointment(spec, now)
    }

    /// Move a SCHEDULED appointment to a terminal status, once.
    pub fn transition_appointment(
        &self,
        identity: &Identity,
        appointment_id: &str,
        target: AppointmentStatus,
    ) -> CoreResult<Appointment> {
        let now = self.authorize(identity)?;
        let db = self.db.lock()?;
        Scheduling::new(&db).transition_appointment(appointment_id, target, now)
    }

    pub fn get_appointment(&self, appointment_id: &str) -> CoreResult<Option<Appointment>> {
        let db = self.db.lock()?;
        Scheduling::new(&db).get_appointment(appointment_id)
    }

    pub fn list_appointments(&self, patient_id: &str) -> CoreResult<Vec<Appointment>> {
        let db = self.db.lock()?;
        Scheduling::new(&db).list_for_patient(patient_id)
    }

    // =========================================================================
    // Clinical Record
    // =========================================================================

    /// Open an encounter; immutable afterward apart from appended children.
    pub fn create_encounter(
        &self,
        identity: &Identity,
        spec: CreateEncounter,
    ) -> CoreResult<Encounter> {
        let now = self.authorize(identity)?;
        let db = self.db.lock()?;
        Clinical::new(&db).create_encounter(spec, now)
    }

    /// Append a chart note to an encounter.
    pub fn add_chart_note(
        &self,
        identity: &Identity,
        encounter_id: &str,
        spec: CreateChartNote,
    ) -> CoreResult<ChartNote> {
        let now = self.authorize(identity)?;
        let db = self.db.lock()?;
        Clinical::new(&db).add_chart_note(encounter_id, spec, now)
    }

    /// Record a performed procedure; the total is computed server-side.
    pub fn add_procedure(
        &self,
        identity: &Identity,
        encounter_id: &str,
        spec: CreateProcedure,
    ) -> CoreResult<Procedure> {
        let now = self.authorize(identity)?;
        let db = self.db.lock()?;
        Clinical::new(&db).add_procedure(encounter_id, spec, now)
    }

    pub fn get_encounter(&self, encounter_id: &str) -> CoreResult<Option<Encounter>> {
        let db = self.db.lock()?;
        Clinical::new(&db).get_encounter(encounter_id)
    }

    pub fn list_encounters(&self, patient_id: &str) -> CoreResult<Vec<Encounter>> {
        let db = self.db.lock()?;
        Clinical::new(&db).list_for_patient(patient_id)
    }

    pub fn list_chart_notes(&self, encounter_id: &str) -> CoreResult<Vec<ChartNote>> {
        let db = self.db.lock()?;
        Clinical::new(&db).list_chart_notes(encounter_id)
    }

    pub fn list_procedures(&self, encounter_id: &str) -> CoreResult<Vec<Procedure>> {
        let db = self.db.lock()?;
        Clinical::new(&db).list_procedures(encounter_id)
    }

    // =========================================================================
    // Billing Ledger
    // =========================================================================

    /// Create an invoice with its lines and any desk payments, atomically.
    pub fn create_invoice(
        &self,
        identity: &Identity,
        spec: CreateInvoice,
    ) -> CoreResult<InvoiceDetail> {
        let now = self.authorize(identity)?;
        let db = self.db.lock()?;
        Billing::new(&db).create_invoice(spec, now)
    }

    /// Record an externally captured payment and settle the invoice status.
    pub fn record_payment(
        &self,
        identity: &Identity,
        invoice_id: &str,
        spec: PaymentSpec,
    ) -> CoreResult<InvoiceDetail> {
        let now = self.authorize(identity)?;
        let db = self.db.lock()?;
        Billing::new(&db).record_payment(invoice_id, spec, now)
    }

    /// Void an invoice. Admin or accountant; paid invoices never move.
    pub fn void_invoice(&self, identity: &Identity, invoice_id: &str) -> CoreResult<Invoice> {
        let now = self.authorize(identity)?;
        access::require_role(identity, &[Role::Admin, Role::Accountant])?;
        let db = self.db.lock()?;
        Billing::new(&db).void_invoice(invoice_id, now)
    }

    pub fn get_invoice(&self, invoice_id: &str) -> CoreResult<Option<InvoiceDetail>> {
        let db = self.db.lock()?;
        Billing::new(&db).get_invoice(invoice_id)
    }

    pub fn list_invoices(&self, patient_id: &str) -> CoreResult<Vec<Invoice>> {
        let db = self.db.lock()?;
        Billing::new(&db).list_for_patient(patient_id)
    }

    // =========================================================================
    // Health
    // =========================================================================

    /// Readiness probe for the boundary layer; round-trips the store.
    pub fn ping(&self) -> CoreResult<()> {
        let db = self.db.lock()?;
        Ok(db.ping()?)
    }
}
