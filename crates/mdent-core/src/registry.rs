//! Identity registry: branches, rooms, doctors, patients and history books.
//!
//! All reference data and patient identity flows through here. The registry
//! borrows the shared store handle; locking and timestamping are owned by
//! the facade, which passes the clock reading in.

use chrono::{DateTime, Utc};

use crate::db::Database;
use crate::error::{CoreError, CoreResult};
use crate::models::{
    Branch, CreateBranch, CreateDoctor, CreatePatient, CreateRoom, Doctor, HistoryBook, Patient,
    Room, UpdateBranch, UpdatePatient,
};

/// Most rows a patient search will return.
const SEARCH_LIMIT: usize = 50;

/// Identity registry over the shared store.
pub struct Registry<'a> {
    db: &'a Database,
}

impl<'a> Registry<'a> {
    /// Create a new registry view.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Idempotent branch registration keyed by code: creates the branch when
    /// the code is unknown, otherwise returns the stored row untouched. Used
    /// for seeding; repeated registrations never overwrite edits.
    pub fn register_branch(&self, spec: CreateBranch, now: DateTime<Utc>) -> CoreResult<Branch> {
        if let Some(existing) = self.db.get_branch_by_code(&spec.code)? {
            return Ok(existing);
        }
        let branch = Branch::new(spec, now);
        self.db.insert_branch(&branch)?;
        Ok(branch)
    }

    /// Strict branch creation; a known code is a `DuplicateKey` error.
    pub fn create_branch(&self, spec: CreateBranch, now: DateTime<Utc>) -> CoreResult<Branch> {
        let branch = Branch::new(spec, now);
        self.db.insert_branch(&branch)?;
        Ok(branch)
    }

    /// Partial administrative edit of a branch. The code is the natural key
    /// and cannot be changed.
    pub fn update_branch(
        &self,
        branch_id: &str,
        changes: UpdateBranch,
        now: DateTime<Utc>,
    ) -> CoreResult<Branch> {
        let mut branch = self.db.get_branch(branch_id)?.ok_or_else(|| {
            CoreError::InvalidReference(format!("branch {} not found", branch_id))
        })?;
        changes.apply(&mut branch, now);
        self.db.update_branch(&branch)?;
        Ok(branch)
    }

    pub fn get_branch(&self, id: &str) -> CoreResult<Option<Branch>> {
        Ok(self.db.get_branch(id)?)
    }

    pub fn list_branches(&self) -> CoreResult<Vec<Branch>> {
        Ok(self.db.list_branches()?)
    }

    /// Create a treatment room under an existing branch.
    pub fn create_room(&self, spec: CreateRoom, now: DateTime<Utc>) -> CoreResult<Room> {
        self.ensure_branch(&spec.branch_id)?;
        let room = Room::new(spec, now);
        self.db.insert_room(&room)?;
        Ok(room)
    }

    /// Create a doctor under an existing branch.
    pub fn create_doctor(&self, spec: CreateDoctor, now: DateTime<Utc>) -> CoreResult<Doctor> {
        self.ensure_branch(&spec.branch_id)?;
        let doctor = Doctor::new(spec, now);
        self.db.insert_doctor(&doctor)?;
        Ok(doctor)
    }

    pub fn list_rooms(&self, branch_id: &str) -> CoreResult<Vec<Room>> {
        Ok(self.db.list_rooms_for_branch(branch_id)?)
    }

    pub fn list_doctors(&self, branch_id: &str) -> CoreResult<Vec<Doctor>> {
        Ok(self.db.list_doctors_for_branch(branch_id)?)
    }

    /// Register a patient at their home branch. The registration number is
    /// unique across all branches; a collision is a `DuplicateKey` error and
    /// leaves the stored patient untouched.
    pub fn create_patient(&self, spec: CreatePatient, now: DateTime<Utc>) -> CoreResult<Patient> {
        self.ensure_branch(&spec.branch_id)?;
        let patient = Patient::new(spec, now);
        self.db.insert_patient(&patient)?;
        Ok(patient)
    }

    pub fn get_patient(&self, id: &str) -> CoreResult<Option<Patient>> {
        Ok(self.db.get_patient(id)?)
    }

    /// Free-text patient search over names, registration number, email and
    /// phone, most recently updated first. An empty query lists the most
    /// recently updated patients.
    pub fn search_patients(&self, query: &str) -> CoreResult<Vec<Patient>> {
        Ok(self.db.search_patients(query, SEARCH_LIMIT)?)
    }

    /// Partial patient update; omitted fields stay as stored. Moving the
    /// home branch validates the target branch first.
    pub fn update_patient(
        &self,
        patient_id: &str,
        changes: UpdatePatient,
        now: DateTime<Utc>,
    ) -> CoreResult<Patient> {
        let mut patient = self.require_patient(patient_id)?;
        if let Some(branch_id) = &changes.branch_id {
            self.ensure_branch(branch_id)?;
        }
        changes.apply(&mut patient, now);
        self.db.update_patient(&patient)?;
        Ok(patient)
    }

    /// Delete a patient together with their history book, in one
    /// transaction. Refused with `ReferentialConflict` while appointments,
    /// encounters or invoices still reference the patient.
    pub fn delete_patient(&self, patient_id: &str) -> CoreResult<()> {
        self.require_patient(patient_id)?;
        if self.db.patient_has_dependents(patient_id)? {
            return Err(CoreError::ReferentialConflict(format!(
                "patient {} still has appointments, encounters or invoices",
                patient_id
            )));
        }
        let tx = self.db.transaction()?;
        self.db.delete_history_book_for_patient(patient_id)?;
        self.db.delete_patient(patient_id)?;
        tx.commit()?;
        Ok(())
    }

    /// Open the patient's history book. A patient holds at most one book,
    /// and book numbers are unique across the clinic.
    pub fn open_history_book(
        &self,
        patient_id: &str,
        book_number: &str,
        now: DateTime<Utc>,
    ) -> CoreResult<HistoryBook> {
        self.require_patient(patient_id)?;
        if let Some(book) = self.db.get_history_book_for_patient(patient_id)? {
            return Err(CoreError::DuplicateKey(format!(
                "patient {} already holds book {}",
                patient_id, book.book_number
            )));
        }
        if self.db.history_book_number_exists(book_number)? {
            return Err(CoreError::DuplicateKey(format!(
                "book number {} is already assigned",
                book_number
            )));
        }
        let book = HistoryBook::new(patient_id.to_string(), book_number.to_string(), now);
        self.db.insert_history_book(&book)?;
        Ok(book)
    }

    pub fn get_history_book(&self, patient_id: &str) -> CoreResult<Option<HistoryBook>> {
        Ok(self.db.get_history_book_for_patient(patient_id)?)
    }

    fn ensure_branch(&self, branch_id: &str) -> CoreResult<()> {
        if self.db.get_branch(branch_id)?.is_none() {
            return Err(CoreError::InvalidReference(format!(
                "branch {} not found",
                branch_id
            )));
        }
        Ok(())
    }

    fn require_patient(&self, patient_id: &str) -> CoreResult<Patient> {
        self.db.get_patient(patient_id)?.ok_or_else(|| {
            CoreError::InvalidReference(format!("patient {} not found", patient_id))
        })
    }
}
