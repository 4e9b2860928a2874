//! Patient and history book models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A registered patient. The registration number is unique across all
/// branches; the phone number is not.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    /// Opaque unique id
    pub id: String,
    /// Home branch
    pub branch_id: String,
    pub first_name: String,
    pub last_name: String,
    /// National registration number, unique (e.g. "AA12345678")
    pub reg_no: String,
    /// Contact phone (shared phones are common, so not unique)
    pub phone: Option<String>,
    pub email: Option<String>,
    pub birth_date: Option<NaiveDate>,
    /// Free-form gender string as supplied by the boundary layer
    pub gender: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Patient {
    /// Build a new patient from a creation request.
    pub fn new(spec: CreatePatient, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            branch_id: spec.branch_id,
            first_name: spec.first_name,
            last_name: spec.last_name,
            reg_no: spec.reg_no,
            phone: spec.phone,
            email: spec.email,
            birth_date: spec.birth_date,
            gender: spec.gender,
            created_at: now,
            updated_at: now,
        }
    }

    /// Display name, "First Last".
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// The paper history book assigned to a patient, exactly one per patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryBook {
    pub id: String,
    /// Owning patient (unique - one book per patient)
    pub patient_id: String,
    /// Unique book number (e.g. "HB-00001")
    pub book_number: String,
    pub opened_at: DateTime<Utc>,
}

impl HistoryBook {
    pub fn new(patient_id: String, book_number: String, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            patient_id,
            book_number,
            opened_at: now,
        }
    }
}

/// Input for creating a patient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePatient {
    pub branch_id: String,
    pub first_name: String,
    pub last_name: String,
    pub reg_no: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<String>,
}

/// Input for a partial patient update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePatient {
    pub branch_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub reg_no: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<String>,
}

impl UpdatePatient {
    /// Apply this update on top of an existing patient row.
    pub fn apply(self, patient: &mut Patient, now: DateTime<Utc>) {
        if let Some(branch_id) = self.branch_id {
            patient.branch_id = branch_id;
        }
        if let Some(first_name) = self.first_name {
            patient.first_name = first_name;
        }
        if let Some(last_name) = self.last_name {
            patient.last_name = last_name;
        }
        if let Some(reg_no) = self.reg_no {
            patient.reg_no = reg_no;
        }
        if let Some(phone) = self.phone {
            patient.phone = Some(phone);
        }
        if let Some(email) = self.email {
            patient.email = Some(email);
        }
        if let Some(birth_date) = self.birth_date {
            patient.birth_date = Some(birth_date);
        }
        if let Some(gender) = self.gender {
            patient.gender = Some(gender);
        }
        patient.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_patient() -> Patient {
        Patient::new(
            CreatePatient {
                branch_id: "branch-1".into(),
                first_name: "Temuujin".into(),
                last_name: "Baatar".into(),
                reg_no: "AA12345678".into(),
                phone: Some("99110002".into()),
                email: None,
                birth_date: NaiveDate::from_ymd_opt(2015, 6, 1),
                gender: Some("MALE".into()),
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_new_patient() {
        let patient = make_patient();
        assert_eq!(patient.reg_no, "AA12345678");
        assert_eq!(patient.full_name(), "Temuujin Baatar");
        assert_eq!(patient.id.len(), 36);
    }

    #[test]
    fn test_partial_update_leaves_omitted_fields() {
        let mut patient = make_patient();
        let created = patient.created_at;
        let later = created + chrono::Duration::hours(1);

        UpdatePatient {
            phone: Some("99110003".into()),
            ..Default::default()
        }
        .apply(&mut patient, later);

        assert_eq!(patient.phone.as_deref(), Some("99110003"));
        assert_eq!(patient.first_name, "Temuujin");
        assert_eq!(patient.reg_no, "AA12345678");
        assert_eq!(patient.created_at, created);
        assert_eq!(patient.updated_at, later);
    }
}
