//! Branch, room and doctor reference data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A clinic branch. Every other entity hangs off a branch directly or
/// through the patient/doctor/room it references.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Branch {
    /// Opaque unique id
    pub id: String,
    /// Human-readable unique code (e.g. "TUV")
    pub code: String,
    /// Display name
    pub name: String,
    /// Street address
    pub address: String,
    /// Contact phone
    pub phone: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Branch {
    /// Build a new branch from a registration request.
    pub fn new(spec: CreateBranch, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            code: spec.code,
            name: spec.name,
            address: spec.address,
            phone: spec.phone,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A treatment room inside a branch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Room {
    pub id: String,
    /// Owning branch
    pub branch_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Room {
    pub fn new(spec: CreateRoom, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            branch_id: spec.branch_id,
            name: spec.name,
            created_at: now,
        }
    }
}

/// A doctor attached to a branch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Doctor {
    pub id: String,
    /// Home branch
    pub branch_id: String,
    /// Display name (e.g. "Dr. Eelen")
    pub full_name: String,
    /// Contact phone
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

impl Doctor {
    pub fn new(spec: CreateDoctor, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            branch_id: spec.branch_id,
            full_name: spec.full_name,
            phone: spec.phone,
            created_at: now,
        }
    }
}

/// Input for registering or creating a branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBranch {
    pub code: String,
    pub name: String,
    pub address: String,
    pub phone: String,
}

/// Input for administrative branch edits. `None` leaves a field unchanged;
/// the code is the natural key and cannot be edited.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateBranch {
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
}

impl UpdateBranch {
    /// Apply the supplied fields to a branch, refreshing `updated_at`.
    pub fn apply(self, branch: &mut Branch, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            branch.name = name;
        }
        if let Some(address) = self.address {
            branch.address = address;
        }
        if let Some(phone) = self.phone {
            branch.phone = phone;
        }
        branch.updated_at = now;
    }
}

/// Input for creating a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRoom {
    pub branch_id: String,
    pub name: String,
}

/// Input for creating a doctor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDoctor {
    pub branch_id: String,
    pub full_name: String,
    pub phone: String,
}
