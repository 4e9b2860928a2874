//! Branch, room and doctor database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbResult};
use crate::models::{Branch, Doctor, Room};

fn branch_from_row(row: &Row<'_>) -> rusqlite::Result<Branch> {
    Ok(Branch {
        id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        address: row.get(3)?,
        phone: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

const BRANCH_COLUMNS: &str = "id, code, name, address, phone, created_at, updated_at";

impl Database {
    /// Insert a new branch.
    pub fn insert_branch(&self, branch: &Branch) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO branches (id, code, name, address, phone, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                branch.id,
                branch.code,
                branch.name,
                branch.address,
                branch.phone,
                branch.created_at,
                branch.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Update branch fields. The code is immutable and not touched.
    pub fn update_branch(&self, branch: &Branch) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE branches SET
                name = ?2,
                address = ?3,
                phone = ?4,
                updated_at = ?5
            WHERE id = ?1
            "#,
            params![
                branch.id,
                branch.name,
                branch.address,
                branch.phone,
                branch.updated_at,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a branch by ID.
    pub fn get_branch(&self, id: &str) -> DbResult<Option<Branch>> {
        self.conn
            .query_row(
                &format!("SELECT {BRANCH_COLUMNS} FROM branches WHERE id = ?"),
                [id],
                branch_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Get a branch by its unique code.
    pub fn get_branch_by_code(&self, code: &str) -> DbResult<Option<Branch>> {
        self.conn
            .query_row(
                &format!("SELECT {BRANCH_COLUMNS} FROM branches WHERE code = ?"),
                [code],
                branch_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List all branches, by code.
    pub fn list_branches(&self) -> DbResult<Vec<Branch>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {BRANCH_COLUMNS} FROM branches ORDER BY code"))?;
        let rows = stmt.query_map([], branch_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Insert a new room.
    pub fn insert_room(&self, room: &Room) -> DbResult<()> {
        self.conn.execute(
            "INSERT INTO rooms (id, branch_id, name, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![room.id, room.branch_id, room.name, room.created_at],
        )?;
        Ok(())
    }

    /// Get a room by ID.
    pub fn get_room(&self, id: &str) -> DbResult<Option<Room>> {
        self.conn
            .query_row(
                "SELECT id, branch_id, name, created_at FROM rooms WHERE id = ?",
                [id],
                |row| {
                    Ok(Room {
                        id: row.get(0)?,
                        branch_id: row.get(1)?,
                        name: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    /// List rooms of one branch.
    pub fn list_rooms_for_branch(&self, branch_id: &str) -> DbResult<Vec<Room>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, branch_id, name, created_at FROM rooms WHERE branch_id = ? ORDER BY name",
        )?;
        let rows = stmt.query_map([branch_id], |row| {
            Ok(Room {
                id: row.get(0)?,
                branch_id: row.get(1)?,
                name: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Insert a new doctor.
    pub fn insert_doctor(&self, doctor: &Doctor) -> DbResult<()> {
        self.conn.execute(
            "INSERT INTO doctors (id, branch_id, full_name, phone, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                doctor.id,
                doctor.branch_id,
                doctor.full_name,
                doctor.phone,
                doctor.created_at,
            ],
        )?;
        Ok(())
    }

    /// Get a doctor by ID.
    pub fn get_doctor(&self, id: &str) -> DbResult<Option<Doctor>> {
        self.conn
            .query_row(
                "SELECT id, branch_id, full_name, phone, created_at FROM doctors WHERE id = ?",
                [id],
                |row| {
                    Ok(Doctor {
                        id: row.get(0)?,
                        branch_id: row.get(1)?,
                        full_name: row.get(2)?,
                        phone: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    /// List doctors of one branch.
    pub fn list_doctors_for_branch(&self, branch_id: &str) -> DbResult<Vec<Doctor>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, branch_id, full_name, phone, created_at FROM doctors WHERE branch_id = ? ORDER BY full_name",
        )?;
        let rows = stmt.query_map([branch_id], |row| {
            Ok(Doctor {
                id: row.get(0)?,
                branch_id: row.get(1)?,
                full_name: row.get(2)?,
                phone: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
