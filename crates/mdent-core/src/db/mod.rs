//! Database layer for the clinic core.

mod schema;
mod facilities;
mod patients;
mod appointments;
mod encounters;
mod invoices;

pub use schema::*;
#[allow(unused_imports)]
pub use facilities::*;
#[allow(unused_imports)]
pub use patients::*;
#[allow(unused_imports)]
pub use appointments::*;
#[allow(unused_imports)]
pub use encounters::*;
#[allow(unused_imports)]
pub use invoices::*;

use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Decimal column error: {0}")]
    Decimal(#[from] rust_decimal::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// How long a statement may wait on a locked store before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize schema and connection settings.
    fn initialize(&self) -> DbResult<()> {
        self.conn.busy_timeout(BUSY_TIMEOUT)?;
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Begin a transaction on this connection. Statements issued through
    /// `&self` while it is open join it; dropping without commit rolls back.
    pub fn transaction(&self) -> DbResult<rusqlite::Transaction<'_>> {
        Ok(self.conn.unchecked_transaction()?)
    }

    /// Cheap connectivity probe (readiness checks).
    pub fn ping(&self) -> DbResult<()> {
        self.conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn test_schema_initialized() {
        let db = Database::open_in_memory().unwrap();

        // Check that tables exist
        let tables: Vec<String> = db
            .conn()
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        for table in [
            "branches",
            "rooms",
            "doctors",
            "patients",
            "history_books",
            "appointments",
            "encounters",
            "chart_notes",
            "procedures",
            "invoices",
            "invoice_items",
            "payments",
        ] {
            assert!(tables.contains(&table.to_string()), "missing table {table}");
        }
    }

    #[test]
    fn test_ping() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.ping().is_ok());
    }

    #[test]
    fn test_transaction_rolls_back_on_drop() {
        let db = Database::open_in_memory().unwrap();

        {
            let _tx = db.transaction().unwrap();
            db.conn()
                .execute(
                    "INSERT INTO branches (id, code, name, address, phone, created_at, updated_at)
                     VALUES ('b1', 'TUV', 'Tuv Salbar', 'Ulaanbaatar', '7700-0001',
                             '2026-01-01T00:00:00+00:00', '2026-01-01T00:00:00+00:00')",
                    [],
                )
                .unwrap();
            // dropped without commit
        }

        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM branches", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_transaction_commit_persists() {
        let db = Database::open_in_memory().unwrap();

        let tx = db.transaction().unwrap();
        db.conn()
            .execute(
                "INSERT INTO branches (id, code, name, address, phone, created_at, updated_at)
                 VALUES ('b1', 'TUV', 'Tuv Salbar', 'Ulaanbaatar', '7700-0001',
                         '2026-01-01T00:00:00+00:00', '2026-01-01T00:00:00+00:00')",
                [],
            )
            .unwrap();
        tx.commit().unwrap();

        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM branches", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
