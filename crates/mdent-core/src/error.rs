//! Core error taxonomy.
//!
//! Every operation returns exactly one of these kinds on failure. The
//! boundary layer owns the mapping to transport codes (409 for duplicates,
//! 401/403 for gate failures and so on); the core neither logs nor retries.

use thiserror::Error;

use crate::db::DbError;

/// Deterministic failure kinds of core operations.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Procedure already billed: {0}")]
    AlreadyBilled(String),

    #[error("Overpayment: {0}")]
    Overpayment(String),

    #[error("Invoice is void: {0}")]
    InvoiceVoided(String),

    #[error("Invalid status transition: {0}")]
    InvalidTransition(String),

    #[error("Referential conflict: {0}")]
    ReferentialConflict(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl From<DbError> for CoreError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::Sqlite(rusqlite::Error::SqliteFailure(err, msg)) => {
                let detail = msg.unwrap_or_else(|| err.to_string());
                match err.extended_code {
                    rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                        CoreError::DuplicateKey(detail)
                    }
                    rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                        CoreError::InvalidReference(detail)
                    }
                    _ => CoreError::StoreUnavailable(detail),
                }
            }
            DbError::NotFound(what) => CoreError::InvalidReference(what),
            other => CoreError::StoreUnavailable(other.to_string()),
        }
    }
}

/// Raw rusqlite errors (e.g. from committing a transaction) take the same
/// route as store-layer errors.
impl From<rusqlite::Error> for CoreError {
    fn from(e: rusqlite::Error) -> Self {
        DbError::from(e).into()
    }
}
