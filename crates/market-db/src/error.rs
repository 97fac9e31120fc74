//! # Database Error Types
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  sqlx::Error ──────────┐                                               │
//! │                        ▼                                                │
//! │  CoreError ─────► DbError (this module)                                │
//! │  (rule broken         │   constraint kind, not-found, timeout          │
//! │   mid-workflow)       ▼                                                 │
//! │                  ApiError (market-api) ← status code + envelope        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Workflows return `DbResult` for both storage failures and business rule
//! violations so a single `?` aborts the surrounding transaction.

use market_core::{CoreError, ValidationError};
use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found, or an update/delete matched zero rows.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Duplicate branch code, product barcode or user login
    /// - Second stock row for the same (branch, barcode)
    /// - Second unclosed shift for a branch
    #[error("Duplicate value violates {constraint}")]
    UniqueViolation { constraint: String },

    /// Foreign key constraint violation (reference to a missing record).
    #[error("Invalid reference: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint violation (e.g. negative stock).
    #[error("Constraint failed: {message}")]
    CheckViolation { message: String },

    /// A business rule rejected the operation.
    #[error(transparent)]
    Rule(#[from] CoreError),

    /// The operation did not finish within the request deadline.
    #[error("Database operation timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Whether this is a unique violation on the given `table.column`.
    pub fn is_unique_on(&self, target: &str) -> bool {
        matches!(self, DbError::UniqueViolation { constraint } if constraint.contains(target))
    }
}

impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        DbError::Rule(CoreError::Validation(err))
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → constraint kind reported by SQLite
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message().to_string();

                if db_err.is_unique_violation() {
                    // SQLite: "UNIQUE constraint failed: <table>.<column>[, ...]"
                    let constraint = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation { constraint }
                } else if db_err.is_foreign_key_violation() {
                    DbError::ForeignKeyViolation { message: msg }
                } else if db_err.is_check_violation() {
                    DbError::CheckViolation { message: msg }
                } else {
                    DbError::QueryFailed(msg)
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
