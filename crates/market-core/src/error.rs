//! # Error Types
//!
//! Domain-specific error types for market-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  market-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  market-db errors (separate crate)                                     │
//! │  └── DbError          - Storage failures, wraps CoreError              │
//! │                                                                         │
//! │  market-api errors (app)                                               │
//! │  └── ApiError         - Status code + envelope the client sees         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised by the reconciliation workflows.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No stock row exists for the scanned barcode at this branch.
    #[error("Product with barcode {barcode} not found at branch {branch_id}")]
    ProductNotFound { branch_id: String, barcode: String },

    /// Committing a sale would drive a remainder below zero.
    ///
    /// ## User Workflow
    /// ```text
    /// Finalize sale (line: 3 × "123")
    ///      │
    ///      ▼
    /// Conditional decrement: stock=2, rows affected=0
    ///      │
    ///      ▼
    /// InsufficientStock { barcode: "123", available: 2, requested: 3 }
    ///      │
    ///      ▼
    /// Whole sale rolls back, register untouched
    /// ```
    #[error("Insufficient stock for {barcode}: available {available}, requested {requested}")]
    InsufficientStock {
        barcode: String,
        available: i64,
        requested: i64,
    },

    /// Scanning one more unit would exceed what the branch holds.
    #[error("Limit exceeded for {barcode}: {available} in stock, cart would hold {requested}")]
    LimitExceeded {
        barcode: String,
        available: i64,
        requested: i64,
    },

    /// The record is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Scanning into or finalizing a finished sale
    /// - Posting an income that was already posted
    /// - Opening a shift that is not `new`, closing one that is not `open`
    #[error("{entity} {id} is {status}, cannot {operation}")]
    InvalidState {
        entity: String,
        id: String,
        status: String,
        operation: String,
    },

    /// Sale has no payment to post into the register.
    #[error("Sale {sale_id} has no payment")]
    PaymentRequired { sale_id: String },

    /// The sale's shift has no cash register row (shift never opened).
    #[error("No cash register for shift {shift_id}")]
    NoOpenRegister { shift_id: String },

    /// The branch has no open shift to sell against.
    #[error("Branch {branch_id} has no open shift")]
    NoOpenShift { branch_id: String },

    /// The branch already has a shift that is not closed.
    #[error("Branch {branch_id} already has an unclosed shift")]
    ShiftAlreadyOpen { branch_id: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates an InvalidState error.
    pub fn invalid_state(
        entity: impl Into<String>,
        id: impl Into<String>,
        status: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        CoreError::InvalidState {
            entity: entity.into(),
            id: id.into(),
            status: status.into(),
            operation: operation.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any storage access when a request is malformed.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Two ids that must agree point at different records.
    #[error("{field} does not match: {reason}")]
    Mismatch { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::LimitExceeded {
            barcode: "123".to_string(),
            available: 5,
            requested: 6,
        };
        assert_eq!(
            err.to_string(),
            "Limit exceeded for 123: 5 in stock, cart would hold 6"
        );

        let err = CoreError::invalid_state("Income", "abc", "finished", "post");
        assert_eq!(err.to_string(), "Income abc is finished, cannot post");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let err: CoreError = ValidationError::Required {
            field: "barcode".to_string(),
        }
        .into();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(err.to_string(), "Validation error: barcode is required");
    }
}
