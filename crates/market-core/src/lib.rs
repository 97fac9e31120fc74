//! # market-core: Pure Business Logic for Market POS
//!
//! Domain types and rules shared by the database layer and the API server.
//! Nothing in this crate performs I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Market POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  market-api (axum, JWT, cache)                  │   │
//! │  │   /login  /v1/<entity>  /v1/sale/scan-barcode  /v1/dosale  ...  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 market-db (SQLite, workflows)                   │   │
//! │  │    record store · ledger · session · register · reconcile      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ market-core (THIS CRATE) ★                      │   │
//! │  │   types · money · cart rules · validation · errors             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Entities, statuses, request and response payloads
//! - [`money`] - Integer money in minor units
//! - [`cart`] - Scan planning and line totals
//! - [`validation`] - Request validation
//! - [`error`] - Domain error types

pub mod cart;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;
pub use validation::{Validate, ValidationResult};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Page size when a list request gives no `limit`.
pub const DEFAULT_LIST_LIMIT: i64 = 10;

/// Largest page a list request may ask for.
pub const MAX_LIST_LIMIT: i64 = 1000;

/// Largest price or tender amount, in minor units, a request may carry.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000_000;

/// Access tokens expire this many hours after login.
pub const TOKEN_TTL_HOURS: i64 = 24;

/// How long a cached list response stays fresh.
///
/// Kept short because remainders change with every sale.
pub const LIST_CACHE_TTL_SECS: u64 = 15;

/// Upper bound on a single request's storage work.
pub const REQUEST_DEADLINE_MS: u64 = 2000;

pub const MIN_PASSWORD_LEN: usize = 6;
