//! # market-db: Database Layer for Market POS
//!
//! SQLite persistence for the back-office: a generic record store for the
//! reference tables, and transactional workflows for stock, carts and
//! shifts.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Market POS Data Flow                             │
//! │                                                                         │
//! │  HTTP handler (market-api)                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     market-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │   Workflows    │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ (reconcile.rs) │    │  (embedded)  │  │   │
//! │  │   │               │    │                │    │              │  │   │
//! │  │   │ store::<E>()  │◄───│ ledger         │    │ 001_initial  │  │   │
//! │  │   │ reconcile()   │    │ session        │    │   _schema    │  │   │
//! │  │   │ users()       │    │ register       │    │              │  │   │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (DATABASE_PATH, WAL)                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`store`] - Generic CRUD, list filters and table bindings
//! - [`ledger`] - Stock levels and deliveries
//! - [`session`] - Carts, payments and checkout
//! - [`register`] - Shifts and their cash registers
//! - [`reconcile`] - Transaction boundaries for the workflows
//! - [`users`] - Password hashing and login lookup
//!
//! ## Usage
//!
//! ```rust,ignore
//! use market_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./data/market.db")).await?;
//!
//! let suppliers = db.store::<Supplier>().get_list(&ListParams::default()).await?;
//! let finalized = db.reconcile().finalize_sale(&sale_id, &branch_id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod reconcile;
pub mod register;
pub mod session;
pub mod store;
pub mod users;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{with_deadline, Database, DbConfig};
pub use reconcile::Reconciler;
pub use store::{Filter, FilterKind, ListParams, Record, RecordStore};
pub use users::UserStore;
