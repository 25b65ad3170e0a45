//! # dirsync-db
//!
//! PostgreSQL persistence for dirsync.
//!
//! - [`models::OrderExecutionRecord`] - idempotency ledger, one row per order id
//! - [`models::DepartmentChangeRecord`] - append-only audit of department transitions
//!
//! Migrations are embedded from `migrations/` and applied with [`run_migrations`].

pub mod error;
pub mod migrations;
pub mod models;
pub mod pool;

pub use error::DbError;
pub use migrations::run_migrations;
pub use models::{
    ChangeLevel, CreateDepartmentChange, DepartmentChangeRecord, OrderExecutionRecord,
};
pub use pool::DbPool;
