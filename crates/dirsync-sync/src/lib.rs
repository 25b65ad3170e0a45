//! Directory synchronization core.
//!
//! Keeps directory user entries in line with the HR feed and executes
//! account lifecycle orders from the approval workflow.
//!
//! # Components
//!
//! - [`ou_path`]: department path to OU mapping and OU tree creation
//! - [`expiry`]: account expiration classification
//! - [`reconciliation`]: bounded-concurrency reconciler, digest, expiry sweep
//! - [`orders`]: order state machine, form parser, and handlers
//!
//! Collaborators ([`hr::HrSource`], [`approval::ApprovalClient`],
//! [`notify::Notifier`], [`platforms::PlatformProvisioner`],
//! [`audit::DepartmentAudit`], [`orders::OrderLedger`]) are traits; the
//! directory itself is any [`dirsync_connector::traits::DirectoryOps`].

pub mod account;
pub mod approval;
pub mod audit;
pub mod company;
pub mod context;
pub mod error;
pub mod expiry;
pub mod hr;
pub mod model;
pub mod notify;
pub mod orders;
pub mod ou_path;
pub mod platforms;
pub mod reconciliation;

pub use context::{SyncContext, SyncSettings};
pub use error::{ErrorKind, SyncError, SyncResult};
