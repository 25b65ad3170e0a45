//! HTTP implementations of the sync engine's collaborators.
//!
//! Each client wraps one [`http::ServiceClient`] configured from a
//! [`ServiceConfig`] and implements the matching trait from `dirsync-sync`.

pub mod approval;
pub mod config;
pub mod error;
pub mod hr;
pub mod http;
pub mod notify;
pub mod platforms;

pub use approval::HttpApprovalClient;
pub use config::ServiceConfig;
pub use error::{ClientError, ClientResult};
pub use hr::HttpHrSource;
pub use notify::HttpNotifier;
pub use platforms::HttpPlatformProvisioner;
