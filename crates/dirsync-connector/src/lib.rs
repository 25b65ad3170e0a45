//! # Directory Connector Framework
//!
//! Core abstractions for talking to a directory service from the sync engine.
//!
//! - [`traits::Connector`] - lifecycle every directory client implements
//! - [`traits::DirectoryOps`] - search / add / modify / move primitives
//! - [`operation`] - attribute sets, deltas, and the search [`operation::Filter`] AST
//! - [`dn`] - RFC 4514 distinguished-name helpers
//! - [`error`] - errors with transient/permanent classification
//!
//! ## Example
//!
//! ```ignore
//! use dirsync_connector::prelude::*;
//!
//! let filter = Filter::and(vec![
//!     Filter::eq("objectClass", "user"),
//!     Filter::eq("employeeID", "E100"),
//! ]);
//! let entries = directory
//!     .search("DC=corp,DC=example,DC=com", SearchScope::Subtree, &filter, &["displayName"])
//!     .await?;
//! ```

pub mod config;
pub mod dn;
pub mod error;
pub mod operation;
pub mod traits;

/// Common imports for directory clients and their callers.
pub mod prelude {
    pub use crate::config::ConnectionSettings;
    pub use crate::error::{ConnectorError, ConnectorResult};
    pub use crate::operation::{AttributeDelta, AttributeSet, AttributeValue, Filter, SearchScope};
    pub use crate::traits::{Connector, DirectoryOps};
}
