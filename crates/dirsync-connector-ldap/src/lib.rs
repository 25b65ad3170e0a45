//! # LDAP Connector
//!
//! LDAP/Active Directory client for dirsync.
//!
//! - Pooled connections ([`pool::Pool`]) with a checked-out guard that is
//!   returned exactly once
//! - Filter rendering with RFC 4515 escaping
//! - Active Directory helpers: `userAccountControl`, directory-native
//!   timestamps, `unicodePwd` encoding
//!
//! ## Example
//!
//! ```ignore
//! use dirsync_connector_ldap::{LdapConfig, LdapConnector};
//! use dirsync_connector::prelude::*;
//!
//! let config = LdapConfig::new(
//!     "dc01.corp.example.com",
//!     "DC=corp,DC=example,DC=com",
//!     "CN=svc-dirsync,OU=Service,DC=corp,DC=example,DC=com",
//! )
//! .with_password("secret")
//! .with_ssl();
//!
//! let connector = LdapConnector::new(config)?;
//! connector.test_connection().await?;
//! ```

pub mod ad;
pub mod config;
pub mod connector;
pub mod filter;
pub mod pool;

pub use config::LdapConfig;
pub use connector::LdapConnector;
