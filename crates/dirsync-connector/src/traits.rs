//! Directory connector traits
//!
//! Lifecycle trait plus the directory capability the sync engine depends on.

use async_trait::async_trait;

use crate::error::{ConnectorError, ConnectorResult};
use crate::operation::{AttributeDelta, AttributeSet, Filter, SearchScope};

/// Base trait for all directory connectors.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Display name for this connector instance.
    fn display_name(&self) -> &str;

    /// Test the connection to the directory (binds and releases one connection).
    async fn test_connection(&self) -> ConnectorResult<()>;

    /// Close pooled connections.
    async fn dispose(&self) -> ConnectorResult<()>;

    /// Lightweight health check.
    fn is_healthy(&self) -> bool {
        true
    }
}

/// Search / add / modify / move primitives against a directory.
///
/// Every call acquires one pooled connection and releases it before
/// returning, on success and error paths alike.
#[async_trait]
pub trait DirectoryOps: Connector {
    /// Search under `base_dn`. Each returned set carries `distinguishedName`.
    async fn search(
        &self,
        base_dn: &str,
        scope: SearchScope,
        filter: &Filter,
        attributes: &[&str],
    ) -> ConnectorResult<Vec<AttributeSet>>;

    /// Add a new entry.
    async fn add(&self, dn: &str, attributes: AttributeSet) -> ConnectorResult<()>;

    /// Apply one modify request to an existing entry.
    async fn modify(&self, dn: &str, changes: AttributeDelta) -> ConnectorResult<()>;

    /// Rename and/or move an entry. `new_rdn` is e.g. `CN=Zhang San`.
    async fn move_dn(&self, dn: &str, new_rdn: &str, new_parent: &str) -> ConnectorResult<()>;

    /// Whether an entry exists at `dn`.
    async fn exists(&self, dn: &str) -> ConnectorResult<bool> {
        match self
            .search(dn, SearchScope::Base, &Filter::present("objectClass"), &["objectClass"])
            .await
        {
            Ok(entries) => Ok(!entries.is_empty()),
            Err(ConnectorError::ObjectNotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
