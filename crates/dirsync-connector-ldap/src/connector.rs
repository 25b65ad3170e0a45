//! LDAP Connector implementation
//!
//! Implements [`DirectoryOps`] for LDAP/Active Directory over a bounded pool.

use std::collections::HashSet;

use async_trait::async_trait;
use ldap3::adapters::{Adapter, EntriesOnly, PagedResults};
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, LdapError, LdapResult, Mod, Scope, SearchEntry};
use tracing::{debug, info, instrument, warn};

use dirsync_connector::error::{ConnectorError, ConnectorResult};
use dirsync_connector::operation::{
    AttributeDelta, AttributeSet, AttributeValue, Filter, SearchScope,
};
use dirsync_connector::traits::{Connector, DirectoryOps};

use crate::ad::password::validate_password_connection;
use crate::config::LdapConfig;
use crate::filter;
use crate::pool::{ManageConnection, Pool, PooledConnection};

// LDAP result codes (RFC 4511)
const RC_SUCCESS: u32 = 0;
const RC_SIZE_LIMIT_EXCEEDED: u32 = 4;
const RC_CONSTRAINT_VIOLATION: u32 = 19;
const RC_NO_SUCH_OBJECT: u32 = 32;
const RC_INVALID_CREDENTIALS: u32 = 49;
const RC_INSUFFICIENT_ACCESS: u32 = 50;
const RC_UNWILLING_TO_PERFORM: u32 = 53;
const RC_ALREADY_EXISTS: u32 = 68;

/// Opens and binds LDAP connections for the pool.
pub struct LdapManager {
    config: LdapConfig,
}

#[async_trait]
impl ManageConnection for LdapManager {
    type Connection = Ldap;

    async fn connect(&self) -> ConnectorResult<Ldap> {
        let url = self.config.url();
        debug!(url = %url, "Connecting to LDAP server");

        let settings = LdapConnSettings::new()
            .set_conn_timeout(self.config.connection.connection_timeout())
            .set_starttls(self.config.use_starttls)
            .set_no_tls_verify(self.config.tls_insecure);

        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &url)
            .await
            .map_err(|e| {
                ConnectorError::connection_failed_with_source(
                    format!("failed to connect to LDAP server at {url}"),
                    e,
                )
            })?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "LDAP connection driver error");
            }
        });

        let bind_dn = &self.config.bind_dn;
        let bind_password = self.config.bind_password.as_deref().unwrap_or("");

        let result = ldap
            .with_timeout(self.config.connection.operation_timeout())
            .simple_bind(bind_dn, bind_password)
            .await
            .map_err(|e| {
                ConnectorError::connection_failed_with_source(
                    format!("LDAP bind failed for {bind_dn}"),
                    e,
                )
            })?;

        if result.rc == RC_INVALID_CREDENTIALS {
            return Err(ConnectorError::AuthenticationFailed);
        }
        if result.rc != RC_SUCCESS {
            return Err(ConnectorError::connection_failed(format!(
                "LDAP bind failed with code {}: {}",
                result.rc, result.text
            )));
        }

        info!(host = %self.config.host, "LDAP connection established");
        Ok(ldap)
    }
}

/// LDAP/AD directory client.
pub struct LdapConnector {
    config: LdapConfig,
    display_name: String,
    pool: Pool<LdapManager>,
}

impl LdapConnector {
    /// Create a new connector. No connection is opened until first use.
    pub fn new(config: LdapConfig) -> ConnectorResult<Self> {
        config.validate()?;

        let display_name = format!("LDAP: {}", config.host);
        let pool = Pool::new(
            LdapManager {
                config: config.clone(),
            },
            config.connection.pool_size,
            config.connection.connection_timeout(),
        );

        Ok(Self {
            config,
            display_name,
            pool,
        })
    }

    /// The underlying pool, for diagnostics.
    pub fn pool(&self) -> &Pool<LdapManager> {
        &self.pool
    }

    async fn checkout(&self) -> ConnectorResult<PooledConnection<LdapManager>> {
        let mut conn = self.pool.acquire().await?;
        conn.with_timeout(self.config.connection.operation_timeout());
        Ok(conn)
    }

    /// Map a transport error, discarding the connection it happened on.
    fn transport_error(
        &self,
        conn: &mut PooledConnection<LdapManager>,
        context: String,
        err: LdapError,
    ) -> ConnectorError {
        conn.mark_broken();
        match err {
            LdapError::Timeout { .. } => ConnectorError::ConnectionTimeout {
                timeout_secs: self.config.connection.operation_timeout_secs,
            },
            other => ConnectorError::network_with_source(context, other),
        }
    }

    fn check_result(result: &LdapResult, dn: &str, operation: &str) -> ConnectorResult<()> {
        match result.rc {
            RC_SUCCESS => Ok(()),
            RC_NO_SUCH_OBJECT => Err(ConnectorError::not_found(dn)),
            RC_ALREADY_EXISTS => Err(ConnectorError::already_exists(dn)),
            RC_INVALID_CREDENTIALS => Err(ConnectorError::AuthenticationFailed),
            RC_INSUFFICIENT_ACCESS => Err(ConnectorError::AuthorizationFailed {
                operation: format!("{operation} {dn}"),
            }),
            RC_CONSTRAINT_VIOLATION | RC_UNWILLING_TO_PERFORM => {
                Err(ConnectorError::ConstraintViolation {
                    message: format!("{operation} {dn}: rc={} {}", result.rc, result.text),
                })
            }
            rc => Err(ConnectorError::operation_failed(format!(
                "LDAP {operation} failed for {dn} with code {rc}: {}",
                result.text
            ))),
        }
    }

    fn scope(scope: SearchScope) -> Scope {
        match scope {
            SearchScope::Base => Scope::Base,
            SearchScope::OneLevel => Scope::OneLevel,
            SearchScope::Subtree => Scope::Subtree,
        }
    }

    fn wire_set(value: &AttributeValue) -> HashSet<Vec<u8>> {
        value.to_wire_values().into_iter().collect()
    }

    /// Convert a search entry to an attribute set carrying `distinguishedName`.
    fn entry_to_attribute_set(entry: SearchEntry) -> AttributeSet {
        let mut attrs = AttributeSet::new();

        for (name, mut values) in entry.attrs {
            if values.len() == 1 {
                if let Some(value) = values.pop() {
                    attrs.set(name, value);
                }
            } else if !values.is_empty() {
                attrs.set(
                    name,
                    AttributeValue::Array(values.into_iter().map(AttributeValue::String).collect()),
                );
            }
        }

        for (name, values) in entry.bin_attrs {
            if let Some(first_value) = values.into_iter().next() {
                attrs.set(name, AttributeValue::Binary(first_value));
            }
        }

        attrs.set("distinguishedName", entry.dn);
        attrs
    }

    fn touches_password(names: impl IntoIterator<Item = impl AsRef<str>>) -> bool {
        names
            .into_iter()
            .any(|n| n.as_ref().eq_ignore_ascii_case("unicodePwd"))
    }
}

#[async_trait]
impl Connector for LdapConnector {
    fn display_name(&self) -> &str {
        &self.display_name
    }

    #[instrument(skip(self), fields(host = %self.config.host))]
    async fn test_connection(&self) -> ConnectorResult<()> {
        let mut conn = self.checkout().await?;
        let result = match conn
            .search("", Scope::Base, "(objectClass=*)", vec!["defaultNamingContext"])
            .await
        {
            Ok(result) => result,
            Err(e) => {
                return Err(self.transport_error(
                    &mut conn,
                    "root DSE query failed".to_string(),
                    e,
                ))
            }
        };
        Self::check_result(&result.1, "", "search")?;
        info!("LDAP connection test succeeded");
        Ok(())
    }

    async fn dispose(&self) -> ConnectorResult<()> {
        for mut ldap in self.pool.close() {
            if let Err(e) = ldap.unbind().await {
                debug!(error = %e, "LDAP unbind failed during dispose");
            }
        }
        info!(host = %self.config.host, "LDAP connector disposed");
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        !self.pool.is_closed()
    }
}

#[async_trait]
impl DirectoryOps for LdapConnector {
    #[instrument(skip(self, filter, attributes), fields(base_dn = %base_dn))]
    async fn search(
        &self,
        base_dn: &str,
        scope: SearchScope,
        filter: &Filter,
        attributes: &[&str],
    ) -> ConnectorResult<Vec<AttributeSet>> {
        let ldap_filter = filter::to_ldap(filter);
        let attrs: Vec<&str> = if attributes.is_empty() {
            vec!["*"]
        } else {
            attributes.to_vec()
        };
        debug!(filter = %ldap_filter, "Searching LDAP");

        let mut conn = self.checkout().await?;

        if scope == SearchScope::Base {
            let result = match conn
                .search(base_dn, Scope::Base, &ldap_filter, attrs)
                .await
            {
                Ok(result) => result,
                Err(e) => {
                    return Err(self.transport_error(
                        &mut conn,
                        format!("LDAP search failed under {base_dn}"),
                        e,
                    ))
                }
            };
            Self::check_result(&result.1, base_dn, "search")?;
            return Ok(result
                .0
                .into_iter()
                .map(SearchEntry::construct)
                .map(Self::entry_to_attribute_set)
                .collect());
        }

        let adapters: Vec<Box<dyn Adapter<_, _>>> = vec![
            Box::new(EntriesOnly::new()),
            Box::new(PagedResults::new(self.config.page_size)),
        ];
        let mut stream = match conn
            .streaming_search_with(adapters, base_dn, Self::scope(scope), &ldap_filter, attrs)
            .await
        {
            Ok(stream) => stream,
            Err(e) => {
                return Err(self.transport_error(
                    &mut conn,
                    format!("LDAP search failed under {base_dn}"),
                    e,
                ))
            }
        };

        let mut entries = Vec::new();
        loop {
            match stream.next().await {
                Ok(Some(entry)) => {
                    entries.push(Self::entry_to_attribute_set(SearchEntry::construct(entry)));
                }
                Ok(None) => break,
                Err(e) => {
                    drop(stream);
                    return Err(self.transport_error(
                        &mut conn,
                        format!("LDAP search stream failed under {base_dn}"),
                        e,
                    ));
                }
            }
        }
        let result = stream.finish().await;
        drop(stream);
        if result.rc != RC_SIZE_LIMIT_EXCEEDED {
            Self::check_result(&result, base_dn, "search")?;
        } else {
            warn!(returned = entries.len(), "LDAP search hit the server size limit");
        }

        debug!(returned = entries.len(), "LDAP search completed");
        Ok(entries)
    }

    #[instrument(skip(self, attributes), fields(dn = %dn))]
    async fn add(&self, dn: &str, attributes: AttributeSet) -> ConnectorResult<()> {
        if Self::touches_password(attributes.names()) {
            validate_password_connection(self.config.use_ssl)?;
        }

        let ldap_attrs: Vec<(Vec<u8>, HashSet<Vec<u8>>)> = attributes
            .iter()
            .filter(|(name, _)| !name.eq_ignore_ascii_case("distinguishedName"))
            .map(|(name, value)| (name.as_bytes().to_vec(), Self::wire_set(value)))
            .filter(|(_, values)| !values.is_empty())
            .collect();

        let mut conn = self.checkout().await?;
        let result = match conn.add(dn, ldap_attrs).await {
            Ok(result) => result,
            Err(e) => {
                return Err(self.transport_error(
                    &mut conn,
                    format!("failed to add entry {dn}"),
                    e,
                ))
            }
        };
        Self::check_result(&result, dn, "add")?;

        info!("LDAP entry created");
        Ok(())
    }

    #[instrument(skip(self, changes), fields(dn = %dn))]
    async fn modify(&self, dn: &str, changes: AttributeDelta) -> ConnectorResult<()> {
        if changes.is_empty() {
            return Ok(());
        }
        if Self::touches_password(changes.replace.keys()) {
            validate_password_connection(self.config.use_ssl)?;
        }

        let mut mods: Vec<Mod<Vec<u8>>> = Vec::new();
        for (name, value) in &changes.replace {
            mods.push(Mod::Replace(name.as_bytes().to_vec(), Self::wire_set(value)));
        }

        let mut conn = self.checkout().await?;
        let result = match conn.modify(dn, mods).await {
            Ok(result) => result,
            Err(e) => {
                return Err(self.transport_error(
                    &mut conn,
                    format!("failed to modify entry {dn}"),
                    e,
                ))
            }
        };
        Self::check_result(&result, dn, "modify")?;

        info!(attributes = ?changes.affected_attributes(), "LDAP entry modified");
        Ok(())
    }

    #[instrument(skip(self), fields(dn = %dn))]
    async fn move_dn(&self, dn: &str, new_rdn: &str, new_parent: &str) -> ConnectorResult<()> {
        let mut conn = self.checkout().await?;
        let result = match conn.modifydn(dn, new_rdn, true, Some(new_parent)).await {
            Ok(result) => result,
            Err(e) => {
                return Err(self.transport_error(
                    &mut conn,
                    format!("failed to move entry {dn}"),
                    e,
                ))
            }
        };
        Self::check_result(&result, dn, "modifydn")?;

        info!(new_parent = %new_parent, "LDAP entry moved");
        Ok(())
    }
}

impl std::fmt::Debug for LdapConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapConnector")
            .field("display_name", &self.display_name)
            .field("config", &self.config)
            .field("pool_size", &self.pool.size())
            .finish()
    }
}
