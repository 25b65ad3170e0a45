//! LDAP Connector configuration

use serde::{Deserialize, Serialize};
use dirsync_connector::config::ConnectionSettings;
use dirsync_connector::error::{ConnectorError, ConnectorResult};

/// Configuration for the LDAP connector.
#[derive(Clone, Serialize, Deserialize)]
pub struct LdapConfig {
    /// Directory server hostname or IP address.
    pub host: String,

    /// Server port (389 for LDAP, 636 for LDAPS).
    #[serde(default = "default_ldap_port")]
    pub port: u16,

    /// Use SSL/TLS (LDAPS). Required for password writes.
    #[serde(default)]
    pub use_ssl: bool,

    /// Use STARTTLS upgrade on a plain connection.
    #[serde(default)]
    pub use_starttls: bool,

    /// Skip server certificate verification.
    #[serde(default)]
    pub tls_insecure: bool,

    /// Bind DN for authentication.
    pub bind_dn: String,

    /// Bind password, usually supplied through the environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_password: Option<String>,

    /// Connection settings (timeouts, pool size).
    #[serde(default)]
    pub connection: ConnectionSettings,

    /// Page size for subtree searches.
    #[serde(default = "default_page_size")]
    pub page_size: i32,
}

impl std::fmt::Debug for LdapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("use_ssl", &self.use_ssl)
            .field("use_starttls", &self.use_starttls)
            .field("tls_insecure", &self.tls_insecure)
            .field("bind_dn", &self.bind_dn)
            .field(
                "bind_password",
                &self.bind_password.as_ref().map(|_| "***REDACTED***"),
            )
            .field("connection", &self.connection)
            .field("page_size", &self.page_size)
            .finish()
    }
}

fn default_ldap_port() -> u16 {
    389
}

fn default_page_size() -> i32 {
    1000
}

impl LdapConfig {
    /// Create a new LDAP config with required fields.
    pub fn new(host: impl Into<String>, bind_dn: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: default_ldap_port(),
            use_ssl: false,
            use_starttls: false,
            tls_insecure: false,
            bind_dn: bind_dn.into(),
            bind_password: None,
            connection: ConnectionSettings::default(),
            page_size: default_page_size(),
        }
    }

    /// Set bind password.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.bind_password = Some(password.into());
        self
    }

    /// Enable SSL (LDAPS).
    #[must_use]
    pub fn with_ssl(mut self) -> Self {
        self.use_ssl = true;
        self.port = 636;
        self
    }

    /// Get the LDAP URL.
    #[must_use]
    pub fn url(&self) -> String {
        let scheme = if self.use_ssl { "ldaps" } else { "ldap" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ConnectorResult<()> {
        if self.host.trim().is_empty() {
            return Err(ConnectorError::invalid_config("ldap.host is required"));
        }
        if self.bind_dn.trim().is_empty() {
            return Err(ConnectorError::invalid_config("ldap.bind_dn is required"));
        }
        if self.use_ssl && self.use_starttls {
            return Err(ConnectorError::invalid_config(
                "cannot use both SSL and STARTTLS",
            ));
        }
        if self.connection.pool_size == 0 {
            return Err(ConnectorError::invalid_config(
                "ldap.connection.pool_size must be at least 1",
            ));
        }
        if self.page_size <= 0 {
            return Err(ConnectorError::invalid_config(
                "ldap.page_size must be positive",
            ));
        }
        Ok(())
    }
}
