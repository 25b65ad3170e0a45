//! Application configuration loading and types.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use dirsync_clients::ServiceConfig;
use dirsync_connector_ldap::LdapConfig;
use dirsync_sync::SyncSettings;

pub const DEFAULT_CONFIG_PATH: &str = "./config/dirsync.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("{0}")]
    Invalid(String),
}

/// Root configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    pub database: DatabaseConfig,
    pub ldap: LdapConfig,
    pub hr: ServiceConfig,
    pub approval: ServiceConfig,
    pub notify: ServiceConfig,
    pub platforms: ServiceConfig,
    pub sync: SyncSettings,
}

#[derive(Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"***REDACTED***")
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

fn default_log_filter() -> String {
    "info,dirsync=debug".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl AppConfig {
    /// Load from a YAML file, then apply secret overrides from the process
    /// environment.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let mut config = Self::from_yaml(&content)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.check()?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Secrets are kept out of the file; `lookup` resolves environment keys.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.is_empty());
        if let Some(url) = lookup("DIRSYNC_DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(password) = lookup("DIRSYNC_LDAP_BIND_PASSWORD") {
            self.ldap.bind_password = Some(password);
        }
        if let Some(token) = lookup("DIRSYNC_APPROVAL_TOKEN") {
            self.approval.token = Some(token);
        }
        if let Some(token) = lookup("DIRSYNC_HR_TOKEN") {
            self.hr.token = Some(token);
        }
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "database.url is empty (set DIRSYNC_DATABASE_URL)".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SAMPLE: &str = r#"
database:
  url: postgres://localhost/dirsync
ldap:
  host: dc01.corp.example.com
  bind_dn: CN=svc-dirsync,OU=Service,DC=corp,DC=example,DC=com
hr:
  base_url: https://hr.example.com/api
approval:
  base_url: https://approval.example.com/api
notify:
  base_url: https://notify.example.com/api
platforms:
  base_url: https://provisioning.example.com/api
sync:
  base_dn: DC=corp,DC=example,DC=com
  disabled_dn: OU=Disabled,DC=corp,DC=example,DC=com
  default_ou: OU=Staff,DC=corp,DC=example,DC=com
"#;

    #[test]
    fn test_defaults_applied() {
        let config = AppConfig::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.log_filter, "info,dirsync=debug");
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.ldap.port, 389);
        assert_eq!(config.hr.timeout_secs, 30);
        assert_eq!(config.sync.concurrency, 20);
        assert_eq!(config.sync.external_account_days, 90);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::from_yaml(SAMPLE).unwrap();
        let env: HashMap<&str, &str> = [
            ("DIRSYNC_DATABASE_URL", "postgres://db/prod"),
            ("DIRSYNC_LDAP_BIND_PASSWORD", "bind-secret"),
            ("DIRSYNC_APPROVAL_TOKEN", "approval-token"),
            ("DIRSYNC_HR_TOKEN", ""),
        ]
        .into_iter()
        .collect();
        config.apply_env_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.database.url, "postgres://db/prod");
        assert_eq!(config.ldap.bind_password.as_deref(), Some("bind-secret"));
        assert_eq!(config.approval.token.as_deref(), Some("approval-token"));
        assert!(config.hr.token.is_none());
    }

    #[test]
    fn test_missing_database_url_rejected() {
        let mut config = AppConfig::from_yaml(SAMPLE).unwrap();
        config.database.url.clear();
        assert!(matches!(config.check(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut config = AppConfig::from_yaml(SAMPLE).unwrap();
        config.ldap.bind_password = Some("bind-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("bind-secret"));
        assert!(!debug.contains("postgres://localhost"));
    }

    #[test]
    fn test_missing_file() {
        let err = AppConfig::load("/nonexistent/dirsync.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
