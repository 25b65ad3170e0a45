//! Company type map.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How accounts of one company are placed and expired.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyType {
    /// Accounts live under the partner root and expire.
    #[serde(default)]
    pub is_external: bool,
    /// Container RDN(s) under the partner root used when no department is given,
    /// e.g. `OU=Acme`.
    #[serde(default)]
    pub dn_prefix: String,
}

/// Company name to [`CompanyType`], matched trimmed and case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct CompanyTypeMap {
    entries: HashMap<String, CompanyType>,
}

fn key(name: &str) -> String {
    name.trim().to_lowercase()
}

impl CompanyTypeMap {
    pub fn new(entries: HashMap<String, CompanyType>) -> Self {
        Self {
            entries: entries.into_iter().map(|(k, v)| (key(&k), v)).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&CompanyType> {
        self.entries.get(&key(name))
    }

    pub fn is_external(&self, name: &str) -> bool {
        self.get(name).is_some_and(|c| c.is_external)
    }

    /// The company's type; unknown companies are internal.
    pub fn resolve(&self, name: &str) -> CompanyType {
        self.get(name).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
