//! Sync engine errors.
//!
//! Every error maps to one [`ErrorKind`]; callers decide between skipping,
//! notifying, and failing from the kind alone.

use dirsync_connector::error::ConnectorError;
use dirsync_db::DbError;
use thiserror::Error;

/// Error classification used for handling policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Directory entry or key absent. The unit is skipped.
    LookupMiss,
    /// Directory, database, or HTTP call failed.
    Transport,
    /// Upstream payload could not be decoded.
    Deserialization,
    /// Input rejected by a domain rule.
    Validation,
    /// Unknown order type or control kind.
    Unsupported,
    /// Startup configuration is unusable.
    Configuration,
}

/// Errors raised by the sync engine.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("not found: {what}")]
    NotFound { what: String },

    #[error("lookup {filter} matched {count} entries")]
    AmbiguousLookup { filter: String, count: usize },

    #[error("directory error: {0}")]
    Directory(#[from] ConnectorError),

    #[error("database error: {0}")]
    Database(#[from] DbError),

    #[error("{service} request failed: {message}")]
    Http {
        service: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("malformed payload: {message}")]
    Deserialization { message: String },

    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("unsupported: {what}")]
    Unsupported { what: String },

    #[error("unknown order template '{template_code}'")]
    UnknownOrderType { template_code: String },

    #[error("invalid configuration: {message}")]
    Configuration { message: String },
}

impl SyncError {
    /// Handling class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::NotFound { .. } => ErrorKind::LookupMiss,
            SyncError::Directory(e) if e.is_not_found() => ErrorKind::LookupMiss,
            SyncError::Directory(ConnectorError::InvalidConfiguration { .. }) => {
                ErrorKind::Configuration
            }
            SyncError::Directory(_) | SyncError::Database(_) | SyncError::Http { .. } => {
                ErrorKind::Transport
            }
            SyncError::Deserialization { .. } => ErrorKind::Deserialization,
            SyncError::Validation { .. } | SyncError::AmbiguousLookup { .. } => {
                ErrorKind::Validation
            }
            SyncError::Unsupported { .. } | SyncError::UnknownOrderType { .. } => {
                ErrorKind::Unsupported
            }
            SyncError::Configuration { .. } => ErrorKind::Configuration,
        }
    }

    pub fn is_lookup_miss(&self) -> bool {
        self.kind() == ErrorKind::LookupMiss
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        SyncError::NotFound { what: what.into() }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        SyncError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn deserialization(message: impl Into<String>) -> Self {
        SyncError::Deserialization {
            message: message.into(),
        }
    }

    pub fn unsupported(what: impl Into<String>) -> Self {
        SyncError::Unsupported { what: what.into() }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        SyncError::Configuration {
            message: message.into(),
        }
    }

    pub fn http(service: impl Into<String>, message: impl Into<String>) -> Self {
        SyncError::Http {
            service: service.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn http_with_source(
        service: impl Into<String>,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        SyncError::Http {
            service: service.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Result alias for the sync engine.
pub type SyncResult<T> = Result<T, SyncError>;
