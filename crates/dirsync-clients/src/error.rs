//! Client errors.

use dirsync_sync::SyncError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("authentication failed ({status})")]
    Auth { status: u16 },

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to parse response: {0}")]
    Parse(String),

    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),
}

impl ClientError {
    /// Map into the sync engine's taxonomy, tagged with the service name.
    pub fn into_sync(self, service: &str) -> SyncError {
        match self {
            ClientError::NotFound(what) if what.is_empty() => {
                SyncError::not_found(format!("{service} resource"))
            }
            ClientError::NotFound(what) => SyncError::not_found(what),
            ClientError::Parse(message) => SyncError::deserialization(message),
            ClientError::InvalidConfig(message) => SyncError::configuration(message),
            ClientError::Request(e) => SyncError::http_with_source(service, "request failed", e),
            other => SyncError::http(service, other.to_string()),
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
