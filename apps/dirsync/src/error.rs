//! Top-level error and process exit codes.

use thiserror::Error;

use dirsync_clients::ClientError;
use dirsync_connector::error::ConnectorError;
use dirsync_db::DbError;
use dirsync_sync::{ErrorKind, SyncError};

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("logging setup failed: {0}")]
    Logging(String),

    #[error("directory error: {0}")]
    Directory(#[from] ConnectorError),

    #[error("database error: {0}")]
    Database(#[from] DbError),

    #[error("client error: {0}")]
    Client(#[from] ClientError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("failed to render report: {0}")]
    Output(#[from] serde_json::Error),
}

impl AppError {
    /// 2 for anything that fails before work starts, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Config(_) | AppError::Logging(_) => 2,
            AppError::Sync(e) if e.kind() == ErrorKind::Configuration => 2,
            AppError::Directory(ConnectorError::InvalidConfiguration { .. }) => 2,
            AppError::Client(ClientError::InvalidConfig(_)) => 2,
            _ => 1,
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
