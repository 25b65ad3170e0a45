//! Directory connector error types
//!
//! Error definitions with transient/permanent classification.

use thiserror::Error;

/// Error that can occur while talking to a directory service.
#[derive(Debug, Error)]
pub enum ConnectorError {
    // Connection errors (usually transient)
    /// Failed to establish a connection to the directory.
    #[error("connection failed: {message}")]
    ConnectionFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Connection or operation timed out.
    #[error("connection timeout after {timeout_secs} seconds")]
    ConnectionTimeout { timeout_secs: u64 },

    /// Every pooled connection is checked out and the wait was abandoned.
    #[error("connection pool exhausted (size {pool_size})")]
    PoolExhausted { pool_size: u32 },

    /// Network error during communication.
    #[error("network error: {message}")]
    NetworkError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // Authentication errors (permanent)
    /// Bind credentials were rejected.
    #[error("authentication failed: invalid credentials")]
    AuthenticationFailed,

    /// The bound identity may not perform the operation.
    #[error("authorization failed: insufficient permissions for {operation}")]
    AuthorizationFailed { operation: String },

    // Configuration errors (permanent)
    /// Connector configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    // Operation errors
    /// The directory rejected the operation.
    #[error("operation failed: {message}")]
    OperationFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Entry already exists (add conflict).
    #[error("object already exists: {identifier}")]
    ObjectAlreadyExists { identifier: String },

    /// Entry not found (modify/move target or search base missing).
    #[error("object not found: {identifier}")]
    ObjectNotFound { identifier: String },

    /// Constraint violation, e.g. password policy.
    #[error("constraint violation: {message}")]
    ConstraintViolation { message: String },

    /// Invalid data format in a request or response.
    #[error("invalid data: {message}")]
    InvalidData { message: String },
}

impl ConnectorError {
    /// Check if this error is transient and a later attempt may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ConnectorError::ConnectionFailed { .. }
                | ConnectorError::ConnectionTimeout { .. }
                | ConnectorError::PoolExhausted { .. }
                | ConnectorError::NetworkError { .. }
        )
    }

    /// Whether the error means the addressed entry is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ConnectorError::ObjectNotFound { .. })
    }

    /// Whether the error means the addressed entry already exists.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, ConnectorError::ObjectAlreadyExists { .. })
    }

    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            ConnectorError::ConnectionFailed { .. } => "CONNECTION_FAILED",
            ConnectorError::ConnectionTimeout { .. } => "CONNECTION_TIMEOUT",
            ConnectorError::PoolExhausted { .. } => "POOL_EXHAUSTED",
            ConnectorError::NetworkError { .. } => "NETWORK_ERROR",
            ConnectorError::AuthenticationFailed => "AUTH_FAILED",
            ConnectorError::AuthorizationFailed { .. } => "AUTHORIZATION_FAILED",
            ConnectorError::InvalidConfiguration { .. } => "INVALID_CONFIG",
            ConnectorError::OperationFailed { .. } => "OPERATION_FAILED",
            ConnectorError::ObjectAlreadyExists { .. } => "OBJECT_EXISTS",
            ConnectorError::ObjectNotFound { .. } => "OBJECT_NOT_FOUND",
            ConnectorError::ConstraintViolation { .. } => "CONSTRAINT_VIOLATION",
            ConnectorError::InvalidData { .. } => "INVALID_DATA",
        }
    }

    // Convenience constructors

    /// Create a connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        ConnectorError::ConnectionFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection failed error with source.
    pub fn connection_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ConnectorError::ConnectionFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an operation failed error.
    pub fn operation_failed(message: impl Into<String>) -> Self {
        ConnectorError::OperationFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a network error with source.
    pub fn network_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ConnectorError::NetworkError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an object-not-found error.
    pub fn not_found(identifier: impl Into<String>) -> Self {
        ConnectorError::ObjectNotFound {
            identifier: identifier.into(),
        }
    }

    /// Create an object-already-exists error.
    pub fn already_exists(identifier: impl Into<String>) -> Self {
        ConnectorError::ObjectAlreadyExists {
            identifier: identifier.into(),
        }
    }

    /// Create an invalid-configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        ConnectorError::InvalidConfiguration {
            message: message.into(),
        }
    }
}

/// Result type for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;
