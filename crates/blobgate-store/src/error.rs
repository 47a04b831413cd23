//! Error types for the blobgate-store crate

use thiserror::Error;

/// Result type alias using `StoreError`
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during blob store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Object not found
    #[error("object not found: {bucket}/{object}")]
    NotFound { bucket: String, object: String },

    /// Upstream answered with an unexpected status
    #[error("storage API error ({status}): {message}")]
    Http { status: u16, message: String },

    /// Connection error
    #[error("connection error: {0}")]
    Connection(String),

    /// Timeout error
    #[error("operation timed out: {0}")]
    Timeout(String),

    /// Credentials could not be loaded or exchanged for a token
    #[error("credentials error: {0}")]
    Credentials(String),

    /// Deserialization error
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl StoreError {
    /// Create a not-found error for an object key
    pub fn not_found(bucket: impl Into<String>, object: impl Into<String>) -> Self {
        Self::NotFound {
            bucket: bucket.into(),
            object: object.into(),
        }
    }

    /// Whether this error means the object does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether the failure happened talking to the upstream service
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::Http { .. } | Self::Connection(_) | Self::Timeout(_)
        )
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StoreError::Timeout(err.to_string())
        } else if err.is_connect() {
            StoreError::Connection(err.to_string())
        } else if err.is_decode() {
            StoreError::Deserialization(err.to_string())
        } else {
            StoreError::Connection(err.to_string())
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Deserialization(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for StoreError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        StoreError::Credentials(err.to_string())
    }
}
