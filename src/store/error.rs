//! Error types for store operations

use std::fmt;

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations
#[derive(Debug)]
pub enum StoreError {
    /// The backing store could not be reached
    ConnectionFailed(String),

    /// A query against the store failed
    QueryFailed(String),

    /// The referenced record does not exist
    NotFound(String),

    /// Backend-specific error
    BackendError(String),

    /// I/O error (file access, etc.)
    IoError(std::io::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::ConnectionFailed(msg) => {
                write!(f, "failed to connect to store: {}", msg)
            }
            StoreError::QueryFailed(msg) => write!(f, "store query failed: {}", msg),
            StoreError::NotFound(msg) => write!(f, "record not found: {}", msg),
            StoreError::BackendError(msg) => write!(f, "store backend error: {}", msg),
            StoreError::IoError(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::IoError(err)
    }
}
