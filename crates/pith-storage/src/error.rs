//! Storage error types.

use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No object is stored under the requested hash.
    #[error("object not found: {0}")]
    NotFound(String),

    /// Stored or supplied bytes do not follow the expected encoding.
    #[error("malformed object: {0}")]
    Format(String),

    /// A reference could not be read or resolved.
    #[error("invalid reference: {0}")]
    InvalidRef(String),
}

impl StorageError {
    /// Creates a format error from anything printable.
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }
}
