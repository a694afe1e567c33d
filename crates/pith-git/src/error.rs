//! Git protocol error types.

use pith_storage::{ObjectId, StorageError};
use thiserror::Error;

/// Errors that can occur while fetching, decoding or checking out.
#[derive(Debug, Error)]
pub enum GitError {
    /// Malformed pack entry, delta stream or tree entry.
    #[error("format error: {0}")]
    Format(String),

    /// The peer violated the protocol (framing, advertisement, ack, magic).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The HTTP exchange itself failed.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// Input uses a feature this client does not support.
    #[error("not implemented: {0}")]
    Unimplemented(String),

    /// Deltas remained whose base never appeared.
    #[error("unresolved delta: base {base} missing ({remaining} deltas pending)")]
    UnresolvedDelta {
        /// A base that is still missing.
        base: ObjectId,
        /// Number of deltas that could not be applied.
        remaining: usize,
    },

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GitError {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    pub(crate) fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Returns true if the error is a missing object.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Storage(StorageError::NotFound(_)))
    }
}
