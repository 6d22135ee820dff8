use std::error::Error;
use thiserror::Error;

use crate::retry::Retryable;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Network failure, timeout or overloaded backend; repeating the call may succeed.
    #[error("storage temporarily unavailable: {message}")]
    Transient {
        /// Backend-specific description.
        message: String,
        /// Underlying backend error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// Rejected request (bad filter, auth, constraint) or unreadable payload.
    #[error("storage request failed: {message}")]
    Permanent {
        /// Backend-specific description.
        message: String,
        /// Underlying backend error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl StorageError {
    /// Construct a transient error from any backend failure.
    pub fn transient(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Transient {
            message,
            source: Box::new(source),
        }
    }

    /// Construct a permanent error from any backend failure.
    pub fn permanent(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Permanent {
            message,
            source: Box::new(source),
        }
    }

    /// Whether the failure is worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Transient { .. })
    }
}

impl Retryable for StorageError {
    fn is_retryable(&self) -> bool {
        self.is_transient()
    }
}
