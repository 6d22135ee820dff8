//! Error types shared by chat transport implementations.

use reqwest::StatusCode;
use thiserror::Error;

/// Convenient result alias returning [`TransportError`] failures.
pub type TransportResult<T> = Result<T, TransportError>;

/// Failures that can occur while talking to the chat platform.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build chat platform client")]
    ClientBuilder {
        /// Underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },
    /// The request could not be sent.
    #[error("failed to send chat platform request to `{path}`")]
    RequestSend {
        /// Request path.
        path: String,
        /// Underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },
    /// Target message, channel or user does not exist (anymore).
    #[error("chat platform resource `{path}` not found")]
    NotFound {
        /// Request path.
        path: String,
    },
    /// The bot lacks the permission for the request.
    #[error("missing permissions for chat platform resource `{path}`")]
    Forbidden {
        /// Request path.
        path: String,
    },
    /// Any other unexpected status code.
    #[error("unexpected chat platform response status {status} for `{path}`")]
    RequestStatus {
        /// Request path.
        path: String,
        /// Status returned.
        status: StatusCode,
    },
    /// Response payload could not be parsed into JSON.
    #[error("failed to decode chat platform response for `{path}`")]
    DecodeResponse {
        /// Request path.
        path: String,
        /// Underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },
}

impl TransportError {
    /// `true` when the target is gone or hidden from the bot; callers fall back instead of failing.
    pub fn is_missing_target(&self) -> bool {
        matches!(
            self,
            TransportError::NotFound { .. } | TransportError::Forbidden { .. }
        )
    }

    /// Map a non-success status into the matching variant.
    pub(crate) fn from_status(path: impl Into<String>, status: StatusCode) -> Self {
        let path = path.into();
        match status {
            StatusCode::NOT_FOUND => TransportError::NotFound { path },
            StatusCode::FORBIDDEN => TransportError::Forbidden { path },
            status => TransportError::RequestStatus { path, status },
        }
    }
}
