//! Error types shared by the Supabase storage implementation.

use reqwest::StatusCode;
use thiserror::Error;

use crate::dao::storage::StorageError;

/// Convenient result alias returning [`SupabaseDaoError`] failures.
pub type SupabaseResult<T> = Result<T, SupabaseDaoError>;

/// Failures that can occur while interacting with the PostgREST gateway.
#[derive(Debug, Error)]
pub enum SupabaseDaoError {
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build Supabase client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// A request could not be sent or timed out.
    #[error("failed to send Supabase request to `{path}`")]
    RequestSend {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// The gateway returned an unexpected status code.
    #[error("unexpected Supabase response status {status} for `{path}`")]
    RequestStatus { path: String, status: StatusCode },
    /// Response payload could not be parsed into JSON.
    #[error("failed to decode Supabase response for `{path}`")]
    DecodeResponse {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// An insert did not echo the created row back.
    #[error("Supabase returned no row for insert into `{path}`")]
    MissingRow { path: String },
}

impl SupabaseDaoError {
    /// Insert hit an existing primary key.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            SupabaseDaoError::RequestStatus { status, .. } if *status == StatusCode::CONFLICT
        )
    }

    /// Network hiccups, timeouts, throttling and server-side failures.
    pub fn is_transient(&self) -> bool {
        match self {
            SupabaseDaoError::RequestSend { .. } => true,
            SupabaseDaoError::RequestStatus { status, .. } => {
                *status == StatusCode::REQUEST_TIMEOUT
                    || *status == StatusCode::TOO_MANY_REQUESTS
                    || status.is_server_error()
            }
            SupabaseDaoError::ClientBuilder { .. }
            | SupabaseDaoError::DecodeResponse { .. }
            | SupabaseDaoError::MissingRow { .. } => false,
        }
    }
}

impl From<SupabaseDaoError> for StorageError {
    fn from(err: SupabaseDaoError) -> Self {
        if err.is_transient() {
            StorageError::transient(err.to_string(), err)
        } else {
            StorageError::permanent(err.to_string(), err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> SupabaseDaoError {
        SupabaseDaoError::RequestStatus {
            path: "scores".into(),
            status: StatusCode::from_u16(code).unwrap(),
        }
    }

    #[test]
    fn throttling_and_server_errors_are_transient() {
        for code in [408, 429, 500, 503] {
            assert!(StorageError::from(status(code)).is_transient(), "{code}");
        }
    }

    #[test]
    fn client_errors_are_permanent() {
        for code in [400, 401, 403, 404, 409] {
            assert!(!StorageError::from(status(code)).is_transient(), "{code}");
        }
        let missing = SupabaseDaoError::MissingRow {
            path: "quiz_sessions".into(),
        };
        assert!(!StorageError::from(missing).is_transient());
    }

    #[test]
    fn only_409_is_a_conflict() {
        assert!(status(409).is_conflict());
        assert!(!status(400).is_conflict());
    }
}
