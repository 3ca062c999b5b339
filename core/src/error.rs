//! Error types for the file-repository client.
//!
//! # Design
//! Remote failures are classified by HTTP status: 404 and 409 get dedicated
//! variants because callers routinely branch on "does not exist" and
//! "already exists". Every other failure status lands in `Api`. All three
//! carry the HTTP status plus the server's `code` and `message` from the
//! error envelope.
//!
//! The remaining variants are local failures that never reached, or could
//! not make sense of, the server.

use thiserror::Error;

/// Errors returned by `RepoClient` and `Client` operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server returned 404.
    #[error("not found ({code}): {message}")]
    NotFound {
        status: u16,
        code: i64,
        message: String,
    },

    /// The server returned 409, e.g. a move or copy onto an existing path.
    #[error("conflict ({code}): {message}")]
    Conflict {
        status: u16,
        code: i64,
        message: String,
    },

    /// Any other error response, including a 2xx whose envelope carries an
    /// error.
    #[error("API error {code} (HTTP {status}): {message}")]
    Api {
        status: u16,
        code: i64,
        message: String,
    },

    /// The request payload or query could not be serialized.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// An argument was rejected before any request was built.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Client configuration is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// The transport failed to complete the round trip.
    #[error("transport error: {0}")]
    Transport(String),
}

impl ApiError {
    /// Build the remote error variant selected by `status`.
    pub fn from_status(status: u16, code: i64, message: impl Into<String>) -> Self {
        Self::classified(status, status, code, message.into())
    }

    /// Pick the variant from `kind` but record `status` as the HTTP status.
    pub(crate) fn classified(kind: u16, status: u16, code: i64, message: String) -> Self {
        match kind {
            404 => ApiError::NotFound {
                status,
                code,
                message,
            },
            409 => ApiError::Conflict {
                status,
                code,
                message,
            },
            _ => ApiError::Api {
                status,
                code,
                message,
            },
        }
    }

    /// HTTP status of a remote error, `None` for local failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::NotFound { status, .. }
            | ApiError::Conflict { status, .. }
            | ApiError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Server-provided error code of a remote error.
    pub fn code(&self) -> Option<i64> {
        match self {
            ApiError::NotFound { code, .. }
            | ApiError::Conflict { code, .. }
            | ApiError::Api { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ApiError::Conflict { .. })
    }
}
