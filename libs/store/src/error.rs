//! Error types for remote store calls.

use thiserror::Error;

/// Errors returned by an [`ObjectStore`](crate::ObjectStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The object does not exist.
    #[error("{resource} {name} not found")]
    NotFound { resource: String, name: String },

    /// An object with the same name already exists.
    #[error("{resource} {name} already exists")]
    AlreadyExists { resource: String, name: String },

    /// Credentials were missing or rejected.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The caller is not allowed to perform the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The store is temporarily unable to serve the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Any other error status returned by the store.
    #[error("API error {status} ({reason}): {message}")]
    Api {
        status: u16,
        reason: String,
        message: String,
    },

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response could not be decoded into an object.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The request was rejected before being sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl StoreError {
    /// Map an HTTP error status to the matching variant.
    pub fn from_status(
        status: u16,
        reason: impl Into<String>,
        message: impl Into<String>,
        resource: &str,
        name: &str,
    ) -> Self {
        let reason = reason.into();
        let message = message.into();

        match status {
            404 => Self::NotFound {
                resource: resource.to_string(),
                name: name.to_string(),
            },
            409 if reason == "AlreadyExists" => Self::AlreadyExists {
                resource: resource.to_string(),
                name: name.to_string(),
            },
            401 => Self::Unauthorized(message),
            403 => Self::Forbidden(message),
            429 | 500 | 502 | 503 | 504 => Self::Unavailable(format!("{status}: {message}")),
            _ => Self::Api {
                status,
                reason,
                message,
            },
        }
    }

    /// Returns true if the object does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if the object already exists.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// Returns true if retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unavailable(_) => true,
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}
