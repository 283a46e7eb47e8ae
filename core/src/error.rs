//! Error types for the cloud SDK core.
//!
//! # Design
//! `ConfigError` covers deployment mistakes caught before a request exists.
//! `RequestError` is what a finished request reports through its `Response`;
//! it is `Clone` because the completion hands the same error out both on the
//! response and alongside it. Storage failures keep their own type so store
//! implementations do not depend on request semantics.

use std::time::Duration;

use thiserror::Error;

/// The SDK configuration cannot back a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// `host` is required before any request executes.
    #[error("config must have 'host' defined")]
    MissingHost,
}

/// Terminal failure of a request, delivered through the completion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// The payload could not be encoded to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response body could not be decoded.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The server answered with an unexpected status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The session blob could not be persisted.
    #[error("storage failed: {0}")]
    Storage(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("request cancelled")]
    Cancelled,

    /// The executing task went away without reporting an outcome.
    #[error("request aborted before completion")]
    Aborted,
}

/// Failure of a `KeyValueStore` operation.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored value is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<StorageError> for RequestError {
    fn from(err: StorageError) -> Self {
        RequestError::Storage(err.to_string())
    }
}
