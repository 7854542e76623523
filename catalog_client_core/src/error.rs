//! Error types for the catalog client core
//!
//! The remote service is an opaque network boundary: transport failures and
//! non-2xx responses are surfaced uniformly as [`Error::Network`] with a
//! human-readable message. No failure is fatal; every error is recoverable by
//! re-invoking the corresponding read or mutation.

use thiserror::Error;

/// Core error type
///
/// `Clone` is required so that a single coalesced fetch resolution can be
/// shared by every caller waiting on it.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Transport failure or non-2xx response from the remote service
    #[error("network error: {0}")]
    Network(String),

    /// Failure reading or writing the persisted session flag
    #[error("session storage error: {0}")]
    Session(String),
}

impl Error {
    /// Build a network error from a non-success HTTP status
    pub fn http_status(status: u16, path: &str) -> Self {
        Self::Network(format!("request to {path} failed with status {status}"))
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        // reqwest::Error is not Clone, so it is flattened at the boundary.
        Self::Network(error.to_string())
    }
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, Error>;
