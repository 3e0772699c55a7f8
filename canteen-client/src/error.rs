//! Client error types

use thiserror::Error;

/// Client errors
///
/// Mirrors the server's error-code table so callers can branch on the
/// class of failure without parsing messages.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Request rejected as invalid (server code E0002)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Resource does not exist (server code E0003)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Status transition rejected (server code E0004)
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Canteen missing or closed for orders (server code E0005)
    #[error("Canteen unavailable: {0}")]
    CanteenUnavailable(String),

    /// Allocation contention; retry with the same request id (E9003)
    #[error("Server busy: {0}")]
    Busy(String),

    /// Transport-level failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Anything else
    #[error("Server error: {0}")]
    Internal(String),
}

pub type ClientResult<T> = Result<T, ClientError>;
