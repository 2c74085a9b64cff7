//! Error types for outbound API calls.

use thiserror::Error;

/// Errors produced by [`Client`](crate::Client) calls.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The client has no live connection to the platform.
    #[error("client is not connected")]
    NotConnected,

    /// The call did not complete in time.
    #[error("API call timed out")]
    Timeout,

    /// The platform rejected the call.
    #[error("API error ({code}): {description}")]
    Api {
        /// Platform error code.
        code: i32,
        /// Human-readable description from the platform.
        description: String,
    },

    /// The response could not be decoded into the expected type.
    #[error("failed to decode API response: {0}")]
    Decode(String),

    /// The underlying transport failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// Any other failure.
    #[error("{0}")]
    Other(String),
}

/// Result type for API calls.
pub type ApiResult<T> = Result<T, ApiError>;
