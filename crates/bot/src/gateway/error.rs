//! Gateway client errors.

use thiserror::Error;

/// Errors that can occur when calling the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The token was missing or unknown (401).
    #[error("not authenticated")]
    Unauthorized,

    /// The caller lacks the capability (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The resource does not exist (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// The request was rejected (400). `code` is the gateway's error code.
    #[error("{code}: {message}")]
    Invalid { code: String, message: String },

    /// The write collided with existing data or a concurrent update (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The gateway failed (5xx or unexpected status).
    #[error("gateway error (HTTP {0})")]
    Server(u16),

    /// The gateway could not be reached or did not answer in time.
    #[error("gateway unavailable: {0}")]
    Unavailable(String),

    /// The response body could not be decoded.
    #[error("unexpected gateway response: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Whether the request never got a usable answer.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Server(_))
    }
}
