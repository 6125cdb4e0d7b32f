//! Gateway error types.
//!
//! The interpreter's session-expiry branching depends on the distinction
//! between [`GatewayError::CsrfExpired`] and every other failure kind —
//! nothing in this crate may collapse a 419 into a generic HTTP error.

use thiserror::Error;

/// Convenience alias used throughout the gateway crate.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Errors surfaced by an outbound API call.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request never produced an HTTP response: connection failure or
    /// timeout. Retrying is the caller's decision — the adapter itself
    /// never retries.
    #[error("transport error: {reason}")]
    Transport { reason: String },

    /// HTTP 419 — the reserved signal that the bearer credential is no
    /// longer valid and must be reacquired via login.
    #[error("session expired (HTTP 419)")]
    CsrfExpired,

    /// Any other non-2xx response.
    #[error("http error {status}: {body}")]
    Http { status: u16, body: String },

    /// A 2xx response whose body was not valid JSON.
    #[error("invalid response body: {reason}")]
    InvalidBody { reason: String },

    /// The request could not be built (bad method or URL).
    #[error("invalid request: {reason}")]
    InvalidRequest { reason: String },
}
