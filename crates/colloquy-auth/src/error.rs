//! Authentication error types.

use thiserror::Error;

/// Convenience alias used throughout the auth crate.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors raised by the authentication lifecycle.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The credential endpoint rejected the username/password pair.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The identity has no live session token. API-calling steps are
    /// gated on this before any request is attempted.
    #[error("identity `{identity}` is not logged in")]
    NotLoggedIn { identity: String },

    /// The credential endpoint could not be reached or misbehaved.
    #[error("gateway error: {0}")]
    Gateway(#[from] colloquy_gateway::GatewayError),

    /// Reading or writing session records failed.
    #[error("store error: {0}")]
    Store(#[from] colloquy_store::StoreError),
}
