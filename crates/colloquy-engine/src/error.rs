//! Engine error types.
//!
//! [`EngineError`] is internal plumbing: `Interpreter::handle_turn` is
//! infallible at its boundary. Whatever goes wrong mid-turn is logged for
//! operators and collapsed into a generic failure reply, so one identity's
//! broken turn can never crash the worker serving everyone else.

use thiserror::Error;

/// Convenience alias used throughout the engine crate.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Internal errors raised while processing a turn.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Reading or writing per-identity state failed.
    #[error("store error: {0}")]
    Store(#[from] colloquy_store::StoreError),

    /// A prompt, payload or response template failed to render.
    #[error("template error: {0}")]
    Template(#[from] colloquy_template::TemplateError),

    /// The authentication lifecycle failed outside its user-visible paths.
    #[error("auth error: {0}")]
    Auth(#[from] colloquy_auth::AuthError),

    /// Persisted state referenced a command or step the catalog does not
    /// have. Load-time validation makes this unreachable for a stable
    /// catalog; it shows up when state outlives a catalog change.
    #[error("stale conversation state: {reason}")]
    StaleState { reason: String },
}
