//! Authentication lifecycle for Colloquy.
//!
//! Login is a simple API call against an external credential endpoint, not
//! a full conversation: on success the identity's [`SessionRecord`] holds
//! the bearer token that gates every api-request step. A CSRF expiry
//! (HTTP 419 from the gateway) clears the token and forces a fresh
//! `/login`; an explicit logout removes the record entirely.
//!
//! [`SessionRecord`]: colloquy_store::SessionRecord

pub mod error;
pub mod manager;

pub use error::{AuthError, Result};
pub use manager::AuthManager;
