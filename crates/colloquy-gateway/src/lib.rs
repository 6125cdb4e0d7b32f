//! Outbound API gateway for Colloquy.
//!
//! Executes the HTTP calls described by api-request steps: method + URL +
//! rendered JSON payload, authenticated with the identity's bearer token.
//! The error taxonomy preserves the one distinction the interpreter's
//! branching depends on: HTTP 419 ([`GatewayError::CsrfExpired`]) is never
//! folded into the generic [`GatewayError::Http`] kind.

pub mod client;
pub mod error;

pub use client::{ApiClient, ApiTransport, CSRF_EXPIRED_STATUS, DEFAULT_TIMEOUT_SECS};
pub use error::{GatewayError, Result};
