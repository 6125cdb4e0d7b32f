//! Template engine for Colloquy.
//!
//! Collected conversation values flow outward through templates — into
//! step prompts, outbound API payloads, and formatted API responses:
//!
//! - [`render`] — `{name}` substitution into a prompt or message string.
//! - [`render_payload`] — recursive rendering of a JSON payload mapping's
//!   string leaves.
//! - [`format_response`] — collection-aware formatting of an API result via
//!   a step's `format_rules` (per-item template + join separator).
//!
//! Unresolved placeholders always fail with [`TemplateError`]; a silently
//! empty substitution would mask a missing collected field.

pub mod error;
pub mod format;
pub mod render;

pub use error::{Result, TemplateError};
pub use format::format_response;
pub use render::{render, render_object, render_payload};
