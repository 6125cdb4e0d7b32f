//! Command catalog for Colloquy.
//!
//! Commands — the user-invocable intents of the bot — are defined entirely
//! in JSON sources, not code. This crate provides:
//!
//! - **Data model**: [`CommandDefinition`] / [`StepDefinition`] with a
//!   closed [`CommandKind`] enum and kind-specific required fields.
//! - **Loading**: [`CommandCatalog::load_dir`] merges arbitrarily many
//!   JSON sources into one immutable catalog.
//! - **Validation**: duplicate names, dangling `goto` targets, unreachable
//!   steps, and forced cycles are all fatal at load time, never at
//!   conversation time.

pub mod catalog;
pub mod definition;
pub mod error;

pub use catalog::CommandCatalog;
pub use definition::{
    ALLOWED_METHODS, ApiSpec, CommandDefinition, CommandKind, FormatRule, ResponseFormat,
    StepDefinition,
};
pub use error::{CatalogError, Result};
