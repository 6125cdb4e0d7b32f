//! # colloquy-store
//!
//! Persistence for Colloquy.
//!
//! SQLite-backed storage for the two per-identity records the engine
//! needs between turns:
//!
//! - [`SessionRecord`] — authentication state (credential reference,
//!   bearer token, last login), managed by [`SessionStore`];
//! - [`ConversationState`] — the active conversation position and
//!   collected values, managed by [`ConversationStore`].
//!
//! Both stores share one [`Database`] handle (WAL mode, async access via
//! `spawn_blocking`). Schema changes go through versioned migrations in
//! [`migration`].

pub mod conversation;
pub mod db;
pub mod error;
pub mod migration;
pub mod session;

// ── re-exports ───────────────────────────────────────────────────────

pub use conversation::{ConversationState, ConversationStore};
pub use db::Database;
pub use error::{StoreError, StoreResult};
pub use session::{SessionRecord, SessionStore};
