//! # colloquy-engine
//!
//! The conversation interpreter — the orchestrating core of Colloquy.
//!
//! Given an identity, its stored state, and the command catalog, the
//! [`Interpreter`] resolves each inbound turn: fuzzy-matching new intents,
//! validating responses against the current step, following `goto`
//! branches and confirmation cycles, executing api steps through the
//! gateway (with session gating and CSRF-expiry recovery), and rendering
//! prompts and results through the template engine.
//!
//! ```text
//! input ─> slash command? ─> login dialogue? ─> session gate
//!             │                                    │
//!             └──> reply                 active conversation?
//!                                   yes ──┤               ├── no
//!                            step machine │               │ fuzzy match
//!                        (validate, store,│               │ (simple reply
//!                         goto, api call) │               │  or new state)
//!                                         └──> reply <────┘
//! ```

pub mod config;
pub mod error;
pub mod interpreter;
pub mod messages;
pub mod reply;
pub mod voice;

pub use config::{DEFAULT_MAX_INVALID_ATTEMPTS, EngineConfig};
pub use error::{EngineError, Result};
pub use interpreter::Interpreter;
pub use reply::Reply;
pub use voice::{TranscribeError, Transcriber};
