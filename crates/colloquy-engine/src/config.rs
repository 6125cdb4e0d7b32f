//! Engine tuning knobs.

use colloquy_match::DEFAULT_THRESHOLD;

/// How many consecutive invalid inputs on one step abort the conversation.
pub const DEFAULT_MAX_INVALID_ATTEMPTS: u32 = 3;

/// Interpreter configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Inclusive similarity threshold for intent matching.
    pub match_threshold: f64,
    /// Retry bound for validation failures on a single step. Without a
    /// bound a user could be stuck re-prompting forever.
    pub max_invalid_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            match_threshold: DEFAULT_THRESHOLD,
            max_invalid_attempts: DEFAULT_MAX_INVALID_ATTEMPTS,
        }
    }
}
