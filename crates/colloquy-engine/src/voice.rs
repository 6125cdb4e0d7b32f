//! Speech-to-text collaborator seam.
//!
//! The engine consumes transcription as a black box: audio bytes in, text
//! out, fed into the normal text-turn path. Nothing in the interpreter
//! depends on where the text came from.

use async_trait::async_trait;
use thiserror::Error;

/// Transcription failure. The engine treats every kind the same way — an
/// apologetic reply and no state change.
#[derive(Debug, Error)]
pub enum TranscribeError {
    /// The audio could not be transcribed.
    #[error("transcription failed: {0}")]
    Failed(String),
}

/// A speech-to-text backend.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe raw audio bytes into text.
    async fn transcribe(&self, audio: &[u8]) -> Result<String, TranscribeError>;
}
