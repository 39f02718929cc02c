//! Synthesizer port.
//!
//! The synthesizer is an opaque chunk source: given text and a voice it
//! yields an ordered, asynchronous sequence of [`Chunk`]s. Implementations
//! own the wire protocol; the pipeline only sees chunks.

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use thiserror::Error;

use crate::domain::{Chunk, VoiceId, VoiceInfo};

/// Stream of chunks for one utterance.
pub type ChunkStream = BoxStream<'static, Result<Chunk, SynthesisError>>;

/// One utterance to synthesize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisRequest {
    /// Plain text; emoji markup has already been stripped.
    pub text: String,
    pub voice: VoiceId,
}

impl SynthesisRequest {
    pub fn new(text: impl Into<String>, voice: impl Into<VoiceId>) -> Self {
        Self {
            text: text.into(),
            voice: voice.into(),
        }
    }
}

/// Errors raised by a synthesizer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SynthesisError {
    /// The synthesizer produced no audio for this input (e.g. whitespace only).
    #[error("No audio was produced for the utterance")]
    NoAudio,

    /// The connection to the synthesizer failed or dropped mid-stream.
    #[error("Synthesizer transport failed: {0}")]
    Transport(String),

    /// The synthesizer refused the request (unknown voice, bad input).
    #[error("Synthesizer rejected the request: {0}")]
    Rejected(String),
}

/// Port for text-to-speech synthesizers.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Open a chunk stream for `request`.
    ///
    /// May fail up front (e.g. [`SynthesisError::NoAudio`]) or yield errors
    /// from the stream itself.
    async fn stream(&self, request: &SynthesisRequest) -> Result<ChunkStream, SynthesisError>;

    /// Voices this synthesizer offers. Empty when the backend cannot list them.
    async fn voices(&self) -> Result<Vec<VoiceInfo>, SynthesisError> {
        Ok(Vec::new())
    }

    /// Short name for logs.
    fn name(&self) -> &str;
}
