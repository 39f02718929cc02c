//! Pipeline error types.

use readaloud_core::{ConnectionError, ConnectionId};

/// Errors surfaced by the narration pipeline.
///
/// Decode failures never appear here: the decoder converts them to
/// end-of-stream.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// No playback sink is attached for the connection.
    #[error("No voice connection attached for {0}")]
    NotAttached(ConnectionId),

    /// `start` was called on a session that already left `Idle`.
    #[error("Playback session was already started or cancelled")]
    AlreadyStarted,

    /// The playback sink refused or failed to take a source.
    #[error("Playback sink failed: {0}")]
    Playback(String),

    /// The frame output's receiving side is gone.
    #[error("Frame output closed")]
    OutputClosed,

    /// Writing a frame to the output failed.
    #[error("Audio output failed: {0}")]
    Output(String),

    /// The voice transport failed during teardown.
    #[error("Voice connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// IO error (raw PCM writers).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a decoder stopped early. Logged, then reported as end-of-stream.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Probing or decoding the compressed stream failed.
    #[error("Undecodable audio stream: {0}")]
    Symphonia(#[from] symphonia::core::errors::Error),

    /// The container has no track with a known codec.
    #[error("No decodable audio track")]
    NoTrack,

    /// Audio resampling failed.
    #[error("Audio resampling failed: {0}")]
    Resample(String),
}
