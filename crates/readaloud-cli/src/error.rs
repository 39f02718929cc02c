//! CLI-specific error types and exit codes.

use thiserror::Error;

use readaloud_core::{SettingsError, SynthesisError};
use readaloud_pipeline::PipelineError;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Settings could not be loaded or are invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] SettingsError),

    /// No synthesizer endpoint in any settings layer.
    #[error("No synthesizer endpoint configured (use --endpoint or READALOUD_ENDPOINT)")]
    MissingEndpoint,

    /// The requested output cannot be opened.
    #[error("Audio output error: {0}")]
    Output(String),

    /// The synthesizer failed.
    #[error("Synthesizer error: {0}")]
    Synthesis(#[from] SynthesisError),

    /// The narration pipeline failed.
    #[error("Playback error: {0}")]
    Pipeline(#[from] PipelineError),

    /// An utterance ended before all of its audio played.
    #[error("Narration ended early: {0}")]
    Narration(String),
}

impl CliError {
    /// Map error to an exit code (see sysexits.h).
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::MissingEndpoint => 78, // EX_CONFIG
            Self::Output(_) => 74,                         // EX_IOERR
            Self::Synthesis(_) => 69,                      // EX_UNAVAILABLE
            Self::Pipeline(_) | Self::Narration(_) => 1,
        }
    }
}
