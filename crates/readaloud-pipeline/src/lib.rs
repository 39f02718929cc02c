//! Streaming synthesis-to-playback pipeline for readaloud.
//!
//! A synthesizer pushes compressed audio chunks; a playback sink pulls
//! fixed-size PCM frames at real-time cadence. In between:
//!
//! ```text
//! Synthesizer ─▶ producer task ─▶ ChunkQueue ─▶ PullSource ─▶ FrameDecoder ─▶ PlaybackSink
//!                     ▲                                                            │
//!                     └──────────── PlaybackSession (cancel / join) ◀──────────────┘
//! ```
//!
//! [`InterruptController`] keeps at most one [`PlaybackSession`] per voice
//! connection, and [`Narrator`] is the text-in entry point in front of it.

#![deny(unused_crate_dependencies)]

pub mod controller;
pub mod decoder;
pub mod error;
pub mod events;
pub mod frame;
pub mod output;
pub mod player;
mod producer;
pub mod pull_source;
pub mod queue;
mod resample;
pub mod service;
pub mod session;
pub mod sink;

// Re-export key types for convenience
pub use controller::{InterruptController, UtteranceRequest};
pub use decoder::FrameDecoder;
pub use error::{DecodeError, PipelineError};
pub use events::{InterruptReason, NarrationEvent, TeardownReason};
pub use frame::{FrameSource, FrameSpec, PcmFrame};
pub use output::{ChannelOutput, FrameOutput, NullOutput, WriterOutput};
pub use player::{PacedPlayer, Pacing};
pub use producer::SessionMetrics;
pub use pull_source::PullSource;
pub use queue::ChunkQueue;
pub use service::Narrator;
pub use session::{
    PlaybackSession, SessionConfig, SessionId, SessionOutcome, SessionReport, SessionState,
};
pub use sink::{PlaybackCompletion, PlaybackHandle, PlaybackOutcome, PlaybackSink};

// Used by the integration tests only
#[cfg(test)]
use mockall as _;
