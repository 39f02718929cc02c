//! Core domain types and port definitions for readaloud.
//!
//! This crate has no audio or transport dependencies. It defines what flows
//! through the narration pipeline ([`Chunk`], identifiers), the collaborators
//! the pipeline talks to ([`Synthesizer`], [`VoicePreferencePort`],
//! [`VoiceConnectionPort`]), settings, and the voice-selection caches.

#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod ports;
pub mod services;
pub mod settings;
pub mod text;

// Re-export commonly used types for convenience
pub use domain::{ChannelId, Chunk, ChunkKind, ConnectionId, VoiceId, VoiceInfo};
pub use ports::{
    ChunkStream, ConnectionError, InMemoryVoicePreferences, NoopVoiceConnections,
    PreferenceError, SynthesisError, SynthesisRequest, Synthesizer, VoiceConnectionPort,
    VoicePreferencePort,
};
pub use services::{CachedVoicePreferences, VoiceCatalog};
pub use settings::{DEFAULT_VOICE, Settings, SettingsError};
pub use text::{clean_emojis, normalize_utterance};

// Used by the integration tests only
#[cfg(test)]
use mockall as _;
#[cfg(test)]
use tokio_test as _;
