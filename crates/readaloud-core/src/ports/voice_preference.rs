//! Per-channel voice preference lookup.
//!
//! Backed by an external key-value store in production; this crate only
//! ships the port and an in-memory implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::domain::{ChannelId, VoiceId};

/// Errors from a preference store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PreferenceError {
    /// The store could not be reached.
    #[error("Voice preference store unavailable: {0}")]
    Unavailable(String),
}

/// Channel → voice lookup.
#[async_trait]
pub trait VoicePreferencePort: Send + Sync {
    /// The voice configured for `channel`, if any.
    async fn voice_for(&self, channel: ChannelId) -> Result<Option<VoiceId>, PreferenceError>;

    /// Store a voice for `channel`.
    async fn set_voice(&self, channel: ChannelId, voice: VoiceId) -> Result<(), PreferenceError>;
}

/// In-memory preference store.
#[derive(Debug, Default)]
pub struct InMemoryVoicePreferences {
    voices: RwLock<HashMap<ChannelId, VoiceId>>,
}

impl InMemoryVoicePreferences {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VoicePreferencePort for InMemoryVoicePreferences {
    async fn voice_for(&self, channel: ChannelId) -> Result<Option<VoiceId>, PreferenceError> {
        Ok(self.voices.read().await.get(&channel).cloned())
    }

    async fn set_voice(&self, channel: ChannelId, voice: VoiceId) -> Result<(), PreferenceError> {
        self.voices.write().await.insert(channel, voice);
        Ok(())
    }
}
