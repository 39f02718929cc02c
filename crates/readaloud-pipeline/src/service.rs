//! `Narrator`: message text in, speech on a voice connection out.
//!
//! Sits in front of the [`InterruptController`]: it normalizes the text,
//! picks the voice for the channel, then supersedes whatever is playing.

use std::sync::Arc;

use readaloud_core::{
    ChannelId, ConnectionId, Settings, VoiceCatalog, VoiceId, VoicePreferencePort,
    normalize_utterance,
};

use crate::controller::{InterruptController, UtteranceRequest};
use crate::error::PipelineError;
use crate::session::{SessionId, SessionOutcome};

pub struct Narrator {
    controller: InterruptController,
    preferences: Arc<dyn VoicePreferencePort>,
    catalog: Arc<VoiceCatalog>,
    default_voice: VoiceId,
}

impl Narrator {
    pub fn new(
        controller: InterruptController,
        preferences: Arc<dyn VoicePreferencePort>,
        catalog: Arc<VoiceCatalog>,
        default_voice: impl Into<VoiceId>,
    ) -> Self {
        Self {
            controller,
            preferences,
            catalog,
            default_voice: default_voice.into(),
        }
    }

    /// Like [`new`](Self::new), with the default voice taken from settings.
    pub fn from_settings(
        controller: InterruptController,
        preferences: Arc<dyn VoicePreferencePort>,
        catalog: Arc<VoiceCatalog>,
        settings: &Settings,
    ) -> Self {
        Self::new(
            controller,
            preferences,
            catalog,
            settings.effective_default_voice(),
        )
    }

    /// Speak `raw_text` on `connection`, interrupting anything already
    /// playing there.
    ///
    /// Returns `Ok(None)` when nothing speakable is left after
    /// normalization; the current session keeps playing in that case.
    pub async fn narrate(
        &self,
        connection: ConnectionId,
        channel: ChannelId,
        raw_text: &str,
    ) -> Result<Option<SessionId>, PipelineError> {
        let Some(text) = normalize_utterance(raw_text) else {
            tracing::debug!(connection = %connection, "Nothing to speak after normalization");
            return Ok(None);
        };

        let voice = self.voice_for(channel).await;
        let session = self
            .controller
            .supersede(UtteranceRequest::new(connection, text, voice))
            .await?;
        Ok(Some(session))
    }

    /// Stop whatever is playing on `connection`.
    pub async fn stop(&self, connection: ConnectionId) -> Option<SessionOutcome> {
        self.controller.stop(connection).await
    }

    /// The channel's preferred voice if the catalog offers it, else the
    /// default. Lookup failures fall back to the default.
    pub async fn voice_for(&self, channel: ChannelId) -> VoiceId {
        let preferred = match self.preferences.voice_for(channel).await {
            Ok(voice) => voice,
            Err(e) => {
                tracing::warn!(channel = %channel, error = %e, "Voice preference lookup failed");
                None
            }
        };
        self.catalog.resolve(preferred, &self.default_voice).await
    }

    pub const fn default_voice(&self) -> &VoiceId {
        &self.default_voice
    }

    pub const fn controller(&self) -> &InterruptController {
        &self.controller
    }
}
