//! Write-through cache in front of a [`VoicePreferencePort`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{ChannelId, VoiceId};
use crate::ports::{PreferenceError, VoicePreferencePort};

struct CachedPreference {
    voice: Option<VoiceId>,
    fetched_at: Instant,
}

/// Caches channel preferences (including "no preference") for a TTL.
///
/// Lookup failures are not cached.
pub struct CachedVoicePreferences {
    inner: Arc<dyn VoicePreferencePort>,
    ttl: Duration,
    entries: RwLock<HashMap<ChannelId, CachedPreference>>,
}

impl CachedVoicePreferences {
    pub fn new(inner: Arc<dyn VoicePreferencePort>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Forget the cached preference for `channel`.
    pub async fn invalidate(&self, channel: ChannelId) {
        self.entries.write().await.remove(&channel);
    }
}

#[async_trait]
impl VoicePreferencePort for CachedVoicePreferences {
    async fn voice_for(&self, channel: ChannelId) -> Result<Option<VoiceId>, PreferenceError> {
        if let Some(entry) = self.entries.read().await.get(&channel) {
            if entry.fetched_at.elapsed() < self.ttl {
                return Ok(entry.voice.clone());
            }
        }

        let voice = self.inner.voice_for(channel).await?;
        self.entries.write().await.insert(
            channel,
            CachedPreference {
                voice: voice.clone(),
                fetched_at: Instant::now(),
            },
        );
        Ok(voice)
    }

    async fn set_voice(&self, channel: ChannelId, voice: VoiceId) -> Result<(), PreferenceError> {
        self.inner.set_voice(channel, voice.clone()).await?;
        self.entries.write().await.insert(
            channel,
            CachedPreference {
                voice: Some(voice),
                fetched_at: Instant::now(),
            },
        );
        Ok(())
    }
}
