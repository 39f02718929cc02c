//! Cached voice catalog.
//!
//! Listing voices is a network round-trip to the synthesizer, and the list
//! rarely changes. The catalog owns one cached copy with a time-to-live and
//! an explicit [`VoiceCatalog::invalidate`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::domain::{VoiceId, VoiceInfo};
use crate::ports::{SynthesisError, Synthesizer};

#[derive(Clone)]
struct CachedVoices {
    fetched_at: Instant,
    voices: Arc<[VoiceInfo]>,
}

/// Voice list cache in front of a [`Synthesizer`].
pub struct VoiceCatalog {
    synthesizer: Arc<dyn Synthesizer>,
    ttl: Duration,
    cache: RwLock<Option<CachedVoices>>,
}

impl VoiceCatalog {
    pub fn new(synthesizer: Arc<dyn Synthesizer>, ttl: Duration) -> Self {
        Self {
            synthesizer,
            ttl,
            cache: RwLock::new(None),
        }
    }

    /// The voice list, fetched if the cache is empty or older than the TTL.
    ///
    /// A failed refresh falls back to the stale list when there is one.
    pub async fn voices(&self) -> Result<Arc<[VoiceInfo]>, SynthesisError> {
        if let Some(cached) = self.fresh(self.cache.read().await.as_ref()) {
            return Ok(cached);
        }

        let mut cache = self.cache.write().await;
        // Another caller may have refreshed while we waited for the lock.
        if let Some(cached) = self.fresh(cache.as_ref()) {
            return Ok(cached);
        }

        match self.synthesizer.voices().await {
            Ok(list) => {
                let voices: Arc<[VoiceInfo]> = list.into();
                tracing::info!(
                    synthesizer = self.synthesizer.name(),
                    count = voices.len(),
                    "Voice catalog refreshed"
                );
                *cache = Some(CachedVoices {
                    fetched_at: Instant::now(),
                    voices: Arc::clone(&voices),
                });
                Ok(voices)
            }
            Err(e) => match cache.as_ref() {
                Some(stale) => {
                    tracing::warn!(error = %e, "Voice catalog refresh failed, serving stale list");
                    Ok(Arc::clone(&stale.voices))
                }
                None => Err(e),
            },
        }
    }

    /// Drop the cached list; the next lookup fetches again.
    pub async fn invalidate(&self) {
        *self.cache.write().await = None;
    }

    /// Whether `voice` is offered.
    ///
    /// Permissive when the list is empty or unavailable: an unlisted voice
    /// is left for the synthesizer to reject.
    pub async fn contains(&self, voice: &VoiceId) -> bool {
        match self.voices().await {
            Ok(voices) => voices.is_empty() || voices.iter().any(|v| &v.id == voice),
            Err(e) => {
                tracing::debug!(error = %e, voice = %voice, "Voice catalog unavailable");
                true
            }
        }
    }

    /// `candidate` if the catalog knows it, else `default`.
    pub async fn resolve(&self, candidate: Option<VoiceId>, default: &VoiceId) -> VoiceId {
        match candidate {
            Some(voice) if self.contains(&voice).await => voice,
            Some(voice) => {
                tracing::warn!(voice = %voice, fallback = %default, "Unknown voice, using default");
                default.clone()
            }
            None => default.clone(),
        }
    }

    fn fresh(&self, cached: Option<&CachedVoices>) -> Option<Arc<[VoiceInfo]>> {
        cached
            .filter(|c| c.fetched_at.elapsed() < self.ttl)
            .map(|c| Arc::clone(&c.voices))
    }
}
