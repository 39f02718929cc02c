//! Integration tests for voice selection caches.
//!
//! # What is tested
//!
//! - `CachedVoicePreferences` serves repeated lookups from cache
//! - "No preference" is cached like a real value
//! - Lookup failures are not cached
//! - `set_voice` writes through and refreshes the cache
//! - `invalidate` forces the next lookup to hit the store

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockall::mock;
use mockall::predicate::eq;
use readaloud_core::{
    CachedVoicePreferences, ChannelId, InMemoryVoicePreferences, PreferenceError, VoiceId,
    VoicePreferencePort,
};

mock! {
    pub Prefs {}

    #[async_trait]
    impl VoicePreferencePort for Prefs {
        async fn voice_for(&self, channel: ChannelId) -> Result<Option<VoiceId>, PreferenceError>;
        async fn set_voice(&self, channel: ChannelId, voice: VoiceId) -> Result<(), PreferenceError>;
    }
}

const TTL: Duration = Duration::from_secs(60);

#[tokio::test]
async fn repeated_lookups_hit_store_once() {
    let mut store = MockPrefs::new();
    store
        .expect_voice_for()
        .with(eq(ChannelId::new(1)))
        .times(1)
        .returning(|_| Ok(Some(VoiceId::from("ko-KR-SunHiNeural"))));

    let cache = CachedVoicePreferences::new(Arc::new(store), TTL);
    for _ in 0..3 {
        assert_eq!(
            cache.voice_for(ChannelId::new(1)).await.unwrap(),
            Some(VoiceId::from("ko-KR-SunHiNeural"))
        );
    }
}

#[tokio::test]
async fn missing_preference_is_cached() {
    let mut store = MockPrefs::new();
    store.expect_voice_for().times(1).returning(|_| Ok(None));

    let cache = CachedVoicePreferences::new(Arc::new(store), TTL);
    assert_eq!(cache.voice_for(ChannelId::new(2)).await.unwrap(), None);
    assert_eq!(cache.voice_for(ChannelId::new(2)).await.unwrap(), None);
}

#[tokio::test]
async fn failures_are_not_cached() {
    let mut store = MockPrefs::new();
    let mut seq = mockall::Sequence::new();
    store
        .expect_voice_for()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Err(PreferenceError::Unavailable("kv timeout".to_string())));
    store
        .expect_voice_for()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(Some(VoiceId::from("pt-BR-FranciscaNeural"))));

    let cache = CachedVoicePreferences::new(Arc::new(store), TTL);
    assert!(cache.voice_for(ChannelId::new(3)).await.is_err());
    assert_eq!(
        cache.voice_for(ChannelId::new(3)).await.unwrap(),
        Some(VoiceId::from("pt-BR-FranciscaNeural"))
    );
}

#[tokio::test]
async fn set_voice_writes_through() {
    let inner = Arc::new(InMemoryVoicePreferences::new());
    let cache = CachedVoicePreferences::new(inner.clone(), TTL);
    let channel = ChannelId::new(4);

    assert_eq!(cache.voice_for(channel).await.unwrap(), None);
    cache
        .set_voice(channel, VoiceId::from("nl-NL-ColetteNeural"))
        .await
        .unwrap();

    assert_eq!(
        cache.voice_for(channel).await.unwrap(),
        Some(VoiceId::from("nl-NL-ColetteNeural"))
    );
    assert_eq!(
        inner.voice_for(channel).await.unwrap(),
        Some(VoiceId::from("nl-NL-ColetteNeural"))
    );
}

#[tokio::test]
async fn invalidate_rereads_store() {
    let inner = Arc::new(InMemoryVoicePreferences::new());
    let cache = CachedVoicePreferences::new(inner.clone(), TTL);
    let channel = ChannelId::new(5);

    assert_eq!(cache.voice_for(channel).await.unwrap(), None);

    // Written behind the cache's back.
    inner
        .set_voice(channel, VoiceId::from("sv-SE-SofieNeural"))
        .await
        .unwrap();
    assert_eq!(cache.voice_for(channel).await.unwrap(), None);

    cache.invalidate(channel).await;
    assert_eq!(
        cache.voice_for(channel).await.unwrap(),
        Some(VoiceId::from("sv-SE-SofieNeural"))
    );
}

#[test]
fn lookup_from_blocking_context() {
    let store = InMemoryVoicePreferences::new();
    tokio_test::block_on(store.set_voice(ChannelId::new(6), VoiceId::from("en-IE-EmilyNeural")))
        .unwrap();
    let voice = tokio_test::block_on(store.voice_for(ChannelId::new(6))).unwrap();
    assert_eq!(voice, Some(VoiceId::from("en-IE-EmilyNeural")));
}
