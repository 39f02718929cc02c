//! Integration tests for `InterruptController` and `Narrator`.
//!
//! # What is tested
//!
//! - Superseding leaves exactly one active session, the new one
//! - The superseded producer lets go of its stream before the next starts
//! - `stop`, `detach` and `on_connection_empty` semantics
//! - Sink failure tears down the connection exactly once
//! - Unattached connections are rejected
//! - `Narrator` normalizes text and resolves the channel voice

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockall::mock;
use tokio::sync::mpsc;
use tokio::time::timeout;

use readaloud_core::{
    ChannelId, ConnectionError, ConnectionId, InMemoryVoicePreferences, NoopVoiceConnections,
    VoiceCatalog, VoiceConnectionPort, VoiceId, VoiceInfo, VoicePreferencePort,
};
use readaloud_pipeline::{
    InterruptController, InterruptReason, Narrator, NarrationEvent, PipelineError, SessionConfig,
    SessionOutcome, SessionState, TeardownReason, UtteranceRequest,
};

use common::{
    Script, ScriptedSynthesizer, broken_player, real_time_player, recording_player, speech,
};

mock! {
    pub Connections {}

    #[async_trait]
    impl VoiceConnectionPort for Connections {
        async fn disconnect(&self, connection: ConnectionId) -> Result<(), ConnectionError>;
    }
}

const CONN: ConnectionId = ConnectionId::new(7);
const VOICE: &str = "en-US-AriaNeural";
const WAIT: Duration = Duration::from_secs(5);

fn config() -> SessionConfig {
    SessionConfig {
        format_hint: Some("wav".to_string()),
        ..SessionConfig::default()
    }
}

fn controller(
    synth: ScriptedSynthesizer,
) -> (InterruptController, mpsc::UnboundedReceiver<NarrationEvent>) {
    InterruptController::new(Arc::new(synth), Arc::new(NoopVoiceConnections), config())
}

/// Receive events until `pred` matches one, returning everything seen.
async fn events_until(
    rx: &mut mpsc::UnboundedReceiver<NarrationEvent>,
    pred: impl Fn(&NarrationEvent) -> bool,
) -> Vec<NarrationEvent> {
    timeout(WAIT, async {
        let mut seen = Vec::new();
        while let Some(event) = rx.recv().await {
            let done = pred(&event);
            seen.push(event);
            if done {
                break;
            }
        }
        seen
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn test_supersede_leaves_one_active_session() {
    let synth = ScriptedSynthesizer::new()
        .with("first", Script::ThenHang(speech(2.0)))
        .with("second", Script::ThenHang(speech(2.0)));
    let (ctl, mut events) = controller(synth);
    // Real-time pacing keeps the first utterance playing when it is replaced.
    let (player, _frames) = real_time_player();
    ctl.attach(CONN, player);

    let a = ctl
        .supersede(UtteranceRequest::new(CONN, "first", VOICE))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(ctl.active_session(CONN).await, Some(a));
    assert_eq!(ctl.session_state(CONN).await, Some(SessionState::Playing));

    let b = ctl
        .supersede(UtteranceRequest::new(CONN, "second", VOICE))
        .await
        .unwrap();
    assert_ne!(a, b);
    assert_eq!(ctl.active_session(CONN).await, Some(b));
    assert_eq!(ctl.session_state(CONN).await, Some(SessionState::Playing));

    let seen = events_until(&mut events, |e| {
        matches!(e, NarrationEvent::SessionStarted { session, .. } if *session == b)
    })
    .await;
    assert!(seen.contains(&NarrationEvent::SessionInterrupted {
        connection: CONN,
        session: a,
        reason: InterruptReason::Superseded,
    }));
    assert!(!seen.iter().any(|e| matches!(
        e,
        NarrationEvent::SessionFinished { session, outcome: SessionOutcome::Completed, .. }
            if *session == a
    )));

    ctl.stop(CONN).await;
}

#[tokio::test]
async fn test_superseded_producer_exits_before_next_starts() {
    let synth = ScriptedSynthesizer::new()
        .with("A", Script::ThenHang(speech(2.0)))
        .with("B", Script::ThenHang(speech(2.0)));
    let log = synth.log.clone();
    let (ctl, mut events) = controller(synth);
    let (player, _frames) = real_time_player();
    ctl.attach(CONN, player);

    let a = ctl
        .supersede(UtteranceRequest::new(CONN, "A", VOICE))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;
    // A is mid-playback, its producer still holding the stream open.
    assert_eq!(ctl.session_state(CONN).await, Some(SessionState::Playing));
    assert!(log.position("dropped:A").is_none());
    let b = ctl
        .supersede(UtteranceRequest::new(CONN, "B", VOICE))
        .await
        .unwrap();

    let seen = events_until(&mut events, |e| {
        matches!(e, NarrationEvent::SessionStarted { session, .. } if *session == b)
    })
    .await;
    assert!(seen.contains(&NarrationEvent::SessionInterrupted {
        connection: CONN,
        session: a,
        reason: InterruptReason::Superseded,
    }));

    // Let B's producer get going, then check the order of stream events.
    timeout(WAIT, async {
        while log.position("started:B").is_none() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    let dropped_a = log.position("dropped:A").unwrap();
    let started_b = log.position("started:B").unwrap();
    assert!(dropped_a < started_b, "{:?}", log.entries());

    ctl.stop(CONN).await;
}

#[tokio::test]
async fn test_stop_cancels_without_replacement() {
    let synth = ScriptedSynthesizer::new().with("hello", Script::ThenHang(Vec::new()));
    let (ctl, mut events) = controller(synth);
    let (player, _frames) = recording_player();
    ctl.attach(CONN, player);

    let id = ctl
        .supersede(UtteranceRequest::new(CONN, "hello", VOICE))
        .await
        .unwrap();
    assert_eq!(ctl.stop(CONN).await, Some(SessionOutcome::Cancelled));
    assert_eq!(ctl.active_session(CONN).await, None);
    assert!(ctl.is_attached(CONN));

    // A second stop has nothing to do.
    assert_eq!(ctl.stop(CONN).await, None);

    let seen = events_until(&mut events, |e| {
        matches!(e, NarrationEvent::SessionFinished { .. })
    })
    .await;
    assert!(seen.contains(&NarrationEvent::SessionInterrupted {
        connection: CONN,
        session: id,
        reason: InterruptReason::Stopped,
    }));
    assert!(matches!(
        seen.last(),
        Some(NarrationEvent::SessionFinished { outcome: SessionOutcome::Cancelled, .. })
    ));
}

#[tokio::test]
async fn test_finished_session_is_cleared() {
    let synth = ScriptedSynthesizer::new()
        .with("short", Script::Items(speech(0.1).into_iter().map(Ok).collect()));
    let (ctl, mut events) = controller(synth);
    let (player, _frames) = recording_player();
    ctl.attach(CONN, player);

    let id = ctl
        .supersede(UtteranceRequest::new(CONN, "short", VOICE))
        .await
        .unwrap();

    let seen = events_until(&mut events, |e| {
        matches!(e, NarrationEvent::SessionFinished { .. })
    })
    .await;
    assert!(matches!(
        seen.last(),
        Some(NarrationEvent::SessionFinished { session, outcome: SessionOutcome::Completed, .. })
            if *session == id
    ));
    assert_eq!(ctl.active_session(CONN).await, None);
    assert_eq!(ctl.session_state(CONN).await, None);

    // Nothing is playing, so stopping interrupts nothing.
    assert_eq!(ctl.stop(CONN).await, None);
}

#[tokio::test]
async fn test_connection_empty_disconnects_once() {
    let synth = ScriptedSynthesizer::new().with("hello", Script::ThenHang(speech(0.2)));
    let mut connections = MockConnections::new();
    connections
        .expect_disconnect()
        .withf(|connection| *connection == CONN)
        .times(1)
        .returning(|_| Ok(()));

    let (ctl, mut events) =
        InterruptController::new(Arc::new(synth), Arc::new(connections), config());
    let (player, _frames) = recording_player();
    ctl.attach(CONN, player);

    let id = ctl
        .supersede(UtteranceRequest::new(CONN, "hello", VOICE))
        .await
        .unwrap();
    ctl.on_connection_empty(CONN).await.unwrap();
    assert!(!ctl.is_attached(CONN));

    let seen = events_until(&mut events, |e| {
        matches!(e, NarrationEvent::ConnectionTornDown { .. })
    })
    .await;
    assert!(seen.contains(&NarrationEvent::SessionInterrupted {
        connection: CONN,
        session: id,
        reason: InterruptReason::ConnectionEmpty,
    }));
    assert_eq!(
        seen.last(),
        Some(&NarrationEvent::ConnectionTornDown {
            connection: CONN,
            reason: TeardownReason::ChannelEmpty,
        })
    );

    // Gone now.
    assert!(matches!(
        ctl.on_connection_empty(CONN).await,
        Err(PipelineError::NotAttached(_))
    ));
}

#[tokio::test]
async fn test_disconnect_failure_is_reported() {
    let mut connections = MockConnections::new();
    connections
        .expect_disconnect()
        .times(1)
        .returning(|c| Err(ConnectionError::NotFound(c)));

    let (ctl, _events) = InterruptController::new(
        Arc::new(ScriptedSynthesizer::new()),
        Arc::new(connections),
        config(),
    );
    let (player, _frames) = recording_player();
    ctl.attach(CONN, player);

    assert!(matches!(
        ctl.on_connection_empty(CONN).await,
        Err(PipelineError::Connection(ConnectionError::NotFound(_)))
    ));
}

#[tokio::test]
async fn test_sink_failure_tears_down_connection() {
    let synth = ScriptedSynthesizer::new().with("hello", Script::ThenHang(speech(0.2)));
    let mut connections = MockConnections::new();
    connections
        .expect_disconnect()
        .withf(|connection| *connection == CONN)
        .times(1)
        .returning(|_| Ok(()));

    let (ctl, mut events) =
        InterruptController::new(Arc::new(synth), Arc::new(connections), config());
    ctl.attach(CONN, broken_player());

    ctl.supersede(UtteranceRequest::new(CONN, "hello", VOICE))
        .await
        .unwrap();

    let seen = events_until(&mut events, |e| {
        matches!(e, NarrationEvent::ConnectionTornDown { .. })
    })
    .await;
    assert!(seen.iter().any(|e| matches!(
        e,
        NarrationEvent::SessionFinished { outcome: SessionOutcome::SinkFailed(_), .. }
    )));
    assert_eq!(
        seen.last(),
        Some(&NarrationEvent::ConnectionTornDown {
            connection: CONN,
            reason: TeardownReason::SinkFailure,
        })
    );
    assert!(!ctl.is_attached(CONN));
}

#[tokio::test]
async fn test_detach_forgets_without_disconnect() {
    let synth = ScriptedSynthesizer::new().with("hello", Script::ThenHang(Vec::new()));
    let mut connections = MockConnections::new();
    connections.expect_disconnect().never();

    let (ctl, mut events) =
        InterruptController::new(Arc::new(synth), Arc::new(connections), config());
    let (player, _frames) = recording_player();
    ctl.attach(CONN, player);

    let id = ctl
        .supersede(UtteranceRequest::new(CONN, "hello", VOICE))
        .await
        .unwrap();
    assert!(ctl.detach(CONN).await);
    assert!(!ctl.is_attached(CONN));
    assert!(!ctl.detach(CONN).await);

    let seen = events_until(&mut events, |e| {
        matches!(e, NarrationEvent::SessionInterrupted { .. })
    })
    .await;
    assert_eq!(
        seen.last(),
        Some(&NarrationEvent::SessionInterrupted {
            connection: CONN,
            session: id,
            reason: InterruptReason::Detached,
        })
    );
}

#[tokio::test]
async fn test_unattached_connection_rejected() {
    let (ctl, _events) = controller(ScriptedSynthesizer::new());

    let result = ctl
        .supersede(UtteranceRequest::new(ConnectionId::new(99), "hello", VOICE))
        .await;
    assert!(matches!(result, Err(PipelineError::NotAttached(c)) if c.get() == 99));
    assert_eq!(ctl.stop(ConnectionId::new(99)).await, None);
    assert!(!ctl.is_attached(ConnectionId::new(99)));
}

#[tokio::test]
async fn test_sessions_on_different_connections_are_independent() {
    let other = ConnectionId::new(8);
    let synth = ScriptedSynthesizer::new()
        .with("left", Script::ThenHang(speech(0.2)))
        .with("right", Script::ThenHang(speech(0.2)));
    let (ctl, _events) = controller(synth);
    let (left_player, _left) = recording_player();
    let (right_player, _right) = recording_player();
    ctl.attach(CONN, left_player);
    ctl.attach(other, right_player);

    let left = ctl
        .supersede(UtteranceRequest::new(CONN, "left", VOICE))
        .await
        .unwrap();
    let right = ctl
        .supersede(UtteranceRequest::new(other, "right", VOICE))
        .await
        .unwrap();
    assert_eq!(ctl.active_session(other).await, Some(right));

    ctl.stop(other).await;
    assert_eq!(ctl.active_session(CONN).await, Some(left));
    assert_eq!(ctl.active_session(other).await, None);

    ctl.stop(CONN).await;
}

// ── Narrator ───────────────────────────────────────────────────────

fn narrator(
    synth: ScriptedSynthesizer,
    preferences: Arc<dyn VoicePreferencePort>,
) -> (Narrator, mpsc::UnboundedReceiver<NarrationEvent>) {
    let synth = Arc::new(synth);
    let (ctl, events) =
        InterruptController::new(synth.clone(), Arc::new(NoopVoiceConnections), config());
    let catalog = Arc::new(VoiceCatalog::new(synth, Duration::from_secs(60)));
    (Narrator::new(ctl, preferences, catalog, VOICE), events)
}

#[tokio::test]
async fn test_narrator_skips_unspeakable_text() {
    let synth = ScriptedSynthesizer::new();
    let log = synth.log.clone();
    let (narrator, _events) = narrator(synth, Arc::new(InMemoryVoicePreferences::new()));
    let (player, _frames) = recording_player();
    narrator.controller().attach(CONN, player);

    let session = narrator
        .narrate(CONN, ChannelId::new(1), "   \n\t ")
        .await
        .unwrap();
    assert_eq!(session, None);
    assert!(log.entries().is_empty());
}

#[tokio::test]
async fn test_narrator_cleans_emojis_and_uses_channel_voice() {
    let synth = ScriptedSynthesizer::new()
        .with_voices(vec![
            VoiceInfo::new("en-US-AriaNeural", "en-US"),
            VoiceInfo::new("en-GB-RyanNeural", "en-GB"),
        ])
        .with("hi wave", Script::Items(speech(0.1).into_iter().map(Ok).collect()));
    let log = synth.log.clone();
    let voices_used = synth.voices_used.clone();

    let preferences = Arc::new(InMemoryVoicePreferences::new());
    preferences
        .set_voice(ChannelId::new(3), VoiceId::from("en-GB-RyanNeural"))
        .await
        .unwrap();

    let (narrator, mut events) = narrator(synth, preferences);
    let (player, _frames) = recording_player();
    narrator.controller().attach(CONN, player);

    let session = narrator
        .narrate(CONN, ChannelId::new(3), "  hi   <:wave:123456>  ")
        .await
        .unwrap();
    assert!(session.is_some());

    events_until(&mut events, |e| {
        matches!(e, NarrationEvent::SessionFinished { .. })
    })
    .await;
    assert_eq!(log.entries().first().map(String::as_str), Some("started:hi wave"));
    assert_eq!(voices_used.entries(), vec!["en-GB-RyanNeural".to_string()]);
}

#[tokio::test]
async fn test_narrator_falls_back_for_unknown_voice() {
    let synth = ScriptedSynthesizer::new()
        .with_voices(vec![VoiceInfo::new("en-US-AriaNeural", "en-US")])
        .with("hello", Script::Items(speech(0.1).into_iter().map(Ok).collect()));
    let voices_used = synth.voices_used.clone();

    let preferences = Arc::new(InMemoryVoicePreferences::new());
    preferences
        .set_voice(ChannelId::new(3), VoiceId::from("xx-XX-Retired"))
        .await
        .unwrap();

    let (narrator, mut events) = narrator(synth, preferences);
    let (player, _frames) = recording_player();
    narrator.controller().attach(CONN, player);

    narrator
        .narrate(CONN, ChannelId::new(3), "hello")
        .await
        .unwrap();
    events_until(&mut events, |e| {
        matches!(e, NarrationEvent::SessionFinished { .. })
    })
    .await;
    assert_eq!(voices_used.entries(), vec![VOICE.to_string()]);
}

#[tokio::test]
async fn test_narrator_stop() {
    let synth = ScriptedSynthesizer::new().with("hello", Script::ThenHang(Vec::new()));
    let (narrator, _events) = narrator(synth, Arc::new(InMemoryVoicePreferences::new()));
    let (player, _frames) = recording_player();
    narrator.controller().attach(CONN, player);

    narrator
        .narrate(CONN, ChannelId::new(1), "hello")
        .await
        .unwrap();
    assert_eq!(narrator.stop(CONN).await, Some(SessionOutcome::Cancelled));
}
