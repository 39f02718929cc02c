//! `InterruptController`: one active session per voice connection.
//!
//! # Locking discipline
//!
//! The slot map uses a std `Mutex` and is only held to look up, insert or
//! remove a slot, never across an `.await`. Each slot has its own tokio
//! `Mutex`, held for the whole of `supersede` so the previous session has
//! fully exited (queue closed, producer joined) before the next one starts.
//! The report loop takes the same slot lock, so it never observes a
//! half-replaced slot.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError, Weak};

use tokio::sync::{Mutex, mpsc};

use readaloud_core::{ConnectionId, Synthesizer, VoiceConnectionPort, VoiceId};

use crate::error::PipelineError;
use crate::events::{InterruptReason, NarrationEvent, TeardownReason};
use crate::session::{
    PlaybackSession, SessionConfig, SessionId, SessionOutcome, SessionReport, SessionState,
};
use crate::sink::PlaybackSink;

/// Text and voice to speak on a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtteranceRequest {
    pub connection: ConnectionId,
    pub text: String,
    pub voice: VoiceId,
}

impl UtteranceRequest {
    pub fn new(connection: ConnectionId, text: impl Into<String>, voice: impl Into<VoiceId>) -> Self {
        Self {
            connection,
            text: text.into(),
            voice: voice.into(),
        }
    }
}

struct ConnectionSlot {
    sink: Arc<dyn PlaybackSink>,
    active: Option<PlaybackSession>,
}

type SharedSlot = Arc<Mutex<ConnectionSlot>>;

struct Inner {
    synthesizer: Arc<dyn Synthesizer>,
    connections: Arc<dyn VoiceConnectionPort>,
    config: SessionConfig,
    slots: StdMutex<HashMap<ConnectionId, SharedSlot>>,
    events: mpsc::UnboundedSender<NarrationEvent>,
    reports: mpsc::UnboundedSender<SessionReport>,
}

/// Coordinates playback sessions across voice connections.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct InterruptController {
    inner: Arc<Inner>,
}

impl InterruptController {
    /// Create a controller and the receiver for its events.
    ///
    /// Spawns the report loop, so this must be called inside a tokio runtime.
    pub fn new(
        synthesizer: Arc<dyn Synthesizer>,
        connections: Arc<dyn VoiceConnectionPort>,
        config: SessionConfig,
    ) -> (Self, mpsc::UnboundedReceiver<NarrationEvent>) {
        let (events, event_rx) = mpsc::unbounded_channel();
        let (reports, report_rx) = mpsc::unbounded_channel();

        let inner = Arc::new(Inner {
            synthesizer,
            connections,
            config,
            slots: StdMutex::new(HashMap::new()),
            events,
            reports,
        });
        spawn_report_loop(Arc::downgrade(&inner), report_rx);

        (Self { inner }, event_rx)
    }

    // ── Connections ────────────────────────────────────────────────

    /// Register the playback sink for `connection`.
    ///
    /// Re-attaching replaces the sink; a session still playing on the old
    /// one is cancelled.
    pub fn attach(&self, connection: ConnectionId, sink: Arc<dyn PlaybackSink>) {
        let slot = Arc::new(Mutex::new(ConnectionSlot { sink, active: None }));
        let previous = self.inner.slots().insert(connection, slot);
        if previous.is_some() {
            tracing::warn!(connection = %connection, "Replacing attached playback sink");
        } else {
            tracing::info!(connection = %connection, "Voice connection attached");
        }
        // Dropping the old slot drops (and so cancels) its session.
    }

    /// Stop playback and forget `connection` without disconnecting it.
    ///
    /// Returns `false` if the connection was not attached.
    pub async fn detach(&self, connection: ConnectionId) -> bool {
        let Some(slot) = self.inner.slot(connection) else {
            return false;
        };
        let mut guard = slot.lock().await;
        if !self.inner.is_current(connection, &slot) {
            return false;
        }
        self.inner
            .interrupt(connection, &mut guard, InterruptReason::Detached)
            .await;
        guard.sink.stop();
        self.inner.forget(connection, &slot);
        tracing::info!(connection = %connection, "Voice connection detached");
        true
    }

    pub fn is_attached(&self, connection: ConnectionId) -> bool {
        self.inner.slots().contains_key(&connection)
    }

    // ── Sessions ───────────────────────────────────────────────────

    /// Cancel whatever is playing on the connection and start `request`.
    ///
    /// The new session's producer is not spawned until the previous
    /// session's queue is closed and its producer has exited.
    pub async fn supersede(&self, request: UtteranceRequest) -> Result<SessionId, PipelineError> {
        let connection = request.connection;
        let slot = self
            .inner
            .slot(connection)
            .ok_or(PipelineError::NotAttached(connection))?;
        let mut slot = slot.lock().await;

        self.inner
            .interrupt(connection, &mut slot, InterruptReason::Superseded)
            .await;

        let mut session = PlaybackSession::new(
            connection,
            Arc::clone(&self.inner.synthesizer),
            Arc::clone(&slot.sink),
            self.inner.config.clone(),
        )
        .with_reporter(self.inner.reports.clone());
        session.start(request.text, request.voice.clone())?;

        let id = session.id();
        self.inner.emit(NarrationEvent::SessionStarted {
            connection,
            session: id,
            voice: request.voice,
        });
        slot.active = Some(session);
        Ok(id)
    }

    /// Cancel the active session on `connection` with no replacement.
    ///
    /// Returns the interrupted session's outcome, or `None` if nothing was
    /// playing.
    pub async fn stop(&self, connection: ConnectionId) -> Option<SessionOutcome> {
        let slot = self.inner.slot(connection)?;
        let mut slot = slot.lock().await;
        self.inner
            .interrupt(connection, &mut slot, InterruptReason::Stopped)
            .await
    }

    /// The voice channel emptied: stop, forget and disconnect `connection`.
    pub async fn on_connection_empty(&self, connection: ConnectionId) -> Result<(), PipelineError> {
        let slot = self
            .inner
            .slot(connection)
            .ok_or(PipelineError::NotAttached(connection))?;
        {
            let mut guard = slot.lock().await;
            // A concurrent teardown may have won the lock.
            if !self.inner.is_current(connection, &slot) {
                return Err(PipelineError::NotAttached(connection));
            }
            self.inner
                .interrupt(connection, &mut guard, InterruptReason::ConnectionEmpty)
                .await;
            guard.sink.stop();
            self.inner.forget(connection, &slot);
        }
        self.inner
            .teardown(connection, TeardownReason::ChannelEmpty)
            .await
    }

    // ── Queries ────────────────────────────────────────────────────

    /// The session currently playing on `connection`, if any.
    pub async fn active_session(&self, connection: ConnectionId) -> Option<SessionId> {
        let slot = self.inner.slot(connection)?;
        let slot = slot.lock().await;
        slot.active
            .as_ref()
            .filter(|session| !session.is_terminal())
            .map(PlaybackSession::id)
    }

    /// State of the most recent session on `connection`.
    pub async fn session_state(&self, connection: ConnectionId) -> Option<SessionState> {
        let slot = self.inner.slot(connection)?;
        let slot = slot.lock().await;
        slot.active.as_ref().map(PlaybackSession::state)
    }
}

impl Inner {
    fn slots(&self) -> std::sync::MutexGuard<'_, HashMap<ConnectionId, SharedSlot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn slot(&self, connection: ConnectionId) -> Option<SharedSlot> {
        self.slots().get(&connection).cloned()
    }

    /// Whether `slot` is still the one registered for `connection`.
    fn is_current(&self, connection: ConnectionId, slot: &SharedSlot) -> bool {
        self.slots()
            .get(&connection)
            .is_some_and(|current| Arc::ptr_eq(current, slot))
    }

    /// Unregister `slot`, unless `connection` was re-attached meanwhile.
    fn forget(&self, connection: ConnectionId, slot: &SharedSlot) -> bool {
        let mut slots = self.slots();
        if slots
            .get(&connection)
            .is_some_and(|current| Arc::ptr_eq(current, slot))
        {
            slots.remove(&connection);
            true
        } else {
            false
        }
    }

    fn emit(&self, event: NarrationEvent) {
        tracing::trace!(event = ?event, "Narration event");
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }

    /// Cancel and join the slot's session. Emits `SessionInterrupted` only if
    /// it was still running.
    async fn interrupt(
        &self,
        connection: ConnectionId,
        slot: &mut ConnectionSlot,
        reason: InterruptReason,
    ) -> Option<SessionOutcome> {
        let mut session = slot.active.take()?;
        let was_running = !session.is_terminal();
        let outcome = session.cancel_and_join().await;

        if was_running {
            tracing::info!(
                connection = %connection,
                session = %session.id(),
                reason = ?reason,
                "Playback session interrupted"
            );
            self.emit(NarrationEvent::SessionInterrupted {
                connection,
                session: session.id(),
                reason,
            });
        }
        was_running.then_some(outcome)
    }

    async fn teardown(
        &self,
        connection: ConnectionId,
        reason: TeardownReason,
    ) -> Result<(), PipelineError> {
        let result = self.connections.disconnect(connection).await;
        match &result {
            Ok(()) => tracing::info!(connection = %connection, reason = ?reason, "Voice connection torn down"),
            Err(e) => tracing::error!(
                connection = %connection,
                reason = ?reason,
                error = %e,
                "Failed to disconnect voice connection"
            ),
        }
        self.emit(NarrationEvent::ConnectionTornDown { connection, reason });
        result.map_err(PipelineError::from)
    }

    async fn handle_report(&self, report: SessionReport) {
        let connection = report.connection;
        let mut current = None;

        if let Some(slot) = self.slot(connection) {
            let mut guard = slot.lock().await;
            if guard
                .active
                .as_ref()
                .is_some_and(|session| session.id() == report.session)
            {
                guard.active = None;
                drop(guard);
                current = Some(slot);
            }
        }

        let sink_failed = report.outcome.is_sink_failure();
        self.emit(NarrationEvent::SessionFinished {
            connection,
            session: report.session,
            outcome: report.outcome,
            metrics: report.metrics,
        });

        let Some(slot) = current.filter(|_| sink_failed) else {
            return;
        };
        // A failed sink means the connection is gone; no retry.
        if self.forget(connection, &slot) {
            let _ = self.teardown(connection, TeardownReason::SinkFailure).await;
        }
    }
}

/// Consume session reports until the controller is dropped.
fn spawn_report_loop(inner: Weak<Inner>, mut reports: mpsc::UnboundedReceiver<SessionReport>) {
    tokio::spawn(async move {
        while let Some(report) = reports.recv().await {
            let Some(inner) = inner.upgrade() else {
                break;
            };
            inner.handle_report(report).await;
        }
        tracing::debug!("Session report loop exited");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utterance_request_new() {
        let request = UtteranceRequest::new(ConnectionId::new(1), "hi", "en-GB-RyanNeural");
        assert_eq!(request.text, "hi");
        assert_eq!(request.voice.as_str(), "en-GB-RyanNeural");
    }
}
