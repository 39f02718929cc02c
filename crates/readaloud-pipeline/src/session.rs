//! One utterance: producer task + playback, with cooperative cancellation.
//!
//! ```text
//! Idle ──start──▶ Playing ──producer done──▶ Draining ──sink done──▶ Closed
//!                    │                          │
//!                    └────────cancel────────────┴──▶ Cancelled
//!                    (sink or synthesis failure) ──▶ Failed
//! ```
//!
//! A supervisor task waits on both halves. Whatever happens, the queue is
//! closed and the producer has exited by the time the session reports.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use readaloud_core::{ConnectionId, Settings, SynthesisRequest, Synthesizer, VoiceId};

use crate::decoder::FrameDecoder;
use crate::error::PipelineError;
use crate::frame::FrameSpec;
use crate::producer::{ProducerEnd, ProducerReport, SessionMetrics, run_producer};
use crate::pull_source::PullSource;
use crate::queue::ChunkQueue;
use crate::sink::{PlaybackHandle, PlaybackOutcome, PlaybackSink};

// ── Identity and state ─────────────────────────────────────────────

/// Unique id of one playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Created, not started.
    Idle,
    /// Producer running, sink pulling frames.
    Playing,
    /// Producer finished; the sink is playing what is queued.
    Draining,
    /// Finished normally (including "no audio").
    Closed,
    /// Stopped by request.
    Cancelled,
    /// Synthesis or sink failure.
    Failed,
}

impl SessionState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Cancelled | Self::Failed)
    }
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum SessionOutcome {
    /// Every frame was played.
    Completed,
    /// The synthesizer produced no audio; nothing was played.
    NoAudio,
    /// Stopped by request (superseded, manual stop, teardown).
    Cancelled,
    /// The synthesizer failed mid-stream.
    SynthesisFailed(String),
    /// The sink failed; the voice connection is presumed lost.
    SinkFailed(String),
}

impl SessionOutcome {
    /// The terminal state this outcome leaves the session in.
    #[must_use]
    pub const fn terminal_state(&self) -> SessionState {
        match self {
            Self::Completed | Self::NoAudio => SessionState::Closed,
            Self::Cancelled => SessionState::Cancelled,
            Self::SynthesisFailed(_) | Self::SinkFailed(_) => SessionState::Failed,
        }
    }

    #[must_use]
    pub const fn is_sink_failure(&self) -> bool {
        matches!(self, Self::SinkFailed(_))
    }
}

/// Sent once per started session when it reaches a terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub session: SessionId,
    pub connection: ConnectionId,
    pub outcome: SessionOutcome,
    pub metrics: SessionMetrics,
}

// ── Configuration ──────────────────────────────────────────────────

/// Per-session knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Output frame geometry.
    pub frame: FrameSpec,
    /// Container hint for the decoder.
    pub format_hint: Option<String>,
    /// How long to wait for the sink to acknowledge a stop.
    pub stop_grace: Duration,
}

impl SessionConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            frame: FrameSpec::playback(),
            format_hint: Some(settings.effective_format_hint().to_string()),
            stop_grace: settings.effective_stop_grace(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::with_defaults())
    }
}

// ── Session ────────────────────────────────────────────────────────

/// One decode + playback attempt for a single utterance.
///
/// Must be started inside a tokio runtime. Dropping a session that has not
/// reached a terminal state cancels it.
pub struct PlaybackSession {
    id: SessionId,
    connection: ConnectionId,
    synthesizer: Arc<dyn Synthesizer>,
    sink: Arc<dyn PlaybackSink>,
    config: SessionConfig,
    queue: Arc<ChunkQueue>,
    cancel: CancellationToken,
    state: Arc<watch::Sender<SessionState>>,
    reporter: Option<mpsc::UnboundedSender<SessionReport>>,
    supervisor: Option<JoinHandle<SessionOutcome>>,
    outcome: Option<SessionOutcome>,
}

impl PlaybackSession {
    pub fn new(
        connection: ConnectionId,
        synthesizer: Arc<dyn Synthesizer>,
        sink: Arc<dyn PlaybackSink>,
        config: SessionConfig,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Idle);
        Self {
            id: SessionId::new(),
            connection,
            synthesizer,
            sink,
            config,
            queue: Arc::new(ChunkQueue::new()),
            cancel: CancellationToken::new(),
            state: Arc::new(state),
            reporter: None,
            supervisor: None,
            outcome: None,
        }
    }

    /// Deliver a [`SessionReport`] on `tx` when the session ends.
    #[must_use]
    pub fn with_reporter(mut self, tx: mpsc::UnboundedSender<SessionReport>) -> Self {
        self.reporter = Some(tx);
        self
    }

    /// Hand the decoder to the sink and spawn the producer.
    ///
    /// Fails if the session is not `Idle` or the sink refuses the source; in
    /// the latter case the queue is closed and the session is `Failed`.
    pub fn start(
        &mut self,
        text: impl Into<String>,
        voice: impl Into<VoiceId>,
    ) -> Result<(), PipelineError> {
        if *self.state.borrow() != SessionState::Idle {
            return Err(PipelineError::AlreadyStarted);
        }

        let mut decoder =
            FrameDecoder::new(PullSource::new(Arc::clone(&self.queue)), self.config.frame);
        if let Some(hint) = &self.config.format_hint {
            decoder = decoder.with_hint(hint.clone());
        }

        let playback = match self.sink.play(Box::new(decoder)) {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(session = %self.id, connection = %self.connection, error = %e, "Sink refused playback");
                self.queue.close();
                transition(&self.state, SessionState::Failed);
                self.outcome = Some(SessionOutcome::SinkFailed(e.to_string()));
                return Err(e);
            }
        };
        transition(&self.state, SessionState::Playing);

        let request = SynthesisRequest::new(text, voice);
        tracing::info!(
            session = %self.id,
            connection = %self.connection,
            voice = %request.voice,
            chars = request.text.chars().count(),
            "Playback session started"
        );

        let producer = tokio::spawn(run_producer(
            Arc::clone(&self.synthesizer),
            request,
            Arc::clone(&self.queue),
            self.cancel.clone(),
        ));
        let supervisor = Supervisor {
            session: self.id,
            connection: self.connection,
            queue: Arc::clone(&self.queue),
            cancel: self.cancel.clone(),
            sink: Arc::clone(&self.sink),
            state: Arc::clone(&self.state),
            stop_grace: self.config.stop_grace,
            reporter: self.reporter.clone(),
        };
        self.supervisor = Some(tokio::spawn(supervisor.run(producer, playback)));
        Ok(())
    }

    /// Request cancellation. Idempotent; a no-op once terminal.
    ///
    /// Signals the producer, closes the queue (releasing a blocked decoder
    /// read) and stops the sink.
    pub fn cancel(&self) {
        let mut previous = SessionState::Idle;
        let changed = self.state.send_if_modified(|state| {
            previous = *state;
            if state.is_terminal() {
                false
            } else {
                *state = SessionState::Cancelled;
                true
            }
        });
        if !changed {
            return;
        }

        tracing::debug!(session = %self.id, connection = %self.connection, from = ?previous, "Cancelling playback session");
        self.cancel.cancel();
        self.queue.close();
        if previous != SessionState::Idle {
            self.sink.stop();
        }
    }

    /// Wait for the session to end. Cheap to call again afterwards.
    ///
    /// Joining a session that was never started cancels it.
    pub async fn join(&mut self) -> SessionOutcome {
        if let Some(outcome) = &self.outcome {
            return outcome.clone();
        }

        let outcome = match self.supervisor.take() {
            Some(handle) => match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(session = %self.id, error = %e, "Session supervisor ended abnormally");
                    self.cancel();
                    SessionOutcome::Cancelled
                }
            },
            None => {
                self.cancel();
                SessionOutcome::Cancelled
            }
        };
        self.outcome = Some(outcome.clone());
        outcome
    }

    /// [`cancel`](Self::cancel) then [`join`](Self::join).
    pub async fn cancel_and_join(&mut self) -> SessionOutcome {
        self.cancel();
        self.join().await
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub const fn connection(&self) -> ConnectionId {
        self.connection
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    /// Whether end-of-stream has been signalled on this session's queue.
    pub fn queue_closed(&self) -> bool {
        self.queue.is_closed()
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("id", &self.id)
            .field("connection", &self.connection)
            .field("state", &self.state())
            .field("queue_closed", &self.queue_closed())
            .finish_non_exhaustive()
    }
}

/// Move to `next` unless already terminal.
fn transition(state: &watch::Sender<SessionState>, next: SessionState) -> bool {
    state.send_if_modified(|current| {
        if current.is_terminal() || *current == next {
            return false;
        }
        tracing::debug!(from = ?*current, to = ?next, "Session state transition");
        *current = next;
        true
    })
}

// ── Supervisor ─────────────────────────────────────────────────────

struct Supervisor {
    session: SessionId,
    connection: ConnectionId,
    queue: Arc<ChunkQueue>,
    cancel: CancellationToken,
    sink: Arc<dyn PlaybackSink>,
    state: Arc<watch::Sender<SessionState>>,
    stop_grace: Duration,
    reporter: Option<mpsc::UnboundedSender<SessionReport>>,
}

impl Supervisor {
    async fn run(
        self,
        mut producer: JoinHandle<ProducerReport>,
        mut playback: PlaybackHandle,
    ) -> SessionOutcome {
        let (report, playback_outcome) = tokio::select! {
            joined = &mut producer => {
                let report = producer_report(joined);
                let outcome = match report.end {
                    ProducerEnd::Completed | ProducerEnd::NoAudio => {
                        transition(&self.state, SessionState::Draining);
                        tokio::select! {
                            outcome = &mut playback => Some(outcome),
                            () = self.cancel.cancelled() => self.await_stop(playback).await,
                        }
                    }
                    ProducerEnd::Cancelled => self.await_stop(playback).await,
                    ProducerEnd::Failed(_) | ProducerEnd::Aborted(_) => {
                        self.sink.stop();
                        self.await_stop(playback).await
                    }
                };
                (report, outcome)
            }

            outcome = &mut playback => {
                // The sink is done with this source; stop the producer.
                self.cancel.cancel();
                self.queue.close();
                (producer_report(producer.await), Some(outcome))
            }
        };

        let cancelled = *self.state.borrow() == SessionState::Cancelled;
        let outcome = resolve(&report.end, playback_outcome.as_ref(), cancelled);
        self.finish(outcome, report.metrics)
    }

    async fn await_stop(&self, playback: PlaybackHandle) -> Option<PlaybackOutcome> {
        if let Ok(outcome) = tokio::time::timeout(self.stop_grace, playback).await {
            Some(outcome)
        } else {
            tracing::warn!(
                session = %self.session,
                grace_ms = self.stop_grace.as_millis(),
                "Sink did not acknowledge stop"
            );
            None
        }
    }

    fn finish(self, outcome: SessionOutcome, metrics: SessionMetrics) -> SessionOutcome {
        self.queue.close();
        transition(&self.state, outcome.terminal_state());

        match &outcome {
            SessionOutcome::SinkFailed(reason) => tracing::error!(
                session = %self.session,
                connection = %self.connection,
                reason = %reason,
                "Playback session failed at the sink"
            ),
            SessionOutcome::SynthesisFailed(reason) => tracing::warn!(
                session = %self.session,
                connection = %self.connection,
                reason = %reason,
                "Playback session failed during synthesis"
            ),
            _ => tracing::info!(
                session = %self.session,
                connection = %self.connection,
                outcome = ?outcome,
                first_audio_ms = ?metrics.first_audio.map(|d| d.as_millis()),
                stream_ms = metrics.stream_duration.as_millis(),
                "Playback session ended"
            ),
        }

        if let Some(reporter) = &self.reporter {
            let _ = reporter.send(SessionReport {
                session: self.session,
                connection: self.connection,
                outcome: outcome.clone(),
                metrics,
            });
        }
        outcome
    }
}

fn producer_report(joined: Result<ProducerReport, JoinError>) -> ProducerReport {
    joined.unwrap_or_else(|e| ProducerReport {
        end: ProducerEnd::Aborted(e.to_string()),
        metrics: SessionMetrics::default(),
    })
}

fn resolve(
    end: &ProducerEnd,
    playback: Option<&PlaybackOutcome>,
    cancelled: bool,
) -> SessionOutcome {
    if cancelled {
        return SessionOutcome::Cancelled;
    }
    if let Some(PlaybackOutcome::Failed(reason)) = playback {
        return SessionOutcome::SinkFailed(reason.clone());
    }
    match end {
        ProducerEnd::Failed(e) => SessionOutcome::SynthesisFailed(e.to_string()),
        ProducerEnd::Aborted(reason) => SessionOutcome::SynthesisFailed(reason.clone()),
        ProducerEnd::NoAudio => SessionOutcome::NoAudio,
        // The producer may have been cancelled because the sink finished
        // first (truncated decode); that is still a normal finish.
        ProducerEnd::Completed | ProducerEnd::Cancelled => match playback {
            Some(PlaybackOutcome::Finished) => SessionOutcome::Completed,
            _ => SessionOutcome::Cancelled,
        },
    }
}
