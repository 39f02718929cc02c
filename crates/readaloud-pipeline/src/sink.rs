//! Playback sink abstraction.
//!
//! A sink takes a [`FrameSource`], pulls frames at its own cadence, and
//! reports how playback ended through a [`PlaybackHandle`].

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use serde::Serialize;
use tokio::sync::oneshot;

use crate::error::PipelineError;
use crate::frame::FrameSource;

/// How one playback ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum PlaybackOutcome {
    /// The source reached end-of-stream and every frame was written.
    Finished,
    /// Playback was stopped before end-of-stream.
    Stopped,
    /// The output failed; the connection is presumed lost.
    Failed(String),
}

/// Sender half of a playback completion, held by the sink.
#[derive(Debug)]
pub struct PlaybackCompletion(oneshot::Sender<PlaybackOutcome>);

impl PlaybackCompletion {
    pub fn complete(self, outcome: PlaybackOutcome) {
        // The session may already be gone; nobody is left to tell.
        let _ = self.0.send(outcome);
    }
}

/// Resolves once the sink finishes with the source it was given.
///
/// A sink that drops its [`PlaybackCompletion`] without reporting resolves
/// as [`PlaybackOutcome::Failed`].
#[derive(Debug)]
pub struct PlaybackHandle {
    done: oneshot::Receiver<PlaybackOutcome>,
}

impl PlaybackHandle {
    /// A connected completion/handle pair.
    #[must_use]
    pub fn channel() -> (PlaybackCompletion, Self) {
        let (tx, rx) = oneshot::channel();
        (PlaybackCompletion(tx), Self { done: rx })
    }
}

impl Future for PlaybackHandle {
    type Output = PlaybackOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.done).poll(cx).map(|result| {
            result.unwrap_or_else(|_| {
                PlaybackOutcome::Failed("playback sink dropped without reporting".to_string())
            })
        })
    }
}

/// One playback sink per voice connection.
///
/// `play` replaces whatever source is current: the previous source must be
/// stopped before the new one writes its first frame.
pub trait PlaybackSink: Send + Sync {
    /// Start pulling from `source`. Must not block on the source.
    fn play(&self, source: Box<dyn FrameSource>) -> Result<PlaybackHandle, PipelineError>;

    /// Stop the current source, if any. Fire-and-forget.
    fn stop(&self);

    fn is_playing(&self) -> bool;
}
