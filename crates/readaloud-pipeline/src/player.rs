//! Real-time paced player: one playback thread per source.
//!
//! Decoding blocks on the chunk queue, so the frame pull loop runs on a
//! dedicated OS thread instead of the async runtime. Starting a new source
//! signals the previous thread and joins it (on the new thread, so `play`
//! never blocks) before the first new frame is written. Two sources never
//! write to the output at the same time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::PipelineError;
use crate::frame::{FRAME_DURATION, FrameSource};
use crate::output::FrameOutput;
use crate::sink::{PlaybackHandle, PlaybackOutcome, PlaybackSink};

/// Frame cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    /// One frame per frame duration, measured from the first frame. After
    /// a source stall the clock restarts instead of bursting to catch up.
    RealTime,
    /// As fast as the source decodes (raw PCM export, tests).
    Unpaced,
}

type SharedOutput = Arc<Mutex<Box<dyn FrameOutput>>>;

struct ActivePlayback {
    stop: Arc<AtomicBool>,
    playing: Arc<AtomicBool>,
    thread: thread::JoinHandle<()>,
}

/// [`PlaybackSink`] that writes frames to a [`FrameOutput`].
pub struct PacedPlayer {
    output: SharedOutput,
    pacing: Pacing,
    frame_duration: Duration,
    current: Mutex<Option<ActivePlayback>>,
}

impl PacedPlayer {
    pub fn new(output: Box<dyn FrameOutput>, pacing: Pacing) -> Self {
        Self {
            output: Arc::new(Mutex::new(output)),
            pacing,
            frame_duration: FRAME_DURATION,
            current: Mutex::new(None),
        }
    }

    /// Override the pacing interval (must match the source's frame duration).
    #[must_use]
    pub const fn with_frame_duration(mut self, frame_duration: Duration) -> Self {
        self.frame_duration = frame_duration;
        self
    }

    fn current(&self) -> MutexGuard<'_, Option<ActivePlayback>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PlaybackSink for PacedPlayer {
    fn play(&self, source: Box<dyn FrameSource>) -> Result<PlaybackHandle, PipelineError> {
        let mut current = self.current();
        let previous = current.take();
        if let Some(prev) = &previous {
            prev.stop.store(true, Ordering::SeqCst);
        }

        let (completion, handle) = PlaybackHandle::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let playing = Arc::new(AtomicBool::new(true));

        let output = Arc::clone(&self.output);
        let pacing = self.pacing;
        let frame_duration = self.frame_duration;
        let thread_stop = Arc::clone(&stop);
        let thread_playing = Arc::clone(&playing);

        let thread = thread::Builder::new()
            .name("readaloud-playback".into())
            .spawn(move || {
                if let Some(prev) = previous {
                    if prev.thread.join().is_err() {
                        tracing::warn!("Previous playback thread panicked");
                    }
                }
                let outcome = run_playback(source, &output, &thread_stop, pacing, frame_duration);
                thread_playing.store(false, Ordering::SeqCst);
                completion.complete(outcome);
            })
            .map_err(|e| PipelineError::Playback(format!("failed to spawn playback thread: {e}")))?;

        *current = Some(ActivePlayback {
            stop,
            playing,
            thread,
        });
        Ok(handle)
    }

    fn stop(&self) {
        if let Some(active) = self.current().as_ref() {
            active.stop.store(true, Ordering::SeqCst);
        }
    }

    fn is_playing(&self) -> bool {
        self.current()
            .as_ref()
            .is_some_and(|active| active.playing.load(Ordering::SeqCst))
    }
}

impl Drop for PacedPlayer {
    fn drop(&mut self) {
        // Signal only; joining could block on a source still waiting for data.
        self.stop();
    }
}

fn run_playback(
    mut source: Box<dyn FrameSource>,
    output: &SharedOutput,
    stop: &AtomicBool,
    pacing: Pacing,
    frame_duration: Duration,
) -> PlaybackOutcome {
    source.start();

    let started = Instant::now();
    let mut frames: u32 = 0;
    let mut anchor = started;
    let mut paced: u32 = 0;

    let outcome = loop {
        if stop.load(Ordering::SeqCst) {
            break PlaybackOutcome::Stopped;
        }
        let Some(frame) = source.read() else {
            break if stop.load(Ordering::SeqCst) {
                PlaybackOutcome::Stopped
            } else {
                PlaybackOutcome::Finished
            };
        };
        if stop.load(Ordering::SeqCst) {
            break PlaybackOutcome::Stopped;
        }

        let written = output
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .write_frame(&frame);
        if let Err(e) = written {
            tracing::error!(error = %e, frames, "Audio output failed");
            break PlaybackOutcome::Failed(e.to_string());
        }
        frames = frames.saturating_add(1);
        paced = paced.saturating_add(1);

        if pacing == Pacing::RealTime {
            let now = Instant::now();
            let mut due = anchor + frame_duration * paced;
            if now > due + frame_duration {
                tracing::trace!(
                    behind_ms = (now - due).as_millis(),
                    frames,
                    "Source stalled, restarting pacing clock"
                );
                anchor = now;
                paced = 1;
                due = now + frame_duration;
            }
            thread::sleep(due.saturating_duration_since(now));
        }
    };

    if let Err(e) = output
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .flush()
    {
        tracing::warn!(error = %e, "Failed to flush audio output");
    }

    tracing::debug!(
        frames,
        elapsed_ms = started.elapsed().as_millis(),
        outcome = ?outcome,
        "Playback ended"
    );
    outcome
}
