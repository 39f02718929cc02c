//! Producer task: synthesizer stream → chunk queue.
//!
//! - Only `audio` chunks reach the queue, in arrival order
//! - Cancellation is polled between chunks via `tokio::select!`
//! - The queue is closed on every exit path, including panics (drop guard)

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use readaloud_core::{SynthesisError, SynthesisRequest, Synthesizer};

use crate::queue::ChunkQueue;

/// How the producer stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ProducerEnd {
    /// The chunk stream ended after at least one audio chunk.
    Completed,
    /// The synthesizer had nothing to say.
    NoAudio,
    /// Cancellation was observed before the stream ended.
    Cancelled,
    /// The synthesizer failed.
    Failed(SynthesisError),
    /// The producer task itself died (panic or runtime shutdown).
    Aborted(String),
}

/// Observational numbers for one utterance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct SessionMetrics {
    /// Utterance start to first audio chunk.
    pub first_audio: Option<Duration>,
    /// Utterance start to producer completion.
    pub stream_duration: Duration,
    pub audio_chunks: u64,
    pub audio_bytes: u64,
}

#[derive(Debug, Clone)]
pub(crate) struct ProducerReport {
    pub end: ProducerEnd,
    pub metrics: SessionMetrics,
}

/// Closes the queue when dropped.
struct CloseOnDrop(Arc<ChunkQueue>);

impl Drop for CloseOnDrop {
    fn drop(&mut self) {
        self.0.close();
    }
}

pub(crate) async fn run_producer(
    synthesizer: Arc<dyn Synthesizer>,
    request: SynthesisRequest,
    queue: Arc<ChunkQueue>,
    cancel: CancellationToken,
) -> ProducerReport {
    let _close = CloseOnDrop(Arc::clone(&queue));
    let started = Instant::now();
    let mut metrics = SessionMetrics::default();

    let end = 'produce: {
        let opened = tokio::select! {
            biased;

            () = cancel.cancelled() => break 'produce ProducerEnd::Cancelled,

            opened = synthesizer.stream(&request) => opened,
        };
        let mut stream = match opened {
            Ok(stream) => stream,
            Err(SynthesisError::NoAudio) => break 'produce ProducerEnd::NoAudio,
            Err(e) => break 'produce ProducerEnd::Failed(e),
        };

        loop {
            let next = tokio::select! {
                biased;

                () = cancel.cancelled() => break 'produce ProducerEnd::Cancelled,

                next = stream.next() => next,
            };

            match next {
                Some(Ok(chunk)) if chunk.is_audio() => {
                    if metrics.first_audio.is_none() {
                        let latency = started.elapsed();
                        metrics.first_audio = Some(latency);
                        tracing::info!(
                            voice = %request.voice,
                            latency_ms = latency.as_millis(),
                            "First audio chunk received"
                        );
                    }
                    metrics.audio_chunks += 1;
                    metrics.audio_bytes += chunk.len() as u64;
                    queue.push(chunk.into_data());
                }
                Some(Ok(chunk)) => {
                    tracing::trace!(kind = ?chunk.kind(), "Ignoring non-audio chunk");
                }
                Some(Err(SynthesisError::NoAudio)) | None if metrics.audio_chunks == 0 => {
                    break 'produce ProducerEnd::NoAudio;
                }
                Some(Err(SynthesisError::NoAudio)) | None => break 'produce ProducerEnd::Completed,
                Some(Err(e)) => break 'produce ProducerEnd::Failed(e),
            }
        }
    };

    queue.close();
    metrics.stream_duration = started.elapsed();

    match &end {
        ProducerEnd::Completed => tracing::info!(
            voice = %request.voice,
            total_ms = metrics.stream_duration.as_millis(),
            chunks = metrics.audio_chunks,
            bytes = metrics.audio_bytes,
            "Synthesis stream finished"
        ),
        ProducerEnd::NoAudio => tracing::info!(voice = %request.voice, "Synthesizer produced no audio"),
        ProducerEnd::Cancelled => tracing::debug!(
            chunks = metrics.audio_chunks,
            "Producer observed cancellation"
        ),
        ProducerEnd::Failed(e) => tracing::warn!(
            error = %e,
            chunks = metrics.audio_chunks,
            "Synthesis stream failed"
        ),
        // Only built by the supervisor from a `JoinError`.
        ProducerEnd::Aborted(_) => {}
    }

    ProducerReport { end, metrics }
}
