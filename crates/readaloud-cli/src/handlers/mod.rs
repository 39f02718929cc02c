//! Command handlers.
//!
//! Handlers follow one pattern:
//! - Signature: `pub async fn execute(ctx: &CliContext, ...) -> Result<()>`
//! - They build what they need from the context, call into the narrator or
//!   the voice catalog, and format results for the terminal.
//!
//! Stdout may carry raw PCM, so progress goes to the log (stderr), never
//! to stdout, in the narration handlers.

pub mod listen;
pub mod speak;
pub mod voices;

use anyhow::{Result, bail};
use tokio::sync::mpsc;

use readaloud_pipeline::{NarrationEvent, SessionId, SessionOutcome};

use crate::error::CliError;

/// Log one narration event.
pub(crate) fn log_event(event: &NarrationEvent) {
    match event {
        NarrationEvent::SessionStarted { session, voice, .. } => {
            tracing::info!(session = %session, voice = %voice, "Speaking");
        }
        NarrationEvent::SessionInterrupted {
            session, reason, ..
        } => {
            tracing::info!(session = %session, ?reason, "Interrupted");
        }
        NarrationEvent::SessionFinished {
            session,
            outcome,
            metrics,
            ..
        } => {
            tracing::info!(
                session = %session,
                ?outcome,
                first_audio_ms = ?metrics.first_audio.map(|d| d.as_millis()),
                audio_bytes = metrics.audio_bytes,
                "Finished"
            );
        }
        NarrationEvent::ConnectionTornDown { reason, .. } => {
            tracing::warn!(?reason, "Audio output torn down");
        }
    }
}

/// Consume events until `session` finishes, logging everything seen.
pub(crate) async fn wait_finished(
    events: &mut mpsc::UnboundedReceiver<NarrationEvent>,
    session: SessionId,
) -> Result<SessionOutcome> {
    while let Some(event) = events.recv().await {
        log_event(&event);
        if let NarrationEvent::SessionFinished {
            session: finished,
            outcome,
            ..
        } = event
        {
            if finished == session {
                return Ok(outcome);
            }
        }
    }
    bail!("narration pipeline shut down before session {session} finished")
}

/// Turn a terminal outcome into the command's result.
pub(crate) fn outcome_result(outcome: SessionOutcome) -> Result<(), CliError> {
    match outcome {
        SessionOutcome::Completed | SessionOutcome::Cancelled => Ok(()),
        SessionOutcome::NoAudio => {
            tracing::warn!("Synthesizer produced no audio");
            Ok(())
        }
        SessionOutcome::SynthesisFailed(reason) => Err(CliError::Narration(reason)),
        SessionOutcome::SinkFailed(reason) => Err(CliError::Output(reason)),
    }
}
