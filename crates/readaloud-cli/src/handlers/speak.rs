//! `readaloud speak`: one utterance, played to the end.
//!
//! Ctrl-C stops playback and waits for the session to wind down.

use anyhow::Result;

use readaloud_core::ChannelId;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::handlers::{outcome_result, wait_finished};

pub async fn execute(ctx: &CliContext, text: &[String], channel: u64) -> Result<()> {
    let mut narration = ctx.narration()?;
    let text = text.join(" ");

    let Some(session) = narration
        .narrator
        .narrate(narration.connection, ChannelId::new(channel), &text)
        .await
        .map_err(CliError::from)?
    else {
        tracing::warn!("Nothing to speak");
        return Ok(());
    };

    let outcome = tokio::select! {
        outcome = wait_finished(&mut narration.events, session) => outcome?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, stopping playback");
            narration.narrator.stop(narration.connection).await;
            wait_finished(&mut narration.events, session).await?
        }
    };

    outcome_result(outcome)?;
    Ok(())
}
