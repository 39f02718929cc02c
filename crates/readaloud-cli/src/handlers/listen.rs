//! `readaloud listen`: speak stdin line by line.
//!
//! Every line interrupts the utterance before it. `/stop` stops playback.
//! At end of input the last utterance is allowed to finish.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use readaloud_core::ChannelId;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::handlers::{log_event, outcome_result, wait_finished};

const STOP_COMMAND: &str = "/stop";

/// What one input line asks for.
#[derive(Debug, PartialEq, Eq)]
enum Line<'a> {
    Stop,
    Speak(&'a str),
}

fn classify(line: &str) -> Line<'_> {
    if line.trim().eq_ignore_ascii_case(STOP_COMMAND) {
        Line::Stop
    } else {
        Line::Speak(line)
    }
}

pub async fn execute(ctx: &CliContext, channel: u64) -> Result<()> {
    let mut narration = ctx.narration()?;
    let channel = ChannelId::new(channel);
    let connection = narration.connection;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    tracing::info!("Listening on stdin ({STOP_COMMAND} stops playback)");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else { break };
                match classify(&line) {
                    Line::Stop => {
                        narration.narrator.stop(connection).await;
                    }
                    Line::Speak(text) => {
                        narration
                            .narrator
                            .narrate(connection, channel, text)
                            .await
                            .map_err(CliError::from)?;
                    }
                }
            }
            Some(event) = narration.events.recv() => log_event(&event),
            _ = tokio::signal::ctrl_c() => {
                narration.narrator.stop(connection).await;
                break;
            }
        }
    }

    // The finish event cannot have been consumed while the session is
    // still registered as active.
    let last = narration
        .narrator
        .controller()
        .active_session(connection)
        .await;
    if let Some(session) = last {
        let outcome = wait_finished(&mut narration.events, session).await?;
        outcome_result(outcome)?;
    }
    Ok(())
}
