//! `readaloud voices`: list what the synthesizer offers.

use anyhow::{Context, Result};

use readaloud_core::VoiceInfo;

use crate::bootstrap::CliContext;
use crate::error::CliError;

pub async fn execute(ctx: &CliContext, locale: Option<&str>, json: bool) -> Result<()> {
    let voices = ctx.catalog.voices().await.map_err(CliError::from)?;
    let selected = select(&voices, locale);

    if json {
        let json = serde_json::to_string_pretty(&selected).context("Failed to encode voice list")?;
        println!("{json}");
        return Ok(());
    }

    if selected.is_empty() {
        match locale {
            Some(locale) => println!("No voices for locale '{locale}'."),
            None => println!("The synthesizer offers no voices."),
        }
        return Ok(());
    }

    let width = selected.iter().map(|v| v.id.as_str().len()).max().unwrap_or(0);
    println!("{:<width$}  {:<8}  GENDER", "VOICE", "LOCALE");
    for voice in &selected {
        println!(
            "{:<width$}  {:<8}  {}",
            voice.id.as_str(),
            voice.locale,
            voice.gender.as_deref().unwrap_or("-"),
        );
    }
    println!();
    println!("{} voice(s)", selected.len());
    Ok(())
}

/// Voices whose locale starts with `locale` (case-insensitive), by id.
fn select<'a>(voices: &'a [VoiceInfo], locale: Option<&str>) -> Vec<&'a VoiceInfo> {
    let prefix = locale.map(str::to_ascii_lowercase);
    let mut selected: Vec<&VoiceInfo> = voices
        .iter()
        .filter(|v| {
            prefix
                .as_deref()
                .is_none_or(|p| v.locale.to_ascii_lowercase().starts_with(p))
        })
        .collect();
    selected.sort_by(|a, b| a.id.cmp(&b.id));
    selected
}
