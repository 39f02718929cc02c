//! Main CLI parser and top-level argument handling.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;
use crate::output::OutputKind;

/// Speak text through a streaming synthesizer.
#[derive(Parser)]
#[command(name = "readaloud")]
#[command(about = "Stream synthesized speech to an audio output")]
#[command(version)]
pub struct Cli {
    /// JSON settings file (lowest priority layer)
    #[arg(long, global = true, env = "READALOUD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Base URL of the HTTP synthesizer
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Default voice for utterances
    #[arg(long, global = true)]
    pub voice: Option<String>,

    /// Where PCM frames go
    #[arg(long, value_enum, default_value_t = OutputKind::Raw, global = true)]
    pub output: OutputKind,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}
