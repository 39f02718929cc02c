//! Subcommands.

use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Speak one utterance and wait for it to finish
    Speak {
        /// Text to speak (joined with spaces)
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// Channel whose voice preference applies
        #[arg(long, default_value_t = 0)]
        channel: u64,
    },

    /// Speak each stdin line, interrupting the previous one
    ///
    /// A line reading `/stop` stops playback. At end of input the last
    /// utterance plays to completion.
    Listen {
        /// Channel whose voice preference applies
        #[arg(long, default_value_t = 0)]
        channel: u64,
    },

    /// List the synthesizer's voices
    Voices {
        /// Only voices whose locale starts with this (e.g. `en-GB`)
        #[arg(long)]
        locale: Option<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}
