//! Output selection: where the paced player writes frames.

use std::io;

use clap::ValueEnum;

use readaloud_pipeline::{FrameOutput, NullOutput, Pacing, WriterOutput};

use crate::error::CliError;

/// `--output` choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputKind {
    /// Raw 48 kHz stereo s16le PCM on stdout, written as fast as it decodes
    Raw,
    /// Discard frames (real-time paced; useful for latency checks)
    Null,
    /// Default audio device (requires the `speaker` feature)
    Speaker,
}

impl OutputKind {
    /// Open the output and pick its pacing.
    pub fn open(self) -> Result<(Box<dyn FrameOutput>, Pacing), CliError> {
        match self {
            Self::Raw => Ok((Box::new(WriterOutput::new(io::stdout())), Pacing::Unpaced)),
            Self::Null => Ok((Box::new(NullOutput::new()), Pacing::RealTime)),
            Self::Speaker => open_speaker(),
        }
    }
}

#[cfg(feature = "speaker")]
fn open_speaker() -> Result<(Box<dyn FrameOutput>, Pacing), CliError> {
    let speaker = crate::speaker::SpeakerOutput::spawn()?;
    Ok((Box::new(speaker), Pacing::RealTime))
}

#[cfg(not(feature = "speaker"))]
fn open_speaker() -> Result<(Box<dyn FrameOutput>, Pacing), CliError> {
    Err(CliError::Output(
        "speaker output requires building with --features speaker".to_string(),
    ))
}
