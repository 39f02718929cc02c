//! Frame outputs: where a [`PacedPlayer`](crate::player::PacedPlayer) writes PCM.

use std::io::Write;

use tokio::sync::mpsc;

use crate::error::PipelineError;
use crate::frame::PcmFrame;

/// Destination for PCM frames. Called from the playback thread.
pub trait FrameOutput: Send {
    fn write_frame(&mut self, frame: &PcmFrame) -> Result<(), PipelineError>;

    /// Called once after the last frame of a playback.
    fn flush(&mut self) -> Result<(), PipelineError> {
        Ok(())
    }
}

/// Forwards frames into a tokio channel (voice transports, tests).
#[derive(Debug, Clone)]
pub struct ChannelOutput {
    tx: mpsc::UnboundedSender<PcmFrame>,
}

impl ChannelOutput {
    pub const fn new(tx: mpsc::UnboundedSender<PcmFrame>) -> Self {
        Self { tx }
    }

    /// An output and the receiver for its frames.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PcmFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl FrameOutput for ChannelOutput {
    fn write_frame(&mut self, frame: &PcmFrame) -> Result<(), PipelineError> {
        self.tx
            .send(frame.clone())
            .map_err(|_| PipelineError::OutputClosed)
    }
}

/// Writes raw interleaved i16 LE PCM to any writer (stdout, a file).
#[derive(Debug)]
pub struct WriterOutput<W> {
    writer: W,
}

impl<W: Write + Send> WriterOutput<W> {
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> FrameOutput for WriterOutput<W> {
    fn write_frame(&mut self, frame: &PcmFrame) -> Result<(), PipelineError> {
        self.writer.write_all(frame.as_bytes())?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), PipelineError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Discards frames, counting them.
#[derive(Debug, Default)]
pub struct NullOutput {
    frames: u64,
}

impl NullOutput {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn frames(&self) -> u64 {
        self.frames
    }
}

impl FrameOutput for NullOutput {
    fn write_frame(&mut self, _frame: &PcmFrame) -> Result<(), PipelineError> {
        self.frames += 1;
        Ok(())
    }
}
