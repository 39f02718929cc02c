//! Speaker output: plays frames on the default device via `rodio`.
//!
//! `rodio::OutputStream` is `!Send` on some platforms, so the stream and
//! its sink live on a dedicated OS thread. [`SpeakerOutput`] is the `Send`
//! proxy the playback thread writes to; every frame is forwarded over a
//! channel and appended to the rodio sink.

use std::sync::mpsc;
use std::thread;

use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, Sink};

use readaloud_pipeline::frame::{CHANNELS, SAMPLE_RATE};
use readaloud_pipeline::{FrameOutput, PcmFrame, PipelineError};

use crate::error::CliError;

enum SpeakerCommand {
    Append(Vec<i16>),
    /// Block until everything appended so far has played.
    Drain { reply: mpsc::Sender<()> },
    Shutdown,
}

/// `Send` handle to the speaker thread.
pub struct SpeakerOutput {
    cmd_tx: mpsc::Sender<SpeakerCommand>,
    thread: Option<thread::JoinHandle<()>>,
}

impl SpeakerOutput {
    /// Spawn the speaker thread and open the default output device.
    pub fn spawn() -> Result<Self, CliError> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (init_tx, init_rx) = mpsc::channel::<Result<(), String>>();

        let thread = thread::Builder::new()
            .name("readaloud-speaker".into())
            .spawn(move || run(&cmd_rx, &init_tx))
            .map_err(|e| CliError::Output(format!("failed to spawn speaker thread: {e}")))?;

        init_rx
            .recv()
            .map_err(|_| CliError::Output("speaker thread died during startup".to_string()))?
            .map_err(CliError::Output)?;

        Ok(Self {
            cmd_tx,
            thread: Some(thread),
        })
    }
}

impl FrameOutput for SpeakerOutput {
    fn write_frame(&mut self, frame: &PcmFrame) -> Result<(), PipelineError> {
        self.cmd_tx
            .send(SpeakerCommand::Append(frame.samples().collect()))
            .map_err(|_| PipelineError::Output("speaker thread stopped".to_string()))
    }

    fn flush(&mut self) -> Result<(), PipelineError> {
        let (reply, done) = mpsc::channel();
        self.cmd_tx
            .send(SpeakerCommand::Drain { reply })
            .map_err(|_| PipelineError::Output("speaker thread stopped".to_string()))?;
        done.recv()
            .map_err(|_| PipelineError::Output("speaker thread stopped".to_string()))
    }
}

impl Drop for SpeakerOutput {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(SpeakerCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn run(cmd_rx: &mpsc::Receiver<SpeakerCommand>, init_tx: &mpsc::Sender<Result<(), String>>) {
    let (_stream, handle) = match OutputStream::try_default() {
        Ok(pair) => pair,
        Err(e) => {
            let _ = init_tx.send(Err(e.to_string()));
            return;
        }
    };
    let sink = match Sink::try_new(&handle) {
        Ok(sink) => sink,
        Err(e) => {
            let _ = init_tx.send(Err(e.to_string()));
            return;
        }
    };
    tracing::info!("Speaker output initialized on default device");
    let _ = init_tx.send(Ok(()));

    while let Ok(command) = cmd_rx.recv() {
        match command {
            SpeakerCommand::Append(samples) => {
                sink.append(SamplesBuffer::new(CHANNELS, SAMPLE_RATE, samples));
            }
            SpeakerCommand::Drain { reply } => {
                sink.sleep_until_end();
                let _ = reply.send(());
            }
            SpeakerCommand::Shutdown => break,
        }
    }
    sink.stop();
    tracing::debug!("Speaker thread exiting");
}
