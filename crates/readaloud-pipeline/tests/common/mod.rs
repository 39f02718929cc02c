//! Shared fixtures for the pipeline integration tests.
//!
//! Nothing here touches the network or audio hardware: audio is generated
//! as in-memory WAV and the synthesizer replays scripted chunk lists.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::{StreamExt, stream};
use tokio::sync::mpsc;

use readaloud_core::{Chunk, ChunkStream, SynthesisError, SynthesisRequest, Synthesizer, VoiceInfo};
use readaloud_pipeline::{ChannelOutput, PacedPlayer, Pacing, PcmFrame};

// ── Audio fixtures ─────────────────────────────────────────────────

/// A canonical 16-bit PCM WAV file holding `samples` (interleaved).
pub fn wav_bytes(sample_rate: u32, channels: u16, samples: &[i16]) -> Vec<u8> {
    let data_len = u32::try_from(samples.len() * 2).unwrap();
    let block_align = channels * 2;
    let byte_rate = sample_rate * u32::from(block_align);

    let mut out = Vec::with_capacity(44 + samples.len() * 2);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    for sample in samples {
        out.extend_from_slice(&sample.to_le_bytes());
    }
    out
}

/// A 440 Hz tone, `frames` samples per channel, same value on every channel.
pub fn tone(sample_rate: u32, channels: u16, frames: usize) -> Vec<i16> {
    let mut samples = Vec::with_capacity(frames * usize::from(channels));
    for n in 0..frames {
        let t = n as f32 / sample_rate as f32;
        let value = ((t * 440.0 * std::f32::consts::TAU).sin() * 8_000.0) as i16;
        for _ in 0..channels {
            samples.push(value);
        }
    }
    samples
}

/// Split `bytes` into audio chunks of at most `size` bytes.
pub fn audio_chunks(bytes: &[u8], size: usize) -> Vec<Chunk> {
    bytes
        .chunks(size)
        .map(|c| Chunk::audio(c.to_vec()))
        .collect()
}

// ── Scripted synthesizer ───────────────────────────────────────────

/// What the synthesizer does for one utterance text.
#[derive(Clone)]
pub enum Script {
    /// Yield these items, then end.
    Items(Vec<Result<Chunk, SynthesisError>>),
    /// Yield these chunks, then never end.
    ThenHang(Vec<Chunk>),
    /// `stream()` itself never returns.
    HangOpen,
    /// `stream()` fails with "no audio".
    NoAudio,
}

/// Shared, ordered record of what the synthesizer saw.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries().iter().position(|e| e == entry)
    }
}

/// Logs `dropped:<text>` when the chunk stream is dropped.
struct DropLog {
    log: EventLog,
    text: String,
}

impl Drop for DropLog {
    fn drop(&mut self) {
        self.log.push(format!("dropped:{}", self.text));
    }
}

/// Replays a [`Script`] per utterance text; unknown texts yield no audio.
#[derive(Clone, Default)]
pub struct ScriptedSynthesizer {
    scripts: HashMap<String, Script>,
    voices: Vec<VoiceInfo>,
    pub log: EventLog,
    pub voices_used: EventLog,
}

impl ScriptedSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, text: &str, script: Script) -> Self {
        self.scripts.insert(text.to_string(), script);
        self
    }

    pub fn with_voices(mut self, voices: Vec<VoiceInfo>) -> Self {
        self.voices = voices;
        self
    }
}

#[async_trait]
impl Synthesizer for ScriptedSynthesizer {
    async fn stream(&self, request: &SynthesisRequest) -> Result<ChunkStream, SynthesisError> {
        self.log.push(format!("started:{}", request.text));
        self.voices_used.push(request.voice.to_string());

        let guard = DropLog {
            log: self.log.clone(),
            text: request.text.clone(),
        };
        let items: ChunkStream = match self.scripts.get(&request.text).cloned() {
            Some(Script::Items(items)) => stream::iter(items).boxed(),
            Some(Script::ThenHang(chunks)) => stream::iter(chunks.into_iter().map(Ok))
                .chain(stream::pending())
                .boxed(),
            Some(Script::HangOpen) => return std::future::pending().await,
            Some(Script::NoAudio) | None => return Err(SynthesisError::NoAudio),
        };

        Ok(items
            .map(move |item| {
                let _keep = &guard;
                item
            })
            .boxed())
    }

    async fn voices(&self) -> Result<Vec<VoiceInfo>, SynthesisError> {
        Ok(self.voices.clone())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

// ── Players ────────────────────────────────────────────────────────

/// An unpaced player that records every frame it writes.
pub fn recording_player() -> (Arc<PacedPlayer>, mpsc::UnboundedReceiver<PcmFrame>) {
    let (output, rx) = ChannelOutput::channel();
    (Arc::new(PacedPlayer::new(Box::new(output), Pacing::Unpaced)), rx)
}

/// A real-time player that records every frame it writes.
pub fn real_time_player() -> (Arc<PacedPlayer>, mpsc::UnboundedReceiver<PcmFrame>) {
    let (output, rx) = ChannelOutput::channel();
    (Arc::new(PacedPlayer::new(Box::new(output), Pacing::RealTime)), rx)
}

/// A player whose output is already gone: the first write fails.
pub fn broken_player() -> Arc<PacedPlayer> {
    let (output, rx) = ChannelOutput::channel();
    drop(rx);
    Arc::new(PacedPlayer::new(Box::new(output), Pacing::Unpaced))
}

/// Drain every frame received so far.
pub fn drain_frames(rx: &mut mpsc::UnboundedReceiver<PcmFrame>) -> Vec<PcmFrame> {
    let mut frames = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        frames.push(frame);
    }
    frames
}

/// `seconds` of 48 kHz stereo tone as a WAV file split into audio chunks.
pub fn speech(seconds: f32) -> Vec<Chunk> {
    let frames = (48_000.0 * seconds) as usize;
    audio_chunks(&wav_bytes(48_000, 2, &tone(48_000, 2, frames)), 4_096)
}
