//! Incremental decoder from compressed chunks to fixed-size PCM frames.
//!
//! The decoder reads through a [`PullSource`], so every read may block on the
//! chunk queue. It runs on the playback thread, never on the async runtime.
//!
//! Output is always [`FrameSpec`]-shaped: remixed to the target channel
//! count, resampled to the target rate, converted to i16 LE and cut into
//! whole frames. Any error ends the stream instead of propagating.

use bytes::{BufMut, BytesMut};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions, ReadOnlySource};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::DecodeError;
use crate::frame::{FrameSource, FrameSpec, PcmFrame};
use crate::pull_source::PullSource;
use crate::resample::StreamResampler;

enum DecoderState {
    /// Not yet probed; holds the byte source until first demand.
    Pending(PullSource),
    Active(Box<ActiveDecode>),
    Exhausted,
}

/// Lazy, forward-only sequence of PCM frames over a chunk stream.
pub struct FrameDecoder {
    spec: FrameSpec,
    hint: Option<String>,
    state: DecoderState,
    pcm: BytesMut,
    frames: u64,
}

impl FrameDecoder {
    pub fn new(source: PullSource, spec: FrameSpec) -> Self {
        Self {
            spec,
            hint: None,
            state: DecoderState::Pending(source),
            pcm: BytesMut::with_capacity(spec.frame_bytes() * 4),
            frames: 0,
        }
    }

    /// Container hint for probing, by file extension (`mp3`, `wav`, `ogg`).
    #[must_use]
    pub fn with_hint(mut self, extension: impl Into<String>) -> Self {
        self.hint = Some(extension.into());
        self
    }

    /// Probe the stream and set up the codec. Idempotent.
    ///
    /// Blocks until enough bytes arrive to identify the format. A stream that
    /// cannot be opened leaves the decoder exhausted.
    pub fn start(&mut self) {
        if !matches!(self.state, DecoderState::Pending(_)) {
            return;
        }
        let DecoderState::Pending(source) =
            std::mem::replace(&mut self.state, DecoderState::Exhausted)
        else {
            return;
        };

        match ActiveDecode::open(source, self.hint.as_deref(), self.spec) {
            Ok(active) => {
                tracing::debug!(
                    codec_rate = ?active.source_rate,
                    target_rate = self.spec.sample_rate,
                    "Audio stream opened"
                );
                self.state = DecoderState::Active(Box::new(active));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not open audio stream, treating as end of stream");
            }
        }
    }

    /// The next whole frame, or `None` at end-of-stream (and forever after).
    pub fn next_frame(&mut self) -> Option<PcmFrame> {
        self.start();
        let frame_bytes = self.spec.frame_bytes();

        loop {
            if self.pcm.len() >= frame_bytes {
                self.frames += 1;
                return Some(PcmFrame::new(self.pcm.split_to(frame_bytes).freeze()));
            }

            let DecoderState::Active(active) = &mut self.state else {
                if !self.pcm.is_empty() {
                    tracing::debug!(bytes = self.pcm.len(), "Dropping partial trailing frame");
                    self.pcm.clear();
                }
                return None;
            };

            match active.decode_next(&mut self.pcm) {
                Ok(true) => {}
                Ok(false) => {
                    if let Err(e) = active.finish(&mut self.pcm) {
                        tracing::warn!(error = %e, "Failed to flush resampler");
                    }
                    tracing::debug!(frames = self.frames, "Audio stream ended");
                    self.state = DecoderState::Exhausted;
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        frames = self.frames,
                        "Decode failed, treating as end of stream"
                    );
                    self.state = DecoderState::Exhausted;
                }
            }
        }
    }

    pub const fn is_exhausted(&self) -> bool {
        matches!(self.state, DecoderState::Exhausted)
    }

    /// Frames emitted so far.
    pub const fn frames_emitted(&self) -> u64 {
        self.frames
    }
}

impl FrameSource for FrameDecoder {
    fn start(&mut self) {
        Self::start(self);
    }

    fn read(&mut self) -> Option<PcmFrame> {
        self.next_frame()
    }
}

// ── Codec state ────────────────────────────────────────────────────

struct ActiveDecode {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    source_rate: Option<u32>,
    channels: usize,
    rate: RateStage,
    remixed: Vec<f32>,
}

impl ActiveDecode {
    fn open(source: PullSource, hint: Option<&str>, spec: FrameSpec) -> Result<Self, DecodeError> {
        let mss = MediaSourceStream::new(
            Box::new(ReadOnlySource::new(source)),
            MediaSourceStreamOptions::default(),
        );

        let mut probe_hint = Hint::new();
        if let Some(extension) = hint {
            probe_hint.with_extension(extension);
        }

        // Gapless trims encoder delay and padding before the first frame.
        let format_opts = FormatOptions {
            enable_gapless: true,
            ..Default::default()
        };
        let probed = symphonia::default::get_probe().format(
            &probe_hint,
            mss,
            &format_opts,
            &MetadataOptions::default(),
        )?;
        let format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(DecodeError::NoTrack)?;
        let track_id = track.id;
        let source_rate = track.codec_params.sample_rate;
        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())?;

        Ok(Self {
            format,
            decoder,
            track_id,
            source_rate,
            channels: usize::from(spec.channels),
            rate: RateStage::new(spec.sample_rate, usize::from(spec.channels)),
            remixed: Vec::new(),
        })
    }

    /// Decode one packet into `pcm`. `Ok(false)` means the input ended.
    fn decode_next(&mut self, pcm: &mut BytesMut) -> Result<bool, DecodeError> {
        loop {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) => {
                    tracing::trace!(error = %e, "Compressed input ended");
                    return Ok(false);
                }
                Err(SymphoniaError::ResetRequired) => return Ok(false),
                Err(e) => return Err(e.into()),
            };
            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = self.decoder.decode(&packet)?;
            let signal = *decoded.spec();
            let mut samples = SampleBuffer::<f32>::new(decoded.capacity() as u64, signal);
            samples.copy_interleaved_ref(decoded);

            self.remixed.clear();
            remix(
                samples.samples(),
                signal.channels.count(),
                self.channels,
                &mut self.remixed,
            );
            self.rate.write(signal.rate, &self.remixed, pcm)?;
            return Ok(true);
        }
    }

    fn finish(&mut self, pcm: &mut BytesMut) -> Result<(), DecodeError> {
        self.rate.finish(pcm)
    }
}

/// Conversion of remixed samples to the target rate.
///
/// The resampler is keyed by its input rate. A packet at a different rate
/// flushes the current resampler before the next one is built, so no
/// buffered audio is lost or played at the wrong speed.
struct RateStage {
    target_rate: u32,
    channels: usize,
    resampler: Option<(u32, StreamResampler)>,
    resampled: Vec<f32>,
}

impl RateStage {
    fn new(target_rate: u32, channels: usize) -> Self {
        Self {
            target_rate,
            channels,
            resampler: None,
            resampled: Vec::new(),
        }
    }

    fn write(&mut self, rate: u32, samples: &[f32], pcm: &mut BytesMut) -> Result<(), DecodeError> {
        if self.resampler.as_ref().is_some_and(|(from, _)| *from != rate) {
            tracing::debug!(rate, "Source rate changed mid-stream");
            self.finish(pcm)?;
        }

        if rate == self.target_rate {
            put_i16(samples, pcm);
            return Ok(());
        }

        if self.resampler.is_none() {
            let resampler = StreamResampler::new(rate, self.target_rate, self.channels)?;
            self.resampler = Some((rate, resampler));
        }
        let Some((_, resampler)) = self.resampler.as_mut() else {
            return Ok(());
        };
        self.resampled.clear();
        resampler.push(samples, &mut self.resampled)?;
        put_i16(&self.resampled, pcm);
        Ok(())
    }

    /// Flush and drop the current resampler, if any.
    fn finish(&mut self, pcm: &mut BytesMut) -> Result<(), DecodeError> {
        if let Some((_, mut resampler)) = self.resampler.take() {
            self.resampled.clear();
            resampler.finish(&mut self.resampled)?;
            put_i16(&self.resampled, pcm);
        }
        Ok(())
    }
}

/// Map `input` channels onto `output` channels: output channel `c` copies
/// input channel `min(c, input - 1)`. Mono is duplicated; extra input
/// channels are dropped.
fn remix(samples: &[f32], input: usize, output: usize, out: &mut Vec<f32>) {
    if input == 0 {
        return;
    }
    out.reserve(samples.len() / input * output);
    for frame in samples.chunks_exact(input) {
        for c in 0..output {
            out.push(frame[c.min(input - 1)]);
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn put_i16(samples: &[f32], pcm: &mut BytesMut) {
    pcm.reserve(samples.len() * 2);
    for sample in samples {
        pcm.put_i16_le((sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16);
    }
}
