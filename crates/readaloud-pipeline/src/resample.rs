//! Streaming sample-rate conversion.
//!
//! Wraps rubato's fixed-input FFT resampler so decoded packets of any size
//! can be pushed incrementally. The resampler's own output delay is dropped
//! from the front of the stream, and [`StreamResampler::finish`] flushes the
//! tail so output length tracks `input × ratio`.

use rubato::{FftFixedIn, Resampler};

use crate::error::DecodeError;

/// Input frames handed to rubato per call.
const CHUNK_FRAMES: usize = 1024;

/// Zero-padded flush rounds before giving up on reaching the target length.
const MAX_FLUSH_ROUNDS: usize = 8;

/// Incremental resampler over interleaved samples.
pub struct StreamResampler {
    inner: FftFixedIn<f32>,
    channels: usize,
    ratio: f64,
    pending: Vec<Vec<f32>>,
    delay_to_skip: usize,
    input_frames: u64,
    output_frames: u64,
}

impl StreamResampler {
    pub fn new(from_rate: u32, to_rate: u32, channels: usize) -> Result<Self, DecodeError> {
        let inner = FftFixedIn::<f32>::new(
            from_rate as usize,
            to_rate as usize,
            CHUNK_FRAMES,
            2, // sub-chunks for quality
            channels,
        )
        .map_err(|e| DecodeError::Resample(e.to_string()))?;
        let delay_to_skip = inner.output_delay();

        tracing::debug!(from_rate, to_rate, channels, delay_to_skip, "Resampler created");

        Ok(Self {
            inner,
            channels,
            ratio: f64::from(to_rate) / f64::from(from_rate),
            pending: vec![Vec::with_capacity(CHUNK_FRAMES * 2); channels],
            delay_to_skip,
            input_frames: 0,
            output_frames: 0,
        })
    }

    /// Feed interleaved input; whatever full chunks are ready come out
    /// interleaved into `out`.
    pub fn push(&mut self, interleaved: &[f32], out: &mut Vec<f32>) -> Result<(), DecodeError> {
        for frame in interleaved.chunks_exact(self.channels) {
            for (channel, sample) in self.pending.iter_mut().zip(frame) {
                channel.push(*sample);
            }
        }
        self.input_frames += (interleaved.len() / self.channels) as u64;

        while self.pending[0].len() >= CHUNK_FRAMES {
            let output = {
                let chunk: Vec<&[f32]> = self
                    .pending
                    .iter()
                    .map(|channel| &channel[..CHUNK_FRAMES])
                    .collect();
                self.inner
                    .process(&chunk, None)
                    .map_err(|e| DecodeError::Resample(e.to_string()))?
            };
            for channel in &mut self.pending {
                channel.drain(..CHUNK_FRAMES);
            }
            self.emit(&output, usize::MAX, out);
        }
        Ok(())
    }

    /// Flush buffered input by padding with silence.
    pub fn finish(&mut self, out: &mut Vec<f32>) -> Result<(), DecodeError> {
        #[allow(
            clippy::cast_precision_loss,
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss
        )]
        let target = (self.input_frames as f64 * self.ratio).round() as u64;

        let mut rounds = 0;
        while self.output_frames < target && rounds < MAX_FLUSH_ROUNDS {
            let mut padded = std::mem::take(&mut self.pending);
            for channel in &mut padded {
                channel.resize(CHUNK_FRAMES, 0.0);
            }
            let chunk: Vec<&[f32]> = padded.iter().map(Vec::as_slice).collect();
            let output = self
                .inner
                .process(&chunk, None)
                .map_err(|e| DecodeError::Resample(e.to_string()))?;

            let remaining = usize::try_from(target - self.output_frames).unwrap_or(usize::MAX);
            self.emit(&output, remaining, out);
            self.pending = vec![Vec::new(); self.channels];
            rounds += 1;
        }
        Ok(())
    }

    fn emit(&mut self, output: &[Vec<f32>], limit: usize, out: &mut Vec<f32>) {
        let frames = output.first().map_or(0, Vec::len);
        let skip = self.delay_to_skip.min(frames);
        self.delay_to_skip -= skip;

        let end = frames.min(skip.saturating_add(limit));
        for i in skip..end {
            for channel in output {
                out.push(channel[i]);
            }
        }
        self.output_frames += (end - skip) as u64;
    }
}
