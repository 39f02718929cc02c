//! PCM frame geometry.
//!
//! The playback sink consumes fixed 20 ms blocks of 48 kHz stereo 16-bit
//! little-endian PCM. Every emitted frame has exactly
//! [`FrameSpec::frame_bytes`] bytes.

use std::time::Duration;

use bytes::Bytes;

/// Playback sample rate.
pub const SAMPLE_RATE: u32 = 48_000;

/// Playback channel count (interleaved).
pub const CHANNELS: u16 = 2;

/// Bytes per sample (signed 16-bit).
pub const BYTES_PER_SAMPLE: usize = 2;

/// Playback frame duration.
pub const FRAME_DURATION: Duration = Duration::from_millis(20);

/// Shape of the frames a decoder emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSpec {
    pub sample_rate: u32,
    pub channels: u16,
    pub frame_duration: Duration,
}

impl FrameSpec {
    /// 48 kHz, stereo, 20 ms: 3840 bytes per frame.
    #[must_use]
    pub const fn playback() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            channels: CHANNELS,
            frame_duration: FRAME_DURATION,
        }
    }

    /// Samples per channel in one frame.
    #[must_use]
    pub fn samples_per_channel(&self) -> usize {
        let samples =
            u128::from(self.sample_rate) * self.frame_duration.as_micros() / 1_000_000;
        usize::try_from(samples).unwrap_or(usize::MAX)
    }

    /// Interleaved samples in one frame.
    #[must_use]
    pub fn samples_per_frame(&self) -> usize {
        self.samples_per_channel() * usize::from(self.channels)
    }

    /// Bytes in one frame.
    #[must_use]
    pub fn frame_bytes(&self) -> usize {
        self.samples_per_frame() * BYTES_PER_SAMPLE
    }
}

impl Default for FrameSpec {
    fn default() -> Self {
        Self::playback()
    }
}

/// One frame of interleaved i16 little-endian PCM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmFrame(Bytes);

impl PcmFrame {
    pub(crate) const fn new(data: Bytes) -> Self {
        Self(data)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decoded sample values, interleaved.
    pub fn samples(&self) -> impl Iterator<Item = i16> + '_ {
        self.0
            .chunks_exact(BYTES_PER_SAMPLE)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
    }
}

/// Anything that yields PCM frames to a playback sink.
///
/// `start` performs one-time lazy initialization; `read` returns `None` at
/// end-of-stream and keeps returning `None` afterwards.
pub trait FrameSource: Send {
    fn start(&mut self);

    fn read(&mut self) -> Option<PcmFrame>;
}
