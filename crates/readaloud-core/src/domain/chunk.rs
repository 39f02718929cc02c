//! Synthesizer output units.

use bytes::Bytes;

/// What a synthesizer chunk carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    /// Compressed audio bytes, decodable once concatenated in order.
    Audio,
    /// Anything else the synthesizer interleaves (word boundaries, markers).
    Metadata,
}

/// One unit of synthesizer output. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    kind: ChunkKind,
    data: Bytes,
}

impl Chunk {
    pub fn new(kind: ChunkKind, data: impl Into<Bytes>) -> Self {
        Self {
            kind,
            data: data.into(),
        }
    }

    /// An audio chunk.
    pub fn audio(data: impl Into<Bytes>) -> Self {
        Self::new(ChunkKind::Audio, data)
    }

    /// A non-audio chunk; dropped before it reaches the decoder.
    pub fn metadata(data: impl Into<Bytes>) -> Self {
        Self::new(ChunkKind::Metadata, data)
    }

    #[must_use]
    pub const fn kind(&self) -> ChunkKind {
        self.kind
    }

    #[must_use]
    pub const fn is_audio(&self) -> bool {
        matches!(self.kind, ChunkKind::Audio)
    }

    #[must_use]
    pub const fn data(&self) -> &Bytes {
        &self.data
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Take the payload; cloning `Bytes` is not needed.
    #[must_use]
    pub fn into_data(self) -> Bytes {
        self.data
    }
}
