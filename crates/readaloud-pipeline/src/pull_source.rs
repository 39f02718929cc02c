//! Pull-side view of a [`ChunkQueue`].
//!
//! Decoders want "give me up to N bytes"; the queue hands out whole chunks.
//! `PullSource` keeps the unread tail of the last chunk and only returns
//! zero bytes once the queue reports end-of-stream.

use std::io::{self, Read};
use std::sync::Arc;

use bytes::Bytes;

use crate::queue::ChunkQueue;

/// Blocking byte reader over a [`ChunkQueue`].
#[derive(Debug)]
pub struct PullSource {
    queue: Arc<ChunkQueue>,
    pending: Bytes,
    exhausted: bool,
}

impl PullSource {
    pub fn new(queue: Arc<ChunkQueue>) -> Self {
        Self {
            queue,
            pending: Bytes::new(),
            exhausted: false,
        }
    }

    /// Up to `max_bytes` of the stream, blocking until data or end-of-stream.
    ///
    /// An empty result means end-of-stream (or `max_bytes == 0`).
    pub fn read_chunk(&mut self, max_bytes: usize) -> Bytes {
        if max_bytes == 0 {
            return Bytes::new();
        }
        if self.pending.is_empty() {
            if self.exhausted {
                return Bytes::new();
            }
            self.pending = self.queue.pull();
            if self.pending.is_empty() {
                self.exhausted = true;
                return Bytes::new();
            }
        }
        let take = max_bytes.min(self.pending.len());
        self.pending.split_to(take)
    }

    /// True once end-of-stream has been observed.
    pub const fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

impl Read for PullSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let chunk = self.read_chunk(buf.len());
        buf[..chunk.len()].copy_from_slice(&chunk);
        Ok(chunk.len())
    }
}
