//! Blocking chunk queue between the async producer and the decoder thread.
//!
//! The synthesizer pushes, the decoder pulls. `push` never blocks (the queue
//! is unbounded); `pull` blocks until a chunk arrives or the queue is
//! closed. Closing is the only end-of-stream signal, so closing is also how
//! a blocked decoder is released on cancellation.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;

#[derive(Debug, Default)]
struct QueueState {
    chunks: VecDeque<Bytes>,
    closed: bool,
}

/// Unbounded single-producer/single-consumer chunk queue with one
/// end-of-stream marker.
#[derive(Debug, Default)]
pub struct ChunkQueue {
    state: Mutex<QueueState>,
    ready: Condvar,
}

impl ChunkQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a chunk. Never blocks.
    ///
    /// Returns `false` if the chunk was dropped: the queue is already closed,
    /// or the chunk is empty (an empty pull means end-of-stream).
    pub fn push(&self, chunk: Bytes) -> bool {
        if chunk.is_empty() {
            return false;
        }
        let mut state = self.lock();
        if state.closed {
            return false;
        }
        state.chunks.push_back(chunk);
        drop(state);
        self.ready.notify_one();
        true
    }

    /// Mark end-of-stream. Returns `true` only for the call that closed it.
    pub fn close(&self) -> bool {
        let mut state = self.lock();
        if state.closed {
            return false;
        }
        state.closed = true;
        drop(state);
        self.ready.notify_all();
        true
    }

    /// Next chunk, blocking while the queue is open and empty.
    ///
    /// Returns an empty `Bytes` at end-of-stream, immediately and every time
    /// once the queue is closed and drained.
    pub fn pull(&self) -> Bytes {
        let mut state = self.lock();
        loop {
            if let Some(chunk) = state.chunks.pop_front() {
                return chunk;
            }
            if state.closed {
                return Bytes::new();
            }
            state = self
                .ready
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Chunks waiting to be pulled.
    pub fn len(&self) -> usize {
        self.lock().chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().chunks.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
