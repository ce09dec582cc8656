//! Fixed-capacity line buffers and the free-list that recycles them.

use std::sync::Arc;

use crossbeam_queue::ArrayQueue;

/// A byte buffer that never grows past the capacity it was created with.
#[derive(Debug, Clone)]
pub struct RecordBuffer {
    buf: Box<[u8]>,
    len: usize,
}

impl RecordBuffer {
    pub fn new(capacity: usize) -> Self {
        Self { buf: vec![0; capacity].into_boxed_slice(), len: 0 }
    }

    /// Overwrites the contents with `src`, silently truncated to capacity.
    pub fn fill(&mut self, src: &[u8]) -> &[u8] {
        let n = src.len().min(self.buf.len());
        self.buf[..n].copy_from_slice(&src[..n]);
        self.len = n;
        &self.buf[..n]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Bounded lock-free free-list of [`RecordBuffer`]s shared by the orchestrator
/// (which takes) and the workers (which give back).
#[derive(Debug, Clone)]
pub struct BufferPool {
    free: Arc<ArrayQueue<RecordBuffer>>,
    buffer_len: usize,
}

impl BufferPool {
    /// Creates a pool holding `slots` pre-allocated buffers of `buffer_len` bytes.
    pub fn new(slots: usize, buffer_len: usize) -> Self {
        let free = ArrayQueue::new(slots.max(1));
        while free.push(RecordBuffer::new(buffer_len)).is_ok() {}
        Self { free: Arc::new(free), buffer_len }
    }

    /// Takes a free buffer, allocating only when the free-list is empty.
    pub fn take(&self) -> RecordBuffer {
        self.free.pop().unwrap_or_else(|| {
            log::trace!("buffer pool empty, allocating");
            RecordBuffer::new(self.buffer_len)
        })
    }

    /// Returns a buffer. Dropped if the pool is already full.
    pub fn give(&self, buf: RecordBuffer) {
        let _ = self.free.push(buf);
    }

    pub fn available(&self) -> usize {
        self.free.len()
    }
}
