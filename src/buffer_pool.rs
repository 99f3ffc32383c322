use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Buffers above this capacity are never pooled; they are allocated and
/// freed normally.
pub const MAX_BUFFER_SIZE: usize = 64 * 1024 * 1024;

/// Maximum number of buffers the pool retains at once.
pub const MAX_POOL_SIZE: usize = 64;

/// A thread-safe recycler of raw byte buffers, indexed by reserved capacity.
///
/// Workers borrow a buffer sized for the file they're about to read and
/// return it once the caller is done with it, amortizing allocation across
/// repeated I/O. `acquire` picks the smallest resident buffer that is still
/// large enough for the request (best fit); `release` evicts the smallest
/// resident buffer when the pool is full and the incoming one is bigger,
/// biasing the pool toward keeping the buffers that were most expensive to
/// grow.
pub struct BufferPool {
    inner: Mutex<Vec<Vec<u8>>>,
    allocations: AtomicU64,
}

impl BufferPool {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Vec::with_capacity(MAX_POOL_SIZE)),
            allocations: AtomicU64::new(0),
        }
    }

    /// Returns a buffer with `capacity() >= min_size` and `len() == 0`.
    /// Prefers a pooled buffer (best fit by capacity); falls back to a fresh
    /// allocation, which increments the lifetime allocation counter.
    pub fn acquire(&self, min_size: usize) -> Vec<u8> {
        let mut pool = self.inner.lock();

        let mut best: Option<usize> = None;
        for (idx, buf) in pool.iter().enumerate() {
            if buf.capacity() >= min_size {
                let is_better = match best {
                    None => true,
                    Some(b) => buf.capacity() < pool[b].capacity(),
                };
                if is_better {
                    best = Some(idx);
                    if buf.capacity() == min_size {
                        break;
                    }
                }
            }
        }

        if let Some(idx) = best {
            let mut buf = pool.swap_remove(idx);
            buf.clear();
            return buf;
        }

        drop(pool);
        self.allocations.fetch_add(1, Ordering::Relaxed);
        Vec::with_capacity(min_size)
    }

    /// Returns a buffer to the pool for reuse. Buffers over [`MAX_BUFFER_SIZE`]
    /// or with zero capacity are dropped. If the pool is full, the incoming
    /// buffer replaces the smallest resident one only if it is strictly
    /// larger; otherwise it is dropped.
    pub fn release(&self, buffer: Vec<u8>) {
        if buffer.capacity() == 0 || buffer.capacity() > MAX_BUFFER_SIZE {
            return;
        }

        let mut pool = self.inner.lock();
        if pool.len() < MAX_POOL_SIZE {
            pool.push(buffer);
            return;
        }

        let mut smallest = 0;
        for idx in 1..pool.len() {
            if pool[idx].capacity() < pool[smallest].capacity() {
                smallest = idx;
            }
        }

        if buffer.capacity() > pool[smallest].capacity() {
            pool[smallest] = buffer;
        }
    }

    /// Drops every pooled buffer. The lifetime allocation counter is
    /// unaffected.
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Number of buffers currently resident in the pool.
    pub fn population(&self) -> usize {
        self.inner.lock().len()
    }

    /// Total capacity, in bytes, currently resident in the pool.
    pub fn pooled_bytes(&self) -> usize {
        self.inner.lock().iter().map(|b| b.capacity()).sum()
    }

    /// Number of buffers allocated from the system since construction
    /// (cache misses), not counting buffers served from the pool.
    pub fn lifetime_allocations(&self) -> u64 {
        self.allocations.load(Ordering::Relaxed)
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}
