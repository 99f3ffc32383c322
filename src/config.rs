//! Plain-struct configuration for the loader pool and the texture cache.
//!
//! Unlike the rest of this codebase's `config.rs`, which persists user
//! keybindings to an INI file, this crate has no state of its own to
//! persist — the embedding client constructs these structs directly.

/// Tunables for [`crate::file_loader_pool::FileLoaderPool`].
#[derive(Debug, Clone, Copy)]
pub struct LoaderConfig {
    /// Worker thread count. `0` means "pick automatically". Clamped to
    /// `[MIN_THREADS, MAX_THREADS]` by `validate`.
    pub thread_count: usize,
    /// Capacity of each worker's request queue (rounded up to a power of two).
    pub request_queue_size: usize,
    /// Capacity of the shared completion queue.
    pub completed_queue_size: usize,
}

impl LoaderConfig {
    pub const MIN_THREADS: usize = 4;
    pub const MAX_THREADS: usize = 16;
    pub const DEFAULT_REQUEST_QUEUE_SIZE: usize = 16_384;
    pub const DEFAULT_COMPLETED_QUEUE_SIZE: usize = 32_768;

    /// Clamps `thread_count` into `[MIN_THREADS, MAX_THREADS]`. `0` resolves
    /// to `max(MIN_THREADS, available_parallelism / 2)`.
    pub fn resolved_thread_count(&self) -> usize {
        if self.thread_count == 0 {
            let available = std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(Self::MIN_THREADS);
            return (available / 2).max(Self::MIN_THREADS).min(Self::MAX_THREADS);
        }
        self.thread_count.clamp(Self::MIN_THREADS, Self::MAX_THREADS)
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            thread_count: 0,
            request_queue_size: Self::DEFAULT_REQUEST_QUEUE_SIZE,
            completed_queue_size: Self::DEFAULT_COMPLETED_QUEUE_SIZE,
        }
    }
}

/// Tunables for [`crate::texture_cache::TextureCache`].
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    /// Total byte budget for cached textures.
    pub max_memory: usize,
}

impl CacheConfig {
    pub const DEFAULT_MAX_MEMORY: usize = 256 * 1024 * 1024;

    /// A single entry may not exceed this fraction of `max_memory`.
    pub fn max_entry_size(&self) -> usize {
        self.max_memory / 4
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_memory: Self::DEFAULT_MAX_MEMORY,
        }
    }
}
