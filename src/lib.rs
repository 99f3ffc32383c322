//! Asynchronous asset-loading core: a fixed worker pool that reads and
//! decodes named assets off the calling thread, a lock-free hand-off queue,
//! a buffer recycler, and a byte-budgeted texture cache.
//!
//! The pack archive itself, the GPU uploader, and process startup (wiring a
//! concrete [`file_loader_pool::ArchiveReader`] and installing a `log`
//! backend) are external collaborators this crate does not implement.

pub mod buffer_pool;
pub mod config;
pub mod file_loader_pool;
pub mod image_decoder;
pub mod spsc_queue;
pub mod texture_cache;
pub mod types;

pub use buffer_pool::BufferPool;
pub use config::{CacheConfig, LoaderConfig};
pub use file_loader_pool::{ArchiveReader, FileLoaderPool};
pub use spsc_queue::SpscQueue;
pub use texture_cache::TextureCache;
pub use types::{CachedTexture, DecodedImage, ImageFormat, LoadRequest, LoadResult};
