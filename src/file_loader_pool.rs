use crate::buffer_pool::BufferPool;
use crate::config::LoaderConfig;
use crate::image_decoder;
use crate::spsc_queue::SpscQueue;
use crate::types::{should_decode, DecodedImage, LoadRequest, LoadResult};
use crossbeam_queue::ArrayQueue;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

const IDLE_YIELD_THRESHOLD: u32 = 10;
const IDLE_SLEEP_THRESHOLD: u32 = 1000;
const IDLE_SLEEP_DURATION: Duration = Duration::from_millis(1);

/// The pack archive (or any other read-only blob store) the pool reads
/// files from. An external collaborator: this crate only depends on the
/// trait, never on a concrete archive implementation.
pub trait ArchiveReader: Send + Sync {
    /// Returns the named file's bytes, drawing buffer capacity from `pool`.
    /// Returns an empty `Vec` on miss or error.
    fn read_file_with_pool(&self, filename: &str, pool: &BufferPool) -> Vec<u8>;
}

struct WorkerHandle {
    queue: Arc<SpscQueue<LoadRequest>>,
    busy: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

struct PoolState {
    workers: Vec<WorkerHandle>,
    completion: Arc<ArrayQueue<LoadResult>>,
    shutdown: Arc<AtomicBool>,
}

/// Orchestrates a fixed pool of worker threads that read (and optionally
/// decode) named assets from an [`ArchiveReader`] without blocking the
/// submitting thread.
///
/// Each worker owns a dedicated single-producer/single-consumer request
/// queue (the pool's dispatcher is the sole producer); all workers share one
/// multi-producer completion queue that the submitting thread drains with
/// [`FileLoaderPool::fetch`]. Completion order is unspecified — only the
/// `request_id` correlates a result back to its request.
pub struct FileLoaderPool<A: ArchiveReader> {
    archive: Arc<A>,
    buffer_pool: Arc<BufferPool>,
    config: LoaderConfig,
    state: Mutex<Option<PoolState>>,
    next_request_id: AtomicU32,
    active_tasks: AtomicUsize,
}

impl<A: ArchiveReader + 'static> FileLoaderPool<A> {
    pub fn new(archive: Arc<A>, config: LoaderConfig) -> Self {
        Self {
            archive,
            buffer_pool: Arc::new(BufferPool::new()),
            config,
            state: Mutex::new(None),
            next_request_id: AtomicU32::new(0),
            active_tasks: AtomicUsize::new(0),
        }
    }

    /// Spawns the worker threads. Returns `false` (leaving the pool
    /// uninitialized, safe to retry) if already initialized or if a worker
    /// thread fails to spawn.
    pub fn initialize(&self) -> bool {
        let mut guard = self.state.lock();
        if guard.is_some() {
            log::error!("file loader pool: initialize called while already initialized");
            return false;
        }

        let thread_count = self.config.resolved_thread_count();
        let shutdown = Arc::new(AtomicBool::new(false));
        let completion = Arc::new(ArrayQueue::new(self.config.completed_queue_size));
        let mut workers = Vec::with_capacity(thread_count);

        for idx in 0..thread_count {
            let queue = Arc::new(SpscQueue::new(self.config.request_queue_size));
            let busy = Arc::new(AtomicBool::new(false));

            let worker_queue = queue.clone();
            let worker_busy = busy.clone();
            let worker_completion = completion.clone();
            let worker_shutdown = shutdown.clone();
            let archive = self.archive.clone();
            let buffer_pool = self.buffer_pool.clone();

            let spawned = thread::Builder::new()
                .name(format!("asset-loader-{idx}"))
                .spawn(move || {
                    worker_loop(
                        worker_queue,
                        worker_completion,
                        worker_shutdown,
                        worker_busy,
                        archive,
                        buffer_pool,
                    )
                });

            match spawned {
                Ok(thread) => workers.push(WorkerHandle {
                    queue,
                    busy,
                    thread: Some(thread),
                }),
                Err(e) => {
                    log::error!("file loader pool: failed to spawn worker {idx}: {e}");
                    shutdown.store(true, Ordering::Release);
                    for w in workers {
                        if let Some(t) = w.thread {
                            let _ = t.join();
                        }
                    }
                    return false;
                }
            }
        }

        log::info!("file loader pool: initialized with {thread_count} workers");
        *guard = Some(PoolState {
            workers,
            completion,
            shutdown,
        });
        true
    }

    /// Signals shutdown and joins every worker. Idempotent: calling this on
    /// an uninitialized or already-shut-down pool is a no-op.
    pub fn shutdown(&self) {
        let mut guard = self.state.lock();
        if let Some(state) = guard.take() {
            state.shutdown.store(true, Ordering::Release);
            for worker in state.workers {
                if let Some(thread) = worker.thread {
                    let _ = thread.join();
                }
            }
            log::info!("file loader pool: shut down");
        }
    }

    /// Submits a load request for `filename`. Dispatches to the least-loaded
    /// worker, falling back to a round-robin scan of the rest if that
    /// worker's queue is full. Returns `false` (no state change) if the pool
    /// isn't initialized or every worker's queue is full.
    pub fn request(&self, filename: impl Into<String>) -> bool {
        let filename = filename.into();
        let guard = self.state.lock();
        let state = match guard.as_ref() {
            Some(s) => s,
            None => {
                log::error!("file loader pool: request('{filename}') before initialize");
                return false;
            }
        };

        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let decode_image = should_decode(&filename);
        let req = LoadRequest {
            filename,
            request_id,
            decode_image,
        };

        let worker_count = state.workers.len();
        let mut best = 0;
        for i in 1..worker_count {
            if state.workers[i].queue.len() < state.workers[best].queue.len() {
                best = i;
            }
        }

        if state.workers[best].queue.push(req.clone()) {
            self.active_tasks.fetch_add(1, Ordering::AcqRel);
            return true;
        }

        for offset in 1..worker_count {
            let idx = (best + offset) % worker_count;
            if state.workers[idx].queue.push(req.clone()) {
                self.active_tasks.fetch_add(1, Ordering::AcqRel);
                return true;
            }
        }

        log::error!(
            "file loader pool: all {worker_count} worker queues full, dropping request for '{}'",
            req.filename
        );
        false
    }

    /// Pops one completed result into `out`, if any is available. Never
    /// blocks.
    pub fn fetch(&self, out: &mut LoadResult) -> bool {
        let guard = self.state.lock();
        let state = match guard.as_ref() {
            Some(s) => s,
            None => return false,
        };

        match state.completion.pop() {
            Some(result) => {
                *out = result;
                self.active_tasks.fetch_sub(1, Ordering::AcqRel);
                true
            }
            None => false,
        }
    }

    /// `true` iff every submitted request has had a matching `fetch`.
    pub fn is_idle(&self) -> bool {
        self.active_tasks.load(Ordering::Acquire) == 0
    }

    /// Approximate sum of per-worker request-queue depths. Observational
    /// only.
    pub fn pending_count(&self) -> usize {
        let guard = self.state.lock();
        match guard.as_ref() {
            Some(state) => state.workers.iter().map(|w| w.queue.len()).sum(),
            None => 0,
        }
    }

    /// Per-worker busy snapshot, for instrumentation. Empty if uninitialized.
    pub fn worker_busy_snapshot(&self) -> Vec<bool> {
        let guard = self.state.lock();
        match guard.as_ref() {
            Some(state) => state
                .workers
                .iter()
                .map(|w| w.busy.load(Ordering::Relaxed))
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn buffer_pool(&self) -> &Arc<BufferPool> {
        &self.buffer_pool
    }
}

impl<A: ArchiveReader> Drop for FileLoaderPool<A> {
    fn drop(&mut self) {
        let mut guard = self.state.lock();
        if let Some(state) = guard.take() {
            state.shutdown.store(true, Ordering::Release);
            for worker in state.workers {
                if let Some(thread) = worker.thread {
                    let _ = thread.join();
                }
            }
        }
    }
}

fn worker_loop<A: ArchiveReader>(
    queue: Arc<SpscQueue<LoadRequest>>,
    completion: Arc<ArrayQueue<LoadResult>>,
    shutdown: Arc<AtomicBool>,
    busy: Arc<AtomicBool>,
    archive: Arc<A>,
    buffer_pool: Arc<BufferPool>,
) {
    let mut idle_count: u32 = 0;

    loop {
        if shutdown.load(Ordering::Acquire) {
            return;
        }

        match queue.pop() {
            Some(req) => {
                busy.store(true, Ordering::Relaxed);
                idle_count = 0;

                let result = process_request(req, archive.as_ref(), &buffer_pool);

                let mut pending = result;
                loop {
                    match completion.push(pending) {
                        Ok(()) => break,
                        Err(returned) => {
                            pending = returned;
                            if shutdown.load(Ordering::Acquire) {
                                break;
                            }
                            thread::yield_now();
                        }
                    }
                }

                busy.store(false, Ordering::Relaxed);
            }
            None => {
                idle_count += 1;
                if idle_count > IDLE_SLEEP_THRESHOLD {
                    thread::sleep(IDLE_SLEEP_DURATION);
                    idle_count = 0;
                } else if idle_count > IDLE_YIELD_THRESHOLD {
                    thread::yield_now();
                }
            }
        }
    }
}

fn process_request<A: ArchiveReader>(
    req: LoadRequest,
    archive: &A,
    buffer_pool: &BufferPool,
) -> LoadResult {
    let mut file_bytes = archive.read_file_with_pool(&req.filename, buffer_pool);
    let mut decoded_image = DecodedImage::default();
    let mut has_decoded_image = false;

    if req.decode_image && !file_bytes.is_empty() {
        if image_decoder::decode(&file_bytes, &mut decoded_image) {
            has_decoded_image = true;
            let emptied = std::mem::take(&mut file_bytes);
            buffer_pool.release(emptied);
        } else {
            log::warn!("file loader pool: decode failed for '{}'", req.filename);
        }
    }

    LoadResult {
        filename: req.filename,
        request_id: req.request_id,
        file_bytes,
        decoded_image,
        has_decoded_image,
    }
}
