use crate::config::CacheConfig;
use crate::types::CachedTexture;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

/// A byte-budgeted LRU cache of decoded textures, keyed by filename.
///
/// Hit/miss counters are independent atomics so `hit_rate` can be read
/// without contending the entry map's mutex. A single entry whose declared
/// `memory_size` exceeds a quarter of the budget is rejected outright,
/// guarding against one oversize asset flushing everything else out.
pub struct TextureCache {
    inner: Mutex<Inner>,
    hits: AtomicU64,
    misses: AtomicU64,
    max_memory: usize,
}

struct Inner {
    entries: LruCache<String, CachedTexture>,
    current_memory: usize,
}

impl TextureCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Mutex::new(Inner {
                // unbounded by count; eviction is driven purely by the byte
                // budget, so the LRU capacity itself is never the limiting
                // factor.
                entries: LruCache::new(NonZeroUsize::new(usize::MAX).unwrap()),
                current_memory: 0,
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            max_memory: config.max_memory,
        }
    }

    /// Looks up `filename`, marking it most-recently-used on a hit. Returns
    /// an owned clone; the cache retains its own copy.
    pub fn get(&self, filename: &str) -> Option<CachedTexture> {
        let mut inner = self.inner.lock();
        match inner.entries.get(filename) {
            Some(texture) => {
                let texture = texture.clone();
                drop(inner);
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(texture)
            }
            None => {
                drop(inner);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Inserts or replaces `texture` under `filename`, evicting LRU entries
    /// until it fits the byte budget. Rejects the insert (a no-op) if
    /// `texture.memory_size` alone exceeds a quarter of the budget.
    pub fn put(&self, filename: String, texture: CachedTexture) {
        let max_entry = self.max_memory / 4;
        if texture.memory_size > max_entry {
            log::warn!(
                "texture cache: rejecting '{filename}' ({} bytes > quarter of {} byte budget)",
                texture.memory_size,
                self.max_memory
            );
            return;
        }

        let mut inner = self.inner.lock();

        if let Some(existing) = inner.entries.pop(&filename) {
            inner.current_memory -= existing.memory_size;
        }

        while inner.current_memory + texture.memory_size > self.max_memory && !inner.entries.is_empty() {
            if let Some((_, evicted)) = inner.entries.pop_lru() {
                inner.current_memory -= evicted.memory_size;
            }
        }

        inner.current_memory += texture.memory_size;
        inner.entries.put(filename, texture);
    }

    /// Drops every entry and resets tracked memory. Hit/miss counters are
    /// untouched.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.current_memory = 0;
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn current_memory(&self) -> usize {
        self.inner.lock().current_memory
    }

    pub fn max_memory(&self) -> usize {
        self.max_memory
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Fraction of lookups that were hits, in `[0.0, 1.0]`. Zero when there
    /// have been no lookups at all.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits() as f64;
        let misses = self.misses() as f64;
        let total = hits + misses;
        if total == 0.0 {
            0.0
        } else {
            hits / total
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texture(filename: &str, memory_size: usize) -> CachedTexture {
        CachedTexture {
            pixels: vec![0u8; memory_size],
            width: 1,
            height: 1,
            memory_size,
            filename: filename.to_string(),
        }
    }

    #[test]
    fn put_then_get_returns_equal_value_and_marks_mru() {
        let cache = TextureCache::new(CacheConfig { max_memory: 4096 });
        cache.put("a.png".into(), texture("a.png", 100));
        let got = cache.get("a.png").unwrap();
        assert_eq!(got.memory_size, 100);
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 0);
    }

    #[test]
    fn get_on_missing_key_counts_as_miss() {
        let cache = TextureCache::new(CacheConfig::default());
        assert!(cache.get("missing").is_none());
        assert_eq!(cache.misses(), 1);
    }

    #[test]
    fn oversize_entry_is_rejected() {
        let cache = TextureCache::new(CacheConfig { max_memory: 4096 });
        cache.put("big.png".into(), texture("big.png", 2000)); // > 4096/4
        assert!(cache.get("big.png").is_none());
        assert_eq!(cache.current_memory(), 0);
    }

    #[test]
    fn entry_at_exactly_quarter_budget_is_accepted() {
        let cache = TextureCache::new(CacheConfig { max_memory: 4096 });
        cache.put("edge.png".into(), texture("edge.png", 1024));
        assert!(cache.get("edge.png").is_some());
    }

    #[test]
    fn filling_to_exactly_the_budget_does_not_evict() {
        let cache = TextureCache::new(CacheConfig { max_memory: 4096 });
        // four quarter-budget entries land exactly on max_memory; the
        // eviction loop only triggers when current + incoming would
        // strictly exceed the budget, so nothing should be evicted.
        cache.put("k1".into(), texture("k1", 1024));
        cache.put("k2".into(), texture("k2", 1024));
        cache.put("k3".into(), texture("k3", 1024));
        cache.put("k4".into(), texture("k4", 1024));
        assert_eq!(cache.current_memory(), 4096);
        assert_eq!(cache.len(), 4);
        assert!(cache.get("k1").is_some());
    }

    #[test]
    fn lru_eviction_under_pressure() {
        let cache = TextureCache::new(CacheConfig {
            max_memory: 4 * 1024 * 1024,
        });
        let one_mib = 1024 * 1024;
        cache.put("k1".into(), texture("k1", one_mib));
        cache.put("k2".into(), texture("k2", one_mib));
        cache.put("k3".into(), texture("k3", one_mib));
        cache.put("k4".into(), texture("k4", one_mib));

        assert!(cache.get("k1").is_some()); // touch k1, now MRU

        cache.put("k5".into(), texture("k5", one_mib)); // evicts k2 (LRU)

        assert!(cache.get("k2").is_none());
        assert!(cache.get("k1").is_some());
    }

    #[test]
    fn reinserting_same_key_leaves_single_entry() {
        let cache = TextureCache::new(CacheConfig { max_memory: 4096 });
        cache.put("a.png".into(), texture("a.png", 100));
        cache.put("a.png".into(), texture("a.png", 200));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.current_memory(), 200);
        assert_eq!(cache.get("a.png").unwrap().memory_size, 200);
    }

    #[test]
    fn clear_resets_entries_and_memory_but_not_stats() {
        let cache = TextureCache::new(CacheConfig::default());
        cache.put("a.png".into(), texture("a.png", 100));
        cache.get("a.png");
        cache.get("missing");
        cache.clear();
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.current_memory(), 0);
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
    }

    #[test]
    fn hit_rate_is_zero_with_no_lookups() {
        let cache = TextureCache::new(CacheConfig::default());
        assert_eq!(cache.hit_rate(), 0.0);
    }

    #[test]
    fn hit_rate_reflects_hits_over_total() {
        let cache = TextureCache::new(CacheConfig::default());
        cache.put("a.png".into(), texture("a.png", 10));
        cache.get("a.png");
        cache.get("a.png");
        cache.get("missing");
        assert!((cache.hit_rate() - (2.0 / 3.0)).abs() < 1e-9);
    }
}
