//! In-memory LRU cache for encoded tiles.
//!
//! Entries expire `ttl` after insertion; a TTL of zero or less disables the
//! cache entirely. Expiry is checked lazily on read.
//!
//! ## Memory-Based Eviction
//!
//! The cache uses memory-based eviction rather than entry count. When the
//! cache exceeds its configured memory limit, it evicts ~5% of capacity
//! (by memory) in a batch to make room for new tiles. A single tile larger
//! than the whole cache is never stored.
//!
//! ## Concurrent Misses
//!
//! [`TileMemoryCache::get_or_try_insert_with`] lets one caller per key run
//! the producer while other callers for the same key wait and then read the
//! stored result.

use bytes::Bytes;
use lru::LruCache;
use std::collections::HashMap;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Whether a tile came from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

/// In-memory LRU cache for encoded tiles.
pub struct TileMemoryCache {
    cache: Arc<RwLock<LruCache<String, CachedTile>>>,
    inflight: std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>,
    max_bytes: u64,
    /// `None` when caching is disabled
    default_ttl: Option<Duration>,
    stats: Arc<TileMemoryCacheStats>,
}

pub struct CachedTile {
    pub data: Bytes,
    pub inserted_at: Instant,
    pub ttl: Duration,
}

impl CachedTile {
    /// Live while `now < inserted_at + ttl`.
    pub fn is_expired(&self) -> bool {
        self.inserted_at.elapsed() >= self.ttl
    }
}

/// Statistics for the tile memory cache.
///
/// All fields are atomic for lock-free reads from metrics endpoints.
#[derive(Default)]
pub struct TileMemoryCacheStats {
    /// Total cache hits
    pub hits: AtomicU64,
    /// Total cache misses
    pub misses: AtomicU64,
    /// Total entries evicted (individual count)
    pub evictions: AtomicU64,
    /// Total entries expired via TTL
    pub expired: AtomicU64,
    /// Tiles not stored because they exceed the cache size
    pub oversized: AtomicU64,
    /// Current cache size in bytes
    pub size_bytes: AtomicU64,
    /// Current number of entries in cache
    pub entry_count: AtomicU64,
    /// Number of batch eviction runs
    pub eviction_runs: AtomicU64,
}

impl TileMemoryCacheStats {
    /// Calculate cache hit rate as a percentage (0-100).
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            (hits as f64 / total as f64) * 100.0
        }
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn entry_count(&self) -> u64 {
        self.entry_count.load(Ordering::Relaxed)
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes.load(Ordering::Relaxed)
    }
}

impl TileMemoryCache {
    /// Create a cache holding at most `max_size_mb` megabytes of tiles for
    /// `ttl_secs` seconds each. `ttl_secs <= 0` disables caching.
    pub fn new(max_size_mb: usize, ttl_secs: i64) -> Self {
        Self::with_max_bytes((max_size_mb as u64) * 1024 * 1024, ttl_secs)
    }

    /// Same as [`TileMemoryCache::new`] with the limit given in bytes.
    pub fn with_max_bytes(max_bytes: u64, ttl_secs: i64) -> Self {
        // Entry count is effectively unbounded; eviction is driven by memory.
        const LRU_CAPACITY: usize = 10_000_000;
        let cache_size = NonZeroUsize::new(LRU_CAPACITY).unwrap_or(NonZeroUsize::MIN);

        let default_ttl = (ttl_secs > 0).then(|| Duration::from_secs(ttl_secs as u64));

        Self {
            cache: Arc::new(RwLock::new(LruCache::new(cache_size))),
            inflight: std::sync::Mutex::new(HashMap::new()),
            max_bytes,
            default_ttl,
            stats: Arc::new(TileMemoryCacheStats::default()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.default_ttl.is_some()
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.default_ttl
    }

    /// Get a live tile. Expired entries are removed and count as misses.
    pub async fn get(&self, key: &str) -> Option<Bytes> {
        let found = self.lookup(key).await;
        if found.is_some() {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    async fn lookup(&self, key: &str) -> Option<Bytes> {
        if !self.is_enabled() {
            return None;
        }

        let mut cache = self.cache.write().await;
        let expired = match cache.get(key) {
            Some(tile) if !tile.is_expired() => return Some(tile.data.clone()),
            Some(_) => true,
            None => false,
        };

        if expired {
            if let Some(tile) = cache.pop(key) {
                self.stats.expired.fetch_add(1, Ordering::Relaxed);
                self.stats
                    .size_bytes
                    .fetch_sub(tile.data.len() as u64, Ordering::Relaxed);
                self.stats.entry_count.fetch_sub(1, Ordering::Relaxed);
            }
        }
        None
    }

    /// Store a tile with the default TTL. Does nothing when caching is
    /// disabled or the tile is larger than the whole cache.
    pub async fn set(&self, key: &str, data: Bytes) {
        let Some(ttl) = self.default_ttl else {
            return;
        };

        let tile_size = data.len() as u64;
        if tile_size > self.max_bytes {
            self.stats.oversized.fetch_add(1, Ordering::Relaxed);
            warn!(
                key = key,
                tile_bytes = tile_size,
                max_bytes = self.max_bytes,
                "Tile larger than cache capacity, not caching"
            );
            return;
        }

        let mut cache = self.cache.write().await;

        if let Some(existing) = cache.pop(key) {
            self.stats
                .size_bytes
                .fetch_sub(existing.data.len() as u64, Ordering::Relaxed);
            self.stats.entry_count.fetch_sub(1, Ordering::Relaxed);
        }

        // Evict inside the lock so the size check and eviction cannot race.
        while self.stats.size_bytes.load(Ordering::Relaxed) + tile_size > self.max_bytes {
            if self.evict_batch_locked(&mut cache) == 0 {
                break;
            }
        }

        cache.put(
            key.to_string(),
            CachedTile {
                data,
                inserted_at: Instant::now(),
                ttl,
            },
        );
        self.stats.entry_count.fetch_add(1, Ordering::Relaxed);
        self.stats
            .size_bytes
            .fetch_add(tile_size, Ordering::Relaxed);
    }

    /// Return the cached tile for `key`, or run `produce` and cache its
    /// output. Concurrent callers for the same key share one run of
    /// `produce`. Errors are returned to the caller that ran `produce` and
    /// nothing is stored.
    pub async fn get_or_try_insert_with<F, Fut, E>(
        &self,
        key: &str,
        produce: F,
    ) -> Result<(Bytes, CacheStatus), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Bytes, E>>,
    {
        if !self.is_enabled() {
            return produce().await.map(|data| (data, CacheStatus::Miss));
        }

        if let Some(data) = self.get(key).await {
            return Ok((data, CacheStatus::Hit));
        }

        let inflight = InflightGuard::acquire(self, key);
        let _held = inflight.lock.lock().await;
        if let Some(data) = self.lookup(key).await {
            debug!(key = key, "Tile produced by concurrent request");
            return Ok((data, CacheStatus::Hit));
        }
        let data = produce().await?;
        self.set(key, data.clone()).await;
        Ok((data, CacheStatus::Miss))
    }

    fn inflight_lock(&self, key: &str) -> Arc<Mutex<()>> {
        let mut inflight = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(
            inflight
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    fn release_inflight(&self, key: &str, key_lock: &Arc<Mutex<()>>) {
        let mut inflight = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
        let last_user = inflight
            .get(key)
            .map(|entry| Arc::ptr_eq(entry, key_lock) && Arc::strong_count(key_lock) == 2)
            .unwrap_or(false);
        if last_user {
            inflight.remove(key);
        }
    }

    /// Evict ~5% of cache capacity (by memory) using LRU order.
    ///
    /// Takes the already-locked cache. Returns the number of entries evicted.
    fn evict_batch_locked(&self, cache: &mut LruCache<String, CachedTile>) -> usize {
        let target_free = (self.max_bytes / 20).max(1);
        let mut bytes_freed = 0u64;
        let mut entries_evicted = 0usize;

        while bytes_freed < target_free {
            if let Some((_, evicted)) = cache.pop_lru() {
                bytes_freed += evicted.data.len() as u64;
                entries_evicted += 1;
            } else {
                break;
            }
        }

        self.stats
            .size_bytes
            .fetch_sub(bytes_freed, Ordering::Relaxed);
        self.stats
            .entry_count
            .fetch_sub(entries_evicted as u64, Ordering::Relaxed);
        self.stats
            .evictions
            .fetch_add(entries_evicted as u64, Ordering::Relaxed);
        self.stats.eviction_runs.fetch_add(1, Ordering::Relaxed);

        info!(
            entries_evicted = entries_evicted,
            bytes_freed_mb = format!("{:.2}", bytes_freed as f64 / (1024.0 * 1024.0)),
            max_size_mb = format!("{:.2}", self.max_bytes as f64 / (1024.0 * 1024.0)),
            "Tile cache batch eviction completed"
        );

        entries_evicted
    }

    /// Shared statistics.
    pub fn stats(&self) -> Arc<TileMemoryCacheStats> {
        Arc::clone(&self.stats)
    }

    pub fn len(&self) -> usize {
        self.stats.entry_count.load(Ordering::Relaxed) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub fn size_bytes(&self) -> u64 {
        self.stats.size_bytes.load(Ordering::Relaxed)
    }

    /// Drop all entries. Hit/miss counters are kept.
    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        cache.clear();
        self.stats.size_bytes.store(0, Ordering::Relaxed);
        self.stats.entry_count.store(0, Ordering::Relaxed);
    }
}

/// One caller's share of a key's inflight lock. Dropping it, including when
/// the caller's future is cancelled, removes the map entry once no other
/// caller holds it.
struct InflightGuard<'a> {
    cache: &'a TileMemoryCache,
    key: &'a str,
    lock: Arc<Mutex<()>>,
}

impl<'a> InflightGuard<'a> {
    fn acquire(cache: &'a TileMemoryCache, key: &'a str) -> Self {
        Self {
            cache,
            key,
            lock: cache.inflight_lock(key),
        }
    }
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        self.cache.release_inflight(self.key, &self.lock);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cache_basic_operations() {
        let cache = TileMemoryCache::new(100, 60);

        assert!(cache.is_empty());
        assert!(cache.get("roads0/0/0").await.is_none());

        let data = Bytes::from("tile data");
        cache.set("roads0/0/0", data.clone()).await;
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("roads0/0/0").await, Some(data));

        let stats = cache.stats();
        assert_eq!(stats.hits(), 1);
        assert_eq!(stats.misses(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_ttl_expiration() {
        let cache = TileMemoryCache::new(100, 5);
        cache.set("tile", Bytes::from("data")).await;

        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(cache.get("tile").await.is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cache.get("tile").await.is_none());

        let stats = cache.stats();
        assert_eq!(stats.expired.load(Ordering::Relaxed), 1);
        assert_eq!(stats.entry_count(), 0);
        assert_eq!(stats.size_bytes(), 0);
    }

    #[tokio::test]
    async fn test_disabled_cache_stores_nothing() {
        for ttl in [0, -1] {
            let cache = TileMemoryCache::new(100, ttl);
            assert!(!cache.is_enabled());
            cache.set("tile", Bytes::from("data")).await;
            assert!(cache.get("tile").await.is_none());
            assert!(cache.is_empty());
        }
    }

    #[tokio::test]
    async fn test_cache_memory_based_eviction() {
        let cache = TileMemoryCache::new(1, 60);

        let tile_100kb = Bytes::from(vec![0u8; 100 * 1024]);
        for i in 0..15 {
            cache.set(&format!("tile{}", i), tile_100kb.clone()).await;
        }

        let stats = cache.stats();
        assert!(stats.evictions.load(Ordering::Relaxed) > 0);
        assert!(stats.eviction_runs.load(Ordering::Relaxed) > 0);
        assert!(stats.size_bytes() <= 1024 * 1024);
        // Most recent tile survives.
        assert!(cache.get("tile14").await.is_some());
    }

    #[tokio::test]
    async fn test_oversized_tile_skipped() {
        let cache = TileMemoryCache::with_max_bytes(10, 60);
        cache.set("big", Bytes::from(vec![0u8; 11])).await;
        assert!(cache.is_empty());
        assert_eq!(cache.stats().oversized.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_cache_size_tracking() {
        let cache = TileMemoryCache::new(100, 60);

        cache.set("tile1", Bytes::from("hello")).await;
        cache.set("tile2", Bytes::from("world!")).await;
        assert_eq!(cache.size_bytes(), 11);

        cache.set("tile1", Bytes::from("hello world")).await;
        assert_eq!(cache.size_bytes(), 17);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_cache_clear() {
        let cache = TileMemoryCache::new(100, 60);
        cache.set("tile1", Bytes::from("data1")).await;
        cache.set("tile2", Bytes::from("data2")).await;

        cache.clear().await;
        assert!(cache.is_empty());
        assert_eq!(cache.size_bytes(), 0);
        assert!(cache.get("tile1").await.is_none());
    }

    #[tokio::test]
    async fn test_get_or_insert_error_not_cached() {
        let cache = TileMemoryCache::new(100, 60);

        let result: Result<_, &str> = cache
            .get_or_try_insert_with("tile", || async { Err("boom") })
            .await;
        assert!(result.is_err());
        assert!(cache.is_empty());

        let (data, status) = cache
            .get_or_try_insert_with("tile", || async { Ok::<_, &str>(Bytes::from("ok")) })
            .await
            .unwrap();
        assert_eq!(data, Bytes::from("ok"));
        assert_eq!(status, CacheStatus::Miss);

        let (_, status) = cache
            .get_or_try_insert_with("tile", || async { Ok::<_, &str>(Bytes::from("other")) })
            .await
            .unwrap();
        assert_eq!(status, CacheStatus::Hit);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_request_releases_key() {
        let cache = TileMemoryCache::new(100, 60);

        let pending = cache.get_or_try_insert_with("tile", || {
            std::future::pending::<Result<Bytes, &str>>()
        });
        let cancelled = tokio::time::timeout(Duration::from_secs(1), pending).await;
        assert!(cancelled.is_err());
        assert!(cache.inflight.lock().unwrap().is_empty());

        let (_, status) = cache
            .get_or_try_insert_with("tile", || async { Ok::<_, &str>(Bytes::from("ok")) })
            .await
            .unwrap();
        assert_eq!(status, CacheStatus::Miss);
        assert!(cache.inflight.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_key_until_last_leaves() {
        let cache = TileMemoryCache::new(100, 60);
        let first = InflightGuard::acquire(&cache, "tile");
        let second = InflightGuard::acquire(&cache, "tile");
        assert!(Arc::ptr_eq(&first.lock, &second.lock));

        drop(first);
        assert_eq!(cache.inflight.lock().unwrap().len(), 1);
        drop(second);
        assert!(cache.inflight.lock().unwrap().is_empty());
    }
}
