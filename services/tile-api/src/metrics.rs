//! Application metrics collection and reporting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use metrics::{counter, gauge, histogram};
use serde::Serialize;
use storage::{CacheStatus, TileMemoryCacheStats};
use tokio::sync::RwLock;

/// Metrics collector for the tile API.
#[derive(Debug)]
pub struct MetricsCollector {
    pub tile_requests: AtomicU64,
    pub cache_hits: AtomicU64,
    pub cache_misses: AtomicU64,
    pub tile_errors: AtomicU64,
    pub catalog_refreshes: AtomicU64,

    /// Whole-request timing, microseconds
    tile_times: RwLock<TimingStats>,

    start_time: Instant,
}

#[derive(Debug, Default)]
struct TimingStats {
    count: u64,
    total_us: u64,
    min_us: u64,
    max_us: u64,
    last_us: u64,
}

impl TimingStats {
    fn record(&mut self, duration_us: u64) {
        self.count += 1;
        self.total_us += duration_us;
        self.last_us = duration_us;
        if self.min_us == 0 || duration_us < self.min_us {
            self.min_us = duration_us;
        }
        if duration_us > self.max_us {
            self.max_us = duration_us;
        }
    }

    fn avg_ms(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            (self.total_us as f64 / self.count as f64) / 1000.0
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            tile_requests: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            tile_errors: AtomicU64::new(0),
            catalog_refreshes: AtomicU64::new(0),
            tile_times: RwLock::new(TimingStats::default()),
            start_time: Instant::now(),
        }
    }

    /// Record a served tile.
    pub async fn record_tile(&self, status: CacheStatus, elapsed: Duration) {
        self.tile_requests.fetch_add(1, Ordering::Relaxed);
        match status {
            CacheStatus::Hit => {
                self.cache_hits.fetch_add(1, Ordering::Relaxed);
                counter!("tile_cache_hits_total").increment(1);
            }
            CacheStatus::Miss => {
                self.cache_misses.fetch_add(1, Ordering::Relaxed);
                counter!("tile_cache_misses_total").increment(1);
            }
        }

        let duration_us = elapsed.as_micros() as u64;
        histogram!("tile_request_duration_ms").record(duration_us as f64 / 1000.0);
        self.tile_times.write().await.record(duration_us);
    }

    /// Record a tile request that failed.
    pub fn record_tile_error(&self) {
        self.tile_requests.fetch_add(1, Ordering::Relaxed);
        self.tile_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_catalog_refresh(&self, layers: usize) {
        self.catalog_refreshes.fetch_add(1, Ordering::Relaxed);
        counter!("catalog_refreshes_total").increment(1);
        gauge!("catalog_layers").set(layers as f64);
    }

    /// Update cache gauges from the response cache.
    pub fn record_tile_memory_cache_stats(&self, stats: &TileMemoryCacheStats) {
        gauge!("tile_memory_cache_hit_rate_percent").set(stats.hit_rate());
        gauge!("tile_memory_cache_entries").set(stats.entry_count() as f64);
        gauge!("tile_memory_cache_size_bytes").set(stats.size_bytes() as f64);
        gauge!("tile_memory_cache_evictions_total")
            .set(stats.evictions.load(Ordering::Relaxed) as f64);
        gauge!("tile_memory_cache_expired_total").set(stats.expired.load(Ordering::Relaxed) as f64);
        gauge!("tile_memory_cache_oversized_total")
            .set(stats.oversized.load(Ordering::Relaxed) as f64);
    }

    pub async fn snapshot(&self) -> MetricsSnapshot {
        let hits = self.cache_hits.load(Ordering::Relaxed);
        let misses = self.cache_misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let times = self.tile_times.read().await;

        MetricsSnapshot {
            uptime_secs: self.start_time.elapsed().as_secs(),
            tile_requests: self.tile_requests.load(Ordering::Relaxed),
            tile_errors: self.tile_errors.load(Ordering::Relaxed),
            cache_hits: hits,
            cache_misses: misses,
            cache_hit_rate: if total > 0 {
                (hits as f64 / total as f64) * 100.0
            } else {
                0.0
            },
            catalog_refreshes: self.catalog_refreshes.load(Ordering::Relaxed),
            tile_avg_ms: times.avg_ms(),
            tile_last_ms: times.last_us as f64 / 1000.0,
            tile_max_ms: times.max_us as f64 / 1000.0,
        }
    }
}

/// Point-in-time view of the collector, served as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub tile_requests: u64,
    pub tile_errors: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_hit_rate: f64,
    pub catalog_refreshes: u64,
    pub tile_avg_ms: f64,
    pub tile_last_ms: f64,
    pub tile_max_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_snapshot_counts_hits_and_misses() {
        let metrics = MetricsCollector::new();
        metrics
            .record_tile(CacheStatus::Miss, Duration::from_millis(20))
            .await;
        metrics
            .record_tile(CacheStatus::Hit, Duration::from_millis(2))
            .await;
        metrics.record_tile_error();

        let snapshot = metrics.snapshot().await;
        assert_eq!(snapshot.tile_requests, 3);
        assert_eq!(snapshot.tile_errors, 1);
        assert_eq!(snapshot.cache_hits, 1);
        assert_eq!(snapshot.cache_misses, 1);
        assert_eq!(snapshot.cache_hit_rate, 50.0);
        assert_eq!(snapshot.tile_avg_ms, 11.0);
        assert_eq!(snapshot.tile_max_ms, 20.0);
    }
}
