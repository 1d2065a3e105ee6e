//! Cache Statistics Module
//!
//! Tracks cache performance metrics: hits, misses, evictions, expiry
//! removals, entry count, byte usage, and a moving-average access time.

use serde::Serialize;

// == EMA Weight ==
/// Weight of the newest sample in the access-time moving average.
const ACCESS_TIME_ALPHA: f64 = 0.1;

// == Cache Stats ==
/// Tracks cache performance metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of failed cache retrievals (key not found or invalidated)
    pub misses: u64,
    /// Number of entries evicted by capacity or pressure policies
    pub evictions: u64,
    /// Number of entries removed because their TTL elapsed
    pub expired_removals: u64,
    /// Current number of entries in the cache
    pub total_entries: usize,
    /// Current byte usage across all entries
    pub memory_usage: u64,
    /// Moving average of get-path latency in microseconds
    pub avg_access_time_us: f64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    // == Record Hit ==
    /// Increments the hit counter.
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    // == Record Miss ==
    /// Increments the miss counter.
    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    // == Record Eviction ==
    /// Increments the eviction counter.
    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    // == Record Expiry ==
    /// Increments the expired-removal counter.
    pub fn record_expired(&mut self) {
        self.expired_removals += 1;
    }

    // == Record Access Time ==
    /// Folds a get-path latency sample into the moving average.
    pub fn record_access_time(&mut self, micros: f64) {
        if self.avg_access_time_us == 0.0 {
            self.avg_access_time_us = micros;
        } else {
            self.avg_access_time_us =
                self.avg_access_time_us * (1.0 - ACCESS_TIME_ALPHA) + micros * ACCESS_TIME_ALPHA;
        }
    }

    // == Update Entry Count ==
    /// Updates the total entries count.
    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }

    // == Memory Accounting ==
    /// Adds bytes to the tracked usage.
    pub fn add_memory(&mut self, bytes: u64) {
        self.memory_usage += bytes;
    }

    /// Subtracts bytes from the tracked usage, saturating at zero.
    pub fn sub_memory(&mut self, bytes: u64) {
        self.memory_usage = self.memory_usage.saturating_sub(bytes);
    }

    /// Overwrites the tracked usage with a recalibrated sum.
    pub fn set_memory(&mut self, bytes: u64) {
        self.memory_usage = bytes;
    }

    // == Clear ==
    /// Resets every counter, including the historical hit/miss totals.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = CacheStats::new();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.expired_removals, 0);
        assert_eq!(stats.total_entries, 0);
        assert_eq!(stats.memory_usage, 0);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        let stats = CacheStats::new();
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_all_hits() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        assert_eq!(stats.hit_rate(), 1.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_miss();
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn test_record_eviction_and_expiry() {
        let mut stats = CacheStats::new();
        stats.record_eviction();
        stats.record_eviction();
        stats.record_expired();
        assert_eq!(stats.evictions, 2);
        assert_eq!(stats.expired_removals, 1);
    }

    #[test]
    fn test_memory_accounting() {
        let mut stats = CacheStats::new();
        stats.add_memory(1_000);
        stats.add_memory(500);
        stats.sub_memory(300);
        assert_eq!(stats.memory_usage, 1_200);

        // Saturates rather than wrapping
        stats.sub_memory(10_000);
        assert_eq!(stats.memory_usage, 0);

        stats.set_memory(4_096);
        assert_eq!(stats.memory_usage, 4_096);
    }

    #[test]
    fn test_access_time_moving_average() {
        let mut stats = CacheStats::new();

        stats.record_access_time(100.0);
        assert_eq!(stats.avg_access_time_us, 100.0);

        stats.record_access_time(200.0);
        assert!((stats.avg_access_time_us - 110.0).abs() < 0.001);
    }

    #[test]
    fn test_clear_resets_historical_counters() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_miss();
        stats.add_memory(64);
        stats.set_total_entries(1);

        stats.clear();

        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.memory_usage, 0);
        assert_eq!(stats.total_entries, 0);
    }
}
