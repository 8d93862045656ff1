//! Plugin metrics collection

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Thread-safe metrics collector for end-of-block plugins
#[derive(Debug)]
pub struct MetricsCollector {
    start_time: Instant,
    blocks_processed: AtomicU64,
    blocks_skipped: AtomicU64,
    ineligible_pools: AtomicU64,
    pool_errors: AtomicU64,
    immediate_fills: AtomicU64,
    batch_fills: AtomicU64,
    fallback_fills: AtomicU64,
    fill_errors: AtomicU64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            blocks_processed: AtomicU64::new(0),
            blocks_skipped: AtomicU64::new(0),
            ineligible_pools: AtomicU64::new(0),
            pool_errors: AtomicU64::new(0),
            immediate_fills: AtomicU64::new(0),
            batch_fills: AtomicU64::new(0),
            fallback_fills: AtomicU64::new(0),
            fill_errors: AtomicU64::new(0),
        }
    }

    pub fn increment_blocks_processed(&self) {
        self.blocks_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_blocks_skipped(&self) {
        self.blocks_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_ineligible_pools(&self, count: u64) {
        self.ineligible_pools.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_pool_errors(&self) {
        self.pool_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_immediate_fills(&self) {
        self.immediate_fills.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_batch_fills(&self) {
        self.batch_fills.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_fallback_fills(&self) {
        self.fallback_fills.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_fill_errors(&self) {
        self.fill_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_metrics(&self) -> super::PluginMetrics {
        super::PluginMetrics {
            blocks_processed: self.blocks_processed.load(Ordering::Relaxed),
            blocks_skipped: self.blocks_skipped.load(Ordering::Relaxed),
            ineligible_pools: self.ineligible_pools.load(Ordering::Relaxed),
            pool_errors: self.pool_errors.load(Ordering::Relaxed),
            immediate_fills: self.immediate_fills.load(Ordering::Relaxed),
            batch_fills: self.batch_fills.load(Ordering::Relaxed),
            fallback_fills: self.fallback_fills.load(Ordering::Relaxed),
            fill_errors: self.fill_errors.load(Ordering::Relaxed),
            uptime_secs: self.uptime().as_secs(),
        }
    }

    pub fn uptime(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = MetricsCollector::new();
        metrics.increment_blocks_processed();
        metrics.increment_blocks_processed();
        metrics.add_ineligible_pools(3);
        metrics.increment_fallback_fills();

        let snapshot = metrics.get_metrics();
        assert_eq!(snapshot.blocks_processed, 2);
        assert_eq!(snapshot.ineligible_pools, 3);
        assert_eq!(snapshot.fallback_fills, 1);
        assert_eq!(snapshot.blocks_skipped, 0);
        assert!(snapshot.uptime_secs <= metrics.uptime().as_secs());
    }
}
