//! End-of-block plugin traits and interfaces

use async_trait::async_trait;
use std::collections::HashSet;

/// Pools touched by the block that was just finalized
#[derive(Debug, Clone, Default)]
pub struct BlockPoolMetadata {
    pub pool_ids: HashSet<u64>,
}

impl BlockPoolMetadata {
    pub fn new(pool_ids: impl IntoIterator<Item = u64>) -> Self {
        Self {
            pool_ids: pool_ids.into_iter().collect(),
        }
    }

    pub fn contains(&self, pool_id: u64) -> bool {
        self.pool_ids.contains(&pool_id)
    }
}

/// Core trait for strategies driven by the block scheduler.
///
/// The scheduler calls `process_end_block` once per finalized block. An
/// implementation must never block the scheduler on a previous block; it is
/// free to skip a block instead.
#[async_trait]
pub trait EndBlockProcessPlugin: Send + Sync {
    /// Error type returned to the embedding scheduler
    type Error: std::error::Error + Send + Sync + 'static;

    /// Plugin name for identification
    fn name(&self) -> &'static str;

    /// Process the end of `block_height`
    async fn process_end_block(
        &self,
        block_height: u64,
        metadata: &BlockPoolMetadata,
    ) -> Result<(), Self::Error>;

    /// Get current plugin metrics
    fn metrics(&self) -> PluginMetrics;
}

/// Basic plugin metrics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginMetrics {
    pub blocks_processed: u64,
    pub blocks_skipped: u64,
    pub ineligible_pools: u64,
    pub pool_errors: u64,
    pub immediate_fills: u64,
    pub batch_fills: u64,
    pub fallback_fills: u64,
    pub fill_errors: u64,
    pub uptime_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_membership() {
        let metadata = BlockPoolMetadata::new([7, 9, 7]);
        assert_eq!(metadata.pool_ids.len(), 2);
        assert!(metadata.contains(9));
        assert!(!metadata.contains(8));
    }
}
