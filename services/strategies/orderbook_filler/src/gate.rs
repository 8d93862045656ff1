//! Single-block-at-a-time gate
//!
//! Blocks are never queued: a block arriving while another is in progress is
//! skipped by the caller.

use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub struct BlockGate {
    in_progress: AtomicBool,
}

impl BlockGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the gate if no block is in progress. The gate is released when
    /// the returned guard is dropped.
    pub fn try_acquire(&self) -> Option<BlockGateGuard<'_>> {
        self.in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BlockGateGuard { gate: self })
    }

    pub fn is_busy(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }
}

#[must_use = "the gate is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct BlockGateGuard<'a> {
    gate: &'a BlockGate,
}

impl Drop for BlockGateGuard<'_> {
    fn drop(&mut self) {
        self.gate.in_progress.store(false, Ordering::Release);
    }
}
