//! Transaction batch accumulator
//!
//! Workers append concurrently while the block fans out; the orchestrator
//! then seals the context and owns it for ranking, simulation and execution.

use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use super::msg::MsgContext;
use crate::domain::{SwapMsg, TxPlan};

#[derive(Debug, Default)]
struct TxInner {
    msgs: Vec<Arc<MsgContext>>,
    /// Pools already filled outside the batch during this block
    used_pool_ids: BTreeSet<u64>,
    adjusted_gas_total: u64,
    sealed: bool,
}

/// Candidate fill messages for one transaction
#[derive(Debug, Default)]
pub struct TxContext {
    inner: Mutex<TxInner>,
}

impl TxContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an accepted message.
    ///
    /// With `bundle` set the message joins the pending batch; otherwise it was
    /// executed on its own and only its pool is recorded as used. Returns
    /// `false` if the context is sealed and the message was dropped.
    pub fn add_msg(&self, msg: Arc<MsgContext>, bundle: bool) -> bool {
        let mut inner = self.inner.lock();
        if inner.sealed {
            return false;
        }

        if bundle {
            inner.adjusted_gas_total = inner.adjusted_gas_total.saturating_add(msg.adjusted_gas());
            inner.msgs.push(msg);
        } else {
            inner.used_pool_ids.insert(msg.pool_id());
        }
        true
    }

    /// Stop accepting messages. Workers that outlive result collection can
    /// no longer change the batch being filled.
    pub fn seal(&self) {
        self.inner.lock().sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.inner.lock().sealed
    }

    pub fn msgs(&self) -> Vec<Arc<MsgContext>> {
        self.inner.lock().msgs.clone()
    }

    pub fn swap_msgs(&self) -> Vec<SwapMsg> {
        self.inner
            .lock()
            .msgs
            .iter()
            .map(|m| m.swap_msg().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().msgs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().msgs.is_empty()
    }

    pub fn used_pool_ids(&self) -> Vec<u64> {
        self.inner.lock().used_pool_ids.iter().copied().collect()
    }

    pub fn adjusted_gas_total(&self) -> u64 {
        self.inner.lock().adjusted_gas_total
    }

    pub fn update_adjusted_gas_total(&self, adjusted_gas: u64) {
        self.inner.lock().adjusted_gas_total = adjusted_gas;
    }

    /// Order the batch by fee cap, best first, and keep one message per pool.
    ///
    /// Pools already filled this block are dropped. Ties on fee cap prefer
    /// the larger input amount, then the lower pool id, then the input denom.
    pub fn rank_and_filter_msgs(&self) {
        let mut inner = self.inner.lock();
        let used = inner.used_pool_ids.clone();

        let mut msgs: Vec<Arc<MsgContext>> = inner
            .msgs
            .drain(..)
            .filter(|m| !used.contains(&m.pool_id()))
            .collect();
        msgs.sort_by(|a, b| rank(a, b));

        let mut seen = HashSet::new();
        msgs.retain(|m| seen.insert(m.pool_id()));

        inner.adjusted_gas_total = msgs
            .iter()
            .fold(0u64, |acc, m| acc.saturating_add(m.adjusted_gas()));
        inner.msgs = msgs;
    }

    /// Snapshot for the chain client
    pub fn plan(&self) -> TxPlan {
        let inner = self.inner.lock();
        TxPlan {
            msgs: inner.msgs.iter().map(|m| m.swap_msg().clone()).collect(),
            pool_ids: inner.msgs.iter().map(|m| m.pool_id()).collect(),
            gas_limit: inner.adjusted_gas_total,
            max_fee_cap: inner
                .msgs
                .iter()
                .fold(Decimal::ZERO, |acc, m| acc + m.max_fee_cap()),
        }
    }
}

fn rank(a: &MsgContext, b: &MsgContext) -> Ordering {
    b.max_fee_cap()
        .cmp(&a.max_fee_cap())
        .then_with(|| b.amount_in().cmp(&a.amount_in()))
        .then_with(|| a.pool_id().cmp(&b.pool_id()))
        .then_with(|| a.denom_in().cmp(b.denom_in()))
}
