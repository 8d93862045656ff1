//! Collaborator interfaces
//!
//! Every service the filler talks to sits behind one of these traits so the
//! block orchestrator can be driven by real RPC clients in production and by
//! in-memory fakes in tests.

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::{
    ArbQuote, Balances, CanonicalOrderbook, GasEstimate, PriceTable, PricingSource, SwapMsg,
    TxPlan, TxResponse,
};
use crate::registry::OrderbookTick;

/// Source of the canonical orderbook set
#[async_trait]
pub trait PoolRegistry: Send + Sync {
    async fn canonical_orderbooks(&self) -> Result<Vec<CanonicalOrderbook>>;
}

/// Fetches resting orderbook liquidity
#[async_trait]
pub trait TickFetcher: Send + Sync {
    async fn fetch_ticks(&self, orderbook: &CanonicalOrderbook) -> Result<Vec<OrderbookTick>>;
}

#[async_trait]
pub trait BalanceService: Send + Sync {
    async fn all_balances(&self, address: &str) -> Result<Balances>;
}

#[async_trait]
pub trait PriceService: Send + Sync {
    async fn prices(
        &self,
        denoms: &[String],
        quote_denoms: &[String],
        source: PricingSource,
    ) -> Result<PriceTable>;
}

/// Broader liquidity network the orderbook is arbitraged against
#[async_trait]
pub trait LiquidityRouter: Send + Sync {
    /// Simulate swapping `amount_in` of `denom_in` into `denom_out` through
    /// the orderbook and routing the proceeds back into `denom_in`.
    async fn simulate_arb(
        &self,
        amount_in: u128,
        denom_in: &str,
        denom_out: &str,
        orderbook_pool_id: u64,
    ) -> Result<ArbQuote>;
}

/// Transaction simulation and broadcast
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Gas price in the chain's fee denom per gas unit
    async fn gas_price(&self) -> Result<Decimal>;

    async fn simulate_msgs(&self, msgs: &[SwapMsg]) -> Result<GasEstimate>;

    async fn execute_tx(
        &self,
        block_height: u64,
        gas_price: Decimal,
        plan: &TxPlan,
    ) -> Result<TxResponse>;
}

/// Signing identity of the bot
pub trait Keyring: Send + Sync {
    fn address(&self) -> String;
}
