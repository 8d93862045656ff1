//! Per-block snapshot shared by all workers of one block

use rust_decimal::Decimal;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::tx::TxContext;
use crate::clients::ChainClient;
use crate::domain::{Balances, PriceTable};
use crate::error::{FillerError, Result};

/// Read-only view of the chain and wallet for one block.
///
/// Only the embedded `TxContext` is mutated after construction.
pub struct BlockContext {
    cancel: CancellationToken,
    chain: Arc<dyn ChainClient>,
    denoms: Vec<String>,
    prices: PriceTable,
    balances: Balances,
    gas_price: Decimal,
    block_height: u64,
    base_denom: String,
    tx: TxContext,
}

impl BlockContext {
    /// Build the context, querying the chain for the current gas price
    pub async fn new(
        cancel: CancellationToken,
        chain: Arc<dyn ChainClient>,
        denoms: Vec<String>,
        prices: PriceTable,
        balances: Balances,
        base_denom: String,
        block_height: u64,
    ) -> Result<Self> {
        let gas_price = chain.gas_price().await.map_err(FillerError::GasPrice)?;

        Ok(Self {
            cancel,
            chain,
            denoms,
            prices,
            balances,
            gas_price,
            block_height,
            base_denom,
            tx: TxContext::new(),
        })
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn chain(&self) -> &Arc<dyn ChainClient> {
        &self.chain
    }

    pub fn denoms(&self) -> &[String] {
        &self.denoms
    }

    pub fn prices(&self) -> &PriceTable {
        &self.prices
    }

    pub fn balances(&self) -> &Balances {
        &self.balances
    }

    pub fn gas_price(&self) -> Decimal {
        self.gas_price
    }

    pub fn block_height(&self) -> u64 {
        self.block_height
    }

    /// Fee denom gas is paid in
    pub fn base_denom(&self) -> &str {
        &self.base_denom
    }

    pub fn tx_ctx(&self) -> &TxContext {
        &self.tx
    }

    pub fn price_of(&self, denom: &str) -> Result<Decimal> {
        self.prices
            .price_of(denom)
            .ok_or_else(|| FillerError::PriceUnavailable {
                denom: denom.to_string(),
            })
    }

    /// Cost of `gas` units in the quote denom
    pub fn gas_cost(&self, gas: u64) -> Result<Decimal> {
        let fee_price = self.price_of(&self.base_denom)?;
        Decimal::from(gas)
            .checked_mul(self.gas_price)
            .and_then(|fee| fee.checked_mul(fee_price))
            .ok_or(FillerError::AmountOverflow {
                context: "gas cost",
            })
    }
}
