//! Domain types exchanged with the filler's collaborators

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Designated on-chain orderbook pool for a base/quote pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalOrderbook {
    pub pool_id: u64,
    pub base: String,
    pub quote: String,
    pub contract_address: String,
}

/// Wallet balances keyed by denom, in the denom's smallest unit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Balances(HashMap<String, u128>);

impl Balances {
    pub fn new(balances: HashMap<String, u128>) -> Self {
        Self(balances)
    }

    /// Amount held of `denom`, zero when the wallet holds none
    pub fn amount_of(&self, denom: &str) -> u128 {
        self.0.get(denom).copied().unwrap_or(0)
    }
}

impl FromIterator<(String, u128)> for Balances {
    fn from_iter<I: IntoIterator<Item = (String, u128)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Prices keyed by denom, quoted in the filler's default quote denom
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceTable(HashMap<String, Decimal>);

impl PriceTable {
    pub fn new(prices: HashMap<String, Decimal>) -> Self {
        Self(prices)
    }

    pub fn price_of(&self, denom: &str) -> Option<Decimal> {
        self.0.get(denom).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Decimal)> for PriceTable {
    fn from_iter<I: IntoIterator<Item = (String, Decimal)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Source the price service should derive prices from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PricingSource {
    /// On-chain spot prices computed from pool liquidity
    Chain,
}

/// One hop of a swap route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapHop {
    pub pool_id: u64,
    pub token_out_denom: String,
}

/// Chain-level swap message. Opaque to the filler once built by the router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapMsg {
    pub sender: String,
    pub routes: Vec<SwapHop>,
    pub token_in_denom: String,
    pub token_in_amount: u128,
    pub token_out_min_amount: u128,
}

/// Router simulation of a cyclic arb through an orderbook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArbQuote {
    /// Amount of the input denom returned at the end of the cycle
    pub amount_out: u128,
    /// Gas estimate for the swap, already adjusted by the simulator
    pub adjusted_gas: u64,
    pub msg: SwapMsg,
}

/// Result of simulating a set of messages as one transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasEstimate {
    pub gas_used: u64,
    pub adjusted_gas: u64,
}

/// Everything the chain client needs to sign and broadcast a transaction
#[derive(Debug, Clone, PartialEq)]
pub struct TxPlan {
    pub msgs: Vec<SwapMsg>,
    pub pool_ids: Vec<u64>,
    pub gas_limit: u64,
    pub max_fee_cap: Decimal,
}

/// Broadcast response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxResponse {
    pub code: u32,
    pub hash: String,
    pub log: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_missing_balance_is_zero() {
        let balances: Balances = [("uosmo".to_string(), 5u128)].into_iter().collect();
        assert_eq!(balances.amount_of("uosmo"), 5);
        assert_eq!(balances.amount_of("uatom"), 0);
    }

    #[test]
    fn test_price_lookup() {
        let prices: PriceTable = [("uatom".to_string(), dec!(8.5))].into_iter().collect();
        assert_eq!(prices.price_of("uatom"), Some(dec!(8.5)));
        assert_eq!(prices.price_of("uosmo"), None);
        assert_eq!(prices.len(), 1);
    }
}
