//! Candidate arbitrage fill

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use crate::config::ExecutionConfig;
use crate::domain::{ArbQuote, SwapMsg};
use crate::error::{FillerError, Result};

/// A single candidate arb trade through one orderbook.
///
/// Built by validation during the binary search; immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct MsgContext {
    pool_id: u64,
    denom_in: String,
    denom_out: String,
    amount_in: u128,
    amount_out: u128,
    max_fee_cap: Decimal,
    low_value: bool,
    adjusted_gas: u64,
    msg: SwapMsg,
}

/// Prices needed to score a quote, all in the default quote denom
#[derive(Debug, Clone, Copy)]
pub struct ScoringPrices {
    pub denom_in_price: Decimal,
    /// Gas cost of the swap in the quote denom
    pub gas_cost: Decimal,
}

impl MsgContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool_id: u64,
        denom_in: impl Into<String>,
        denom_out: impl Into<String>,
        amount_in: u128,
        amount_out: u128,
        max_fee_cap: Decimal,
        low_value: bool,
        adjusted_gas: u64,
        msg: SwapMsg,
    ) -> Self {
        Self {
            pool_id,
            denom_in: denom_in.into(),
            denom_out: denom_out.into(),
            amount_in,
            amount_out,
            max_fee_cap,
            low_value,
            adjusted_gas,
            msg,
        }
    }

    /// Score a router quote.
    ///
    /// Revenue is the cycle's surplus of `denom_in` valued in the quote denom.
    /// The quote is rejected unless revenue covers the gas cost. The fee cap is
    /// revenue clamped to `config.max_fee_cap`; revenue under
    /// `config.low_value_threshold` marks the fill low value.
    pub fn from_quote(
        pool_id: u64,
        denom_in: &str,
        denom_out: &str,
        amount_in: u128,
        quote: ArbQuote,
        prices: ScoringPrices,
        config: &ExecutionConfig,
    ) -> Result<Self> {
        let unprofitable = |reason: String| FillerError::Unprofitable {
            pool_id,
            denom_in: denom_in.to_string(),
            amount_in,
            reason,
        };

        let profit = quote
            .amount_out
            .checked_sub(amount_in)
            .filter(|p| *p > 0)
            .ok_or_else(|| {
                unprofitable(format!(
                    "route returns {} for {} in",
                    quote.amount_out, amount_in
                ))
            })?;

        let profit = Decimal::from_u128(profit).ok_or(FillerError::AmountOverflow {
            context: "arb profit",
        })?;
        let revenue = profit
            .checked_mul(prices.denom_in_price)
            .ok_or(FillerError::AmountOverflow {
                context: "arb revenue",
            })?;

        if revenue <= prices.gas_cost {
            return Err(unprofitable(format!(
                "revenue {} does not cover gas cost {}",
                revenue, prices.gas_cost
            )));
        }

        Ok(Self {
            pool_id,
            denom_in: denom_in.to_string(),
            denom_out: denom_out.to_string(),
            amount_in,
            amount_out: quote.amount_out,
            max_fee_cap: revenue.min(config.max_fee_cap),
            low_value: revenue < config.low_value_threshold,
            adjusted_gas: quote.adjusted_gas,
            msg: quote.msg,
        })
    }

    pub fn pool_id(&self) -> u64 {
        self.pool_id
    }

    pub fn denom_in(&self) -> &str {
        &self.denom_in
    }

    pub fn denom_out(&self) -> &str {
        &self.denom_out
    }

    pub fn amount_in(&self) -> u128 {
        self.amount_in
    }

    pub fn amount_out(&self) -> u128 {
        self.amount_out
    }

    pub fn max_fee_cap(&self) -> Decimal {
        self.max_fee_cap
    }

    pub fn is_low_value(&self) -> bool {
        self.low_value
    }

    pub fn adjusted_gas(&self) -> u64 {
        self.adjusted_gas
    }

    pub fn swap_msg(&self) -> &SwapMsg {
        &self.msg
    }
}
