//! Binary search for the most profitable fill size
//!
//! The proposed amount comes from the orderbook's fillable liquidity and is
//! assumed to be close to optimal, so the search only explores a narrow band
//! above it: `[proposed, proposed * (1 + ceiling_bps / 10_000)]`. A candidate
//! replaces the current best when it validates with a fee cap at least as high,
//! so equal profit prefers the larger fill.

use async_trait::async_trait;

use crate::clients::LiquidityRouter;
use crate::config::{ExecutionConfig, SearchConfig};
use crate::context::{BlockContext, MsgContext, ScoringPrices};
use crate::error::{FillerError, Result};
use crate::log_search;

/// Validates a hypothetical arb of a given input amount
#[async_trait]
pub trait ArbValidator: Send + Sync {
    async fn validate(&self, amount_in: u128) -> Result<MsgContext>;
}

/// Result of a successful search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub amount_in: u128,
    pub msg: MsgContext,
    /// Validation rounds spent in the band, excluding the proposed amount
    pub attempts: u32,
    /// False when nothing in the band beat the proposed amount
    pub improved: bool,
}

/// Upper end of the search band, truncated and saturating at `u128::MAX`
pub fn search_ceiling(proposed: u128, ceiling_bps: u32) -> u128 {
    let scale = 10_000u128 + u128::from(ceiling_bps);
    match proposed.checked_mul(scale) {
        Some(scaled) => scaled / 10_000,
        None => (proposed / 10_000)
            .checked_mul(scale)
            .and_then(|whole| whole.checked_add((proposed % 10_000) * scale / 10_000))
            .unwrap_or(u128::MAX),
    }
}

/// Validate `proposed`, then search the band above it.
///
/// Fails only when `proposed` itself does not validate; a search that finds
/// nothing better degrades to the proposed amount's message.
pub async fn find_max_profitable<V>(
    validator: &V,
    proposed: u128,
    config: &SearchConfig,
) -> Result<SearchOutcome>
where
    V: ArbValidator + ?Sized,
{
    let baseline = validator.validate(proposed).await?;
    Ok(search_upper_band(validator, proposed, baseline, config).await)
}

/// Bisect `(proposed, ceiling]` for at most `config.max_attempts` rounds
pub async fn search_upper_band<V>(
    validator: &V,
    proposed: u128,
    baseline: MsgContext,
    config: &SearchConfig,
) -> SearchOutcome
where
    V: ArbValidator + ?Sized,
{
    let mut low = proposed;
    let mut best = baseline;
    let mut high = search_ceiling(proposed, config.ceiling_bps);
    let mut high_rejected = false;
    let mut attempts = 0;

    while attempts < config.max_attempts {
        let mid = low + (high - low).div_ceil(2);
        if mid == low || (mid == high && high_rejected) {
            break;
        }
        attempts += 1;

        match validator.validate(mid).await {
            Ok(candidate) if candidate.max_fee_cap() >= best.max_fee_cap() => {
                log_search!("Arb amount {} improves on {} ({})", mid, low, candidate.max_fee_cap());
                low = mid;
                best = candidate;
            }
            Ok(_) | Err(_) => {
                high = mid;
                high_rejected = true;
            }
        }
    }

    SearchOutcome {
        amount_in: low,
        improved: low != proposed,
        msg: best,
        attempts,
    }
}

/// Validates arbs through one orderbook in one direction by simulating them
/// on the router and scoring the quote against the block's prices
pub struct RouterArbValidator<'a> {
    router: &'a dyn LiquidityRouter,
    block: &'a BlockContext,
    config: &'a ExecutionConfig,
    pool_id: u64,
    denom_in: &'a str,
    denom_out: &'a str,
}

impl<'a> RouterArbValidator<'a> {
    pub fn new(
        router: &'a dyn LiquidityRouter,
        block: &'a BlockContext,
        config: &'a ExecutionConfig,
        pool_id: u64,
        denom_in: &'a str,
        denom_out: &'a str,
    ) -> Self {
        Self {
            router,
            block,
            config,
            pool_id,
            denom_in,
            denom_out,
        }
    }
}

#[async_trait]
impl ArbValidator for RouterArbValidator<'_> {
    async fn validate(&self, amount_in: u128) -> Result<MsgContext> {
        if amount_in == 0 {
            return Err(FillerError::Unprofitable {
                pool_id: self.pool_id,
                denom_in: self.denom_in.to_string(),
                amount_in,
                reason: "nothing to fill".to_string(),
            });
        }

        let simulation = self
            .router
            .simulate_arb(amount_in, self.denom_in, self.denom_out, self.pool_id);
        let quote = tokio::select! {
            _ = self.block.cancellation().cancelled() => return Err(FillerError::Cancelled),
            quote = simulation => quote.map_err(|source| FillerError::ArbSimulation {
                pool_id: self.pool_id,
                denom_in: self.denom_in.to_string(),
                amount_in,
                source,
            })?,
        };

        let prices = ScoringPrices {
            denom_in_price: self.block.price_of(self.denom_in)?,
            gas_cost: self.block.gas_cost(quote.adjusted_gas)?,
        };

        MsgContext::from_quote(
            self.pool_id,
            self.denom_in,
            self.denom_out,
            amount_in,
            quote,
            prices,
            self.config,
        )
    }
}
