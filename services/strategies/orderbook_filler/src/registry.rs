//! Orderbook tick registry and fillable-amount computation
//!
//! Holds the latest resting liquidity of every canonical orderbook, keyed by
//! pool id. Entries are replaced wholesale on refresh so readers always see a
//! consistent tick set for a pool.

use dashmap::DashMap;
use futures::future::try_join_all;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::clients::TickFetcher;
use crate::context::BlockContext;
use crate::domain::CanonicalOrderbook;
use crate::error::{FillerError, Result};
use crate::log_book;

/// Resting liquidity at one price level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderbookTick {
    pub tick_id: i64,
    /// Quote per base
    pub price: Decimal,
    /// Resting bids, in the quote denom
    pub bid_liquidity: u128,
    /// Resting asks, in the base denom
    pub ask_liquidity: u128,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderbookState {
    pub orderbook: CanonicalOrderbook,
    pub ticks: Vec<OrderbookTick>,
}

/// Amounts of orderbook liquidity an arb could take right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FillableAmounts {
    /// Quote needed to lift every ask priced at or below market
    pub ask_quote: u128,
    /// Base needed to hit every bid priced at or above market
    pub bid_base: u128,
}

pub struct OrderbookRegistry {
    fetcher: Arc<dyn TickFetcher>,
    books: DashMap<u64, Arc<OrderbookState>>,
}

impl OrderbookRegistry {
    pub fn new(fetcher: Arc<dyn TickFetcher>) -> Self {
        Self {
            fetcher,
            books: DashMap::new(),
        }
    }

    pub fn get(&self, pool_id: u64) -> Option<Arc<OrderbookState>> {
        self.books.get(&pool_id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// Fetch and store the current ticks of one orderbook
    pub async fn refresh(&self, orderbook: &CanonicalOrderbook) -> Result<()> {
        let ticks = self
            .fetcher
            .fetch_ticks(orderbook)
            .await
            .map_err(|source| FillerError::TickRefresh {
                pool_id: orderbook.pool_id,
                source,
            })?;

        log_book!(
            "Refreshed {} ticks for orderbook {}",
            ticks.len(),
            orderbook.pool_id
        );

        self.books.insert(
            orderbook.pool_id,
            Arc::new(OrderbookState {
                orderbook: orderbook.clone(),
                ticks,
            }),
        );
        Ok(())
    }

    /// Refresh several orderbooks concurrently, failing on the first error
    pub async fn refresh_many<'a>(
        &self,
        orderbooks: impl IntoIterator<Item = &'a CanonicalOrderbook>,
    ) -> Result<usize> {
        let refreshes: Vec<_> = orderbooks.into_iter().map(|ob| self.refresh(ob)).collect();
        let count = refreshes.len();
        try_join_all(refreshes).await?;
        Ok(count)
    }

    /// Fillable amounts for `orderbook` at the block's market price.
    /// Orderbooks never seen before are fetched on demand.
    pub async fn fillable_amounts(
        &self,
        block: &BlockContext,
        orderbook: &CanonicalOrderbook,
    ) -> Result<FillableAmounts> {
        let state = match self.get(orderbook.pool_id) {
            Some(state) => state,
            None => {
                self.refresh(orderbook).await?;
                self.get(orderbook.pool_id)
                    .ok_or(FillerError::NoTickData {
                        pool_id: orderbook.pool_id,
                    })?
            }
        };

        let base_price = block.price_of(&orderbook.base)?;
        let quote_price = block.price_of(&orderbook.quote)?;
        let market_price =
            base_price
                .checked_div(quote_price)
                .ok_or_else(|| FillerError::PriceUnavailable {
                    denom: orderbook.quote.clone(),
                })?;

        compute_fillable(&state.ticks, market_price)
    }
}

/// Sum the liquidity on the wrong side of `market_price`.
///
/// Asks at or below market can be bought and resold on the router; bids at
/// or above market can be sold into after buying on the router.
pub fn compute_fillable(ticks: &[OrderbookTick], market_price: Decimal) -> Result<FillableAmounts> {
    let mut ask_quote = Decimal::ZERO;
    let mut bid_base = Decimal::ZERO;

    for tick in ticks.iter().filter(|t| t.price > Decimal::ZERO) {
        if tick.ask_liquidity > 0 && tick.price <= market_price {
            let cost = Decimal::from_u128(tick.ask_liquidity)
                .and_then(|liq| liq.checked_mul(tick.price))
                .ok_or_else(overflow)?;
            ask_quote = ask_quote.checked_add(cost).ok_or_else(overflow)?;
        }

        if tick.bid_liquidity > 0 && tick.price >= market_price {
            let size = Decimal::from_u128(tick.bid_liquidity)
                .and_then(|liq| liq.checked_div(tick.price))
                .ok_or_else(overflow)?;
            bid_base = bid_base.checked_add(size).ok_or_else(overflow)?;
        }
    }

    Ok(FillableAmounts {
        ask_quote: ask_quote.trunc().to_u128().ok_or_else(overflow)?,
        bid_base: bid_base.trunc().to_u128().ok_or_else(overflow)?,
    })
}

fn overflow() -> FillerError {
    FillerError::AmountOverflow {
        context: "fillable amount",
    }
}
