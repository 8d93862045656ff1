//! End-of-block orchestrator
//!
//! Once per block the filler lists canonical orderbooks, refreshes the ticks
//! of pools the block touched, and fans out one worker per eligible pool.
//! Workers search the most profitable fill in both directions; high-value
//! fills are sent immediately and the rest are batched into one transaction
//! after all workers report back.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument};

use torq_strategy_shared::{
    BlockPoolMetadata, EndBlockProcessPlugin, MetricsCollector, PluginMetrics,
};

use crate::clients::{
    BalanceService, ChainClient, Keyring, LiquidityRouter, PoolRegistry, PriceService,
    TickFetcher,
};
use crate::config::FillerConfig;
use crate::context::{BlockContext, MsgContext, TxContext};
use crate::domain::{CanonicalOrderbook, PricingSource, TxResponse};
use crate::error::{FillerError, Result};
use crate::gate::BlockGate;
use crate::registry::OrderbookRegistry;
use crate::search::{find_max_profitable, RouterArbValidator};
use crate::{log_error, log_execution, log_metrics, log_success, log_warning};

/// Collaborators the filler is built from
#[derive(Clone)]
pub struct FillerClients {
    pub pools: Arc<dyn PoolRegistry>,
    pub ticks: Arc<dyn TickFetcher>,
    pub balances: Arc<dyn BalanceService>,
    pub prices: Arc<dyn PriceService>,
    pub router: Arc<dyn LiquidityRouter>,
    pub chain: Arc<dyn ChainClient>,
    pub keyring: Arc<dyn Keyring>,
}

/// Outcome reported by each pool worker
#[derive(Debug)]
struct OrderbookProcessResult {
    pool_id: u64,
    result: Result<()>,
}

/// End-of-block orderbook arbitrage filler
#[derive(Clone)]
pub struct OrderbookFiller {
    pools: Arc<dyn PoolRegistry>,
    registry: Arc<OrderbookRegistry>,
    balances: Arc<dyn BalanceService>,
    prices: Arc<dyn PriceService>,
    router: Arc<dyn LiquidityRouter>,
    chain: Arc<dyn ChainClient>,
    keyring: Arc<dyn Keyring>,
    gate: Arc<BlockGate>,
    metrics: Arc<MetricsCollector>,
    config: Arc<FillerConfig>,
    shutdown: CancellationToken,
}

impl OrderbookFiller {
    pub fn new(clients: FillerClients, config: FillerConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            pools: clients.pools,
            registry: Arc::new(OrderbookRegistry::new(clients.ticks)),
            balances: clients.balances,
            prices: clients.prices,
            router: clients.router,
            chain: clients.chain,
            keyring: clients.keyring,
            gate: Arc::new(BlockGate::new()),
            metrics: Arc::new(MetricsCollector::new()),
            config: Arc::new(config),
            shutdown: CancellationToken::new(),
        })
    }

    /// Share a gate with other filler instances
    pub fn with_gate(mut self, gate: Arc<BlockGate>) -> Self {
        self.gate = gate;
        self
    }

    /// Cancelling this token aborts the block in progress and every
    /// block after it
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn config(&self) -> &FillerConfig {
        &self.config
    }

    pub fn registry(&self) -> &OrderbookRegistry {
        &self.registry
    }

    /// Run one block.
    ///
    /// Fails when the orderbook set, tick refresh, balances, prices or gas
    /// price cannot be fetched, and when a single-message batch fails to
    /// fill. Returns `Cancelled` once the shutdown token fires, without
    /// simulating or broadcasting anything further. Returns `Ok` without
    /// doing anything if another block is still in progress.
    pub async fn process_end_block(
        &self,
        block_height: u64,
        metadata: &BlockPoolMetadata,
    ) -> Result<()> {
        if !self.config.plugin.enabled {
            debug!(block_height, "Orderbook filler disabled");
            return Ok(());
        }

        let cancel = self.shutdown.child_token();
        // abandoned workers stop as soon as this block returns
        let _cancel_on_exit = cancel.clone().drop_guard();

        let orderbooks = until_cancelled(&cancel, async {
            self.pools
                .canonical_orderbooks()
                .await
                .map_err(FillerError::PoolRegistry)
        })
        .await?;

        let refreshed = until_cancelled(
            &cancel,
            self.registry
                .refresh_many(orderbooks.iter().filter(|ob| metadata.contains(ob.pool_id))),
        )
        .await
        .inspect_err(|e| log_error!("Tick refresh failed at block {}: {}", block_height, e))?;
        debug!(block_height, refreshed, "Refreshed updated orderbooks");

        let Some(_gate) = self.gate.try_acquire() else {
            self.metrics.increment_blocks_skipped();
            info!(block_height, "Orderbook filler already in progress, skipping block");
            return Ok(());
        };

        let denoms = unique_orderbook_denoms(&orderbooks, &self.config.base_denom);

        let address = self.keyring.address();
        let balances = until_cancelled(&cancel, async {
            self.balances
                .all_balances(&address)
                .await
                .map_err(FillerError::Balances)
        })
        .await?;

        let prices = until_cancelled(&cancel, async {
            self.prices
                .prices(
                    &denoms,
                    std::slice::from_ref(&self.config.default_quote_denom),
                    PricingSource::Chain,
                )
                .await
                .map_err(FillerError::Prices)
        })
        .await?;

        let block = Arc::new(
            until_cancelled(
                &cancel,
                BlockContext::new(
                    cancel.clone(),
                    self.chain.clone(),
                    denoms,
                    prices,
                    balances,
                    self.config.base_denom.clone(),
                    block_height,
                ),
            )
            .await?,
        );

        let mut eligible = Vec::with_capacity(orderbooks.len());
        for orderbook in &orderbooks {
            match validate_user_balances(&block, orderbook, self.config.min_balance) {
                Ok(()) => eligible.push(orderbook.clone()),
                Err(e) => info!(pool_id = orderbook.pool_id, "Skipping orderbook: {}", e),
            }
        }
        let ineligible = orderbooks.len() - eligible.len();
        self.metrics.add_ineligible_pools(ineligible as u64);

        let expected = eligible.len();
        let (result_tx, mut result_rx) = mpsc::channel(expected.max(1));
        for orderbook in eligible {
            let worker = self.clone();
            let block = block.clone();
            let result_tx = result_tx.clone();
            let span = tracing::info_span!("orderbook", pool_id = orderbook.pool_id, block_height);

            tokio::spawn(
                async move {
                    let pool_id = orderbook.pool_id;
                    let result = worker.process_orderbook(&block, &orderbook).await;
                    if let Err(e) = result_tx
                        .send(OrderbookProcessResult { pool_id, result })
                        .await
                    {
                        debug!(pool_id, "Dropping orderbook result after collection ended: {}", e);
                    }
                }
                .instrument(span),
            );
        }
        drop(result_tx);

        let timeout = self.config.result_timeout();
        let mut received = 0;
        for _ in 0..expected {
            tokio::select! {
                message = result_rx.recv() => match message {
                    Some(OrderbookProcessResult { pool_id, result }) => {
                        received += 1;
                        if let Err(e) = result {
                            self.metrics.increment_pool_errors();
                            log_error!("Failed to process orderbook {}: {}", pool_id, e);
                        }
                    }
                    None => break,
                },
                _ = block.cancellation().cancelled() => {
                    debug!(block_height, "Block cancelled while collecting orderbook results");
                    break;
                }
                _ = tokio::time::sleep(timeout) => {
                    debug!(block_height, "Timed out waiting for orderbook result");
                }
            }
        }

        let tx_ctx = block.tx_ctx();
        tx_ctx.seal();
        if block.cancellation().is_cancelled() {
            info!(block_height, "Block cancelled, not filling {} arbs", tx_ctx.len());
            return Err(FillerError::Cancelled);
        }

        // the batch as it will be simulated: one message per pool, none from
        // pools already filled this block
        tx_ctx.rank_and_filter_msgs();
        let batch_msgs = tx_ctx.msgs();

        if let Err(e) = self.try_fill(&block, tx_ctx).await {
            self.metrics.increment_fill_errors();
            if batch_msgs.len() == 1 || matches!(e, FillerError::Cancelled) {
                log_error!("Failed to fill block {}: {}", block_height, e);
                return Err(e);
            }

            log_warning!(
                "Failed to fill {} arbs as one tx, falling back to one tx per arb: {}",
                batch_msgs.len(),
                e
            );
            for msg in batch_msgs {
                let pool_id = msg.pool_id();
                let single = TxContext::new();
                single.add_msg(msg, true);

                match self.try_fill(&block, &single).await {
                    Ok(()) => self.metrics.increment_fallback_fills(),
                    Err(FillerError::Cancelled) => {
                        self.metrics.increment_fill_errors();
                        info!(block_height, "Block cancelled during fallback fills");
                        return Err(FillerError::Cancelled);
                    }
                    Err(e) => {
                        self.metrics.increment_fill_errors();
                        log_error!("Failed to fill arb for orderbook {}: {}", pool_id, e);
                    }
                }
            }
        } else if !batch_msgs.is_empty() {
            self.metrics.increment_batch_fills();
        }

        self.metrics.increment_blocks_processed();
        log_metrics!(
            "Processed block {}: {} orderbooks, {} ineligible, {} results",
            block_height,
            orderbooks.len(),
            ineligible,
            received
        );
        Ok(())
    }

    /// Search both directions of one orderbook concurrently.
    ///
    /// Only a failure to size the fill is an error for the pool; each
    /// direction's search failure is logged and does not affect the other.
    async fn process_orderbook(
        &self,
        block: &BlockContext,
        orderbook: &CanonicalOrderbook,
    ) -> Result<()> {
        let pool_id = orderbook.pool_id;
        let fillable = until_cancelled(
            block.cancellation(),
            self.registry.fillable_amounts(block, orderbook),
        )
        .await?;

        let ask_amount = clamp_to_balance(
            fillable.ask_quote,
            block.balances().amount_of(&orderbook.quote),
            &orderbook.quote,
            pool_id,
        );
        let bid_amount = clamp_to_balance(
            fillable.bid_base,
            block.balances().amount_of(&orderbook.base),
            &orderbook.base,
            pool_id,
        );

        let (asks, bids) = tokio::join!(
            self.compute_perfect_arb_amount(block, ask_amount, &orderbook.quote, &orderbook.base, pool_id),
            self.compute_perfect_arb_amount(block, bid_amount, &orderbook.base, &orderbook.quote, pool_id),
        );

        match asks {
            Ok(amount) => info!(pool_id, amount, "Passed orderbook asks"),
            Err(e) => error!(pool_id, "Failed to fill asks: {}", e),
        }
        match bids {
            Ok(amount) => info!(pool_id, amount, "Passed orderbook bids"),
            Err(e) => error!(pool_id, "Failed to fill bids: {}", e),
        }

        Ok(())
    }

    /// Find the best fill of `denom_in` through `pool_id` and route it.
    ///
    /// High-value fills are executed on their own right away and their pool
    /// is marked used. Low-value fills, and high-value fills whose immediate
    /// execution failed, join the block's batch.
    async fn compute_perfect_arb_amount(
        &self,
        block: &BlockContext,
        proposed: u128,
        denom_in: &str,
        denom_out: &str,
        pool_id: u64,
    ) -> Result<u128> {
        let validator = RouterArbValidator::new(
            self.router.as_ref(),
            block,
            &self.config.execution,
            pool_id,
            denom_in,
            denom_out,
        );
        let outcome = find_max_profitable(&validator, proposed, &self.config.search).await?;
        if !outcome.improved {
            debug!(pool_id, denom_in, proposed, "No larger profitable fill, using proposed amount");
        }

        let msg = Arc::new(outcome.msg);
        let mut bundle = true;
        if !msg.is_low_value() {
            match self.fill_immediate(block, &msg).await {
                Ok(_) => {
                    self.metrics.increment_immediate_fills();
                    bundle = false;
                }
                Err(e) => {
                    self.metrics.increment_fill_errors();
                    log_error!("Failed to fill high value arb via orderbook {} immediately: {}", pool_id, e);
                }
            }
        }

        if !block.tx_ctx().add_msg(msg, bundle) {
            log_warning!(
                "Block {} already filling, dropping arb via orderbook {}",
                block.block_height(),
                pool_id
            );
        }

        Ok(outcome.amount_in)
    }

    /// Rank, simulate and execute the messages in `tx_ctx`. An empty
    /// context is a no-op.
    pub async fn try_fill(&self, block: &BlockContext, tx_ctx: &TxContext) -> Result<()> {
        if tx_ctx.is_empty() {
            return Ok(());
        }

        tx_ctx.rank_and_filter_msgs();
        if tx_ctx.is_empty() {
            return Ok(());
        }

        let swap_msgs = tx_ctx.swap_msgs();
        let estimate = until_cancelled(block.cancellation(), async {
            block
                .chain()
                .simulate_msgs(&swap_msgs)
                .await
                .map_err(FillerError::Simulation)
        })
        .await?;
        tx_ctx.update_adjusted_gas_total(estimate.adjusted_gas);

        let response = self.execute(block, tx_ctx).await?;
        log_success!(
            "Filled {} arbs in tx {} (gas used {}, limit {})",
            tx_ctx.len(),
            response.hash,
            estimate.gas_used,
            estimate.adjusted_gas
        );
        Ok(())
    }

    /// Execute one message on its own without re-simulating it. The
    /// search's gas estimate is inflated by the configured margin.
    pub async fn fill_immediate(
        &self,
        block: &BlockContext,
        msg: &Arc<MsgContext>,
    ) -> Result<TxResponse> {
        let tx_ctx = TxContext::new();
        tx_ctx.add_msg(msg.clone(), true);

        let margin = 100 + self.config.execution.immediate_gas_margin_pct;
        let gas_limit = tx_ctx
            .adjusted_gas_total()
            .checked_mul(margin)
            .map(|gas| gas / 100)
            .ok_or(FillerError::AmountOverflow {
                context: "immediate gas limit",
            })?;
        tx_ctx.update_adjusted_gas_total(gas_limit);

        let response = self.execute(block, &tx_ctx).await?;
        log_execution!(
            "Executed immediate fill via orderbook {}: code {} hash {} gas {}",
            msg.pool_id(),
            response.code,
            response.hash,
            gas_limit
        );
        Ok(response)
    }

    async fn execute(&self, block: &BlockContext, tx_ctx: &TxContext) -> Result<TxResponse> {
        let plan = tx_ctx.plan();
        let response = until_cancelled(block.cancellation(), async {
            block
                .chain()
                .execute_tx(block.block_height(), block.gas_price(), &plan)
                .await
                .map_err(FillerError::Execution)
        })
        .await?;

        if response.code != 0 {
            return Err(FillerError::Execution(anyhow::anyhow!(
                "tx {} rejected with code {}: {}",
                response.hash,
                response.code,
                response.log
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl EndBlockProcessPlugin for OrderbookFiller {
    type Error = FillerError;

    fn name(&self) -> &'static str {
        "orderbook_filler"
    }

    async fn process_end_block(
        &self,
        block_height: u64,
        metadata: &BlockPoolMetadata,
    ) -> Result<()> {
        OrderbookFiller::process_end_block(self, block_height, metadata).await
    }

    fn metrics(&self) -> PluginMetrics {
        self.metrics.get_metrics()
    }
}

/// Base and quote denoms of every orderbook plus `base_denom`, deduplicated
/// and sorted
pub fn unique_orderbook_denoms(orderbooks: &[CanonicalOrderbook], base_denom: &str) -> Vec<String> {
    orderbooks
        .iter()
        .flat_map(|ob| [ob.base.as_str(), ob.quote.as_str()])
        .chain(std::iter::once(base_denom))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Both sides of the pair must hold more than `min_balance`
pub fn validate_user_balances(
    block: &BlockContext,
    orderbook: &CanonicalOrderbook,
    min_balance: u128,
) -> Result<()> {
    for denom in [&orderbook.base, &orderbook.quote] {
        let available = block.balances().amount_of(denom);
        if available <= min_balance {
            return Err(FillerError::InsufficientBalance {
                denom: denom.clone(),
                available,
                required: min_balance,
            });
        }
    }
    Ok(())
}

/// Resolve `fut` unless `cancel` fires first
async fn until_cancelled<T, F>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(FillerError::Cancelled),
        result = fut => result,
    }
}

/// Cap a fillable amount at what the wallet holds
fn clamp_to_balance(fillable: u128, balance: u128, denom: &str, pool_id: u64) -> u128 {
    if balance < fillable {
        warn!(pool_id, denom, fillable, balance, "Wallet balance below fillable amount");
        balance
    } else {
        fillable
    }
}
