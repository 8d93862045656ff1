//! In-memory collaborators for driving the filler end to end
#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::subscriber::DefaultGuard;

use orderbook_filler::{
    ArbQuote, BalanceService, Balances, CanonicalOrderbook, ChainClient, FillerClients,
    FillerConfig, GasEstimate, Keyring, LiquidityRouter, OrderbookFiller, OrderbookTick,
    PoolRegistry, PriceService, PriceTable, PricingSource, SwapHop, SwapMsg, TickFetcher,
    TxPlan, TxResponse,
};

pub const QUOTE: &str = "uusdc";
pub const FEE_DENOM: &str = "uosmo";
pub const BOT_ADDRESS: &str = "osmo1filler";
/// Gas the router attaches to every quote
pub const QUOTE_GAS: u64 = 1_000;

pub fn orderbook(pool_id: u64, base: &str) -> CanonicalOrderbook {
    CanonicalOrderbook {
        pool_id,
        base: base.to_string(),
        quote: QUOTE.to_string(),
        contract_address: format!("osmo1orderbook{}", pool_id),
    }
}

/// Revenue under 100 uusdc is low value
pub fn test_config() -> FillerConfig {
    let mut config = FillerConfig {
        base_denom: FEE_DENOM.to_string(),
        default_quote_denom: QUOTE.to_string(),
        ..FillerConfig::default()
    };
    config.execution.max_fee_cap = dec!(1000000);
    config.execution.low_value_threshold = dec!(100);
    config
}

pub struct MockPools {
    pub orderbooks: Vec<CanonicalOrderbook>,
    pub fail: bool,
}

#[async_trait]
impl PoolRegistry for MockPools {
    async fn canonical_orderbooks(&self) -> anyhow::Result<Vec<CanonicalOrderbook>> {
        if self.fail {
            anyhow::bail!("pools usecase unavailable");
        }
        Ok(self.orderbooks.clone())
    }
}

/// Every book holds one ask of 1000 base at price 9 unless `books` says otherwise
#[derive(Default)]
pub struct MockTicks {
    pub books: HashMap<u64, Vec<OrderbookTick>>,
    pub fail_pools: HashSet<u64>,
    pub calls: Mutex<Vec<u64>>,
}

#[async_trait]
impl TickFetcher for MockTicks {
    async fn fetch_ticks(&self, orderbook: &CanonicalOrderbook) -> anyhow::Result<Vec<OrderbookTick>> {
        self.calls.lock().push(orderbook.pool_id);
        if self.fail_pools.contains(&orderbook.pool_id) {
            anyhow::bail!("tick query for {} failed", orderbook.contract_address);
        }
        if let Some(ticks) = self.books.get(&orderbook.pool_id) {
            return Ok(ticks.clone());
        }
        Ok(vec![OrderbookTick {
            tick_id: -100,
            price: dec!(9),
            bid_liquidity: 0,
            ask_liquidity: 1_000,
        }])
    }
}

pub struct MockBalances {
    pub balances: HashMap<String, u128>,
    pub calls: Mutex<usize>,
    /// When set, each call signals `entered` and then waits on `release`
    pub hold: Option<(Arc<Notify>, Arc<Notify>)>,
}

impl MockBalances {
    pub fn new(balances: impl IntoIterator<Item = (&'static str, u128)>) -> Self {
        Self {
            balances: balances
                .into_iter()
                .map(|(denom, amount)| (denom.to_string(), amount))
                .collect(),
            calls: Mutex::new(0),
            hold: None,
        }
    }
}

#[async_trait]
impl BalanceService for MockBalances {
    async fn all_balances(&self, address: &str) -> anyhow::Result<Balances> {
        assert_eq!(address, BOT_ADDRESS);
        *self.calls.lock() += 1;
        if let Some((entered, release)) = &self.hold {
            entered.notify_one();
            release.notified().await;
        }
        Ok(self.balances.clone().into_iter().collect())
    }
}

pub struct MockPrices {
    pub prices: HashMap<String, Decimal>,
    pub calls: Mutex<Vec<(Vec<String>, Vec<String>)>>,
}

impl Default for MockPrices {
    fn default() -> Self {
        let prices = [
            (QUOTE, dec!(1)),
            (FEE_DENOM, dec!(1)),
            ("uatom", dec!(10)),
            ("uweth", dec!(10)),
            ("utia", dec!(10)),
        ];
        Self {
            prices: prices
                .into_iter()
                .map(|(denom, price)| (denom.to_string(), price))
                .collect(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PriceService for MockPrices {
    async fn prices(
        &self,
        denoms: &[String],
        quote_denoms: &[String],
        source: PricingSource,
    ) -> anyhow::Result<PriceTable> {
        assert_eq!(source, PricingSource::Chain);
        self.calls.lock().push((denoms.to_vec(), quote_denoms.to_vec()));
        Ok(denoms
            .iter()
            .filter_map(|d| self.prices.get(d).map(|p| (d.clone(), *p)))
            .collect())
    }
}

/// How the router quotes arbs through one orderbook
#[derive(Debug, Clone, Copy)]
pub enum ArbBehavior {
    /// Returns `profit_bps` on top of any input
    Linear { profit_bps: u128 },
    /// Returns `amount_in / divisor` on top of inputs up to `peak`, nothing above
    Peak { peak: u128, divisor: u128 },
    Fail,
    /// Never answers
    Hang,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouterCall {
    pub pool_id: u64,
    pub denom_in: String,
    pub amount_in: u128,
}

pub struct MockRouter {
    pub behaviors: HashMap<u64, ArbBehavior>,
    /// Overrides `behaviors` for one direction of a pool, keyed by denom in
    pub directions: HashMap<(u64, String), ArbBehavior>,
    pub calls: Mutex<Vec<RouterCall>>,
}

impl MockRouter {
    pub fn new(behaviors: impl IntoIterator<Item = (u64, ArbBehavior)>) -> Self {
        Self {
            behaviors: behaviors.into_iter().collect(),
            directions: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_direction(mut self, pool_id: u64, denom_in: &str, behavior: ArbBehavior) -> Self {
        self.directions.insert((pool_id, denom_in.to_string()), behavior);
        self
    }

    pub fn calls_for(&self, pool_id: u64) -> Vec<RouterCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.pool_id == pool_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl LiquidityRouter for MockRouter {
    async fn simulate_arb(
        &self,
        amount_in: u128,
        denom_in: &str,
        denom_out: &str,
        orderbook_pool_id: u64,
    ) -> anyhow::Result<ArbQuote> {
        self.calls.lock().push(RouterCall {
            pool_id: orderbook_pool_id,
            denom_in: denom_in.to_string(),
            amount_in,
        });

        let behavior = self
            .directions
            .get(&(orderbook_pool_id, denom_in.to_string()))
            .or_else(|| self.behaviors.get(&orderbook_pool_id))
            .copied()
            .unwrap_or(ArbBehavior::Fail);
        let amount_out = match behavior {
            ArbBehavior::Linear { profit_bps } => amount_in * (10_000 + profit_bps) / 10_000,
            ArbBehavior::Peak { peak, divisor } if amount_in <= peak => amount_in + amount_in / divisor,
            ArbBehavior::Peak { .. } => amount_in,
            ArbBehavior::Fail => anyhow::bail!("no route for {}", denom_in),
            ArbBehavior::Hang => {
                return futures::future::pending::<anyhow::Result<ArbQuote>>().await;
            }
        };

        Ok(ArbQuote {
            amount_out,
            adjusted_gas: QUOTE_GAS,
            msg: SwapMsg {
                sender: BOT_ADDRESS.to_string(),
                routes: vec![
                    SwapHop {
                        pool_id: orderbook_pool_id,
                        token_out_denom: denom_out.to_string(),
                    },
                    SwapHop {
                        pool_id: 1_000 + orderbook_pool_id,
                        token_out_denom: denom_in.to_string(),
                    },
                ],
                token_in_denom: denom_in.to_string(),
                token_in_amount: amount_in,
                token_out_min_amount: amount_in,
            },
        })
    }
}

type SimulateFail = Box<dyn Fn(usize) -> bool + Send + Sync>;
type ExecuteFail = Box<dyn Fn(&TxPlan) -> bool + Send + Sync>;

pub struct MockChain {
    pub gas_price: Decimal,
    pub fail_gas_price: bool,
    pub simulate_fail: SimulateFail,
    pub execute_fail: ExecuteFail,
    /// Message count of every simulation
    pub simulate_calls: Mutex<Vec<usize>>,
    /// Plans of every execution attempt
    pub execute_attempts: Mutex<Vec<TxPlan>>,
    /// Plans that were broadcast successfully
    pub executed: Mutex<Vec<TxPlan>>,
}

impl Default for MockChain {
    fn default() -> Self {
        Self {
            gas_price: dec!(0.001),
            fail_gas_price: false,
            simulate_fail: Box::new(|_| false),
            execute_fail: Box::new(|_| false),
            simulate_calls: Mutex::new(Vec::new()),
            execute_attempts: Mutex::new(Vec::new()),
            executed: Mutex::new(Vec::new()),
        }
    }
}

impl MockChain {
    pub fn fail_simulate_when(mut self, f: impl Fn(usize) -> bool + Send + Sync + 'static) -> Self {
        self.simulate_fail = Box::new(f);
        self
    }

    pub fn fail_execute_when(
        mut self,
        f: impl Fn(&TxPlan) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.execute_fail = Box::new(f);
        self
    }

    pub fn executed_pools(&self) -> Vec<Vec<u64>> {
        self.executed
            .lock()
            .iter()
            .map(|p| p.pool_ids.clone())
            .collect()
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn gas_price(&self) -> anyhow::Result<Decimal> {
        if self.fail_gas_price {
            anyhow::bail!("fee market query failed");
        }
        Ok(self.gas_price)
    }

    async fn simulate_msgs(&self, msgs: &[SwapMsg]) -> anyhow::Result<GasEstimate> {
        self.simulate_calls.lock().push(msgs.len());
        if (self.simulate_fail)(msgs.len()) {
            anyhow::bail!("out of gas in simulation");
        }
        let count = msgs.len() as u64;
        Ok(GasEstimate {
            gas_used: 900 * count,
            adjusted_gas: QUOTE_GAS * count,
        })
    }

    async fn execute_tx(
        &self,
        block_height: u64,
        gas_price: Decimal,
        plan: &TxPlan,
    ) -> anyhow::Result<TxResponse> {
        assert_eq!(gas_price, self.gas_price);
        self.execute_attempts.lock().push(plan.clone());
        if (self.execute_fail)(plan) {
            anyhow::bail!("broadcast rejected");
        }
        let mut executed = self.executed.lock();
        executed.push(plan.clone());
        Ok(TxResponse {
            code: 0,
            hash: format!("{}-{}", block_height, executed.len()),
            log: String::new(),
        })
    }
}

/// Formatted log output shared with a test subscriber
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    /// Route events at `level` and above on this thread into the buffer
    /// until the guard is dropped
    pub fn capture(level: tracing::Level) -> (Self, DefaultGuard) {
        let buffer = Self::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        (buffer, tracing::subscriber::set_default(subscriber))
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

pub struct MockKeyring;

impl Keyring for MockKeyring {
    fn address(&self) -> String {
        BOT_ADDRESS.to_string()
    }
}

/// Mocks wired into one filler. Fields may be swapped before `filler()`.
pub struct Harness {
    pub pools: Arc<MockPools>,
    pub ticks: Arc<MockTicks>,
    pub balances: Arc<MockBalances>,
    pub prices: Arc<MockPrices>,
    pub router: Arc<MockRouter>,
    pub chain: Arc<MockChain>,
    pub config: FillerConfig,
}

impl Harness {
    /// Funds the wallet with 1_000_000 of every denom involved
    pub fn new(books: &[(u64, &'static str, ArbBehavior)]) -> Self {
        let orderbooks: Vec<_> = books.iter().map(|(id, base, _)| orderbook(*id, base)).collect();
        let funded = books
            .iter()
            .map(|(_, base, _)| (*base, 1_000_000u128))
            .chain([(QUOTE, 1_000_000), (FEE_DENOM, 1_000_000)]);

        Self {
            pools: Arc::new(MockPools {
                orderbooks,
                fail: false,
            }),
            ticks: Arc::new(MockTicks::default()),
            balances: Arc::new(MockBalances::new(funded)),
            prices: Arc::new(MockPrices::default()),
            router: Arc::new(MockRouter::new(books.iter().map(|(id, _, b)| (*id, *b)))),
            chain: Arc::new(MockChain::default()),
            config: test_config(),
        }
    }

    pub fn clients(&self) -> FillerClients {
        FillerClients {
            pools: self.pools.clone(),
            ticks: self.ticks.clone(),
            balances: self.balances.clone(),
            prices: self.prices.clone(),
            router: self.router.clone(),
            chain: self.chain.clone(),
            keyring: Arc::new(MockKeyring),
        }
    }

    pub fn filler(&self) -> OrderbookFiller {
        OrderbookFiller::new(self.clients(), self.config.clone()).unwrap()
    }

    pub fn pool_ids(&self) -> Vec<u64> {
        self.pools.orderbooks.iter().map(|ob| ob.pool_id).collect()
    }
}
