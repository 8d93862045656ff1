//! # Orderbook Filler - End-of-Block Orderbook Arbitrage
//!
//! ## Purpose
//!
//! Fills resting limit orders on canonical on-chain orderbooks whenever they
//! are priced through the broader liquidity network. After every block the
//! filler sizes the crossing liquidity of each orderbook, binary-searches the
//! most profitable fill in both directions, and executes the winners: large
//! fills immediately in their own transaction, small ones batched into one
//! transaction with a per-message fallback.
//!
//! ## Integration Points
//!
//! - **Input Sources**: block scheduler (`EndBlockProcessPlugin`), canonical
//!   orderbook registry, tick fetcher, wallet balances, price service
//! - **Output Destinations**: chain client for simulation and broadcast
//! - **Simulation**: liquidity router quoting the cyclic arb through one orderbook
//!
//! ## Architecture Role
//!
//! ```mermaid
//! graph LR
//!     Block[End of Block] --> Refresh[Tick Refresh]
//!     Refresh --> Gate{Block Gate}
//!     Gate --> Snapshot[Block Context]
//!     Snapshot --> Workers[Per-Pool Workers]
//!     Workers --> Search[Arb Search]
//!     Search --> Immediate[Immediate Fill]
//!     Search --> Batch[Batch Tx]
//!     Batch --> Fallback[Per-Message Fallback]
//!
//!     classDef input fill:#E3F2FD
//!     classDef analysis fill:#F3E5F5
//!     classDef execution fill:#E8F5E8
//!
//!     class Block,Refresh input
//!     class Gate,Snapshot,Workers,Search analysis
//!     class Immediate,Batch,Fallback execution
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use orderbook_filler::{FillerClients, FillerConfig, OrderbookFiller};
//! use torq_strategy_shared::BlockPoolMetadata;
//!
//! let filler = OrderbookFiller::new(clients, FillerConfig::from_env())?;
//!
//! // called by the block scheduler with the pools the block touched
//! filler
//!     .process_end_block(height, &BlockPoolMetadata::new(updated_pool_ids))
//!     .await?;
//! ```

pub mod clients;
pub mod config;
pub mod context;
pub mod domain;
pub mod error;
pub mod filler;
pub mod gate;
pub mod logging;
pub mod registry;
pub mod search;

pub use clients::{
    BalanceService, ChainClient, Keyring, LiquidityRouter, PoolRegistry, PriceService,
    TickFetcher,
};
pub use config::{ExecutionConfig, FillerConfig, SearchConfig};
pub use context::{BlockContext, MsgContext, TxContext};
pub use domain::{
    ArbQuote, Balances, CanonicalOrderbook, GasEstimate, PriceTable, PricingSource, SwapHop,
    SwapMsg, TxPlan, TxResponse,
};
pub use error::{FillerError, Result};
pub use filler::{unique_orderbook_denoms, FillerClients, OrderbookFiller};
pub use gate::BlockGate;
pub use registry::{FillableAmounts, OrderbookRegistry, OrderbookTick};
pub use search::{find_max_profitable, ArbValidator, SearchOutcome};

/// Re-export key types
pub use rust_decimal::Decimal;
