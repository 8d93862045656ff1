//! Structured error types for the orderbook filler
//!
//! Collaborator traits return `anyhow::Result`; the filler wraps those errors
//! at the seam so callers can tell which stage of the block failed.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FillerError {
    #[error("Failed to list canonical orderbooks: {0}")]
    PoolRegistry(#[source] anyhow::Error),

    #[error("Failed to refresh ticks for orderbook {pool_id}: {source}")]
    TickRefresh {
        pool_id: u64,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to fetch wallet balances: {0}")]
    Balances(#[source] anyhow::Error),

    #[error("Failed to fetch prices: {0}")]
    Prices(#[source] anyhow::Error),

    #[error("Failed to fetch gas price: {0}")]
    GasPrice(#[source] anyhow::Error),

    #[error("Insufficient balance of {denom}: available {available}, required more than {required}")]
    InsufficientBalance {
        denom: String,
        available: u128,
        required: u128,
    },

    #[error("Price unavailable for denom {denom}")]
    PriceUnavailable { denom: String },

    #[error("No tick data for orderbook {pool_id}")]
    NoTickData { pool_id: u64 },

    #[error("Amount overflow while computing {context}")]
    AmountOverflow { context: &'static str },

    #[error("Arb simulation failed for {amount_in}{denom_in} via orderbook {pool_id}: {source}")]
    ArbSimulation {
        pool_id: u64,
        denom_in: String,
        amount_in: u128,
        #[source]
        source: anyhow::Error,
    },

    #[error("Arb of {amount_in}{denom_in} via orderbook {pool_id} is not profitable: {reason}")]
    Unprofitable {
        pool_id: u64,
        denom_in: String,
        amount_in: u128,
        reason: String,
    },

    #[error("Transaction simulation failed: {0}")]
    Simulation(#[source] anyhow::Error),

    #[error("Transaction execution failed: {0}")]
    Execution(#[source] anyhow::Error),

    #[error("Block processing cancelled")]
    Cancelled,

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T, E = FillerError> = std::result::Result<T, E>;
