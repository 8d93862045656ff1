//! # Orderbook Filler Configuration
//!
//! Runtime parameters for the end-of-block filler: reference denoms, the
//! binary-search band, execution thresholds and the result collection
//! timeout. Loaded from JSON or TOML files with environment overrides and
//! validated before the filler is built.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use torq_strategy_shared::BasePluginConfig;

use crate::error::{FillerError, Result};

/// Denom of the chain's native fee token
pub const DEFAULT_BASE_DENOM: &str = "uosmo";

/// USDC on Osmosis
pub const DEFAULT_QUOTE_DENOM: &str =
    "ibc/498A0751C798A0D9A389AA3691123DADA57DAA4FE165D5C75894505B876BA6E4";

/// Complete configuration for the orderbook filler
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FillerConfig {
    /// Plugin identity and on/off switch
    pub plugin: BasePluginConfig,
    /// Reference denom always included in the price query, used to price gas
    pub base_denom: String,
    /// Denom all prices are quoted in
    pub default_quote_denom: String,
    /// A pool is eligible only if both wallet balances exceed this amount
    pub min_balance: u128,
    /// Upper bound on each wait for a worker result (seconds)
    pub result_timeout_secs: u64,
    pub search: SearchConfig,
    pub execution: ExecutionConfig,
}

/// Binary search band around the proposed fill amount
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Search ceiling above the proposed amount in basis points (500 = 5%)
    pub ceiling_bps: u32,
    /// Maximum bisection rounds after the proposed amount validated
    pub max_attempts: u32,
}

/// Profitability and execution parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Safety ceiling on the fee a single fill may pay, in the quote denom
    pub max_fee_cap: Decimal,
    /// Fills with revenue below this are batched instead of sent immediately
    pub low_value_threshold: Decimal,
    /// Gas inflation applied to immediate fills that skip re-simulation (percent)
    pub immediate_gas_margin_pct: u64,
}

impl Default for FillerConfig {
    fn default() -> Self {
        Self {
            plugin: BasePluginConfig {
                name: "orderbook_filler".to_string(),
                ..BasePluginConfig::default()
            },
            base_denom: DEFAULT_BASE_DENOM.to_string(),
            default_quote_denom: DEFAULT_QUOTE_DENOM.to_string(),
            min_balance: 0,
            result_timeout_secs: 100,
            search: SearchConfig::default(),
            execution: ExecutionConfig::default(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            ceiling_bps: 500,
            max_attempts: 15,
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            // quote denom has 6 decimals: $10 cap, $0.50 low-value line
            max_fee_cap: dec!(10000000),
            low_value_threshold: dec!(500000),
            immediate_gas_margin_pct: 10,
        }
    }
}

impl FillerConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        torq_strategy_shared::load_config(path)
    }

    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(denom) = std::env::var("FILLER_BASE_DENOM") {
            config.base_denom = denom;
        }

        if let Ok(denom) = std::env::var("FILLER_QUOTE_DENOM") {
            config.default_quote_denom = denom;
        }

        if let Ok(min_balance) = std::env::var("FILLER_MIN_BALANCE") {
            if let Ok(value) = min_balance.parse::<u128>() {
                config.min_balance = value;
            }
        }

        if let Ok(timeout) = std::env::var("FILLER_RESULT_TIMEOUT_SECS") {
            if let Ok(value) = timeout.parse::<u64>() {
                config.result_timeout_secs = value;
            }
        }

        if let Ok(cap) = std::env::var("FILLER_MAX_FEE_CAP") {
            if let Ok(value) = cap.parse::<Decimal>() {
                config.execution.max_fee_cap = value;
            }
        }

        if let Ok(threshold) = std::env::var("FILLER_LOW_VALUE_THRESHOLD") {
            if let Ok(value) = threshold.parse::<Decimal>() {
                config.execution.low_value_threshold = value;
            }
        }

        if let Ok(enabled) = std::env::var("FILLER_ENABLED") {
            config.plugin.enabled = enabled.to_lowercase() == "true";
        }

        config
    }

    /// Save configuration to a JSON file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn result_timeout(&self) -> Duration {
        Duration::from_secs(self.result_timeout_secs)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.base_denom.is_empty() || self.default_quote_denom.is_empty() {
            return Err(FillerError::Config(
                "base_denom and default_quote_denom must be set".to_string(),
            ));
        }

        if self.result_timeout_secs == 0 {
            return Err(FillerError::Config(
                "result_timeout_secs must be positive".to_string(),
            ));
        }

        if self.search.max_attempts == 0 {
            return Err(FillerError::Config(
                "search.max_attempts must be positive".to_string(),
            ));
        }

        if self.execution.max_fee_cap <= Decimal::ZERO {
            return Err(FillerError::Config(
                "execution.max_fee_cap must be positive".to_string(),
            ));
        }

        if self.execution.low_value_threshold < Decimal::ZERO {
            return Err(FillerError::Config(
                "execution.low_value_threshold must be non-negative".to_string(),
            ));
        }

        Ok(())
    }
}
