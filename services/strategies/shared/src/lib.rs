//! Shared Strategy Framework
//!
//! Common plugin traits, metrics and configuration loading for strategies
//! that run at the end of every block.

pub mod config;
pub mod metrics;
pub mod traits;

pub use config::*;
pub use metrics::*;
pub use traits::*;
