//! Block, transaction and message contexts

pub mod block;
pub mod msg;
pub mod tx;

pub use block::BlockContext;
pub use msg::{MsgContext, ScoringPrices};
pub use tx::TxContext;
