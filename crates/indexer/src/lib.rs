//! The staking indexer core: recognizes protocol transactions in
//! confirmed blocks, persists staking and unbonding records, and pushes
//! the corresponding events downstream with at-least-once delivery.

mod classifier;
mod config;
mod emitter;
mod error;
mod indexer;
mod shutdown;
mod traits;
mod validator;

pub use classifier::{classify_tx, SpendInfo, StakingData, TxKind};
pub use config::IndexerConfig;
pub use emitter::RetryConfig;
pub use error::IndexerError;
pub use indexer::{IndexerStatus, StakingIndexer};
pub use traits::{BtcScanner, EventConsumer};
pub use validator::check_unbonding_tx;
