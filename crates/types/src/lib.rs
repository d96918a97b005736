//! Core types shared across the staking indexer.

mod block;
mod events;
mod records;

pub use block::IndexedBlock;
pub use events::{ActiveStakingEvent, UnbondingStakingEvent, WithdrawStakingEvent};
pub use records::{RecordError, StoredStakingTx, StoredUnbondingTx};
